pub mod models;

pub use models::{
    ContainerInfo, ContainerSnapshot, ContainerStateInfo, CpuStats, DaemonInfo, MemoryStats,
    NetworkStats,
};
