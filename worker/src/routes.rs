use crate::handlers;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(handlers::health))

        // Raw poll state
        .route("/api/daemon", web::get().to(handlers::get_daemon))
        .route("/api/containers", web::get().to(handlers::get_all_containers))
        .route("/api/containers/{name}", web::get().to(handlers::get_container))

        // Formatted readings
        .route("/api/sensors", web::get().to(handlers::get_sensors));
}
