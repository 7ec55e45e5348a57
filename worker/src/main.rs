mod config;
mod handlers;
mod routes;
mod sensors;
mod worker_service;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use config::Config;
use docker_monitor_services::{DockerService, RuntimeClient};
use handlers::AppState;
use std::sync::Arc;
use worker_service::WorkerService;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().context("Invalid configuration")?;

    log::info!("Starting Docker Monitor Worker {}", VERSION);
    log::debug!("Configuration: {:?}", config);

    // Any failure here aborts startup entirely
    let docker: Arc<dyn RuntimeClient> = Arc::new(
        DockerService::connect(&config.docker_url)
            .await
            .context("Error setting up Docker API")?,
    );

    let worker_service = WorkerService::new(docker, config.clone());
    let (monitors, _tasks) = worker_service
        .start()
        .await
        .context("Failed to load containers")?;

    let app_state = web::Data::new(AppState {
        platform_name: config.name.clone(),
        monitored_conditions: config.monitored_conditions.clone(),
        monitors,
    });

    log::info!("Serving sensors on {}:{}", config.server_host, config.server_port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    Ok(())
}
