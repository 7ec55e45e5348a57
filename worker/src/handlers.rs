use crate::sensors::{container_readings, daemon_readings};
use crate::worker_service::Monitors;
use actix_web::{web, HttpResponse, Responder};
use std::collections::BTreeMap;

pub struct AppState {
    pub platform_name: String,
    pub monitored_conditions: Vec<&'static str>,
    pub monitors: Monitors,
}

pub async fn health() -> impl Responder {
    "OK"
}

/// Latest daemon info poll
pub async fn get_daemon(state: web::Data<AppState>) -> impl Responder {
    let poll = state.monitors.daemon.read().await.clone();
    HttpResponse::Ok().json(serde_json::json!({ "data": poll }))
}

/// Latest poll of every monitored container
pub async fn get_all_containers(state: web::Data<AppState>) -> impl Responder {
    let mut containers = BTreeMap::new();
    for (name, poll) in &state.monitors.containers {
        containers.insert(name.clone(), poll.read().await.clone());
    }
    HttpResponse::Ok().json(serde_json::json!({ "data": containers }))
}

pub async fn get_container(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();
    match state.monitors.containers.get(&name) {
        Some(poll) => {
            let poll = poll.read().await.clone();
            HttpResponse::Ok().json(serde_json::json!({ "data": poll }))
        }
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Container '{}' is not monitored", name)
        })),
    }
}

/// Every monitored metric of every entity, formatted for display
pub async fn get_sensors(state: web::Data<AppState>) -> impl Responder {
    let daemon = state.monitors.daemon.read().await.clone();
    let mut readings = daemon_readings(&state.platform_name, &state.monitored_conditions, &daemon);

    for (name, poll) in &state.monitors.containers {
        let poll = poll.read().await.clone();
        readings.extend(container_readings(
            &state.platform_name,
            name,
            &state.monitored_conditions,
            &poll,
        ));
    }

    HttpResponse::Ok().json(serde_json::json!({ "data": readings }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes;
    use actix_web::{test, App};
    use docker_monitor_services::{catalog, PollState};
    use docker_monitor_shared::DaemonInfo;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn app_state() -> web::Data<AppState> {
        let daemon = PollState {
            data: Some(DaemonInfo {
                version: Some("27.3.1".to_string()),
                ..Default::default()
            }),
            last_update_success: true,
            last_error: None,
            last_updated: None,
        };
        let web_poll = PollState {
            data: None,
            last_update_success: false,
            last_error: Some("timed out after 10s".to_string()),
            last_updated: None,
        };

        web::Data::new(AppState {
            platform_name: "docker_monitor".to_string(),
            monitored_conditions: catalog::all_ids(),
            monitors: Monitors {
                daemon: Arc::new(RwLock::new(daemon)),
                containers: BTreeMap::from([("web".to_string(), Arc::new(RwLock::new(web_poll)))]),
            },
        })
    }

    #[actix_web::test]
    async fn unknown_container_is_404() {
        let app = test::init_service(App::new().app_data(app_state()).configure(routes::configure)).await;
        let req = test::TestRequest::get().uri("/api/containers/db").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn container_poll_state_is_published() {
        let app = test::init_service(App::new().app_data(app_state()).configure(routes::configure)).await;
        let req = test::TestRequest::get().uri("/api/containers/web").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["last_update_success"], false);
        assert_eq!(body["data"]["last_error"], "timed out after 10s");
    }

    #[actix_web::test]
    async fn sensors_cover_daemon_and_containers() {
        let app = test::init_service(App::new().app_data(app_state()).configure(routes::configure)).await;
        let req = test::TestRequest::get().uri("/api/sensors").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let readings = body["data"].as_array().unwrap();
        assert_eq!(readings.len(), catalog::CATALOG.len());
        assert_eq!(readings[0]["metric"], "docker_version");
        assert_eq!(readings[0]["state"], "27.3.1");
        assert!(readings[1..].iter().all(|r| r["available"] == false && r["container"] == "web"));
    }
}
