use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::error::Result;
use crate::metrics;
use crate::state::AppState;

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    log_subscribers: usize,
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

#[get("/ready")]
pub async fn ready(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ReadyResponse {
        status: "ready",
        log_subscribers: state.registry.len(),
    })
}

#[get("/metrics")]
pub async fn metrics_endpoint() -> Result<HttpResponse> {
    let body = metrics::render()?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SubscriberRegistry;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_and_ready() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(SubscriberRegistry::new())))
                .configure(crate::routes::configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/ready").to_request(),
        )
        .await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["log_subscribers"], 0);
    }

    #[actix_web::test]
    async fn test_metrics_text_format() {
        crate::metrics::record_bus_message("shop-events", "accepted");

        let app = test::init_service(App::new().configure(crate::routes::configure)).await;
        let body = test::call_and_read_body(
            &app,
            test::TestRequest::get().uri("/metrics").to_request(),
        )
        .await;

        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("pulse_bus_messages_total"));
    }
}
