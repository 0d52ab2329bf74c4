pub mod health;
pub mod logs_ws;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(health::ready)
        .service(health::metrics_endpoint)
        .service(logs_ws::logs_ws);
}
