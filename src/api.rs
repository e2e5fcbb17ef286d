use actix_web::{get, web, Responder};

pub mod queue;
pub mod slack;

#[get("/health")]
async fn health() -> impl Responder {
    "OK"
}

/// Registers every route the listener serves.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(slack::service())
        .service(queue::service())
        .service(health);
}
