use actix_web::{post, web, HttpRequest, Responder, Scope};
use serde::Serialize;

use crate::{
    error::Error,
    forwarder::{RecordBatch, RecordResult},
    service::Service,
    verify::check_bearer,
};

#[derive(Serialize)]
pub struct ForwardResponse {
    message: &'static str,
    results: Vec<RecordResult>,
}

#[post("/records")]
async fn forward_records(
    service: web::Data<Service>,
    req: HttpRequest,
    batch: web::Json<RecordBatch>,
) -> Result<impl Responder, Error> {
    if let Some(token) = service.forward_token() {
        check_bearer(req.headers(), token)?;
    }

    let results = service.forwarder().forward(batch.into_inner()).await?;

    Ok(web::Json(ForwardResponse {
        message: "queue records processed",
        results,
    }))
}

pub fn service() -> Scope {
    web::scope("/queue").service(forward_records)
}
