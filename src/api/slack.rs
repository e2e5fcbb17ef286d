use actix_web::{post, web, HttpResponse, Scope};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::Error, event::MessageEvent, service::Service, verify::SignedRequest};

/// Outer Events API payload.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: Value,
        #[serde(default)]
        event_id: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[post("/events")]
async fn events(
    service: web::Data<Service>,
    signed: SignedRequest,
    body: web::Bytes,
) -> Result<HttpResponse, Error> {
    signed.verify(
        service.signing_secret(),
        &body,
        chrono::Utc::now().timestamp(),
    )?;

    let envelope: Envelope = serde_json::from_slice(&body).map_err(Error::invalid_payload)?;

    let (event, event_id) = match envelope {
        Envelope::UrlVerification { challenge } => {
            return Ok(HttpResponse::Ok().json(json!({ "challenge": challenge })));
        }
        Envelope::EventCallback { event, event_id } => (event, event_id),
        Envelope::Other => return Ok(HttpResponse::Ok().finish()),
    };

    if event.get("type").and_then(Value::as_str) != Some("message") {
        tracing::debug!(?event_id, "ignoring non-message event");
        return Ok(HttpResponse::Ok().finish());
    }

    // Edits and deletions nest the message and may not carry `ts` at the top.
    if event.get("subtype").is_some_and(|subtype| !subtype.is_null()) {
        tracing::debug!(?event_id, "ignoring message with subtype");
        return Ok(HttpResponse::Ok().finish());
    }

    let event: MessageEvent = serde_json::from_value(event).map_err(Error::invalid_payload)?;

    let outcome = service.policy().handle(event).await?;

    tracing::debug!(?event_id, ?outcome, "event handled");

    Ok(HttpResponse::Ok().finish())
}

pub fn service() -> Scope {
    web::scope("/slack").service(events)
}
