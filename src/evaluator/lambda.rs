use aws_sdk_lambda::{primitives::Blob, types::InvocationType};
use serde::Serialize;

use crate::{error::Error, event::MessageEvent, utils::BoxFuture};

use super::{Dispatch, Evaluator, ACCEPTED};

/// Payload shape the evaluator function expects: an API-Gateway-like
/// envelope whose `body` is the serialized event.
#[derive(Debug, Serialize)]
struct InvocationPayload {
    body: String,
    headers: InvocationHeaders,
}

#[derive(Debug, Serialize)]
struct InvocationHeaders {
    #[serde(rename = "Content-Type")]
    content_type: &'static str,
}

pub fn invocation_payload(event: &MessageEvent) -> Result<Vec<u8>, Error> {
    let payload = InvocationPayload {
        body: serde_json::to_string(event)?,
        headers: InvocationHeaders {
            content_type: "application/json",
        },
    };

    Ok(serde_json::to_vec(&payload)?)
}

pub struct LambdaEvaluator {
    client: aws_sdk_lambda::Client,
    function_name: Option<String>,
}

impl LambdaEvaluator {
    pub fn new(client: aws_sdk_lambda::Client, function_name: Option<String>) -> Self {
        Self {
            client,
            function_name,
        }
    }
}

impl Evaluator for LambdaEvaluator {
    fn dispatch<'a>(&'a self, event: &'a MessageEvent) -> BoxFuture<'a, Result<Dispatch, Error>> {
        Box::pin(async move {
            let function_name = self
                .function_name
                .as_deref()
                .ok_or_else(|| Error::missing_config("EVALUATOR_LAMBDA_ARN"))?;

            let payload = invocation_payload(event)?;

            tracing::info!(function = %function_name, "invoking evaluator");

            let output = self
                .client
                .invoke()
                .function_name(function_name)
                .invocation_type(InvocationType::Event)
                .payload(Blob::new(payload))
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(function = %function_name, error = %e, "evaluator invocation failed");
                    Error::dispatch(e)
                })?;

            tracing::info!(
                status_code = output.status_code,
                function_error = ?output.function_error,
                executed_version = ?output.executed_version,
                "evaluator invocation submitted"
            );

            if output.status_code == ACCEPTED {
                tracing::info!("evaluator invocation accepted for async execution");
            } else {
                tracing::warn!(status_code = output.status_code, "unexpected invocation status");
            }

            Ok(Dispatch::Invoked {
                status_code: output.status_code,
            })
        })
    }
}
