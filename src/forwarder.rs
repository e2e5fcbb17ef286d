//! Delivery side of the debounce: messages released by the queue after their
//! delay are handed to the evaluator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{error::Error, evaluator::Evaluator, event::MessageEvent};

/// Batch of queue records as delivered by an SQS trigger.
#[derive(Debug, Deserialize)]
pub struct RecordBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub struct Record {
    #[serde(rename = "messageId")]
    pub message_id: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResult {
    pub message_id: Option<String>,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
}

pub struct Forwarder {
    evaluator: Arc<dyn Evaluator>,
}

impl Forwarder {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        Self { evaluator }
    }

    /// Forwards every record in order. The first failure aborts the batch
    /// and is returned, so the queue redelivers it.
    #[tracing::instrument(skip_all, fields(records = batch.records.len()))]
    pub async fn forward(&self, batch: RecordBatch) -> Result<Vec<RecordResult>, Error> {
        let mut results = Vec::with_capacity(batch.records.len());

        for record in batch.records {
            match self.forward_one(&record).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(message_id = ?record.message_id, error = %e, "error processing queue record");
                    return Err(e);
                }
            }
        }

        tracing::info!(?results, "queue records processed");

        Ok(results)
    }

    async fn forward_one(&self, record: &Record) -> Result<RecordResult, Error> {
        let event: MessageEvent =
            serde_json::from_str(&record.body).map_err(Error::invalid_payload)?;

        tracing::info!(message_id = ?record.message_id, key = %event.dedup_key(), "forwarding deferred message");

        let dispatch = self.evaluator.dispatch(&event).await?;

        let status = if dispatch.is_accepted() {
            RecordStatus::Success
        } else {
            tracing::warn!(status_code = ?dispatch.status_code(), "unexpected status code");
            RecordStatus::Warning
        };

        Ok(RecordResult {
            message_id: record.message_id.clone(),
            status,
            status_code: dispatch.status_code(),
        })
    }
}
