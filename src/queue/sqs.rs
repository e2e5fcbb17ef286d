//! SQS FIFO implementation of [`DeferredQueue`].

use std::collections::HashMap;

use aws_sdk_sqs::types::{Message, MessageAttributeValue};

use crate::{
    event::{DedupKey, MessageEvent},
    utils::BoxFuture,
};

use super::{
    CancelOutcome, DeferredQueue, Receipt, ATTR_CHANNEL, ATTR_MESSAGE_ID, ATTR_TIMESTAMP,
};

/// Upper bound on messages inspected per cancellation scan.
pub const SCAN_BATCH_SIZE: i32 = 10;
/// Long-poll wait for a cancellation scan, in seconds.
pub const SCAN_WAIT_SECONDS: i32 = 1;

pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: Option<String>,
}

impl SqsQueue {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: Option<String>) -> Self {
        Self { client, queue_url }
    }
}

/// Attributes attached to every enqueued message so a later scan can find it.
pub fn message_attributes(
    event: &MessageEvent,
    key: &DedupKey,
) -> eyre::Result<HashMap<String, MessageAttributeValue>> {
    [
        (ATTR_MESSAGE_ID, key.as_str()),
        (ATTR_CHANNEL, event.channel.as_str()),
        (ATTR_TIMESTAMP, event.ts.as_str()),
    ]
    .into_iter()
    .map(|(name, value)| {
        let attr = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(value)
            .build()?;
        Ok::<_, eyre::Report>((name.to_owned(), attr))
    })
    .collect()
}

/// Returns the receipt handle of the first message whose `MessageId`
/// attribute equals `key`.
pub fn find_receipt<'m>(messages: &'m [Message], key: &DedupKey) -> Option<&'m str> {
    messages.iter().find_map(|message| {
        let id = message
            .message_attributes
            .as_ref()?
            .get(ATTR_MESSAGE_ID)?
            .string_value
            .as_deref()?;

        if id == key.as_str() {
            message.receipt_handle.as_deref()
        } else {
            None
        }
    })
}

impl DeferredQueue for SqsQueue {
    fn enqueue<'a>(
        &'a self,
        event: &'a MessageEvent,
        key: &'a DedupKey,
    ) -> BoxFuture<'a, eyre::Result<Receipt>> {
        Box::pin(async move {
            let queue_url = self
                .queue_url
                .as_deref()
                .ok_or_else(|| eyre::eyre!("SQS_QUEUE_URL is not set"))?;

            let body = serde_json::to_string(event)?;

            let output = self
                .client
                .send_message()
                .queue_url(queue_url)
                .message_body(&body)
                .message_group_id(&event.channel)
                .message_deduplication_id(key.as_str())
                .set_message_attributes(Some(message_attributes(event, key)?))
                .send()
                .await?;

            let digest = hex::encode(md5::compute(&body).as_ref());
            if let Some(returned) = output.md5_of_message_body.as_deref() {
                if returned != digest {
                    tracing::warn!(%key, %returned, expected = %digest, "message body digest mismatch");
                }
            }

            tracing::info!(%key, message_id = ?output.message_id, "message queued");

            Ok(Receipt {
                message_id: output.message_id,
                sequence_number: output.sequence_number,
            })
        })
    }

    fn cancel_if_present<'a>(&'a self, key: &'a DedupKey) -> BoxFuture<'a, CancelOutcome> {
        Box::pin(async move {
            let Some(queue_url) = self.queue_url.as_deref() else {
                tracing::warn!(%key, "SQS_QUEUE_URL not set, cannot delete message");
                return CancelOutcome::TransientError("SQS_QUEUE_URL is not set".to_owned());
            };

            let received = match self
                .client
                .receive_message()
                .queue_url(queue_url)
                .message_attribute_names(ATTR_MESSAGE_ID)
                .max_number_of_messages(SCAN_BATCH_SIZE)
                .wait_time_seconds(SCAN_WAIT_SECONDS)
                .send()
                .await
            {
                Ok(output) => output.messages.unwrap_or_default(),
                Err(e) => {
                    tracing::error!(%key, error = %e, "failed to scan queue");
                    return CancelOutcome::TransientError(e.to_string());
                }
            };

            let target = find_receipt(&received, key);

            // The scan leaves every received message in flight; hand the
            // ones we are not deleting straight back to the queue.
            for handle in received
                .iter()
                .filter_map(|m| m.receipt_handle.as_deref())
                .filter(|handle| Some(*handle) != target)
            {
                if let Err(e) = self
                    .client
                    .change_message_visibility()
                    .queue_url(queue_url)
                    .receipt_handle(handle)
                    .visibility_timeout(0)
                    .send()
                    .await
                {
                    tracing::debug!(error = %e, "failed to release scanned message");
                }
            }

            let Some(handle) = target else {
                tracing::info!(%key, "message not found in queue, nothing to delete");
                return CancelOutcome::NotFound;
            };

            match self
                .client
                .delete_message()
                .queue_url(queue_url)
                .receipt_handle(handle)
                .send()
                .await
            {
                Ok(_) => {
                    tracing::info!(%key, "deleted pending message");
                    CancelOutcome::Deleted
                }
                Err(e) => {
                    tracing::error!(%key, error = %e, "failed to delete pending message");
                    CancelOutcome::TransientError(e.to_string())
                }
            }
        })
    }
}
