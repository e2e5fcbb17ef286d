//! Deferred-evaluation queue.
//!
//! Messages that do not mention the bot are parked in a FIFO queue whose
//! delivery delay acts as the debounce window. The queue is grouped by
//! channel and deduplicated by [`DedupKey`]; it has no delete-by-key, so
//! cancellation scans a bounded batch of visible messages and matches on the
//! `MessageId` attribute written at enqueue time.

use crate::{
    event::{DedupKey, MessageEvent},
    utils::BoxFuture,
};

pub mod sqs;

/// Message attribute carrying the [`DedupKey`].
pub const ATTR_MESSAGE_ID: &str = "MessageId";
/// Message attribute carrying the channel.
pub const ATTR_CHANNEL: &str = "Channel";
/// Message attribute carrying the message timestamp.
pub const ATTR_TIMESTAMP: &str = "Timestamp";

/// Acknowledgement returned by the queue for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    pub message_id: Option<String>,
    pub sequence_number: Option<String>,
}

/// Result of looking for a pending message to cancel.
///
/// None of these are errors to the caller: cancellation is best effort and
/// the policy proceeds in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// A pending message with the key was found and deleted.
    Deleted,
    /// Nothing pending under the key. The common case.
    NotFound,
    /// The queue could not be scanned or the delete failed.
    TransientError(String),
}

pub trait DeferredQueue: Send + Sync + 'static {
    /// Enqueues `event` under `key`, grouped by the event's channel.
    fn enqueue<'a>(
        &'a self,
        event: &'a MessageEvent,
        key: &'a DedupKey,
    ) -> BoxFuture<'a, eyre::Result<Receipt>>;

    /// Removes the pending message stored under `key`, if any.
    fn cancel_if_present<'a>(&'a self, key: &'a DedupKey) -> BoxFuture<'a, CancelOutcome>;
}
