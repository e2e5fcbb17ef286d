//! Debounced dispatch.
//!
//! Every plain message either replaces the pending deferred evaluation for
//! its key, or, when it mentions the bot, cancels that evaluation and goes
//! to the evaluator right away.
//!
//! Delete-before-enqueue and delete-before-dispatch are sequential within one
//! call, but nothing serializes two calls for the same channel. The "one
//! pending message per key" property is therefore best effort; the queue's
//! per-channel message group and deduplication id are what keep concurrent
//! enqueues from producing duplicates.

use std::sync::Arc;

use crate::{
    config::Mode,
    error::Error,
    evaluator::{Dispatch, Evaluator},
    event::{DedupKey, MentionTag, MessageEvent},
    queue::{CancelOutcome, DeferredQueue, Receipt},
    slack::ChatPlatform,
};

/// What [`Policy::handle`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a plain message.
    Ignored,
    /// Parked in the queue for deferred evaluation.
    Deferred { key: DedupKey, receipt: Receipt },
    /// Enqueueing failed; the event is gone.
    Dropped { key: DedupKey },
    /// Sent to the evaluator.
    Dispatched { key: DedupKey, dispatch: Dispatch },
    /// Dispatch failed in dev mode and the thread was told about it.
    DispatchFailed { key: DedupKey },
}

#[derive(bon::Builder)]
pub struct Policy {
    queue: Arc<dyn DeferredQueue>,
    evaluator: Arc<dyn Evaluator>,
    chat: Arc<dyn ChatPlatform>,
    #[builder(default)]
    mode: Mode,
}

impl Policy {
    #[tracing::instrument(skip_all, fields(channel = %event.channel, ts = %event.ts, mode = %self.mode))]
    pub async fn handle(&self, mut event: MessageEvent) -> Result<Outcome, Error> {
        if event.has_subtype() {
            tracing::debug!(subtype = ?event.subtype, "ignoring message with subtype");
            return Ok(Outcome::Ignored);
        }

        let tag = self.mention_tag().await;
        let mentioned = tag.as_ref().is_some_and(|tag| event.mentions(tag));

        event.enrich(tag.as_ref());
        self.log_origin(&event).await;

        let key = event.dedup_key();

        tracing::info!(%key, mentioned, "received message");

        if mentioned {
            self.dispatch_now(event, key).await
        } else {
            Ok(self.defer(event, key).await)
        }
    }

    /// Looked up on every call; the bot identity is not cached.
    async fn mention_tag(&self) -> Option<MentionTag> {
        match self.chat.bot_user_id().await {
            Ok(user_id) => Some(MentionTag::for_user(user_id)),
            Err(e) => {
                tracing::error!(error = %e, "failed to resolve bot identity, treating message as unmentioned");
                None
            }
        }
    }

    async fn log_origin(&self, event: &MessageEvent) {
        let channel = match self.chat.conversation_name(&event.channel).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "conversation lookup failed");
                event.channel.clone()
            }
        };

        let user = match event.user.as_deref() {
            Some(user) => match self.chat.user_display_name(user).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(error = %e, "user lookup failed");
                    user.to_owned()
                }
            },
            None => "unknown".to_owned(),
        };

        tracing::info!(%user, %channel, "user sent message to channel");
    }

    async fn cancel_pending(&self, key: &DedupKey) {
        match self.queue.cancel_if_present(key).await {
            CancelOutcome::Deleted => tracing::info!(%key, "replaced pending message"),
            CancelOutcome::NotFound => tracing::debug!(%key, "no pending message"),
            CancelOutcome::TransientError(reason) => {
                tracing::warn!(%key, %reason, "could not check for pending message")
            }
        }
    }

    async fn defer(&self, event: MessageEvent, key: DedupKey) -> Outcome {
        tracing::info!(%key, "bot not mentioned, scheduling deferred evaluation");

        self.cancel_pending(&key).await;

        match self.queue.enqueue(&event, &key).await {
            Ok(receipt) => {
                tracing::info!(%key, "message scheduled for evaluation");
                Outcome::Deferred { key, receipt }
            }
            Err(e) => {
                tracing::error!(%key, error = %e, "failed to schedule message");
                Outcome::Dropped { key }
            }
        }
    }

    async fn dispatch_now(&self, event: MessageEvent, key: DedupKey) -> Result<Outcome, Error> {
        tracing::info!(%key, "bot mentioned, dispatching to evaluator");

        self.cancel_pending(&key).await;

        match self.evaluator.dispatch(&event).await {
            Ok(dispatch) => {
                tracing::info!(%key, ?dispatch, "evaluator dispatched");
                Ok(Outcome::Dispatched { key, dispatch })
            }
            Err(e) => {
                tracing::error!(%key, error = %e, "error calling evaluator");

                match self.mode {
                    Mode::Deployed => Err(e),
                    Mode::Dev => {
                        let text = format!("Error processing with User: {e}");
                        if let Err(e) = self
                            .chat
                            .post_message(&event.channel, event.thread_ts(), &text)
                            .await
                        {
                            tracing::error!(%key, error = %e, "failed to report dispatch error");
                        }
                        Ok(Outcome::DispatchFailed { key })
                    }
                }
            }
        }
    }
}
