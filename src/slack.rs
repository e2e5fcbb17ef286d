//! Slack Web API access used by the listener.
//!
//! Everything here except [`ChatPlatform::bot_user_id`] is enrichment: the
//! results only feed log lines, and the error notice posted in dev mode.

use crate::utils::BoxFuture;

pub mod client;

pub trait ChatPlatform: Send + Sync + 'static {
    /// User id of the bot the configured token belongs to (`auth.test`).
    fn bot_user_id(&self) -> BoxFuture<'_, eyre::Result<String>>;

    /// Human-readable name of a conversation (`conversations.info`).
    fn conversation_name<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, eyre::Result<String>>;

    /// Display name of a user (`users.info`).
    fn user_display_name<'a>(&'a self, user: &'a str) -> BoxFuture<'a, eyre::Result<String>>;

    /// Posts `text` as a reply in the thread rooted at `thread_ts`.
    fn post_message<'a>(
        &'a self,
        channel: &'a str,
        thread_ts: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, eyre::Result<()>>;
}
