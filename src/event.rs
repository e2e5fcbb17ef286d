//! Chat message events and the identities derived from them.
//!
//! A [`MessageEvent`] is built from the `event` object of a Slack
//! `event_callback` envelope. Fields the listener does not interpret are
//! carried through untouched, so the JSON handed to the evaluator is the
//! full inbound event plus the enrichment written by [`MessageEvent::enrich`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The token Slack embeds in a message body when a user is mentioned,
/// e.g. `<@U0123ABCD>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionTag(String);

impl MentionTag {
    pub fn for_user(user_id: impl AsRef<str>) -> Self {
        Self(format!("<@{}>", user_id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MentionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a message in the deferred queue: `{channel}_{ts}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(channel: &str, ts: &str) -> Self {
        Self(format!("{channel}_{ts}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DedupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub channel: String,
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub text: String,
    /// Present on edits, deletions, joins and every other non-plain message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageEvent {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
            thread_ts: None,
            text: text.into(),
            subtype: None,
            user: None,
            message: None,
            bot_tag: None,
            blocks: None,
            extra: Map::new(),
        }
    }

    pub fn has_subtype(&self) -> bool {
        self.subtype.is_some()
    }

    pub fn mentions(&self, tag: &MentionTag) -> bool {
        self.text.contains(tag.as_str())
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.channel, &self.ts)
    }

    /// The thread a reply belongs in. Un-threaded messages root their own thread.
    pub fn thread_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    /// Fills the derived fields the evaluator reads.
    pub fn enrich(&mut self, tag: Option<&MentionTag>) {
        if self.thread_ts.is_none() {
            self.thread_ts = Some(self.ts.clone());
        }
        self.message = Some(self.text.clone());
        self.bot_tag = tag.map(|t| t.to_string());
        self.blocks = Some(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_dedup_key_is_deterministic() {
        let a = MessageEvent::new("C1", "100", "hello");
        let b = MessageEvent::new("C1", "100", "something else");

        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key().as_str(), "C1_100");
        assert_ne!(a.dedup_key(), MessageEvent::new("C1", "101", "").dedup_key());
    }

    #[test]
    fn test_mention_detection() {
        let tag = MentionTag::for_user("UBOT");
        assert_eq!(tag.as_str(), "<@UBOT>");

        assert!(MessageEvent::new("C1", "1", "<@UBOT> help").mentions(&tag));
        assert!(MessageEvent::new("C1", "1", "hey <@UBOT>, look").mentions(&tag));
        assert!(!MessageEvent::new("C1", "1", "hey UBOT").mentions(&tag));
        assert!(!MessageEvent::new("C1", "1", "<@UOTHER> help").mentions(&tag));
    }

    #[test]
    fn test_enrich_defaults_thread() {
        let mut event = MessageEvent::new("C1", "100", "hello");
        assert_eq!(event.thread_ts(), "100");

        event.enrich(Some(&MentionTag::for_user("UBOT")));

        assert_eq!(event.thread_ts.as_deref(), Some("100"));
        assert_eq!(event.message.as_deref(), Some("hello"));
        assert_eq!(event.bot_tag.as_deref(), Some("<@UBOT>"));
        assert_eq!(event.blocks, Some(vec![]));
    }

    #[test]
    fn test_enrich_keeps_existing_thread() {
        let mut event = MessageEvent::new("C1", "105", "reply");
        event.thread_ts = Some("100".to_owned());

        event.enrich(None);

        assert_eq!(event.thread_ts(), "100");
        assert!(event.bot_tag.is_none());
    }

    #[test]
    fn test_unknown_fields_survive() {
        let raw = json!({
            "type": "message",
            "channel": "C1",
            "ts": "100.0001",
            "text": "hi",
            "user": "U1",
            "team": "T1",
            "blocks": [{"type": "rich_text"}],
            "client_msg_id": "abc"
        });

        let mut event: MessageEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.user.as_deref(), Some("U1"));
        assert_eq!(event.extra.get("team"), Some(&json!("T1")));

        event.enrich(None);
        let out = serde_json::to_value(&event).unwrap();

        assert_eq!(out["type"], "message");
        assert_eq!(out["client_msg_id"], "abc");
        assert_eq!(out["thread_ts"], "100.0001");
        assert_eq!(out["message"], "hi");
        assert_eq!(out["blocks"], json!([]));
    }

    #[test]
    fn test_subtype() {
        let raw = json!({
            "channel": "C1",
            "ts": "1",
            "subtype": "message_changed"
        });
        let event: MessageEvent = serde_json::from_value(raw).unwrap();
        assert!(event.has_subtype());
        assert!(!MessageEvent::new("C1", "1", "").has_subtype());
    }
}
