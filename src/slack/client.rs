use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::utils::BoxFuture;

use super::ChatPlatform;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Status {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTest {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ConversationInfo {
    channel: Conversation,
}

#[derive(Debug, Deserialize)]
struct Conversation {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    name: Option<String>,
    #[serde(default)]
    profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
struct Profile {
    display_name: Option<String>,
    real_name: Option<String>,
}

impl User {
    fn display_name(self) -> String {
        [self.profile.display_name, self.profile.real_name, self.name]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or(self.id)
    }
}

pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
}

impl SlackClient {
    pub fn new(api_base: impl AsRef<str>, bot_token: SecretString) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.as_ref().trim_end_matches('/').to_owned(),
            bot_token,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> eyre::Result<T> {
        let bytes = request
            .bearer_auth(self.bot_token.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let status: Status = serde_json::from_slice(&bytes)?;
        if !status.ok {
            return Err(eyre::eyre!(
                "slack {method} failed: {}",
                status.error.as_deref().unwrap_or("unknown error")
            ));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ChatPlatform for SlackClient {
    fn bot_user_id(&self) -> BoxFuture<'_, eyre::Result<String>> {
        Box::pin(async move {
            let request = self.http.post(self.endpoint("auth.test"));
            let auth: AuthTest = self.call("auth.test", request).await?;
            Ok(auth.user_id)
        })
    }

    fn conversation_name<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, eyre::Result<String>> {
        Box::pin(async move {
            let request = self
                .http
                .get(self.endpoint("conversations.info"))
                .query(&[("channel", channel)]);
            let info: ConversationInfo = self.call("conversations.info", request).await?;
            Ok(info.channel.name.unwrap_or(info.channel.id))
        })
    }

    fn user_display_name<'a>(&'a self, user: &'a str) -> BoxFuture<'a, eyre::Result<String>> {
        Box::pin(async move {
            let request = self
                .http
                .get(self.endpoint("users.info"))
                .query(&[("user", user)]);
            let info: UserInfo = self.call("users.info", request).await?;
            Ok(info.user.display_name())
        })
    }

    fn post_message<'a>(
        &'a self,
        channel: &'a str,
        thread_ts: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            let request = self.http.post(self.endpoint("chat.postMessage")).json(&json!({
                "channel": channel,
                "thread_ts": thread_ts,
                "text": text,
            }));
            let _: serde_json::Value = self.call("chat.postMessage", request).await?;
            Ok(())
        })
    }
}
