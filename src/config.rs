use secrecy::SecretString;
use serde::Deserialize;

/// Selects how mentioned messages reach the evaluator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Fire-and-forget HTTP call to an evaluator running next to this process.
    #[serde(alias = "development")]
    Dev,
    /// Asynchronous Lambda invocation.
    #[default]
    Deployed,
}

#[derive(Deserialize)]
pub struct Config {
    pub sqs_queue_url: Option<String>,
    pub evaluator_lambda_arn: Option<String>,
    pub slack_bot_token: SecretString,
    pub slack_signing_secret: SecretString,
    pub slack_api_base: Option<String>,
    /// Kept as written; loopback addresses are rewritten before parsing.
    pub local_evaluator_url: Option<String>,

    /// Bearer token required on the queue record endpoint when set.
    #[serde(rename = "slackq_forward_token")]
    pub forward_token: Option<SecretString>,

    #[serde(rename = "slackq_mode", default)]
    pub mode: Mode,
    #[serde(rename = "slackq_host")]
    pub host: Option<String>,
    #[serde(rename = "slackq_port")]
    pub port: Option<u16>,
}

impl Config {
    pub fn load() -> eyre::Result<Self> {
        Ok(envy::from_env::<Self>()?)
    }

    pub fn from_vars<I>(vars: I) -> eyre::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, Self>(vars)?)
    }

    pub fn slack_api_base(&self) -> &str {
        self.slack_api_base
            .as_deref()
            .unwrap_or("https://slack.com/api")
    }

    pub fn bind_addr(&self) -> (&str, u16) {
        (
            self.host.as_deref().unwrap_or("127.0.0.1"),
            self.port.unwrap_or(8080),
        )
    }
}
