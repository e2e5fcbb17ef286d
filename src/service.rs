use std::sync::Arc;

use aws_config::BehaviorVersion;
use secrecy::SecretString;

use crate::{
    config::{Config, Mode},
    evaluator::{lambda::LambdaEvaluator, local::LocalEvaluator, Evaluator},
    forwarder::Forwarder,
    policy::Policy,
    queue::sqs::SqsQueue,
    slack::client::SlackClient,
};

/// Shared application state handed to the HTTP handlers.
pub struct Service {
    policy: Policy,
    forwarder: Forwarder,
    signing_secret: SecretString,
    forward_token: Option<SecretString>,
}

#[bon::bon]
impl Service {
    #[builder]
    pub fn new(
        policy: Policy,
        forwarder: Forwarder,
        signing_secret: SecretString,
        forward_token: Option<SecretString>,
    ) -> Self {
        Self {
            policy,
            forwarder,
            signing_secret,
            forward_token,
        }
    }

    /// Builds the AWS and Slack clients described by `config`.
    pub async fn connect_with(config: Config) -> eyre::Result<Self> {
        let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;

        let chat = Arc::new(SlackClient::new(
            config.slack_api_base().to_owned(),
            config.slack_bot_token,
        )?);

        let evaluator: Arc<dyn Evaluator> = match config.mode {
            Mode::Dev => {
                if config.local_evaluator_url.is_none() {
                    tracing::warn!("LOCAL_EVALUATOR_URL is not set, mentioned messages will fail");
                }
                Arc::new(LocalEvaluator::bridged(
                    reqwest::Client::new(),
                    config.local_evaluator_url.as_deref(),
                )?)
            }
            Mode::Deployed => {
                if config.evaluator_lambda_arn.is_none() {
                    tracing::warn!("EVALUATOR_LAMBDA_ARN is not set, mentioned messages will fail");
                }
                Arc::new(LambdaEvaluator::new(
                    aws_sdk_lambda::Client::new(&aws),
                    config.evaluator_lambda_arn,
                ))
            }
        };

        if config.sqs_queue_url.is_none() {
            tracing::warn!("SQS_QUEUE_URL is not set, unmentioned messages will be dropped");
        }
        let queue = Arc::new(SqsQueue::new(
            aws_sdk_sqs::Client::new(&aws),
            config.sqs_queue_url,
        ));

        let policy = Policy::builder()
            .queue(queue)
            .evaluator(evaluator.clone())
            .chat(chat)
            .mode(config.mode)
            .build();

        tracing::info!(mode = %config.mode, "service configured");

        Ok(Self::builder()
            .policy(policy)
            .forwarder(Forwarder::new(evaluator))
            .signing_secret(config.slack_signing_secret)
            .maybe_forward_token(config.forward_token)
            .build())
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    pub fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    pub fn forward_token(&self) -> Option<&SecretString> {
        self.forward_token.as_ref()
    }
}
