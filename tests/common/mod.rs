#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use slackq::{
    config::Mode,
    error::Error,
    evaluator::{Dispatch, Evaluator},
    event::{DedupKey, MessageEvent},
    policy::Policy,
    queue::{CancelOutcome, DeferredQueue, Receipt},
    slack::ChatPlatform,
    utils::BoxFuture,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Cancel(String),
    Enqueue { key: String, group: String },
    Dispatch(String),
    Post { channel: String, thread_ts: String, text: String },
}

#[derive(Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
    events: Arc<Mutex<Vec<MessageEvent>>>,
}

impl Journal {
    pub fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn keep(&self, event: &MessageEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Events as they were handed to the queue or the evaluator.
    pub fn events(&self) -> Vec<MessageEvent> {
        self.events.lock().unwrap().clone()
    }
}

pub struct FakeQueue {
    pub journal: Journal,
    pub cancel: CancelOutcome,
    pub fail_enqueue: bool,
}

impl DeferredQueue for FakeQueue {
    fn enqueue<'a>(
        &'a self,
        event: &'a MessageEvent,
        key: &'a DedupKey,
    ) -> BoxFuture<'a, eyre::Result<Receipt>> {
        Box::pin(async move {
            self.journal.record(Call::Enqueue {
                key: key.to_string(),
                group: event.channel.clone(),
            });
            self.journal.keep(event);

            if self.fail_enqueue {
                return Err(eyre::eyre!("queue unavailable"));
            }

            Ok(Receipt {
                message_id: Some(format!("msg-{key}")),
                sequence_number: Some("1".to_owned()),
            })
        })
    }

    fn cancel_if_present<'a>(&'a self, key: &'a DedupKey) -> BoxFuture<'a, CancelOutcome> {
        Box::pin(async move {
            self.journal.record(Call::Cancel(key.to_string()));
            self.cancel.clone()
        })
    }
}

#[derive(Clone, Copy)]
pub enum Behaviour {
    Accept(i32),
    Detach,
    Fail,
}

pub struct FakeEvaluator {
    pub journal: Journal,
    pub behaviour: Behaviour,
}

impl Evaluator for FakeEvaluator {
    fn dispatch<'a>(&'a self, event: &'a MessageEvent) -> BoxFuture<'a, Result<Dispatch, Error>> {
        Box::pin(async move {
            self.journal
                .record(Call::Dispatch(event.dedup_key().to_string()));
            self.journal.keep(event);

            match self.behaviour {
                Behaviour::Accept(status_code) => Ok(Dispatch::Invoked { status_code }),
                Behaviour::Detach => Ok(Dispatch::Detached),
                Behaviour::Fail => Err(Error::dispatch(eyre::eyre!("connection refused"))),
            }
        })
    }
}

pub struct FakeChat {
    pub journal: Journal,
    pub bot_user: Option<String>,
}

impl ChatPlatform for FakeChat {
    fn bot_user_id(&self) -> BoxFuture<'_, eyre::Result<String>> {
        Box::pin(async move {
            self.bot_user
                .clone()
                .ok_or_else(|| eyre::eyre!("invalid_auth"))
        })
    }

    fn conversation_name<'a>(&'a self, channel: &'a str) -> BoxFuture<'a, eyre::Result<String>> {
        Box::pin(async move { Ok(format!("#{channel}")) })
    }

    fn user_display_name<'a>(&'a self, _user: &'a str) -> BoxFuture<'a, eyre::Result<String>> {
        Box::pin(async move { Err(eyre::eyre!("user_not_found")) })
    }

    fn post_message<'a>(
        &'a self,
        channel: &'a str,
        thread_ts: &'a str,
        text: &'a str,
    ) -> BoxFuture<'a, eyre::Result<()>> {
        Box::pin(async move {
            self.journal.record(Call::Post {
                channel: channel.to_owned(),
                thread_ts: thread_ts.to_owned(),
                text: text.to_owned(),
            });
            Ok(())
        })
    }
}

/// Knobs for a policy wired to fakes.
pub struct Setup {
    pub mode: Mode,
    pub cancel: CancelOutcome,
    pub fail_enqueue: bool,
    pub behaviour: Behaviour,
    pub bot_user: Option<String>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            mode: Mode::Deployed,
            cancel: CancelOutcome::NotFound,
            fail_enqueue: false,
            behaviour: Behaviour::Accept(202),
            bot_user: Some("BOT".to_owned()),
        }
    }
}

impl Setup {
    pub fn evaluator(&self, journal: &Journal) -> Arc<FakeEvaluator> {
        Arc::new(FakeEvaluator {
            journal: journal.clone(),
            behaviour: self.behaviour,
        })
    }

    pub fn policy(self, journal: &Journal) -> Policy {
        let evaluator = self.evaluator(journal);
        self.policy_with(journal, evaluator)
    }

    pub fn policy_with(self, journal: &Journal, evaluator: Arc<dyn Evaluator>) -> Policy {
        Policy::builder()
            .queue(Arc::new(FakeQueue {
                journal: journal.clone(),
                cancel: self.cancel,
                fail_enqueue: self.fail_enqueue,
            }))
            .evaluator(evaluator)
            .chat(Arc::new(FakeChat {
                journal: journal.clone(),
                bot_user: self.bot_user,
            }))
            .mode(self.mode)
            .build()
    }
}
