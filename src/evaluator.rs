//! Hand-off to the evaluation worker.
//!
//! Two transports exist: [`local::LocalEvaluator`] posts the event to an
//! evaluator running beside this process without waiting for it, and
//! [`lambda::LambdaEvaluator`] submits an asynchronous Lambda invocation.

use crate::{error::Error, event::MessageEvent, utils::BoxFuture};

pub mod lambda;
pub mod local;

/// Status code Lambda returns when an `Event` invocation is queued.
pub const ACCEPTED: i32 = 202;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Request handed to a detached task; its result is only logged.
    Detached,
    /// Remote invocation submitted and acknowledged with `status_code`.
    Invoked { status_code: i32 },
}

impl Dispatch {
    pub fn is_accepted(&self) -> bool {
        match self {
            Self::Detached => true,
            Self::Invoked { status_code } => *status_code == ACCEPTED,
        }
    }

    pub fn status_code(&self) -> Option<i32> {
        match self {
            Self::Detached => None,
            Self::Invoked { status_code } => Some(*status_code),
        }
    }
}

pub trait Evaluator: Send + Sync + 'static {
    /// Sends `event` for evaluation without waiting for the evaluation itself.
    fn dispatch<'a>(&'a self, event: &'a MessageEvent) -> BoxFuture<'a, Result<Dispatch, Error>>;
}
