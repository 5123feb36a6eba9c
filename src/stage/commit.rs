use std::future::Future;

use tracing::{debug, info};

use crate::api::{Confirmable, Mutation, SkateWarning};
use crate::error::{Error, Result};
use crate::prompt::Prompter;

/// Where a soft-blockable write currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitState<R> {
    Idle,
    Committing,
    /// The server warned; `retry` is the exact request to resend with its
    /// confirm flag set.
    PendingConfirmation { warning: SkateWarning, retry: R },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome<T> {
    Committed(T),
    NeedsConfirmation(SkateWarning),
}

/// Attempt, then (if warned) confirm and retry with the flag.
///
/// Shared by status changes, notes and call logs.
#[derive(Debug)]
pub struct TwoPhaseCommit<R> {
    state: CommitState<R>,
}

impl<R> Default for TwoPhaseCommit<R> {
    fn default() -> Self {
        Self {
            state: CommitState::Idle,
        }
    }
}

impl<R: Confirmable> TwoPhaseCommit<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &CommitState<R> {
        &self.state
    }

    #[must_use]
    pub fn pending_warning(&self) -> Option<&SkateWarning> {
        match &self.state {
            CommitState::PendingConfirmation { warning, .. } => Some(warning),
            _ => None,
        }
    }

    pub async fn attempt<T, F, Fut>(&mut self, request: R, send: F) -> Result<CommitOutcome<T>>
    where
        F: FnOnce(R) -> Fut,
        Fut: Future<Output = Result<Mutation<T>>>,
    {
        self.dispatch(request, send).await
    }

    /// Resend the warned request with its confirm flag.
    pub async fn confirm<T, F, Fut>(&mut self, send: F) -> Result<CommitOutcome<T>>
    where
        F: FnOnce(R) -> Fut,
        Fut: Future<Output = Result<Mutation<T>>>,
    {
        let retry = match std::mem::replace(&mut self.state, CommitState::Idle) {
            CommitState::PendingConfirmation { retry, .. } => retry.confirmed(),
            other => {
                self.state = other;
                return Err(Error::NoPendingConfirmation);
            }
        };
        info!("resubmitting warned request with confirmation");
        self.dispatch(retry, send).await
    }

    /// Drop a pending warning without resending.
    pub fn dismiss(&mut self) -> Option<SkateWarning> {
        match std::mem::replace(&mut self.state, CommitState::Idle) {
            CommitState::PendingConfirmation { warning, .. } => Some(warning),
            other => {
                self.state = other;
                None
            }
        }
    }

    async fn dispatch<T, F, Fut>(&mut self, request: R, send: F) -> Result<CommitOutcome<T>>
    where
        F: FnOnce(R) -> Fut,
        Fut: Future<Output = Result<Mutation<T>>>,
    {
        self.state = CommitState::Committing;
        match send(request.clone()).await {
            Ok(Mutation::Committed(value)) => {
                self.state = CommitState::Idle;
                Ok(CommitOutcome::Committed(value))
            }
            Ok(Mutation::Warning(warning)) => {
                debug!(confirmed = request.is_confirmed(), "write soft-blocked by server warning");
                self.state = CommitState::PendingConfirmation {
                    warning: warning.clone(),
                    retry: request,
                };
                Ok(CommitOutcome::NeedsConfirmation(warning))
            }
            Err(e) => {
                self.state = CommitState::Idle;
                Err(e)
            }
        }
    }
}

/// Run a write through the full attempt/confirm/retry cycle, asking the
/// user when warned. `None` means the user declined the warning.
pub async fn commit_with_prompt<R, T, F, Fut>(
    commit: &mut TwoPhaseCommit<R>,
    request: R,
    prompter: &dyn Prompter,
    send: F,
) -> Result<Option<T>>
where
    R: Confirmable,
    F: Fn(R) -> Fut,
    Fut: Future<Output = Result<Mutation<T>>>,
{
    let mut outcome = commit.attempt(request, &send).await?;
    loop {
        match outcome {
            CommitOutcome::Committed(value) => return Ok(Some(value)),
            CommitOutcome::NeedsConfirmation(warning) => {
                if !prompter.confirm_warning(&warning) {
                    commit.dismiss();
                    return Ok(None);
                }
                outcome = commit.confirm(&send).await?;
            }
        }
    }
}
