use std::sync::Arc;

use tracing::{info, warn};

use super::commit::{CommitOutcome, CommitState, TwoPhaseCommit, commit_with_prompt};
use super::pipeline::StagePipeline;
use crate::api::{SkateWarning, StatusChangeRequest};
use crate::context::CrmContext;
use crate::error::{Error, Result};
use crate::prompt::{NoteChoice, Prompter};
use crate::types::{Lead, Stage};

/// What the UI must collect before a transition can be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Target equals the current stage; nothing to send.
    Unchanged,
    CommitNow(Stage),
    RequireLostReason(Stage),
    OfferNote(Stage),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Committed(Lead),
    NeedsConfirmation(SkateWarning),
    Unchanged,
    Cancelled,
}

impl From<CommitOutcome<Lead>> for TransitionOutcome {
    fn from(outcome: CommitOutcome<Lead>) -> Self {
        match outcome {
            CommitOutcome::Committed(lead) => Self::Committed(lead),
            CommitOutcome::NeedsConfirmation(warning) => Self::NeedsConfirmation(warning),
        }
    }
}

/// Drives lead stage changes. The local stage only changes once the server
/// acknowledges the write.
///
/// Not bound to one lead: each transition watches the lead it targets so
/// the acknowledged stage and refreshed timeline land in the cache.
pub struct StageController {
    ctx: CrmContext,
    pipeline: StagePipeline,
    commit: TwoPhaseCommit<StatusChangeRequest>,
    pending_lead_id: Option<String>,
}

impl StageController {
    pub fn new(ctx: CrmContext, pipeline: StagePipeline) -> Self {
        Self {
            ctx,
            pipeline,
            commit: TwoPhaseCommit::new(),
            pending_lead_id: None,
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &StagePipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn commit_state(&self) -> &CommitState<StatusChangeRequest> {
        self.commit.state()
    }

    pub fn plan(&self, lead: &Lead, target: &str) -> Result<TransitionPlan> {
        let stage = self
            .pipeline
            .find(target)
            .ok_or_else(|| Error::validation(format!("Unknown stage: {}", target.trim())))?
            .clone();

        if stage.name.eq_ignore_ascii_case(&lead.stage) {
            return Ok(TransitionPlan::Unchanged);
        }
        if stage.is_lost() {
            return Ok(TransitionPlan::RequireLostReason(stage));
        }
        if stage.is_terminal {
            return Ok(TransitionPlan::OfferNote(stage));
        }
        Ok(TransitionPlan::CommitNow(stage))
    }

    fn build_request(
        &self,
        lead: &Lead,
        target: &str,
        note: Option<String>,
    ) -> Result<Option<StatusChangeRequest>> {
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let stage = match self.plan(lead, target)? {
            TransitionPlan::Unchanged => return Ok(None),
            TransitionPlan::RequireLostReason(stage) => {
                if note.is_none() {
                    return Err(Error::validation(
                        "A reason is required to mark a lead as lost",
                    ));
                }
                stage
            }
            TransitionPlan::OfferNote(stage) | TransitionPlan::CommitNow(stage) => stage,
        };

        Ok(Some(StatusChangeRequest {
            status: stage.name,
            notes: note,
            confirm: false,
        }))
    }

    /// Send the transition. For "lost", `note` is the required reason; for
    /// other terminal stages it is optional.
    pub async fn commit(
        &mut self,
        lead: &Lead,
        target: &str,
        note: Option<String>,
    ) -> Result<TransitionOutcome> {
        let Some(request) = self.build_request(lead, target, note)? else {
            return Ok(TransitionOutcome::Unchanged);
        };
        info!(lead_id = %lead.id, from = %lead.stage, to = %request.status, "requesting stage transition");
        self.ctx.cache.watch(&lead.id);

        self.pending_lead_id = Some(lead.id.clone());
        let api = Arc::clone(&self.ctx.api);
        let lead_id = lead.id.clone();
        let outcome = self
            .commit
            .attempt(request, move |req| async move {
                api.update_status(&lead_id, &req).await
            })
            .await;
        self.settle(outcome).await
    }

    /// Resend the warned transition with confirmation.
    pub async fn confirm(&mut self) -> Result<TransitionOutcome> {
        let lead_id = self
            .pending_lead_id
            .clone()
            .ok_or(Error::NoPendingConfirmation)?;
        let api = Arc::clone(&self.ctx.api);
        let outcome = self
            .commit
            .confirm(move |req| async move { api.update_status(&lead_id, &req).await })
            .await;
        self.settle(outcome).await
    }

    pub fn dismiss(&mut self) -> Option<SkateWarning> {
        self.pending_lead_id = None;
        self.commit.dismiss()
    }

    async fn settle(&mut self, outcome: Result<CommitOutcome<Lead>>) -> Result<TransitionOutcome> {
        match outcome {
            Ok(CommitOutcome::Committed(lead)) => {
                self.pending_lead_id = None;
                Ok(TransitionOutcome::Committed(self.on_committed(lead).await))
            }
            Ok(CommitOutcome::NeedsConfirmation(warning)) => {
                Ok(TransitionOutcome::NeedsConfirmation(warning))
            }
            Err(e) => {
                self.pending_lead_id = None;
                warn!(error = %e, "stage transition failed, local stage unchanged");
                Err(e)
            }
        }
    }

    async fn on_committed(&self, lead: Lead) -> Lead {
        info!(lead_id = %lead.id, stage = %lead.stage, "stage transition committed");
        self.ctx.cache.store_lead(lead.clone());
        self.ctx
            .reconciler()
            .refresh_after_write(&lead.id, false)
            .await;
        lead
    }

    /// Full interactive flow: collect reason or note, commit, and confirm
    /// through `prompter` when warned.
    pub async fn request_transition(
        &mut self,
        lead: &Lead,
        target: &str,
        prompter: &dyn Prompter,
    ) -> Result<TransitionOutcome> {
        let note = match self.plan(lead, target)? {
            TransitionPlan::Unchanged => return Ok(TransitionOutcome::Unchanged),
            TransitionPlan::CommitNow(_) => None,
            TransitionPlan::RequireLostReason(_) => match prompter.lost_reason(lead) {
                Some(reason) => Some(reason),
                None => return Ok(TransitionOutcome::Cancelled),
            },
            TransitionPlan::OfferNote(stage) => match prompter.terminal_note(lead, &stage) {
                NoteChoice::Note(note) => Some(note),
                NoteChoice::Skip => None,
                NoteChoice::Cancel => return Ok(TransitionOutcome::Cancelled),
            },
        };

        let Some(request) = self.build_request(lead, target, note)? else {
            return Ok(TransitionOutcome::Unchanged);
        };
        self.ctx.cache.watch(&lead.id);
        let api = Arc::clone(&self.ctx.api);
        let lead_id = lead.id.clone();
        let committed = commit_with_prompt(&mut self.commit, request, prompter, |req| {
            let api = Arc::clone(&api);
            let lead_id = lead_id.clone();
            async move { api.update_status(&lead_id, &req).await }
        })
        .await;

        match committed {
            Ok(Some(lead)) => Ok(TransitionOutcome::Committed(self.on_committed(lead).await)),
            Ok(None) => Ok(TransitionOutcome::Cancelled),
            Err(e) => {
                warn!(error = %e, "stage transition failed, local stage unchanged");
                Err(e)
            }
        }
    }
}
