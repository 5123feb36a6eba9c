use std::sync::Arc;

use tracing::info;

use super::commit::{CommitOutcome, TwoPhaseCommit, commit_with_prompt};
use crate::api::{CallLogRequest, NoteRequest, SkateWarning};
use crate::context::CrmContext;
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::types::Activity;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub content: String,
    /// Activity being replied to. Replies to replies land on the thread parent.
    pub reply_to: Option<String>,
    pub mentioned_user_ids: Vec<String>,
}

/// Thread parent for a reply to `target`. Threads are two levels deep.
#[must_use]
pub fn thread_parent_id(target: &Activity) -> String {
    target
        .parent_id
        .clone()
        .unwrap_or_else(|| target.id.clone())
}

/// Notes and call logs for one lead, each behind its own warning flow.
pub struct ActivityComposer {
    ctx: CrmContext,
    lead_id: String,
    notes: TwoPhaseCommit<NoteRequest>,
    calls: TwoPhaseCommit<CallLogRequest>,
}

impl ActivityComposer {
    pub fn new(ctx: CrmContext, lead_id: impl Into<String>) -> Self {
        let lead_id = lead_id.into();
        ctx.cache.watch(&lead_id);
        Self {
            ctx,
            lead_id,
            notes: TwoPhaseCommit::new(),
            calls: TwoPhaseCommit::new(),
        }
    }

    pub fn note_request(&self, draft: NoteDraft) -> Result<NoteRequest> {
        let content = draft.content.trim().to_string();
        if content.is_empty() {
            return Err(Error::validation("Note content cannot be empty"));
        }

        let parent_id = draft.reply_to.map(|target_id| {
            self.ctx
                .cache
                .find_activity(&self.lead_id, &target_id)
                .map_or(target_id, |target| thread_parent_id(&target))
        });

        Ok(NoteRequest {
            content,
            parent_id,
            mentioned_user_ids: draft.mentioned_user_ids,
            confirm_skate: false,
        })
    }

    pub async fn add_note(&mut self, draft: NoteDraft) -> Result<CommitOutcome<Activity>> {
        let request = self.note_request(draft)?;
        let api = Arc::clone(&self.ctx.api);
        let lead_id = self.lead_id.clone();
        let outcome = self
            .notes
            .attempt(request, move |req| async move { api.add_note(&lead_id, &req).await })
            .await?;
        self.after(outcome).await
    }

    pub async fn confirm_note(&mut self) -> Result<CommitOutcome<Activity>> {
        let api = Arc::clone(&self.ctx.api);
        let lead_id = self.lead_id.clone();
        let outcome = self
            .notes
            .confirm(move |req| async move { api.add_note(&lead_id, &req).await })
            .await?;
        self.after(outcome).await
    }

    pub async fn log_call(&mut self, request: CallLogRequest) -> Result<CommitOutcome<Activity>> {
        let api = Arc::clone(&self.ctx.api);
        let lead_id = self.lead_id.clone();
        let outcome = self
            .calls
            .attempt(request, move |req| async move { api.log_call(&lead_id, &req).await })
            .await?;
        self.after(outcome).await
    }

    pub async fn confirm_call(&mut self) -> Result<CommitOutcome<Activity>> {
        let api = Arc::clone(&self.ctx.api);
        let lead_id = self.lead_id.clone();
        let outcome = self
            .calls
            .confirm(move |req| async move { api.log_call(&lead_id, &req).await })
            .await?;
        self.after(outcome).await
    }

    pub fn dismiss(&mut self) -> Option<SkateWarning> {
        self.notes.dismiss().or_else(|| self.calls.dismiss())
    }

    /// Add a note, asking `prompter` to confirm if warned. `None` if declined.
    pub async fn add_note_interactive(
        &mut self,
        draft: NoteDraft,
        prompter: &dyn Prompter,
    ) -> Result<Option<Activity>> {
        let request = self.note_request(draft)?;
        let api = Arc::clone(&self.ctx.api);
        let lead_id = self.lead_id.clone();
        let committed = commit_with_prompt(&mut self.notes, request, prompter, |req| {
            let api = Arc::clone(&api);
            let lead_id = lead_id.clone();
            async move { api.add_note(&lead_id, &req).await }
        })
        .await?;
        if let Some(activity) = &committed {
            self.refresh(activity).await;
        }
        Ok(committed)
    }

    pub async fn log_call_interactive(
        &mut self,
        request: CallLogRequest,
        prompter: &dyn Prompter,
    ) -> Result<Option<Activity>> {
        let api = Arc::clone(&self.ctx.api);
        let lead_id = self.lead_id.clone();
        let committed = commit_with_prompt(&mut self.calls, request, prompter, |req| {
            let api = Arc::clone(&api);
            let lead_id = lead_id.clone();
            async move { api.log_call(&lead_id, &req).await }
        })
        .await?;
        if let Some(activity) = &committed {
            self.refresh(activity).await;
        }
        Ok(committed)
    }

    async fn after(&self, outcome: CommitOutcome<Activity>) -> Result<CommitOutcome<Activity>> {
        if let CommitOutcome::Committed(activity) = &outcome {
            self.refresh(activity).await;
        }
        Ok(outcome)
    }

    async fn refresh(&self, activity: &Activity) {
        info!(lead_id = %self.lead_id, activity_id = %activity.id, kind = ?activity.activity_type, "activity recorded");
        self.ctx
            .reconciler()
            .refresh_after_write(&self.lead_id, false)
            .await;
    }
}
