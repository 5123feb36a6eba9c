use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::cache::LeadCache;
use super::events::{LeadUpdateEvent, NewActivityEvent, PushEvent};
use crate::api::LeadApi;
use crate::error::Result;

/// What a push event caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Patched,
    LeadRefetched,
    ActivitiesRefreshed,
    ActivitiesAndLeadRefreshed,
    Ignored,
}

/// Applies server pushes and refreshes to the shared [`LeadCache`].
#[derive(Clone)]
pub struct Reconciler {
    api: Arc<dyn LeadApi>,
    cache: Arc<LeadCache>,
    activity_page_size: usize,
}

impl Reconciler {
    pub fn new(api: Arc<dyn LeadApi>, cache: Arc<LeadCache>, activity_page_size: usize) -> Self {
        Self {
            api,
            cache,
            activity_page_size,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &LeadCache {
        &self.cache
    }

    /// Returns whether the fetched lead was applied.
    pub async fn refresh_lead(&self, lead_id: &str) -> Result<bool> {
        let token = self.cache.begin_fetch();
        let lead = self.api.get_lead(lead_id).await?;
        Ok(self.cache.complete_lead_fetch(lead_id, token, lead))
    }

    /// Reloads the newest page of the timeline.
    pub async fn refresh_activities(&self, lead_id: &str) -> Result<bool> {
        let token = self.cache.begin_fetch();
        let page = self
            .api
            .list_timeline(lead_id, 1, self.activity_page_size)
            .await?;
        Ok(self
            .cache
            .complete_activities_fetch(lead_id, token, page.items))
    }

    pub async fn refresh_schedule(&self, lead_id: &str) -> Result<bool> {
        let token = self.cache.begin_fetch();
        let (appointments, follow_ups) = tokio::try_join!(
            self.api.list_appointments(lead_id),
            self.api.list_follow_ups(lead_id)
        )?;
        Ok(self
            .cache
            .complete_schedule_fetch(lead_id, token, appointments, follow_ups))
    }

    /// Load everything a lead view shows.
    pub async fn load(&self, lead_id: &str) -> Result<()> {
        self.cache.watch(lead_id);
        tokio::try_join!(
            self.refresh_lead(lead_id),
            self.refresh_activities(lead_id),
            self.refresh_schedule(lead_id)
        )?;
        Ok(())
    }

    /// Refresh after a successful write, logging instead of failing: the
    /// write itself already succeeded.
    pub async fn refresh_after_write(&self, lead_id: &str, include_lead: bool) {
        let activities = self.refresh_activities(lead_id);
        let result = if include_lead {
            tokio::try_join!(activities, self.refresh_lead(lead_id)).map(|_| ())
        } else {
            activities.await.map(|_| ())
        };
        if let Err(e) = result {
            warn!(lead_id, error = %e, "refresh after write failed");
        }
    }

    pub async fn handle_event(&self, event: PushEvent) -> Result<Reconciled> {
        if !self.cache.is_watched(event.lead_id()) {
            return Ok(Reconciled::Ignored);
        }
        match event {
            PushEvent::LeadUpdate(update) => self.handle_lead_update(update).await,
            PushEvent::NewActivity(activity) => self.handle_new_activity(activity).await,
        }
    }

    async fn handle_lead_update(&self, update: LeadUpdateEvent) -> Result<Reconciled> {
        if let Some(patch) = update.patch() {
            if !patch.is_empty() && self.cache.patch_lead(&update.lead_id, |lead| patch.apply(lead)) {
                debug!(lead_id = %update.lead_id, update_type = ?update.update_type, "patched lead");
                return Ok(Reconciled::Patched);
            }
        }
        self.refresh_lead(&update.lead_id).await?;
        Ok(Reconciled::LeadRefetched)
    }

    async fn handle_new_activity(&self, event: NewActivityEvent) -> Result<Reconciled> {
        if event.activity.activity_type.is_assignment() {
            tokio::try_join!(
                self.refresh_activities(&event.lead_id),
                self.refresh_lead(&event.lead_id)
            )?;
            Ok(Reconciled::ActivitiesAndLeadRefreshed)
        } else {
            self.refresh_activities(&event.lead_id).await?;
            Ok(Reconciled::ActivitiesRefreshed)
        }
    }

    /// Consume push events until the stream ends. Failures are logged and
    /// the next event is processed.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = PushEvent>,
    {
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            let lead_id = event.lead_id().to_string();
            match self.handle_event(event).await {
                Ok(outcome) => debug!(lead_id = %lead_id, ?outcome, "reconciled push event"),
                Err(e) => warn!(lead_id = %lead_id, error = %e, "failed to reconcile push event"),
            }
        }
        info!("push event stream closed");
    }
}
