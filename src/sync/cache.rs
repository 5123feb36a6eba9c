use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::types::{Activity, Appointment, FollowUp, Lead};

/// Logical recency stamp. Larger tokens were issued later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchToken(u64);

#[derive(Debug, Default)]
struct CacheEntry {
    lead: Option<Lead>,
    lead_token: u64,
    activities: Vec<Activity>,
    activities_token: u64,
    appointments: Vec<Appointment>,
    follow_ups: Vec<FollowUp>,
    schedule_token: u64,
    schedule_revision: u64,
}

/// Shared per-lead state for every open view of a lead.
///
/// Fetches take a token when they start; a result is applied only if no
/// newer write (patch or fetch) has landed since. Network completion order
/// therefore never decides which value wins.
#[derive(Debug, Default)]
pub struct LeadCache {
    next_token: AtomicU64,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleSnapshot {
    pub appointments: Vec<Appointment>,
    pub follow_ups: Vec<FollowUp>,
    /// Bumped whenever the lists change.
    pub revision: u64,
}

impl LeadCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start tracking a lead. Results for untracked leads are dropped.
    pub fn watch(&self, lead_id: &str) {
        self.entries().entry(lead_id.to_string()).or_default();
    }

    /// Stop tracking a lead; in-flight fetches for it become no-ops.
    pub fn release(&self, lead_id: &str) -> bool {
        self.entries().remove(lead_id).is_some()
    }

    #[must_use]
    pub fn is_watched(&self, lead_id: &str) -> bool {
        self.entries().contains_key(lead_id)
    }

    pub fn begin_fetch(&self) -> FetchToken {
        FetchToken(self.issue())
    }

    pub fn complete_lead_fetch(&self, lead_id: &str, token: FetchToken, lead: Lead) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(lead_id) else {
            return false;
        };
        if token.0 <= entry.lead_token {
            debug!(lead_id, token = token.0, current = entry.lead_token, "discarding stale lead fetch");
            return false;
        }
        entry.lead = Some(lead);
        entry.lead_token = token.0;
        true
    }

    pub fn complete_activities_fetch(
        &self,
        lead_id: &str,
        token: FetchToken,
        activities: Vec<Activity>,
    ) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(lead_id) else {
            return false;
        };
        if token.0 <= entry.activities_token {
            debug!(lead_id, token = token.0, "discarding stale activity fetch");
            return false;
        }
        entry.activities = activities;
        entry.activities_token = token.0;
        true
    }

    pub fn complete_schedule_fetch(
        &self,
        lead_id: &str,
        token: FetchToken,
        appointments: Vec<Appointment>,
        follow_ups: Vec<FollowUp>,
    ) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(lead_id) else {
            return false;
        };
        if token.0 <= entry.schedule_token {
            debug!(lead_id, token = token.0, "discarding stale schedule fetch");
            return false;
        }
        entry.appointments = appointments;
        entry.follow_ups = follow_ups;
        entry.schedule_token = token.0;
        entry.schedule_revision += 1;
        true
    }

    /// Store a lead returned by a mutation as the newest known state.
    pub fn store_lead(&self, lead: Lead) -> bool {
        let token = self.begin_fetch();
        let lead_id = lead.id.clone();
        self.complete_lead_fetch(&lead_id, token, lead)
    }

    /// Merge touched fields into the cached lead. Returns false when there
    /// is nothing cached to patch.
    pub fn patch_lead(&self, lead_id: &str, patch: impl FnOnce(&mut Lead)) -> bool {
        let token = self.issue();
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(lead_id) else {
            return false;
        };
        let Some(lead) = entry.lead.as_mut() else {
            return false;
        };
        patch(lead);
        entry.lead_token = token;
        true
    }

    #[must_use]
    pub fn lead(&self, lead_id: &str) -> Option<Lead> {
        self.entries().get(lead_id).and_then(|e| e.lead.clone())
    }

    #[must_use]
    pub fn activities(&self, lead_id: &str) -> Vec<Activity> {
        self.entries()
            .get(lead_id)
            .map(|e| e.activities.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn find_activity(&self, lead_id: &str, activity_id: &str) -> Option<Activity> {
        self.entries()
            .get(lead_id)
            .and_then(|e| e.activities.iter().find(|a| a.id == activity_id).cloned())
    }

    #[must_use]
    pub fn schedule(&self, lead_id: &str) -> ScheduleSnapshot {
        self.entries()
            .get(lead_id)
            .map(|e| ScheduleSnapshot {
                appointments: e.appointments.clone(),
                follow_ups: e.follow_ups.clone(),
                revision: e.schedule_revision,
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lead(id: &str, stage: &str) -> Lead {
        Lead {
            id: id.into(),
            first_name: "Avery".into(),
            last_name: "Stone".into(),
            email: None,
            phone: None,
            stage: stage.into(),
            dealership_id: None,
            assigned_to: None,
            secondary_salesperson: None,
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stale_fetch_does_not_overwrite_patch() {
        let cache = LeadCache::new();
        cache.watch("l1");
        assert!(cache.store_lead(lead("l1", "new")));

        let token = cache.begin_fetch();
        assert!(cache.patch_lead("l1", |l| l.stage = "contacted".into()));

        assert!(!cache.complete_lead_fetch("l1", token, lead("l1", "new")));
        assert_eq!(cache.lead("l1").unwrap().stage, "contacted");
    }

    #[test]
    fn test_newer_fetch_wins_regardless_of_completion_order() {
        let cache = LeadCache::new();
        cache.watch("l1");
        let older = cache.begin_fetch();
        let newer = cache.begin_fetch();

        assert!(cache.complete_lead_fetch("l1", newer, lead("l1", "qualified")));
        assert!(!cache.complete_lead_fetch("l1", older, lead("l1", "new")));
        assert_eq!(cache.lead("l1").unwrap().stage, "qualified");
    }

    #[test]
    fn test_released_lead_ignores_results() {
        let cache = LeadCache::new();
        cache.watch("l1");
        let token = cache.begin_fetch();
        assert!(cache.release("l1"));
        assert!(!cache.complete_lead_fetch("l1", token, lead("l1", "new")));
        assert!(cache.lead("l1").is_none());
    }

    #[test]
    fn test_patch_without_cached_lead() {
        let cache = LeadCache::new();
        cache.watch("l1");
        assert!(!cache.patch_lead("l1", |l| l.stage = "lost".into()));
    }

    #[test]
    fn test_schedule_revision_bumps() {
        let cache = LeadCache::new();
        cache.watch("l1");
        assert_eq!(cache.schedule("l1").revision, 0);
        let token = cache.begin_fetch();
        assert!(cache.complete_schedule_fetch("l1", token, Vec::new(), Vec::new()));
        assert_eq!(cache.schedule("l1").revision, 1);
    }
}
