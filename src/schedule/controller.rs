use chrono::{DateTime, Utc};
use tracing::info;

use super::badge::{ScheduleMemo, ScheduleSummary};
use crate::api::{AppointmentUpdate, FollowUpUpdate};
use crate::context::CrmContext;
use crate::error::{Error, Result};
use crate::types::{Appointment, AppointmentStatus, FollowUp, FollowUpStatus};

/// Appointment and follow-up state for one lead, with a memoized summary.
pub struct ScheduleController {
    ctx: CrmContext,
    lead_id: String,
    memo: ScheduleMemo,
}

impl ScheduleController {
    pub fn new(ctx: CrmContext, lead_id: impl Into<String>) -> Self {
        let lead_id = lead_id.into();
        ctx.cache.watch(&lead_id);
        Self {
            ctx,
            lead_id,
            memo: ScheduleMemo::new(),
        }
    }

    pub async fn refresh(&self) -> Result<()> {
        self.ctx.reconciler().refresh_schedule(&self.lead_id).await?;
        Ok(())
    }

    /// Today/upcoming buckets and badge as of the context clock.
    pub fn summary(&mut self) -> &ScheduleSummary {
        let snapshot = self.ctx.cache.schedule(&self.lead_id);
        let now = self.ctx.local_now();
        self.memo.get(
            snapshot.revision,
            &snapshot.appointments,
            &snapshot.follow_ups,
            &now,
        )
    }

    async fn find_appointment(&self, appointment_id: &str) -> Result<Appointment> {
        if let Some(found) = self.cached_appointment(appointment_id) {
            return Ok(found);
        }
        self.refresh().await?;
        self.cached_appointment(appointment_id)
            .ok_or_else(|| Error::NotFound(format!("appointment {appointment_id}")))
    }

    fn cached_appointment(&self, appointment_id: &str) -> Option<Appointment> {
        self.ctx
            .cache
            .schedule(&self.lead_id)
            .appointments
            .into_iter()
            .find(|a| a.id == appointment_id)
    }

    pub async fn set_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment> {
        let current = self.find_appointment(appointment_id).await?;
        if !current.status.can_transition_to(status) {
            return Err(Error::validation(format!(
                "Cannot move appointment from {} to {}",
                current.status, status
            )));
        }

        let update = AppointmentUpdate {
            status: Some(status),
            scheduled_at: None,
        };
        let updated = self
            .ctx
            .api
            .update_appointment(appointment_id, &update)
            .await?;
        info!(lead_id = %self.lead_id, appointment_id, from = %current.status, to = %status, "appointment status changed");
        self.after_write().await;
        Ok(updated)
    }

    pub async fn reschedule_appointment(
        &self,
        appointment_id: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Appointment> {
        let current = self.find_appointment(appointment_id).await?;
        if current.status.is_terminal() {
            return Err(Error::validation(format!(
                "Cannot reschedule a {} appointment",
                current.status
            )));
        }
        let status = (current.status != AppointmentStatus::Rescheduled)
            .then_some(AppointmentStatus::Rescheduled);
        let update = AppointmentUpdate {
            status,
            scheduled_at: Some(scheduled_at),
        };
        let updated = self
            .ctx
            .api
            .update_appointment(appointment_id, &update)
            .await?;
        self.after_write().await;
        Ok(updated)
    }

    pub async fn complete_follow_up(&self, follow_up_id: &str) -> Result<FollowUp> {
        let snapshot = self.ctx.cache.schedule(&self.lead_id);
        if let Some(existing) = snapshot.follow_ups.iter().find(|f| f.id == follow_up_id) {
            if existing.status != FollowUpStatus::Pending {
                return Err(Error::validation("Follow-up is already completed"));
            }
        }

        let update = FollowUpUpdate {
            status: Some(FollowUpStatus::Completed),
            notes: None,
        };
        let updated = self
            .ctx
            .api
            .update_follow_up(follow_up_id, &update)
            .await?;
        info!(lead_id = %self.lead_id, follow_up_id, "follow-up completed");
        self.after_write().await;
        Ok(updated)
    }

    async fn after_write(&self) {
        let reconciler = self.ctx.reconciler();
        if let Err(e) = reconciler.refresh_schedule(&self.lead_id).await {
            tracing::warn!(lead_id = %self.lead_id, error = %e, "schedule refresh failed");
        }
        reconciler.refresh_after_write(&self.lead_id, false).await;
    }
}
