use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::{CheckInRequest, CheckOutRequest};
use crate::context::CrmContext;
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::types::{Appointment, ShowroomVisit, VisitOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum VisitState {
    None,
    CheckedIn(ShowroomVisit),
}

impl VisitState {
    #[must_use]
    pub fn open_visit(&self) -> Option<&ShowroomVisit> {
        match self {
            Self::CheckedIn(visit) => Some(visit),
            Self::None => None,
        }
    }
}

/// Which appointment, if any, a check-in should link to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInTarget {
    /// Link when exactly one candidate exists, ask when several do.
    Auto,
    Appointment(String),
    Unlinked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    CheckedIn(ShowroomVisit),
    /// Several appointments could be linked; check in again with a choice.
    ChooseAppointment(Vec<Appointment>),
    /// The lead already had an open visit; state now reflects it.
    AlreadyCheckedIn(ShowroomVisit),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOut {
    pub outcome: VisitOutcome,
    pub notes: Option<String>,
    /// New time for the linked appointment when the outcome is a reschedule.
    pub reschedule_at: Option<DateTime<Utc>>,
}

/// Check-in/check-out workflow for one lead. At most one visit is open.
pub struct ShowroomController {
    ctx: CrmContext,
    lead_id: String,
    state: VisitState,
}

impl ShowroomController {
    pub fn new(ctx: CrmContext, lead_id: impl Into<String>) -> Self {
        let lead_id = lead_id.into();
        ctx.cache.watch(&lead_id);
        Self {
            ctx,
            lead_id,
            state: VisitState::None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &VisitState {
        &self.state
    }

    pub async fn refresh(&mut self) -> Result<&VisitState> {
        let visit = self.ctx.api.current_visit(&self.lead_id).await?;
        self.state = match visit {
            Some(v) if v.is_open() => VisitState::CheckedIn(v),
            _ => VisitState::None,
        };
        Ok(&self.state)
    }

    /// Appointments from the start of today on that a check-in may link to.
    fn linkable(&self, appointments: Vec<Appointment>) -> Vec<Appointment> {
        let today = self.ctx.local_now().date_naive();
        let tz = self.ctx.timezone();
        let mut candidates: Vec<Appointment> = appointments
            .into_iter()
            .filter(|a| a.status.is_linkable())
            .filter(|a| a.scheduled_at.with_timezone(&tz).date_naive() >= today)
            .collect();
        candidates.sort_by_key(|a| a.scheduled_at);
        candidates
    }

    pub async fn check_in(&mut self, target: CheckInTarget) -> Result<CheckInOutcome> {
        if let Some(open) = self.state.open_visit() {
            return Ok(CheckInOutcome::AlreadyCheckedIn(open.clone()));
        }

        let appointment_id = match target {
            CheckInTarget::Appointment(id) => Some(id),
            CheckInTarget::Unlinked => None,
            CheckInTarget::Auto => {
                let (current, appointments) = tokio::try_join!(
                    self.ctx.api.current_visit(&self.lead_id),
                    self.ctx.api.list_appointments(&self.lead_id)
                )?;
                if let Some(open) = current.filter(ShowroomVisit::is_open) {
                    self.state = VisitState::CheckedIn(open.clone());
                    return Ok(CheckInOutcome::AlreadyCheckedIn(open));
                }
                let mut candidates = self.linkable(appointments);
                match candidates.len() {
                    0 => None,
                    1 => candidates.pop().map(|a| a.id),
                    _ => return Ok(CheckInOutcome::ChooseAppointment(candidates)),
                }
            }
        };

        let request = CheckInRequest { appointment_id };
        match self.ctx.api.check_in(&self.lead_id, &request).await {
            Ok(visit) => {
                info!(lead_id = %self.lead_id, visit_id = %visit.id, appointment_id = ?visit.appointment_id, "checked in");
                self.state = VisitState::CheckedIn(visit.clone());
                self.ctx
                    .reconciler()
                    .refresh_after_write(&self.lead_id, false)
                    .await;
                Ok(CheckInOutcome::CheckedIn(visit))
            }
            Err(e) if e.is_already_checked_in() => {
                warn!(lead_id = %self.lead_id, "server reports an open visit, re-syncing");
                match self.refresh().await? {
                    VisitState::CheckedIn(visit) => Ok(CheckInOutcome::AlreadyCheckedIn(visit.clone())),
                    VisitState::None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Check in, asking `prompter` to pick when several appointments match.
    pub async fn check_in_interactive(&mut self, prompter: &dyn Prompter) -> Result<CheckInOutcome> {
        match self.check_in(CheckInTarget::Auto).await? {
            CheckInOutcome::ChooseAppointment(candidates) => {
                match prompter.choose_appointment(&candidates) {
                    Some(id) => self.check_in(CheckInTarget::Appointment(id)).await,
                    None => Ok(CheckInOutcome::Cancelled),
                }
            }
            other => Ok(other),
        }
    }

    async fn open_visit(&mut self, visit_id: &str) -> Result<ShowroomVisit> {
        if let Some(open) = self.state.open_visit().filter(|v| v.id == visit_id) {
            return Ok(open.clone());
        }
        self.refresh().await?;
        self.state
            .open_visit()
            .filter(|v| v.id == visit_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("open showroom visit {visit_id}")))
    }

    pub async fn check_out(&mut self, visit_id: &str, checkout: CheckOut) -> Result<()> {
        let visit = self.open_visit(visit_id).await?;

        let reschedule_scheduled_at =
            match (checkout.outcome, visit.appointment_id.as_ref()) {
                (VisitOutcome::Reschedule, Some(_)) => Some(checkout.reschedule_at.ok_or_else(
                    || Error::validation("A new date and time is required to reschedule the appointment"),
                )?),
                _ => None,
            };

        let request = CheckOutRequest {
            outcome: checkout.outcome,
            notes: checkout
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            reschedule_scheduled_at,
        };
        self.ctx.api.check_out(&visit.id, &request).await?;
        info!(lead_id = %self.lead_id, visit_id = %visit.id, outcome = %checkout.outcome, "checked out");
        self.state = VisitState::None;

        // Checkout may move the visit, the lead and the linked appointment.
        let reconciler = self.ctx.reconciler();
        let refreshed = tokio::try_join!(
            self.ctx.api.current_visit(&self.lead_id),
            reconciler.refresh_lead(&self.lead_id),
            reconciler.refresh_schedule(&self.lead_id),
            reconciler.refresh_activities(&self.lead_id)
        );
        match refreshed {
            Ok((current, ..)) => {
                if let Some(open) = current.filter(ShowroomVisit::is_open) {
                    self.state = VisitState::CheckedIn(open);
                }
            }
            Err(e) => warn!(lead_id = %self.lead_id, error = %e, "refresh after checkout failed"),
        }
        Ok(())
    }
}
