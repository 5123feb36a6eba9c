#![allow(dead_code)]

pub mod test_server;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use leadflow::api::*;
use leadflow::config::ClientConfig;
use leadflow::context::{CrmContext, FixedClock};
use leadflow::error::{Error, Result};
use leadflow::prompt::{NoteChoice, Prompter};
use leadflow::types::*;

pub const LEAD_ID: &str = "lead-1";

/// 2024-05-10 15:00 UTC, a Friday afternoon.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 15, 0, 0).unwrap()
}

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
}

pub fn lead(id: &str, stage: &str) -> Lead {
    Lead {
        id: id.into(),
        first_name: "Avery".into(),
        last_name: "Stone".into(),
        email: Some("avery@example.com".into()),
        phone: None,
        stage: stage.into(),
        dealership_id: Some("dealer-1".into()),
        assigned_to: Some("rep-1".into()),
        secondary_salesperson: None,
        notes: String::new(),
        created_at: at(1, 9, 0),
        updated_at: at(1, 9, 0),
    }
}

pub fn activity(id: &str, activity_type: ActivityType, created_at: DateTime<Utc>) -> Activity {
    Activity {
        id: id.into(),
        lead_id: LEAD_ID.into(),
        activity_type,
        description: format!("{activity_type:?}"),
        meta_data: json!({}),
        parent_id: None,
        user_name: Some("Jordan".into()),
        created_at,
    }
}

pub fn note(id: &str, parent_id: Option<&str>, created_at: DateTime<Utc>) -> Activity {
    Activity {
        meta_data: json!({ "content": format!("note {id}") }),
        parent_id: parent_id.map(Into::into),
        ..activity(id, ActivityType::NoteAdded, created_at)
    }
}

pub fn appointment(id: &str, scheduled_at: DateTime<Utc>, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: id.into(),
        lead_id: LEAD_ID.into(),
        scheduled_at,
        status,
        duration_minutes: 30,
        title: Some(format!("Test drive {id}")),
    }
}

pub fn follow_up(id: &str, scheduled_at: DateTime<Utc>) -> FollowUp {
    FollowUp {
        id: id.into(),
        lead_id: LEAD_ID.into(),
        scheduled_at,
        status: FollowUpStatus::Pending,
        notes: Some(format!("Call back {id}")),
    }
}

pub fn open_visit(id: &str, appointment_id: Option<&str>) -> ShowroomVisit {
    ShowroomVisit {
        id: id.into(),
        lead_id: LEAD_ID.into(),
        checked_in_at: at(10, 14, 0),
        checked_out_at: None,
        appointment_id: appointment_id.map(Into::into),
        outcome: None,
    }
}

pub fn document(id: &str, file_name: &str, category_id: Option<&str>) -> StipDocument {
    StipDocument {
        id: id.into(),
        lead_id: LEAD_ID.into(),
        file_name: file_name.into(),
        content_type: "application/pdf".into(),
        category_id: category_id.map(Into::into),
        created_at: at(2, 10, 0),
    }
}

pub fn category(id: &str, name: &str) -> DocumentCategory {
    DocumentCategory {
        id: id.into(),
        name: name.into(),
    }
}

fn api_error(status: u16, message: &str) -> Error {
    Error::Api {
        status,
        message: message.into(),
    }
}

/// Server-side state behind [`FakeApi`].
#[derive(Default)]
pub struct FakeState {
    pub leads: HashMap<String, Lead>,
    pub stages: Vec<Stage>,
    /// Per lead, any order; served newest first.
    pub activities: HashMap<String, Vec<Activity>>,
    pub appointments: Vec<Appointment>,
    pub follow_ups: Vec<FollowUp>,
    pub visits: Vec<ShowroomVisit>,
    pub documents: Vec<StipDocument>,
    pub categories: Vec<DocumentCategory>,
    pub credit_applications: Vec<CreditApplication>,

    /// Unconfirmed status changes come back as a skate warning.
    pub warn_on_status: bool,
    /// Unconfirmed notes come back as a skate warning.
    pub warn_on_note: bool,
    pub failing_downloads: HashSet<String>,
    pub failing_view_urls: HashSet<String>,

    pub status_requests: Vec<StatusChangeRequest>,
    pub note_requests: Vec<NoteRequest>,
    pub check_in_requests: Vec<CheckInRequest>,
    pub check_out_requests: Vec<CheckOutRequest>,
    next_id: usize,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    pub fn push_activity(&mut self, activity: Activity) {
        self.activities
            .entry(activity.lead_id.clone())
            .or_default()
            .push(activity);
    }

    fn timeline(&self, lead_id: &str) -> Vec<Activity> {
        let mut items = self.activities.get(lead_id).cloned().unwrap_or_default();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}

/// In-memory CRM that records every call it receives.
#[derive(Default)]
pub struct FakeApi {
    pub state: Mutex<FakeState>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub peak_downloads: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        {
            let mut state = api.state();
            state.leads.insert(LEAD_ID.into(), lead(LEAD_ID, "contacted"));
            state.stages = ClientConfig::default().stages;
        }
        api
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls to `method`.
    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(':').next() == Some(method))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

fn skate(message: &str) -> SkateWarning {
    serde_json::from_value(json!({
        "skate_warning": true,
        "message": message,
        "assigned_to": "rep-2",
    }))
    .unwrap()
}

#[async_trait]
impl LeadApi for FakeApi {
    async fn get_lead(&self, lead_id: &str) -> Result<Lead> {
        self.record(format!("get_lead:{lead_id}"));
        self.state()
            .leads
            .get(lead_id)
            .cloned()
            .ok_or_else(|| api_error(404, "Lead not found"))
    }

    async fn list_stages(&self) -> Result<Vec<Stage>> {
        self.record("list_stages");
        Ok(self.state().stages.clone())
    }

    async fn update_status(&self, lead_id: &str, req: &StatusChangeRequest) -> Result<Mutation<Lead>> {
        self.record(format!("update_status:{lead_id}"));
        let mut state = self.state();
        state.status_requests.push(req.clone());
        if state.warn_on_status && !req.confirm {
            return Ok(Mutation::Warning(skate(
                "This lead is being worked by another salesperson.",
            )));
        }
        let id = state.next_id("act");
        let lead = state
            .leads
            .get_mut(lead_id)
            .ok_or_else(|| api_error(404, "Lead not found"))?;
        lead.stage = req.status.clone();
        lead.updated_at = now();
        let lead = lead.clone();
        state.push_activity(Activity {
            id,
            lead_id: lead_id.into(),
            activity_type: ActivityType::StatusChanged,
            description: format!("Status changed to {}", req.status),
            meta_data: json!({ "notes": req.notes }),
            parent_id: None,
            user_name: Some("Jordan".into()),
            created_at: now(),
        });
        Ok(Mutation::Committed(lead))
    }

    async fn list_timeline(&self, lead_id: &str, page: usize, page_size: usize) -> Result<Page<Activity>> {
        self.record(format!("list_timeline:{page}"));
        let all = self.state().timeline(lead_id);
        let total = all.len();
        let items = all
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        Ok(Page { items, total })
    }

    async fn add_note(&self, lead_id: &str, req: &NoteRequest) -> Result<Mutation<Activity>> {
        self.record(format!("add_note:{lead_id}"));
        let mut state = self.state();
        state.note_requests.push(req.clone());
        if state.warn_on_note && !req.confirm_skate {
            return Ok(Mutation::Warning(skate("Another salesperson owns this lead.")));
        }
        let activity = Activity {
            meta_data: json!({ "content": req.content }),
            parent_id: req.parent_id.clone(),
            ..activity(&state.next_id("note"), ActivityType::NoteAdded, now())
        };
        state.push_activity(activity.clone());
        Ok(Mutation::Committed(activity))
    }

    async fn log_call(&self, lead_id: &str, req: &CallLogRequest) -> Result<Mutation<Activity>> {
        self.record(format!("log_call:{lead_id}"));
        let mut state = self.state();
        let activity = Activity {
            meta_data: json!({ "outcome": req.outcome, "duration_seconds": req.duration_seconds }),
            ..activity(&state.next_id("call"), ActivityType::CallLogged, now())
        };
        state.push_activity(activity.clone());
        Ok(Mutation::Committed(activity))
    }

    async fn list_appointments(&self, lead_id: &str) -> Result<Vec<Appointment>> {
        self.record("list_appointments");
        Ok(self
            .state()
            .appointments
            .iter()
            .filter(|a| a.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn update_appointment(&self, appointment_id: &str, update: &AppointmentUpdate) -> Result<Appointment> {
        self.record(format!("update_appointment:{appointment_id}"));
        let mut state = self.state();
        let appt = state
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or_else(|| api_error(404, "Appointment not found"))?;
        if let Some(status) = update.status {
            appt.status = status;
        }
        if let Some(at) = update.scheduled_at {
            appt.scheduled_at = at;
        }
        Ok(appt.clone())
    }

    async fn list_follow_ups(&self, lead_id: &str) -> Result<Vec<FollowUp>> {
        self.record("list_follow_ups");
        Ok(self
            .state()
            .follow_ups
            .iter()
            .filter(|f| f.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn update_follow_up(&self, follow_up_id: &str, update: &FollowUpUpdate) -> Result<FollowUp> {
        self.record(format!("update_follow_up:{follow_up_id}"));
        let mut state = self.state();
        let follow_up = state
            .follow_ups
            .iter_mut()
            .find(|f| f.id == follow_up_id)
            .ok_or_else(|| api_error(404, "Follow-up not found"))?;
        if let Some(status) = update.status {
            follow_up.status = status;
        }
        Ok(follow_up.clone())
    }

    async fn current_visit(&self, lead_id: &str) -> Result<Option<ShowroomVisit>> {
        self.record("current_visit");
        Ok(self
            .state()
            .visits
            .iter()
            .find(|v| v.lead_id == lead_id && v.is_open())
            .cloned())
    }

    async fn check_in(&self, lead_id: &str, req: &CheckInRequest) -> Result<ShowroomVisit> {
        self.record(format!("check_in:{lead_id}"));
        let mut state = self.state();
        state.check_in_requests.push(req.clone());
        if state.visits.iter().any(|v| v.lead_id == lead_id && v.is_open()) {
            return Err(api_error(409, "Lead is already checked in"));
        }
        let visit = ShowroomVisit {
            id: state.next_id("visit"),
            lead_id: lead_id.into(),
            checked_in_at: now(),
            checked_out_at: None,
            appointment_id: req.appointment_id.clone(),
            outcome: None,
        };
        state.visits.push(visit.clone());
        Ok(visit)
    }

    async fn check_out(&self, visit_id: &str, req: &CheckOutRequest) -> Result<()> {
        self.record(format!("check_out:{visit_id}"));
        let mut state = self.state();
        state.check_out_requests.push(req.clone());
        let visit = state
            .visits
            .iter_mut()
            .find(|v| v.id == visit_id && v.is_open())
            .ok_or_else(|| api_error(404, "Visit not found"))?;
        visit.checked_out_at = Some(now());
        visit.outcome = Some(req.outcome);
        let linked = visit.appointment_id.clone();
        if let (Some(appointment_id), Some(new_time)) = (linked, req.reschedule_scheduled_at) {
            if let Some(appt) = state.appointments.iter_mut().find(|a| a.id == appointment_id) {
                appt.status = AppointmentStatus::Rescheduled;
                appt.scheduled_at = new_time;
            }
        }
        Ok(())
    }

    async fn list_documents(&self, lead_id: &str, category_id: Option<&str>) -> Result<Vec<StipDocument>> {
        self.record(format!("list_documents:{}", category_id.unwrap_or("all")));
        Ok(self
            .state()
            .documents
            .iter()
            .filter(|d| d.lead_id == lead_id)
            .filter(|d| category_id.is_none() || d.category_id.as_deref() == category_id)
            .cloned()
            .collect())
    }

    async fn list_document_categories(&self) -> Result<Vec<DocumentCategory>> {
        self.record("list_document_categories");
        Ok(self.state().categories.clone())
    }

    async fn download_document(&self, _lead_id: &str, document_id: &str) -> Result<Bytes> {
        self.record(format!("download_document:{document_id}"));
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_downloads.fetch_max(now_in_flight, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.state().failing_downloads.contains(document_id) {
            return Err(api_error(500, "storage unavailable"));
        }
        Ok(Bytes::from(format!("content of {document_id}")))
    }

    async fn document_view_url(&self, _lead_id: &str, document_id: &str) -> Result<String> {
        self.record(format!("document_view_url:{document_id}"));
        if self.state().failing_view_urls.contains(document_id) {
            return Err(api_error(500, "signing failed"));
        }
        Ok(format!("https://files.example.com/{document_id}?sig=abc"))
    }

    async fn delete_document(&self, _lead_id: &str, document_id: &str) -> Result<()> {
        self.record(format!("delete_document:{document_id}"));
        let mut state = self.state();
        let before = state.documents.len();
        state.documents.retain(|d| d.id != document_id);
        if state.documents.len() == before {
            return Err(api_error(404, "Document not found"));
        }
        Ok(())
    }

    async fn list_credit_applications(&self, lead_id: &str) -> Result<Vec<CreditApplication>> {
        self.record("list_credit_applications");
        Ok(self
            .state()
            .credit_applications
            .iter()
            .filter(|c| c.lead_id == lead_id)
            .cloned()
            .collect())
    }
}

pub fn context(api: Arc<FakeApi>) -> CrmContext {
    context_with(api, ClientConfig::default())
}

pub fn context_with(api: Arc<FakeApi>, config: ClientConfig) -> CrmContext {
    CrmContext::with_clock(api, config, Arc::new(FixedClock(now()))).unwrap()
}

/// Prompter with canned answers that counts warning confirmations.
pub struct ScriptedPrompter {
    pub lost_reason: Option<String>,
    pub terminal_note: NoteChoice,
    pub confirm: bool,
    pub appointment: Option<String>,
    pub warnings_seen: AtomicUsize,
}

impl Default for ScriptedPrompter {
    fn default() -> Self {
        Self {
            lost_reason: None,
            terminal_note: NoteChoice::Skip,
            confirm: false,
            appointment: None,
            warnings_seen: AtomicUsize::new(0),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn lost_reason(&self, _lead: &Lead) -> Option<String> {
        self.lost_reason.clone()
    }

    fn terminal_note(&self, _lead: &Lead, _stage: &Stage) -> NoteChoice {
        self.terminal_note.clone()
    }

    fn confirm_warning(&self, _warning: &SkateWarning) -> bool {
        self.warnings_seen.fetch_add(1, Ordering::SeqCst);
        self.confirm
    }

    fn choose_appointment(&self, _candidates: &[Appointment]) -> Option<String> {
        self.appointment.clone()
    }
}
