pub mod dto;
mod http;

pub use dto::{
    AppointmentUpdate, CallDirection, CallLogRequest, CheckInRequest, CheckOutRequest,
    Confirmable, FollowUpUpdate, Mutation, NoteRequest, SkateWarning, StatusChangeRequest,
};
pub use http::HttpApi;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::*;

/// LeadApi defines the remote CRM interface the lifecycle core consumes.
#[async_trait]
pub trait LeadApi: Send + Sync {
    // Lead operations
    async fn get_lead(&self, lead_id: &str) -> Result<Lead>;
    async fn list_stages(&self) -> Result<Vec<Stage>>;
    async fn update_status(
        &self,
        lead_id: &str,
        req: &StatusChangeRequest,
    ) -> Result<Mutation<Lead>>;

    // Activity operations (timeline pages are 1-based, newest first)
    async fn list_timeline(&self, lead_id: &str, page: usize, page_size: usize)
    -> Result<Page<Activity>>;
    async fn add_note(&self, lead_id: &str, req: &NoteRequest) -> Result<Mutation<Activity>>;
    async fn log_call(&self, lead_id: &str, req: &CallLogRequest) -> Result<Mutation<Activity>>;

    // Schedule operations
    async fn list_appointments(&self, lead_id: &str) -> Result<Vec<Appointment>>;
    async fn update_appointment(
        &self,
        appointment_id: &str,
        update: &AppointmentUpdate,
    ) -> Result<Appointment>;
    async fn list_follow_ups(&self, lead_id: &str) -> Result<Vec<FollowUp>>;
    async fn update_follow_up(
        &self,
        follow_up_id: &str,
        update: &FollowUpUpdate,
    ) -> Result<FollowUp>;

    // Showroom operations
    async fn current_visit(&self, lead_id: &str) -> Result<Option<ShowroomVisit>>;
    async fn check_in(&self, lead_id: &str, req: &CheckInRequest) -> Result<ShowroomVisit>;
    async fn check_out(&self, visit_id: &str, req: &CheckOutRequest) -> Result<()>;

    // Document operations
    async fn list_documents(
        &self,
        lead_id: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<StipDocument>>;
    async fn list_document_categories(&self) -> Result<Vec<DocumentCategory>>;
    async fn download_document(&self, lead_id: &str, document_id: &str) -> Result<Bytes>;
    async fn document_view_url(&self, lead_id: &str, document_id: &str) -> Result<String>;
    async fn delete_document(&self, lead_id: &str, document_id: &str) -> Result<()>;

    // Credit application history
    async fn list_credit_applications(&self, lead_id: &str) -> Result<Vec<CreditApplication>>;
}
