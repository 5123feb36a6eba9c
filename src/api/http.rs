use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use urlencoding::encode;

use super::LeadApi;
use super::dto::*;
use crate::error::{Error, Result};
use crate::types::*;

#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpApi {
    pub fn new(server_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.authed(self.client.get(self.url(path))).send().await?;
        let data: Option<T> = handle_response(resp).await?;
        data.ok_or_else(empty_response)
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let resp = self.authed(self.client.get(self.url(path))).send().await?;
        handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self
            .authed(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        let data: Option<T> = handle_response(resp).await?;
        data.ok_or_else(empty_response)
    }

    async fn post_mutation<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Mutation<T>> {
        let value: Value = self.post(path, body).await?;
        Mutation::from_value(value)
    }

    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let resp = self
            .authed(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(resp).await)
        }
    }

    async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self
            .authed(self.client.patch(self.url(path)))
            .json(body)
            .send()
            .await?;
        let data: Option<T> = handle_response(resp).await?;
        data.ok_or_else(empty_response)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let resp = self.authed(self.client.delete(self.url(path))).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(resp).await)
        }
    }
}

fn empty_response() -> Error {
    Error::Api {
        status: 200,
        message: "Server returned an empty response".into(),
    }
}

async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<Option<T>> {
    if resp.status().is_success() {
        let api_resp: ApiResponse<T> = resp.json().await?;
        Ok(api_resp.data)
    } else {
        Err(error_from_response(resp).await)
    }
}

async fn error_from_response(resp: Response) -> Error {
    let status = resp.status().as_u16();
    let message = match resp.json::<ApiResponse<Value>>().await {
        Ok(api_resp) => api_resp
            .error
            .unwrap_or_else(|| "Server error (no details provided)".into()),
        Err(_) => "Server error (no details provided)".into(),
    };
    Error::Api { status, message }
}

#[async_trait]
impl LeadApi for HttpApi {
    async fn get_lead(&self, lead_id: &str) -> Result<Lead> {
        self.get(&format!("/leads/{}", encode(lead_id))).await
    }

    async fn list_stages(&self) -> Result<Vec<Stage>> {
        self.get("/stages").await
    }

    async fn update_status(
        &self,
        lead_id: &str,
        req: &StatusChangeRequest,
    ) -> Result<Mutation<Lead>> {
        self.post_mutation(&format!("/leads/{}/status", encode(lead_id)), req)
            .await
    }

    async fn list_timeline(
        &self,
        lead_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Activity>> {
        self.get(&format!(
            "/leads/{}/timeline?page={page}&page_size={page_size}",
            encode(lead_id)
        ))
        .await
    }

    async fn add_note(&self, lead_id: &str, req: &NoteRequest) -> Result<Mutation<Activity>> {
        self.post_mutation(&format!("/leads/{}/notes", encode(lead_id)), req)
            .await
    }

    async fn log_call(&self, lead_id: &str, req: &CallLogRequest) -> Result<Mutation<Activity>> {
        self.post_mutation(&format!("/leads/{}/calls", encode(lead_id)), req)
            .await
    }

    async fn list_appointments(&self, lead_id: &str) -> Result<Vec<Appointment>> {
        self.get(&format!("/leads/{}/appointments", encode(lead_id)))
            .await
    }

    async fn update_appointment(
        &self,
        appointment_id: &str,
        update: &AppointmentUpdate,
    ) -> Result<Appointment> {
        self.patch(&format!("/appointments/{}", encode(appointment_id)), update)
            .await
    }

    async fn list_follow_ups(&self, lead_id: &str) -> Result<Vec<FollowUp>> {
        self.get(&format!("/leads/{}/follow-ups", encode(lead_id)))
            .await
    }

    async fn update_follow_up(
        &self,
        follow_up_id: &str,
        update: &FollowUpUpdate,
    ) -> Result<FollowUp> {
        self.patch(&format!("/follow-ups/{}", encode(follow_up_id)), update)
            .await
    }

    async fn current_visit(&self, lead_id: &str) -> Result<Option<ShowroomVisit>> {
        self.get_optional(&format!("/leads/{}/showroom/current", encode(lead_id)))
            .await
    }

    async fn check_in(&self, lead_id: &str, req: &CheckInRequest) -> Result<ShowroomVisit> {
        self.post(&format!("/leads/{}/showroom/check-in", encode(lead_id)), req)
            .await
    }

    async fn check_out(&self, visit_id: &str, req: &CheckOutRequest) -> Result<()> {
        self.post_unit(
            &format!("/showroom/visits/{}/check-out", encode(visit_id)),
            req,
        )
        .await
    }

    async fn list_documents(
        &self,
        lead_id: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<StipDocument>> {
        let path = match category_id {
            Some(c) => format!(
                "/leads/{}/documents?category_id={}",
                encode(lead_id),
                encode(c)
            ),
            None => format!("/leads/{}/documents", encode(lead_id)),
        };
        self.get(&path).await
    }

    async fn list_document_categories(&self) -> Result<Vec<DocumentCategory>> {
        self.get("/document-categories").await
    }

    async fn download_document(&self, lead_id: &str, document_id: &str) -> Result<Bytes> {
        let url = self.url(&format!(
            "/leads/{}/documents/{}/content",
            encode(lead_id),
            encode(document_id)
        ));
        let resp = self.authed(self.client.get(url)).send().await?;
        if resp.status().is_success() {
            Ok(resp.bytes().await?)
        } else {
            Err(error_from_response(resp).await)
        }
    }

    async fn document_view_url(&self, lead_id: &str, document_id: &str) -> Result<String> {
        let resp: ViewUrlResponse = self
            .get(&format!(
                "/leads/{}/documents/{}/view-url",
                encode(lead_id),
                encode(document_id)
            ))
            .await?;
        Ok(resp.url)
    }

    async fn delete_document(&self, lead_id: &str, document_id: &str) -> Result<()> {
        self.delete(&format!(
            "/leads/{}/documents/{}",
            encode(lead_id),
            encode(document_id)
        ))
        .await
    }

    async fn list_credit_applications(&self, lead_id: &str) -> Result<Vec<CreditApplication>> {
        self.get(&format!("/leads/{}/credit-applications", encode(lead_id)))
            .await
    }
}
