use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const TOKEN: &str = "test-token";

/// Requests the server has seen, as `(method path, body)`.
pub type RequestLog = Arc<Mutex<Vec<(String, Value)>>>;

#[derive(Clone)]
struct AppState {
    log: RequestLog,
}

/// In-process CRM endpoint speaking the `{data, error}` envelope.
pub struct TestServer {
    pub base_url: String,
    pub log: RequestLog,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let log: RequestLog = Arc::default();
        let state = AppState { log: log.clone() };

        let app = Router::new()
            .route("/api/v1/stages", get(stages))
            .route("/api/v1/leads/{lead_id}", get(lead))
            .route("/api/v1/leads/{lead_id}/status", post(update_status))
            .route("/api/v1/leads/{lead_id}/timeline", get(timeline))
            .route("/api/v1/leads/{lead_id}/showroom/current", get(current_visit))
            .route("/api/v1/leads/{lead_id}/appointments", get(empty_list))
            .route("/api/v1/leads/{lead_id}/follow-ups", get(empty_list))
            .route("/api/v1/leads/{lead_id}/credit-applications", get(empty_list))
            .route("/api/v1/document-categories", get(categories))
            .route("/api/v1/leads/{lead_id}/documents", get(documents))
            .route(
                "/api/v1/leads/{lead_id}/documents/{document_id}/content",
                get(document_content),
            )
            .route(
                "/api/v1/leads/{lead_id}/documents/{document_id}/view-url",
                get(view_url),
            )
            .route("/api/v1/showroom/visits/{visit_id}/check-out", post(check_out))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            base_url: format!("http://{addr}"),
            log,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.log.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn envelope(status: StatusCode, data: Value) -> Response {
    (status, axum::Json(json!({ "data": data, "error": null }))).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(json!({ "data": null, "error": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn lead_json(lead_id: &str, stage: &str) -> Value {
    json!({
        "id": lead_id,
        "first_name": "Avery",
        "last_name": "Stone",
        "email": "avery@example.com",
        "stage": stage,
        "assigned_to": "rep-1",
        "created_at": "2024-05-01T09:00:00Z",
        "updated_at": "2024-05-01T09:00:00Z"
    })
}

async fn stages(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return failure(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    envelope(
        StatusCode::OK,
        json!([
            {"name": "new", "is_terminal": false},
            {"name": "contacted", "is_terminal": false},
            {"name": "sold", "is_terminal": true},
            {"name": "lost", "is_terminal": true}
        ]),
    )
}

async fn lead(headers: HeaderMap, Path(lead_id): Path<String>) -> Response {
    if !authorized(&headers) {
        return failure(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    if lead_id != "lead-1" {
        return failure(StatusCode::NOT_FOUND, "Lead not found");
    }
    envelope(StatusCode::OK, lead_json(&lead_id, "contacted"))
}

async fn update_status(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    axum::Json(body): axum::Json<Value>,
) -> Response {
    state
        .log
        .lock()
        .unwrap()
        .push((format!("POST /leads/{lead_id}/status"), body.clone()));

    if body["confirm"] != json!(true) {
        return envelope(
            StatusCode::OK,
            json!({
                "skate_warning": true,
                "message": "Dana is currently working this lead",
                "assigned_user": "Dana"
            }),
        );
    }
    let stage = body["status"].as_str().unwrap_or("new");
    envelope(StatusCode::OK, lead_json(&lead_id, stage))
}

async fn timeline(Query(params): Query<HashMap<String, String>>) -> Response {
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let items: Vec<Value> = if page == 1 {
        vec![json!({
            "id": "act-1",
            "lead_id": "lead-1",
            "type": "note_added",
            "meta_data": {"content": "Asked about trade-in value"},
            "created_at": "2024-05-09T10:00:00Z"
        })]
    } else {
        Vec::new()
    };
    envelope(StatusCode::OK, json!({ "items": items, "total": 1 }))
}

async fn current_visit() -> Response {
    envelope(StatusCode::OK, Value::Null)
}

async fn empty_list() -> Response {
    envelope(StatusCode::OK, json!([]))
}

async fn categories() -> Response {
    envelope(StatusCode::OK, json!([{"id": "income", "name": "Income"}]))
}

async fn documents(Query(params): Query<HashMap<String, String>>) -> Response {
    let all = json!([
        {"id": "d1", "lead_id": "lead-1", "file_name": "paystub.pdf", "content_type": "application/pdf", "category_id": "income", "created_at": "2024-05-02T10:00:00Z"},
        {"id": "d2", "lead_id": "lead-1", "file_name": "license.jpg", "content_type": "image/jpeg", "created_at": "2024-05-03T10:00:00Z"}
    ]);
    let filtered: Vec<Value> = all
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter(|d| match params.get("category_id") {
            Some(c) => d["category_id"].as_str() == Some(c.as_str()),
            None => true,
        })
        .collect();
    envelope(StatusCode::OK, Value::Array(filtered))
}

async fn document_content(Path((_lead_id, document_id)): Path<(String, String)>) -> Response {
    if document_id == "missing" {
        return failure(StatusCode::NOT_FOUND, "Document not found");
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/pdf")],
        b"%PDF-1.4 fake".to_vec(),
    )
        .into_response()
}

async fn view_url(Path((_lead_id, document_id)): Path<(String, String)>) -> Response {
    envelope(
        StatusCode::OK,
        json!({ "url": format!("https://files.example.com/{document_id}?sig=abc") }),
    )
}

async fn check_out(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
    axum::Json(body): axum::Json<Value>,
) -> StatusCode {
    state
        .log
        .lock()
        .unwrap()
        .push((format!("POST /showroom/visits/{visit_id}/check-out"), body));
    StatusCode::NO_CONTENT
}
