use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::{AppointmentStatus, FollowUpStatus, VisitOutcome};

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Soft-block returned instead of committing a suspicious mutation.
///
/// The payload is opaque: the only contract is that re-sending the same
/// request with its confirm flag set commits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkateWarning {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl SkateWarning {
    #[must_use]
    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or("This action was flagged and needs confirmation.")
    }
}

/// Result of a mutating call that may be soft-blocked.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<T> {
    Committed(T),
    Warning(SkateWarning),
}

impl<T: DeserializeOwned> Mutation<T> {
    /// Tell a warning from a committed payload by shape, not status code.
    pub fn from_value(value: Value) -> Result<Self> {
        let is_warning = value
            .get("skate_warning")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if is_warning {
            let mut warning: SkateWarning = serde_json::from_value(value)?;
            warning.details.remove("skate_warning");
            Ok(Self::Warning(warning))
        } else {
            Ok(Self::Committed(serde_json::from_value(value)?))
        }
    }
}

/// Requests that carry a "yes, I saw the warning" flag.
pub trait Confirmable: Clone {
    fn confirmed(&self) -> Self;
    fn is_confirmed(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChangeRequest {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub confirm: bool,
}

impl Confirmable for StatusChangeRequest {
    fn confirmed(&self) -> Self {
        Self {
            confirm: true,
            ..self.clone()
        }
    }

    fn is_confirmed(&self) -> bool {
        self.confirm
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentioned_user_ids: Vec<String>,
    #[serde(rename = "confirmSkate")]
    pub confirm_skate: bool,
}

impl Confirmable for NoteRequest {
    fn confirmed(&self) -> Self {
        Self {
            confirm_skate: true,
            ..self.clone()
        }
    }

    fn is_confirmed(&self) -> bool {
        self.confirm_skate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallLogRequest {
    pub direction: CallDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "confirmSkate")]
    pub confirm_skate: bool,
}

impl Confirmable for CallLogRequest {
    fn confirmed(&self) -> Self {
        Self {
            confirm_skate: true,
            ..self.clone()
        }
    }

    fn is_confirmed(&self) -> bool {
        self.confirm_skate
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckInRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutRequest {
    pub outcome: VisitOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reschedule_scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowUpUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FollowUpStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ViewUrlResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: String,
    }

    #[test]
    fn test_mutation_detects_warning_by_shape() {
        let value = json!({"skate_warning": true, "message": "Recently reassigned", "assigned_user": "Dana"});
        let parsed: Mutation<Thing> = Mutation::from_value(value).unwrap();
        match parsed {
            Mutation::Warning(w) => {
                assert_eq!(w.display_message(), "Recently reassigned");
                assert_eq!(w.details.get("assigned_user"), Some(&json!("Dana")));
                assert!(!w.details.contains_key("skate_warning"));
            }
            Mutation::Committed(_) => panic!("expected warning"),
        }
    }

    #[test]
    fn test_mutation_committed_payload() {
        let parsed: Mutation<Thing> =
            Mutation::from_value(json!({"id": "lead-1", "skate_warning": false})).unwrap();
        assert_eq!(
            parsed,
            Mutation::Committed(Thing {
                id: "lead-1".into()
            })
        );
    }

    #[test]
    fn test_confirmed_only_flips_flag() {
        let req = StatusChangeRequest {
            status: "lost".into(),
            notes: Some("went elsewhere".into()),
            confirm: false,
        };
        let retry = req.confirmed();
        assert!(retry.is_confirmed());
        assert_eq!(retry.status, req.status);
        assert_eq!(retry.notes, req.notes);
    }
}
