use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Current pipeline stage name.
    #[serde(alias = "status")]
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealership_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_salesperson: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    #[must_use]
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        name.trim().to_string()
    }
}

/// A named pipeline position. Terminal stages close the lead's active pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    #[serde(default)]
    pub is_terminal: bool,
}

impl Stage {
    pub fn new(name: impl Into<String>, is_terminal: bool) -> Self {
        Self {
            name: name.into(),
            is_terminal,
        }
    }

    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.name.eq_ignore_ascii_case(LOST_STAGE)
    }
}

pub const LOST_STAGE: &str = "lost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    NoteAdded,
    StatusChanged,
    CallLogged,
    EmailSent,
    EmailReceived,
    LeadAssigned,
    SecondaryAssigned,
    DealershipAssigned,
    AppointmentScheduled,
    AppointmentUpdated,
    AppointmentCompleted,
    AppointmentCancelled,
    FollowUpScheduled,
    FollowUpCompleted,
    CreditAppSubmitted,
    CreditAppUpdated,
    ShowroomCheckIn,
    ShowroomCheckOut,
    DocumentUploaded,
    DocumentDeleted,
    #[serde(other)]
    Other,
}

impl ActivityType {
    /// Activity types that change who owns the lead.
    #[must_use]
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::LeadAssigned | Self::SecondaryAssigned | Self::DealershipAssigned
        )
    }
}

/// Append-only event attached to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub lead_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub meta_data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    #[must_use]
    pub fn is_note(&self) -> bool {
        self.activity_type == ActivityType::NoteAdded
    }

    /// Note body, falling back to the description for older payloads.
    #[must_use]
    pub fn note_content(&self) -> &str {
        self.meta_data
            .get("content")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Arrived,
    InShowroom,
    InProgress,
    Completed,
    NoShow,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    /// Position along the forward chain; outcome statuses have none.
    fn chain_index(self) -> Option<u8> {
        match self {
            Self::Scheduled => Some(0),
            Self::Confirmed => Some(1),
            Self::Arrived => Some(2),
            Self::InShowroom => Some(3),
            Self::InProgress => Some(4),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::NoShow | Self::Cancelled)
    }

    /// Statuses that still occupy the lead's schedule.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Scheduled
                | Self::Confirmed
                | Self::Arrived
                | Self::InShowroom
                | Self::InProgress
                | Self::Rescheduled
        )
    }

    /// Statuses an arriving lead can be linked to on showroom check-in.
    #[must_use]
    pub fn is_linkable(self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        match next {
            Self::Cancelled | Self::NoShow | Self::Rescheduled => true,
            Self::Completed => self.chain_index().is_some_and(|i| i >= 2),
            Self::Scheduled | Self::Confirmed if self == Self::Rescheduled => true,
            _ => match (self.chain_index(), next.chain_index()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Arrived => "arrived",
            Self::InShowroom => "in_showroom",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
        }
    }

    pub const ALL: [Self; 9] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::Arrived,
        Self::InShowroom,
        Self::InProgress,
        Self::Completed,
        Self::NoShow,
        Self::Cancelled,
        Self::Rescheduled,
    ];

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub lead_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

fn default_duration_minutes() -> u32 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: String,
    pub lead_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: FollowUpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowroomVisit {
    pub id: String,
    pub lead_id: String,
    pub checked_in_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_out_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VisitOutcome>,
}

impl ShowroomVisit {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.checked_out_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitOutcome {
    Sold,
    FollowUp,
    Reschedule,
    NotInterested,
    Browsing,
    CouldntQualify,
}

impl VisitOutcome {
    pub const ALL: [Self; 6] = [
        Self::Sold,
        Self::FollowUp,
        Self::Reschedule,
        Self::NotInterested,
        Self::Browsing,
        Self::CouldntQualify,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sold => "sold",
            Self::FollowUp => "follow_up",
            Self::Reschedule => "reschedule",
            Self::NotInterested => "not_interested",
            Self::Browsing => "browsing",
            Self::CouldntQualify => "couldnt_qualify",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == s)
    }
}

impl fmt::Display for VisitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supporting document metadata. Bytes are fetched on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StipDocument {
    pub id: String,
    pub lead_id: String,
    pub file_name: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    pub id: String,
    pub lead_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_requested: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}
