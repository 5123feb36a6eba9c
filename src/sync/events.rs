use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Activity, Lead};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadUpdateType {
    Assigned,
    DealershipAssigned,
    StatusChanged,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadUpdateEvent {
    pub lead_id: String,
    pub update_type: LeadUpdateType,
    /// Only the fields the update touched.
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivityEvent {
    pub lead_id: String,
    pub activity: Activity,
}

/// Server push, one JSON object per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PushEvent {
    LeadUpdate(LeadUpdateEvent),
    NewActivity(NewActivityEvent),
}

impl PushEvent {
    #[must_use]
    pub fn lead_id(&self) -> &str {
        match self {
            Self::LeadUpdate(e) => &e.lead_id,
            Self::NewActivity(e) => &e.lead_id,
        }
    }
}

impl LeadUpdateEvent {
    /// Field-level patch for the update types that have one.
    #[must_use]
    pub fn patch(&self) -> Option<LeadPatch> {
        let fields: &[&str] = match self.update_type {
            LeadUpdateType::Assigned => &["assigned_to", "secondary_salesperson"],
            LeadUpdateType::DealershipAssigned => &["dealership_id", "assigned_to"],
            LeadUpdateType::StatusChanged => &["status", "stage"],
            LeadUpdateType::Other => return None,
        };
        let touched: Map<String, Value> = fields
            .iter()
            .filter_map(|f| self.data.get(*f).map(|v| ((*f).to_string(), v.clone())))
            .collect();
        Some(LeadPatch(touched))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadPatch(Map<String, Value>);

impl LeadPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn apply(&self, lead: &mut Lead) {
        for (key, value) in &self.0 {
            match key.as_str() {
                "assigned_to" => lead.assigned_to = optional_string(value),
                "secondary_salesperson" => lead.secondary_salesperson = optional_string(value),
                "dealership_id" => lead.dealership_id = optional_string(value),
                "status" | "stage" => {
                    if let Some(stage) = value.as_str() {
                        lead.stage = stage.to_string();
                    }
                }
                _ => {}
            }
        }
    }
}

fn optional_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
