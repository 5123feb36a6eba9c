use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use inquire::{Confirm, InquireError, Select, Text};

use crate::api::SkateWarning;
use crate::prompt::{NoteChoice, Prompter};
use crate::types::{Appointment, Lead, Stage};

/// Appointment line for pickers and listings
pub struct AppointmentDisplay<'a> {
    pub appointment: &'a Appointment,
    pub timezone: FixedOffset,
}

impl fmt::Display for AppointmentDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.appointment;
        write!(
            f,
            "{}  {}  [{}]",
            format_local(&a.scheduled_at, &self.timezone),
            a.title.as_deref().unwrap_or("Appointment"),
            a.status
        )
    }
}

/// Stage with terminal marker for display
pub struct StageDisplay(pub Stage);

impl fmt::Display for StageDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_terminal {
            write!(f, "{} [terminal]", self.0.name)
        } else {
            f.write_str(&self.0.name)
        }
    }
}

#[must_use]
pub fn format_local(dt: &DateTime<Utc>, tz: &FixedOffset) -> String {
    dt.with_timezone(tz).format("%a %b %-d %H:%M").to_string()
}

/// Format a datetime as relative time (e.g., "2 days ago")
#[must_use]
pub fn format_relative_time(dt: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(*dt);

    if diff.num_seconds() < 0 {
        return "in the future".to_string();
    }
    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }
    if diff.num_minutes() < 60 {
        let mins = diff.num_minutes();
        return if mins == 1 {
            "1 minute ago".to_string()
        } else {
            format!("{mins} minutes ago")
        };
    }
    if diff.num_hours() < 24 {
        let hours = diff.num_hours();
        return if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{hours} hours ago")
        };
    }

    let days = diff.num_days();
    if days == 1 {
        "1 day ago".to_string()
    } else {
        format!("{days} days ago")
    }
}

pub fn parse_time(input: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow::anyhow!("Invalid time '{input}' (expected RFC 3339): {e}"))
}

fn cancelled(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

/// Pick a target stage from the pipeline
pub fn pick_stage(stages: &[Stage], current: &str) -> anyhow::Result<Option<Stage>> {
    let options: Vec<StageDisplay> = stages
        .iter()
        .filter(|s| !s.name.eq_ignore_ascii_case(current))
        .cloned()
        .map(StageDisplay)
        .collect();

    if options.is_empty() {
        println!("No other stages available.");
        return Ok(None);
    }

    let selection = Select::new(&format!("Move from '{current}' to:"), options)
        .with_page_size(15)
        .with_help_message("Type to filter, Enter to select")
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(display) => Ok(Some(display.0)),
        Err(e) if cancelled(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Asks on the terminal for anything a workflow needs.
pub struct InquirePrompter {
    pub timezone: FixedOffset,
}

impl Prompter for InquirePrompter {
    fn lost_reason(&self, lead: &Lead) -> Option<String> {
        Text::new(&format!("Why is {} lost?", lead.full_name()))
            .with_validator(|input: &str| {
                if input.trim().is_empty() {
                    Ok(inquire::validator::Validation::Invalid(
                        "A reason is required".into(),
                    ))
                } else {
                    Ok(inquire::validator::Validation::Valid)
                }
            })
            .prompt()
            .ok()
    }

    fn terminal_note(&self, _lead: &Lead, stage: &Stage) -> NoteChoice {
        match Text::new(&format!("Note for moving to '{}':", stage.name))
            .with_help_message("Leave empty to skip, Esc to cancel")
            .prompt()
        {
            Ok(note) if note.trim().is_empty() => NoteChoice::Skip,
            Ok(note) => NoteChoice::Note(note),
            Err(_) => NoteChoice::Cancel,
        }
    }

    fn confirm_warning(&self, warning: &SkateWarning) -> bool {
        Confirm::new(&format!("{} Continue anyway?", warning.display_message()))
            .with_default(false)
            .prompt()
            .unwrap_or(false)
    }

    fn choose_appointment(&self, candidates: &[Appointment]) -> Option<String> {
        let options: Vec<AppointmentDisplay<'_>> = candidates
            .iter()
            .map(|appointment| AppointmentDisplay {
                appointment,
                timezone: self.timezone,
            })
            .collect();
        Select::new("Link this visit to which appointment?", options)
            .with_vim_mode(true)
            .prompt()
            .ok()
            .map(|display| display.appointment.id.clone())
    }
}
