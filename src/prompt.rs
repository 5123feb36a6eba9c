use crate::api::SkateWarning;
use crate::types::{Appointment, Lead, Stage};

/// Answer to the optional note offered when entering a terminal stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteChoice {
    Note(String),
    Skip,
    Cancel,
}

/// User interaction the controllers need but do not own.
pub trait Prompter: Send + Sync {
    /// `None` cancels the transition.
    fn lost_reason(&self, lead: &Lead) -> Option<String>;

    fn terminal_note(&self, lead: &Lead, stage: &Stage) -> NoteChoice;

    fn confirm_warning(&self, warning: &SkateWarning) -> bool;

    /// `None` cancels the check-in.
    fn choose_appointment(&self, candidates: &[Appointment]) -> Option<String>;
}
