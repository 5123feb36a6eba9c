mod badge;
mod controller;

pub use badge::{
    Badge, BadgeColor, ScheduleItem, ScheduleKind, ScheduleMemo, ScheduleSummary, summarize,
};
pub use controller::ScheduleController;
