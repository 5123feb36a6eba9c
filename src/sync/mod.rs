mod cache;
pub mod events;
mod reconcile;

pub use cache::{FetchToken, LeadCache, ScheduleSnapshot};
pub use events::{LeadPatch, LeadUpdateEvent, LeadUpdateType, NewActivityEvent, PushEvent};
pub use reconcile::{Reconciled, Reconciler};
