mod controller;

pub use controller::{CheckInOutcome, CheckInTarget, CheckOut, ShowroomController, VisitState};
