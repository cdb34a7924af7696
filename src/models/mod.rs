pub mod api_models;
pub mod attendee;
pub mod sheet_api;

pub use attendee::{AttendeeStatus, NewAttendee, SheetSnapshot};
