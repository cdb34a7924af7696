pub mod attendance;
pub mod auth;
pub mod contact;
pub mod registration;
