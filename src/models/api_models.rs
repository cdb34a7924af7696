use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamesResponse {
    pub names: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub name: String,
    /// Last four digits of each number on file.
    pub contact_numbers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AttendanceListResponse {
    pub entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupOwnerRequest {
    pub followup_owner: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FullListResponse {
    pub entries: Vec<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NameResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkPresentRequest {
    pub name: String,
    /// Status column header; defaults to the configured event column.
    #[serde(default)]
    pub event: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkRegisteredRequest {
    pub contact: String,
    #[serde(default)]
    pub event: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub name: String,
    pub gender: String,
    pub contact_extension: String,
    pub contact_number: String,
    pub whatsapp_extension: String,
    pub whatsapp_number: String,
    pub is_whatsapp_same_as_contact: bool,
    pub school_organization: String,
    pub is_attendance_page: bool,
    pub event: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationOutcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistrationResponse {
    pub message: String,
    pub outcome: RegistrationOutcome,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactMessageRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}
