use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::database::{attendee_repo, CellPosition, SheetClient};
use crate::error::AppError;
use crate::models::api_models::AttendanceEntry;
use crate::models::{AttendeeStatus, SheetSnapshot};
use crate::services::matching::{
    locate_by_name, locate_by_phone, phone_key, resolve_column, split_contacts,
};

pub fn status_column<'a>(config: &'a AppConfig, event: Option<&'a str>) -> &'a str {
    event
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(config.event_column.as_str())
}

pub async fn list_names(
    client: &dyn SheetClient,
    config: &AppConfig,
) -> Result<Vec<String>, AppError> {
    let snap = attendee_repo::load_snapshot(client, &config.attendee_sheet).await?;
    let name_col = resolve_column(&snap.header, &config.columns.name)?;

    Ok((0..snap.rows.len())
        .map(|i| snap.cell(i, name_col))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect())
}

/// Names with the last four digits of each number on file, for the organizer's search box.
pub async fn list_attendance(
    client: &dyn SheetClient,
    config: &AppConfig,
) -> Result<Vec<AttendanceEntry>, AppError> {
    let snap = attendee_repo::load_snapshot(client, &config.attendee_sheet).await?;
    let name_col = resolve_column(&snap.header, &config.columns.name)?;
    let contact_col = resolve_column(&snap.header, &config.columns.contact)?;

    Ok((0..snap.rows.len())
        .filter_map(|i| {
            let name = snap.cell(i, name_col);
            if name.is_empty() {
                return None;
            }
            let contact_numbers = split_contacts(snap.cell(i, contact_col))
                .into_iter()
                .filter_map(phone_key)
                .collect();
            Some(AttendanceEntry {
                name: name.to_string(),
                contact_numbers,
            })
        })
        .collect())
}

/// Full rows (header -> value) assigned to one follow-up owner.
pub async fn list_by_followup_owner(
    client: &dyn SheetClient,
    config: &AppConfig,
    owner: &str,
) -> Result<Vec<BTreeMap<String, String>>, AppError> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(AppError::BadRequest("followupOwner is required".into()));
    }

    let snap = attendee_repo::load_snapshot(client, &config.attendee_sheet).await?;
    let owner_col = resolve_column(&snap.header, &config.columns.followup_owner)?;

    Ok((0..snap.rows.len())
        .filter(|&i| snap.cell(i, owner_col) == owner)
        .map(|i| row_as_map(&snap, i))
        .collect())
}

fn row_as_map(snap: &SheetSnapshot, data_index: usize) -> BTreeMap<String, String> {
    snap.header
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.is_empty())
        .map(|(col, h)| (h.clone(), snap.cell(data_index, col).to_string()))
        .collect()
}

pub async fn name_for_phone(
    client: &dyn SheetClient,
    config: &AppConfig,
    phone: &str,
) -> Result<String, AppError> {
    if phone_key(phone).is_none() {
        return Err(AppError::BadRequest(
            "Phone number must have at least 4 digits".into(),
        ));
    }

    let snap = attendee_repo::load_snapshot(client, &config.attendee_sheet).await?;
    let name_col = resolve_column(&snap.header, &config.columns.name)?;
    let contact_col = resolve_column(&snap.header, &config.columns.contact)?;

    let index = locate_by_phone(&snap.rows, contact_col, phone).ok_or_else(|| {
        AppError::AttendeeNotFound("No entry found for the provided phone number".into())
    })?;
    Ok(snap.cell(index, name_col).to_string())
}

/// Sets the status cell of the first attendee named exactly `name` to Present.
pub async fn mark_present(
    client: &dyn SheetClient,
    config: &AppConfig,
    name: &str,
    event: Option<&str>,
) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    let snap = attendee_repo::load_snapshot(client, &config.attendee_sheet).await?;
    let name_col = resolve_column(&snap.header, &config.columns.name)?;
    let status_col = resolve_column(&snap.header, status_column(config, event))?;

    let Some(index) = locate_by_name(&snap.rows, name_col, name) else {
        warn!(name = %name, "mark_present: name not in attendance sheet");
        return Err(AppError::AttendeeNotFound(
            "Name not found in the attendance sheet".into(),
        ));
    };

    let pos = CellPosition {
        row: SheetSnapshot::grid_row(index),
        column: status_col,
    };
    attendee_repo::update_cell(client, &config.attendee_sheet, pos, AttendeeStatus::Present.as_str())
        .await?;
    Ok(())
}

/// Marks the attendee matching `contact` as Registered. Returns false when they were already
/// Registered or Present and nothing was written.
pub async fn mark_registered(
    client: &dyn SheetClient,
    config: &AppConfig,
    contact: &str,
    event: Option<&str>,
) -> Result<bool, AppError> {
    if phone_key(contact).is_none() {
        return Err(AppError::BadRequest(
            "Contact number must have at least 4 digits".into(),
        ));
    }

    let snap = attendee_repo::load_snapshot(client, &config.attendee_sheet).await?;
    let contact_col = resolve_column(&snap.header, &config.columns.contact)?;
    let status_col = resolve_column(&snap.header, status_column(config, event))?;

    let index = locate_by_phone(&snap.rows, contact_col, contact).ok_or_else(|| {
        AppError::AttendeeNotFound("Contact not found in the attendance sheet".into())
    })?;

    let current = AttendeeStatus::parse(snap.cell(index, status_col));
    if !AttendeeStatus::Registered.supersedes(current) {
        info!(row = index, ?current, "mark_registered: status left as is");
        return Ok(false);
    }

    let pos = CellPosition {
        row: SheetSnapshot::grid_row(index),
        column: status_col,
    };
    attendee_repo::update_cell(
        client,
        &config.attendee_sheet,
        pos,
        AttendeeStatus::Registered.as_str(),
    )
    .await?;
    Ok(true)
}
