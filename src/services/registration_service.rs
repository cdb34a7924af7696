use tracing::{info, warn};

use crate::config::{normalize_country_code, AppConfig};
use crate::database::{attendee_repo, CellPosition, SheetClient};
use crate::error::AppError;
use crate::models::api_models::{RegistrationForm, RegistrationOutcome};
use crate::models::{AttendeeStatus, NewAttendee, SheetSnapshot};
use crate::services::attendance_service::status_column;
use crate::services::mail_service::OutgoingMail;
use crate::services::matching::{
    digits_only, duplicate_rows, locate_row, phone_key, phone_matches, resolve_column,
};
use crate::state::AppState;

const MAX_NAME_LEN: usize = 100;
const MIN_PHONE_DIGITS: usize = 4;
const MAX_PHONE_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub country_code: String,
    pub digits: String,
}

impl PhoneNumber {
    pub fn display(&self) -> String {
        format!("{} {}", self.country_code, self.digits)
    }
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub gender: String,
    pub numbers: Vec<PhoneNumber>,
    pub location: String,
    pub status: AttendeeStatus,
    pub event: Option<String>,
}

impl Registration {
    pub fn from_form(form: &RegistrationForm, config: &AppConfig) -> Result<Self, AppError> {
        let name = form.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::BadRequest(
                "Name is required and must be at most 100 characters".into(),
            ));
        }

        let contact = if form.is_whatsapp_same_as_contact && form.contact_number.trim().is_empty()
        {
            (&form.whatsapp_extension, &form.whatsapp_number)
        } else {
            (&form.contact_extension, &form.contact_number)
        };

        let mut numbers: Vec<PhoneNumber> = Vec::new();
        for (ext, raw) in [contact, (&form.whatsapp_extension, &form.whatsapp_number)] {
            let Some(number) = parse_number(ext, raw, config)? else {
                continue;
            };
            if !numbers.iter().any(|n| n.digits == number.digits) {
                numbers.push(number);
            }
        }
        if numbers.is_empty() {
            return Err(AppError::BadRequest(
                "A contact or WhatsApp number is required".into(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            gender: form.gender.trim().to_string(),
            numbers,
            location: form.school_organization.trim().to_string(),
            status: if form.is_attendance_page {
                AttendeeStatus::Present
            } else {
                AttendeeStatus::Registered
            },
            event: form
                .event
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
        })
    }

    /// Lock keys of every submitted number. Any submission that could match the same
    /// row shares at least one of them.
    pub fn lock_keys(&self) -> Vec<String> {
        self.numbers
            .iter()
            .filter_map(|n| phone_key(&n.digits))
            .collect()
    }

    pub fn contact_cell(&self) -> String {
        format_contact(&self.numbers)
    }

    fn matches(&self, cell: &str) -> bool {
        self.numbers.iter().any(|n| phone_matches(cell, &n.digits))
    }

    fn notification(&self) -> OutgoingMail {
        let numbers = self
            .numbers
            .iter()
            .map(PhoneNumber::display)
            .collect::<Vec<_>>()
            .join(", ");
        OutgoingMail {
            subject: "New Event Registration".into(),
            text: format!(
                "New Event Registration:\nName: {}\nGender: {}\nContact Number: {}\nSchool/Organization: {}\nStatus: {}",
                self.name, self.gender, numbers, self.location, self.status
            ),
        }
    }
}

fn parse_number(
    ext: &str,
    raw: &str,
    config: &AppConfig,
) -> Result<Option<PhoneNumber>, AppError> {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return Ok(None);
    }
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return Err(AppError::BadRequest(format!(
            "Phone numbers must have {MIN_PHONE_DIGITS}-{MAX_PHONE_DIGITS} digits"
        )));
    }
    let country_code = if ext.trim().is_empty() {
        config.default_country_code.clone()
    } else {
        normalize_country_code(ext)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid country code: {ext}")))?
    };
    Ok(Some(PhoneNumber {
        country_code,
        digits,
    }))
}

/// Free text from the form, kept literal under `USER_ENTERED`: anything the sheet
/// would read as a formula or a signed number gets the `'` text marker.
pub fn literal_text(raw: &str) -> String {
    if raw.starts_with(['=', '+', '-', '@']) {
        format!("'{raw}")
    } else {
        raw.to_string()
    }
}

/// Names compared loosely for the mismatch warning: case and spacing ignored.
pub fn same_name(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    norm(a) == norm(b)
}

/// Contact cell text: `'+91 9876543210, +1 2345678901`.
///
/// The leading apostrophe makes the sheet keep the value as text instead of
/// turning it into a number or a formula.
pub fn format_contact(numbers: &[PhoneNumber]) -> String {
    let joined = numbers
        .iter()
        .map(PhoneNumber::display)
        .collect::<Vec<_>>()
        .join(", ");
    format!("'{joined}")
}

/// Creates the attendee row, or updates the status of the row that already has one of
/// the submitted numbers.
///
/// Submissions sharing any phone key are serialized, so two concurrent requests for
/// the same person in this process cannot both append. Other processes are not
/// covered; a duplicate scan after each append reports that case. Appends from
/// different people never collide because the sheet picks the row.
pub async fn submit_registration(
    state: &AppState,
    form: &RegistrationForm,
) -> Result<RegistrationOutcome, AppError> {
    let config = state.config.as_ref();
    let registration = Registration::from_form(form, config)?;

    let outcome = {
        let _guards = state
            .registration_locks
            .lock_all(registration.lock_keys())
            .await;
        find_or_append(state.sheet.as_ref(), config, &registration).await?
    };

    if outcome != RegistrationOutcome::Unchanged {
        notify(state, &registration).await;
    }
    Ok(outcome)
}

async fn find_or_append(
    client: &dyn SheetClient,
    config: &AppConfig,
    registration: &Registration,
) -> Result<RegistrationOutcome, AppError> {
    let sheet = config.attendee_sheet.as_str();
    let snap = attendee_repo::load_snapshot(client, sheet).await?;
    let columns = &config.columns;
    let name_col = resolve_column(&snap.header, &columns.name)?;
    let contact_col = resolve_column(&snap.header, &columns.contact)?;
    let location_col = resolve_column(&snap.header, &columns.location)?;
    let gender_col = resolve_column(&snap.header, &columns.gender)?;
    let status_col = resolve_column(
        &snap.header,
        status_column(config, registration.event.as_deref()),
    )?;

    let existing = locate_row(&snap.rows, contact_col, |cell| registration.matches(cell));

    if let Some(index) = existing {
        let stored_name = snap.cell(index, name_col);
        if !same_name(stored_name, &registration.name) {
            warn!(
                row = SheetSnapshot::grid_row(index) + 1,
                stored = %stored_name,
                submitted = %registration.name,
                "⚠️ phone matched an attendee with a different name"
            );
        }
        let current = AttendeeStatus::parse(snap.cell(index, status_col));
        if !registration.status.supersedes(current) {
            info!(row = index, ?current, "registration: attendee already recorded");
            return Ok(RegistrationOutcome::Unchanged);
        }
        let pos = CellPosition {
            row: SheetSnapshot::grid_row(index),
            column: status_col,
        };
        attendee_repo::update_cell(client, sheet, pos, registration.status.as_str()).await?;
        return Ok(RegistrationOutcome::Updated);
    }

    let attendee = NewAttendee {
        name: registration.name.clone(),
        gender: registration.gender.clone(),
        contact: registration.contact_cell(),
        location: registration.location.clone(),
        status: registration.status,
    };

    let width = [name_col, contact_col, location_col, gender_col, status_col]
        .into_iter()
        .max()
        .unwrap_or(0)
        + 1;
    let mut cells = vec![String::new(); width];
    cells[name_col] = literal_text(&attendee.name);
    cells[gender_col] = literal_text(&attendee.gender);
    cells[contact_col] = attendee.contact;
    cells[location_col] = literal_text(&attendee.location);
    cells[status_col] = attendee.status.as_str().to_string();

    let grid_row = attendee_repo::append_row(client, sheet, cells).await?;
    info!(row = grid_row + 1, name = %registration.name, "📝 attendee appended");

    // The first data row's status cell carries the dropdown; a sheet with no data rows has none.
    let reference = CellPosition {
        row: SheetSnapshot::grid_row(0),
        column: status_col,
    };
    if grid_row > reference.row {
        let target = CellPosition {
            row: grid_row,
            column: status_col,
        };
        let sheet_id = attendee_repo::sheet_id(client, sheet).await?;
        attendee_repo::copy_validation(client, sheet_id, reference, target).await?;
    }

    report_duplicates(client, sheet, contact_col, registration).await;
    Ok(RegistrationOutcome::Created)
}

/// Re-reads the sheet and warns when more than one row now matches the registration.
async fn report_duplicates(
    client: &dyn SheetClient,
    sheet: &str,
    contact_col: usize,
    registration: &Registration,
) {
    let snap = match attendee_repo::load_snapshot(client, sheet).await {
        Ok(snap) => snap,
        Err(e) => {
            warn!("duplicate check skipped: {}", e);
            return;
        }
    };
    let mut rows: Vec<usize> = registration
        .numbers
        .iter()
        .flat_map(|n| duplicate_rows(&snap.rows, contact_col, &n.digits))
        .collect();
    rows.sort_unstable();
    rows.dedup();
    if rows.len() > 1 {
        let sheet_rows: Vec<usize> = rows.iter().map(|i| SheetSnapshot::grid_row(*i) + 1).collect();
        warn!(
            name = %registration.name,
            rows = ?sheet_rows,
            "⚠️ duplicate attendee rows for one contact"
        );
    }
}

/// Best effort: the sheet write already succeeded, so a mail failure is only logged.
async fn notify(state: &AppState, registration: &Registration) {
    let Some(mailer) = state.mailer.as_ref() else {
        return;
    };
    if let Err(e) = mailer.send(registration.notification()).await {
        warn!("registration mail failed for {}: {}", registration.name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemorySheet, SheetError};
    use crate::services::mail_service::{MailError, Mailer};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    const SHEET: &str = "MYF attendees";

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    fn seeded_sheet() -> Arc<MemorySheet> {
        let sheet = MemorySheet::new();
        sheet.insert_sheet(
            SHEET,
            vec![
                row(&["Name", "Gender", "Contact", "Location", "Followup owner", "Nov MYF"]),
                row(&["Alice", "female", "+91 9876543210", "Pune", "AAD", "Present"]),
                row(&["Bob", "male", "2345678901", "Mumbai"]),
            ],
            3,
        );
        sheet.set_validation(
            SHEET,
            CellPosition { row: 1, column: 5 },
            "ONE_OF_LIST Registered,Present",
        );
        Arc::new(sheet)
    }

    /// Yields to the scheduler before every call so concurrent submissions interleave
    /// between their read and their write.
    struct YieldingSheet(Arc<MemorySheet>);

    #[async_trait]
    impl SheetClient for YieldingSheet {
        async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
            tokio::task::yield_now().await;
            self.0.read_range(range).await
        }

        async fn write_range(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
            tokio::task::yield_now().await;
            self.0.write_range(range, rows).await
        }

        async fn append_row(
            &self,
            range: &str,
            row: Vec<String>,
        ) -> Result<CellPosition, SheetError> {
            tokio::task::yield_now().await;
            self.0.append_row(range, row).await
        }

        async fn sheet_id(&self, title: &str) -> Result<i64, SheetError> {
            tokio::task::yield_now().await;
            self.0.sheet_id(title).await
        }

        async fn copy_validation(
            &self,
            sheet_id: i64,
            from: CellPosition,
            to: CellPosition,
        ) -> Result<(), SheetError> {
            tokio::task::yield_now().await;
            self.0.copy_validation(sheet_id, from, to).await
        }
    }

    fn interleaved_state(sheet: Arc<MemorySheet>) -> AppState {
        AppState::new(AppConfig::local(), Arc::new(YieldingSheet(sheet)), None)
    }

    fn state_with(sheet: Arc<MemorySheet>, mailer: Option<Arc<RecordingMailer>>) -> AppState {
        AppState::new(
            AppConfig::local(),
            sheet,
            mailer.map(|m| m as Arc<dyn Mailer>),
        )
    }

    fn form(name: &str, number: &str) -> RegistrationForm {
        RegistrationForm {
            name: name.into(),
            gender: "female".into(),
            contact_extension: "+1".into(),
            contact_number: number.into(),
            whatsapp_extension: "+91".into(),
            whatsapp_number: String::new(),
            school_organization: "Fergusson College".into(),
            ..Default::default()
        }
    }

    #[test]
    fn contact_cell_is_forced_to_text() {
        let numbers = vec![
            PhoneNumber {
                country_code: "+1".into(),
                digits: "2345678901".into(),
            },
            PhoneNumber {
                country_code: "+91".into(),
                digits: "9876543210".into(),
            },
        ];
        assert_eq!(format_contact(&numbers), "'+1 2345678901, +91 9876543210");
    }

    #[test]
    fn validation_rejects_bad_submissions() {
        let config = AppConfig::local();
        assert!(Registration::from_form(&form("  ", "2345678901"), &config).is_err());
        assert!(Registration::from_form(&form("Carol", ""), &config).is_err());
        assert!(Registration::from_form(&form("Carol", "12"), &config).is_err());

        let mut bad_ext = form("Carol", "2345678901");
        bad_ext.contact_extension = "+x1".into();
        assert!(Registration::from_form(&bad_ext, &config).is_err());
    }

    #[test]
    fn whatsapp_fills_in_for_contact_and_is_deduplicated() {
        let config = AppConfig::local();
        let mut f = form("Carol", "");
        f.is_whatsapp_same_as_contact = true;
        f.whatsapp_number = "98765 43210".into();
        let reg = Registration::from_form(&f, &config).unwrap();
        assert_eq!(reg.numbers.len(), 1);
        assert_eq!(reg.contact_cell(), "'+91 9876543210");

        let mut f = form("Carol", "");
        f.whatsapp_extension = String::new();
        f.whatsapp_number = "5550001111".into();
        let reg = Registration::from_form(&f, &config).unwrap();
        assert_eq!(reg.contact_cell(), "'+91 5550001111");
    }

    #[tokio::test]
    async fn new_attendee_appends_exactly_one_row() {
        let sheet = seeded_sheet();
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(sheet.clone(), Some(mailer.clone()));

        let outcome = submit_registration(&state, &form("Carol", "555-000-1111"))
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Created);

        let rows = sheet.rows(SHEET);
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[3],
            row(&["Carol", "female", "+1 5550001111", "Fergusson College", "", "Registered"])
        );
        assert_eq!(sheet.row_count(SHEET), 4);
        assert_eq!(
            sheet
                .validation_at(SHEET, CellPosition { row: 3, column: 5 })
                .as_deref(),
            Some("ONE_OF_LIST Registered,Present")
        );
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_attendee_is_updated_in_place() {
        let sheet = seeded_sheet();
        let state = state_with(sheet.clone(), None);

        let outcome = submit_registration(&state, &form("Robert", "+44 2345678901"))
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Updated);

        let rows = sheet.rows(SHEET);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], row(&["Bob", "male", "2345678901", "Mumbai", "", "Registered"]));
    }

    #[tokio::test]
    async fn present_attendee_is_left_alone() {
        let sheet = seeded_sheet();
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(sheet.clone(), Some(mailer.clone()));
        let before = sheet.rows(SHEET);

        let outcome = submit_registration(&state, &form("Alice", "9876543210"))
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Unchanged);
        assert_eq!(sheet.rows(SHEET), before);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn attendance_page_registers_as_present() {
        let sheet = seeded_sheet();
        let state = state_with(sheet.clone(), None);
        let mut f = form("Carol", "5550001111");
        f.is_attendance_page = true;

        submit_registration(&state, &f).await.unwrap();
        assert_eq!(sheet.rows(SHEET)[3][5], "Present");
    }

    #[tokio::test]
    async fn concurrent_duplicate_submissions_append_once() {
        let sheet = seeded_sheet();
        let state = state_with(sheet.clone(), None);

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    submit_registration(&state, &form("Carol", "5550001111")).await
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for t in tasks {
            outcomes.push(t.await.unwrap().unwrap());
        }
        outcomes.sort_by_key(|o| *o != RegistrationOutcome::Created);
        assert_eq!(
            outcomes,
            vec![RegistrationOutcome::Created, RegistrationOutcome::Unchanged]
        );

        let rows = sheet.rows(SHEET);
        assert_eq!(duplicate_rows(&rows[1..], 2, "5550001111"), vec![2]);
    }

    #[tokio::test]
    async fn unlocked_race_is_detectable() {
        // Two writers that both missed each other, e.g. two server processes.
        let sheet = seeded_sheet();
        let config = AppConfig::local();
        let reg = Registration::from_form(&form("Carol", "5550001111"), &config).unwrap();

        find_or_append(&*sheet, &config, &reg).await.unwrap();
        let snap = attendee_repo::load_snapshot(&*sheet, SHEET).await.unwrap();
        let mut cells = snap.rows[2].clone();
        cells.resize(6, String::new());
        attendee_repo::append_row(&*sheet, SHEET, cells).await.unwrap();

        let snap = attendee_repo::load_snapshot(&*sheet, SHEET).await.unwrap();
        assert_eq!(duplicate_rows(&snap.rows, 2, "5550001111"), vec![2, 3]);
    }

    #[tokio::test]
    async fn different_people_registering_together_both_get_rows() {
        let sheet = seeded_sheet();
        let state = interleaved_state(sheet.clone());

        let carol = form("Carol", "5550001111");
        let dave = form("Dave", "5550002222");
        let (a, b) = tokio::join!(
            submit_registration(&state, &carol),
            submit_registration(&state, &dave)
        );
        assert_eq!(a.unwrap(), RegistrationOutcome::Created);
        assert_eq!(b.unwrap(), RegistrationOutcome::Created);

        let rows = sheet.rows(SHEET);
        assert_eq!(rows.len(), 5);
        let mut names: Vec<&str> = rows[3..].iter().map(|r| r[0].as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Carol", "Dave"]);
        for row in [3, 4] {
            assert_eq!(
                sheet
                    .validation_at(SHEET, CellPosition { row, column: 5 })
                    .as_deref(),
                Some("ONE_OF_LIST Registered,Present")
            );
        }
    }

    #[tokio::test]
    async fn whatsapp_number_shared_with_another_submission_appends_once() {
        let sheet = seeded_sheet();
        let state = interleaved_state(sheet.clone());

        let mut both = form("Carol", "5550001111");
        both.whatsapp_number = "5550007777".into();
        let whatsapp_only = form("Carol", "5550007777");

        let (a, b) = tokio::join!(
            submit_registration(&state, &both),
            submit_registration(&state, &whatsapp_only)
        );
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| *o != RegistrationOutcome::Created);
        assert_eq!(
            outcomes,
            vec![RegistrationOutcome::Created, RegistrationOutcome::Unchanged]
        );
        assert_eq!(sheet.rows(SHEET).len(), 4);
    }

    #[test]
    fn lock_keys_cover_every_number() {
        let config = AppConfig::local();
        let mut f = form("Carol", "5550001111");
        f.whatsapp_number = "5550007777".into();
        let reg = Registration::from_form(&f, &config).unwrap();
        assert_eq!(reg.lock_keys(), vec!["1111", "7777"]);
    }

    #[tokio::test]
    async fn free_text_is_stored_literally() {
        let sheet = seeded_sheet();
        let state = state_with(sheet.clone(), None);
        let mut f = form("=HYPERLINK(\"http://example.com\")", "5550001111");
        f.gender = "-".into();
        f.school_organization = "@home".into();

        submit_registration(&state, &f).await.unwrap();

        let rows = sheet.rows(SHEET);
        assert_eq!(rows[3][0], "=HYPERLINK(\"http://example.com\")");
        assert_eq!(rows[3][1], "-");
        assert_eq!(rows[3][3], "@home");
        for column in 0..6 {
            assert!(!sheet.is_formula(SHEET, CellPosition { row: 3, column }));
        }
    }

    #[test]
    fn literal_text_marks_only_risky_values() {
        assert_eq!(literal_text("=1+1"), "'=1+1");
        assert_eq!(literal_text("+91"), "'+91");
        assert_eq!(literal_text("Fergusson College"), "Fergusson College");
        assert_eq!(literal_text(""), "");
    }

    #[tokio::test]
    async fn matching_phone_with_other_name_still_updates() {
        let sheet = seeded_sheet();
        let state = state_with(sheet.clone(), None);

        assert!(!same_name("Bob", "Carol"));
        assert!(same_name(" bob  ", "Bob"));

        let outcome = submit_registration(&state, &form("Carol", "999 2345678901"))
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Updated);
        assert_eq!(sheet.rows(SHEET)[2][0], "Bob");
    }
}
