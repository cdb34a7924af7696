use std::sync::Arc;

use crate::config::{AppConfig, SheetBackend};
use crate::database::{GoogleSheetsClient, MemorySheet, SheetClient};
use crate::services::locks::KeyedLocks;
use crate::services::mail_service::{MailError, Mailer, SmtpMailer};

/// Shared by every handler. Holds no attendee data; each request re-reads the sheet.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sheet: Arc<dyn SheetClient>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub registration_locks: KeyedLocks,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sheet: Arc<dyn SheetClient>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sheet,
            mailer,
            registration_locks: KeyedLocks::new(),
        }
    }

    /// Builds the sheet client and mailer the configuration asks for.
    pub fn from_config(config: AppConfig) -> Result<Self, MailError> {
        let sheet: Arc<dyn SheetClient> = match &config.backend {
            SheetBackend::Google {
                spreadsheet_id,
                credentials,
                api_url,
            } => {
                let client = GoogleSheetsClient::new(spreadsheet_id.clone(), credentials.clone());
                match api_url {
                    Some(url) => Arc::new(client.with_base_url(url.clone())),
                    None => Arc::new(client),
                }
            }
            SheetBackend::Memory => Arc::new(
                MemorySheet::new().with_sheet(&config.attendee_sheet, vec![default_header(&config)]),
            ),
        };

        let mailer: Option<Arc<dyn Mailer>> = match &config.smtp {
            Some(smtp) => Some(Arc::new(SmtpMailer::new(smtp)?)),
            None => None,
        };

        Ok(Self::new(config, sheet, mailer))
    }
}

/// Header row seeded into an empty in-memory sheet.
pub fn default_header(config: &AppConfig) -> Vec<String> {
    let c = &config.columns;
    vec![
        c.name.clone(),
        c.gender.clone(),
        c.contact.clone(),
        c.location.clone(),
        c.followup_owner.clone(),
        config.event_column.clone(),
    ]
}
