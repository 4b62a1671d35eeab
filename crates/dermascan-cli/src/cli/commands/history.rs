//! History command handlers.
//!
//! Nothing is cached between runs, so every subcommand starts by loading
//! the full list from the service.

use anyhow::{Result, anyhow, bail};
use dermascan_core::api::RecordId;
use dermascan_core::state::DiagnosticRecord;
use dermascan_core::validation;

use super::{print_json, require_login, settle};
use crate::cli::App;
use crate::view;

/// Patient fields given on the command line; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct PatientEdits {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
}

impl PatientEdits {
    fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.birth_date.is_none()
    }
}

fn parse_id(id: &str) -> Result<RecordId> {
    RecordId::new(id.trim()).ok_or_else(|| anyhow!("diagnostic id must not be empty"))
}

async fn load(app: &mut App) -> Result<()> {
    let outcome = app.store.fetch_diagnostics().await;
    settle(app, outcome)
}

fn find<'a>(app: &'a App, id: &RecordId) -> Result<&'a DiagnosticRecord> {
    app.store
        .state()
        .diagnostic
        .find(id)
        .ok_or_else(|| anyhow!("No diagnostic with id {id}"))
}

fn print_record(app: &App, record: &DiagnosticRecord) -> Result<()> {
    if app.json {
        print_json(record)
    } else {
        println!("{}", view::diagnostic_card(record));
        Ok(())
    }
}

pub async fn list(app: &mut App) -> Result<()> {
    require_login(app)?;
    load(app).await?;

    let records = &app.store.state().diagnostic.diagnostics;
    if app.json {
        return print_json(records);
    }
    if records.is_empty() {
        println!("No diagnostics yet.");
    } else {
        println!("{}", view::history_table(records));
    }
    Ok(())
}

pub async fn show(app: &mut App, id: &str) -> Result<()> {
    require_login(app)?;
    let id = parse_id(id)?;
    load(app).await?;
    print_record(app, find(app, &id)?)
}

pub async fn update(app: &mut App, id: &str, edits: PatientEdits) -> Result<()> {
    require_login(app)?;
    let id = parse_id(id)?;
    if edits.is_empty() {
        bail!("Nothing to update: pass --first-name, --last-name or --birth-date");
    }
    load(app).await?;

    let existing = find(app, &id)?;
    let today = chrono::Local::now().date_naive();
    let fields = validation::patient_fields(
        edits.first_name.as_deref().unwrap_or(&existing.first_name),
        edits.last_name.as_deref().unwrap_or(&existing.last_name),
        edits.birth_date.as_deref().unwrap_or(&existing.birth_date),
        today,
    )?;

    let outcome = app.store.update_diagnostic(&id, &fields).await;
    settle(app, outcome)?;
    print_record(app, find(app, &id)?)
}

pub async fn delete(app: &mut App, id: &str) -> Result<()> {
    require_login(app)?;
    let id = parse_id(id)?;
    load(app).await?;
    find(app, &id)?;

    let outcome = app.store.delete_diagnostic(&id).await;
    settle(app, outcome)
}
