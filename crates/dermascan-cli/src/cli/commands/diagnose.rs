//! Diagnose command handler.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use dermascan_core::images::{ImageUpload, normalize_input_path};
use dermascan_core::validation;
use tracing::info;

use super::{print_json, require_login, settle};
use crate::cli::App;
use crate::view;

pub async fn run(
    app: &mut App,
    first_name: &str,
    last_name: &str,
    birth_date: &str,
    image: &str,
) -> Result<()> {
    require_login(app)?;

    let today = chrono::Local::now().date_naive();
    let patient = validation::patient_fields(first_name, last_name, birth_date, today)?;
    let path = normalize_input_path(image);
    let upload =
        ImageUpload::from_path(&path).with_context(|| format!("load {}", path.display()))?;
    info!(
        file = %upload.file_name,
        mime = %upload.mime_type,
        bytes = upload.bytes.len(),
        "submitting image"
    );

    if io::stderr().is_terminal() {
        let mut shown = false;
        app.store.subscribe(move |state| {
            if state.diagnostic.status.loading && !shown {
                shown = true;
                eprintln!("Analyzing image...");
            }
        });
    }

    let outcome = app.store.submit_diagnostic(&patient, &upload).await;
    settle(app, outcome)?;

    let Some(record) = &app.store.state().diagnostic.current else {
        return Ok(());
    };
    if app.json {
        print_json(record)
    } else {
        println!("{}", view::diagnostic_card(record));
        Ok(())
    }
}
