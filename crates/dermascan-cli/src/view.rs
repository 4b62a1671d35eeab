//! Text rendering for records, profiles and notices.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use comfy_table::{ContentArrangement, Table};
use dermascan_core::api::UserProfile;
use dermascan_core::state::{Confidence, DiagnosticRecord, Notice, NoticeLevel};

const BAR_WIDTH: usize = 20;

/// Prints notices to stderr so stdout stays machine-readable.
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        eprintln!("{}", notice_line(notice));
    }
}

fn notice_line(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Success => format!("✓ {}", notice.message),
        NoticeLevel::Error => format!("✗ {}", notice.message),
    }
}

/// Masks a token for display (shows first 12 chars).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}

/// Human date for a service timestamp.
///
/// Accepts RFC 3339, naive ISO date-times and plain `YYYY-MM-DD`.
pub fn format_date(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return "unknown date".to_string();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%B %-d, %Y %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%B %-d, %Y %H:%M").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%B %-d, %Y").to_string();
    }
    "invalid date".to_string()
}

pub fn confidence_bar(confidence: Confidence) -> String {
    let filled = ((confidence.value() * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        confidence.percent()
    )
}

pub fn diagnostic_card(record: &DiagnosticRecord) -> String {
    let mut lines = vec![
        format!("Diagnostic #{}", record.id),
        format!("  Diagnosis:   {}", record.diagnosis),
        format!("  Confidence:  {}", confidence_bar(record.confidence)),
        format!("  Patient:     {}", record.patient_name()),
        format!(
            "  Born:        {}",
            format_date(Some(record.birth_date.as_str()))
        ),
        format!("  Date:        {}", format_date(record.created_at.as_deref())),
    ];
    if let Some(image) = &record.image {
        lines.push(format!("  Image:       {image}"));
    }
    lines.join("\n")
}

pub fn history_table(records: &[DiagnosticRecord]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID",
        "Date",
        "Patient",
        "Birth date",
        "Diagnosis",
        "Confidence",
    ]);
    for record in records {
        table.add_row(vec![
            record.id.to_string(),
            format_date(record.created_at.as_deref()),
            record.patient_name(),
            record.birth_date.clone(),
            record.diagnosis.clone(),
            format!("{}%", record.confidence.percent()),
        ]);
    }
    table
}

pub fn profile(profile: &UserProfile) -> String {
    let full_name = format!("{} {}", profile.first_name, profile.last_name);
    let full_name = full_name.trim();
    let mut lines = vec![
        format!("Username:  {}", profile.username),
        format!("Email:     {}", profile.email),
        format!(
            "Name:      {}",
            if full_name.is_empty() { "-" } else { full_name }
        ),
    ];
    if let Some(avatar) = profile.avatar.as_deref().filter(|a| !a.is_empty()) {
        // data URLs are too long to be useful on a terminal
        if avatar.starts_with("data:") {
            lines.push("Avatar:    (embedded image)".to_string());
        } else {
            lines.push(format!("Avatar:    {avatar}"));
        }
    }
    lines.join("\n")
}
