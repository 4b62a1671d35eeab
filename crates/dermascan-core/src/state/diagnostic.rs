//! Diagnostic slice: current diagnostic, history, and normalization of the
//! service's response shapes into [`DiagnosticRecord`].

use serde::Serialize;

use super::effects::{Effect, Notice};
use super::status::RequestStatus;
use crate::api::{
    DiagnosticItem, DiagnosticPatch, Operation, PatientFields, RecordId, SubmittedDiagnostic,
};

/// Classifier score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Clamps into [0, 1]; NaN becomes 0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Uses the service's score when present, else the placeholder.
    pub fn or_placeholder(value: Option<f64>, placeholder: f64) -> Self {
        Self::new(value.unwrap_or(placeholder))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Percentage with one decimal, e.g. `95.0`.
    pub fn percent(self) -> String {
        format!("{:.1}", self.0 * 100.0)
    }
}

/// One stored result of an image classification request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub id: RecordId,
    pub image: Option<String>,
    pub diagnosis: String,
    pub confidence: Confidence,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub created_at: Option<String>,
}

impl DiagnosticRecord {
    /// Normalizes a submit response, taking patient fields from the request.
    pub fn from_submission(
        submitted: SubmittedDiagnostic,
        patient: &PatientFields,
        placeholder: f64,
    ) -> Self {
        Self {
            id: submitted.id,
            image: submitted.image_url,
            diagnosis: submitted.diagnostic,
            confidence: Confidence::or_placeholder(submitted.confidence, placeholder),
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            birth_date: patient.birth_date.clone(),
            created_at: submitted.date,
        }
    }

    /// Normalizes one history item.
    pub fn from_item(item: DiagnosticItem, placeholder: f64) -> Self {
        Self {
            id: item.id,
            image: item.image_url,
            diagnosis: item.diagnostic_result,
            confidence: Confidence::or_placeholder(item.confidence, placeholder),
            first_name: item.prenom,
            last_name: item.nom,
            birth_date: item.date_naissance,
            created_at: item.date_diagnostic,
        }
    }

    pub fn patient_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Overwrites every field the patch carries. The id never changes.
    pub fn apply(&mut self, patch: &DiagnosticPatch) {
        if let Some(v) = &patch.first_name {
            self.first_name.clone_from(v);
        }
        if let Some(v) = &patch.last_name {
            self.last_name.clone_from(v);
        }
        if let Some(v) = &patch.birth_date {
            self.birth_date.clone_from(v);
        }
        if let Some(v) = &patch.diagnosis {
            self.diagnosis.clone_from(v);
        }
        if let Some(v) = &patch.image {
            self.image = Some(v.clone());
        }
        if let Some(v) = &patch.created_at {
            self.created_at = Some(v.clone());
        }
        if let Some(v) = patch.confidence {
            self.confidence = Confidence::new(v);
        }
    }
}

/// Diagnostic slice state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticState {
    /// History, most recent first.
    pub diagnostics: Vec<DiagnosticRecord>,
    pub current: Option<DiagnosticRecord>,
    pub status: RequestStatus,
}

impl DiagnosticState {
    pub fn find(&self, id: &RecordId) -> Option<&DiagnosticRecord> {
        self.diagnostics.iter().find(|d| &d.id == id)
    }
}

/// Events the diagnostic reducer understands.
#[derive(Debug, Clone)]
pub enum DiagnosticAction {
    /// An operation was dispatched.
    Pending(Operation),
    Submitted(DiagnosticRecord),
    Fetched(Vec<DiagnosticRecord>),
    Updated(DiagnosticPatch),
    Deleted(RecordId),
    Rejected {
        operation: Operation,
        message: String,
    },
    ClearCurrent,
    ClearError,
}

/// Short notice shown when an operation fails; the detailed message stays
/// in the slice's `error`.
fn failure_notice(operation: Operation) -> &'static str {
    match operation {
        Operation::SubmitDiagnostic => "Diagnostic submission failed",
        Operation::FetchDiagnostics => "Failed to load diagnostics",
        Operation::DeleteDiagnostic => "Failed to delete diagnostic",
        Operation::UpdateDiagnostic => "Failed to update diagnostic",
        other => other.fallback_message(),
    }
}

/// Diagnostic reducer.
pub fn reduce(state: &mut DiagnosticState, action: DiagnosticAction) -> Vec<Effect> {
    match action {
        DiagnosticAction::Pending(_) => {
            state.status.start();
            vec![]
        }
        DiagnosticAction::Submitted(record) => {
            state.status.settle_ok();
            state.diagnostics.insert(0, record.clone());
            state.current = Some(record);
            vec![]
        }
        DiagnosticAction::Fetched(records) => {
            state.status.settle_ok();
            state.diagnostics = records;
            vec![]
        }
        DiagnosticAction::Updated(patch) => {
            state.status.settle_ok();
            if let Some(id) = &patch.id {
                for record in state.diagnostics.iter_mut().filter(|d| &d.id == id) {
                    record.apply(&patch);
                }
                if let Some(current) = state.current.as_mut().filter(|d| &d.id == id) {
                    current.apply(&patch);
                }
            }
            vec![Effect::Notify(Notice::success("Diagnostic updated"))]
        }
        DiagnosticAction::Deleted(id) => {
            state.status.settle_ok();
            state.diagnostics.retain(|d| d.id != id);
            if state.current.as_ref().is_some_and(|d| d.id == id) {
                state.current = None;
            }
            vec![Effect::Notify(Notice::success("Diagnostic deleted"))]
        }
        DiagnosticAction::Rejected { operation, message } => {
            let message = if message.trim().is_empty() {
                operation.fallback_message().to_string()
            } else {
                message
            };
            state.status.settle_err(message);
            vec![Effect::Notify(Notice::error(failure_notice(operation)))]
        }
        DiagnosticAction::ClearCurrent => {
            state.current = None;
            vec![]
        }
        DiagnosticAction::ClearError => {
            state.status.error = None;
            vec![]
        }
    }
}
