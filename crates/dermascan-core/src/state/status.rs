//! Request status shared by all operations of one slice.

/// `{ loading, error }` projection of a slice.
///
/// One per slice: a second operation in flight overwrites the first's
/// projection, and the last settlement wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStatus {
    pub loading: bool,
    pub error: Option<String>,
}

impl RequestStatus {
    pub(crate) fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn settle_ok(&mut self) {
        self.loading = false;
        self.error = None;
    }

    pub(crate) fn settle_err(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }
}
