use thiserror::Error;

/// Target-scoped extraction failures. None of these abort a cycle except
/// `SessionUnavailable`, which invalidates the whole group's pass.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extraction timed out")]
    Timeout,

    #[error("Target page not found: {0}")]
    NotFound(String),

    #[error("Failed to parse extracted content: {0}")]
    Parse(String),

    #[error("Render session unavailable: {0}")]
    SessionUnavailable(String),
}

/// Marker store read/write failure. Read failures skip the target for the
/// cycle (a stale marker is always preferred over assuming none); write
/// failures are reported but do not undo deliveries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Notification transport failure. Transient failures are retried with
/// backoff by the dispatcher; permanent ones surface immediately.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Transient transport failure{}: {message}", status_suffix(.status))]
    Transient {
        status: Option<u16>,
        message: String,
    },

    #[error("Permanent transport failure (status {status}): {message}")]
    Permanent { status: u16, message: String },
}

impl DispatchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DispatchError::Transient { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" (status {s})"),
        None => String::new(),
    }
}
