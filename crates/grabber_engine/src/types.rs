use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Opaque per-transfer token. Time based; only meant to be unique for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Millisecond wall-clock timestamp, like the ids handed to the browser UI.
    pub fn generate() -> Self {
        Self(chrono::Utc::now().timestamp_millis().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransferId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub display_name: String,
    pub direct_url: String,
    pub transfer_id: TransferId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub transfer_id: TransferId,
    /// Sanitized name, as written under the output directory.
    pub file_name: String,
    pub path: PathBuf,
    pub bytes_written: u64,
    pub bytes_expected: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Failed to fetch page with status code: {status}")]
    FetchFailed { status: u16 },
    #[error("Download URL not found in the page")]
    PatternNotFound,
    #[error("Error processing link: {cause}")]
    NetworkError { cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("Error downloading file: {message}")]
    RemoteFetchFailed {
        status: Option<u16>,
        message: String,
    },
    #[error("Error writing file {file_name}: {message}")]
    SinkWriteFailed { file_name: String, message: String },
    #[error("Download interrupted: {message}")]
    StreamInterrupted { message: String },
}

impl TransferError {
    /// True when the remote side is at fault rather than local storage.
    pub fn is_remote(&self) -> bool {
        matches!(self, TransferError::RemoteFetchFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Request fields that were absent or blank, in request order.
    #[error("{}", missing_fields_message(.0))]
    MissingField(Vec<&'static str>),
}

fn missing_fields_message(fields: &[&'static str]) -> String {
    match fields {
        [] => "a required field is missing".to_string(),
        [only] => format!("{only} is required"),
        [init @ .., last] => format!("{} and {last} are required", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_messages_read_naturally() {
        assert_eq!(
            ValidationError::MissingField(vec!["link"]).to_string(),
            "link is required"
        );
        assert_eq!(
            ValidationError::MissingField(vec!["URL", "fileName"]).to_string(),
            "URL and fileName are required"
        );
    }
}
