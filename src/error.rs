//! Error and notice types raised by the ingestion, merge, and summary stages.
//!
//! Hard failures are [`DashboardError`] variants. Page handlers catch them at a
//! single boundary and render [`DashboardError::user_message`] instead of
//! propagating. Conditions that are not failures (nothing merged yet, no
//! `value` column) are [`Notice`]s checked before the computation runs.

use std::fmt;

use thiserror::Error;

pub type DashboardResult<T> = Result<T, DashboardError>;

/// Which upload a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    First,
    Second,
}

impl Source {
    pub fn ordinal(self) -> usize {
        match self {
            Source::First => 1,
            Source::Second => 2,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data source {}", self.ordinal())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DashboardError {
    /// The upload is not valid CSV (empty stream, empty header, overlong rows).
    #[error("could not parse {side}: {reason}")]
    Parse { side: Source, reason: String },

    /// The join key is absent from one of the tables.
    #[error("key column '{column}' not found in {side}")]
    Key { column: String, side: Source },

    /// The join key is numeric on one side and text on the other.
    #[error("key column '{column}' is {first} in data source 1 but {second} in data source 2")]
    KeyTypeMismatch {
        column: String,
        first: &'static str,
        second: &'static str,
    },

    /// The merged columns disagree on their length.
    #[error("could not assemble merged table: {reason}")]
    Merge { reason: String },

    /// An upload could not be read from disk.
    #[error("could not read upload {slot}: {reason}")]
    Upload { slot: usize, reason: String },
}

impl DashboardError {
    pub fn parse(side: Source, reason: impl Into<String>) -> Self {
        Self::Parse {
            side,
            reason: reason.into(),
        }
    }

    pub fn key(column: impl Into<String>, side: Source) -> Self {
        Self::Key {
            column: column.into(),
            side,
        }
    }

    /// Text shown on the page when a handler catches this error.
    pub fn user_message(&self) -> String {
        format!("Error processing data: {self}")
    }
}

/// Informational and warning conditions surfaced by page handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Summary requested before any successful merge.
    MissingData,
    /// The sum column is not present in the merged table.
    MissingColumn(String),
    /// The sum column exists but holds text.
    NonNumericColumn(String),
    /// Ingestion page visited with fewer than two uploads.
    AwaitingUploads,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MissingData => write!(
                f,
                "No data found. Please upload data in the 'Data Ingestion' section."
            ),
            Notice::MissingColumn(name) => write!(
                f,
                "Column '{name}' not found. Please ensure your data has the correct numeric field."
            ),
            Notice::NonNumericColumn(name) => write!(
                f,
                "Column '{name}' is not numeric. Please ensure your data has the correct numeric field."
            ),
            Notice::AwaitingUploads => write!(f, "Please upload both data sources to proceed."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefixes_error_text() {
        let err = DashboardError::key("product_id", Source::Second);
        assert_eq!(
            err.user_message(),
            "Error processing data: key column 'product_id' not found in data source 2"
        );
    }

    #[test]
    fn merge_assembly_failure_is_reported() {
        let err = DashboardError::Merge {
            reason: "columns differ in length".into(),
        };
        assert_eq!(
            err.user_message(),
            "Error processing data: could not assemble merged table: columns differ in length"
        );
    }

    #[test]
    fn notices_name_the_column() {
        let text = Notice::MissingColumn("value".into()).to_string();
        assert!(text.starts_with("Column 'value' not found"));
    }
}
