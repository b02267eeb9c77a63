use thiserror::Error;

/// Error type for the consolidation core.
///
/// Per-file failures (`MissingRequiredColumns`, `UnreadableSource`) never
/// abort a batch; they are collected per source. Per-brand failures
/// (`MissingConfiguration`, `IncompleteConfiguration`, `UnknownOrigin`)
/// abort only that brand's output. Unparseable dates are not an error at
/// all; they coerce to an empty cell.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    // The file name field is called `file`, not `source`: thiserror gives a
    // field named `source` std::error::Error::source() semantics, which a
    // String cannot satisfy.
    #[error("{file}: missing required columns: {}", .columns.join(", "))]
    MissingRequiredColumns { file: String, columns: Vec<String> },

    #[error("{file}: could not be read as a table: {reason}")]
    UnreadableSource { file: String, reason: String },

    #[error("brand '{brand}': no configuration supplied")]
    MissingConfiguration { brand: String },

    #[error("brand '{brand}': per-source configuration missing entries for: {}", .missing.join(", "))]
    IncompleteConfiguration { brand: String, missing: Vec<String> },

    #[error("brand '{brand}': record from '{file}' has no configuration entry")]
    UnknownOrigin { brand: String, file: String },

    #[error("year {0} is outside the supported range 2023-2100")]
    InvalidYear(i32),

    #[error("'{0}' is not one of the twelve month names")]
    UnknownMonth(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConsolidateError {
    pub(crate) fn unreadable(file: &str, reason: impl ToString) -> Self {
        ConsolidateError::UnreadableSource {
            file: file.to_string(),
            reason: reason.to_string(),
        }
    }
}
