//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for turtle.
#[derive(Debug, thiserror::Error)]
pub enum TurtleError {
    #[error("bar dates out of order at index {index}: {current} does not follow {previous}")]
    DataOrdering {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data in {path}")]
    NoData { path: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TurtleError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TurtleError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TurtleError> for std::process::ExitCode {
    fn from(err: &TurtleError) -> Self {
        let code: u8 = match err {
            TurtleError::Io(_) => 1,
            TurtleError::ConfigParse { .. }
            | TurtleError::ConfigMissing { .. }
            | TurtleError::ConfigInvalid { .. } => 2,
            TurtleError::DataSource { .. } => 3,
            TurtleError::DataOrdering { .. } => 4,
            TurtleError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
