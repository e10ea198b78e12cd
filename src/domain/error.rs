//! Domain error types.

/// Top-level error type for tearsheet.
#[derive(Debug, thiserror::Error)]
pub enum TearsheetError {
    #[error("missing data: {reason}")]
    MissingData { reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("division by zero: {reason}")]
    DivisionByZero { reason: String },

    #[error("alignment error: {reason}")]
    Alignment { reason: String },

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

    #[error("failed to load {file}: {reason}")]
    DataLoad { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TearsheetError {
    pub fn missing_data(reason: impl Into<String>) -> Self {
        TearsheetError::MissingData {
            reason: reason.into(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        TearsheetError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn division_by_zero(reason: impl Into<String>) -> Self {
        TearsheetError::DivisionByZero {
            reason: reason.into(),
        }
    }

    pub fn alignment(reason: impl Into<String>) -> Self {
        TearsheetError::Alignment {
            reason: reason.into(),
        }
    }
}

impl From<&TearsheetError> for std::process::ExitCode {
    fn from(err: &TearsheetError) -> Self {
        let code: u8 = match err {
            TearsheetError::Io(_) => 1,
            TearsheetError::ConfigParse { .. }
            | TearsheetError::ConfigMissing { .. }
            | TearsheetError::ConfigInvalid { .. } => 2,
            TearsheetError::DataLoad { .. } => 3,
            TearsheetError::MissingData { .. } | TearsheetError::Alignment { .. } => 5,
            TearsheetError::InvalidInput { .. } | TearsheetError::DivisionByZero { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = TearsheetError::division_by_zero("running max is zero on 2020-01-02");
        assert_eq!(
            err.to_string(),
            "division by zero: running max is zero on 2020-01-02"
        );
    }

    #[test]
    fn config_missing_display() {
        let err = TearsheetError::ConfigMissing {
            section: "report".into(),
            key: "live_start_date".into(),
        };
        assert_eq!(err.to_string(), "missing config key [report] live_start_date");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::other("disk full");
        let err: TearsheetError = io.into();
        assert!(matches!(err, TearsheetError::Io(_)));
    }
}
