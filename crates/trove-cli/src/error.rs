//! CLI error type and exit-code mapping.

use std::fmt::{self, Display, Formatter};

/// Exit code for configuration and telemetry-setup errors.
pub(crate) const EXIT_VALIDATION: i32 = 2;
/// Exit code for fatal batch errors or any failed leaf or date task.
pub(crate) const EXIT_FAILURE: i32 = 3;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => EXIT_VALIDATION,
            Self::Failure(_) => EXIT_FAILURE,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn failure_message_includes_context_chain() {
        let err: anyhow::Result<()> = Err(anyhow!("disk full")).context("writing metrics");
        let message = err.map_err(CliError::failure).unwrap_err().display_message();
        assert_eq!(message, "writing metrics: disk full");
        assert_eq!(CliError::validation("bad flag").display_message(), "bad flag");
    }
}
