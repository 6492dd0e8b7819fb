//! Error types for the CLI API engine

use crate::args::TokenizeError;
use crate::binder::ArgumentError;
use thiserror::Error;

/// Result type for dispatch runs
pub type CliResult<T> = Result<T, CliError>;

/// Fatal errors returned from a dispatch run.
///
/// Mistakes in the user's input never show up here. They are routed
/// through the escalation chain and end as an exit code. What remains are
/// metadata authoring mistakes and caller-side conditions.
#[derive(Debug, Error)]
pub enum CliError {
    /// Metadata authoring mistake detected while building or binding
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller's cancellation token fired before dispatch started
    #[error("Dispatch cancelled")]
    Cancelled,

    /// Configuration file could not be read or parsed
    #[error("Config file error: {0}")]
    Config(String),
}

impl CliError {
    /// Create a configuration fault
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a config file error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

/// Recoverable failures captured on the run context and handed to the
/// escalation chain.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Raw input could not be tokenized
    #[error("Malformed arguments: {0}")]
    Tokenize(#[from] TokenizeError),

    /// A slot could not be bound from the tokens
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// No API or method could be identified
    #[error("{0}")]
    Resolution(String),

    /// The invoked command failed
    #[error("{0}")]
    Invocation(anyhow::Error),
}

impl DispatchError {
    /// Create a resolution miss
    pub fn resolution<S: Into<String>>(msg: S) -> Self {
        Self::Resolution(msg.into())
    }

    /// Name of the argument the failure is tied to, if any
    pub fn argument_name(&self) -> Option<&str> {
        match self {
            Self::Argument(e) => Some(e.argument()),
            _ => None,
        }
    }

    /// Whether this failure counts as an exception. Resolution misses
    /// don't: they only mean that nothing was selected.
    pub fn is_exception(&self) -> bool {
        !matches!(self, Self::Resolution(_))
    }

    /// Whether the failure came from the invoked command itself
    pub fn is_invocation(&self) -> bool {
        matches!(self, Self::Invocation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_is_not_an_exception() {
        let miss = DispatchError::resolution("Unknown API \"nope\"");
        assert!(!miss.is_exception());
        assert!(miss.argument_name().is_none());
        assert_eq!(miss.to_string(), "Unknown API \"nope\"");
    }

    #[test]
    fn test_argument_error_keeps_name() {
        let error: DispatchError = ArgumentError::new("message", "Missing required argument").into();
        assert!(error.is_exception());
        assert_eq!(error.argument_name(), Some("message"));
        assert!(error.to_string().contains("message"));
    }

    #[test]
    fn test_invocation_error() {
        let error = DispatchError::Invocation(anyhow::anyhow!("boom"));
        assert!(error.is_invocation());
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn test_cli_error_messages() {
        let error = CliError::configuration("Method \"echo\" declared twice");
        assert_eq!(error.to_string(), "Configuration error: Method \"echo\" declared twice");
        assert_eq!(CliError::Cancelled.to_string(), "Dispatch cancelled");
        assert!(matches!(CliError::config("bad"), CliError::Config(message) if message == "bad"));
    }
}
