//! CLI-specific error types
//!
//! Every failure ends the invocation with one JSON error object and a
//! non-zero exit code. Cluster failures keep their own `TOPO_*` code.

use std::fmt;
use std::io;

use crate::cluster::ClusterError;
use crate::reconcile::{ActionError, Diagnostics};

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Failure reported by the cluster or the connection layer
    Cluster(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "TOPO_CLI_CONFIG_ERROR",
            Self::IoError => "TOPO_CLI_IO_ERROR",
            Self::Cluster(code) => code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    diagnostics: Diagnostics,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Snapshots gathered before the failure
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ClusterError> for CliError {
    fn from(e: ClusterError) -> Self {
        Self::new(CliErrorCode::Cluster(e.code()), e.to_string())
    }
}

impl From<ActionError> for CliError {
    fn from(e: ActionError) -> Self {
        Self {
            code: CliErrorCode::Cluster(e.code()),
            message: e.to_string(),
            diagnostics: e.diagnostics().clone(),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_codes() {
        assert_eq!(CliError::config_error("x").code_str(), "TOPO_CLI_CONFIG_ERROR");
        assert_eq!(CliError::io_error("x").code_str(), "TOPO_CLI_IO_ERROR");
    }

    #[test]
    fn test_cluster_error_keeps_its_code() {
        let err = CliError::from(ClusterError::Auth("bad password".into()));
        assert_eq!(err.code_str(), "TOPO_AUTH_FAILED");
        assert!(err.to_string().starts_with("TOPO_AUTH_FAILED: "));
        assert!(err.diagnostics().is_empty());
    }

    #[test]
    fn test_action_error_keeps_diagnostics() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("member", &"h2:27018");
        let action = ActionError::new("Unable to add member", ClusterError::NoReplicaSet, diagnostics);

        let err = CliError::from(action);
        assert_eq!(err.code(), &CliErrorCode::Cluster("TOPO_NO_REPLICA_SET"));
        assert_eq!(err.diagnostics().len(), 1);
    }
}
