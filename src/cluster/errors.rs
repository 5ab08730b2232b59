//! Cluster Error Types
//!
//! Every failure a reconciliation action can report. Transport failures and
//! domain conditions (no replica set, no primary) are distinct kinds so the
//! controllers can branch on them instead of on error strings.

use thiserror::Error;

/// Result type for cluster operations
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Cluster errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    // ==================
    // Startup / Connection
    // ==================

    /// Binary was built without a database driver
    #[error("database driver unavailable: {0}")]
    DriverUnavailable(String),

    /// Endpoint unreachable
    #[error("unable to connect to database: {0}")]
    Connection(String),

    /// Credentials rejected by the server
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Exactly one of user/password was supplied
    #[error("when supplying login arguments, both login_user and login_password must be provided")]
    IncompleteCredentials,

    // ==================
    // Topology
    // ==================

    /// The node already belongs to another replica set
    #[error("replica set '{existing}' is already defined on this host, cannot use '{requested}'")]
    Conflict { existing: String, requested: String },

    /// No replica set has been initiated on the node
    #[error("no replica set is initiated on this host")]
    NoReplicaSet,

    /// Replica set exists but no member currently holds PRIMARY
    #[error("unable to find PRIMARY member of replica set '{replica_set}'")]
    NoPrimary { replica_set: String },

    /// Reconfiguration submitted against a stale version
    #[error("reconfiguration rejected, config version {submitted} is stale: {detail}")]
    VersionConflict { submitted: i32, detail: String },

    // ==================
    // Commands
    // ==================

    /// Any other server-side command failure
    #[error("command '{command}' failed: {detail}")]
    Command { command: String, detail: String },

    /// Response did not decode into the expected shape
    #[error("malformed '{command}' response: {detail}")]
    MalformedResponse { command: String, detail: String },
}

impl ClusterError {
    /// Create a command failure.
    pub fn command(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Stable error code for the JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DriverUnavailable(_) => "TOPO_DRIVER_UNAVAILABLE",
            Self::Connection(_) => "TOPO_CONNECTION_FAILED",
            Self::Auth(_) => "TOPO_AUTH_FAILED",
            Self::IncompleteCredentials => "TOPO_INCOMPLETE_CREDENTIALS",
            Self::Conflict { .. } => "TOPO_CONFLICT",
            Self::NoReplicaSet => "TOPO_NO_REPLICA_SET",
            Self::NoPrimary { .. } => "TOPO_NO_PRIMARY",
            Self::VersionConflict { .. } => "TOPO_VERSION_CONFLICT",
            Self::Command { .. } => "TOPO_COMMAND_FAILED",
            Self::MalformedResponse { .. } => "TOPO_MALFORMED_RESPONSE",
        }
    }

    /// Transport-level failures end the invocation before any action runs.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::DriverUnavailable(_) | Self::Connection(_) | Self::Auth(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_both_sets() {
        let err = ClusterError::Conflict {
            existing: "rsB".to_string(),
            requested: "rsA".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rsB"));
        assert!(msg.contains("rsA"));
        assert_eq!(err.code(), "TOPO_CONFLICT");
    }

    #[test]
    fn test_transport_errors() {
        assert!(ClusterError::Connection("refused".into()).is_transport());
        assert!(ClusterError::Auth("bad password".into()).is_transport());
        assert!(!ClusterError::NoReplicaSet.is_transport());
        assert!(!ClusterError::command("addShard", "boom").is_transport());
    }

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            ClusterError::DriverUnavailable(String::new()),
            ClusterError::Connection(String::new()),
            ClusterError::Auth(String::new()),
            ClusterError::IncompleteCredentials,
            ClusterError::Conflict {
                existing: String::new(),
                requested: String::new(),
            },
            ClusterError::NoReplicaSet,
            ClusterError::NoPrimary {
                replica_set: String::new(),
            },
            ClusterError::VersionConflict {
                submitted: 0,
                detail: String::new(),
            },
            ClusterError::command("", ""),
            ClusterError::malformed("", ""),
        ];

        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
