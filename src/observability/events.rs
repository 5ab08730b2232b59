//! Observable events
//!
//! Every log line carries one of these. Events are explicit and typed.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Startup
    /// Driver capability confirmed
    DriverAvailable,
    /// Configuration loaded
    ConfigLoaded,

    // Connection
    /// Credentials resolved (source only, never the secret)
    CredentialsResolved,
    /// Authenticated handle open
    ConnectionEstablished,
    /// Endpoint unreachable
    ConnectionFailed,
    /// Credentials rejected
    AuthenticationRejected,

    // Primary discovery
    /// A member holds PRIMARY
    PrimaryFound,
    /// One polling attempt found no primary
    PrimaryPending,
    /// Polling bound reached without a primary
    PrimaryWaitExhausted,
    /// Polling aborted by a query failure
    PrimaryWaitFailed,

    // Replica set
    /// Replica set already running under the requested name
    ReplicaSetPresent,
    /// Node belongs to another replica set
    ReplicaSetConflict,
    /// replSetInitiate acknowledged
    ReplicaSetInitiated,
    /// Member host already in the config
    MemberPresent,
    /// replSetReconfig acknowledged
    MemberAdded,
    /// Reconfiguration rejected as stale
    ReconfigVersionConflict,

    // Sharding
    /// Shard id already registered
    ShardPresent,
    /// addShard acknowledged
    ShardAdded,

    // Result
    /// Action failed
    ActionFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DriverAvailable => "DRIVER_AVAILABLE",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::CredentialsResolved => "CREDENTIALS_RESOLVED",
            Event::ConnectionEstablished => "CONNECTION_ESTABLISHED",
            Event::ConnectionFailed => "CONNECTION_FAILED",
            Event::AuthenticationRejected => "AUTHENTICATION_REJECTED",

            Event::PrimaryFound => "PRIMARY_FOUND",
            Event::PrimaryPending => "PRIMARY_PENDING",
            Event::PrimaryWaitExhausted => "PRIMARY_WAIT_EXHAUSTED",
            Event::PrimaryWaitFailed => "PRIMARY_WAIT_FAILED",

            Event::ReplicaSetPresent => "REPLICA_SET_PRESENT",
            Event::ReplicaSetConflict => "REPLICA_SET_CONFLICT",
            Event::ReplicaSetInitiated => "REPLICA_SET_INITIATED",
            Event::MemberPresent => "MEMBER_PRESENT",
            Event::MemberAdded => "MEMBER_ADDED",
            Event::ReconfigVersionConflict => "RECONFIG_VERSION_CONFLICT",

            Event::ShardPresent => "SHARD_PRESENT",
            Event::ShardAdded => "SHARD_ADDED",

            Event::ActionFailed => "ACTION_FAILED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Event::ConnectionFailed | Event::AuthenticationRejected | Event::ActionFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
