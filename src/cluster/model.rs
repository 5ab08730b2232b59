//! Cluster Topology Model
//!
//! Point-in-time views of cluster state. Every value here is built from a
//! single read, mutated in memory by a controller, submitted and dropped.
//!
//! Configuration documents carry every field this crate does not interpret
//! in `extra`, so a reconfiguration resubmits the whole document.

use std::fmt;

use bson::Document;
use serde::{Deserialize, Serialize};

/// One node to connect to. Immutable per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

impl ClusterEndpoint {
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls,
        }
    }
}

impl fmt::Display for ClusterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A member address as it appears in replica set documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Replica set configuration document (`replSetGetConfig`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSetConfig {
    #[serde(rename = "_id")]
    pub id: String,

    /// Incremented on every successful reconfiguration.
    pub version: i32,

    pub members: Vec<Member>,

    #[serde(flatten)]
    pub extra: Document,
}

impl ReplicaSetConfig {
    /// Initiation document: a single member with id 0.
    pub fn initial(set_name: impl Into<String>, seed: &HostPort) -> Self {
        Self {
            id: set_name.into(),
            version: 1,
            members: vec![Member::new(0, seed.to_string())],
            extra: Document::new(),
        }
    }

    /// True if a member's host string is exactly `host`.
    pub fn contains_host(&self, host: &str) -> bool {
        self.members.iter().any(|m| m.host == host)
    }

    /// Next free member id: max(existing) + 1, or 0 for an empty set.
    ///
    /// Ids of removed members are never handed out again as long as the
    /// highest id is still present, which is all this crate needs since it
    /// only appends.
    pub fn next_member_id(&self) -> i32 {
        self.members
            .iter()
            .map(|m| m.id)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Copy of this config with `host` appended and the version bumped once.
    pub fn with_member_appended(&self, host: impl Into<String>) -> Self {
        let mut next = self.clone();
        let id = next.next_member_id();
        next.members.push(Member::new(id, host));
        next.version += 1;
        next
    }
}

/// Member entry of a configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: i32,

    pub host: String,

    #[serde(flatten)]
    pub extra: Document,
}

impl Member {
    pub fn new(id: i32, host: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
            extra: Document::new(),
        }
    }
}

/// Replica set status (`replSetGetStatus`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSetStatus {
    /// Replica set name.
    pub set: String,

    #[serde(default)]
    pub members: Vec<StatusMember>,
}

impl ReplicaSetStatus {
    /// Members currently labelled PRIMARY.
    pub fn primaries(&self) -> impl Iterator<Item = &StatusMember> {
        self.members
            .iter()
            .filter(|m| m.state_label == StateLabel::Primary)
    }
}

/// A member as observed in a status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMember {
    #[serde(rename = "_id")]
    pub id: i32,

    /// "host:port"
    #[serde(rename = "name")]
    pub host: String,

    #[serde(rename = "stateStr")]
    pub state_label: StateLabel,
}

/// Member state as reported by the server. Never set by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StateLabel {
    Primary,
    Secondary,
    Arbiter,
    Startup,
    Startup2,
    Recovering,
    Rollback,
    Down,
    Unknown,
    Removed,
    Other(String),
}

impl StateLabel {
    pub fn as_str(&self) -> &str {
        match self {
            StateLabel::Primary => "PRIMARY",
            StateLabel::Secondary => "SECONDARY",
            StateLabel::Arbiter => "ARBITER",
            StateLabel::Startup => "STARTUP",
            StateLabel::Startup2 => "STARTUP2",
            StateLabel::Recovering => "RECOVERING",
            StateLabel::Rollback => "ROLLBACK",
            StateLabel::Down => "DOWN",
            StateLabel::Unknown => "UNKNOWN",
            StateLabel::Removed => "REMOVED",
            StateLabel::Other(s) => s,
        }
    }
}

impl From<String> for StateLabel {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PRIMARY" => StateLabel::Primary,
            "SECONDARY" => StateLabel::Secondary,
            "ARBITER" => StateLabel::Arbiter,
            "STARTUP" => StateLabel::Startup,
            "STARTUP2" => StateLabel::Startup2,
            "RECOVERING" => StateLabel::Recovering,
            "ROLLBACK" => StateLabel::Rollback,
            "DOWN" => StateLabel::Down,
            "UNKNOWN" => StateLabel::Unknown,
            "REMOVED" => StateLabel::Removed,
            _ => StateLabel::Other(s),
        }
    }
}

impl From<StateLabel> for String {
    fn from(label: StateLabel) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the shard registry (`listShards`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRegistryEntry {
    /// Replica set name
    #[serde(rename = "_id")]
    pub id: String,

    /// "replicaSetName/host:port[,host:port...]"
    #[serde(rename = "host")]
    pub connection_string: String,
}

impl ShardRegistryEntry {
    /// Connection string submitted with `addShard`.
    pub fn connection_string_for(set_name: &str, member: &HostPort) -> String {
        format!("{}/{}", set_name, member)
    }
}
