//! Administrative command seam
//!
//! Controllers talk to the cluster only through [`ClusterAdmin`]. The driver
//! backed implementation lives in `driver.rs`, the in-memory one in
//! `memory.rs`.

use super::errors::{ClusterError, ClusterResult};
use super::model::{ReplicaSetConfig, ReplicaSetStatus, ShardRegistryEntry};

/// Outcome of a replica set status query.
///
/// "Not initialized" is an expected answer on a fresh node, not a failure,
/// so it gets its own variant instead of hiding inside an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusProbe {
    /// A replica set is running on the node.
    Initialized(ReplicaSetStatus),
    /// The node has not been initiated yet.
    NotInitialized,
    /// The query itself failed.
    Unavailable(ClusterError),
}

impl StatusProbe {
    /// Convert into a result, treating a missing replica set as an error.
    pub fn into_status(self) -> ClusterResult<ReplicaSetStatus> {
        match self {
            StatusProbe::Initialized(status) => Ok(status),
            StatusProbe::NotInitialized => Err(ClusterError::NoReplicaSet),
            StatusProbe::Unavailable(err) => Err(err),
        }
    }
}

/// Authenticated administrative handle to one cluster node.
pub trait ClusterAdmin {
    /// `replSetGetStatus`
    fn replica_set_status(&self) -> StatusProbe;

    /// `replSetGetConfig`
    fn replica_set_config(&self) -> ClusterResult<ReplicaSetConfig>;

    /// `replSetInitiate`
    fn initiate(&self, config: &ReplicaSetConfig) -> ClusterResult<()>;

    /// `replSetReconfig` with the whole document.
    fn reconfigure(&self, config: &ReplicaSetConfig) -> ClusterResult<()>;

    /// `listShards`
    fn list_shards(&self) -> ClusterResult<Vec<ShardRegistryEntry>>;

    /// `addShard`
    fn add_shard(&self, connection_string: &str) -> ClusterResult<()>;
}
