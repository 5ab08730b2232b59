//! Cluster access
//!
//! The typed view of a replica set / sharded cluster and the administrative
//! command seam the controllers reconcile through.
//!
//! - `model`: configuration, status and shard registry documents
//! - `admin`: the [`ClusterAdmin`] trait and the tagged [`StatusProbe`]
//! - `driver`: MongoDB driver backend (feature `driver`)
//! - `memory`: simulated single node

mod admin;
mod errors;
mod model;
pub mod driver;
pub mod memory;

pub use admin::{ClusterAdmin, StatusProbe};
pub use errors::{ClusterError, ClusterResult};
pub use memory::{InMemoryCluster, InMemoryConnector};
pub use model::{
    ClusterEndpoint, HostPort, Member, ReplicaSetConfig, ReplicaSetStatus, ShardRegistryEntry,
    StateLabel, StatusMember,
};
