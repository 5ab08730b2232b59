//! Reconciliation
//!
//! Each action reads the cluster, compares it with the requested topology
//! and issues a command only when they differ:
//!
//! - `initiate`: replica set exists under the requested name
//! - `add_member`: host is part of the replica set configuration
//! - `get_primary`: read only
//! - `register_shard`: replica set is in the shard registry
//!
//! Actions never retry on their own, with one opt-in exception: a
//! reconfiguration rejected for a stale version may be re-read and
//! resubmitted once.

mod discovery;
mod outcome;
mod replica_set;
mod shard;

pub use discovery::{await_primary, find_primary, Pause, PollPolicy, ThreadPause};
pub use outcome::{ActionError, ActionResult, Diagnostics, Outcome};
pub use replica_set::{PrimaryLocation, ReplicaSetController};
pub use shard::ShardClusterController;
