//! replset-keeper - idempotent MongoDB replica set and shard topology management
//!
//! Each action compares the requested topology with what the cluster reports
//! and only issues a command when they differ.

pub mod cli;
pub mod cluster;
pub mod connection;
pub mod observability;
pub mod reconcile;
