//! CLI module for replset-keeper
//!
//! Provides command-line interface for:
//! - initiate: create the replica set unless it already runs
//! - add-member: add a member unless already configured
//! - get-primary: report the current primary
//! - add-shard: register the replica set as a shard unless already registered

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, ConnectionArgs, MemberArgs};
pub use commands::{execute, run, run_command};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
