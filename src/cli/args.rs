//! CLI argument definitions using clap
//!
//! Commands:
//! - replset-keeper initiate --replica-set-member-host <h> --replica-set <rs>
//! - replset-keeper add-member --replica-set-member-host <h> --replica-set <rs>
//! - replset-keeper get-primary --replica-set <rs>
//! - replset-keeper add-shard --replica-set-member-host <h> --replica-set <rs>
//!
//! Connection options are global and may appear before or after the
//! subcommand.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::cluster::HostPort;
use crate::observability::Severity;

/// Keep MongoDB replica sets and shard registrations in the requested shape
#[derive(Parser, Debug)]
#[command(name = "replset-keeper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// How to reach and authenticate against the target node.
///
/// Unset options fall back to the config file, then to built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// User to authenticate as
    #[arg(long, global = true)]
    pub login_user: Option<String>,

    /// Password for --login-user
    #[arg(long, global = true)]
    pub login_password: Option<String>,

    /// Host of the node to administer [default: localhost]
    #[arg(long, global = true)]
    pub login_host: Option<String>,

    /// Port of the node to administer [default: 27017]
    #[arg(long, global = true)]
    pub login_port: Option<u16>,

    /// Connect over TLS
    #[arg(long, global = true)]
    pub ssl: bool,

    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Stored credentials file [default: ~/.mongodb.cnf]
    #[arg(long, global = true)]
    pub credentials_file: Option<PathBuf>,

    /// Re-read the configuration once if a reconfiguration is rejected as stale
    #[arg(long, global = true)]
    pub retry_on_version_conflict: bool,

    /// Minimum log severity written to stderr
    #[arg(long, global = true, default_value = "info", value_parser = parse_log_level)]
    pub log_level: Severity,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the replica set on the target node unless it already runs
    Initiate(MemberArgs),

    /// Add a member to the replica set configuration unless already present
    AddMember(MemberArgs),

    /// Report the current primary
    GetPrimary {
        /// Replica set name
        #[arg(long)]
        replica_set: String,
    },

    /// Register the replica set as a shard through a router
    AddShard(MemberArgs),
}

#[derive(Args, Debug, Clone)]
pub struct MemberArgs {
    /// Host of the member to act on
    #[arg(long)]
    pub replica_set_member_host: String,

    /// Port of the member to act on
    #[arg(long, default_value_t = 27018)]
    pub replica_set_member_port: u16,

    /// Replica set name
    #[arg(long)]
    pub replica_set: String,
}

impl MemberArgs {
    pub fn member(&self) -> HostPort {
        HostPort::new(
            self.replica_set_member_host.clone(),
            self.replica_set_member_port,
        )
    }
}

impl Command {
    /// Name used for the action's log scope.
    pub fn scope_name(&self) -> &'static str {
        match self {
            Command::Initiate(_) => "INITIATE",
            Command::AddMember(_) => "ADD_MEMBER",
            Command::GetPrimary { .. } => "GET_PRIMARY",
            Command::AddShard(_) => "ADD_SHARD",
        }
    }

    pub fn replica_set(&self) -> &str {
        match self {
            Command::Initiate(args) | Command::AddMember(args) | Command::AddShard(args) => {
                &args.replica_set
            }
            Command::GetPrimary { replica_set } => replica_set,
        }
    }
}

fn parse_log_level(s: &str) -> Result<Severity, String> {
    match Severity::parse(s) {
        Some(Severity::Fatal) | None => Err(format!(
            "invalid log level '{}', expected one of: trace, info, warn, error",
            s
        )),
        Some(level) => Ok(level),
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
