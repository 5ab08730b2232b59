//! CLI command implementations
//!
//! Startup order:
//! 1. Driver capability check
//! 2. Configuration (flags over file over defaults)
//! 3. Credentials resolution and authenticated connection
//! 4. Exactly one reconciliation action
//!
//! Nothing is sent to the cluster before step 3 succeeds.

use secrecy::SecretString;

use crate::cluster::driver::{self, MongoConnector};
use crate::cluster::ClusterAdmin;
use crate::connection::{
    ConnectionResolver, Connector, CredentialsProvider, FileCredentials, NoCredentials,
};
use crate::observability::{log_event, log_event_with_fields, Event, Logger, ObservationScope};
use crate::reconcile::{
    Outcome, Pause, PrimaryLocation, ReplicaSetController, ShardClusterController, ThreadPause,
};

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::CliResult;
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments, runs one action and prints its JSON result.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(cli.connection.log_level);

    match run_with_driver(&cli) {
        Ok(outcome) => write_response(outcome.to_json()),
        Err(err) => {
            write_error(&err)?;
            Err(err)
        }
    }
}

fn run_with_driver(cli: &Cli) -> CliResult<Outcome> {
    driver::capability()?;
    log_event(Event::DriverAvailable);

    let config = Config::resolve(&cli.connection)?;
    let connector = MongoConnector::new(config.connect_timeout());
    execute(cli, &config, &connector, &ThreadPause)
}

/// Connect through `connector` and run the parsed command.
pub fn execute(
    cli: &Cli,
    config: &Config,
    connector: &dyn Connector,
    pause: &dyn Pause,
) -> CliResult<Outcome> {
    let endpoint = config.endpoint();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("endpoint", &endpoint.to_string()),
            ("tls", if config.ssl { "true" } else { "false" }),
        ],
    );

    let provider = credentials_provider(config);
    let resolver = ConnectionResolver::new(connector, provider.as_ref());
    let admin = resolver.resolve(
        &endpoint,
        cli.connection.login_user.clone(),
        cli.connection.login_password.clone().map(SecretString::from),
    )?;

    run_command(&cli.command, admin.as_ref(), config, pause)
}

/// Run one reconciliation action against an open handle
pub fn run_command(
    cmd: &Command,
    admin: &dyn ClusterAdmin,
    config: &Config,
    pause: &dyn Pause,
) -> CliResult<Outcome> {
    let scope =
        ObservationScope::with_fields(cmd.scope_name(), &[("replica_set", cmd.replica_set())]);

    let replica_sets = || {
        ReplicaSetController::new(admin, pause)
            .with_poll_policy(config.poll_policy())
            .with_version_conflict_retry(config.retry_on_version_conflict)
    };

    let result = match cmd {
        Command::Initiate(args) => replica_sets().initiate(&args.replica_set, &args.member()),
        Command::AddMember(args) => replica_sets().add_member(&args.replica_set, &args.member()),
        Command::GetPrimary { replica_set } => replica_sets()
            .get_primary(replica_set)
            .map(PrimaryLocation::into_outcome),
        Command::AddShard(args) => {
            ShardClusterController::new(admin).register_shard(&args.replica_set, &args.member())
        }
    };

    match result {
        Ok(outcome) => {
            scope.complete_with_fields(&[(
                "changed",
                if outcome.changed { "true" } else { "false" },
            )]);
            Ok(outcome)
        }
        Err(err) => {
            scope.fail(err.code(), err.message());
            log_event_with_fields(
                Event::ActionFailed,
                &[("code", err.code()), ("reason", &err.to_string())],
            );
            Err(err.into())
        }
    }
}

fn credentials_provider(config: &Config) -> Box<dyn CredentialsProvider> {
    match &config.credentials_file {
        Some(path) => Box::new(FileCredentials::new(path.clone())),
        None => match FileCredentials::default_location() {
            Some(file) => Box::new(file),
            None => Box::new(NoCredentials),
        },
    }
}
