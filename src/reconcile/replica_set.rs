//! Replica set controller
//!
//! Idempotent replica set actions: running one twice reports "unchanged" the
//! second time instead of failing.
//!
//! initiate state machine:
//!
//! ```text
//! NotInitialized --replSetInitiate--> Initiated (primary unknown)
//!                                          |
//!                                     await_primary
//!                                          |
//!                          primary known | primary still unknown
//! ```
//!
//! Both end states report success.

use crate::cluster::{ClusterAdmin, ClusterError, HostPort, ReplicaSetConfig, StatusProbe};
use crate::observability::{log_event_with_fields, Event, Logger};

use super::discovery::{await_primary, find_primary, Pause, PollPolicy};
use super::outcome::{ActionError, ActionResult, Diagnostics, Outcome};

/// Where the primary lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryLocation {
    /// "host:port" as reported by the server
    pub server: String,
    /// Everything before the first ':' of `server`
    pub host: String,
}

impl PrimaryLocation {
    pub fn from_server(server: impl Into<String>) -> Self {
        let server = server.into();
        // First colon on purpose: an IPv6 literal yields its first group.
        let host = match server.split_once(':') {
            Some((host, _)) => host.to_string(),
            None => server.clone(),
        };
        Self { server, host }
    }

    pub fn into_outcome(self) -> Outcome {
        Outcome::unchanged()
            .with_fact("server", self.server)
            .with_fact("host", self.host)
    }
}

/// Reconciles replica set membership through one admin handle.
pub struct ReplicaSetController<'a> {
    admin: &'a dyn ClusterAdmin,
    pause: &'a dyn Pause,
    policy: PollPolicy,
    retry_on_version_conflict: bool,
}

impl<'a> ReplicaSetController<'a> {
    pub fn new(admin: &'a dyn ClusterAdmin, pause: &'a dyn Pause) -> Self {
        Self {
            admin,
            pause,
            policy: PollPolicy::default(),
            retry_on_version_conflict: false,
        }
    }

    /// Override how long initiate waits for the first election.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Re-read and resubmit once when a reconfiguration is rejected as stale.
    pub fn with_version_conflict_retry(mut self, enabled: bool) -> Self {
        self.retry_on_version_conflict = enabled;
        self
    }

    /// Make sure a replica set named `set_name` runs on the node, seeded
    /// with `seed` as member 0 when it has to be created.
    pub fn initiate(&self, set_name: &str, seed: &HostPort) -> ActionResult<Outcome> {
        let mut diagnostics = Diagnostics::new();

        match self.admin.replica_set_status() {
            StatusProbe::Initialized(status) => {
                diagnostics.record("status", &status);
                if status.set == set_name {
                    log_event_with_fields(
                        Event::ReplicaSetPresent,
                        &[("replica_set", set_name)],
                    );
                    return Ok(Outcome::unchanged().with_message(format!(
                        "A replica set named {} already exists on this host ({})",
                        set_name, seed
                    )));
                }

                log_event_with_fields(
                    Event::ReplicaSetConflict,
                    &[("existing", &status.set), ("requested", set_name)],
                );
                Err(ActionError::new(
                    "Unable to initiate replica set",
                    ClusterError::Conflict {
                        existing: status.set,
                        requested: set_name.to_string(),
                    },
                    diagnostics,
                ))
            }
            StatusProbe::NotInitialized => self.create(set_name, seed, diagnostics),
            StatusProbe::Unavailable(err) => Err(ActionError::new(
                "Unable to query replica set status",
                err,
                diagnostics,
            )),
        }
    }

    fn create(
        &self,
        set_name: &str,
        seed: &HostPort,
        mut diagnostics: Diagnostics,
    ) -> ActionResult<Outcome> {
        let config = ReplicaSetConfig::initial(set_name, seed);
        diagnostics.record("config", &config);

        if let Err(err) = self.admin.initiate(&config) {
            return Err(ActionError::new(
                "Unable to initiate replica set",
                err,
                diagnostics,
            ));
        }
        log_event_with_fields(
            Event::ReplicaSetInitiated,
            &[("replica_set", set_name), ("seed", &seed.to_string())],
        );

        let mut outcome =
            Outcome::changed().with_message(format!("Created replica set {}", set_name));

        // The set exists from here on; waiting only tells us who won.
        match await_primary(self.admin, &self.policy, self.pause) {
            Ok(Some(primary)) => outcome = outcome.with_fact("primary", primary.host),
            Ok(None) => {}
            Err(err) => Logger::warn(
                Event::PrimaryWaitFailed.as_str(),
                &[("replica_set", set_name), ("reason", &err.to_string())],
            ),
        }

        Ok(outcome)
    }

    /// Make sure `member` is part of the replica set configuration.
    pub fn add_member(&self, set_name: &str, member: &HostPort) -> ActionResult<Outcome> {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("member", &member.to_string());

        let mut retries_left = u32::from(self.retry_on_version_conflict);
        loop {
            match self.try_add_member(set_name, member, &mut diagnostics) {
                Err(err @ ClusterError::VersionConflict { .. }) if retries_left > 0 => {
                    retries_left -= 1;
                    log_event_with_fields(
                        Event::ReconfigVersionConflict,
                        &[
                            ("replica_set", set_name),
                            ("retry", "true"),
                            ("reason", &err.to_string()),
                        ],
                    );
                }
                Err(err) => {
                    if matches!(err, ClusterError::VersionConflict { .. }) {
                        log_event_with_fields(
                            Event::ReconfigVersionConflict,
                            &[("replica_set", set_name), ("retry", "false")],
                        );
                    }
                    return Err(ActionError::new(
                        format!("Unable to add member {} to replica set {}", member, set_name),
                        err,
                        diagnostics,
                    ));
                }
                Ok(outcome) => return Ok(outcome),
            }
        }
    }

    fn try_add_member(
        &self,
        set_name: &str,
        member: &HostPort,
        diagnostics: &mut Diagnostics,
    ) -> Result<Outcome, ClusterError> {
        let config = self.admin.replica_set_config()?;
        diagnostics.record("config", &config);

        if config.id != set_name {
            return Err(ClusterError::Conflict {
                existing: config.id,
                requested: set_name.to_string(),
            });
        }

        let host = member.to_string();
        if config.contains_host(&host) {
            log_event_with_fields(
                Event::MemberPresent,
                &[("replica_set", set_name), ("member", &host)],
            );
            return Ok(Outcome::unchanged());
        }

        let updated = config.with_member_appended(host.as_str());
        self.admin.reconfigure(&updated)?;

        log_event_with_fields(
            Event::MemberAdded,
            &[
                ("replica_set", set_name),
                ("member", &host),
                ("version", &updated.version.to_string()),
            ],
        );
        Ok(Outcome::changed())
    }

    /// Report the current primary without changing anything.
    pub fn get_primary(&self, set_name: &str) -> ActionResult<PrimaryLocation> {
        match find_primary(self.admin) {
            Ok(Some(primary)) => Ok(PrimaryLocation::from_server(primary.host)),
            Ok(None) => Err(ActionError::new(
                "Unable to find primary",
                ClusterError::NoPrimary {
                    replica_set: set_name.to_string(),
                },
                Diagnostics::new(),
            )),
            Err(err) => Err(ActionError::new(
                "Unable to find primary",
                err,
                Diagnostics::new(),
            )),
        }
    }
}
