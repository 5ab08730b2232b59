//! In-memory cluster
//!
//! A single node simulated in process. It behaves like the server for the
//! commands this crate issues: initiation happens once, reconfigurations must
//! carry exactly the next version, `addShard` registers under the replica
//! set name. Clones share state, so a test can hand one clone to a controller
//! and inspect another.
//!
//! Members of a freshly initiated set start in STARTUP2 and only become
//! PRIMARY after the configured number of status queries, which lets tests
//! walk through the post-initiation convergence window.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::admin::{ClusterAdmin, StatusProbe};
use super::errors::{ClusterError, ClusterResult};
use super::model::{
    ClusterEndpoint, ReplicaSetConfig, ReplicaSetStatus, ShardRegistryEntry, StateLabel,
    StatusMember,
};
use crate::connection::{AuthCredentials, Connector};
use secrecy::ExposeSecret;

#[derive(Debug, Default)]
struct NodeState {
    config: Option<ReplicaSetConfig>,
    labels: HashMap<String, StateLabel>,
    /// Status queries left before the first member is elected.
    election_countdown: Option<u32>,
    shards: Vec<ShardRegistryEntry>,
    status_queries: u32,
    commands: Vec<String>,
    fail_status: Option<ClusterError>,
    fail_config_read: Option<ClusterError>,
    fail_list_shards: Option<ClusterError>,
    fail_add_shard: Option<ClusterError>,
    /// Concurrent reconfigurations to apply right before the next submit.
    interleaved_bumps: u32,
}

/// Simulated cluster node.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCluster {
    state: Rc<RefCell<NodeState>>,
}

impl InMemoryCluster {
    /// A node that has never been initiated.
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// A node already running `config`, first member PRIMARY and the rest
    /// SECONDARY.
    pub fn with_replica_set(config: ReplicaSetConfig) -> Self {
        let cluster = Self::default();
        {
            let mut state = cluster.state.borrow_mut();
            for (i, member) in config.members.iter().enumerate() {
                let label = if i == 0 {
                    StateLabel::Primary
                } else {
                    StateLabel::Secondary
                };
                state.labels.insert(member.host.clone(), label);
            }
            state.config = Some(config);
        }
        cluster
    }

    /// Force the label reported for `host`.
    pub fn set_member_state(&self, host: &str, label: StateLabel) {
        self.state
            .borrow_mut()
            .labels
            .insert(host.to_string(), label);
    }

    /// After initiation, elect the first member once `queries` status
    /// queries have been answered. `None` means never.
    pub fn elect_after(&self, queries: Option<u32>) -> &Self {
        self.state.borrow_mut().election_countdown = queries;
        self
    }

    /// Pre-register a shard.
    pub fn register_shard(&self, entry: ShardRegistryEntry) {
        self.state.borrow_mut().shards.push(entry);
    }

    /// Simulate `count` reconfigurations by another client landing between
    /// our read and our next submit.
    pub fn interleave_reconfigurations(&self, count: u32) {
        self.state.borrow_mut().interleaved_bumps = count;
    }

    pub fn fail_status_with(&self, err: ClusterError) {
        self.state.borrow_mut().fail_status = Some(err);
    }

    pub fn fail_config_read_with(&self, err: ClusterError) {
        self.state.borrow_mut().fail_config_read = Some(err);
    }

    pub fn fail_list_shards_with(&self, err: ClusterError) {
        self.state.borrow_mut().fail_list_shards = Some(err);
    }

    pub fn fail_add_shard_with(&self, err: ClusterError) {
        self.state.borrow_mut().fail_add_shard = Some(err);
    }

    /// Current configuration document, if initiated.
    pub fn config(&self) -> Option<ReplicaSetConfig> {
        self.state.borrow().config.clone()
    }

    /// Current shard registry.
    pub fn shards(&self) -> Vec<ShardRegistryEntry> {
        self.state.borrow().shards.clone()
    }

    /// Number of status queries answered so far.
    pub fn status_queries(&self) -> u32 {
        self.state.borrow().status_queries
    }

    /// Names of every command received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    fn record(&self, command: &str) {
        self.state.borrow_mut().commands.push(command.to_string());
    }
}

impl ClusterAdmin for InMemoryCluster {
    fn replica_set_status(&self) -> StatusProbe {
        self.record("replSetGetStatus");
        let mut state = self.state.borrow_mut();
        state.status_queries += 1;

        if let Some(err) = state.fail_status.clone() {
            return StatusProbe::Unavailable(err);
        }

        let Some(config) = state.config.clone() else {
            return StatusProbe::NotInitialized;
        };

        if let Some(remaining) = state.election_countdown {
            if remaining == 0 {
                if let Some(first) = config.members.first() {
                    state.labels.insert(first.host.clone(), StateLabel::Primary);
                }
                state.election_countdown = None;
            } else {
                state.election_countdown = Some(remaining - 1);
            }
        }

        let members = config
            .members
            .iter()
            .map(|m| StatusMember {
                id: m.id,
                host: m.host.clone(),
                state_label: state
                    .labels
                    .get(&m.host)
                    .cloned()
                    .unwrap_or(StateLabel::Startup2),
            })
            .collect();

        StatusProbe::Initialized(ReplicaSetStatus {
            set: config.id,
            members,
        })
    }

    fn replica_set_config(&self) -> ClusterResult<ReplicaSetConfig> {
        self.record("replSetGetConfig");
        let state = self.state.borrow();
        if let Some(err) = state.fail_config_read.clone() {
            return Err(err);
        }
        state.config.clone().ok_or(ClusterError::NoReplicaSet)
    }

    fn initiate(&self, config: &ReplicaSetConfig) -> ClusterResult<()> {
        self.record("replSetInitiate");
        let mut state = self.state.borrow_mut();
        if state.config.is_some() {
            return Err(ClusterError::command("replSetInitiate", "already initialized"));
        }
        for member in &config.members {
            state
                .labels
                .insert(member.host.clone(), StateLabel::Startup2);
        }
        state.config = Some(config.clone());
        Ok(())
    }

    fn reconfigure(&self, config: &ReplicaSetConfig) -> ClusterResult<()> {
        self.record("replSetReconfig");
        let mut state = self.state.borrow_mut();

        let bumps = std::mem::take(&mut state.interleaved_bumps);
        let current = state.config.as_mut().ok_or_else(|| {
            ClusterError::command("replSetReconfig", "no replset config has been received")
        })?;
        current.version += bumps as i32;

        if config.id != current.id {
            return Err(ClusterError::command(
                "replSetReconfig",
                format!("replica set name '{}' does not match '{}'", config.id, current.id),
            ));
        }
        if config.version != current.version + 1 {
            return Err(ClusterError::VersionConflict {
                submitted: config.version,
                detail: format!("current version is {}", current.version),
            });
        }

        *current = config.clone();
        for member in &config.members {
            state
                .labels
                .entry(member.host.clone())
                .or_insert(StateLabel::Startup2);
        }
        Ok(())
    }

    fn list_shards(&self) -> ClusterResult<Vec<ShardRegistryEntry>> {
        self.record("listShards");
        let state = self.state.borrow();
        if let Some(err) = state.fail_list_shards.clone() {
            return Err(err);
        }
        Ok(state.shards.clone())
    }

    fn add_shard(&self, connection_string: &str) -> ClusterResult<()> {
        self.record("addShard");
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_add_shard.clone() {
            return Err(err);
        }

        let (set_name, _) = connection_string.split_once('/').ok_or_else(|| {
            ClusterError::command("addShard", "connection string must be 'set/host:port'")
        })?;
        if state.shards.iter().any(|s| s.id == set_name) {
            return Err(ClusterError::command(
                "addShard",
                format!("shard '{}' already exists", set_name),
            ));
        }

        state.shards.push(ShardRegistryEntry {
            id: set_name.to_string(),
            connection_string: connection_string.to_string(),
        });
        Ok(())
    }
}

/// Connector handing out clones of one [`InMemoryCluster`].
///
/// When `accepted` is set, only those credentials authenticate; any
/// other presented credentials fail with an auth error. Unauthenticated
/// connections are always let through.
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    cluster: InMemoryCluster,
    accepted: Option<(String, String)>,
    reachable: bool,
    connections: Rc<RefCell<Vec<Option<String>>>>,
}

impl InMemoryConnector {
    pub fn new(cluster: InMemoryCluster) -> Self {
        Self {
            cluster,
            accepted: None,
            reachable: true,
            connections: Rc::default(),
        }
    }

    /// Only accept this user/password pair.
    pub fn accepting(mut self, user: &str, password: &str) -> Self {
        self.accepted = Some((user.to_string(), password.to_string()));
        self
    }

    /// Every connection attempt fails as unreachable.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Users presented on each successful connection (`None` = no auth).
    pub fn connections(&self) -> Vec<Option<String>> {
        self.connections.borrow().clone()
    }
}

impl Connector for InMemoryConnector {
    fn connect(
        &self,
        endpoint: &ClusterEndpoint,
        credentials: Option<&AuthCredentials>,
    ) -> ClusterResult<Box<dyn ClusterAdmin>> {
        if !self.reachable {
            return Err(ClusterError::Connection(format!(
                "{} is unreachable",
                endpoint
            )));
        }

        if let (Some(creds), Some((user, password))) = (credentials, &self.accepted) {
            if creds.user() != user || creds.password().expose_secret() != password {
                return Err(ClusterError::Auth(format!(
                    "authentication failed for user '{}'",
                    creds.user()
                )));
            }
        }

        self.connections
            .borrow_mut()
            .push(credentials.map(|c| c.user().to_string()));
        Ok(Box::new(self.cluster.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::model::{HostPort, Member};

    #[test]
    fn test_uninitialized_reports_not_initialized() {
        let cluster = InMemoryCluster::uninitialized();
        assert_eq!(cluster.replica_set_status(), StatusProbe::NotInitialized);
        assert_eq!(cluster.status_queries(), 1);
    }

    #[test]
    fn test_election_countdown() {
        let cluster = InMemoryCluster::uninitialized();
        cluster.elect_after(Some(1));
        cluster
            .initiate(&ReplicaSetConfig::initial("rs0", &HostPort::new("a", 1)))
            .unwrap();

        let first = cluster.replica_set_status().into_status().unwrap();
        assert_eq!(first.primaries().count(), 0);

        let second = cluster.replica_set_status().into_status().unwrap();
        assert_eq!(second.primaries().count(), 1);
    }

    #[test]
    fn test_reconfigure_requires_next_version() {
        let config = ReplicaSetConfig {
            id: "rs0".to_string(),
            version: 2,
            members: vec![Member::new(0, "a:1")],
            extra: Default::default(),
        };
        let cluster = InMemoryCluster::with_replica_set(config.clone());

        let mut stale = config.clone();
        stale.version = 2;
        assert!(matches!(
            cluster.reconfigure(&stale),
            Err(ClusterError::VersionConflict { submitted: 2, .. })
        ));

        assert!(cluster.reconfigure(&config.with_member_appended("b:1")).is_ok());
        assert_eq!(cluster.config().unwrap().version, 3);
    }

    #[test]
    fn test_add_shard_rejects_duplicates() {
        let cluster = InMemoryCluster::uninitialized();
        cluster.add_shard("rs1/a:27018").unwrap();
        assert!(cluster.add_shard("rs1/b:27018").is_err());
        assert_eq!(cluster.shards().len(), 1);
    }
}
