//! Replica Set Reconciliation Tests
//!
//! End-to-end behaviour of the replica set actions against a simulated node:
//! - running an action twice converges instead of failing
//! - every successful reconfiguration bumps the version by exactly one
//! - a node that belongs to another replica set is reported, never changed

use std::cell::RefCell;
use std::time::Duration;

use replset_keeper::cluster::{
    ClusterAdmin, ClusterError, HostPort, InMemoryCluster, Member, ReplicaSetConfig, StateLabel,
};
use replset_keeper::reconcile::{await_primary, Pause, PollPolicy, ReplicaSetController};

#[derive(Default)]
struct RecordingPause {
    pauses: RefCell<Vec<Duration>>,
}

impl Pause for RecordingPause {
    fn pause(&self, interval: Duration) {
        self.pauses.borrow_mut().push(interval);
    }
}

fn config_with_ids(ids: &[i32]) -> ReplicaSetConfig {
    ReplicaSetConfig {
        id: "rs0".to_string(),
        version: 7,
        members: ids
            .iter()
            .map(|id| Member::new(*id, format!("h{}:27018", id)))
            .collect(),
        extra: Default::default(),
    }
}

// =============================================================================
// initiate
// =============================================================================

/// A fresh node ends up with a one-member replica set.
#[test]
fn test_initiate_fresh_node() {
    let cluster = InMemoryCluster::uninitialized();
    cluster.elect_after(Some(1));
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause);

    let outcome = controller
        .initiate("rsA", &HostPort::new("h1", 27018))
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.fact("primary"), Some("h1:27018"));

    let config = cluster.config().unwrap();
    assert_eq!(config.id, "rsA");
    assert_eq!(config.members, vec![Member::new(0, "h1:27018")]);
    assert_eq!(pause.pauses.borrow().len(), 1);
}

/// Same name twice: the second call is a no-op.
#[test]
fn test_initiate_is_idempotent() {
    let cluster = InMemoryCluster::uninitialized();
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause)
        .with_poll_policy(PollPolicy::new(1, Duration::from_secs(1)));
    let seed = HostPort::new("h1", 27018);

    assert!(controller.initiate("rsA", &seed).unwrap().changed);
    let second = controller.initiate("rsA", &seed).unwrap();

    assert!(!second.changed);
    let initiations = cluster
        .commands()
        .iter()
        .filter(|c| *c == "replSetInitiate")
        .count();
    assert_eq!(initiations, 1);
}

/// Another name on an initiated node is a conflict, not a crash.
#[test]
fn test_initiate_conflicting_name() {
    let cluster = InMemoryCluster::with_replica_set(ReplicaSetConfig::initial(
        "rsA",
        &HostPort::new("h1", 27018),
    ));
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause);

    let err = controller
        .initiate("rsB", &HostPort::new("h1", 27018))
        .unwrap_err();

    assert_eq!(err.code(), "TOPO_CONFLICT");
    assert!(matches!(
        err.cause(),
        ClusterError::Conflict { existing, requested } if existing == "rsA" && requested == "rsB"
    ));
    assert_eq!(err.diagnostics().get("status").unwrap()["set"], "rsA");
}

// =============================================================================
// add_member
// =============================================================================

/// Twice: changed, then unchanged, with the same final member list.
#[test]
fn test_add_member_converges() {
    let cluster = InMemoryCluster::with_replica_set(config_with_ids(&[0]));
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause);
    let member = HostPort::new("h9", 27018);

    assert!(controller.add_member("rs0", &member).unwrap().changed);
    let members = cluster.config().unwrap().members;

    assert!(!controller.add_member("rs0", &member).unwrap().changed);
    assert_eq!(cluster.config().unwrap().members, members);
}

/// ids {0, 2, 5} -> new member gets 6.
#[test]
fn test_add_member_uses_max_id_plus_one() {
    let cluster = InMemoryCluster::with_replica_set(config_with_ids(&[0, 2, 5]));
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause);

    controller
        .add_member("rs0", &HostPort::new("h9", 27018))
        .unwrap();

    let config = cluster.config().unwrap();
    let added = config.members.last().unwrap();
    assert_eq!(added.id, 6);
    assert_eq!(added.host, "h9:27018");
}

/// Each successful reconfiguration moves the version forward by one.
#[test]
fn test_add_member_bumps_version_by_one() {
    let cluster = InMemoryCluster::with_replica_set(config_with_ids(&[0]));
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause);

    for (i, host) in ["h7", "h8", "h9"].iter().enumerate() {
        controller
            .add_member("rs0", &HostPort::new(*host, 27018))
            .unwrap();
        assert_eq!(cluster.config().unwrap().version, 8 + i as i32);
    }
}

/// Host match is exact: another port is another member.
#[test]
fn test_add_member_same_host_other_port() {
    let cluster = InMemoryCluster::with_replica_set(config_with_ids(&[1]));
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause);

    let outcome = controller
        .add_member("rs0", &HostPort::new("h1", 27019))
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(cluster.config().unwrap().members.len(), 2);
}

/// Without a replica set there is nothing to reconfigure.
#[test]
fn test_add_member_uninitialized() {
    let cluster = InMemoryCluster::uninitialized();
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause);

    let err = controller
        .add_member("rs0", &HostPort::new("h2", 27018))
        .unwrap_err();

    assert_eq!(err.code(), "TOPO_NO_REPLICA_SET");
    assert_eq!(err.diagnostics().get("member").unwrap(), "h2:27018");
    assert!(cluster.config().is_none());
}

/// Stale version, retry enabled: one re-read, then success.
#[test]
fn test_add_member_retry_after_concurrent_reconfig() {
    let cluster = InMemoryCluster::with_replica_set(config_with_ids(&[0]));
    cluster.interleave_reconfigurations(1);
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause).with_version_conflict_retry(true);

    assert!(controller
        .add_member("rs0", &HostPort::new("h2", 27018))
        .unwrap()
        .changed);
    assert_eq!(cluster.config().unwrap().version, 9);
}

/// The retry happens once only.
#[test]
fn test_add_member_retry_is_bounded() {
    let cluster = InMemoryCluster::with_replica_set(config_with_ids(&[0]));
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause).with_version_conflict_retry(true);

    cluster.interleave_reconfigurations(1);
    let first_attempt = controller.add_member("rs0", &HostPort::new("h2", 27018));
    assert!(first_attempt.is_ok());

    // Every submit now races with another client.
    let racing = RacingCluster(cluster.clone());
    let controller = ReplicaSetController::new(&racing, &pause).with_version_conflict_retry(true);
    let err = controller
        .add_member("rs0", &HostPort::new("h3", 27018))
        .unwrap_err();

    assert_eq!(err.code(), "TOPO_VERSION_CONFLICT");
    let reads = cluster
        .commands()
        .iter()
        .filter(|c| *c == "replSetGetConfig")
        .count();
    assert_eq!(reads, 4);
}

/// Interleaves a foreign reconfiguration before every submit.
struct RacingCluster(InMemoryCluster);

impl ClusterAdmin for RacingCluster {
    fn replica_set_status(&self) -> replset_keeper::cluster::StatusProbe {
        self.0.replica_set_status()
    }

    fn replica_set_config(&self) -> Result<ReplicaSetConfig, ClusterError> {
        self.0.replica_set_config()
    }

    fn initiate(&self, config: &ReplicaSetConfig) -> Result<(), ClusterError> {
        self.0.initiate(config)
    }

    fn reconfigure(&self, config: &ReplicaSetConfig) -> Result<(), ClusterError> {
        self.0.interleave_reconfigurations(1);
        self.0.reconfigure(config)
    }

    fn list_shards(
        &self,
    ) -> Result<Vec<replset_keeper::cluster::ShardRegistryEntry>, ClusterError> {
        self.0.list_shards()
    }

    fn add_shard(&self, connection_string: &str) -> Result<(), ClusterError> {
        self.0.add_shard(connection_string)
    }
}

// =============================================================================
// get_primary / await_primary
// =============================================================================

/// "m1:27018" PRIMARY -> server "m1:27018", host "m1".
#[test]
fn test_get_primary_location() {
    let mut config = ReplicaSetConfig::initial("rs0", &HostPort::new("m0", 27018));
    config = config.with_member_appended("m1:27018");
    let cluster = InMemoryCluster::with_replica_set(config);
    cluster.set_member_state("m0:27018", StateLabel::Secondary);
    cluster.set_member_state("m1:27018", StateLabel::Primary);
    let pause = RecordingPause::default();
    let controller = ReplicaSetController::new(&cluster, &pause);

    let location = controller.get_primary("rs0").unwrap();

    assert_eq!(location.server, "m1:27018");
    assert_eq!(location.host, "m1");
}

/// 3 attempts without a primary: 3 status queries, 2 pauses.
#[test]
fn test_await_primary_bound() {
    let cluster = InMemoryCluster::with_replica_set(config_with_ids(&[0]));
    cluster.set_member_state("h0:27018", StateLabel::Recovering);
    let pause = RecordingPause::default();
    let policy = PollPolicy::new(3, Duration::from_millis(500));

    let found = await_primary(&cluster, &policy, &pause).unwrap();

    assert!(found.is_none());
    assert_eq!(cluster.status_queries(), 3);
    assert_eq!(
        *pause.pauses.borrow(),
        vec![Duration::from_millis(500); 2]
    );
}
