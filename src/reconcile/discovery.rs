//! Primary discovery
//!
//! A single status query answers "who is primary right now". Right after an
//! initiation the answer is usually "nobody yet", so `await_primary` polls a
//! bounded number of times before giving up.

use std::thread;
use std::time::Duration;

use crate::cluster::{ClusterAdmin, ClusterError, ClusterResult, StatusMember, StatusProbe};
use crate::observability::{log_event_with_fields, Event};

/// Blocking wait between polling attempts.
pub trait Pause {
    fn pause(&self, interval: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, interval: Duration) {
        thread::sleep(interval);
    }
}

/// Bounds for `await_primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(1),
        }
    }
}

/// One status query. `Ok(None)` while an election is in progress.
pub fn find_primary(admin: &dyn ClusterAdmin) -> ClusterResult<Option<StatusMember>> {
    match admin.replica_set_status() {
        StatusProbe::Initialized(status) => Ok(status.primaries().next().cloned()),
        StatusProbe::NotInitialized => Err(ClusterError::NoReplicaSet),
        StatusProbe::Unavailable(err) => Err(err),
    }
}

/// Poll `find_primary` up to `policy.max_attempts` times.
///
/// Pauses `policy.interval` between attempts, never after the last one. A
/// node that does not report a replica set yet is treated like one without
/// a primary; every other failure is returned immediately.
pub fn await_primary(
    admin: &dyn ClusterAdmin,
    policy: &PollPolicy,
    pause: &dyn Pause,
) -> ClusterResult<Option<StatusMember>> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match find_primary(admin) {
            Ok(Some(primary)) => {
                log_event_with_fields(
                    Event::PrimaryFound,
                    &[
                        ("attempt", &attempt.to_string()),
                        ("primary", &primary.host),
                    ],
                );
                return Ok(Some(primary));
            }
            Ok(None) | Err(ClusterError::NoReplicaSet) => {
                log_event_with_fields(
                    Event::PrimaryPending,
                    &[
                        ("attempt", &attempt.to_string()),
                        ("max_attempts", &attempts.to_string()),
                    ],
                );
            }
            Err(err) => return Err(err),
        }

        if attempt < attempts {
            pause.pause(policy.interval);
        }
    }

    log_event_with_fields(
        Event::PrimaryWaitExhausted,
        &[("attempts", &attempts.to_string())],
    );
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{HostPort, InMemoryCluster, ReplicaSetConfig, StateLabel};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingPause {
        pauses: RefCell<Vec<Duration>>,
    }

    impl Pause for RecordingPause {
        fn pause(&self, interval: Duration) {
            self.pauses.borrow_mut().push(interval);
        }
    }

    fn initiated(hosts: &[&str]) -> InMemoryCluster {
        let mut config = ReplicaSetConfig::initial("rs0", &HostPort::new("m1", 27018));
        for host in &hosts[1..] {
            config = config.with_member_appended(*host);
        }
        InMemoryCluster::with_replica_set(config)
    }

    #[test]
    fn test_find_primary_returns_primary_member() {
        let cluster = initiated(&["m1:27018", "m2:27018"]);
        cluster.set_member_state("m1:27018", StateLabel::Secondary);
        cluster.set_member_state("m2:27018", StateLabel::Primary);

        let primary = find_primary(&cluster).unwrap().unwrap();
        assert_eq!(primary.host, "m2:27018");
    }

    #[test]
    fn test_find_primary_none_during_election() {
        let cluster = initiated(&["m1:27018"]);
        cluster.set_member_state("m1:27018", StateLabel::Startup2);

        assert_eq!(find_primary(&cluster).unwrap(), None);
    }

    #[test]
    fn test_find_primary_uninitialized_is_distinct() {
        let cluster = InMemoryCluster::uninitialized();
        assert_eq!(find_primary(&cluster), Err(ClusterError::NoReplicaSet));
    }

    #[test]
    fn test_await_primary_exhausts_attempts() {
        let cluster = initiated(&["m1:27018"]);
        cluster.set_member_state("m1:27018", StateLabel::Secondary);
        let pause = RecordingPause::default();
        let policy = PollPolicy::new(3, Duration::from_millis(250));

        let result = await_primary(&cluster, &policy, &pause).unwrap();

        assert_eq!(result, None);
        assert_eq!(cluster.status_queries(), 3);
        assert_eq!(
            *pause.pauses.borrow(),
            vec![Duration::from_millis(250), Duration::from_millis(250)]
        );
    }

    #[test]
    fn test_await_primary_stops_on_first_primary() {
        let cluster = initiated(&["m1:27018"]);
        let pause = RecordingPause::default();

        let result = await_primary(&cluster, &PollPolicy::default(), &pause).unwrap();

        assert_eq!(result.unwrap().host, "m1:27018");
        assert_eq!(cluster.status_queries(), 1);
        assert!(pause.pauses.borrow().is_empty());
    }

    #[test]
    fn test_await_primary_waits_through_election() {
        let cluster = InMemoryCluster::uninitialized();
        cluster
            .initiate(&ReplicaSetConfig::initial("rs0", &HostPort::new("m1", 27018)))
            .unwrap();
        cluster.elect_after(Some(2));
        let pause = RecordingPause::default();

        let result = await_primary(&cluster, &PollPolicy::default(), &pause).unwrap();

        assert_eq!(result.unwrap().host, "m1:27018");
        assert_eq!(cluster.status_queries(), 3);
        assert_eq!(pause.pauses.borrow().len(), 2);
    }

    #[test]
    fn test_await_primary_treats_missing_set_as_pending() {
        let cluster = InMemoryCluster::uninitialized();
        let pause = RecordingPause::default();
        let policy = PollPolicy::new(2, Duration::from_secs(1));

        assert_eq!(await_primary(&cluster, &policy, &pause), Ok(None));
        assert_eq!(cluster.status_queries(), 2);
    }

    #[test]
    fn test_await_primary_propagates_transport_failure() {
        let cluster = initiated(&["m1:27018"]);
        cluster.fail_status_with(ClusterError::Connection("reset by peer".into()));
        let pause = RecordingPause::default();

        let err = await_primary(&cluster, &PollPolicy::default(), &pause).unwrap_err();

        assert_eq!(err.code(), "TOPO_CONNECTION_FAILED");
        assert_eq!(cluster.status_queries(), 1);
        assert!(pause.pauses.borrow().is_empty());
    }
}
