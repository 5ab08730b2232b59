//! Shard registration
//!
//! Registers a replica set as a shard through a router. A replica set
//! already in the registry is left alone.

use crate::cluster::{ClusterAdmin, ClusterError, HostPort, ShardRegistryEntry};
use crate::observability::{log_event_with_fields, Event};

use super::outcome::{ActionError, ActionResult, Diagnostics, Outcome};

pub struct ShardClusterController<'a> {
    admin: &'a dyn ClusterAdmin,
}

impl<'a> ShardClusterController<'a> {
    pub fn new(admin: &'a dyn ClusterAdmin) -> Self {
        Self { admin }
    }

    /// Make sure `set_name` is registered, reachable through `member`.
    ///
    /// Presence is decided by the shard id alone; an existing entry with a
    /// different seed member is not touched.
    pub fn register_shard(&self, set_name: &str, member: &HostPort) -> ActionResult<Outcome> {
        let mut diagnostics = Diagnostics::new();
        let fail = |err: ClusterError, diagnostics: Diagnostics| {
            ActionError::new(
                format!("Unable to add shard {}", set_name),
                err,
                diagnostics,
            )
        };

        let shards = match self.admin.list_shards() {
            Ok(shards) => shards,
            Err(err) => return Err(fail(err, diagnostics)),
        };
        diagnostics.record("shards", &shards);

        if shards.iter().any(|shard| shard.id == set_name) {
            log_event_with_fields(Event::ShardPresent, &[("replica_set", set_name)]);
            return Ok(Outcome::unchanged().with_message(format!(
                "Replica set {} is already registered as a shard",
                set_name
            )));
        }

        let connection_string = ShardRegistryEntry::connection_string_for(set_name, member);
        diagnostics.record("connection_string", &connection_string);

        if let Err(err) = self.admin.add_shard(&connection_string) {
            return Err(fail(err, diagnostics));
        }

        log_event_with_fields(
            Event::ShardAdded,
            &[
                ("replica_set", set_name),
                ("connection_string", &connection_string),
            ],
        );
        Ok(Outcome::changed())
    }
}
