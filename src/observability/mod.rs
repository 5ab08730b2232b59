//! Observability
//!
//! Structured JSON logging for reconciliation actions:
//! - one typed [`Event`] per log line
//! - explicit severity levels with a process-wide minimum
//! - [`ObservationScope`] for action begin/complete/failed lines
//!
//! Logs go to stderr. Observability never changes an action's outcome.
//!
//! ```ignore
//! use replset_keeper::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::MemberAdded, &[("member", "h2:27018")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};

/// Log an event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log an event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Error
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::DriverAvailable);
        log_event(Event::ConfigLoaded);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ShardAdded, &[("replica_set", "rs1")]);
    }
}
