//! Action results
//!
//! A successful action reports whether it changed the cluster. A failed one
//! carries the error plus every snapshot read before the failing step, so
//! the failure can be diagnosed without querying the cluster again.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::cluster::ClusterError;

/// Result type for reconciliation actions
pub type ActionResult<T> = Result<T, ActionError>;

/// Outcome of a successful action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub changed: bool,

    #[serde(rename = "msg", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Action specific values (`server`, `host`, `primary`...)
    #[serde(flatten)]
    pub facts: BTreeMap<String, String>,
}

impl Outcome {
    pub fn changed() -> Self {
        Self {
            changed: true,
            message: None,
            facts: BTreeMap::new(),
        }
    }

    pub fn unchanged() -> Self {
        Self {
            changed: false,
            message: None,
            facts: BTreeMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    pub fn fact(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Snapshots gathered while an action ran, in read order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Value>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record anything serializable; unserializable values are recorded as
    /// their error text rather than dropped.
    pub fn record<T: Serialize>(&mut self, label: &str, value: &T) {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|e| Value::String(format!("<unserializable: {}>", e)));
        self.0.push(serde_json::json!({ label: value }));
    }

    pub fn entries(&self) -> &[Value] {
        &self.0
    }

    /// First recorded value under `label`.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.0.iter().find_map(|entry| entry.get(label))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A failed action.
#[derive(Debug, Clone, Error)]
#[error("{message}: {source}")]
pub struct ActionError {
    message: String,
    #[source]
    source: ClusterError,
    diagnostics: Diagnostics,
}

impl ActionError {
    pub fn new(message: impl Into<String>, source: ClusterError, diagnostics: Diagnostics) -> Self {
        Self {
            message: message.into(),
            source,
            diagnostics,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &ClusterError {
        &self.source
    }

    pub fn code(&self) -> &'static str {
        self.source.code()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
