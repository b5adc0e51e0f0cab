//! Request-scoped context shared across pipeline stages

use serde_json::Value;
use std::collections::HashMap;

/// The inbound request surface visible to pipeline stages: the rendering
/// flavor and the raw request parameters. Read-only during chain execution.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub flavor: String,
    params: HashMap<String, String>,
}

impl PageRequest {
    pub fn new(flavor: impl Into<String>) -> Self {
        Self {
            flavor: flavor.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }
}

/// Key-value side-channel created per request, threaded through every stage
/// of the chain, then handed to the dispatcher. Stages must use distinct
/// keys by convention; the platform enforces no namespacing.
#[derive(Debug, Default)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the context, yielding the accumulated values for the
    /// dispatcher.
    pub fn into_values(self) -> HashMap<String, Value> {
        self.values
    }
}
