//! Plugin system

use async_trait::async_trait;

use crate::core::context::{Context, PageRequest};
use crate::error::Result;
use crate::model::{Blog, Entry};

/// Lifecycle of a plugin instance. `init` runs exactly once before any
/// `process`; `process` runs once per request; `destroy` runs exactly once
/// when the plugin is withdrawn from service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Uninitialized,
    Initialized,
    Failed,
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

/// One named transformation stage in the per-request pipeline.
///
/// `process` receives the read-only request surface, the blog
/// configuration, the shared request context, and the current ordered entry
/// sequence, and returns the (possibly new) sequence for the next stage.
/// Stages mutate entries in place, write context keys, broadcast events,
/// and perform I/O; a stage that cannot complete its transformation should
/// log and return its input unchanged rather than fail the request.
///
/// Instances are shared across concurrent requests after `init`, so any
/// state acquired there must be immutable for the lifetime of the plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn metadata(&self) -> PluginMetadata;

    /// Acquire long-lived resources. A `Configuration` error here keeps the
    /// plugin out of every chain.
    async fn init(&mut self, _blog: &Blog) -> Result<()> {
        Ok(())
    }

    async fn process(
        &self,
        req: &PageRequest,
        blog: &Blog,
        ctx: &mut Context,
        entries: Vec<Entry>,
    ) -> Result<Vec<Entry>>;

    /// Release per-request state. Runs after every request, whether or not
    /// `process` succeeded.
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Release process-lifetime resources.
    async fn destroy(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> String {
        self.metadata().name
    }

    fn version(&self) -> String {
        self.metadata().version
    }
}

/// A registered plugin together with its lifecycle state.
pub struct PluginSlot {
    pub plugin: Box<dyn Plugin>,
    pub metadata: PluginMetadata,
    pub state: PluginState,
}

impl PluginSlot {
    pub fn new(plugin: Box<dyn Plugin>) -> Self {
        let metadata = plugin.metadata();
        Self {
            plugin,
            metadata,
            state: PluginState::Uninitialized,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Whether this plugin may be placed in a chain.
    pub fn is_active(&self) -> bool {
        matches!(self.state, PluginState::Initialized)
    }

    pub fn to_meta(&self) -> (String, PluginState) {
        (self.metadata.name.clone(), self.state)
    }
}
