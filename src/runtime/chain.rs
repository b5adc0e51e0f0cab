//! Plugin registry and chain execution

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::core::context::{Context, PageRequest};
use crate::core::plugin::{Plugin, PluginSlot, PluginState};
use crate::error::{QuillError, Result};
use crate::model::{Blog, Entry};

#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Timeout applied to each plugin's init and destroy call.
    pub lifecycle_timeout: Duration,
    /// When set, a stage failure is logged and its input passes through
    /// unchanged; when cleared, the failure propagates to the caller.
    pub fail_open: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            lifecycle_timeout: Duration::from_secs(30),
            fail_open: true,
        }
    }
}

impl ChainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lifecycle_timeout(mut self, lifecycle_timeout: Duration) -> Self {
        self.lifecycle_timeout = lifecycle_timeout;
        self
    }

    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }
}

/// Named plugin slots in registration order. Plugins are initialized once
/// against the blog configuration; a failed init marks the slot `Failed`
/// and keeps it out of every chain.
#[derive(Default)]
pub struct PluginRegistry {
    slots: Vec<PluginSlot>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> Result<()> {
        self.register_boxed(Box::new(plugin))
    }

    pub fn register_boxed(&mut self, plugin: Box<dyn Plugin>) -> Result<()> {
        let slot = PluginSlot::new(plugin);
        let name = slot.name().to_string();

        if self.index.contains_key(&name) {
            return Err(QuillError::Configuration(format!(
                "plugin {} already registered",
                name
            )));
        }

        self.index.insert(name, self.slots.len());
        self.slots.push(slot);
        Ok(())
    }

    /// Initialize every registered plugin. Failures (including timeouts)
    /// are logged and exclude the plugin from chains without failing the
    /// others.
    pub async fn init_all(&mut self, blog: &Blog, lifecycle_timeout: Duration) {
        for slot in &mut self.slots {
            let name = slot.metadata.name.clone();

            match timeout(lifecycle_timeout, slot.plugin.init(blog)).await {
                Ok(Ok(())) => {
                    slot.state = PluginState::Initialized;
                    debug!(plugin = %name, "plugin initialized");
                }
                Ok(Err(e)) => {
                    slot.state = PluginState::Failed;
                    error!(plugin = %name, error = %e, "plugin init failed, excluded from chains");
                }
                Err(_) => {
                    slot.state = PluginState::Failed;
                    error!(plugin = %name, "plugin init timed out, excluded from chains");
                }
            }
        }
    }

    /// Destroy initialized plugins in reverse registration order.
    pub async fn destroy_all(&mut self, lifecycle_timeout: Duration) {
        for slot in self.slots.iter_mut().rev() {
            if slot.state != PluginState::Initialized {
                continue;
            }
            let name = slot.metadata.name.clone();

            match timeout(lifecycle_timeout, slot.plugin.destroy()).await {
                Ok(Ok(())) => slot.state = PluginState::Destroyed,
                Ok(Err(e)) => {
                    slot.state = PluginState::Failed;
                    warn!(plugin = %name, error = %e, "plugin destroy failed");
                }
                Err(_) => {
                    slot.state = PluginState::Failed;
                    warn!(plugin = %name, "plugin destroy timed out");
                }
            }
        }
    }

    /// Look up a plugin eligible for chain placement.
    pub fn active(&self, name: &str) -> Option<&dyn Plugin> {
        self.index
            .get(name)
            .map(|&i| &self.slots[i])
            .filter(|slot| slot.is_active())
            .map(|slot| slot.plugin.as_ref())
    }

    pub fn state_of(&self, name: &str) -> Option<PluginState> {
        self.index.get(name).map(|&i| self.slots[i].state)
    }

    pub fn list_plugins(&self) -> Vec<(String, PluginState)> {
        self.slots.iter().map(PluginSlot::to_meta).collect()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn plugin_count(&self) -> usize {
        self.slots.len()
    }
}

/// Ordered plugin names per rendering flavor, with a default chain for
/// flavors that have none of their own.
#[derive(Debug, Clone, Default)]
pub struct ChainSet {
    chains: HashMap<String, Vec<String>>,
    default: Vec<String>,
}

impl ChainSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_chain<I, S>(mut self, flavor: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains
            .insert(flavor.into(), names.into_iter().map(Into::into).collect());
        self
    }

    pub fn resolve(&self, flavor: &str) -> &[String] {
        self.chains
            .get(flavor)
            .filter(|names| !names.is_empty())
            .map(Vec::as_slice)
            .unwrap_or(&self.default)
    }
}

/// Executes an ordered chain of stages over one request's entry sequence.
///
/// Stage i+1 receives exactly the entries stage i returned and the same
/// context object. There is no reordering, branching, or skipping beyond
/// the fail-open boundary; an unregistered or inactive name is logged and
/// passed over, matching the configured-but-unavailable-plugin behavior of
/// the request path.
pub struct PluginChain<'a> {
    registry: &'a PluginRegistry,
    config: &'a ChainConfig,
}

impl<'a> PluginChain<'a> {
    pub fn new(registry: &'a PluginRegistry, config: &'a ChainConfig) -> Self {
        Self { registry, config }
    }

    pub async fn execute(
        &self,
        names: &[String],
        req: &PageRequest,
        blog: &Blog,
        ctx: &mut Context,
        entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        let mut entries = entries;

        for name in names {
            let Some(plugin) = self.registry.active(name) else {
                error!(plugin = %name, "plugin not available");
                continue;
            };

            debug!(plugin = %name, "plugin execution");

            let checkpoint = self.config.fail_open.then(|| entries.clone());

            match plugin.process(req, blog, ctx, entries).await {
                Ok(next) => entries = next,
                Err(e) => match checkpoint {
                    Some(checkpoint) => {
                        error!(plugin = %name, error = %e, "stage failed, entries pass through unchanged");
                        entries = checkpoint;
                    }
                    None => {
                        if let Err(cleanup_err) = plugin.cleanup().await {
                            warn!(plugin = %name, error = %cleanup_err, "cleanup failed");
                        }
                        return Err(e);
                    }
                },
            }

            // Cleanup runs after every request, success or not.
            if let Err(e) = plugin.cleanup().await {
                warn!(plugin = %name, error = %e, "cleanup failed");
            }
        }

        Ok(entries)
    }
}
