//! Application runtime

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::core::event::{BroadcasterConfig, EventBroadcaster, EventFilter, Listener};
use crate::core::plugin::{Plugin, PluginState};
use crate::core::{Context, PageRequest};
use crate::dispatcher::Dispatcher;
use crate::error::{QuillError, Result};
use crate::fetcher::Fetcher;
use crate::model::{Blog, Category, Entry};
use crate::runtime::chain::{ChainConfig, ChainSet, PluginChain, PluginRegistry};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub description: String,
    pub chain_config: ChainConfig,
    pub broadcaster_config: BroadcasterConfig,
    pub graceful_shutdown_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "QuillApp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: String::new(),
            chain_config: ChainConfig::default(),
            broadcaster_config: BroadcasterConfig::default(),
            graceful_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_chain_config(mut self, config: ChainConfig) -> Self {
        self.chain_config = config;
        self
    }

    pub fn with_broadcaster_config(mut self, config: BroadcasterConfig) -> Self {
        self.broadcaster_config = config;
        self
    }

    pub fn with_graceful_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_shutdown_timeout = timeout;
        self
    }
}

/// The finished product of one request: the transformed entry sequence and
/// the context accumulated by the chain, ready for a dispatcher.
#[derive(Debug)]
pub struct PageView {
    pub flavor: String,
    pub categories: Vec<Category>,
    pub entries: Vec<Entry>,
    pub context: HashMap<String, Value>,
}

pub struct AppBuilder {
    config: Option<AppConfig>,
    blog_id: Option<String>,
    plugins_to_register: Vec<Box<dyn Plugin>>,
    listeners_to_add: Vec<(Arc<dyn Listener>, Option<Box<dyn EventFilter>>)>,
    chains: ChainSet,
    fetcher: Option<Arc<dyn Fetcher>>,
    broadcaster: Option<Arc<EventBroadcaster>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            blog_id: None,
            plugins_to_register: Vec::new(),
            listeners_to_add: Vec::new(),
            chains: ChainSet::new(),
            fetcher: None,
            broadcaster: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_blog(mut self, blog_id: impl Into<String>) -> Self {
        self.blog_id = Some(blog_id.into());
        self
    }

    pub fn register_plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins_to_register.push(Box::new(plugin));
        self
    }

    pub fn register_plugins<I>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Plugin>>,
    {
        self.plugins_to_register.extend(plugins);
        self
    }

    pub fn add_listener<L: Listener + 'static>(mut self, listener: L) -> Self {
        self.listeners_to_add.push((Arc::new(listener), None));
        self
    }

    pub fn add_listener_with_filter<L, F>(mut self, listener: L, filter: F) -> Self
    where
        L: Listener + 'static,
        F: EventFilter + 'static,
    {
        self.listeners_to_add
            .push((Arc::new(listener), Some(Box::new(filter))));
        self
    }

    pub fn with_chains(mut self, chains: ChainSet) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<EventBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Wire the application: load the blog, initialize every registered
    /// plugin against it, and start the broadcaster's worker pool. A
    /// missing fetcher or blog is a configuration error; individual plugin
    /// init failures only exclude those plugins.
    pub async fn build(mut self) -> Result<QuillApp> {
        let config = self.config.take().unwrap_or_default();

        let fetcher = self
            .fetcher
            .ok_or_else(|| QuillError::Configuration("fetcher is required".to_string()))?;
        let blog_id = self
            .blog_id
            .ok_or_else(|| QuillError::Configuration("blog id is required".to_string()))?;

        let blog = fetcher.load_blog(&blog_id).await?;

        let broadcaster = self
            .broadcaster
            .unwrap_or_else(|| Arc::new(EventBroadcaster::with_config(config.broadcaster_config.clone())));
        for (listener, filter) in self.listeners_to_add {
            broadcaster.add_registration(listener, filter);
        }
        broadcaster.start().await?;

        let mut registry = PluginRegistry::new();
        for plugin in self.plugins_to_register {
            registry.register_boxed(plugin)?;
        }
        registry
            .init_all(&blog, config.chain_config.lifecycle_timeout)
            .await;

        Ok(QuillApp {
            config,
            blog,
            broadcaster,
            registry: tokio::sync::RwLock::new(registry),
            chains: self.chains,
            fetcher,
            is_running: tokio::sync::RwLock::new(true),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct QuillApp {
    config: AppConfig,
    blog: Blog,
    broadcaster: Arc<EventBroadcaster>,
    registry: tokio::sync::RwLock<PluginRegistry>,
    chains: ChainSet,
    fetcher: Arc<dyn Fetcher>,
    is_running: tokio::sync::RwLock<bool>,
}

impl QuillApp {
    pub fn build() -> AppBuilder {
        AppBuilder::new()
    }

    /// Serve one request: fetch the initial entry collection, run the
    /// flavor's plugin chain over it, and return the finished page view.
    /// Fetch failures degrade to an empty page rather than an error; only
    /// a shut-down application refuses the request.
    pub async fn handle_request(&self, req: &PageRequest) -> Result<PageView> {
        if !*self.is_running.read().await {
            return Err(QuillError::Runtime("application is shut down".to_string()));
        }

        let mut ctx = Context::new();
        ctx.insert("flavor", req.flavor.clone());

        let categories = match self.fetcher.load_all_categories(&self.blog).await {
            Ok(categories) => categories,
            Err(e) => {
                error!(error = %e, "category fetch failed");
                Vec::new()
            }
        };

        let page = req
            .param("page")
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|&page| page >= 1)
            .unwrap_or(1);

        let entries = match self
            .fetcher
            .load_entries(&self.blog, self.blog.display_entries, page, req.param("category"))
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "entry fetch failed");
                Vec::new()
            }
        };

        // A request may override the configured chain with an explicit
        // comma-separated plugin list.
        let override_names: Option<Vec<String>> = req.param("plugins").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect()
        });

        let registry = self.registry.read().await;
        let chain = PluginChain::new(&registry, &self.config.chain_config);
        let names = override_names
            .as_deref()
            .unwrap_or_else(|| self.chains.resolve(&req.flavor));

        debug!(flavor = %req.flavor, stages = names.len(), "executing chain");
        let entries = chain.execute(names, req, &self.blog, &mut ctx, entries).await?;

        Ok(PageView {
            flavor: req.flavor.clone(),
            categories,
            entries,
            context: ctx.into_values(),
        })
    }

    /// Serve one request and hand the result straight to a dispatcher.
    pub async fn dispatch_request(&self, req: &PageRequest, dispatcher: &dyn Dispatcher) -> Result<()> {
        let view = self.handle_request(req).await?;
        dispatcher.dispatch(req, &self.blog, view.context, view.entries).await
    }

    /// Destroy plugins in reverse registration order and stop the
    /// broadcaster. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        {
            let mut running = self.is_running.write().await;
            if !*running {
                return Ok(());
            }
            *running = false;
        }

        self.registry
            .write()
            .await
            .destroy_all(self.config.chain_config.lifecycle_timeout)
            .await;
        self.broadcaster.stop().await?;

        Ok(())
    }

    pub async fn force_shutdown(&self) -> Result<()> {
        match timeout(self.config.graceful_shutdown_timeout, self.shutdown()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("graceful shutdown timed out");
                Err(QuillError::Timeout("shutdown timeout".to_string()))
            }
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    pub async fn plugin_states(&self) -> Vec<(String, PluginState)> {
        self.registry.read().await.list_plugins()
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}
