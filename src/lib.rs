//! Quillstream - a plugin-pipeline content framework
//!
//! Entries flow through an ordered chain of plugins per request; an
//! asynchronous event broadcaster decouples stages from listeners.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod core;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod plugins;
pub mod runtime;

pub mod prelude {
    //! Commonly used types and traits

    pub use crate::core::{Context, Event, EventBroadcaster, EventKind, PageRequest, Plugin};
    pub use crate::core::{listener, EventFilter, Listener, OverflowPolicy, SyncDelivery};
    pub use crate::core::{BroadcasterConfig, PluginMetadata, PluginState, WidgetRequest};
    pub use crate::dispatcher::Dispatcher;
    pub use crate::error::{QuillError, Result, ResultExt};
    pub use crate::fetcher::{Fetcher, MemoryFetcher};
    pub use crate::model::{Blog, Category, Entry};
    pub use crate::runtime::{AppBuilder, AppConfig, PageView, QuillApp};
    pub use crate::runtime::{ChainConfig, ChainSet, PluginChain, PluginRegistry};
    pub use crate::bail;
    pub use async_trait::async_trait;
}

pub use crate::core::{Context, Event, Plugin};
pub use crate::error::{QuillError, Result};
pub use crate::runtime::QuillApp;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn build_info() -> String {
    format!("Quillstream {}", VERSION)
}

pub fn runtime_check() -> Result<()> {
    if tokio::runtime::Handle::try_current().is_err() {
        return Err(QuillError::Runtime(
            "No Tokio runtime found. Use #[tokio::main]".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert!(info.contains("Quillstream"));
    }

    #[tokio::test]
    async fn test_runtime_check() {
        assert!(runtime_check().is_ok());
    }

    #[tokio::test]
    async fn test_prelude_imports() {
        use prelude::*;

        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.listener_count(), 0);

        let mut ctx = Context::new();
        ctx.insert("key", "value");
        assert!(ctx.contains("key"));
    }
}
