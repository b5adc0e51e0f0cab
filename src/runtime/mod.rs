//! Runtime module: application wiring and chain execution

pub mod app;
pub mod chain;

pub use app::{AppBuilder, AppConfig, PageView, QuillApp};
pub use chain::{ChainConfig, ChainSet, PluginChain, PluginRegistry};
