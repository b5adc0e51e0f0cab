//! Core module: event system, plugin system, and request context

pub mod context;
pub mod event;
pub mod plugin;

pub use context::{Context, PageRequest};
pub use event::{
    listener, BroadcasterConfig, ClosureListener, Event, EventBroadcaster, EventFilter, EventKind,
    Listener, ListenerFailure, OverflowPolicy, ResponseChannel, ResponseSubmission, SyncDelivery,
    WidgetRequest,
};
pub use plugin::{Plugin, PluginMetadata, PluginSlot, PluginState};
