//! Widget dispatch stage

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::core::context::{Context, PageRequest};
use crate::core::event::{Event, EventBroadcaster, EventKind, WidgetRequest};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::Result;
use crate::model::{Blog, Entry};

/// Request parameter naming the widget to render.
pub const WIDGET_PARAM: &str = "widget";
/// Context key receiving the rendered widget fragment.
pub const WIDGET_FRAGMENT_KEY: &str = "widget-fragment";

/// Dispatches a widget render through the synchronous event path.
///
/// The stage publishes a `WidgetRequest` carrying a writable fragment slot
/// and blocks until every matching listener has run; whichever listener
/// recognizes the widget writes the fragment the renderer will use. This is
/// the one stage that deliberately waits on listeners.
pub struct WidgetPlugin {
    broadcaster: Arc<EventBroadcaster>,
}

impl WidgetPlugin {
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

#[async_trait]
impl Plugin for WidgetPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("widget", "1.0.0").with_description("Synchronous widget dispatch")
    }

    async fn process(
        &self,
        req: &PageRequest,
        _blog: &Blog,
        ctx: &mut Context,
        entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        let Some(widget) = req.param(WIDGET_PARAM) else {
            return Ok(entries);
        };

        let request = WidgetRequest::new(widget);
        let event = Event::new("widget", EventKind::WidgetRequest(request.clone()));

        let report = self.broadcaster.process_event(&event).await;
        if !report.all_succeeded() {
            warn!(widget = %widget, failures = report.failures.len(), "widget listeners failed");
        }

        let fragment = request.fragment();
        if !fragment.is_empty() {
            ctx.insert(WIDGET_FRAGMENT_KEY, fragment);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::listener;

    fn broadcaster_with_calendar() -> Arc<EventBroadcaster> {
        let broadcaster = EventBroadcaster::new();
        broadcaster.add_listener(listener("calendar-widget", |event: &Event| {
            if let EventKind::WidgetRequest(request) = &event.kind {
                if request.widget == "calendar" {
                    request.set_fragment("<table class=\"calendar\"/>");
                }
            }
            async move { Ok(()) }
        }));
        Arc::new(broadcaster)
    }

    #[tokio::test]
    async fn test_widget_fragment_lands_in_context() {
        let plugin = WidgetPlugin::new(broadcaster_with_calendar());
        let mut ctx = Context::new();

        // No polling: process_event returns after the listener completed.
        plugin
            .process(
                &PageRequest::new("html").with_param(WIDGET_PARAM, "calendar"),
                &Blog::new("journal"),
                &mut ctx,
                Vec::new(),
            )
            .await
            .unwrap();

        assert_eq!(ctx.get_str(WIDGET_FRAGMENT_KEY), Some("<table class=\"calendar\"/>"));
    }

    #[tokio::test]
    async fn test_unknown_widget_leaves_context_alone() {
        let plugin = WidgetPlugin::new(broadcaster_with_calendar());
        let mut ctx = Context::new();

        plugin
            .process(
                &PageRequest::new("html").with_param(WIDGET_PARAM, "clock"),
                &Blog::new("journal"),
                &mut ctx,
                Vec::new(),
            )
            .await
            .unwrap();

        assert!(!ctx.contains(WIDGET_FRAGMENT_KEY));
    }

    #[tokio::test]
    async fn test_without_widget_param_is_noop() {
        let plugin = WidgetPlugin::new(broadcaster_with_calendar());
        let mut ctx = Context::new();

        let entries = plugin
            .process(
                &PageRequest::new("html"),
                &Blog::new("journal"),
                &mut ctx,
                vec![Entry::new(1, "Post")],
            )
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert!(ctx.is_empty());
    }
}
