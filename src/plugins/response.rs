//! Response submission stage

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::core::context::{Context, PageRequest};
use crate::core::event::{Event, EventBroadcaster, EventKind, ResponseChannel, ResponseSubmission};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::Result;
use crate::model::{Blog, Entry};

/// Trackback submission parameters.
pub const TRACKBACK_URL_PARAM: &str = "tb-url";
pub const TRACKBACK_TITLE_PARAM: &str = "tb-title";
pub const TRACKBACK_EXCERPT_PARAM: &str = "tb-excerpt";
/// Pingback submission parameters.
pub const PINGBACK_SOURCE_PARAM: &str = "pb-source";
pub const PINGBACK_TARGET_PARAM: &str = "pb-target";
/// Permalink of the entry the submission targets.
pub const PERMALINK_PARAM: &str = "permalink";

/// Turns trackback/pingback submission parameters into a fire-and-forget
/// `ResponseSubmission` broadcast for moderation and notification
/// listeners. Entries always pass through unchanged; the page never waits
/// for the listeners.
pub struct ResponsePlugin {
    broadcaster: Arc<EventBroadcaster>,
}

impl ResponsePlugin {
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { broadcaster }
    }

    fn submission(req: &PageRequest, entries: &[Entry]) -> Option<ResponseSubmission> {
        let entry_id = req
            .param(PERMALINK_PARAM)
            .and_then(|permalink| entries.iter().find(|entry| entry.permalink == permalink))
            .map(|entry| entry.id);

        if let Some(url) = req.param(TRACKBACK_URL_PARAM) {
            return Some(ResponseSubmission {
                channel: ResponseChannel::Trackback,
                submitter: url.to_string(),
                submitter_item1: req.param(TRACKBACK_TITLE_PARAM).unwrap_or_default().to_string(),
                submitter_item2: String::new(),
                content: req.param(TRACKBACK_EXCERPT_PARAM).unwrap_or_default().to_string(),
                entry_id,
                metadata: HashMap::new(),
            });
        }

        if let Some(source) = req.param(PINGBACK_SOURCE_PARAM) {
            return Some(ResponseSubmission {
                channel: ResponseChannel::Pingback,
                submitter: source.to_string(),
                submitter_item1: req.param(PINGBACK_TARGET_PARAM).unwrap_or_default().to_string(),
                submitter_item2: String::new(),
                content: String::new(),
                entry_id,
                metadata: HashMap::new(),
            });
        }

        None
    }
}

#[async_trait]
impl Plugin for ResponsePlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("response", "1.0.0")
            .with_description("Trackback/pingback submission broadcast")
    }

    async fn process(
        &self,
        req: &PageRequest,
        _blog: &Blog,
        _ctx: &mut Context,
        entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        if let Some(submission) = Self::submission(req, &entries) {
            let event = Event::new("response", EventKind::ResponseSubmission(submission));
            if let Err(e) = self.broadcaster.broadcast_event(event).await {
                warn!(error = %e, "response submission broadcast failed");
            }
        }

        Ok(entries)
    }
}
