//! Entry statistics stages

use async_trait::async_trait;
use chrono::Utc;

use crate::core::context::{Context, PageRequest};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::Result;
use crate::model::{Blog, Entry};

/// Metadata key for the age of an entry in whole days.
pub const DAYS_SINCE_POSTED_METADATA: &str = "days-since-posted";

/// Stamps each entry with the number of days since it was posted.
pub struct DaysSincePostedPlugin;

impl DaysSincePostedPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DaysSincePostedPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for DaysSincePostedPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("days-since-posted", "1.0.0")
            .with_description("Entry age in days as metadata")
    }

    async fn process(
        &self,
        _req: &PageRequest,
        _blog: &Blog,
        _ctx: &mut Context,
        mut entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        let today = Utc::now();

        for entry in &mut entries {
            let days = (today - entry.posted_at).num_days();
            entry.set_metadata(DAYS_SINCE_POSTED_METADATA, days);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::Value;

    #[tokio::test]
    async fn test_days_since_posted_stamped() {
        let plugin = DaysSincePostedPlugin::new();
        let mut ctx = Context::new();
        let entries = vec![
            Entry::new(1, "Old").with_posted_at(Utc::now() - Duration::days(10)),
            Entry::new(2, "Fresh").with_posted_at(Utc::now()),
        ];

        let entries = plugin
            .process(&PageRequest::new("html"), &Blog::new("journal"), &mut ctx, entries)
            .await
            .unwrap();

        assert_eq!(entries[0].metadata(DAYS_SINCE_POSTED_METADATA), Some(&Value::from(10)));
        assert_eq!(entries[1].metadata(DAYS_SINCE_POSTED_METADATA), Some(&Value::from(0)));
    }
}
