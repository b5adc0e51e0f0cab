//! Metadata extraction from entry bodies

use async_trait::async_trait;

use crate::core::context::{Context, PageRequest};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::Result;
use crate::model::{Blog, Entry};

const DEFAULT_META_PREFIX: &str = "meta-";

/// Moves `prefix`-keyed lines out of the body and into entry metadata.
///
/// A line starting with the prefix and containing `=` after it becomes
/// `metadata[key] = value` and leaves the body; the first `=` after the
/// prefix delimits, so values may themselves contain `=`. Prefix lines
/// without `=` stay in the body verbatim.
pub struct MetaPlugin {
    prefix: String,
}

impl MetaPlugin {
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_META_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn extract(&self, entry: &mut Entry) {
        let mut kept: Vec<&str> = Vec::new();

        for line in entry.body.lines() {
            match line.strip_prefix(&self.prefix) {
                Some(rest) => match rest.find('=') {
                    Some(eq) => {
                        let key = rest[..eq].to_string();
                        let value = rest[eq + 1..].to_string();
                        entry.metadata.insert(key, value.into());
                    }
                    None => kept.push(line),
                },
                None => kept.push(line),
            }
        }

        entry.body = kept.join("\n");
    }
}

impl Default for MetaPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for MetaPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("meta", "1.0.0").with_description("Body-line metadata extraction")
    }

    async fn process(
        &self,
        _req: &PageRequest,
        _blog: &Blog,
        _ctx: &mut Context,
        mut entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        for entry in &mut entries {
            self.extract(entry);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn run(plugin: &MetaPlugin, body: &str) -> Entry {
        let mut ctx = Context::new();
        let entries = plugin
            .process(
                &PageRequest::new("html"),
                &Blog::new("journal"),
                &mut ctx,
                vec![Entry::new(1, "Post").with_body(body)],
            )
            .await
            .unwrap();
        entries.into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn test_meta_line_moves_to_metadata() {
        let entry = run(&MetaPlugin::new(), "meta-author=Jane\nRegular text").await;

        assert_eq!(entry.metadata("author"), Some(&Value::from("Jane")));
        assert_eq!(entry.body, "Regular text");
    }

    #[tokio::test]
    async fn test_value_may_contain_equals() {
        let entry = run(&MetaPlugin::new(), "meta-formula=a=b+c").await;

        assert_eq!(entry.metadata("formula"), Some(&Value::from("a=b+c")));
    }

    #[tokio::test]
    async fn test_prefix_line_without_equals_stays_in_body() {
        let entry = run(&MetaPlugin::new(), "meta-dangling\nBody line").await;

        assert!(entry.metadata.is_empty());
        assert_eq!(entry.body, "meta-dangling\nBody line");
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let plugin = MetaPlugin::new().with_prefix("x-");
        let entry = run(&plugin, "x-tag=rust\nmeta-author=Jane").await;

        assert_eq!(entry.metadata("tag"), Some(&Value::from("rust")));
        assert_eq!(entry.metadata("author"), None);
        assert_eq!(entry.body, "meta-author=Jane");
    }
}
