//! Excerpt marker expansion

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use crate::core::context::{Context, PageRequest};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::{QuillError, Result};
use crate::model::{Blog, Entry};

/// Request parameter asking for the full content ("show me more").
pub const SHOW_ME_MORE_PARAM: &str = "smm";

const EXCERPT_EXPRESSION: &str = r#"(?s)(^|\s).*<div class="excerpt">(.*)</div>.*"#;
const READ_MORE_TEXT_PROPERTY: &str = "excerpt-read-more-text";
const DEFAULT_READ_MORE_TEXT: &str = "Read More";

/// Rewrites bodies carrying an excerpt marker down to the excerpt plus a
/// "read more" link at the entry's permalink.
///
/// When the request already carries the show-me-more parameter the stage is
/// a no-op: the unmodified body, marker included, passes through.
pub struct ExcerptPlugin {
    pattern: Option<Regex>,
    read_more_text: String,
}

impl ExcerptPlugin {
    pub fn new() -> Self {
        Self {
            pattern: None,
            read_more_text: DEFAULT_READ_MORE_TEXT.to_string(),
        }
    }

    fn rewrite(&self, pattern: &Regex, blog: &Blog, entry: &mut Entry) {
        if let Some(captures) = pattern.captures(&entry.body) {
            let excerpt = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
            entry.body = format!(
                "{} &nbsp;<a class=\"smm\" href=\"{}?permalink={}&amp;{}=y\">{}</a>",
                excerpt, blog.url, entry.permalink, SHOW_ME_MORE_PARAM, self.read_more_text
            );
        }
    }
}

impl Default for ExcerptPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for ExcerptPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("excerpt", "1.0.0")
            .with_description("Excerpt marker to read-more link rewriting")
    }

    async fn init(&mut self, blog: &Blog) -> Result<()> {
        self.pattern = Some(
            Regex::new(EXCERPT_EXPRESSION)
                .map_err(|e| QuillError::Configuration(e.to_string()))?,
        );
        self.read_more_text = blog
            .property_or(READ_MORE_TEXT_PROPERTY, DEFAULT_READ_MORE_TEXT)
            .to_string();
        Ok(())
    }

    async fn process(
        &self,
        req: &PageRequest,
        blog: &Blog,
        _ctx: &mut Context,
        mut entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        if req.has_param(SHOW_ME_MORE_PARAM) {
            return Ok(entries);
        }

        let Some(pattern) = &self.pattern else {
            warn!("excerpt pattern missing, stage skipped");
            return Ok(entries);
        };

        for entry in &mut entries {
            self.rewrite(pattern, blog, entry);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ready_plugin(blog: &Blog) -> ExcerptPlugin {
        let mut plugin = ExcerptPlugin::new();
        plugin.init(blog).await.unwrap();
        plugin
    }

    fn marked_entry() -> Entry {
        Entry::new(1, "Post")
            .with_permalink("long-post")
            .with_body("Intro <div class=\"excerpt\">the short version</div> and the rest")
    }

    #[tokio::test]
    async fn test_marker_rewritten_to_read_more_link() {
        let blog = Blog::new("journal").with_url("http://example.com/blog");
        let plugin = ready_plugin(&blog).await;
        let mut ctx = Context::new();

        let entries = plugin
            .process(&PageRequest::new("html"), &blog, &mut ctx, vec![marked_entry()])
            .await
            .unwrap();

        let body = &entries[0].body;
        assert!(body.starts_with("the short version"));
        assert!(body.contains("http://example.com/blog?permalink=long-post&amp;smm=y"));
        assert!(body.contains("Read More"));
        assert!(!body.contains("<div class=\"excerpt\">"));
    }

    #[tokio::test]
    async fn test_show_me_more_request_is_noop() {
        let blog = Blog::new("journal").with_url("http://example.com/blog");
        let plugin = ready_plugin(&blog).await;
        let mut ctx = Context::new();
        let original = marked_entry();

        let entries = plugin
            .process(
                &PageRequest::new("html").with_param(SHOW_ME_MORE_PARAM, "y"),
                &blog,
                &mut ctx,
                vec![original.clone()],
            )
            .await
            .unwrap();

        // Marker deliberately not stripped in this branch.
        assert_eq!(entries[0].body, original.body);
    }

    #[tokio::test]
    async fn test_body_without_marker_untouched() {
        let blog = Blog::new("journal");
        let plugin = ready_plugin(&blog).await;
        let mut ctx = Context::new();
        let entry = Entry::new(2, "Plain").with_body("No marker here");

        let entries = plugin
            .process(&PageRequest::new("html"), &blog, &mut ctx, vec![entry])
            .await
            .unwrap();

        assert_eq!(entries[0].body, "No marker here");
    }

    #[tokio::test]
    async fn test_read_more_text_configurable() {
        let blog = Blog::new("journal")
            .with_url("http://example.com")
            .with_property(READ_MORE_TEXT_PROPERTY, "Weiterlesen");
        let plugin = ready_plugin(&blog).await;
        let mut ctx = Context::new();

        let entries = plugin
            .process(&PageRequest::new("html"), &blog, &mut ctx, vec![marked_entry()])
            .await
            .unwrap();

        assert!(entries[0].body.contains("Weiterlesen"));
    }
}
