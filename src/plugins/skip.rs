//! Pagination ("skip") helper stage

use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

use crate::core::context::{Context, PageRequest};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::model::{Blog, Entry};

/// Context key holding the resolved 1-based page number.
pub const CURRENT_PAGE_KEY: &str = "current-page";
/// Context key holding the total page count.
pub const TOTAL_PAGES_KEY: &str = "total-pages";
/// Request parameter carrying the 1-based page number.
pub const PAGE_PARAM: &str = "page";

/// Publishes pagination facts for the renderer: the current page (clamped
/// to >= 1 on a missing or invalid parameter) and the total page count.
///
/// The total is the entry count divided by the page size with no rounding
/// up: a partial last page is not counted. Callers should treat that as a
/// known truncation.
pub struct SkipPlugin {
    fetcher: Arc<dyn Fetcher>,
}

impl SkipPlugin {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    fn current_page(req: &PageRequest) -> i64 {
        req.param(PAGE_PARAM)
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|&page| page >= 1)
            .unwrap_or(1)
    }
}

#[async_trait]
impl Plugin for SkipPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("skip", "1.0.0").with_description("Pagination helper")
    }

    async fn process(
        &self,
        req: &PageRequest,
        blog: &Blog,
        ctx: &mut Context,
        entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        match self.fetcher.count_entries(blog).await {
            Ok(total) => {
                let total_pages = if blog.display_entries == 0 {
                    0
                } else {
                    (total / blog.display_entries) as i64
                };

                ctx.insert(CURRENT_PAGE_KEY, Self::current_page(req));
                ctx.insert(TOTAL_PAGES_KEY, total_pages);
            }
            Err(e) => {
                error!(error = %e, "entry count failed, pagination skipped");
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuillError;
    use crate::fetcher::MemoryFetcher;
    use crate::model::Category;

    struct BrokenFetcher;

    #[async_trait]
    impl Fetcher for BrokenFetcher {
        async fn load_blog(&self, _blog_id: &str) -> Result<Blog> {
            Err(QuillError::Fetcher("offline".to_string()))
        }

        async fn load_entries(
            &self,
            _blog: &Blog,
            _page_size: usize,
            _page: usize,
            _category: Option<&str>,
        ) -> Result<Vec<Entry>> {
            Err(QuillError::Fetcher("offline".to_string()))
        }

        async fn load_all_categories(&self, _blog: &Blog) -> Result<Vec<Category>> {
            Err(QuillError::Fetcher("offline".to_string()))
        }

        async fn count_entries(&self, _blog: &Blog) -> Result<usize> {
            Err(QuillError::Fetcher("offline".to_string()))
        }
    }

    fn fetcher_with(count: usize) -> Arc<MemoryFetcher> {
        let fetcher = MemoryFetcher::new();
        for id in 0..count {
            fetcher.add_entry(Entry::new(id as i64, format!("Post {}", id)));
        }
        Arc::new(fetcher)
    }

    async fn run(plugin: &SkipPlugin, blog: &Blog, req: PageRequest) -> Context {
        let mut ctx = Context::new();
        plugin
            .process(&req, blog, &mut ctx, vec![Entry::new(99, "current")])
            .await
            .unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_total_pages_truncates() {
        let plugin = SkipPlugin::new(fetcher_with(10));
        let blog = Blog::new("journal").with_display_entries(4);

        let ctx = run(&plugin, &blog, PageRequest::new("html")).await;

        assert_eq!(ctx.get_i64(TOTAL_PAGES_KEY), Some(2));
        assert_eq!(ctx.get_i64(CURRENT_PAGE_KEY), Some(1));
    }

    #[tokio::test]
    async fn test_invalid_page_clamps_to_one() {
        let plugin = SkipPlugin::new(fetcher_with(10));
        let blog = Blog::new("journal").with_display_entries(4);

        for raw in ["0", "-3", "garbage"] {
            let ctx = run(&plugin, &blog, PageRequest::new("html").with_param(PAGE_PARAM, raw)).await;
            assert_eq!(ctx.get_i64(CURRENT_PAGE_KEY), Some(1), "page param {:?}", raw);
        }
    }

    #[tokio::test]
    async fn test_explicit_page_preserved() {
        let plugin = SkipPlugin::new(fetcher_with(10));
        let blog = Blog::new("journal").with_display_entries(4);

        let ctx = run(&plugin, &blog, PageRequest::new("html").with_param(PAGE_PARAM, "2")).await;

        assert_eq!(ctx.get_i64(CURRENT_PAGE_KEY), Some(2));
    }

    #[tokio::test]
    async fn test_fetcher_failure_fails_open() {
        let plugin = SkipPlugin::new(Arc::new(BrokenFetcher));
        let blog = Blog::new("journal").with_display_entries(4);
        let mut ctx = Context::new();

        let entries = plugin
            .process(&PageRequest::new("html"), &blog, &mut ctx, vec![Entry::new(1, "Post")])
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert!(!ctx.contains(CURRENT_PAGE_KEY));
        assert!(!ctx.contains(TOTAL_PAGES_KEY));
    }

    #[tokio::test]
    async fn test_zero_page_size_yields_zero_pages() {
        let plugin = SkipPlugin::new(fetcher_with(10));
        let blog = Blog::new("journal").with_display_entries(0);

        let ctx = run(&plugin, &blog, PageRequest::new("html")).await;

        assert_eq!(ctx.get_i64(TOTAL_PAGES_KEY), Some(0));
    }
}
