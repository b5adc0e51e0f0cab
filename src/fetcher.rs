//! Fetcher collaborator: loads blogs, entries, and categories

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{QuillError, Result};
use crate::model::{Blog, Category, Entry};

/// Source of the initial entry collection handed to the plugin chain.
/// Persistence lives behind this seam; the pipeline core only calls it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn load_blog(&self, blog_id: &str) -> Result<Blog>;

    /// Load one page of entries, newest first. `page` is 1-based; a
    /// `category` of `None` spans all categories.
    async fn load_entries(
        &self,
        blog: &Blog,
        page_size: usize,
        page: usize,
        category: Option<&str>,
    ) -> Result<Vec<Entry>>;

    async fn load_all_categories(&self, blog: &Blog) -> Result<Vec<Category>>;

    async fn count_entries(&self, blog: &Blog) -> Result<usize>;
}

/// In-memory fetcher used by tests and the demo binary.
#[derive(Default)]
pub struct MemoryFetcher {
    blogs: RwLock<HashMap<String, Blog>>,
    entries: RwLock<Vec<Entry>>,
    categories: RwLock<Vec<Category>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_blog(&self, blog: Blog) {
        self.blogs.write().insert(blog.id.clone(), blog);
    }

    pub fn add_entry(&self, entry: Entry) {
        self.entries.write().push(entry);
    }

    pub fn add_category(&self, category: Category) {
        self.categories.write().push(category);
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn load_blog(&self, blog_id: &str) -> Result<Blog> {
        self.blogs
            .read()
            .get(blog_id)
            .cloned()
            .ok_or_else(|| QuillError::Fetcher(format!("unknown blog: {}", blog_id)))
    }

    async fn load_entries(
        &self,
        _blog: &Blog,
        page_size: usize,
        page: usize,
        category: Option<&str>,
    ) -> Result<Vec<Entry>> {
        let mut entries: Vec<Entry> = self
            .entries
            .read()
            .iter()
            .filter(|entry| match category {
                Some(name) => entry.category.as_deref() == Some(name),
                None => true,
            })
            .cloned()
            .collect();

        entries.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));

        let offset = page.saturating_sub(1).saturating_mul(page_size);
        Ok(entries.into_iter().skip(offset).take(page_size).collect())
    }

    async fn load_all_categories(&self, _blog: &Blog) -> Result<Vec<Category>> {
        Ok(self.categories.read().clone())
    }

    async fn count_entries(&self, _blog: &Blog) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tokio_test::{assert_err, assert_ok};

    fn seeded_fetcher() -> MemoryFetcher {
        let fetcher = MemoryFetcher::new();
        fetcher.add_blog(Blog::new("journal"));
        for id in 0..5 {
            fetcher.add_entry(
                Entry::new(id, format!("Post {}", id))
                    .with_posted_at(Utc::now() - Duration::hours(id))
                    .with_category(if id % 2 == 0 { "even" } else { "odd" }),
            );
        }
        fetcher
    }

    #[tokio::test]
    async fn test_load_blog() {
        let fetcher = seeded_fetcher();

        tokio_test::assert_ok!(fetcher.load_blog("journal").await);
        tokio_test::assert_err!(fetcher.load_blog("missing").await);
    }

    #[tokio::test]
    async fn test_load_entries_newest_first_and_paged() {
        let fetcher = seeded_fetcher();
        let blog = fetcher.load_blog("journal").await.unwrap();

        let page_one = fetcher.load_entries(&blog, 2, 1, None).await.unwrap();
        assert_eq!(page_one.len(), 2);
        assert_eq!(page_one[0].id, 0);
        assert_eq!(page_one[1].id, 1);

        let page_three = fetcher.load_entries(&blog, 2, 3, None).await.unwrap();
        assert_eq!(page_three.len(), 1);
        assert_eq!(page_three[0].id, 4);
    }

    #[tokio::test]
    async fn test_load_entries_by_category() {
        let fetcher = seeded_fetcher();
        let blog = fetcher.load_blog("journal").await.unwrap();

        let even = fetcher.load_entries(&blog, 10, 1, Some("even")).await.unwrap();
        assert_eq!(even.len(), 3);
        assert!(even.iter().all(|e| e.category.as_deref() == Some("even")));
    }

    #[tokio::test]
    async fn test_count_entries() {
        let fetcher = seeded_fetcher();
        let blog = fetcher.load_blog("journal").await.unwrap();

        assert_eq!(fetcher.count_entries(&blog).await.unwrap(), 5);
    }
}
