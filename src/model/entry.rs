//! Content entries flowing through the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single content item. Identity (`id`) is immutable across the chain;
/// everything else may be rewritten in place by pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub permalink: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub posted_at: DateTime<Utc>,
    pub category: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Entry {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            permalink: format!("entry-{}", id),
            title: title.into(),
            body: String::new(),
            author: String::new(),
            posted_at: Utc::now(),
            category: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_permalink(mut self, permalink: impl Into<String>) -> Self {
        self.permalink = permalink.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = posted_at;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Store a derived fact for the renderer or a later stage.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// A content grouping an entry belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let entry = Entry::new(7, "Hello World")
            .with_permalink("hello-world")
            .with_body("First post")
            .with_author("jane");

        assert_eq!(entry.id, 7);
        assert_eq!(entry.permalink, "hello-world");
        assert_eq!(entry.title, "Hello World");
        assert_eq!(entry.body, "First post");
        assert_eq!(entry.author, "jane");
        assert!(entry.metadata.is_empty());
    }

    #[test]
    fn test_entry_metadata() {
        let mut entry = Entry::new(1, "Post");
        entry.set_metadata("pinned", true);

        assert_eq!(entry.metadata("pinned"), Some(&Value::Bool(true)));
        assert_eq!(entry.metadata("missing"), None);
    }

    #[test]
    fn test_category_builder() {
        let category = Category::new(3, "rust").with_description("Systems notes");

        assert_eq!(category.id, 3);
        assert_eq!(category.name, "rust");
        assert_eq!(category.description.as_deref(), Some("Systems notes"));
    }
}
