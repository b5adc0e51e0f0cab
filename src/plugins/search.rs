//! Search filtering stages

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::core::context::{Context, PageRequest};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::{QuillError, Result};
use crate::model::{Blog, Entry};

/// Request parameter carrying the search term.
pub const QUERY_PARAM: &str = "query";

/// Case-insensitive substring search over title and body.
///
/// The asymmetry is deliberate and part of the contract: a missing `query`
/// parameter returns the entries unchanged, while a query that matches
/// nothing returns an empty sequence.
pub struct SearchPlugin;

impl SearchPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SearchPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for SearchPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("search", "1.0.0").with_description("Substring search over title and body")
    }

    async fn process(
        &self,
        req: &PageRequest,
        _blog: &Blog,
        _ctx: &mut Context,
        entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        let Some(query) = req.param(QUERY_PARAM) else {
            return Ok(entries);
        };
        let query = query.to_lowercase();

        Ok(entries
            .into_iter()
            .filter(|entry| {
                entry.title.to_lowercase().contains(&query)
                    || entry.body.to_lowercase().contains(&query)
            })
            .collect())
    }
}

/// Structured path-query search with substring fallback.
///
/// A query starting with `/` is evaluated as a path expression over the
/// serialized entry sequence (the leading `/` addresses the sequence root);
/// zero matches or a malformed expression yield an empty result. Any other
/// query falls back to [`SearchPlugin`] semantics.
pub struct PathSearchPlugin {
    search: SearchPlugin,
}

impl PathSearchPlugin {
    pub fn new() -> Self {
        Self { search: SearchPlugin::new() }
    }

    fn select(query: &str, entries: &[Entry]) -> Result<Vec<Entry>> {
        let root = serde_json::to_value(entries)
            .map_err(|e| QuillError::FilterSyntax(e.to_string()))?;

        let path = format!("${}", query.strip_prefix('/').unwrap_or(query));
        let selected = jsonpath_lib::select(&root, &path)
            .map_err(|e| QuillError::FilterSyntax(format!("{:?}", e)))?;

        let ids: Vec<i64> = selected
            .iter()
            .filter_map(|value| value.get("id").and_then(Value::as_i64))
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| entries.iter().find(|entry| entry.id == *id).cloned())
            .collect())
    }
}

impl Default for PathSearchPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for PathSearchPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("path-search", "1.0.0")
            .with_description("Path-query search with substring fallback")
    }

    async fn process(
        &self,
        req: &PageRequest,
        blog: &Blog,
        ctx: &mut Context,
        entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        let Some(query) = req.param(QUERY_PARAM) else {
            return Ok(entries);
        };
        let query = query.trim().to_string();

        if query.starts_with('/') {
            debug!(query = %query, "attempting path query");
            match Self::select(&query, &entries) {
                Ok(found) => Ok(found),
                Err(e) => {
                    error!(query = %query, error = %e, "path query failed");
                    Ok(Vec::new())
                }
            }
        } else {
            self.search.process(req, blog, ctx, entries).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<Entry> {
        vec![
            Entry::new(1, "Hello World").with_body("First post").with_author("jane"),
            Entry::new(2, "Goodbye").with_body("Closing note").with_author("sam"),
        ]
    }

    async fn run(plugin: &impl Plugin, req: PageRequest) -> Vec<Entry> {
        let mut ctx = Context::new();
        plugin
            .process(&req, &Blog::new("journal"), &mut ctx, sample_entries())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_search_matches_case_insensitively() {
        let found = run(&SearchPlugin::new(), PageRequest::new("html").with_param("query", "hello")).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Hello World");
    }

    #[tokio::test]
    async fn test_search_matches_body() {
        let found = run(&SearchPlugin::new(), PageRequest::new("html").with_param("query", "closing")).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[tokio::test]
    async fn test_search_no_match_yields_empty() {
        let found = run(&SearchPlugin::new(), PageRequest::new("html").with_param("query", "zzz")).await;

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_search_without_query_passes_through() {
        let found = run(&SearchPlugin::new(), PageRequest::new("html")).await;

        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_path_query_filters_by_field() {
        let found = run(
            &PathSearchPlugin::new(),
            PageRequest::new("html").with_param("query", "/[?(@.author == 'jane')]"),
        )
        .await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[tokio::test]
    async fn test_path_query_zero_matches_yields_empty() {
        let found = run(
            &PathSearchPlugin::new(),
            PageRequest::new("html").with_param("query", "/[?(@.author == 'nobody')]"),
        )
        .await;

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_path_query_yields_empty() {
        let found = run(
            &PathSearchPlugin::new(),
            PageRequest::new("html").with_param("query", "/[[[broken"),
        )
        .await;

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_path_search_falls_back_to_substring() {
        let found = run(
            &PathSearchPlugin::new(),
            PageRequest::new("html").with_param("query", "goodbye"),
        )
        .await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[tokio::test]
    async fn test_path_search_without_query_passes_through() {
        let found = run(&PathSearchPlugin::new(), PageRequest::new("html")).await;

        assert_eq!(found.len(), 2);
    }
}
