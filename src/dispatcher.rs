//! Dispatcher collaborator: renders the finished page

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::core::PageRequest;
use crate::error::Result;
use crate::model::{Blog, Entry};

/// Rendering seam. The chain hands the final entry sequence and the
/// accumulated context values here; template selection and output are not
/// the pipeline's concern.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        req: &PageRequest,
        blog: &Blog,
        context: HashMap<String, Value>,
        entries: Vec<Entry>,
    ) -> Result<()>;
}

/// Test double that records what it was handed.
#[derive(Default)]
pub struct CollectingDispatcher {
    pages: tokio::sync::Mutex<Vec<DispatchedPage>>,
}

#[derive(Debug)]
pub struct DispatchedPage {
    pub flavor: String,
    pub context: HashMap<String, Value>,
    pub entries: Vec<Entry>,
}

impl CollectingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pages(&self) -> Vec<DispatchedPage> {
        std::mem::take(&mut *self.pages.lock().await)
    }
}

#[async_trait]
impl Dispatcher for CollectingDispatcher {
    async fn dispatch(
        &self,
        req: &PageRequest,
        _blog: &Blog,
        context: HashMap<String, Value>,
        entries: Vec<Entry>,
    ) -> Result<()> {
        self.pages.lock().await.push(DispatchedPage {
            flavor: req.flavor.clone(),
            context,
            entries,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collecting_dispatcher_records_pages() {
        let dispatcher = CollectingDispatcher::new();
        let req = PageRequest::new("html");
        let blog = Blog::new("journal");
        let mut context = HashMap::new();
        context.insert("total-pages".to_string(), Value::from(3));

        dispatcher
            .dispatch(&req, &blog, context, vec![Entry::new(1, "Post")])
            .await
            .unwrap();

        let pages = dispatcher.pages().await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].flavor, "html");
        assert_eq!(pages[0].entries.len(), 1);
        assert_eq!(pages[0].context.get("total-pages"), Some(&Value::from(3)));
    }
}
