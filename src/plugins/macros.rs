//! Macro token expansion

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use crate::core::context::{Context, PageRequest};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::{QuillError, Result};
use crate::model::{Blog, Entry};

/// Matches macro tokens as `$MACRO$`; escaped dollars are not recognized.
const MACRO_EXPRESSION: &str = r"\$[^\$]*\$";

/// Blog property prefix holding the macro table, e.g. `macro-NAME = World`.
pub const MACRO_PROPERTY_PREFIX: &str = "macro-";

/// Expands `$TOKEN$` occurrences in titles and bodies from the blog's macro
/// table. Unmatched tokens are left verbatim, sentinels included.
pub struct MacroPlugin {
    pattern: Option<Regex>,
    macros: HashMap<String, String>,
}

impl MacroPlugin {
    pub fn new() -> Self {
        Self {
            pattern: None,
            macros: HashMap::new(),
        }
    }

    fn expand(&self, pattern: &Regex, content: &str) -> String {
        pattern
            .replace_all(content, |captures: &regex::Captures| {
                let token = &captures[0];
                let name = &token[1..token.len() - 1];
                self.macros
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }
}

impl Default for MacroPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for MacroPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("macros", "1.0.0").with_description("Macro token expansion")
    }

    async fn init(&mut self, blog: &Blog) -> Result<()> {
        self.pattern = Some(
            Regex::new(MACRO_EXPRESSION)
                .map_err(|e| QuillError::Configuration(e.to_string()))?,
        );
        self.macros = blog.properties_with_prefix(MACRO_PROPERTY_PREFIX);
        Ok(())
    }

    async fn process(
        &self,
        _req: &PageRequest,
        _blog: &Blog,
        _ctx: &mut Context,
        mut entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        // No macro table configured: nothing to expand.
        if self.macros.is_empty() {
            return Ok(entries);
        }

        let Some(pattern) = &self.pattern else {
            warn!("macro pattern missing, stage skipped");
            return Ok(entries);
        };

        for entry in &mut entries {
            entry.title = self.expand(pattern, &entry.title);
            entry.body = self.expand(pattern, &entry.body);
        }

        Ok(entries)
    }
}
