//! Blog configuration store

use std::collections::HashMap;

/// Blog-level configuration. Plugins read string-valued properties from
/// here at init time; missing or malformed values fall back to defaults
/// rather than failing the request path.
#[derive(Debug, Clone)]
pub struct Blog {
    pub id: String,
    pub name: String,
    pub url: String,
    pub display_entries: usize,
    properties: HashMap<String, String>,
}

const DEFAULT_DISPLAY_ENTRIES: usize = 15;

impl Blog {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            url: String::new(),
            display_entries: DEFAULT_DISPLAY_ENTRIES,
            properties: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_display_entries(mut self, display_entries: usize) -> Self {
        self.display_entries = display_entries;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn property_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.property(key).unwrap_or(default)
    }

    /// All properties whose key starts with `prefix`, with the prefix
    /// stripped from the returned keys.
    pub fn properties_with_prefix(&self, prefix: &str) -> HashMap<String, String> {
        self.properties
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .map(|stripped| (stripped.to_string(), value.clone()))
            })
            .collect()
    }
}
