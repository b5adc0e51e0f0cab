//! Weather report stage

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use crate::core::context::{Context, PageRequest};
use crate::core::plugin::{Plugin, PluginMetadata};
use crate::error::{QuillError, Result};
use crate::model::{Blog, Entry};

/// Context key carrying the fetched report.
pub const WEATHER_KEY: &str = "weather";

const STATION_PROPERTY: &str = "weather-station";
const PROVIDER_PROPERTY: &str = "weather-provider";
const DEFAULT_STATION: &str = "KRDU";
const DEFAULT_PROVIDER: &str = "static";

/// A fetched weather observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub station: String,
    pub temperature_c: f64,
    pub conditions: String,
}

/// Source of weather observations. Transports live behind this seam.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_report(&self, station: &str) -> Result<WeatherReport>;
}

/// Providers keyed by a string tag, registered at startup and resolved at
/// plugin init. An unknown tag is a configuration error, not a per-request
/// lookup.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn WeatherProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tag: impl Into<String>, provider: Arc<dyn WeatherProvider>) {
        self.providers.write().insert(tag.into(), provider);
    }

    pub fn resolve(&self, tag: &str) -> Option<Arc<dyn WeatherProvider>> {
        self.providers.read().get(tag).cloned()
    }
}

/// Fixed-answer provider for tests and demos.
#[derive(Default)]
pub struct StaticWeatherProvider {
    reports: RwLock<HashMap<String, WeatherReport>>,
}

impl StaticWeatherProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_report(&self, report: WeatherReport) {
        self.reports.write().insert(report.station.clone(), report);
    }
}

#[async_trait]
impl WeatherProvider for StaticWeatherProvider {
    async fn fetch_report(&self, station: &str) -> Result<WeatherReport> {
        self.reports
            .read()
            .get(station)
            .cloned()
            .ok_or_else(|| QuillError::ExternalIo(format!("no observation for station {}", station)))
    }
}

/// Publishes the blog's configured station report into the context. A
/// fetch failure skips publishing and lets the page render without it.
pub struct WeatherPlugin {
    registry: Arc<ProviderRegistry>,
    provider: Option<Arc<dyn WeatherProvider>>,
    station: String,
}

impl WeatherPlugin {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            provider: None,
            station: DEFAULT_STATION.to_string(),
        }
    }
}

#[async_trait]
impl Plugin for WeatherPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("weather", "1.0.0").with_description("Station weather into context")
    }

    async fn init(&mut self, blog: &Blog) -> Result<()> {
        self.station = blog.property_or(STATION_PROPERTY, DEFAULT_STATION).to_string();

        let tag = blog.property_or(PROVIDER_PROPERTY, DEFAULT_PROVIDER);
        self.provider = Some(self.registry.resolve(tag).ok_or_else(|| {
            QuillError::Configuration(format!("unknown weather provider: {}", tag))
        })?);

        Ok(())
    }

    async fn process(
        &self,
        _req: &PageRequest,
        _blog: &Blog,
        ctx: &mut Context,
        entries: Vec<Entry>,
    ) -> Result<Vec<Entry>> {
        let Some(provider) = &self.provider else {
            return Ok(entries);
        };

        match provider.fetch_report(&self.station).await {
            Ok(report) => match serde_json::to_value(&report) {
                Ok(value) => ctx.insert(WEATHER_KEY, value),
                Err(e) => error!(error = %e, "weather report not serializable"),
            },
            Err(e) => {
                error!(station = %self.station, error = %e, "weather fetch failed, skipping");
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_report() -> Arc<ProviderRegistry> {
        let provider = StaticWeatherProvider::new();
        provider.set_report(WeatherReport {
            station: "KRDU".to_string(),
            temperature_c: 21.5,
            conditions: "clear".to_string(),
        });

        let registry = ProviderRegistry::new();
        registry.register("static", Arc::new(provider));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_report_published_into_context() {
        let mut plugin = WeatherPlugin::new(registry_with_report());
        let blog = Blog::new("journal");
        plugin.init(&blog).await.unwrap();
        let mut ctx = Context::new();

        let entries = plugin
            .process(&PageRequest::new("html"), &blog, &mut ctx, vec![Entry::new(1, "Post")])
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        let report = ctx.get(WEATHER_KEY).unwrap();
        assert_eq!(report["station"], "KRDU");
        assert_eq!(report["conditions"], "clear");
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_publishing() {
        let mut plugin = WeatherPlugin::new(registry_with_report());
        // Configured station has no observation in the provider.
        let blog = Blog::new("journal").with_property(STATION_PROPERTY, "XXXX");
        plugin.init(&blog).await.unwrap();
        let mut ctx = Context::new();

        let entries = plugin
            .process(&PageRequest::new("html"), &blog, &mut ctx, vec![Entry::new(1, "Post")])
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert!(!ctx.contains(WEATHER_KEY));
    }

    #[tokio::test]
    async fn test_unknown_provider_tag_fails_init() {
        let mut plugin = WeatherPlugin::new(registry_with_report());
        let blog = Blog::new("journal").with_property(PROVIDER_PROPERTY, "reflective");

        let result = plugin.init(&blog).await;

        assert!(matches!(result, Err(QuillError::Configuration(_))));
    }
}
