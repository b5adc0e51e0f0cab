use quillstream::plugins::{
    DaysSincePostedPlugin, ExcerptPlugin, MacroPlugin, MetaPlugin, ProviderRegistry,
    ResponsePlugin, SearchPlugin, SkipPlugin, StaticWeatherProvider, WeatherPlugin, WeatherReport,
    WidgetPlugin,
};
use quillstream::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn seeded_fetcher() -> Arc<MemoryFetcher> {
    let fetcher = MemoryFetcher::new();
    fetcher.add_blog(
        Blog::new("journal")
            .with_name("The Quillstream Journal")
            .with_url("http://localhost/blog")
            .with_display_entries(5)
            .with_property("macro-SIG", "-- the management"),
    );
    fetcher.add_entry(
        Entry::new(1, "Hello World")
            .with_permalink("hello-world")
            .with_body("meta-mood=cheerful\nWelcome aboard. $SIG$")
            .with_author("jane"),
    );
    fetcher.add_entry(
        Entry::new(2, "A Longer Story")
            .with_permalink("a-longer-story")
            .with_body("Lead-in <div class=\"excerpt\">the short version</div> and the long tail")
            .with_author("sam"),
    );
    Arc::new(fetcher)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let fetcher = seeded_fetcher();

    let broadcaster = Arc::new(EventBroadcaster::new());
    broadcaster.add_listener(listener("calendar-widget", |event: &Event| {
        if let EventKind::WidgetRequest(request) = &event.kind {
            if request.widget == "calendar" {
                request.set_fragment("<table class=\"calendar\"/>");
            }
        }
        async move { Ok(()) }
    }));
    let providers = ProviderRegistry::new();
    let static_provider = StaticWeatherProvider::new();
    static_provider.set_report(WeatherReport {
        station: "KRDU".to_string(),
        temperature_c: 21.5,
        conditions: "clear".to_string(),
    });
    providers.register("static", Arc::new(static_provider));

    let app = QuillApp::build()
        .with_config(AppConfig::new("quillstream-demo"))
        .with_blog("journal")
        .with_fetcher(Arc::clone(&fetcher) as Arc<dyn Fetcher>)
        .with_broadcaster(Arc::clone(&broadcaster))
        .add_listener_with_filter(
            listener("moderation", |event: &Event| {
                tracing::info!(source = %event.source, "response submission received");
                async move { Ok(()) }
            }),
            |event: &Event| matches!(event.kind, EventKind::ResponseSubmission(_)),
        )
        .register_plugin(MetaPlugin::new())
        .register_plugin(MacroPlugin::new())
        .register_plugin(ExcerptPlugin::new())
        .register_plugin(SearchPlugin::new())
        .register_plugin(SkipPlugin::new(Arc::clone(&fetcher) as Arc<dyn Fetcher>))
        .register_plugin(DaysSincePostedPlugin::new())
        .register_plugin(WeatherPlugin::new(Arc::new(providers)))
        .register_plugin(WidgetPlugin::new(Arc::clone(&broadcaster)))
        .register_plugin(ResponsePlugin::new(Arc::clone(&broadcaster)))
        .with_chains(ChainSet::new().with_default([
            "meta",
            "macros",
            "excerpt",
            "search",
            "skip",
            "days-since-posted",
            "weather",
            "widget",
            "response",
        ]))
        .build()
        .await?;

    broadcaster
        .broadcast_event(Event::new(
            "demo",
            EventKind::Authorization { username: "jane".to_string(), passed: true },
        ))
        .await?;

    let request = PageRequest::new("html")
        .with_param("widget", "calendar")
        .with_param("tb-url", "http://elsewhere.example/a-reply")
        .with_param("tb-title", "A reply")
        .with_param("permalink", "hello-world");
    let view = app.handle_request(&request).await?;

    println!("{}", quillstream::build_info());
    println!("rendered {} entries for flavor {}", view.entries.len(), view.flavor);
    for entry in &view.entries {
        println!("- [{}] {} :: {}", entry.id, entry.title, entry.body.replace('\n', " / "));
    }
    println!("context:");
    for (key, value) in &view.context {
        println!("  {} = {}", key, value);
    }

    // Let the fire-and-forget deliveries drain before tearing down.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    println!("deliveries: {} completed, {} dropped", broadcaster.delivered(), broadcaster.dropped());

    app.shutdown().await?;
    Ok(())
}
