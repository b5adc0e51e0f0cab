//! Stage library: the bundled pipeline plugins

pub mod excerpt;
pub mod macros;
pub mod meta;
pub mod response;
pub mod search;
pub mod skip;
pub mod statistics;
pub mod weather;
pub mod widget;

pub use excerpt::ExcerptPlugin;
pub use macros::MacroPlugin;
pub use meta::MetaPlugin;
pub use response::ResponsePlugin;
pub use search::{PathSearchPlugin, SearchPlugin};
pub use skip::SkipPlugin;
pub use statistics::DaysSincePostedPlugin;
pub use weather::{ProviderRegistry, StaticWeatherProvider, WeatherPlugin, WeatherProvider, WeatherReport};
pub use widget::WidgetPlugin;
