//! Error handling system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuillError {
    #[error("Plugin configuration error: {0}")]
    Configuration(String),

    #[error("Plugin processing failed: {0}")]
    Processing(String),

    #[error("External I/O failed: {0}")]
    ExternalIo(String),

    #[error("Malformed filter query: {0}")]
    FilterSyntax(String),

    #[error("Listener failed: {0}")]
    Listener(String),

    #[error("Fetcher error: {0}")]
    Fetcher(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, QuillError>;

pub trait ResultExt<T> {
    fn with_plugin(self, plugin_name: &str) -> Result<T>;
    fn with_event(self, event_name: &str) -> Result<T>;
    fn with_listener(self, listener_name: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_plugin(self, plugin_name: &str) -> Result<T> {
        self.map_err(|e| match e {
            QuillError::Configuration(msg) => QuillError::Configuration(format!("{} [plugin: {}]", msg, plugin_name)),
            QuillError::Processing(msg) => QuillError::Processing(format!("{} [plugin: {}]", msg, plugin_name)),
            other => QuillError::Processing(format!("{} [plugin: {}]", other, plugin_name)),
        })
    }

    fn with_event(self, event_name: &str) -> Result<T> {
        self.map_err(|e| match e {
            QuillError::Listener(msg) => QuillError::Listener(format!("{} [event: {}]", msg, event_name)),
            other => QuillError::Listener(format!("{} [event: {}]", other, event_name)),
        })
    }

    fn with_listener(self, listener_name: &str) -> Result<T> {
        self.map_err(|e| match e {
            QuillError::Listener(msg) => QuillError::Listener(format!("{} [listener: {}]", msg, listener_name)),
            other => QuillError::Listener(format!("{} [listener: {}]", other, listener_name)),
        })
    }
}

impl From<std::io::Error> for QuillError {
    fn from(error: std::io::Error) -> Self {
        QuillError::Io(error.to_string())
    }
}

#[macro_export]
macro_rules! bail {
    ($msg:literal) => {
        return Err($crate::error::QuillError::Other($msg.to_string()))
    };
    ($err:expr) => {
        return Err($crate::error::QuillError::Other($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::QuillError::Other(format!($fmt, $($arg)*)))
    };
}
