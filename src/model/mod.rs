//! Data model: entries, categories, and blog configuration

pub mod blog;
pub mod entry;

pub use blog::Blog;
pub use entry::{Category, Entry};
