pub mod catalog;
pub mod command;
pub mod config;
pub mod debounce;
pub mod filter;
pub mod prefs;
pub mod sort;
pub mod source;
pub mod stats;
pub mod store;
pub mod tui;
pub mod window;

/// Application name for XDG paths
pub const APP_NAME: &str = "radarview";
