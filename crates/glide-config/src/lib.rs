//! Configuration system for Glide.
//!
//! Replay and recording knobs are runtime values persisted to disk as RON,
//! with CLI overrides via clap and hot-reload detection.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE, Config, DebugConfig, DemoConfig, Knobs, ReplayConfig, StoreConfig,
};
pub use error::ConfigError;

/// Default config directory (`<platform config dir>/glide`).
pub fn default_config_dir() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("glide"))
}
