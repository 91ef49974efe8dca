//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Glide command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "glide", about = "Pointer motion history sync demo")]
pub struct CliArgs {
    /// Writer flush period in milliseconds.
    #[arg(long)]
    pub flush_frequency: Option<u64>,

    /// Minimum spacing of kept pointer samples in milliseconds.
    #[arg(long)]
    pub min_sample_duration: Option<u64>,

    /// Buffer depth (ms) below which replay slows down.
    #[arg(long)]
    pub min_buffer_age: Option<f64>,

    /// Buffer depth (ms) above which replay speeds up.
    #[arg(long)]
    pub max_buffer_age: Option<f64>,

    /// Hard cap (ms) on how far replay may trail the freshest server time.
    #[arg(long)]
    pub hard_buffer_age: Option<f64>,

    /// Zone to join.
    #[arg(long)]
    pub zone: Option<String>,

    /// Number of replaying readers.
    #[arg(long)]
    pub readers: Option<u32>,

    /// Scenario duration in seconds.
    #[arg(long)]
    pub duration: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ms) = args.flush_frequency {
            self.knobs.flush_frequency = ms;
        }
        if let Some(ms) = args.min_sample_duration {
            self.knobs.min_sample_duration = ms;
        }
        if let Some(ms) = args.min_buffer_age {
            self.knobs.min_server_buffer_age_soft = ms;
        }
        if let Some(ms) = args.max_buffer_age {
            self.knobs.max_server_buffer_age_soft = ms;
        }
        if let Some(ms) = args.hard_buffer_age {
            self.knobs.max_server_buffer_age_hard = ms;
        }
        if let Some(ref zone) = args.zone {
            self.demo.zone = zone.clone();
        }
        if let Some(readers) = args.readers {
            self.demo.readers = readers;
        }
        if let Some(secs) = args.duration {
            self.demo.duration_secs = secs;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            flush_frequency: Some(250),
            zone: Some("gallery".to_string()),
            hard_buffer_age: Some(3000.0),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.knobs.flush_frequency, 250);
        assert_eq!(config.knobs.max_server_buffer_age_hard, 3000.0);
        assert_eq!(config.demo.zone, "gallery");
        // Non-overridden fields retain defaults
        assert_eq!(config.knobs.min_sample_duration, 4);
        assert_eq!(config.demo.readers, 2);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "glide",
            "--readers",
            "5",
            "--min-sample-duration",
            "8",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.readers, Some(5));
        assert_eq!(args.min_sample_duration, Some(8));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.config.is_none());
    }
}
