//! Runtime configuration with defaults and RON persistence.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Playback and recording thresholds.
    pub knobs: Knobs,
    /// Reader frame loop settings.
    pub replay: ReplayConfig,
    /// Position store settings.
    pub store: StoreConfig,
    /// Demo scenario settings.
    pub demo: DemoConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Tunable thresholds shared by the playback clock and the batch collector.
///
/// The rate constants and buffer ages were chosen empirically; they are
/// configuration, not protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Knobs {
    /// Below this buffer depth (ms) the clock slows down.
    pub min_server_buffer_age_soft: f64,
    /// Above this buffer depth (ms) the clock speeds up.
    pub max_server_buffer_age_soft: f64,
    /// The replay head never falls further than this (ms) behind the
    /// freshest known server time.
    pub max_server_buffer_age_hard: f64,
    /// Raw samples closer than this (ms) to the last kept one are dropped.
    pub min_sample_duration: u64,
    /// Period (ms) between writer flushes.
    pub flush_frequency: u64,
    /// Clock rate while the buffer is shallow.
    pub slow_rate: f64,
    /// Clock rate while the buffer is deep.
    pub fast_rate: f64,
}

/// Reader-side frame loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplayConfig {
    /// Interval between replay frames in milliseconds.
    pub frame_interval_ms: u64,
}

/// Position store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Reject submitted operations whose version number goes backwards.
    pub enforce_version_order: bool,
}

/// Demo scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Zone the simulated cursors join.
    pub zone: String,
    /// Number of replaying readers.
    pub readers: u32,
    /// How long the scenario runs, in seconds.
    pub duration_secs: u64,
    /// Interval between simulated pointer events in milliseconds.
    pub pointer_interval_ms: u64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g., "debug", "info,glide_store=trace").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for Knobs {
    fn default() -> Self {
        Self {
            min_server_buffer_age_soft: 250.0,
            max_server_buffer_age_soft: 1250.0,
            max_server_buffer_age_hard: 1500.0,
            min_sample_duration: 4,
            flush_frequency: 1000,
            slow_rate: 0.8,
            fast_rate: 1.2,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            zone: "lobby".to_string(),
            readers: 2,
            duration_secs: 10,
            pointer_interval_ms: 2,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Knobs {
    /// Writer flush period.
    pub fn flush_period(&self) -> Duration {
        Duration::from_millis(self.flush_frequency.max(1))
    }

    /// Check that the thresholds are ordered and the rates are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ages = [
            self.min_server_buffer_age_soft,
            self.max_server_buffer_age_soft,
            self.max_server_buffer_age_hard,
        ];
        if ages.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(ConfigError::InvalidKnobs(
                "buffer ages must be finite and non-negative".to_string(),
            ));
        }
        if self.min_server_buffer_age_soft > self.max_server_buffer_age_soft {
            return Err(ConfigError::InvalidKnobs(format!(
                "min soft buffer age {} exceeds max soft buffer age {}",
                self.min_server_buffer_age_soft, self.max_server_buffer_age_soft
            )));
        }
        if self.max_server_buffer_age_soft > self.max_server_buffer_age_hard {
            return Err(ConfigError::InvalidKnobs(format!(
                "soft buffer age {} exceeds hard cap {}",
                self.max_server_buffer_age_soft, self.max_server_buffer_age_hard
            )));
        }
        if !(self.slow_rate > 0.0 && self.slow_rate <= 1.0 && self.fast_rate >= 1.0) {
            return Err(ConfigError::InvalidKnobs(format!(
                "rates must satisfy 0 < slow ({}) <= 1 <= fast ({})",
                self.slow_rate, self.fast_rate
            )));
        }
        if self.flush_frequency == 0 {
            return Err(ConfigError::InvalidKnobs(
                "flush frequency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl ReplayConfig {
    /// Interval between replay frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::Write)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::Write)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config: Config = ron::from_str(&contents).map_err(ConfigError::Parse)?;
        config.knobs.validate()?;
        Ok(config)
    }
}
