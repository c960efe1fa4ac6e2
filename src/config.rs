use crate::audio::CaptureConfig;
use crate::capture::SchedulerConfig;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendSettings,
    pub audio: AudioSettings,
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the command backend.
    pub base_url: String,
    /// Per-request timeout; a hung call resolves to a transport error.
    pub request_timeout_secs: u64,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    /// Interval between interim transcription flushes.
    pub flush_interval_ms: u64,
    /// Directory for archived recordings; archiving is off when absent.
    pub archive_dir: Option<PathBuf>,
}

impl Config {
    /// Load defaults layered under an optional configuration file.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("backend.base_url", "http://localhost:8000")?
            .set_default("backend.request_timeout_secs", 30i64)?
            .set_default("audio.sample_rate", 16_000i64)?
            .set_default("audio.channels", 1i64)?
            .set_default("audio.chunk_duration_ms", 100i64)?
            .set_default("capture.flush_interval_ms", 1_000i64)?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            chunk_duration_ms: self.audio.chunk_duration_ms,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            flush_interval: Duration::from_millis(self.capture.flush_interval_ms),
            archive_dir: self.capture.archive_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = Config::load("config/does-not-exist").expect("defaults");
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.capture.flush_interval_ms, 1_000);
        assert!(config.capture.archive_dir.is_none());
    }

    #[test]
    fn derived_configs_carry_the_settings() {
        let config = Config::load("config/does-not-exist").expect("defaults");
        assert_eq!(config.capture_config().samples_per_chunk(), 1600);
        assert_eq!(
            config.scheduler_config().flush_interval,
            Duration::from_secs(1)
        );
    }
}
