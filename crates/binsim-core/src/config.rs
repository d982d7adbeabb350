//! Session configuration
//!
//! The configuration file is a list of `key value` lines:
//!
//! ```text
//! soundfile signals/speech.wav
//! blockSize 256
//! filterSize 16384
//! filterList brirs/filter_list.txt
//! enableCrossfading True
//! maxChannels 2
//! ```
//!
//! Unknown keys are reported and ignored so newer files keep loading.
//! Everything is resolved once at startup; the resulting [`BinSimConfig`] is
//! immutable for the whole session and handed to constructors explicitly.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Immutable session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinSimConfig {
    /// Sound file(s) to play, `#`-separated for a playlist
    pub soundfile: String,
    /// Samples per channel per processing block
    pub block_size: usize,
    /// Impulse response length in samples
    pub filter_size: usize,
    /// Filter catalog file
    pub filter_list: PathBuf,
    /// Crossfade between filters on a swap
    pub enable_crossfading: bool,
    /// Apply headphone equalization after mixing
    pub use_headphone_filter: bool,
    /// Output gain applied after the channel-count scaling
    pub loudness_factor: f64,
    /// Number of convolvers (maximum input channels)
    pub max_channels: usize,
    /// Session sample rate in Hz
    pub sampling_rate: u32,
    /// Crossfade length in blocks
    pub crossfade_blocks: usize,
    /// Restart the sound file playlist when it ends
    pub loop_sound: bool,
    /// Address the control listener binds to
    pub osc_host: String,
    /// Port the control listener binds to
    pub osc_port: u16,
}

impl Default for BinSimConfig {
    fn default() -> Self {
        Self {
            soundfile: String::new(),
            block_size: 256,
            filter_size: 16384,
            filter_list: PathBuf::from("brirs/filter_list.txt"),
            enable_crossfading: false,
            use_headphone_filter: false,
            loudness_factor: 1.0,
            max_channels: 8,
            sampling_rate: 44100,
            crossfade_blocks: 1,
            loop_sound: false,
            osc_host: "127.0.0.1".to_string(),
            osc_port: 10000,
        }
    }
}

impl BinSimConfig {
    /// Read and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::parse(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text on top of the defaults
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let mut config = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (line, ""),
            };

            config.apply(line_no, key, value)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, line: usize, key: &str, value: &str) -> ConfigResult<()> {
        let known = matches!(
            key,
            "soundfile"
                | "blockSize"
                | "filterSize"
                | "filterList"
                | "enableCrossfading"
                | "useHeadphoneFilter"
                | "loudnessFactor"
                | "maxChannels"
                | "samplingRate"
                | "crossfadeBlocks"
                | "loopSound"
                | "oscHost"
                | "oscPort"
        );
        if !known {
            log::warn!("Line {}: entry '{}' is unknown, ignoring", line, key);
            return Ok(());
        }
        if value.is_empty() {
            return Err(ConfigError::MissingValue {
                line,
                key: key.to_string(),
            });
        }

        match key {
            "soundfile" => self.soundfile = value.to_string(),
            "blockSize" => self.block_size = parse_value(line, key, value)?,
            "filterSize" => self.filter_size = parse_value(line, key, value)?,
            "filterList" => self.filter_list = PathBuf::from(value),
            "enableCrossfading" => self.enable_crossfading = parse_bool(line, key, value)?,
            "useHeadphoneFilter" => self.use_headphone_filter = parse_bool(line, key, value)?,
            "loudnessFactor" => self.loudness_factor = parse_value(line, key, value)?,
            "maxChannels" => self.max_channels = parse_value(line, key, value)?,
            "samplingRate" => self.sampling_rate = parse_value(line, key, value)?,
            "crossfadeBlocks" => self.crossfade_blocks = parse_value(line, key, value)?,
            "loopSound" => self.loop_sound = parse_bool(line, key, value)?,
            "oscHost" => self.osc_host = value.to_string(),
            "oscPort" => self.osc_port = parse_value(line, key, value)?,
            _ => unreachable!("key list checked above"),
        }
        Ok(())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidParam("blockSize must be > 0".into()));
        }
        if self.filter_size == 0 {
            return Err(ConfigError::InvalidParam("filterSize must be > 0".into()));
        }
        if self.max_channels == 0 {
            return Err(ConfigError::InvalidParam("maxChannels must be > 0".into()));
        }
        if self.sampling_rate == 0 {
            return Err(ConfigError::InvalidParam("samplingRate must be > 0".into()));
        }
        if self.crossfade_blocks == 0 {
            return Err(ConfigError::InvalidParam(
                "crossfadeBlocks must be > 0".into(),
            ));
        }
        if !self.loudness_factor.is_finite() {
            return Err(ConfigError::InvalidParam(format!(
                "loudnessFactor must be finite, got {}",
                self.loudness_factor
            )));
        }
        Ok(())
    }

    /// Sound files of the initial playlist
    pub fn sound_files(&self) -> Vec<PathBuf> {
        split_playlist(&self.soundfile)
    }

    /// Partitions per impulse response
    pub fn partition_count(&self) -> usize {
        crate::partition_count(self.filter_size, self.block_size)
    }

    /// Time budget of one block
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sampling_rate as f64)
    }
}

/// Split a `#`-separated playlist into paths
pub fn split_playlist(list: &str) -> Vec<PathBuf> {
    list.split('#')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn parse_value<T: FromStr>(line: usize, key: &str, value: &str) -> ConfigResult<T> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(line: usize, key: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            line,
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BinSimConfig::default();
        assert_eq!(config.block_size, 256);
        assert_eq!(config.filter_size, 16384);
        assert_eq!(config.max_channels, 8);
        assert_eq!(config.sampling_rate, 44100);
        assert!(!config.enable_crossfading);
        assert_eq!(config.partition_count(), 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_overrides() {
        let text = "\
soundfile signals/a.wav#signals/b.wav
blockSize 512
filterSize 1024
filterList brirs/list.txt
enableCrossfading True
useHeadphoneFilter false
loudnessFactor 0.5
maxChannels 2
samplingRate 48000
";
        let config = BinSimConfig::parse(text).unwrap();
        assert_eq!(config.block_size, 512);
        assert_eq!(config.filter_size, 1024);
        assert_eq!(config.filter_list, PathBuf::from("brirs/list.txt"));
        assert!(config.enable_crossfading);
        assert!(!config.use_headphone_filter);
        assert!((config.loudness_factor - 0.5).abs() < 1e-12);
        assert_eq!(config.max_channels, 2);
        assert_eq!(config.sampling_rate, 48000);
        assert_eq!(
            config.sound_files(),
            vec![PathBuf::from("signals/a.wav"), PathBuf::from("signals/b.wav")]
        );
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = BinSimConfig::parse("futureOption 42\nblockSize 128\n").unwrap();
        assert_eq!(config.block_size, 128);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let config = BinSimConfig::parse("# comment\n\n   \nmaxChannels 3\n").unwrap();
        assert_eq!(config.max_channels, 3);
    }

    #[test]
    fn test_invalid_value_names_line() {
        let err = BinSimConfig::parse("blockSize 256\nfilterSize lots\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { line, key, value } => {
                assert_eq!(line, 2);
                assert_eq!(key, "filterSize");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_value() {
        let err = BinSimConfig::parse("blockSize\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue { line: 1, .. }));
    }

    #[test]
    fn test_bad_bool() {
        assert!(BinSimConfig::parse("enableCrossfading maybe\n").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_block() {
        assert!(matches!(
            BinSimConfig::parse("blockSize 0\n"),
            Err(ConfigError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_block_duration() {
        let config = BinSimConfig {
            block_size: 441,
            sampling_rate: 44100,
            ..Default::default()
        };
        assert!((config.block_duration().as_secs_f64() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&BinSimConfig::default()).unwrap();
        assert!(json.contains("\"blockSize\":256"));
        assert!(json.contains("\"enableCrossfading\":false"));
    }
}
