//! Pipeline configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LprError;

/// Thresholds and input resolution for one detector stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum objectness for a raw candidate to survive.
    pub conf_threshold: f32,
    /// IoU above which same-class candidates are merged.
    pub nms_threshold: f32,
    /// Side of the square detector input.
    pub input_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.5,
            nms_threshold: 0.5,
            input_size: 416,
        }
    }
}

/// Configuration for the whole recognition pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub plate: DetectorConfig,
    pub character: DetectorConfig,
    /// Intersection over the smaller box area above which a plate box is a duplicate.
    pub overlap_threshold: f32,
    /// Minimum glyph count for a reading to enter the frame result.
    pub min_confirmed_chars: usize,
    /// Number of non-empty frames buffered before a vote.
    pub window_len: usize,
    /// Number of left-to-right plate slots that receive votes.
    pub max_slots: usize,
    /// Consecutive frames without any tracked plate before the window is discarded.
    pub stale_reset_frames: u32,
    /// Feed the detectors a grey-replicated frame.
    pub desaturate: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            plate: DetectorConfig::default(),
            character: DetectorConfig::default(),
            overlap_threshold: 0.5,
            min_confirmed_chars: 7,
            window_len: 7,
            max_slots: 5,
            stale_reset_frames: 5,
            desaturate: true,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LprError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LprError> {
        for (name, stage) in [("plate", &self.plate), ("character", &self.character)] {
            if stage.input_size == 0 {
                return Err(LprError::Config(format!("{name}.input_size must be positive")));
            }
            if !unit_interval(stage.conf_threshold) || !unit_interval(stage.nms_threshold) {
                return Err(LprError::Config(format!(
                    "{name} thresholds must lie in [0, 1]"
                )));
            }
        }
        if !unit_interval(self.overlap_threshold) {
            return Err(LprError::Config("overlap_threshold must lie in [0, 1]".into()));
        }
        if self.window_len == 0 || self.max_slots == 0 || self.stale_reset_frames == 0 {
            return Err(LprError::Config(
                "window_len, max_slots and stale_reset_frames must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn unit_interval(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"plate": {"conf_threshold": 0.3}, "window_len": 9}"#)
                .unwrap();
        assert_eq!(config.plate.conf_threshold, 0.3);
        assert_eq!(config.plate.nms_threshold, 0.5);
        assert_eq!(config.window_len, 9);
        assert_eq!(config.max_slots, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = PipelineConfig::default();
        config.character.nms_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
