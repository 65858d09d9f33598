//! Generation run configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::convolve::AlignmentPolicy;
use crate::normalize::{LevelPolicy, DEFAULT_PEAK_TARGET};
use crate::{Error, Result};

fn default_sample_rate() -> u32 {
    16000
}

fn default_num_samples() -> usize {
    1
}

fn default_zones() -> usize {
    4
}

fn default_normalize() -> bool {
    true
}

fn default_max_clean_seconds() -> f64 {
    30.0
}

/// Settings for one corpus generation run
///
/// Built once per run and never changed afterwards; the generator keeps its
/// own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Root directory holding one subdirectory of impulse responses per zone
    pub ir_root_dir: PathBuf,
    /// File or directory holding clean recordings
    pub clean_root_dir: PathBuf,
    /// Corpus destination; receives one subdirectory per zone
    pub output_dir: PathBuf,
    /// Sample rate every input must have, in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Number of samples generated for each zone
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Expected number of zone directories under `ir_root_dir`
    #[serde(default = "default_zones")]
    pub zones: usize,
    /// Seed of the single random source behind every clip and IR draw
    #[serde(default)]
    pub random_seed: u64,
    /// Scale each output so its peak sits just below full scale
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    /// Clean clips longer than this are truncated
    #[serde(default = "default_max_clean_seconds")]
    pub max_clean_seconds: f64,
    /// Where each convolved channel's output window starts
    #[serde(default)]
    pub alignment: AlignmentPolicy,
    /// Render and write samples on the rayon thread pool
    #[serde(default)]
    pub parallel: bool,
    /// Write `manifest.jsonl` describing every generated file
    #[serde(default)]
    pub write_manifest: bool,
}

impl GenerationConfig {
    /// Create a configuration with default settings for the given directories
    pub fn new<P, Q, R>(ir_root_dir: P, clean_root_dir: Q, output_dir: R) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
        R: Into<PathBuf>,
    {
        Self {
            ir_root_dir: ir_root_dir.into(),
            clean_root_dir: clean_root_dir.into(),
            output_dir: output_dir.into(),
            sample_rate: default_sample_rate(),
            num_samples: default_num_samples(),
            zones: default_zones(),
            random_seed: 0,
            normalize: default_normalize(),
            max_clean_seconds: default_max_clean_seconds(),
            alignment: AlignmentPolicy::default(),
            parallel: false,
            write_manifest: false,
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Check the settings that do not need any file access
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.zones == 0 {
            return Err(Error::InvalidConfig("zones must be at least 1".into()));
        }
        if !self.max_clean_seconds.is_finite() || self.max_clean_seconds <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "max_clean_seconds must be a positive number, got {}",
                self.max_clean_seconds
            )));
        }
        if self.max_clean_frames() == 0 {
            return Err(Error::InvalidConfig(format!(
                "max_clean_seconds {} is shorter than one sample at {} Hz",
                self.max_clean_seconds, self.sample_rate
            )));
        }
        Ok(())
    }

    /// Longest clean clip in frames at the configured sample rate
    pub fn max_clean_frames(&self) -> usize {
        (self.max_clean_seconds * self.sample_rate as f64).floor() as usize
    }

    pub fn level_policy(&self) -> LevelPolicy {
        if self.normalize {
            LevelPolicy::Peak {
                target: DEFAULT_PEAK_TARGET,
            }
        } else {
            LevelPolicy::PassThrough
        }
    }
}
