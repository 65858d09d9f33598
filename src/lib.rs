//! Reproducible multi-zone reverberant corpus synthesis
//!
//! Convolves clean speech clips with impulse responses measured in several
//! acoustic zones and writes one multi-channel WAV per zone and sample index.
//! A single seed fixes every random draw, so a run can be repeated byte for
//! byte. A noise segment extractor cuts fixed-length clips from long
//! recordings.

pub mod audio;
pub mod catalog;
pub mod clean;
pub mod config;
pub mod convolve;
pub mod discovery;
pub mod generator;
pub mod noise;
pub mod normalize;
pub mod planner;
pub mod writer;

pub use catalog::{ImpulseResponse, Zone, ZoneCatalog};
pub use clean::{CleanClip, CleanPool};
pub use config::GenerationConfig;
pub use convolve::{AlignmentPolicy, ConvolutionMethod, Convolver};
pub use discovery::find_audio_files;
pub use generator::{CorpusGenerator, GeneratedSample, GenerationReport};
pub use noise::{generate_noise_segments, NoiseReport, NoiseSegmentsConfig};
pub use normalize::LevelPolicy;
pub use planner::{PlanEntry, SamplePlanner};
pub use writer::OutputWriter;

use std::path::PathBuf;

/// Error types for corpus generation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("Expected {expected} zones but found {found}")]
    ZoneConfig { expected: usize, found: usize },
    #[error("Zone '{0}' contains no impulse response files")]
    EmptyZone(String),
    #[error("Zone '{zone}': {path} has {found} channels, expected {expected}")]
    ChannelMismatch {
        zone: String,
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("Empty pool: {0}")]
    EmptyPool(String),
    #[error("{path} has sample rate {found}, expected {expected}")]
    SampleRateMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },
    #[error("Unsupported audio format in {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },
    #[error("Audio file contains no samples: {0}")]
    EmptyAudio(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the corpus generator
pub type Result<T> = std::result::Result<T, Error>;
