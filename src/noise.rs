//! Fixed-length noise segment extraction
//!
//! Cuts a deterministic corpus of equally long clips out of a set of long
//! recordings. All random draws come from one `Pcg64` seeded with the
//! configured seed and are made up front, for segment `i` in order: the
//! source file first, then the start frame within it.

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::{probe_audio, read_window, save_audio, AudioInfo};
use crate::discovery::find_audio_files;
use crate::{Error, Result};

/// Settings for one noise extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseSegmentsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub duration_seconds: f64,
    pub total_segments: usize,
    #[serde(default)]
    pub random_seed: u64,
}

impl NoiseSegmentsConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "duration_seconds must be a positive number, got {}",
                self.duration_seconds
            )));
        }
        if self.total_segments == 0 {
            return Err(Error::InvalidConfig("total_segments must be at least 1".into()));
        }
        Ok(())
    }
}

/// Summary of a finished extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseReport {
    pub segments_written: usize,
    /// Number of source files long enough to draw from
    pub eligible_sources: usize,
}

struct Source {
    path: PathBuf,
    info: AudioInfo,
    segment_frames: usize,
}

struct Cut {
    source: usize,
    start: usize,
}

fn segment_frames(duration_seconds: f64, sample_rate: u32) -> usize {
    (duration_seconds * sample_rate as f64).round() as usize
}

fn num_width(mut value: usize) -> usize {
    let mut width = 1;
    while value >= 10 {
        value /= 10;
        width += 1;
    }
    width
}

/// Path of segment `index` in a corpus of `total` segments
pub fn segment_path(output_dir: &Path, index: usize, total: usize) -> PathBuf {
    let width = num_width(total.saturating_sub(1));
    output_dir.join(format!("noise_{:0width$}.wav", index, width = width))
}

/// Extract `total_segments` clips of `duration_seconds` each
///
/// Each segment keeps the sample rate and channel count of the file it was cut
/// from. Sources shorter than one segment are skipped.
///
/// # Errors
///
/// Returns an error if:
/// * The configuration is invalid
/// * No source file is long enough for one segment
/// * A source cannot be read or a segment cannot be written
pub fn generate_noise_segments(config: &NoiseSegmentsConfig) -> Result<NoiseReport> {
    config.validate()?;
    if !config.input_dir.exists() {
        return Err(Error::MissingDirectory(config.input_dir.clone()));
    }

    let mut sources = Vec::new();
    for path in find_audio_files(&config.input_dir) {
        let info = probe_audio(&path)?;
        let frames = segment_frames(config.duration_seconds, info.sample_rate);
        if frames == 0 || info.frames < frames {
            debug!("Skipping {}: shorter than one segment", path.display());
            continue;
        }
        sources.push(Source {
            path,
            info,
            segment_frames: frames,
        });
    }
    if sources.is_empty() {
        return Err(Error::EmptyPool(format!(
            "no recordings of at least {}s under {}",
            config.duration_seconds,
            config.input_dir.display()
        )));
    }

    let mut rng = Pcg64::seed_from_u64(config.random_seed);
    let cuts: Vec<Cut> = (0..config.total_segments)
        .map(|_| {
            let source = rng.random_range(0..sources.len());
            let src = &sources[source];
            let start = rng.random_range(0..=src.info.frames - src.segment_frames);
            Cut { source, start }
        })
        .collect();

    fs::create_dir_all(&config.output_dir).map_err(|e| Error::OutputWrite {
        path: config.output_dir.clone(),
        source: hound::Error::IoError(e),
    })?;
    info!(
        "Extracting {} segments of {}s from {} recordings",
        cuts.len(),
        config.duration_seconds,
        sources.len()
    );

    cuts.par_iter().enumerate().try_for_each(|(index, cut)| {
        let src = &sources[cut.source];
        let audio = read_window(&src.path, cut.start, src.segment_frames)?;
        let path = segment_path(&config.output_dir, index, config.total_segments);
        save_audio(&path, &audio.samples, audio.sample_rate)
    })?;

    info!("Wrote {} noise segments", cuts.len());
    Ok(NoiseReport {
        segments_written: cuts.len(),
        eligible_sources: sources.len(),
    })
}
