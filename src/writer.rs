//! Corpus layout on disk

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::save_audio;
use crate::generator::GeneratedSample;
use crate::{Error, Result};

/// Writes generated samples to `<root>/<zone>/<sample index>.wav`
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
    sample_rate: u32,
}

impl OutputWriter {
    pub fn new<P: Into<PathBuf>>(root: P, sample_rate: u32) -> Self {
        Self {
            root: root.into(),
            sample_rate,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination of one sample; depends only on zone and index
    pub fn path_for(&self, zone: &str, sample_index: usize) -> PathBuf {
        self.root.join(zone).join(format!("{}.wav", sample_index))
    }

    /// Write one sample, replacing any file already at its path
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputWrite`] with the target path if the directory
    /// or file cannot be written. Nothing is retried.
    pub fn write(&self, sample: &GeneratedSample) -> Result<PathBuf> {
        let path = self.path_for(&sample.zone, sample.sample_index);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::OutputWrite {
                path: path.clone(),
                source: hound::Error::IoError(e),
            })?;
        }
        save_audio(&path, &sample.samples, self.sample_rate)?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}
