//! Clean (dry) clip pool

use log::info;
use ndarray::{s, Array1};
use std::path::{Path, PathBuf};

use crate::audio::{downmix, read_audio};
use crate::discovery::find_audio_files;
use crate::{Error, Result};

/// A mono dry recording, truncated to the run's maximum length
#[derive(Debug, Clone)]
pub struct CleanClip {
    pub path: PathBuf,
    pub samples: Array1<f32>,
    pub sample_rate: u32,
    /// Length of the recording before truncation
    pub original_frames: usize,
}

impl CleanClip {
    /// Load a clip, down-mixing to mono and keeping at most `max_frames` frames
    pub fn load<P: AsRef<Path>>(path: P, max_frames: usize) -> Result<Self> {
        let path = path.as_ref();
        let audio = read_audio(path)?;
        if audio.frames() == 0 {
            return Err(Error::EmptyAudio(path.to_path_buf()));
        }

        let mono = downmix(&audio.samples)?;
        let original_frames = mono.len();
        let samples = if original_frames > max_frames {
            mono.slice(s![..max_frames]).to_owned()
        } else {
            mono
        };

        Ok(Self {
            path: path.to_path_buf(),
            samples,
            sample_rate: audio.sample_rate,
            original_frames,
        })
    }

    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    /// Duration after truncation, in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Every clean clip available to a run, in sorted path order
#[derive(Debug, Clone, Default)]
pub struct CleanPool {
    clips: Vec<CleanClip>,
}

impl CleanPool {
    /// Discover and load every clip under `root`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * `root` does not exist
    /// * No audio files are found
    /// * Any clip cannot be read or has a sample rate other than `sample_rate`
    pub fn load<P: AsRef<Path>>(root: P, sample_rate: u32, max_frames: usize) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(Error::MissingDirectory(root.to_path_buf()));
        }

        let files = find_audio_files(root);
        if files.is_empty() {
            return Err(Error::EmptyPool(format!(
                "no clean clips under {}",
                root.display()
            )));
        }

        let clips = files
            .iter()
            .map(|path| {
                let clip = CleanClip::load(path, max_frames)?;
                if clip.sample_rate != sample_rate {
                    return Err(Error::SampleRateMismatch {
                        path: clip.path,
                        expected: sample_rate,
                        found: clip.sample_rate,
                    });
                }
                Ok(clip)
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Loaded {} clean clips from {}", clips.len(), root.display());
        Ok(Self { clips })
    }

    pub fn from_clips(clips: Vec<CleanClip>) -> Self {
        Self { clips }
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CleanClip> {
        self.clips.get(index)
    }

    pub fn clips(&self) -> &[CleanClip] {
        &self.clips
    }
}
