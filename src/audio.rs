//! Audio utilities for the corpus generator
//!
//! This module provides functions for reading and writing WAV files as
//! channel-major buffers, where each row of the buffer is one channel.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use ndarray::{Array1, Array2, Axis};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Decoded audio with its sample rate
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Samples shaped `(channels, frames)`
    pub samples: Array2<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn channels(&self) -> usize {
        self.samples.nrows()
    }

    pub fn frames(&self) -> usize {
        self.samples.ncols()
    }
}

/// Header information of a WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
}

fn read_error(path: &Path, e: hound::Error) -> Error {
    match e {
        hound::Error::Unsupported
        | hound::Error::FormatError(_)
        | hound::Error::InvalidSampleFormat
        | hound::Error::TooWide => Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        other => Error::Read {
            path: path.to_path_buf(),
            source: other,
        },
    }
}

fn open(path: &Path) -> Result<WavReader<std::io::BufReader<std::fs::File>>> {
    WavReader::open(path).map_err(|e| read_error(path, e))
}

/// Decode up to `limit` interleaved samples as `f32` in `[-1.0, 1.0)`
///
/// Integer PCM is scaled by `2^(bits-1)`; 32-bit float is passed through.
fn decode<R: Read>(reader: &mut WavReader<R>, path: &Path, limit: usize) -> Result<Vec<f32>> {
    let spec = reader.spec();
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f64;
            reader
                .samples::<i32>()
                .take(limit)
                .map(|s| {
                    s.map(|v| (v as f64 * scale) as f32)
                        .map_err(|e| read_error(path, e))
                })
                .collect()
        }
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .take(limit)
            .map(|s| s.map_err(|e| read_error(path, e)))
            .collect(),
        (format, bits) => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!("{}-bit {:?} samples", bits, format),
        }),
    }
}

fn deinterleave(mut data: Vec<f32>, channels: usize) -> Result<Array2<f32>> {
    let frames = data.len() / channels;
    data.truncate(frames * channels);
    let interleaved = Array2::from_shape_vec((frames, channels), data)
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    Ok(interleaved.reversed_axes().as_standard_layout().into_owned())
}

/// Read only the header of a WAV file
pub fn probe_audio<P: AsRef<Path>>(path: P) -> Result<AudioInfo> {
    let path = path.as_ref();
    let reader = open(path)?;
    let spec = reader.spec();
    Ok(AudioInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels as usize,
        frames: reader.duration() as usize,
    })
}

/// Read audio from a WAV file
///
/// # Arguments
///
/// * `path` - Path to the WAV file
///
/// # Returns
///
/// All channels as a `(channels, frames)` buffer together with the sample rate
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be opened or read
/// * The file is not a PCM or 32-bit float WAV file
pub fn read_audio<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let mut reader = open(path)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: "zero channels".into(),
        });
    }

    let data = decode(&mut reader, path, usize::MAX)?;
    Ok(AudioBuffer {
        samples: deinterleave(data, spec.channels as usize)?,
        sample_rate: spec.sample_rate,
    })
}

/// Read `frames` frames starting at frame `start`
///
/// # Errors
///
/// Returns an error if the requested range extends past the end of the file,
/// in addition to the errors of [`read_audio`].
pub fn read_window<P: AsRef<Path>>(path: P, start: usize, frames: usize) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let mut reader = open(path)?;
    let spec = reader.spec();
    let total = reader.duration() as usize;
    if start + frames > total {
        return Err(Error::InvalidInput(format!(
            "Window {}..{} exceeds {} frames in {}",
            start,
            start + frames,
            total,
            path.display()
        )));
    }

    let start_frame = u32::try_from(start)
        .map_err(|_| Error::InvalidInput(format!("Frame offset {} out of range", start)))?;
    reader
        .seek(start_frame)
        .map_err(|e| read_error(path, hound::Error::IoError(e)))?;

    let channels = spec.channels as usize;
    let data = decode(&mut reader, path, frames * channels)?;
    Ok(AudioBuffer {
        samples: deinterleave(data, channels)?,
        sample_rate: spec.sample_rate,
    })
}

/// Average all channels into one
///
/// # Errors
///
/// Returns an error if the buffer has no channels
pub fn downmix(samples: &Array2<f32>) -> Result<Array1<f32>> {
    if samples.nrows() == 1 {
        return Ok(samples.row(0).to_owned());
    }
    samples
        .mean_axis(Axis(0))
        .ok_or_else(|| Error::InvalidInput("Cannot downmix a buffer without channels".into()))
}

/// Convert a float sample to 16-bit PCM, clipping to full scale
pub fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Save audio to a 16-bit PCM WAV file
///
/// # Arguments
///
/// * `path` - Path to save the WAV file
/// * `samples` - Audio data shaped `(channels, frames)`
/// * `sample_rate` - Sample rate of the audio
///
/// # Errors
///
/// Returns [`Error::OutputWrite`] carrying `path` if:
/// * The file cannot be created
/// * The audio data cannot be written
/// * The WAV file cannot be finalized
pub fn save_audio<P: AsRef<Path>>(path: P, samples: &Array2<f32>, sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let write_error = |source: hound::Error| Error::OutputWrite {
        path: PathBuf::from(path),
        source,
    };

    let channels = u16::try_from(samples.nrows())
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| {
            Error::InvalidInput(format!("Cannot write {} channels", samples.nrows()))
        })?;

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_error)?;
    // The transposed view iterates frame by frame, which is WAV interleaving.
    for &sample in samples.t().iter() {
        writer.write_sample(to_pcm16(sample)).map_err(write_error)?;
    }
    writer.finalize().map_err(write_error)?;

    Ok(())
}
