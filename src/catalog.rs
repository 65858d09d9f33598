//! Zone catalog
//!
//! Indexes multi-channel impulse responses by zone. Each immediate
//! subdirectory of the IR root is one zone; every WAV file found below it
//! (recursively) is one impulse response of that zone.

use log::{debug, info};
use ndarray::Array2;
use std::path::{Path, PathBuf};

use crate::audio::read_audio;
use crate::discovery::{find_audio_files, list_zone_dirs};
use crate::{Error, Result};

/// A multi-channel filter kernel loaded from one WAV file
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    pub path: PathBuf,
    /// Taps shaped `(channels, length)`
    pub samples: Array2<f32>,
    pub sample_rate: u32,
}

impl ImpulseResponse {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let audio = read_audio(path)?;
        if audio.frames() == 0 {
            return Err(Error::EmptyAudio(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            samples: audio.samples,
            sample_rate: audio.sample_rate,
        })
    }

    pub fn channels(&self) -> usize {
        self.samples.nrows()
    }

    pub fn len(&self) -> usize {
        self.samples.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A named capture position and its impulse responses
///
/// All impulse responses of a zone share one channel count.
#[derive(Debug, Clone)]
pub struct Zone {
    name: String,
    irs: Vec<ImpulseResponse>,
    channels: usize,
}

impl Zone {
    /// Build a zone, checking that it is non-empty and channel-consistent
    pub fn new(name: impl Into<String>, irs: Vec<ImpulseResponse>) -> Result<Self> {
        let name = name.into();
        let channels = match irs.first() {
            Some(first) => first.channels(),
            None => return Err(Error::EmptyZone(name)),
        };
        if let Some(odd) = irs.iter().find(|ir| ir.channels() != channels) {
            return Err(Error::ChannelMismatch {
                zone: name,
                path: odd.path.clone(),
                expected: channels,
                found: odd.channels(),
            });
        }
        Ok(Self {
            name,
            irs,
            channels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn irs(&self) -> &[ImpulseResponse] {
        &self.irs
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Read-only mapping from zone name to its impulse responses, in name order
#[derive(Debug, Clone)]
pub struct ZoneCatalog {
    zones: Vec<Zone>,
}

impl ZoneCatalog {
    /// Load every zone under `ir_root`
    ///
    /// # Arguments
    ///
    /// * `ir_root` - Directory with one subdirectory per zone
    /// * `expected_zones` - Number of zones the run is configured for
    /// * `sample_rate` - Sample rate every impulse response must have
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * `ir_root` is not a directory
    /// * The number of zone directories differs from `expected_zones`
    /// * A zone has no impulse responses
    /// * Impulse responses within one zone have different channel counts
    /// * An impulse response cannot be read or has the wrong sample rate
    pub fn load<P: AsRef<Path>>(ir_root: P, expected_zones: usize, sample_rate: u32) -> Result<Self> {
        let ir_root = ir_root.as_ref();
        let dirs = list_zone_dirs(ir_root)?;
        if dirs.len() != expected_zones {
            return Err(Error::ZoneConfig {
                expected: expected_zones,
                found: dirs.len(),
            });
        }

        let mut zones = Vec::with_capacity(dirs.len());
        for (name, dir) in dirs {
            let irs = find_audio_files(&dir)
                .iter()
                .map(|path| {
                    let ir = ImpulseResponse::load(path)?;
                    if ir.sample_rate != sample_rate {
                        return Err(Error::SampleRateMismatch {
                            path: ir.path,
                            expected: sample_rate,
                            found: ir.sample_rate,
                        });
                    }
                    Ok(ir)
                })
                .collect::<Result<Vec<_>>>()?;

            let zone = Zone::new(name, irs)?;
            debug!(
                "Zone '{}': {} impulse responses, {} channels",
                zone.name(),
                zone.irs().len(),
                zone.channels()
            );
            zones.push(zone);
        }

        info!("Loaded {} zones from {}", zones.len(), ir_root.display());
        Ok(Self { zones })
    }

    /// Build a catalog from zones already in memory; they are sorted by name
    pub fn from_zones(mut zones: Vec<Zone>) -> Self {
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Self { zones }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
