//! Output level policies

use log::warn;
use ndarray::Array2;

/// Peak level targeted by [`LevelPolicy::Peak`], just below full scale
pub const DEFAULT_PEAK_TARGET: f32 = 0.98;

/// How a generated buffer is leveled before encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelPolicy {
    /// One gain for all channels so the global peak equals `target`
    Peak { target: f32 },
    /// Leave samples untouched; clipping happens only at PCM encoding
    PassThrough,
}

impl Default for LevelPolicy {
    fn default() -> Self {
        LevelPolicy::Peak {
            target: DEFAULT_PEAK_TARGET,
        }
    }
}

/// Largest absolute sample across all channels
pub fn peak(samples: &Array2<f32>) -> f32 {
    samples.fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

impl LevelPolicy {
    /// Level `samples` in place and return the gain that was applied
    ///
    /// A silent buffer is left as zeros with a gain of 1.0.
    pub fn apply(&self, samples: &mut Array2<f32>) -> f32 {
        match *self {
            LevelPolicy::PassThrough => 1.0,
            LevelPolicy::Peak { target } => {
                let peak = peak(samples);
                if peak == 0.0 {
                    warn!("Silent buffer, skipping peak normalization");
                    return 1.0;
                }
                let gain = target / peak;
                samples.mapv_inplace(|s| s * gain);
                gain
            }
        }
    }
}
