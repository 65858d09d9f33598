//! Per-channel convolution of clean clips with multi-channel impulse responses
//!
//! Every output channel is a window of exactly `N` samples cut from the full
//! linear convolution (`N + M - 1` samples) of the clean clip with one impulse
//! response channel. Where that window starts is set by [`AlignmentPolicy`];
//! the default starts it at the direct-path peak of each channel so the output
//! stays sample-aligned with the dry clip.

use ndarray::{Array2, ArrayView1};
use ndarray_stats::QuantileExt;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::ImpulseResponse;
use crate::clean::CleanClip;
use crate::{Error, Result};

/// Above this many multiply-adds per channel, convolution goes through the FFT
const DIRECT_LIMIT: usize = 1 << 18;

/// Where the `N`-sample output window starts inside the full convolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// At the index of the largest-magnitude sample of each IR channel
    #[default]
    Peak,
    /// At sample zero, keeping the IR's propagation delay
    Causal,
    /// At the same fixed offset for every channel
    Fixed(usize),
}

impl AlignmentPolicy {
    /// Window start for one impulse response channel
    pub fn offset(&self, channel: ArrayView1<f32>) -> Result<usize> {
        match *self {
            AlignmentPolicy::Peak => channel.mapv(f32::abs).argmax().map_err(|e| {
                Error::InvalidInput(format!("Cannot locate impulse response peak: {}", e))
            }),
            AlignmentPolicy::Causal => Ok(0),
            AlignmentPolicy::Fixed(offset) => Ok(offset),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvolutionMethod {
    /// Direct for short inputs, FFT otherwise
    #[default]
    Auto,
    Direct,
    Fft,
}

impl ConvolutionMethod {
    fn resolve(self, n: usize, m: usize) -> ConvolutionMethod {
        match self {
            ConvolutionMethod::Auto if n.saturating_mul(m) <= DIRECT_LIMIT => {
                ConvolutionMethod::Direct
            }
            ConvolutionMethod::Auto => ConvolutionMethod::Fft,
            method => method,
        }
    }
}

/// Convolution engine bound to the run's sample rate
#[derive(Debug, Clone)]
pub struct Convolver {
    sample_rate: u32,
    alignment: AlignmentPolicy,
    method: ConvolutionMethod,
}

impl Convolver {
    pub fn new(sample_rate: u32, alignment: AlignmentPolicy) -> Self {
        Self {
            sample_rate,
            alignment,
            method: ConvolutionMethod::Auto,
        }
    }

    /// Force a convolution method instead of choosing by input size
    pub fn with_method(mut self, method: ConvolutionMethod) -> Self {
        self.method = method;
        self
    }

    /// Convolve a clean clip with every channel of an impulse response
    ///
    /// # Returns
    ///
    /// A `(channels, N)` buffer where `channels` is the IR channel count and
    /// `N` the clip length
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The clip or IR sample rate differs from the run's sample rate
    /// * The clip or IR is empty
    pub fn convolve(&self, clip: &CleanClip, ir: &ImpulseResponse) -> Result<Array2<f32>> {
        for (path, found) in [
            (&clip.path, clip.sample_rate),
            (&ir.path, ir.sample_rate),
        ] {
            if found != self.sample_rate {
                return Err(Error::SampleRateMismatch {
                    path: path.clone(),
                    expected: self.sample_rate,
                    found,
                });
            }
        }
        self.convolve_samples(clip.samples.view(), &ir.samples)
    }

    /// Convolve raw samples with a `(channels, M)` kernel
    pub fn convolve_samples(&self, clean: ArrayView1<f32>, ir: &Array2<f32>) -> Result<Array2<f32>> {
        let n = clean.len();
        let m = ir.ncols();
        if n == 0 {
            return Err(Error::InvalidInput("Clean signal is empty".into()));
        }
        if m == 0 || ir.nrows() == 0 {
            return Err(Error::InvalidInput("Impulse response is empty".into()));
        }

        let x: Vec<f32> = clean.to_vec();
        let mut out = Array2::<f32>::zeros((ir.nrows(), n));
        let mut spectral = None;

        for (c, channel) in ir.outer_iter().enumerate() {
            let offset = self.alignment.offset(channel)?;
            let h: Vec<f32> = channel.to_vec();
            let window = match self.method.resolve(n, m) {
                ConvolutionMethod::Fft => spectral
                    .get_or_insert_with(|| SpectralConvolver::new(&x, m))
                    .window(&h, offset),
                _ => direct_window(&x, &h, offset),
            };
            out.row_mut(c).assign(&ArrayView1::from(&window));
        }

        Ok(out)
    }
}

/// `full[offset..offset + x.len()]` of the linear convolution, zero past its end
fn direct_window(x: &[f32], h: &[f32], offset: usize) -> Vec<f32> {
    let n = x.len();
    let m = h.len();
    let full_len = n + m - 1;
    let mut out = vec![0.0f32; n];

    for (t, y) in out.iter_mut().enumerate() {
        let j = offset.saturating_add(t);
        if j >= full_len {
            break;
        }
        let lo = j.saturating_sub(m - 1);
        let hi = j.min(n - 1);
        let acc: f64 = (lo..=hi).map(|i| x[i] as f64 * h[j - i] as f64).sum();
        *y = acc as f32;
    }
    out
}

/// FFT convolution that reuses the clean signal's spectrum across channels
struct SpectralConvolver {
    n: usize,
    full_len: usize,
    spectrum: Vec<Complex<f64>>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl SpectralConvolver {
    fn new(x: &[f32], m: usize) -> Self {
        let n = x.len();
        let full_len = n + m - 1;
        let size = full_len.next_power_of_two();

        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);

        let mut spectrum = padded(x, size);
        forward.process(&mut spectrum);

        Self {
            n,
            full_len,
            spectrum,
            forward,
            inverse,
        }
    }

    fn window(&self, h: &[f32], offset: usize) -> Vec<f32> {
        if offset >= self.full_len {
            return vec![0.0; self.n];
        }
        let size = self.spectrum.len();
        let mut buf = padded(h, size);
        self.forward.process(&mut buf);
        for (b, s) in buf.iter_mut().zip(&self.spectrum) {
            *b *= *s;
        }
        self.inverse.process(&mut buf);

        let scale = 1.0 / size as f64;
        (0..self.n)
            .map(|t| offset.saturating_add(t))
            .map(|j| {
                if j < self.full_len {
                    (buf[j].re * scale) as f32
                } else {
                    0.0
                }
            })
            .collect()
    }
}

fn padded(samples: &[f32], size: usize) -> Vec<Complex<f64>> {
    let mut buf = vec![Complex::new(0.0, 0.0); size];
    for (b, &s) in buf.iter_mut().zip(samples) {
        b.re = s as f64;
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use std::path::PathBuf;

    fn tone(n: usize) -> Array1<f32> {
        Array1::from_shape_fn(n, |i| (i as f32 * 0.37).sin() * 0.5 + (i as f32 * 0.011).cos() * 0.2)
    }

    fn decaying_ir(channels: usize, m: usize) -> Array2<f32> {
        Array2::from_shape_fn((channels, m), |(c, j)| {
            let delay = c * 3;
            if j == delay {
                0.9
            } else if j > delay {
                0.3 * (-(j as f32) / 20.0).exp() * ((j * 7 + c) as f32).sin()
            } else {
                0.0
            }
        })
    }

    #[test]
    fn output_length_matches_clean_length() {
        let convolver = Convolver::new(16000, AlignmentPolicy::Peak);
        for &n in &[1usize, 2, 17, 300] {
            for &m in &[1usize, 5, 64, 400] {
                let channels = 1 + (m % 3);
                let ir = decaying_ir(channels, m);
                let out = convolver.convolve_samples(tone(n).view(), &ir).unwrap();
                assert_eq!(out.dim(), (channels, n), "n={} m={}", n, m);
            }
        }
    }

    #[test]
    fn peak_alignment_cancels_direct_path_delay() {
        let clean = tone(50);
        let mut ir = Array2::<f32>::zeros((2, 16));
        ir[[0, 0]] = 1.0;
        ir[[1, 7]] = -1.0;

        let out = Convolver::new(16000, AlignmentPolicy::Peak)
            .convolve_samples(clean.view(), &ir)
            .unwrap();
        for t in 0..50 {
            assert!((out[[0, t]] - clean[t]).abs() < 1e-6);
            assert!((out[[1, t]] + clean[t]).abs() < 1e-6);
        }
    }

    #[test]
    fn causal_alignment_keeps_delay() {
        let clean = tone(20);
        let mut ir = Array2::<f32>::zeros((1, 8));
        ir[[0, 4]] = 1.0;

        let out = Convolver::new(16000, AlignmentPolicy::Causal)
            .convolve_samples(clean.view(), &ir)
            .unwrap();
        assert!(out.row(0).iter().take(4).all(|&s| s == 0.0));
        for t in 4..20 {
            assert!((out[[0, t]] - clean[t - 4]).abs() < 1e-6);
        }
    }

    #[test]
    fn fixed_offset_past_the_end_pads_with_zeros() {
        let clean = array![1.0f32, 1.0, 1.0];
        let ir = array![[1.0f32, 1.0]];
        // Full convolution is [1, 2, 2, 1].
        let out = Convolver::new(16000, AlignmentPolicy::Fixed(2))
            .convolve_samples(clean.view(), &ir)
            .unwrap();
        assert_eq!(out, array![[2.0, 1.0, 0.0]]);

        let out = Convolver::new(16000, AlignmentPolicy::Fixed(100))
            .convolve_samples(clean.view(), &ir)
            .unwrap();
        assert_eq!(out, array![[0.0, 0.0, 0.0]]);
    }

    #[test]
    fn huge_fixed_offset_is_silent_for_both_methods() {
        let clean = array![1.0f32, 1.0, 1.0];
        let ir = array![[1.0f32, 1.0]];
        for method in [ConvolutionMethod::Direct, ConvolutionMethod::Fft] {
            let out = Convolver::new(16000, AlignmentPolicy::Fixed(usize::MAX - 1))
                .with_method(method)
                .convolve_samples(clean.view(), &ir)
                .unwrap();
            assert_eq!(out, array![[0.0, 0.0, 0.0]], "{:?}", method);
        }
    }

    #[test]
    fn convolve_rejects_foreign_sample_rates() {
        let clip = CleanClip {
            path: PathBuf::from("clean.wav"),
            samples: tone(32),
            sample_rate: 16000,
            original_frames: 32,
        };
        let ir = ImpulseResponse {
            path: PathBuf::from("ir.wav"),
            samples: decaying_ir(2, 8),
            sample_rate: 48000,
        };
        let convolver = Convolver::new(16000, AlignmentPolicy::Peak);
        match convolver.convolve(&clip, &ir) {
            Err(Error::SampleRateMismatch { path, expected, found }) => {
                assert_eq!(path, PathBuf::from("ir.wav"));
                assert_eq!((expected, found), (16000, 48000));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let clip = CleanClip {
            sample_rate: 8000,
            ..clip
        };
        assert!(matches!(
            convolver.convolve(&clip, &ir),
            Err(Error::SampleRateMismatch { found: 8000, .. })
        ));
        let ir = ImpulseResponse {
            sample_rate: 16000,
            ..ir
        };
        let clip = CleanClip {
            sample_rate: 16000,
            ..clip
        };
        assert_eq!(convolver.convolve(&clip, &ir).unwrap().dim(), (2, 32));
    }

    #[test]
    fn fft_matches_direct() {
        let clean = tone(1000);
        let ir = decaying_ir(3, 333);
        for policy in [AlignmentPolicy::Peak, AlignmentPolicy::Causal, AlignmentPolicy::Fixed(900)] {
            let direct = Convolver::new(16000, policy)
                .with_method(ConvolutionMethod::Direct)
                .convolve_samples(clean.view(), &ir)
                .unwrap();
            let fft = Convolver::new(16000, policy)
                .with_method(ConvolutionMethod::Fft)
                .convolve_samples(clean.view(), &ir)
                .unwrap();
            for (a, b) in direct.iter().zip(fft.iter()) {
                assert!((a - b).abs() < 1e-5, "{:?}: {} vs {}", policy, a, b);
            }
        }
    }

    #[test]
    fn convolution_is_deterministic() {
        let clean = tone(5000);
        let ir = decaying_ir(4, 200);
        let convolver = Convolver::new(16000, AlignmentPolicy::Peak);
        let a = convolver.convolve_samples(clean.view(), &ir).unwrap();
        let b = convolver.convolve_samples(clean.view(), &ir).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let convolver = Convolver::new(16000, AlignmentPolicy::Peak);
        let empty = Array1::<f32>::zeros(0);
        assert!(convolver.convolve_samples(empty.view(), &decaying_ir(1, 4)).is_err());
        let no_taps = Array2::<f32>::zeros((2, 0));
        assert!(convolver.convolve_samples(tone(4).view(), &no_taps).is_err());
    }
}
