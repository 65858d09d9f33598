//! WAV fixtures synthesised at test time, so no binary assets live in the repo.
#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Write channel-major float samples as 16-bit PCM
pub fn write_wav(path: &Path, channels: &[Vec<f32>], sample_rate: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let mut writer = WavWriter::create(path, spec).unwrap();
    for t in 0..frames {
        for ch in channels {
            let v = (ch[t].clamp(-1.0, 1.0) * 32767.0).round() as i16;
            writer.write_sample(v).unwrap();
        }
    }
    writer.finalize().unwrap();
}

pub fn sine(freq_hz: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
    let n = (seconds * sample_rate as f32) as usize;
    (0..n)
        .map(|i| 0.2 * (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Exponentially decaying IR with a per-channel direct-path delay
pub fn decaying_ir(channels: usize, len: usize, variant: usize) -> Vec<Vec<f32>> {
    (0..channels)
        .map(|c| {
            let delay = c * 8;
            let scale = 1.0 - 0.1 * c as f32;
            (0..len)
                .map(|j| {
                    if j < delay {
                        0.0
                    } else if j == delay {
                        0.8 * scale
                    } else {
                        let t = (j - delay) as f32;
                        let noise = ((j * 31 + c * 7 + variant * 13) as f32 * 0.7).sin();
                        0.1 * scale * noise * (-t / 200.0).exp()
                    }
                })
                .collect()
        })
        .collect()
}

/// One zone of the fixture tree: name, IR channel count, number of IR files
pub struct ZoneSpec<'a> {
    pub name: &'a str,
    pub channels: usize,
    pub irs: usize,
}

/// Lay out `<root>/ir/<zone>/ir<k>.wav` and `<root>/clean/clean<k>.wav`
pub fn build_fixture(
    root: &Path,
    zones: &[ZoneSpec],
    clean_seconds: &[f32],
    sample_rate: u32,
) -> (PathBuf, PathBuf) {
    let ir_root = root.join("ir");
    let clean_root = root.join("clean");
    for zone in zones {
        for k in 0..zone.irs {
            let path = ir_root.join(zone.name).join(format!("ir{}.wav", k + 1));
            write_wav(&path, &decaying_ir(zone.channels, 400, k), sample_rate);
        }
    }
    for (k, &seconds) in clean_seconds.iter().enumerate() {
        let path = clean_root.join(format!("clean{}.wav", k + 1));
        let freq = 220.0 * (k + 2) as f32;
        write_wav(&path, &[sine(freq, seconds, sample_rate)], sample_rate);
    }
    fs::create_dir_all(&ir_root).unwrap();
    fs::create_dir_all(&clean_root).unwrap();
    (ir_root, clean_root)
}

/// Every WAV file under `dir`, relative to it, sorted
pub fn wav_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "wav"))
        .map(|e| e.path().strip_prefix(dir).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}
