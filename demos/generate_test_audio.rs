use hound::{WavSpec, WavWriter};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::f32::consts::PI;
use std::fs;
use std::path::Path;

const SAMPLE_RATE: u32 = 16000;
const CLEAN_SECONDS: f32 = 30.0;
const IR_SECONDS: f32 = 0.2;
const IR_CHANNELS: usize = 4;
const ZONES: [&str; 4] = ["zhujia", "fujia", "zhujiahoupai", "fujiahoupai"];

fn to_i16(x: f32) -> i16 {
    (x.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

fn write_channels(path: &Path, channels: &[Vec<f32>]) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);

    let mut writer = WavWriter::create(path, spec)?;
    for i in 0..frames {
        for channel in channels {
            writer.write_sample(to_i16(channel[i]))?;
        }
    }
    writer.finalize()?;
    Ok(())
}

fn sine(freq_hz: f32) -> Vec<f32> {
    let n = (CLEAN_SECONDS * SAMPLE_RATE as f32) as usize;
    (0..n)
        .map(|i| 0.2 * (2.0 * PI * freq_hz * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// Exponentially decaying noise tail behind a unit direct path, delayed and
/// attenuated a little more on every channel
fn decaying_ir(rng: &mut Pcg64) -> Vec<Vec<f32>> {
    let n = (IR_SECONDS * SAMPLE_RATE as f32) as usize;
    (0..IR_CHANNELS)
        .map(|c| {
            let delay = c * 8;
            let scale = 1.0 - 0.1 * c as f32;
            (0..n)
                .map(|i| {
                    if i < delay {
                        return 0.0;
                    }
                    let t = (i - delay) as f32 / SAMPLE_RATE as f32;
                    let direct = if i == delay { 0.8 } else { 0.0 };
                    let noise = rng.random_range(-1.0f32..1.0) * 0.1;
                    (direct + noise * (-6.0 * t).exp()) * scale
                })
                .collect()
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base = Path::new("demos/data");
    let mut rng = Pcg64::seed_from_u64(0);

    write_channels(&base.join("clean/clean1.wav"), &[sine(440.0)])?;
    write_channels(&base.join("clean/clean2.wav"), &[sine(660.0)])?;

    for zone in ZONES {
        for name in ["ir1.wav", "ir2.wav"] {
            write_channels(&base.join("ir").join(zone).join(name), &decaying_ir(&mut rng))?;
        }
    }

    println!("Generated clean and impulse response WAVs under {}", base.display());
    println!("{} zones, {} channels per impulse response", ZONES.len(), IR_CHANNELS);

    Ok(())
}
