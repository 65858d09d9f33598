mod common;

use common::{sine, wav_files, write_wav};
use std::error::Error;
use std::fs;
use tempfile::TempDir;
use zone_reverb::{generate_noise_segments, Error as GenError, NoiseSegmentsConfig};

fn noise_config(work: &TempDir, seed: u64, out: &str) -> NoiseSegmentsConfig {
    NoiseSegmentsConfig {
        input_dir: work.path().join("noise"),
        output_dir: work.path().join(out),
        duration_seconds: 0.5,
        total_segments: 12,
        random_seed: seed,
    }
}

fn write_sources(work: &TempDir) {
    let dir = work.path().join("noise");
    write_wav(&dir.join("road.wav"), &[sine(97.0, 3.0, 8000)], 8000);
    write_wav(
        &dir.join("cabin").join("fan.wav"),
        &[sine(311.0, 2.0, 8000), sine(53.0, 2.0, 8000)],
        8000,
    );
    // Too short to hold one segment.
    write_wav(&dir.join("click.wav"), &[sine(1000.0, 0.1, 8000)], 8000);
}

#[test]
fn extracts_fixed_length_segments() -> Result<(), Box<dyn Error>> {
    let work = TempDir::new()?;
    write_sources(&work);
    let config = noise_config(&work, 42, "segments");

    let report = generate_noise_segments(&config)?;
    assert_eq!(report.segments_written, 12);
    assert_eq!(report.eligible_sources, 2);

    let files = wav_files(&config.output_dir);
    assert_eq!(files.len(), 12);
    assert_eq!(files[0].to_str(), Some("noise_00.wav"));
    for rel in files {
        let reader = hound::WavReader::open(config.output_dir.join(rel))?;
        assert_eq!(reader.duration(), 4000);
        assert_eq!(reader.spec().sample_rate, 8000);
        assert!(matches!(reader.spec().channels, 1 | 2));
    }
    Ok(())
}

#[test]
fn same_seed_reproduces_segments() -> Result<(), Box<dyn Error>> {
    let work = TempDir::new()?;
    write_sources(&work);
    let first = noise_config(&work, 7, "a");
    let second = noise_config(&work, 7, "b");

    generate_noise_segments(&first)?;
    generate_noise_segments(&second)?;

    for rel in wav_files(&first.output_dir) {
        assert_eq!(
            fs::read(first.output_dir.join(&rel))?,
            fs::read(second.output_dir.join(&rel))?
        );
    }
    Ok(())
}

#[test]
fn no_long_enough_source_is_an_empty_pool() -> Result<(), Box<dyn Error>> {
    let work = TempDir::new()?;
    write_sources(&work);
    let config = NoiseSegmentsConfig {
        duration_seconds: 10.0,
        ..noise_config(&work, 1, "none")
    };

    assert!(matches!(
        generate_noise_segments(&config),
        Err(GenError::EmptyPool(_))
    ));
    assert!(!config.output_dir.exists());
    Ok(())
}
