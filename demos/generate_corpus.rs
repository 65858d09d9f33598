use anyhow::Context;
use log::info;
use std::env;
use zone_reverb::{CorpusGenerator, GenerationConfig};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // A JSON config path may be passed; otherwise use the demo data tree
    let config = match env::args().nth(1) {
        Some(path) => GenerationConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config '{}'", path))?,
        None => GenerationConfig {
            num_samples: 3,
            zones: 4,
            random_seed: 1,
            normalize: false,
            ..GenerationConfig::new("demos/data/ir", "demos/data/clean", "demos/data/out")
        },
    };

    info!("Config: {:?}", config);
    let ir_root = config.ir_root_dir.clone();
    if !ir_root.exists() {
        println!("Impulse responses not found. Run 'cargo run --example generate_test_audio' first.");
        return Ok(());
    }

    let generator = CorpusGenerator::new(config).context("failed to prepare generation")?;
    let report = generator.generate().context("generation failed")?;

    println!("Wrote {} files:", report.files_written);
    for (zone, count) in &report.per_zone {
        println!("  {}: {}", zone, count);
    }
    println!("Outputs at {}", generator.config().output_dir.display());

    Ok(())
}
