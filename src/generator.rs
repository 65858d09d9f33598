//! Corpus generation
//!
//! Ties the zone catalog, clean pool, planner, convolver, level policy and
//! writer into one run. Everything that can be rejected without producing
//! audio (configuration, zone layout, pools, sample rates) is checked when the
//! generator is built, so a failing run never leaves a partial corpus behind
//! for those reasons.

use log::info;
use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::catalog::ZoneCatalog;
use crate::clean::CleanPool;
use crate::config::GenerationConfig;
use crate::convolve::Convolver;
use crate::normalize::LevelPolicy;
use crate::planner::{PlanEntry, SamplePlanner};
use crate::writer::OutputWriter;
use crate::{Error, Result};

/// File name of the optional run manifest inside the output directory
pub const MANIFEST_FILE: &str = "manifest.jsonl";

fn manifest_error(path: &Path, e: std::io::Error) -> Error {
    Error::OutputWrite {
        path: path.to_path_buf(),
        source: hound::Error::IoError(e),
    }
}

/// One rendered output before it is written
#[derive(Debug, Clone)]
pub struct GeneratedSample {
    pub zone: String,
    pub sample_index: usize,
    /// Samples shaped `(zone channels, clip frames)`
    pub samples: Array2<f32>,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub files_written: usize,
    pub per_zone: BTreeMap<String, usize>,
}

/// What was written for one plan entry
struct Written {
    entry: PlanEntry,
    path: PathBuf,
    gain: f32,
}

#[derive(Serialize)]
struct ManifestRecord<'a> {
    zone: &'a str,
    sample_index: usize,
    path: &'a Path,
    clean: &'a Path,
    ir: &'a Path,
    gain: f32,
}

/// Generates a reverberant corpus from clean clips and per-zone impulse responses
///
/// # Example
///
/// ```no_run
/// use zone_reverb::{CorpusGenerator, GenerationConfig};
///
/// let config = GenerationConfig {
///     num_samples: 100,
///     zones: 4,
///     random_seed: 1,
///     ..GenerationConfig::new("data/ir", "data/clean", "data/out")
/// };
/// let report = CorpusGenerator::new(config)?.generate()?;
/// println!("wrote {} files", report.files_written);
/// # Ok::<(), zone_reverb::Error>(())
/// ```
pub struct CorpusGenerator {
    config: GenerationConfig,
    catalog: ZoneCatalog,
    pool: CleanPool,
    convolver: Convolver,
    level: LevelPolicy,
    writer: OutputWriter,
}

impl CorpusGenerator {
    /// Load impulse responses and clean clips for `config`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The configuration is invalid
    /// * The IR root has a different number of zones than configured
    /// * A zone is empty or mixes channel counts
    /// * No clean clips are found
    /// * Any input cannot be read or has a sample rate other than the configured one
    pub fn new(config: GenerationConfig) -> Result<Self> {
        config.validate()?;
        let catalog = ZoneCatalog::load(&config.ir_root_dir, config.zones, config.sample_rate)?;
        let pool = CleanPool::load(
            &config.clean_root_dir,
            config.sample_rate,
            config.max_clean_frames(),
        )?;
        Self::from_parts(config, catalog, pool)
    }

    /// Build a generator from an already loaded catalog and pool
    pub fn from_parts(config: GenerationConfig, catalog: ZoneCatalog, pool: CleanPool) -> Result<Self> {
        config.validate()?;
        if catalog.len() != config.zones {
            return Err(Error::ZoneConfig {
                expected: config.zones,
                found: catalog.len(),
            });
        }
        if pool.is_empty() {
            return Err(Error::EmptyPool("clean clip pool is empty".into()));
        }

        let convolver = Convolver::new(config.sample_rate, config.alignment);
        let level = config.level_policy();
        let writer = OutputWriter::new(&config.output_dir, config.sample_rate);
        Ok(Self {
            config,
            catalog,
            pool,
            convolver,
            level,
            writer,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ZoneCatalog {
        &self.catalog
    }

    pub fn pool(&self) -> &CleanPool {
        &self.pool
    }

    /// The planner for this run; every call replays the same plan
    pub fn planner(&self) -> Result<SamplePlanner> {
        let ir_pools = self.catalog.zones().iter().map(|z| z.irs().len()).collect();
        SamplePlanner::new(
            self.config.random_seed,
            self.config.num_samples,
            self.pool.len(),
            ir_pools,
        )
    }

    /// Convolve and level one plan entry, returning the sample and its gain
    pub fn render(&self, entry: &PlanEntry) -> Result<(GeneratedSample, f32)> {
        let zone = self.catalog.zones().get(entry.zone).ok_or_else(|| {
            Error::InvalidInput(format!("Plan refers to unknown zone #{}", entry.zone))
        })?;
        let clip = self.pool.get(entry.clip).ok_or_else(|| {
            Error::InvalidInput(format!("Plan refers to unknown clip #{}", entry.clip))
        })?;
        let ir = zone.irs().get(entry.ir).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Plan refers to unknown impulse response #{} of zone '{}'",
                entry.ir,
                zone.name()
            ))
        })?;

        let mut samples = self.convolver.convolve(clip, ir)?;
        let gain = self.level.apply(&mut samples);
        Ok((
            GeneratedSample {
                zone: zone.name().to_string(),
                sample_index: entry.sample_index,
                samples,
            },
            gain,
        ))
    }

    fn produce(&self, entry: &PlanEntry) -> Result<Written> {
        let (sample, gain) = self.render(entry)?;
        let path = self.writer.write(&sample)?;
        Ok(Written {
            entry: *entry,
            path,
            gain,
        })
    }

    /// Run the whole plan and write the corpus
    ///
    /// Files already written stay in place if a later unit fails.
    pub fn generate(&self) -> Result<GenerationReport> {
        let planner = self.planner()?;
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| Error::OutputWrite {
            path: output_dir.clone(),
            source: hound::Error::IoError(e),
        })?;

        info!(
            "Generating {} samples across {} zones into {}",
            planner.len(),
            self.catalog.len(),
            output_dir.display()
        );

        let manifest_path = output_dir.join(MANIFEST_FILE);
        let mut manifest = if self.config.write_manifest {
            let file =
                File::create(&manifest_path).map_err(|e| manifest_error(&manifest_path, e))?;
            Some(BufWriter::new(file))
        } else {
            None
        };
        let mut report = GenerationReport::default();

        if self.config.parallel {
            // Draws stay sequential; only rendering and writing fan out.
            let entries: Vec<PlanEntry> = planner.entries().collect();
            let written = entries
                .par_iter()
                .map(|entry| self.produce(entry))
                .collect::<Result<Vec<_>>>()?;
            for w in &written {
                self.record(&mut report, manifest.as_mut(), w)?;
            }
        } else {
            for entry in planner.entries() {
                let w = self.produce(&entry)?;
                self.record(&mut report, manifest.as_mut(), &w)?;
            }
        }

        if let Some(mut manifest) = manifest {
            manifest
                .flush()
                .map_err(|e| manifest_error(&manifest_path, e))?;
        }

        info!("Wrote {} files", report.files_written);
        Ok(report)
    }

    fn record(
        &self,
        report: &mut GenerationReport,
        manifest: Option<&mut BufWriter<File>>,
        written: &Written,
    ) -> Result<()> {
        let zone = &self.catalog.zones()[written.entry.zone];
        report.files_written += 1;
        *report.per_zone.entry(zone.name().to_string()).or_insert(0) += 1;

        if let Some(out) = manifest {
            let record = ManifestRecord {
                zone: zone.name(),
                sample_index: written.entry.sample_index,
                path: &written.path,
                clean: &self.pool.clips()[written.entry.clip].path,
                ir: &zone.irs()[written.entry.ir].path,
                gain: written.gain,
            };
            let path = self.config.output_dir.join(MANIFEST_FILE);
            serde_json::to_writer(&mut *out, &record)
                .map_err(|e| manifest_error(&path, e.into()))?;
            writeln!(out).map_err(|e| manifest_error(&path, e))?;
        }
        Ok(())
    }
}
