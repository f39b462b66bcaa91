use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::io::{write_json, RecordView, RunManifest, SummaryReport};

use super::PipelineOutput;

/// Configuration for Stage 4 rendering
#[derive(Debug, Clone)]
pub struct Stage4Config {
    /// Whether to write the plain-text summary
    pub generate_summary: bool,
}

impl Default for Stage4Config {
    fn default() -> Self {
        Self {
            generate_summary: true,
        }
    }
}

/// Result of Stage 4 rendering
#[derive(Debug)]
pub struct Stage4Result {
    pub records_path: PathBuf,
    pub participants_path: PathBuf,
    pub topics_path: PathBuf,
    pub examples_path: PathBuf,
    pub manifest_path: PathBuf,
    pub summary_path: Option<PathBuf>,
}

/// Execute Stage 4: write every output into one directory
///
/// Produces:
/// 1. `records.json`: one record per file with derived rates
/// 2. `participants.json`: per-participant roll-ups
/// 3. `topics.json`: the topic catalog
/// 4. `examples.json`: audit examples
/// 5. `run.json`: run id, timestamp, failures and clustering stats
/// 6. `summary.txt` (optional): plain-text report
pub fn execute_stage4(
    output: &PipelineOutput,
    manifest: &RunManifest,
    dir: &Path,
    config: &Stage4Config,
) -> Result<Stage4Result> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let result = Stage4Result {
        records_path: dir.join("records.json"),
        participants_path: dir.join("participants.json"),
        topics_path: dir.join("topics.json"),
        examples_path: dir.join("examples.json"),
        manifest_path: dir.join("run.json"),
        summary_path: config.generate_summary.then(|| dir.join("summary.txt")),
    };

    let records: Vec<RecordView> = output.records.iter().map(RecordView::new).collect();
    write_json(&result.records_path, &records)?;
    write_json(&result.participants_path, &output.participants)?;
    write_json(&result.topics_path, &output.catalog)?;
    write_json(&result.examples_path, &output.examples)?;
    write_json(&result.manifest_path, manifest)?;
    info!("Wrote {} records to {:?}", records.len(), result.records_path);

    if let Some(path) = &result.summary_path {
        let report = SummaryReport {
            records: &output.records,
            participants: &output.participants,
            catalog: &output.catalog,
            failures: &output.failures,
        };
        report.write_file(path)?;
        info!("Summary written to {:?}", path);
    }

    Ok(result)
}
