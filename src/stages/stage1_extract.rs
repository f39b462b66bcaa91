use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::FileError;
use crate::extract::{analyze_file, AnalysisContext, FileAnalysis};
use crate::io::SourceFile;
use crate::models::FileFailure;

use super::normalize;

/// Result of Stage 1 extraction
#[derive(Debug, Default)]
pub struct Stage1Result {
    /// Per-file partial results, sorted by filename
    pub analyses: Vec<FileAnalysis>,
    /// Files that produced no analysis, sorted by filename
    pub failures: Vec<FileFailure>,
}

/// Normalize and analyze one file
pub fn process_file(file: &SourceFile, context: &AnalysisContext) -> Result<FileAnalysis, FileError> {
    let transcript = normalize(&file.text, &file.filename, context)?;
    Ok(analyze_file(transcript, context))
}

/// Execute Stage 1: per-file normalization and extraction
///
/// Every file runs on the blocking pool with a shared read-only context.
/// Files share nothing else, so completion order is irrelevant; results
/// are sorted by filename once all workers are done.
pub async fn execute_stage1(files: Vec<SourceFile>, context: Arc<AnalysisContext>) -> Stage1Result {
    run_workers(files, context, process_file).await
}

async fn run_workers<F>(files: Vec<SourceFile>, context: Arc<AnalysisContext>, worker: F) -> Stage1Result
where
    F: Fn(&SourceFile, &AnalysisContext) -> Result<FileAnalysis, FileError> + Copy + Send + 'static,
{
    let file_count = files.len();
    // Files whose worker has not reported back; a panicked task loses its
    // filename, so whatever is left here after the join failed
    let mut pending: BTreeSet<String> = files.iter().map(|f| f.filename.clone()).collect();
    let mut tasks = JoinSet::new();

    for file in files {
        let context = Arc::clone(&context);
        tasks.spawn_blocking(move || {
            let outcome = worker(&file, &*context);
            (file.filename, outcome)
        });
    }

    let mut result = Stage1Result::default();
    let mut last_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((filename, Ok(analysis))) => {
                pending.remove(&filename);
                result.analyses.push(analysis);
            }
            Ok((filename, Err(e))) => {
                pending.remove(&filename);
                warn!("Skipping {}: {}", filename, e);
                result.failures.push(FileFailure {
                    filename,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                warn!("Extraction task failed: {}", e);
                last_error = Some(e.to_string());
            }
        }
    }

    let reason = last_error.unwrap_or_else(|| "task did not complete".to_string());
    for filename in pending {
        warn!("Skipping {}: no result from its worker", filename);
        result.failures.push(FileFailure {
            filename,
            reason: FileError::Worker(reason.clone()).to_string(),
        });
    }

    result
        .analyses
        .sort_by(|a, b| a.transcript.filename().cmp(b.transcript.filename()));
    result.failures.sort_by(|a, b| a.filename.cmp(&b.filename));

    info!(
        "Stage 1: {} of {} files analyzed, {} skipped",
        result.analyses.len(),
        file_count,
        result.failures.len()
    );
    result
}
