pub mod config;
pub mod error;
pub mod extract;
pub mod io;
pub mod models;
pub mod stages;
pub mod topics;

pub use config::{PipelineConfig, TopicConfig};
pub use error::{ConfigError, FileError};
pub use extract::{analyze_file, AnalysisContext, FileAnalysis};
pub use io::{load_chunks, load_corpus, load_transcript, RecordView, RunManifest};
pub use models::{FileMetricRecord, ParticipantSummary};
pub use stages::{
    execute_stage4, normalize, process_file, run_pipeline, PipelineOutput, Stage4Config,
};
