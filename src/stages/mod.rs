pub mod stage0_normalize;
pub mod stage1_extract;
pub mod stage2_cluster;
pub mod stage3_aggregate;
pub mod stage4_render;

pub use stage0_normalize::*;
pub use stage1_extract::*;
pub use stage2_cluster::*;
pub use stage3_aggregate::*;
pub use stage4_render::*;

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

use crate::extract::AnalysisContext;
use crate::io::{Corpus, RunManifest};
use crate::models::{
    AuditExamples, Chunk, ClusteringStats, FileFailure, FileMetricRecord, ParticipantSummary,
    TopicCatalogEntry,
};

/// Everything one pipeline run produces
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub records: Vec<FileMetricRecord>,
    pub participants: Vec<ParticipantSummary>,
    pub catalog: Vec<TopicCatalogEntry>,
    pub examples: AuditExamples,
    /// Unreadable, empty and speakerless files, sorted by filename
    pub failures: Vec<FileFailure>,
    pub clustering: ClusteringStats,
    pub files_seen: usize,
}

impl PipelineOutput {
    pub fn manifest(&self, run_id: Uuid) -> RunManifest {
        RunManifest {
            run_id: run_id.to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            files_seen: self.files_seen,
            records_written: self.records.len(),
            participants: self.participants.len(),
            failures: self.failures.clone(),
            clustering: self.clustering.clone(),
        }
    }
}

/// Run stages 1-3 over a loaded corpus
///
/// Per-file extraction and corpus-wide clustering run concurrently; the
/// aggregation waits on both. Failures are collected, never raised.
pub async fn run_pipeline(
    corpus: Corpus,
    chunks: Vec<Chunk>,
    context: Arc<AnalysisContext>,
) -> PipelineOutput {
    let files_seen = corpus.files.len() + corpus.failures.len();
    info!("Processing {} files, {} chunks", files_seen, chunks.len());

    let (extracted, topics) = tokio::join!(
        execute_stage1(corpus.files, Arc::clone(&context)),
        execute_stage2(chunks, context.topics.clone()),
    );

    let aggregated = execute_stage3(
        &extracted.analyses,
        &topics,
        context.topics.top_n,
        &context.examples,
    );

    let mut failures = corpus.failures;
    failures.extend(extracted.failures);
    failures.sort_by(|a, b| a.filename.cmp(&b.filename));

    info!(
        "Complete: {} records, {} skipped files",
        aggregated.records.len(),
        failures.len()
    );

    PipelineOutput {
        records: aggregated.records,
        participants: aggregated.participants,
        catalog: topics.catalog(),
        examples: aggregated.examples,
        failures,
        clustering: topics.stats,
        files_seen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::io::{load_corpus, SourceFile};
    use crate::models::{Condition, SessionType, SpeakerRole};

    fn context() -> Arc<AnalysisContext> {
        let mut config = PipelineConfig::default();
        config.conditions.insert("vr002".to_string(), Condition::Vr);
        config.topics.k = 2;
        config.topics.min_df = 1;
        Arc::new(config.compile().unwrap())
    }

    fn corpus(files: &[(&str, &str)]) -> Corpus {
        Corpus {
            files: files
                .iter()
                .map(|(filename, text)| SourceFile {
                    filename: filename.to_string(),
                    text: text.to_string(),
                })
                .collect(),
            failures: Vec::new(),
        }
    }

    fn chunk(filename: &str, index: usize, text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            chunk_id: format!("{}-{}", filename, index),
            filename: filename.to_string(),
            chunk_index: index,
            text: text.to_string(),
            embedding: Some(embedding),
        }
    }

    #[tokio::test]
    async fn test_single_file_scenario() {
        let corpus = corpus(&[(
            "vr002_EP4.txt",
            "vr002_c: He's tired [pause]. vr002_p: I feel comfortable now.",
        )]);

        let output = run_pipeline(corpus, Vec::new(), context()).await;

        assert_eq!(output.records.len(), 1);
        assert!(output.failures.is_empty());
        let record = &output.records[0];
        assert_eq!(record.patient_id, "vr002");
        assert_eq!(record.week_label, "Week 4");
        assert_eq!(record.session_type, SessionType::Ep);
        assert_eq!(record.condition, Condition::Vr);
        assert_eq!(record.caregiver_turns, 1);
        assert_eq!(record.plwd_turns, 1);
        assert_eq!(record.pain_mentions, 1);
        assert_eq!(record.comfort_mentions, 1);
        assert_eq!(record.caregiver_nonverbal, 1);
        assert_eq!(record.plwd_nonverbal, 0);
        assert_eq!(record.cue_counts.get("pause"), Some(&1));

        let pause = &output.examples.nonverbal["pause"][0];
        assert_eq!(pause.speaker, SpeakerRole::Caregiver);
        assert!(pause.known);
        assert_eq!(output.examples.lexicon["pain"][0].term, "tired");
        assert_eq!(output.examples.lexicon["comfort"][0].term, "comfortable");
    }

    #[tokio::test]
    async fn test_empty_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        for week in 1..=10 {
            let text = if week == 6 {
                String::new()
            } else {
                format!("vr002_c: How was week {}? vr002_p: It was nice.", week)
            };
            std::fs::write(dir.path().join(format!("vr002_EP{}.txt", week)), text).unwrap();
        }

        let corpus = load_corpus(dir.path()).unwrap();
        let output = run_pipeline(corpus, Vec::new(), context()).await;

        assert_eq!(output.files_seen, 10);
        assert_eq!(output.records.len(), 9);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].filename, "vr002_EP6.txt");
        assert!(output.records.iter().all(|r| r.filename != "vr002_EP6.txt"));
    }

    #[tokio::test]
    async fn test_topic_fields_join_on_filename() {
        let corpus = corpus(&[
            ("vr002_EP1.txt", "vr002_c: Tell me about the garden. vr002_p: Roses."),
            ("vr002_EP2.txt", "vr002_c: Any music today? vr002_p: Piano."),
        ]);
        let chunks = vec![
            chunk("vr002_EP1.txt", 0, "garden roses", vec![0.0, 0.0]),
            chunk("vr002_EP1.txt", 1, "piano music", vec![5.0, 5.0]),
            chunk("vr002_EP1.txt", 2, "garden tulips", vec![0.1, 0.0]),
            chunk("other.txt", 0, "piano concert", vec![5.1, 5.0]),
        ];

        let output = run_pipeline(corpus, chunks, context()).await;

        let ep1 = &output.records[0];
        assert_eq!(ep1.total_chunks, 3);
        assert_eq!(ep1.switch_count, 2);
        assert_eq!(ep1.top_topics.len(), 2);
        assert!((ep1.topic_share.values().sum::<f64>() - 1.0).abs() < 1e-9);

        let ep2 = &output.records[1];
        assert_eq!(ep2.total_chunks, 0);
        assert!(ep2.top_topics.is_empty());

        assert_eq!(output.catalog.len(), 2);
        assert_eq!(output.clustering.chunks_clustered, 4);
    }

    #[tokio::test]
    async fn test_reruns_are_byte_identical() {
        let files = [
            ("vr002_EP1.txt", "vr002_c: Um, how are you? vr002_p: I I am tired [sighs]."),
            ("vr002_ER2.txt", "vr002_c: Shall we dance? vr002_p: [laughs] Yes, lovely."),
        ];
        let chunks = || {
            vec![
                chunk("vr002_EP1.txt", 0, "how are you tired", vec![0.2, 0.1, 0.0]),
                chunk("vr002_EP1.txt", 1, "tired sighs", vec![0.1, 0.3, 0.0]),
                chunk("vr002_ER2.txt", 0, "shall we dance", vec![3.0, 2.9, 1.0]),
                chunk("vr002_ER2.txt", 1, "yes lovely dance", vec![3.1, 3.0, 0.9]),
            ]
        };

        let mut written = Vec::new();
        for _ in 0..2 {
            let output = run_pipeline(corpus(&files), chunks(), context()).await;
            let dir = tempfile::tempdir().unwrap();
            execute_stage4(
                &output,
                &output.manifest(Uuid::new_v4()),
                dir.path(),
                &Stage4Config::default(),
            )
            .unwrap();

            let read = |name: &str| std::fs::read(dir.path().join(name)).unwrap();
            written.push((read("records.json"), read("topics.json"), read("participants.json")));
        }

        assert_eq!(written[0], written[1]);
    }

    #[tokio::test]
    async fn test_render_writes_every_output() {
        let output = run_pipeline(
            corpus(&[("vr002_EP1.txt", "vr002_c: Hello. vr002_p: [looks at photo] Hi.")]),
            Vec::new(),
            context(),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let run_id = Uuid::new_v4();

        let result = execute_stage4(
            &output,
            &output.manifest(run_id),
            &dir.path().join("out"),
            &Stage4Config::default(),
        )
        .unwrap();

        for path in [
            &result.records_path,
            &result.participants_path,
            &result.topics_path,
            &result.examples_path,
            &result.manifest_path,
        ] {
            assert!(path.exists(), "{:?} missing", path);
        }
        assert!(result.summary_path.as_ref().is_some_and(|p| p.exists()));

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&result.manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["run_id"], run_id.to_string());
        assert_eq!(manifest["records_written"], 1);

        let cue = &output.examples.nonverbal["looks at photo"][0];
        assert!(!cue.known);
        assert_eq!(cue.speaker, SpeakerRole::Plwd);
    }
}
