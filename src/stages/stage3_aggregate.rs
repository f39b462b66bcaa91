use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::config::ExampleConfig;
use crate::extract::{snippet, FileAnalysis};
use crate::models::{
    week_number, AuditExamples, Condition, CueExample, FileMetricRecord, FileTopicStats,
    LexiconExample, LexiconTag, ParticipantSummary, RepeatExample, SessionType, SpeakerRole,
};
use crate::topics::TopicModel;

/// Result of Stage 3 aggregation
#[derive(Debug, Default)]
pub struct Stage3Result {
    /// One record per analyzed file, sorted by filename
    pub records: Vec<FileMetricRecord>,
    /// Sorted by participant id
    pub participants: Vec<ParticipantSummary>,
    pub examples: AuditExamples,
}

/// Execute Stage 3: merge per-file partials and topic statistics
///
/// Joins on filename. A file with no clustered chunks still gets a
/// record, its topic fields left empty.
pub fn execute_stage3(
    analyses: &[FileAnalysis],
    topics: &TopicModel,
    top_n: usize,
    examples: &ExampleConfig,
) -> Stage3Result {
    let topic_stats = topics.per_file(top_n);
    let empty = FileTopicStats::default();

    let records: Vec<FileMetricRecord> = analyses
        .iter()
        .map(|analysis| {
            let filename = analysis.transcript.filename();
            let stats = topic_stats.get(filename).unwrap_or_else(|| {
                debug!("{}: no clustered chunks", filename);
                &empty
            });
            build_record(analysis, stats)
        })
        .collect();

    let participants = summarize_participants(&records);
    let mut audit = collect_examples(analyses, examples);
    audit.topics = topics.topic_examples(examples.per_category, examples.snippet_chars);
    audit.topic_switches = topics.switch_examples(examples.per_category, examples.snippet_chars);

    info!(
        "Stage 3: {} records, {} participants",
        records.len(),
        participants.len()
    );

    Stage3Result {
        records,
        participants,
        examples: audit,
    }
}

/// Flatten one file's partial results into its record
pub fn build_record(analysis: &FileAnalysis, topics: &FileTopicStats) -> FileMetricRecord {
    let metadata = &analysis.transcript.metadata;
    let counts = &analysis.patterns;
    let (caregiver, plwd, other) = (&counts.caregiver, &counts.plwd, &counts.other);

    FileMetricRecord {
        patient_id: metadata.participant_id.value.clone(),
        week_label: metadata.week_label.value.clone(),
        session_type: metadata.session_type.value,
        condition: metadata.condition.value,
        filename: metadata.filename.clone(),
        metadata_fallbacks: metadata.fallback_fields(),

        caregiver_turns: caregiver.turns,
        plwd_turns: plwd.turns,
        other_turns: other.turns,
        caregiver_words: caregiver.words,
        plwd_words: plwd.words,
        other_words: other.words,
        caregiver_sentences: caregiver.sentences,
        plwd_sentences: plwd.sentences,
        other_sentences: other.sentences,
        caregiver_questions: caregiver.questions,
        plwd_questions: plwd.questions,
        other_questions: other.questions,
        caregiver_disfluencies: caregiver.disfluencies,
        plwd_disfluencies: plwd.disfluencies,
        other_disfluencies: other.disfluencies,
        caregiver_repeats: caregiver.repeats,
        plwd_repeats: plwd.repeats,
        other_repeats: other.repeats,
        caregiver_nonverbal: analysis.cues.for_speaker(SpeakerRole::Caregiver),
        plwd_nonverbal: analysis.cues.for_speaker(SpeakerRole::Plwd),
        other_nonverbal: analysis.cues.for_speaker(SpeakerRole::Other),
        overlapping_speech: counts.total().overlaps,

        cue_counts: analysis.cues.histogram.clone(),
        repeats_by_word: counts.repeats_by_word.clone(),

        pain_mentions: analysis.lexicon.mentions(LexiconTag::Pain),
        comfort_mentions: analysis.lexicon.mentions(LexiconTag::Comfort),

        top_topics: topics.top_topics.clone(),
        topic_share: topics.topic_share.clone(),
        total_chunks: topics.total_chunks,
        switch_count: topics.switch_count,
        topic_switches: topics.switches.clone(),
    }
}

/// Group records by participant
pub fn summarize_participants(records: &[FileMetricRecord]) -> Vec<ParticipantSummary> {
    let mut grouped: BTreeMap<&str, Vec<&FileMetricRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.patient_id.as_str()).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|(patient_id, records)| {
            let weeks: BTreeSet<&str> = records.iter().map(|r| r.week_label.as_str()).collect();
            let week_numbers: Vec<u32> = records
                .iter()
                .filter_map(|r| week_number(&r.week_label))
                .collect();
            let condition = records
                .iter()
                .map(|r| r.condition)
                .find(|c| *c != Condition::Unknown)
                .unwrap_or_default();

            ParticipantSummary {
                patient_id: patient_id.to_string(),
                condition,
                total_sessions: records.len(),
                total_weeks: weeks.len(),
                ep_sessions: records.iter().filter(|r| r.session_type == SessionType::Ep).count(),
                er_sessions: records.iter().filter(|r| r.session_type == SessionType::Er).count(),
                total_turns: records.iter().map(|r| r.total_turns()).sum(),
                total_words: records.iter().map(|r| r.total_words()).sum(),
                total_questions: records.iter().map(|r| r.total_questions()).sum(),
                total_disfluencies: records.iter().map(|r| r.total_disfluencies()).sum(),
                total_nonverbal: records.iter().map(|r| r.total_nonverbal()).sum(),
                pain_mentions: records.iter().map(|r| r.pain_mentions).sum(),
                comfort_mentions: records.iter().map(|r| r.comfort_mentions).sum(),
                min_week: week_numbers.iter().min().copied(),
                max_week: week_numbers.iter().max().copied(),
                filenames: records.iter().map(|r| r.filename.clone()).collect(),
            }
        })
        .collect()
}

/// Lexicon, cue and repeat examples, capped per category
///
/// Analyses arrive in filename order, so ties keep file then utterance
/// order.
fn collect_examples(analyses: &[FileAnalysis], config: &ExampleConfig) -> AuditExamples {
    let mut audit = AuditExamples::default();

    for analysis in analyses {
        let filename = analysis.transcript.filename();
        let patient_id = &analysis.transcript.metadata.participant_id.value;

        for m in &analysis.lexicon.matches {
            audit
                .lexicon
                .entry(m.tag.to_string())
                .or_default()
                .push(LexiconExample {
                    filename: filename.to_string(),
                    patient_id: patient_id.clone(),
                    term: m.term.clone(),
                    weight: m.weight,
                    speaker: m.speaker,
                    context: snippet(&m.context, config.snippet_chars),
                });
        }

        for cue in &analysis.cues.cues {
            let examples = audit.nonverbal.entry(cue.label.label().to_string()).or_default();
            if examples.len() < config.per_category {
                examples.push(CueExample {
                    filename: filename.to_string(),
                    patient_id: patient_id.clone(),
                    raw: cue.annotation.raw.clone(),
                    known: cue.label.is_known(),
                    speaker: cue.annotation.speaker,
                });
            }
        }

        for repeat in &analysis.patterns.repeat_instances {
            audit.repeats.push(RepeatExample {
                filename: filename.to_string(),
                patient_id: patient_id.clone(),
                word: repeat.word.clone(),
                run_length: repeat.run_length,
                speaker: repeat.speaker,
                context: snippet(&repeat.context, config.snippet_chars),
            });
        }
    }

    for examples in audit.lexicon.values_mut() {
        examples.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        examples.truncate(config.per_category);
    }
    audit.repeats.sort_by(|a, b| b.run_length.cmp(&a.run_length));
    audit.repeats.truncate(config.per_category);

    audit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::extract::analyze_file;
    use crate::stages::normalize;

    fn analyses(files: &[(&str, &str)]) -> Vec<FileAnalysis> {
        let mut config = PipelineConfig::default();
        config.conditions.insert("vr002".to_string(), Condition::Vr);
        let context = config.compile().unwrap();
        files
            .iter()
            .map(|(name, text)| analyze_file(normalize(text, name, &context).unwrap(), &context))
            .collect()
    }

    #[test]
    fn test_record_without_topics_is_still_emitted() {
        let analyses = analyses(&[("vr002_EP4.txt", "vr002_c: He's tired [pause]. vr002_p: I feel comfortable now.")]);

        let result = execute_stage3(&analyses, &TopicModel::default(), 3, &ExampleConfig::default());

        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.pain_mentions, 1);
        assert_eq!(record.comfort_mentions, 1);
        assert!(record.top_topics.is_empty());
        assert_eq!(record.total_chunks, 0);
        assert_eq!(record.switch_count, 0);
    }

    #[test]
    fn test_other_speaker_counts_are_kept() {
        let analyses = analyses(&[(
            "vr002_EP2.txt",
            "vr002_c: Ready ready? researcher_1: okay okay okay. Um, shall we? vr002_p: Yes.",
        )]);

        let result = execute_stage3(&analyses, &TopicModel::default(), 3, &ExampleConfig::default());
        let record = &result.records[0];

        assert_eq!(record.other_turns, 1);
        assert_eq!(record.other_repeats, 2);
        assert_eq!(record.other_questions, 1);
        assert_eq!(record.other_disfluencies, 1);
        assert_eq!(record.other_sentences, 2);
        assert_eq!(record.caregiver_repeats, 1);
        assert_eq!(
            record.repeats_by_word.values().sum::<usize>(),
            record.caregiver_repeats + record.plwd_repeats + record.other_repeats
        );
        assert_eq!(record.total_repeats(), 1);
    }

    #[test]
    fn test_participant_summary() {
        let analyses = analyses(&[
            ("vr002_EP1.txt", "vr002_c: How are you? vr002_p: Tired."),
            ("vr002_EP4.txt", "vr002_c: Good morning. vr002_p: Morning."),
            ("vr002_ER4.txt", "vr002_c: Shall we? vr002_p: Yes please."),
            ("tb010_Baseline.txt", "tb010_c: Hello. tb010_p: Hi."),
        ]);

        let result = execute_stage3(&analyses, &TopicModel::default(), 3, &ExampleConfig::default());
        let vr002 = result
            .participants
            .iter()
            .find(|p| p.patient_id == "vr002")
            .unwrap();

        assert_eq!(result.participants.len(), 2);
        assert_eq!(vr002.condition, Condition::Vr);
        assert_eq!(vr002.total_sessions, 3);
        assert_eq!(vr002.total_weeks, 2);
        assert_eq!(vr002.ep_sessions, 2);
        assert_eq!(vr002.er_sessions, 1);
        assert_eq!(vr002.min_week, Some(1));
        assert_eq!(vr002.max_week, Some(4));
        assert_eq!(vr002.total_turns, 6);
        assert_eq!(vr002.pain_mentions, 1);

        let tb010 = &result.participants[0];
        assert_eq!(tb010.patient_id, "tb010");
        assert_eq!(tb010.condition, Condition::Unknown);
        assert_eq!(tb010.min_week, None);
    }

    #[test]
    fn test_examples_are_ranked_and_capped() {
        let analyses = analyses(&[(
            "vr002_EP1.txt",
            "vr002_p: I have back pain and I'm tired, tired [sigh] [sighs] [sighing].",
        )]);
        let config = ExampleConfig {
            per_category: 2,
            snippet_chars: 300,
        };

        let result = execute_stage3(&analyses, &TopicModel::default(), 3, &config);
        let pain = &result.examples.lexicon[LexiconTag::Pain.as_str()];

        assert_eq!(pain.len(), 2);
        assert_eq!(pain[0].term, "back pain");
        assert_eq!(result.examples.nonverbal["sighing"].len(), 2);
        assert_eq!(result.records[0].cue_counts["sighing"], 3);
        assert_eq!(result.examples.repeats.len(), 1);
    }
}
