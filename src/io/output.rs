use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{
    ClusteringStats, FileFailure, FileMetricRecord, ParticipantSummary, RecordRates,
    TopicCatalogEntry,
};

/// A record as written out: stored counts plus the rates derived from them
#[derive(Debug, Clone, Serialize)]
pub struct RecordView<'a> {
    #[serde(flatten)]
    pub record: &'a FileMetricRecord,
    pub rates: RecordRates,
}

impl<'a> RecordView<'a> {
    pub fn new(record: &'a FileMetricRecord) -> Self {
        Self {
            record,
            rates: record.rates(),
        }
    }
}

/// Run-level metadata; the only output that changes between identical runs
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub run_id: String,
    pub generated_at: String,
    pub files_seen: usize,
    pub records_written: usize,
    pub participants: usize,
    pub failures: Vec<FileFailure>,
    pub clustering: ClusteringStats,
}

/// Write any serializable value as pretty JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("Failed to write JSON")?;
    writer.flush()?;
    Ok(())
}

/// Plain-text report of a run
pub struct SummaryReport<'a> {
    pub records: &'a [FileMetricRecord],
    pub participants: &'a [ParticipantSummary],
    pub catalog: &'a [TopicCatalogEntry],
    pub failures: &'a [FileFailure],
}

impl<'a> SummaryReport<'a> {
    pub fn format(&self) -> String {
        let mut output = String::new();

        output.push_str("Participants\n============\n");
        for p in self.participants {
            let weeks = match (p.min_week, p.max_week) {
                (Some(min), Some(max)) => format!("weeks {}-{}", min, max),
                _ => "no numbered weeks".to_string(),
            };
            output.push_str(&format!(
                "{} ({}): {} sessions ({} EP, {} ER), {}, {} turns, {} words, pain {}, comfort {}\n",
                p.patient_id,
                p.condition,
                p.total_sessions,
                p.ep_sessions,
                p.er_sessions,
                weeks,
                p.total_turns,
                p.total_words,
                p.pain_mentions,
                p.comfort_mentions
            ));
        }

        output.push_str("\nFiles\n=====\n");
        for record in self.records {
            let rates = record.rates();
            output.push_str(&format!(
                "{} [{} / {} / {}]\n",
                record.filename, record.patient_id, record.week_label, record.session_type
            ));
            output.push_str(&format!(
                "  turns {}/{} (caregiver/plwd), words {}/{}, {:.1} words per turn\n",
                record.caregiver_turns,
                record.plwd_turns,
                record.caregiver_words,
                record.plwd_words,
                rates.words_per_turn
            ));
            output.push_str(&format!(
                "  questions {:.2}/100w, disfluencies {:.2}/100w, repeats {:.2}/100w, nonverbal {:.2}/100w\n",
                rates.question_rate_per_100_words,
                rates.disfluency_rate,
                rates.repeat_rate,
                rates.nonverbal_rate
            ));
            output.push_str(&format!(
                "  pain {}, comfort {}, topic switches {}\n",
                record.pain_mentions, record.comfort_mentions, record.switch_count
            ));
            if !record.metadata_fallbacks.is_empty() {
                output.push_str(&format!(
                    "  incomplete metadata: {}\n",
                    record.metadata_fallbacks.join(", ")
                ));
            }
        }

        if !self.catalog.is_empty() {
            output.push_str("\nTopics\n======\n");
            for topic in self.catalog {
                output.push_str(&format!("{:>3}. {} ({} chunks)\n", topic.id, topic.label, topic.size));
                let terms = wrap_text(&topic.top_terms.join(", "), 72);
                for line in terms.lines() {
                    output.push_str(&format!("     {}\n", line));
                }
            }
        }

        if !self.failures.is_empty() {
            output.push_str(&format!("\nSkipped files ({})\n", self.failures.len()));
            output.push_str("==============\n");
            for failure in self.failures {
                output.push_str(&format!("{}: {}\n", failure.filename, failure.reason));
            }
        }

        output
    }

    /// Write to a text file
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}

/// Wrap text at approximately the given width
fn wrap_text(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line_len + word_len + 1 > width && line_len > 0 {
            result.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            result.push(' ');
            line_len += 1;
        }
        result.push_str(word);
        line_len += word_len;
    }

    result
}
