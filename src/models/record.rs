use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Condition, SessionType};

/// The flattened, terminal per-file record
///
/// Only raw counts are stored. Every rate or ratio is derived on read by
/// [`FileMetricRecord::rates`], so a numerator never drifts from its
/// denominator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetricRecord {
    pub patient_id: String,
    pub week_label: String,
    pub session_type: SessionType,
    pub condition: Condition,
    pub filename: String,
    /// Metadata fields that fell back to `Unknown`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata_fallbacks: Vec<String>,

    pub caregiver_turns: usize,
    pub plwd_turns: usize,
    pub other_turns: usize,
    pub caregiver_words: usize,
    pub plwd_words: usize,
    pub other_words: usize,
    pub caregiver_sentences: usize,
    pub plwd_sentences: usize,
    pub other_sentences: usize,
    pub caregiver_questions: usize,
    pub plwd_questions: usize,
    pub other_questions: usize,
    pub caregiver_disfluencies: usize,
    pub plwd_disfluencies: usize,
    pub other_disfluencies: usize,
    pub caregiver_repeats: usize,
    pub plwd_repeats: usize,
    pub other_repeats: usize,
    pub caregiver_nonverbal: usize,
    pub plwd_nonverbal: usize,
    pub other_nonverbal: usize,
    pub overlapping_speech: usize,

    pub cue_counts: BTreeMap<String, usize>,
    /// Extra occurrences per word, over all speakers
    pub repeats_by_word: BTreeMap<String, usize>,

    pub pain_mentions: usize,
    pub comfort_mentions: usize,

    pub top_topics: Vec<usize>,
    pub topic_share: BTreeMap<usize, f64>,
    pub total_chunks: usize,
    pub switch_count: usize,
    pub topic_switches: BTreeMap<String, usize>,
}

/// `numerator / denominator`, or 0 when the denominator is 0
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// `numerator` per 100 of `denominator`, or 0 when the denominator is 0
pub fn per_hundred(numerator: usize, denominator: usize) -> f64 {
    ratio(numerator, denominator) * 100.0
}

/// Read-time view of every derived rate on a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordRates {
    pub words_per_turn: f64,
    pub caregiver_words_per_turn: f64,
    pub plwd_words_per_turn: f64,
    pub question_rate_per_100_words: f64,
    pub caregiver_question_rate: f64,
    pub plwd_question_rate: f64,
    pub disfluency_rate: f64,
    pub repeat_rate: f64,
    pub nonverbal_rate: f64,
    pub answer_ratio: f64,
    pub dominance_ratio: f64,
    pub turn_diff: i64,
    pub word_diff: i64,
}

// Totals cover the caregiver/PLWD dyad; `other_*` speakers are reported
// alongside but never enter a rate.
impl FileMetricRecord {
    pub fn total_turns(&self) -> usize {
        self.caregiver_turns + self.plwd_turns
    }

    pub fn total_words(&self) -> usize {
        self.caregiver_words + self.plwd_words
    }

    pub fn total_questions(&self) -> usize {
        self.caregiver_questions + self.plwd_questions
    }

    pub fn total_disfluencies(&self) -> usize {
        self.caregiver_disfluencies + self.plwd_disfluencies
    }

    pub fn total_repeats(&self) -> usize {
        self.caregiver_repeats + self.plwd_repeats
    }

    pub fn total_nonverbal(&self) -> usize {
        self.caregiver_nonverbal + self.plwd_nonverbal
    }

    pub fn words_per_turn(&self) -> f64 {
        ratio(self.total_words(), self.total_turns())
    }

    pub fn question_rate(&self) -> f64 {
        per_hundred(self.total_questions(), self.total_words())
    }

    pub fn disfluency_rate(&self) -> f64 {
        per_hundred(self.total_disfluencies(), self.total_words())
    }

    pub fn repeat_rate(&self) -> f64 {
        per_hundred(self.total_repeats(), self.total_words())
    }

    pub fn nonverbal_rate(&self) -> f64 {
        per_hundred(self.total_nonverbal(), self.total_words())
    }

    /// Share of questions asked by the person living with dementia
    pub fn answer_ratio(&self) -> f64 {
        ratio(self.plwd_questions, self.total_questions())
    }

    /// Caregiver turns per PLWD turn
    pub fn dominance_ratio(&self) -> f64 {
        ratio(self.caregiver_turns, self.plwd_turns)
    }

    pub fn rates(&self) -> RecordRates {
        RecordRates {
            words_per_turn: self.words_per_turn(),
            caregiver_words_per_turn: ratio(self.caregiver_words, self.caregiver_turns),
            plwd_words_per_turn: ratio(self.plwd_words, self.plwd_turns),
            question_rate_per_100_words: self.question_rate(),
            caregiver_question_rate: per_hundred(self.caregiver_questions, self.caregiver_words),
            plwd_question_rate: per_hundred(self.plwd_questions, self.plwd_words),
            disfluency_rate: self.disfluency_rate(),
            repeat_rate: self.repeat_rate(),
            nonverbal_rate: self.nonverbal_rate(),
            answer_ratio: self.answer_ratio(),
            dominance_ratio: self.dominance_ratio(),
            turn_diff: self.caregiver_turns as i64 - self.plwd_turns as i64,
            word_diff: self.caregiver_words as i64 - self.plwd_words as i64,
        }
    }
}

/// Roll-up of all records belonging to one participant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub patient_id: String,
    pub condition: Condition,
    pub total_sessions: usize,
    pub total_weeks: usize,
    pub ep_sessions: usize,
    pub er_sessions: usize,
    pub total_turns: usize,
    pub total_words: usize,
    pub total_questions: usize,
    pub total_disfluencies: usize,
    pub total_nonverbal: usize,
    pub pain_mentions: usize,
    pub comfort_mentions: usize,
    pub min_week: Option<u32>,
    pub max_week: Option<u32>,
    pub filenames: Vec<String>,
}

/// A file that produced no record, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub filename: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_are_zero_on_empty_record() {
        let record = FileMetricRecord::default();
        let rates = record.rates();

        assert_eq!(rates.words_per_turn, 0.0);
        assert_eq!(rates.question_rate_per_100_words, 0.0);
        assert_eq!(rates.disfluency_rate, 0.0);
        assert_eq!(rates.repeat_rate, 0.0);
        assert_eq!(rates.nonverbal_rate, 0.0);
        assert_eq!(rates.answer_ratio, 0.0);
        assert_eq!(rates.dominance_ratio, 0.0);
        assert!(!rates.question_rate_per_100_words.is_nan());
    }

    #[test]
    fn test_rates_follow_counts() {
        let record = FileMetricRecord {
            caregiver_turns: 3,
            plwd_turns: 1,
            caregiver_words: 30,
            plwd_words: 10,
            caregiver_questions: 3,
            plwd_questions: 1,
            plwd_disfluencies: 2,
            caregiver_nonverbal: 1,
            plwd_nonverbal: 1,
            ..Default::default()
        };
        let rates = record.rates();

        assert!((rates.words_per_turn - 10.0).abs() < 1e-9);
        assert!((rates.question_rate_per_100_words - 10.0).abs() < 1e-9);
        assert!((rates.plwd_question_rate - 10.0).abs() < 1e-9);
        assert!((rates.disfluency_rate - 5.0).abs() < 1e-9);
        assert!((rates.nonverbal_rate - 5.0).abs() < 1e-9);
        assert!((rates.answer_ratio - 0.25).abs() < 1e-9);
        assert!((rates.dominance_ratio - 3.0).abs() < 1e-9);
        assert_eq!(rates.turn_diff, 2);
        assert_eq!(rates.word_diff, 20);
    }
}
