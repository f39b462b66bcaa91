use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{SpeakerRole, SwitchExample, TopicExample};

/// A lexicon match lifted out for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconExample {
    pub filename: String,
    pub patient_id: String,
    pub term: String,
    pub weight: f64,
    pub speaker: SpeakerRole,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueExample {
    pub filename: String,
    pub patient_id: String,
    /// Annotation text as written
    pub raw: String,
    pub known: bool,
    pub speaker: SpeakerRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatExample {
    pub filename: String,
    pub patient_id: String,
    pub word: String,
    pub run_length: usize,
    pub speaker: SpeakerRole,
    pub context: String,
}

/// Side output for audit and UI display; never part of the numeric records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditExamples {
    /// Tag -> highest-weight matches
    pub lexicon: BTreeMap<String, Vec<LexiconExample>>,
    /// Cue label -> first occurrences
    pub nonverbal: BTreeMap<String, Vec<CueExample>>,
    /// Longest repeat runs first
    pub repeats: Vec<RepeatExample>,
    pub topics: Vec<TopicExample>,
    pub topic_switches: Vec<SwitchExample>,
}
