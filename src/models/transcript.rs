use std::fmt;

use serde::{Deserialize, Serialize};

/// Conversational role of a speaker tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    Caregiver,
    Plwd,
    Other,
}

impl SpeakerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerRole::Caregiver => "caregiver",
            SpeakerRole::Plwd => "plwd",
            SpeakerRole::Other => "other",
        }
    }
}

impl fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bracketed `[...]` span lifted out of an utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Text between the brackets, untrimmed
    pub raw: String,
    /// Byte offset of the opening bracket within the utterance's raw text
    pub position: usize,
    /// Index of the utterance the annotation came from
    pub utterance_index: usize,
    /// Speaker of that utterance
    pub speaker: SpeakerRole,
}

/// One speaker turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// Position of this turn within the file
    pub index: usize,
    pub speaker: SpeakerRole,
    /// Speaker tag as written in the transcript (without the colon)
    pub tag: String,
    /// Text after the speaker tag, trimmed
    pub raw_text: String,
    /// Raw text with annotations replaced by a space
    pub spoken_text: String,
    /// Spoken text with disfluency tokens removed
    pub clean_text: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SessionType {
    #[serde(rename = "baseline")]
    Baseline,
    #[serde(rename = "EP")]
    Ep,
    #[serde(rename = "ER")]
    Er,
    #[serde(rename = "final_interview")]
    FinalInterview,
    #[default]
    Unknown,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Baseline => "baseline",
            SessionType::Ep => "EP",
            SessionType::Er => "ER",
            SessionType::FinalInterview => "final_interview",
            SessionType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Study arm a participant was enrolled in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "VR")]
    Vr,
    Tablet,
    #[default]
    Unknown,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Vr => "VR",
            Condition::Tablet => "Tablet",
            Condition::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a metadata value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Read directly from the filename or the condition table
    Parsed,
    /// Recovered from the transcript body
    Inferred,
    /// Nothing matched; the value is a placeholder
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField<T> {
    pub value: T,
    pub source: FieldSource,
}

impl<T> MetadataField<T> {
    pub fn parsed(value: T) -> Self {
        Self {
            value,
            source: FieldSource::Parsed,
        }
    }

    pub fn inferred(value: T) -> Self {
        Self {
            value,
            source: FieldSource::Inferred,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            source: FieldSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == FieldSource::Fallback
    }
}

/// Per-file metadata derived from filename conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub participant_id: MetadataField<String>,
    pub week_label: MetadataField<String>,
    pub session_type: MetadataField<SessionType>,
    pub condition: MetadataField<Condition>,
}

impl FileMetadata {
    /// Names of the fields that fell back to placeholders
    pub fn fallback_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.participant_id.is_fallback() {
            fields.push("patient_id".to_string());
        }
        if self.week_label.is_fallback() {
            fields.push("week_label".to_string());
        }
        if self.session_type.is_fallback() {
            fields.push("session_type".to_string());
        }
        if self.condition.is_fallback() {
            fields.push("condition".to_string());
        }
        fields
    }
}

/// Parse the number out of a `Week N` label
pub fn week_number(label: &str) -> Option<u32> {
    label
        .strip_prefix("Week ")
        .and_then(|n| n.trim().parse().ok())
}

/// A normalized transcript: metadata plus its ordered turns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptFile {
    pub metadata: FileMetadata,
    pub utterances: Vec<Utterance>,
}

impl TranscriptFile {
    pub fn filename(&self) -> &str {
        &self.metadata.filename
    }

    /// All annotations in document order
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.utterances.iter().flat_map(|u| u.annotations.iter())
    }
}
