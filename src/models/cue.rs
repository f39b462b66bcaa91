use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Annotation, SpeakerRole};

/// Result of canonicalizing an annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum CueLabel {
    /// Matched the synonym table
    Known(String),
    /// Not in the table; carries the annotation text as its own label
    Unmapped(String),
}

impl CueLabel {
    pub fn label(&self) -> &str {
        match self {
            CueLabel::Known(label) | CueLabel::Unmapped(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, CueLabel::Known(_))
    }
}

/// An annotation paired with its canonical label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCue {
    pub label: CueLabel,
    pub annotation: Annotation,
}

/// Per-file nonverbal cue tallies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueSummary {
    /// Label -> occurrences
    pub histogram: BTreeMap<String, usize>,
    pub caregiver: usize,
    pub plwd: usize,
    pub other: usize,
    pub known: usize,
    pub unmapped: usize,
    pub cues: Vec<NormalizedCue>,
}

impl CueSummary {
    pub fn for_speaker(&self, role: SpeakerRole) -> usize {
        match role {
            SpeakerRole::Caregiver => self.caregiver,
            SpeakerRole::Plwd => self.plwd,
            SpeakerRole::Other => self.other,
        }
    }
}
