use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SpeakerRole;

/// Raw pattern counts for one speaker role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerCounts {
    pub turns: usize,
    pub words: usize,
    pub sentences: usize,
    pub questions: usize,
    pub disfluencies: usize,
    pub repeats: usize,
    /// `/` overlap markers
    pub overlaps: usize,
}

impl SpeakerCounts {
    pub fn add(&mut self, other: &SpeakerCounts) {
        self.turns += other.turns;
        self.words += other.words;
        self.sentences += other.sentences;
        self.questions += other.questions;
        self.disfluencies += other.disfluencies;
        self.repeats += other.repeats;
        self.overlaps += other.overlaps;
    }
}

/// An immediate repetition run inside one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatInstance {
    pub word: String,
    /// Length of the run; contributes `run_length - 1` repeats
    pub run_length: usize,
    /// Token position of the run's first word
    pub position: usize,
    /// Up to five tokens either side, the run highlighted as `**word**`
    pub context: String,
    pub utterance_index: usize,
    pub speaker: SpeakerRole,
}

/// Pattern counts for a file, partitioned by speaker role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSpeakerCounts {
    pub caregiver: SpeakerCounts,
    pub plwd: SpeakerCounts,
    pub other: SpeakerCounts,
    /// Word -> extra occurrences across all immediate repeats
    pub repeats_by_word: BTreeMap<String, usize>,
    pub repeat_instances: Vec<RepeatInstance>,
}

impl PerSpeakerCounts {
    pub fn get_mut(&mut self, role: SpeakerRole) -> &mut SpeakerCounts {
        match role {
            SpeakerRole::Caregiver => &mut self.caregiver,
            SpeakerRole::Plwd => &mut self.plwd,
            SpeakerRole::Other => &mut self.other,
        }
    }

    /// Sum over all three roles
    pub fn total(&self) -> SpeakerCounts {
        let mut total = SpeakerCounts::default();
        total.add(&self.caregiver);
        total.add(&self.plwd);
        total.add(&self.other);
        total
    }
}
