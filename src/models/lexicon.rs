use std::fmt;

use serde::{Deserialize, Serialize};

use super::SpeakerRole;

/// Domain category a lexicon scores for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexiconTag {
    Pain,
    Comfort,
}

impl LexiconTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LexiconTag::Pain => "pain",
            LexiconTag::Comfort => "comfort",
        }
    }
}

impl fmt::Display for LexiconTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single lexicon hit inside an utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconMatch {
    /// The configured term, as normalized tokens joined by spaces
    pub term: String,
    pub tag: LexiconTag,
    pub weight: f64,
    /// The sentence containing the match
    pub context: String,
    pub utterance_index: usize,
    pub speaker: SpeakerRole,
}

/// Matches for one file, split by tag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconSummary {
    pub matches: Vec<LexiconMatch>,
}

impl LexiconSummary {
    /// Headline count for a tag: number of matches, not a weighted sum
    pub fn mentions(&self, tag: LexiconTag) -> usize {
        self.matches.iter().filter(|m| m.tag == tag).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(term: &str, tag: LexiconTag, weight: f64) -> LexiconMatch {
        LexiconMatch {
            term: term.to_string(),
            tag,
            weight,
            context: String::new(),
            utterance_index: 0,
            speaker: SpeakerRole::Plwd,
        }
    }

    #[test]
    fn test_mentions_count_matches_not_weights() {
        let summary = LexiconSummary {
            matches: vec![
                hit("back pain", LexiconTag::Pain, 2.8),
                hit("tired", LexiconTag::Pain, 1.0),
                hit("calm", LexiconTag::Comfort, 1.0),
            ],
        };

        assert_eq!(summary.mentions(LexiconTag::Pain), 2);
        assert_eq!(summary.mentions(LexiconTag::Comfort), 1);
    }
}
