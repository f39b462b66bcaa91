use std::collections::HashMap;

use tracing::debug;

use crate::config::LexiconSpec;
use crate::error::ConfigError;
use crate::models::{LexiconMatch, LexiconSummary, LexiconTag, Utterance};

use super::{split_sentences, word_tokens};

/// A compiled, immutable term dictionary for one tag
#[derive(Debug, Clone)]
pub struct Lexicon {
    tag: LexiconTag,
    /// Normalized phrase (tokens joined by single spaces) -> weight
    terms: HashMap<String, f64>,
    /// Token length of the longest phrase
    max_phrase_len: usize,
}

impl Lexicon {
    /// Validate and compile a lexicon definition
    ///
    /// Terms are normalized the same way utterance text is, so matching is
    /// case- and punctuation-insensitive. Listing a term twice is harmless
    /// unless the two entries disagree on weight.
    pub fn compile(spec: &LexiconSpec) -> Result<Self, ConfigError> {
        let mut terms: HashMap<String, f64> = HashMap::new();
        let mut max_phrase_len = 0;

        for entry in &spec.terms {
            let tokens = word_tokens(entry.term());
            if tokens.is_empty() {
                return Err(ConfigError::EmptyTerm { tag: spec.tag });
            }

            let weight = entry
                .weight()
                .unwrap_or_else(|| (tokens.len() as f64).powf(1.5));
            if !weight.is_finite() || weight <= 0.0 {
                return Err(ConfigError::InvalidWeight {
                    tag: spec.tag,
                    term: entry.term().to_string(),
                    weight,
                });
            }

            let phrase = tokens.join(" ");
            if let Some(&existing) = terms.get(&phrase) {
                if existing != weight {
                    return Err(ConfigError::ConflictingTerm {
                        tag: spec.tag,
                        term: phrase,
                        first: existing,
                        second: weight,
                    });
                }
                continue;
            }

            max_phrase_len = max_phrase_len.max(tokens.len());
            terms.insert(phrase, weight);
        }

        debug!(
            "Compiled {} lexicon: {} terms, longest phrase {} tokens",
            spec.tag,
            terms.len(),
            max_phrase_len
        );

        Ok(Self {
            tag: spec.tag,
            terms,
            max_phrase_len,
        })
    }

    pub fn tag(&self) -> LexiconTag {
        self.tag
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn max_phrase_len(&self) -> usize {
        self.max_phrase_len
    }

    /// Find every match in an utterance stream
    ///
    /// Each sentence is scanned left to right. At every position the
    /// longest configured phrase is tried first, down to a single token;
    /// a hit consumes its tokens, so matches never overlap within one
    /// lexicon.
    pub fn score(&self, utterances: &[Utterance]) -> Vec<LexiconMatch> {
        let mut matches = Vec::new();
        if self.terms.is_empty() {
            return matches;
        }

        for utterance in utterances {
            for sentence in split_sentences(&utterance.spoken_text) {
                let tokens = word_tokens(sentence);
                let mut i = 0;

                while i < tokens.len() {
                    let longest = self.max_phrase_len.min(tokens.len() - i);
                    let hit = (1..=longest).rev().find_map(|n| {
                        let phrase = tokens[i..i + n].join(" ");
                        self.terms.get(&phrase).map(|&weight| (n, phrase, weight))
                    });

                    match hit {
                        Some((n, term, weight)) => {
                            matches.push(LexiconMatch {
                                term,
                                tag: self.tag,
                                weight,
                                context: sentence.to_string(),
                                utterance_index: utterance.index,
                                speaker: utterance.speaker,
                            });
                            i += n;
                        }
                        None => i += 1,
                    }
                }
            }
        }

        matches
    }
}

/// Score every lexicon independently against the same utterances
///
/// The same span may match under two tags; no cross-tag deduplication.
pub fn score_all(utterances: &[Utterance], lexicons: &[Lexicon]) -> LexiconSummary {
    let matches = lexicons
        .iter()
        .flat_map(|lexicon| lexicon.score(utterances))
        .collect();

    LexiconSummary { matches }
}
