pub mod lexicon;
pub mod nonverbal;
pub mod patterns;

pub use lexicon::*;
pub use nonverbal::*;
pub use patterns::*;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::{ExampleConfig, TopicConfig};
use crate::models::{Condition, CueSummary, LexiconSummary, PerSpeakerCounts, TranscriptFile};

/// Immutable resources shared by every file-level worker
///
/// Built once by [`crate::config::PipelineConfig::compile`] and handed out
/// behind an `Arc`; nothing here is mutated after construction.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub disfluencies: HashSet<String>,
    pub cues: CueNormalizer,
    pub lexicons: Vec<Lexicon>,
    /// Lowercase participant id -> condition
    pub conditions: HashMap<String, Condition>,
    pub topics: TopicConfig,
    pub examples: ExampleConfig,
}

impl AnalysisContext {
    pub fn is_disfluency(&self, token: &str) -> bool {
        self.disfluencies.contains(token)
    }
}

/// All per-file partial results for one transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub transcript: TranscriptFile,
    pub patterns: PerSpeakerCounts,
    pub cues: CueSummary,
    pub lexicon: LexiconSummary,
}

/// Run the pattern extractor, cue normalizer and lexicon scorer over one
/// normalized transcript
pub fn analyze_file(transcript: TranscriptFile, context: &AnalysisContext) -> FileAnalysis {
    let patterns = extract(&transcript.utterances, context);
    let cues = normalize_cues(transcript.annotations(), &context.cues);
    let lexicon = score_all(&transcript.utterances, &context.lexicons);

    FileAnalysis {
        transcript,
        patterns,
        cues,
        lexicon,
    }
}

/// Lowercase a whitespace token and trim surrounding punctuation
///
/// Inner apostrophes survive (`can't`), curly ones are straightened.
/// Returns `None` for tokens with nothing alphanumeric left, which are
/// punctuation or annotation remnants.
pub fn normalize_token(token: &str) -> Option<String> {
    let trimmed = token.trim_matches(|c: char| !c.is_alphanumeric());
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase().replace('\u{2019}', "'"))
}

/// Normalized word tokens of a text, remnants dropped
pub fn word_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().filter_map(normalize_token).collect()
}

/// Split text into sentences on runs of `.`, `!` and `?`
///
/// Terminal punctuation stays attached to its sentence. Segments without
/// any alphanumeric character are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminal(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_terminal(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        push_sentence(&mut sentences, &text[start..end]);
        start = end;
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn push_sentence<'a>(sentences: &mut Vec<&'a str>, segment: &'a str) {
    let segment = segment.trim();
    if segment.chars().any(char::is_alphanumeric) {
        sentences.push(segment);
    }
}

/// First `max_chars` characters of a text
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
