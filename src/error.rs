use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::LexiconTag;

/// Configuration problems. Any of these aborts the run before a single
/// transcript is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{tag} lexicon contains an empty term")]
    EmptyTerm { tag: LexiconTag },

    #[error("{tag} lexicon term {term:?} has invalid weight {weight}")]
    InvalidWeight {
        tag: LexiconTag,
        term: String,
        weight: f64,
    },

    #[error("{tag} lexicon lists {term:?} twice with different weights ({first} vs {second})")]
    ConflictingTerm {
        tag: LexiconTag,
        term: String,
        first: f64,
        second: f64,
    },

    #[error("more than one lexicon is tagged {0}")]
    DuplicateTag(LexiconTag),

    #[error("cue synonym table has an empty entry for {0:?}")]
    EmptySynonym(String),

    #[error("invalid topic settings: {0}")]
    Topics(String),
}

/// Per-file ingestion failures. These are collected, never propagated.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("unreadable: {0}")]
    Unreadable(#[from] io::Error),

    #[error("file is empty")]
    Empty,

    #[error("no recognizable speaker turns")]
    NoSpeakerTurns,

    #[error("worker failed: {0}")]
    Worker(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_problem() {
        let err = ConfigError::InvalidWeight {
            tag: LexiconTag::Pain,
            term: "tired".to_string(),
            weight: -1.0,
        };
        assert_eq!(
            err.to_string(),
            "pain lexicon term \"tired\" has invalid weight -1"
        );
        assert_eq!(
            FileError::NoSpeakerTurns.to_string(),
            "no recognizable speaker turns"
        );
    }
}
