use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::FileError;
use crate::extract::{normalize_token, AnalysisContext};
use crate::models::{
    Annotation, Condition, FileMetadata, MetadataField, SessionType, SpeakerRole, TranscriptFile,
    Utterance,
};

// Either a `<pid>_<role>:` tag anywhere, or a bare capitalised label
// (`Interviewer:`, `Facilitator 2:`) at line start or after `.!?`
static SPEAKER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)\b([A-Za-z][A-Za-z0-9]*_[A-Za-z0-9]+)\s*:|(?:^|[.!?]\s+)([A-Z][A-Za-z]*(?: \d+)?)\s*:",
    )
    .expect("Invalid regex: speaker tag")
});

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("Invalid regex: annotation"));

static PARTICIPANT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+\d+$").expect("Invalid regex: participant id"));

static SESSION_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(ep|er)(\d*)(?:[^a-z]|$)").expect("Invalid regex: session code")
});

/// Perform Stage 0: turn raw transcript text into a normalized transcript
///
/// Text before the first speaker tag is dropped, as are tags with nothing
/// after them. Bare labels such as `Interviewer:` start turns of their
/// own and are classified as `other`. Each turn's `[...]` spans become annotations and are
/// replaced by a space in the spoken text; the clean text further drops
/// disfluency tokens.
pub fn normalize(
    raw: &str,
    filename: &str,
    context: &AnalysisContext,
) -> Result<TranscriptFile, FileError> {
    if raw.trim().is_empty() {
        return Err(FileError::Empty);
    }

    let metadata = parse_metadata(filename, raw, &context.conditions);
    let participant = (!metadata.participant_id.is_fallback())
        .then(|| metadata.participant_id.value.clone());

    let tags: Vec<(usize, usize, &str)> = SPEAKER_TAG
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let tag = caps.get(1).or_else(|| caps.get(2))?;
            Some((tag.start(), whole.end(), tag.as_str()))
        })
        .collect();

    let mut utterances = Vec::with_capacity(tags.len());
    for (i, &(_, text_start, tag)) in tags.iter().enumerate() {
        let text_end = tags.get(i + 1).map_or(raw.len(), |next| next.0);
        let raw_text = raw[text_start..text_end].trim();
        if raw_text.is_empty() {
            debug!("{}: empty turn for {}", filename, tag);
            continue;
        }

        let speaker = classify_speaker(tag, participant.as_deref());
        utterances.push(build_utterance(utterances.len(), speaker, tag, raw_text, context));
    }

    if utterances.is_empty() {
        return Err(FileError::NoSpeakerTurns);
    }

    debug!(
        "{}: {} turns, participant {} ({:?})",
        filename,
        utterances.len(),
        metadata.participant_id.value,
        metadata.participant_id.source
    );

    Ok(TranscriptFile {
        metadata,
        utterances,
    })
}

fn build_utterance(
    index: usize,
    speaker: SpeakerRole,
    tag: &str,
    raw_text: &str,
    context: &AnalysisContext,
) -> Utterance {
    let annotations = ANNOTATION
        .captures_iter(raw_text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let raw = caps.get(1)?.as_str();
            if raw.trim().is_empty() {
                return None;
            }
            Some(Annotation {
                raw: raw.to_string(),
                position: whole.start(),
                utterance_index: index,
                speaker,
            })
        })
        .collect();

    let spoken_text = ANNOTATION.replace_all(raw_text, " ").into_owned();
    let clean_text = spoken_text
        .split_whitespace()
        .filter(|token| normalize_token(token).is_none_or(|t| !context.is_disfluency(&t)))
        .collect::<Vec<_>>()
        .join(" ");

    Utterance {
        index,
        speaker,
        tag: tag.to_string(),
        raw_text: raw_text.to_string(),
        spoken_text,
        clean_text,
        annotations,
    }
}

/// Role of a speaker tag
///
/// With a known participant only `<pid>_c` and `<pid>_p` belong to the
/// dyad. Without one, the `_c` / `_p` suffix decides.
pub fn classify_speaker(tag: &str, participant: Option<&str>) -> SpeakerRole {
    let tag = tag.to_lowercase();
    let (prefix, suffix) = match tag.rsplit_once('_') {
        Some(parts) => parts,
        None => return SpeakerRole::Other,
    };

    if participant.is_some_and(|pid| pid != prefix) {
        return SpeakerRole::Other;
    }
    match suffix {
        "c" => SpeakerRole::Caregiver,
        "p" => SpeakerRole::Plwd,
        _ => SpeakerRole::Other,
    }
}

/// Derive participant, week, session type and condition for one file
///
/// Each field records whether it was parsed from the filename, inferred
/// from the transcript's speaker tags, or fell back to `Unknown`.
pub fn parse_metadata(
    filename: &str,
    text: &str,
    conditions: &HashMap<String, Condition>,
) -> FileMetadata {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let first_token = stem
        .split(['_', '-', '.', ' '])
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let (participant_id, remainder) = if PARTICIPANT_ID.is_match(&first_token) {
        let rest = stem.get(first_token.len()..).unwrap_or_default();
        (MetadataField::parsed(first_token), rest)
    } else {
        let field = infer_participant(text)
            .map(MetadataField::inferred)
            .unwrap_or_else(|| MetadataField::fallback("Unknown".to_string()));
        (field, stem)
    };

    let (session_type, week_label) = parse_session(remainder);

    let condition = if participant_id.is_fallback() {
        MetadataField::fallback(Condition::Unknown)
    } else {
        match conditions.get(&participant_id.value) {
            Some(&condition) => MetadataField::parsed(condition),
            None => MetadataField::fallback(Condition::Unknown),
        }
    };

    FileMetadata {
        filename: filename.to_string(),
        participant_id,
        week_label,
        session_type,
        condition,
    }
}

fn parse_session(text: &str) -> (MetadataField<SessionType>, MetadataField<String>) {
    if let Some(caps) = SESSION_CODE.captures(text) {
        let session = match caps.get(1).map(|m| m.as_str().to_lowercase()) {
            Some(code) if code == "ep" => SessionType::Ep,
            _ => SessionType::Er,
        };
        let week = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .map(|n| MetadataField::parsed(format!("Week {}", n)))
            .unwrap_or_else(|| MetadataField::fallback("Unknown".to_string()));
        return (MetadataField::parsed(session), week);
    }

    let lower = text.to_lowercase();
    if lower.contains("baseline") {
        (
            MetadataField::parsed(SessionType::Baseline),
            MetadataField::parsed("Baseline".to_string()),
        )
    } else if lower.contains("final") {
        (
            MetadataField::parsed(SessionType::FinalInterview),
            MetadataField::parsed("Final".to_string()),
        )
    } else {
        (
            MetadataField::fallback(SessionType::Unknown),
            MetadataField::fallback("Unknown".to_string()),
        )
    }
}

/// Participant id from the first `<pid>_c:` or `<pid>_p:` tag
fn infer_participant(text: &str) -> Option<String> {
    SPEAKER_TAG.captures_iter(text).find_map(|caps| {
        let tag = caps.get(1)?.as_str().to_lowercase();
        let (prefix, suffix) = tag.rsplit_once('_')?;
        (matches!(suffix, "c" | "p") && PARTICIPANT_ID.is_match(prefix))
            .then(|| prefix.to_string())
    })
}
