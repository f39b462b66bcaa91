use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ConfigError;
use crate::models::{Annotation, CueLabel, CueSummary, NormalizedCue, SpeakerRole};

/// Maps free-form `[...]` annotation text onto canonical cue labels
#[derive(Debug, Clone)]
pub struct CueNormalizer {
    /// (normalized synonym, canonical label), longest synonym first
    prefixes: Vec<(String, String)>,
}

impl CueNormalizer {
    /// Build from a label -> synonyms table
    ///
    /// Every label is also registered as a synonym of itself, with
    /// underscores read as spaces, so canonical labels map to themselves.
    pub fn new(synonyms: &BTreeMap<String, Vec<String>>) -> Result<Self, ConfigError> {
        let mut prefixes = Vec::new();

        for (label, entries) in synonyms {
            let canonical = collapse(label);
            if canonical.is_empty() {
                return Err(ConfigError::EmptySynonym(label.clone()));
            }

            for entry in entries {
                let synonym = collapse(entry);
                if synonym.is_empty() {
                    return Err(ConfigError::EmptySynonym(label.clone()));
                }
                prefixes.push((synonym, canonical.clone()));
            }
            prefixes.push((canonical.replace('_', " "), canonical.clone()));
            prefixes.push((canonical.clone(), canonical.clone()));
        }

        // Longest first; ties broken lexically so the table order never matters
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.cmp(b)));
        prefixes.dedup_by(|a, b| a.0 == b.0);

        debug!("Cue normalizer built with {} prefixes", prefixes.len());
        Ok(Self { prefixes })
    }

    /// Canonical label for one annotation's text
    ///
    /// Matching is on the lowercased, whitespace-collapsed text; the longest
    /// synonym that prefixes it wins. Anything unmatched keeps its trimmed
    /// original text as an unmapped label.
    pub fn canonicalize(&self, raw: &str) -> CueLabel {
        let text = collapse(raw);
        if !text.is_empty() {
            for (synonym, label) in &self.prefixes {
                if text.starts_with(synonym.as_str()) {
                    return CueLabel::Known(label.clone());
                }
            }
        }
        CueLabel::Unmapped(raw.trim().to_string())
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonicalize every annotation of a file and tally them
pub fn normalize_cues<'a>(
    annotations: impl Iterator<Item = &'a Annotation>,
    normalizer: &CueNormalizer,
) -> CueSummary {
    let mut summary = CueSummary::default();

    for annotation in annotations {
        let label = normalizer.canonicalize(&annotation.raw);

        *summary.histogram.entry(label.label().to_string()).or_insert(0) += 1;
        match annotation.speaker {
            SpeakerRole::Caregiver => summary.caregiver += 1,
            SpeakerRole::Plwd => summary.plwd += 1,
            SpeakerRole::Other => summary.other += 1,
        }
        if label.is_known() {
            summary.known += 1;
        } else {
            summary.unmapped += 1;
        }

        summary.cues.push(NormalizedCue {
            label,
            annotation: annotation.clone(),
        });
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn normalizer() -> CueNormalizer {
        PipelineConfig::default().compile().unwrap().cues
    }

    fn annotation(raw: &str, speaker: SpeakerRole) -> Annotation {
        Annotation {
            raw: raw.to_string(),
            position: 0,
            utterance_index: 0,
            speaker,
        }
    }

    #[test]
    fn test_synonyms_share_a_label() {
        let cues = normalizer();

        for raw in ["laughs", "Laughing", "chuckles", "  giggle "] {
            assert_eq!(cues.canonicalize(raw), CueLabel::Known("laughter".to_string()));
        }
        assert_eq!(cues.canonicalize("Long   Pause"), CueLabel::Known("pause".to_string()));
        assert_eq!(cues.canonicalize("nods"), CueLabel::Known("nodding".to_string()));
        assert_eq!(
            cues.canonicalize("shakes her head slowly"),
            CueLabel::Known("shaking_head".to_string())
        );
    }

    #[test]
    fn test_canonical_labels_map_to_themselves() {
        let cues = normalizer();

        for label in ["laughter", "shaking_head", "trailing_off", "pause"] {
            assert_eq!(cues.canonicalize(label), CueLabel::Known(label.to_string()));
        }
    }

    #[test]
    fn test_every_default_synonym_maps_to_its_group() {
        let config = PipelineConfig::default();
        let cues = CueNormalizer::new(&config.cue_synonyms).unwrap();

        for (label, synonyms) in &config.cue_synonyms {
            let expected = CueLabel::Known(label.clone());
            assert_eq!(cues.canonicalize(label), expected, "label {:?}", label);
            assert_eq!(cues.canonicalize(&label.replace('_', " ")), expected);
            for synonym in synonyms {
                assert_eq!(cues.canonicalize(synonym), expected, "synonym {:?}", synonym);
                assert_eq!(
                    cues.canonicalize(&synonym.to_uppercase()),
                    expected,
                    "synonym {:?} uppercased",
                    synonym
                );
            }
        }
    }

    #[test]
    fn test_unmapped_text_is_kept_verbatim() {
        let cues = normalizer();

        assert_eq!(
            cues.canonicalize("  Looks at Photo "),
            CueLabel::Unmapped("Looks at Photo".to_string())
        );
        assert_eq!(cues.canonicalize("   "), CueLabel::Unmapped(String::new()));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut table = BTreeMap::new();
        table.insert("short".to_string(), vec!["long".to_string()]);
        table.insert("longer".to_string(), vec!["long pause".to_string()]);
        let cues = CueNormalizer::new(&table).unwrap();

        assert_eq!(cues.canonicalize("long pause here"), CueLabel::Known("longer".to_string()));
        assert_eq!(cues.canonicalize("long wait"), CueLabel::Known("short".to_string()));
    }

    #[test]
    fn test_empty_synonym_rejected() {
        let mut table = BTreeMap::new();
        table.insert("pause".to_string(), vec!["  ".to_string()]);

        assert!(matches!(
            CueNormalizer::new(&table),
            Err(ConfigError::EmptySynonym(label)) if label == "pause"
        ));
    }

    #[test]
    fn test_summary_partitions_by_speaker() {
        let cues = normalizer();
        let annotations = vec![
            annotation("pause", SpeakerRole::Caregiver),
            annotation("laughs", SpeakerRole::Plwd),
            annotation("laughing", SpeakerRole::Plwd),
            annotation("door closes", SpeakerRole::Other),
        ];

        let summary = normalize_cues(annotations.iter(), &cues);

        assert_eq!(summary.caregiver + summary.plwd + summary.other, annotations.len());
        assert_eq!(summary.caregiver, 1);
        assert_eq!(summary.plwd, 2);
        assert_eq!(summary.other, 1);
        assert_eq!(summary.known, 3);
        assert_eq!(summary.unmapped, 1);
        assert_eq!(summary.histogram.get("laughter"), Some(&2));
        assert_eq!(summary.histogram.get("door closes"), Some(&1));
        assert_eq!(summary.histogram.values().sum::<usize>(), annotations.len());
    }
}
