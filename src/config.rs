use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::extract::{AnalysisContext, CueNormalizer, Lexicon};
use crate::models::{Condition, LexiconTag};

/// Everything the pipeline reads as static configuration
///
/// Every field has a default, so a partial JSON file only overrides what it
/// names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Participant id (lowercase) -> study condition
    pub conditions: BTreeMap<String, Condition>,
    /// Filler tokens excluded from word counts
    pub disfluencies: Vec<String>,
    /// Canonical cue label -> synonyms / prefixes
    pub cue_synonyms: BTreeMap<String, Vec<String>>,
    pub lexicons: Vec<LexiconSpec>,
    pub topics: TopicConfig,
    pub examples: ExampleConfig,
}

/// A tagged term dictionary as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconSpec {
    pub tag: LexiconTag,
    pub terms: Vec<TermSpec>,
}

/// A lexicon term, optionally weighted
///
/// Unweighted terms get `token_count^1.5`, so longer phrases rank higher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermSpec {
    Plain(String),
    Weighted { term: String, weight: f64 },
}

impl TermSpec {
    pub fn term(&self) -> &str {
        match self {
            TermSpec::Plain(term) | TermSpec::Weighted { term, .. } => term,
        }
    }

    pub fn weight(&self) -> Option<f64> {
        match self {
            TermSpec::Plain(_) => None,
            TermSpec::Weighted { weight, .. } => Some(*weight),
        }
    }
}

/// Run parameters for the topic clusterer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Number of clusters
    pub k: usize,
    /// Topics reported per file
    pub top_n: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Seeded restarts; the lowest-inertia run wins
    pub n_init: usize,
    /// Centroid shift below which k-means stops early
    pub tolerance: f64,
    /// TF-IDF terms kept per topic
    pub top_terms: usize,
    /// Terms joined into the human-readable label
    pub label_terms: usize,
    /// Minimum number of chunks a term must appear in
    pub min_df: usize,
    /// Terms in more than this share of chunks are dropped
    pub max_df_ratio: f64,
    /// Vocabulary cap, most frequent terms first
    pub max_features: usize,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            k: 15,
            top_n: 3,
            seed: 42,
            max_iterations: 300,
            n_init: 10,
            tolerance: 1e-4,
            top_terms: 5,
            label_terms: 3,
            min_df: 2,
            max_df_ratio: 0.8,
            max_features: 8000,
        }
    }
}

/// Limits for the example/audit payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExampleConfig {
    /// Examples kept per tag, cue label or topic
    pub per_category: usize,
    /// Characters of text kept per example
    pub snippet_chars: usize,
}

impl Default for ExampleConfig {
    fn default() -> Self {
        Self {
            per_category: 50,
            snippet_chars: 300,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            conditions: BTreeMap::new(),
            disfluencies: to_strings(DEFAULT_DISFLUENCIES),
            cue_synonyms: DEFAULT_CUE_SYNONYMS
                .iter()
                .map(|(label, synonyms)| (label.to_string(), to_strings(synonyms)))
                .collect(),
            lexicons: vec![
                LexiconSpec::plain(LexiconTag::Pain, DEFAULT_PAIN_TERMS),
                LexiconSpec::plain(LexiconTag::Comfort, DEFAULT_COMFORT_TERMS),
            ],
            topics: TopicConfig::default(),
            examples: ExampleConfig::default(),
        }
    }
}

impl LexiconSpec {
    pub fn plain(tag: LexiconTag, terms: &[&str]) -> Self {
        Self {
            tag,
            terms: terms.iter().map(|t| TermSpec::Plain(t.to_string())).collect(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            "Loaded config from {:?}: {} lexicons, {} cue labels, {} participants",
            path,
            config.lexicons.len(),
            config.cue_synonyms.len(),
            config.conditions.len()
        );
        Ok(config)
    }

    /// Load from a path if given, otherwise use the built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Validate everything and build the immutable resources shared by
    /// every worker
    pub fn compile(&self) -> Result<AnalysisContext, ConfigError> {
        self.validate_topics()?;

        let mut lexicons: Vec<Lexicon> = Vec::with_capacity(self.lexicons.len());
        for spec in &self.lexicons {
            if lexicons.iter().any(|l| l.tag() == spec.tag) {
                return Err(ConfigError::DuplicateTag(spec.tag));
            }
            lexicons.push(Lexicon::compile(spec)?);
        }

        let cues = CueNormalizer::new(&self.cue_synonyms)?;

        let conditions = self
            .conditions
            .iter()
            .map(|(id, condition)| (id.trim().to_lowercase(), *condition))
            .collect();

        let disfluencies = self
            .disfluencies
            .iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        Ok(AnalysisContext {
            disfluencies,
            cues,
            lexicons,
            conditions,
            topics: self.topics.clone(),
            examples: self.examples.clone(),
        })
    }

    fn validate_topics(&self) -> Result<(), ConfigError> {
        let topics = &self.topics;
        if topics.k == 0 {
            return Err(ConfigError::Topics("k must be at least 1".to_string()));
        }
        if topics.top_n == 0 {
            return Err(ConfigError::Topics("top_n must be at least 1".to_string()));
        }
        if topics.max_iterations == 0 || topics.n_init == 0 {
            return Err(ConfigError::Topics(
                "max_iterations and n_init must be at least 1".to_string(),
            ));
        }
        if !(topics.max_df_ratio > 0.0 && topics.max_df_ratio <= 1.0) {
            return Err(ConfigError::Topics(format!(
                "max_df_ratio must be in (0, 1], got {}",
                topics.max_df_ratio
            )));
        }
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const DEFAULT_DISFLUENCIES: &[&str] = &[
    "um", "umm", "uh", "uhh", "uhhh", "er", "err", "erm", "ah", "ahh", "hm", "hmm", "mhm", "mm",
    "mmm", "eh", "ehm", "em",
];

const DEFAULT_CUE_SYNONYMS: &[(&str, &[&str])] = &[
    ("inaudible", &["inaudible", "unintelligible", "indistinct"]),
    ("pause", &["pause", "long pause", "silence"]),
    ("laughter", &["laugh", "chuckle", "chuckling", "giggle", "giggling"]),
    ("coughing", &["cough"]),
    ("sighing", &["sigh"]),
    ("nodding", &["nod"]),
    (
        "shaking_head",
        &[
            "shake head",
            "shakes head",
            "shaking head",
            "shakes his head",
            "shakes her head",
            "shaking his head",
            "shaking her head",
        ],
    ),
    ("humming", &["hum"]),
    ("singing", &["sing"]),
    ("mumbling", &["mumble", "mumbling"]),
    ("yawning", &["yawn"]),
    ("gesturing", &["gesture", "gesturing"]),
    ("pointing", &["point"]),
    ("clapping", &["clap"]),
    ("smiling", &["smile", "smiling"]),
    ("dancing", &["dance", "dancing"]),
    ("interruption", &["-", "\u{2013}", "\u{2014}"]),
    ("trailing_off", &["...", "\u{2026}"]),
];

const DEFAULT_PAIN_TERMS: &[&str] = &[
    // physical
    "pain", "painful", "hurts", "hurt", "hurting", "ache", "aching", "aches", "sore", "soreness",
    "tender", "tenderness", "stiff", "stiffness", "cramping", "cramps", "throbbing", "pounding",
    "stabbing", "sharp", "burning", "tingling", "numb", "numbness", "swollen", "swelling",
    "back pain", "neck pain", "headache", "migraine", "joint pain", "knee pain", "hip pain",
    "shoulder pain", "chest pain", "stomach ache", "agony", "excruciating", "severe", "intense",
    "unbearable", "terrible", "awful", "killing me", "torture", "misery", "suffering",
    "uncomfortable", "discomfort", "bothers", "bothering", "irritating", "annoying", "unpleasant",
    "difficulty", "trouble", "struggle", "can't move", "can't sit", "can't stand", "can't walk",
    "tired", "exhausted", "fatigued", "weak", "weakness", "drained", "worn out", "beat",
    "wiped out", "no energy", "can't do", "dizzy", "dizziness", "nauseous", "nausea",
    "motion sick", "headache from", "eye strain", "blurry", "too bright", "overwhelming",
    // emotional
    "upset", "frustrated", "frustration", "angry", "mad", "irritated", "annoyed", "worried",
    "anxious", "anxiety", "nervous", "scared", "afraid", "fear", "fearful", "panicked", "stressed",
    "stress", "sad", "sadness", "depressed", "depression", "down", "low", "blue", "crying",
    "tears", "weeping", "sobbing", "heartbroken", "hopeless", "helpless", "worthless", "useless",
    "confused", "confusion", "lost", "don't understand", "can't think", "forgetful",
    "memory problems", "can't remember", "blank", "overwhelmed", "too much", "can't handle",
    "give up", "lonely", "alone", "isolated", "abandoned", "rejected", "ignored", "embarrassed",
    "ashamed", "humiliated", "stupid", "foolish", "can't cope", "falling apart", "breaking down",
    "losing it", "had enough", "fed up", "sick of", "hate this", "want to quit",
];

const DEFAULT_COMFORT_TERMS: &[&str] = &[
    "comfortable", "comfort", "feels good", "feeling good", "better", "improved", "relief",
    "relieved", "relaxed", "relaxing", "calm", "peaceful", "soothing", "gentle", "soft", "smooth",
    "easy", "pleasant", "nice", "wonderful", "great", "excellent", "perfect", "strong", "stronger",
    "energetic", "refreshed", "rested", "no pain", "pain free", "painless", "healing", "recovered",
    "mobile", "flexible", "steady", "balanced", "stable", "happy", "happiness", "joy", "joyful",
    "cheerful", "pleased", "content", "satisfied", "proud", "accomplished", "successful",
    "confident", "secure", "safe", "protected", "supported", "fun", "enjoyable", "enjoying", "love",
    "like", "appreciate", "amazing", "fantastic", "awesome", "brilliant", "fascinating",
    "interesting", "engaging", "exciting", "thrilling", "delightful", "clear", "focused", "sharp",
    "alert", "aware", "understand", "makes sense", "easy to use", "simple", "straightforward",
    "manageable", "doable", "achievable", "possible", "immersive", "realistic", "responsive",
    "intuitive", "user friendly", "helpful", "beneficial", "therapeutic", "calming", "distracting",
];

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config_compiles() {
        let context = PipelineConfig::default().compile().unwrap();

        assert_eq!(context.lexicons.len(), 2);
        assert!(context.disfluencies.contains("um"));
        assert_eq!(context.topics.k, 15);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "conditions": {{"VR002": "VR", "vr010": "Tablet"}},
                "topics": {{"k": 4}}
            }}"#
        )
        .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.topics.k, 4);
        assert_eq!(config.topics.seed, 42);
        assert_eq!(config.lexicons.len(), 2);

        let context = config.compile().unwrap();
        assert_eq!(context.conditions.get("vr002"), Some(&Condition::Vr));
        assert_eq!(context.conditions.get("vr010"), Some(&Condition::Tablet));
    }

    #[test]
    fn test_weighted_and_plain_terms_parse() {
        let json = r#"{
            "lexicons": [
                {"tag": "pain", "terms": ["tired", {"term": "not tired at all", "weight": 4.0}]}
            ]
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        let terms = &config.lexicons[0].terms;
        assert_eq!(terms[0].term(), "tired");
        assert_eq!(terms[0].weight(), None);
        assert_eq!(terms[1].weight(), Some(4.0));
    }

    #[test]
    fn test_malformed_config_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"lexicons\": [{{\"tag\": \"pain\", \"terms\": 7}}] }}").unwrap();

        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let config = PipelineConfig {
            lexicons: vec![
                LexiconSpec::plain(LexiconTag::Pain, &["tired"]),
                LexiconSpec::plain(LexiconTag::Pain, &["sore"]),
            ],
            ..Default::default()
        };

        let err = config.compile().unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTag(LexiconTag::Pain)));
    }

    #[test]
    fn test_zero_topics_rejected() {
        let mut config = PipelineConfig::default();
        config.topics.k = 0;

        assert!(matches!(config.compile(), Err(ConfigError::Topics(_))));
    }
}
