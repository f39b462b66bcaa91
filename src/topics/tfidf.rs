use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

/// Vocabulary limits for cluster labeling
#[derive(Debug, Clone, Copy)]
pub struct TfidfParams {
    /// Minimum number of documents a term must occur in
    pub min_df: usize,
    /// Terms occurring in more than this share of documents are dropped
    pub max_df_ratio: f64,
    /// Keep at most this many terms, most frequent across the corpus first
    pub max_features: usize,
    /// Terms returned per cluster
    pub top_terms: usize,
}

/// Lowercased alphabetic tokens of at least two characters, stop words removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2 && t.chars().all(char::is_alphabetic))
        .map(str::to_lowercase)
        .filter(|t| !is_stop_word(t))
        .collect()
}

/// Unigrams followed by adjacent bigrams
fn terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let bigrams: Vec<String> = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])).collect();
    tokens.into_iter().chain(bigrams).collect()
}

/// Top TF-IDF terms for each cluster
///
/// Every document is a row of raw term counts weighted by smoothed idf
/// `ln((1 + n) / (1 + df)) + 1` and L2-normalized. A cluster's score for a
/// term is the mean of its members' rows. Terms are ranked by score, ties
/// by the term itself; zero-score terms are never returned.
pub fn cluster_terms(
    documents: &[&str],
    assignments: &[usize],
    k: usize,
    params: &TfidfParams,
) -> Vec<Vec<String>> {
    let n = documents.len();
    let counts: Vec<BTreeMap<String, usize>> = documents
        .iter()
        .map(|doc| {
            let mut row = BTreeMap::new();
            for term in terms(doc) {
                *row.entry(term).or_insert(0) += 1;
            }
            row
        })
        .collect();

    let vocabulary = build_vocabulary(&counts, n, params);
    debug!("TF-IDF vocabulary: {} terms over {} documents", vocabulary.len(), n);

    let rows: Vec<BTreeMap<&str, f64>> = counts
        .iter()
        .map(|row| {
            let mut weighted: BTreeMap<&str, f64> = row
                .iter()
                .filter_map(|(term, &tf)| {
                    vocabulary
                        .get(term.as_str())
                        .map(|&idf| (term.as_str(), tf as f64 * idf))
                })
                .collect();
            let norm = weighted.values().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for w in weighted.values_mut() {
                    *w /= norm;
                }
            }
            weighted
        })
        .collect();

    let mut scores: Vec<BTreeMap<&str, f64>> = vec![BTreeMap::new(); k];
    let mut sizes = vec![0usize; k];
    for (row, &cluster) in rows.iter().zip(assignments) {
        if cluster >= k {
            continue;
        }
        sizes[cluster] += 1;
        for (&term, &w) in row {
            *scores[cluster].entry(term).or_insert(0.0) += w;
        }
    }

    scores
        .into_iter()
        .zip(sizes)
        .map(|(totals, size)| {
            let mut ranked: Vec<(&str, f64)> = totals
                .into_iter()
                .map(|(term, total)| (term, total / size.max(1) as f64))
                .filter(|(_, score)| *score > 0.0)
                .collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            ranked
                .into_iter()
                .take(params.top_terms)
                .map(|(term, _)| term.to_string())
                .collect()
        })
        .collect()
}

/// Term -> idf for every term surviving the document-frequency filters
fn build_vocabulary(
    counts: &[BTreeMap<String, usize>],
    n: usize,
    params: &TfidfParams,
) -> BTreeMap<String, f64> {
    let mut df: BTreeMap<&str, usize> = BTreeMap::new();
    let mut frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for row in counts {
        for (term, &tf) in row {
            *df.entry(term.as_str()).or_insert(0) += 1;
            *frequency.entry(term.as_str()).or_insert(0) += tf;
        }
    }

    let max_df = params.max_df_ratio * n as f64;
    let mut kept: Vec<(&str, usize)> = df
        .iter()
        .filter(|&(_, &d)| d >= params.min_df && d as f64 <= max_df)
        .map(|(&term, &d)| (term, d))
        .collect();

    if kept.len() > params.max_features {
        let mut by_frequency: Vec<&str> = kept.iter().map(|(term, _)| *term).collect();
        by_frequency.sort_by(|a, b| frequency[b].cmp(&frequency[a]).then_with(|| a.cmp(b)));
        let allowed: BTreeSet<&str> = by_frequency.into_iter().take(params.max_features).collect();
        kept.retain(|(term, _)| allowed.contains(term));
    }

    kept.into_iter()
        .map(|(term, d)| {
            let idf = ((1.0 + n as f64) / (1.0 + d as f64)).ln() + 1.0;
            (term.to_string(), idf)
        })
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// English stop words plus conversational fillers, sorted for binary search
const STOP_WORDS: &[&str] = &[
    "about", "above", "across", "after", "afterwards", "again", "against", "ah", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are", "around",
    "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming", "been",
    "before", "beforehand", "behind", "being", "below", "beside", "besides", "between", "beyond",
    "both", "but", "by", "can", "cannot", "could", "couldn", "did", "didn", "do", "does", "doesn",
    "doing", "don", "done", "down", "due", "during", "each", "eg", "eh", "either", "else",
    "elsewhere", "em", "enough", "er", "erm", "etc", "even", "ever", "every", "everyone",
    "everything", "everywhere", "except", "few", "for", "former", "formerly", "from", "further",
    "get", "give", "go", "going", "gonna", "got", "had", "has", "hasn", "have", "haven", "having",
    "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hers", "herself", "him",
    "himself", "his", "hm", "hmm", "how", "however", "ie", "if", "in", "indeed", "into", "is",
    "isn", "it", "its", "itself", "just", "keep", "kind", "know", "last", "latter", "latterly",
    "least", "less", "like", "ll", "made", "many", "may", "me", "meanwhile", "mhm", "might",
    "mine", "mm", "more", "moreover", "most", "mostly", "much", "must", "my", "myself", "namely",
    "neither", "never", "nevertheless", "next", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "oh", "ok", "okay", "on", "once", "one",
    "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out",
    "over", "own", "part", "per", "perhaps", "please", "put", "rather", "re", "really", "right",
    "same", "say", "see", "seem", "seemed", "seeming", "seems", "several", "she", "should",
    "shouldn", "since", "so", "some", "somehow", "someone", "something", "sometime", "sometimes",
    "somewhere", "still", "such", "take", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore", "therein",
    "thereupon", "these", "they", "thing", "things", "think", "this", "those", "though", "through",
    "throughout", "thru", "thus", "to", "together", "too", "toward", "towards", "uh", "um", "umm",
    "under", "until", "up", "upon", "us", "ve", "very", "via", "was", "wasn", "we", "well", "were",
    "weren", "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
    "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who",
    "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without", "won",
    "would", "wouldn", "yeah", "yes", "yet", "you", "your", "yours", "yourself", "yourselves",
];
