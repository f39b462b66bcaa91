pub mod kmeans;
pub mod tfidf;

pub use kmeans::*;
pub use tfidf::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TopicConfig;
use crate::extract::snippet;
use crate::models::{
    Chunk, ClusteringStats, FileTopicStats, SwitchExample, TopicCatalogEntry, TopicCluster,
    TopicExample,
};

/// Cluster membership of one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkAssignment {
    pub chunk_id: String,
    pub filename: String,
    pub chunk_index: usize,
    pub topic: usize,
    pub text: String,
}

/// Run-scoped clustering output
#[derive(Debug, Clone, Default)]
pub struct TopicModel {
    pub clusters: Vec<TopicCluster>,
    /// Ordered by filename, then chunk index
    pub assignments: Vec<ChunkAssignment>,
    pub stats: ClusteringStats,
}

impl TopicModel {
    pub fn catalog(&self) -> Vec<TopicCatalogEntry> {
        self.clusters.iter().map(TopicCatalogEntry::from).collect()
    }

    /// Topic ids of each file's chunks in document order
    fn sequences(&self) -> BTreeMap<&str, Vec<&ChunkAssignment>> {
        let mut by_file: BTreeMap<&str, Vec<&ChunkAssignment>> = BTreeMap::new();
        for assignment in &self.assignments {
            by_file
                .entry(assignment.filename.as_str())
                .or_default()
                .push(assignment);
        }
        for chunks in by_file.values_mut() {
            chunks.sort_by_key(|a| a.chunk_index);
        }
        by_file
    }

    /// Topic statistics for every file that had at least one clustered chunk
    pub fn per_file(&self, top_n: usize) -> BTreeMap<String, FileTopicStats> {
        self.sequences()
            .into_iter()
            .map(|(filename, chunks)| {
                let topics: Vec<usize> = chunks.iter().map(|a| a.topic).collect();
                (filename.to_string(), file_topic_stats(&topics, top_n))
            })
            .collect()
    }

    /// Up to `per_topic` member chunks per topic
    pub fn topic_examples(&self, per_topic: usize, snippet_chars: usize) -> Vec<TopicExample> {
        let mut taken: BTreeMap<usize, usize> = BTreeMap::new();
        let mut examples = Vec::new();

        for assignment in &self.assignments {
            let count = taken.entry(assignment.topic).or_insert(0);
            if *count >= per_topic {
                continue;
            }
            *count += 1;
            examples.push(TopicExample {
                topic_id: assignment.topic,
                filename: assignment.filename.clone(),
                chunk_index: assignment.chunk_index,
                text: snippet(&assignment.text, snippet_chars),
            });
        }

        examples.sort_by_key(|e| e.topic_id);
        examples
    }

    /// Up to `per_transition` examples of each `a -> b` topic switch, the
    /// snippet taken from the chunk the conversation switched into
    pub fn switch_examples(&self, per_transition: usize, snippet_chars: usize) -> Vec<SwitchExample> {
        let mut taken: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        let mut examples = Vec::new();

        for chunks in self.sequences().values() {
            for pair in chunks.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                if from.topic == to.topic {
                    continue;
                }
                let count = taken.entry((from.topic, to.topic)).or_insert(0);
                if *count >= per_transition {
                    continue;
                }
                *count += 1;
                examples.push(SwitchExample {
                    from_topic: from.topic,
                    to_topic: to.topic,
                    filename: to.filename.clone(),
                    chunk_index: to.chunk_index,
                    snippet: snippet(&to.text, snippet_chars),
                });
            }
        }

        examples.sort_by_key(|e| (e.from_topic, e.to_topic));
        examples
    }
}

/// Keep only chunks that can be clustered
///
/// Chunks are first put in (filename, chunk index) order. A chunk is
/// dropped when its text is blank, its embedding is missing, empty or
/// non-finite, or its dimension differs from the first usable chunk's.
/// Returns the survivors and the number dropped.
pub fn validate_chunks(mut chunks: Vec<Chunk>) -> (Vec<Chunk>, usize) {
    chunks.sort_by(|a, b| {
        (a.filename.as_str(), a.chunk_index, a.chunk_id.as_str()).cmp(&(
            b.filename.as_str(),
            b.chunk_index,
            b.chunk_id.as_str(),
        ))
    });

    let mut dimension: Option<usize> = None;
    let mut valid = Vec::with_capacity(chunks.len());
    let mut excluded = 0;

    for chunk in chunks {
        let reason = match chunk.embedding.as_deref() {
            _ if chunk.text.trim().is_empty() => Some("blank text"),
            None => Some("missing embedding"),
            Some([]) => Some("empty embedding"),
            Some(e) if e.iter().any(|x| !x.is_finite()) => Some("non-finite embedding"),
            Some(e) if dimension.is_some_and(|d| d != e.len()) => Some("dimension mismatch"),
            Some(_) => None,
        };

        match reason {
            Some(reason) => {
                debug!("Excluding chunk {} of {}: {}", chunk.chunk_id, chunk.filename, reason);
                excluded += 1;
            }
            None => {
                if dimension.is_none() {
                    dimension = chunk.embedding.as_ref().map(Vec::len);
                }
                valid.push(chunk);
            }
        }
    }

    (valid, excluded)
}

/// Cluster the corpus's chunks into topics and label each topic
///
/// This is the one corpus-wide step; it needs every chunk before it can
/// start. With fewer usable chunks than `k`, `k` shrinks to the chunk
/// count. No usable chunks yields an empty model.
pub fn cluster(chunks: Vec<Chunk>, config: &TopicConfig) -> TopicModel {
    let received = chunks.len();
    let (mut valid, excluded) = validate_chunks(chunks);

    let mut stats = ClusteringStats {
        chunks_received: received,
        chunks_clustered: valid.len(),
        chunks_excluded: excluded,
        k_requested: config.k,
        ..Default::default()
    };
    if excluded > 0 {
        warn!("Excluded {} of {} chunks from clustering", excluded, received);
    }
    if valid.is_empty() {
        warn!("No usable chunks, skipping topic clustering");
        return TopicModel {
            stats,
            ..Default::default()
        };
    }

    let k = config.k.min(valid.len());
    if k < config.k {
        warn!("Only {} usable chunks, reducing k from {} to {}", valid.len(), config.k, k);
    }

    let points: Vec<Vec<f32>> = valid
        .iter_mut()
        .map(|chunk| chunk.embedding.take().unwrap_or_default())
        .collect();

    let result = fit(
        &points,
        &KMeansParams {
            k,
            max_iterations: config.max_iterations,
            n_init: config.n_init,
            tolerance: config.tolerance,
            seed: config.seed,
        },
    );
    if !result.converged {
        warn!(
            "k-means stopped at the iteration cap ({}) without converging, keeping best effort",
            config.max_iterations
        );
    }

    let documents: Vec<&str> = valid.iter().map(|c| c.text.as_str()).collect();
    let terms = cluster_terms(
        &documents,
        &result.assignments,
        k,
        &TfidfParams {
            min_df: config.min_df,
            max_df_ratio: config.max_df_ratio,
            max_features: config.max_features,
            top_terms: config.top_terms,
        },
    );

    let mut clusters: Vec<TopicCluster> = result
        .centroids
        .iter()
        .zip(terms)
        .enumerate()
        .map(|(id, (centroid, top_terms))| TopicCluster {
            id,
            label: topic_label(id, &top_terms, config.label_terms),
            top_terms,
            centroid: centroid.clone(),
            member_chunk_ids: Vec::new(),
        })
        .collect();

    let assignments: Vec<ChunkAssignment> = valid
        .into_iter()
        .zip(&result.assignments)
        .map(|(chunk, &topic)| {
            clusters[topic].member_chunk_ids.push(chunk.chunk_id.clone());
            ChunkAssignment {
                chunk_id: chunk.chunk_id,
                filename: chunk.filename,
                chunk_index: chunk.chunk_index,
                topic,
                text: chunk.text,
            }
        })
        .collect();

    stats.k_used = k;
    stats.iterations = result.iterations;
    stats.converged = result.converged;
    stats.inertia = result.inertia;

    info!(
        "Clustered {} chunks into {} topics (inertia {:.4}, {} iterations)",
        assignments.len(),
        k,
        result.inertia,
        result.iterations
    );

    TopicModel {
        clusters,
        assignments,
        stats,
    }
}

fn topic_label(id: usize, top_terms: &[String], label_terms: usize) -> String {
    if top_terms.is_empty() {
        return format!("Topic {}", id);
    }
    top_terms
        .iter()
        .take(label_terms.max(1))
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Share, top topics and switches for one file's topic sequence
///
/// `topics` must be in document order. A switch is any adjacent pair with
/// different topics.
pub fn file_topic_stats(topics: &[usize], top_n: usize) -> FileTopicStats {
    let total = topics.len();
    let mut topic_counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &topic in topics {
        *topic_counts.entry(topic).or_insert(0) += 1;
    }

    let topic_share = topic_counts
        .iter()
        .map(|(&topic, &count)| (topic, count as f64 / total as f64))
        .collect();

    let mut ranked: Vec<(usize, usize)> = topic_counts.iter().map(|(&t, &c)| (t, c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_topics = ranked.into_iter().take(top_n).map(|(t, _)| t).collect();

    let mut switches: BTreeMap<String, usize> = BTreeMap::new();
    for pair in topics.windows(2) {
        if pair[0] != pair[1] {
            *switches.entry(format!("{}->{}", pair[0], pair[1])).or_insert(0) += 1;
        }
    }

    FileTopicStats {
        total_chunks: total,
        topic_counts,
        topic_share,
        top_topics,
        switch_count: switches.values().sum(),
        switches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(filename: &str, index: usize, text: &str, embedding: Option<Vec<f32>>) -> Chunk {
        Chunk {
            chunk_id: format!("{}#{}", filename, index),
            filename: filename.to_string(),
            chunk_index: index,
            text: text.to_string(),
            embedding,
        }
    }

    fn config(k: usize) -> TopicConfig {
        TopicConfig {
            k,
            min_df: 1,
            max_df_ratio: 1.0,
            ..Default::default()
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("a.txt", 0, "garden flowers roses", Some(vec![0.0, 0.1])),
            chunk("a.txt", 1, "garden flowers tulips", Some(vec![0.1, 0.0])),
            chunk("a.txt", 2, "music piano songs", Some(vec![5.0, 5.1])),
            chunk("b.txt", 0, "music piano concert", Some(vec![5.1, 5.0])),
            chunk("b.txt", 1, "garden flowers weeds", Some(vec![0.05, 0.05])),
        ]
    }

    #[test]
    fn test_switch_count() {
        let (a, b) = (0, 1);

        let stats = file_topic_stats(&[a, a, b, b, a], 3);
        assert_eq!(stats.switch_count, 2);
        assert_eq!(stats.switches.get("0->1"), Some(&1));
        assert_eq!(stats.switches.get("1->0"), Some(&1));

        assert_eq!(file_topic_stats(&[a, a, a], 3).switch_count, 0);
    }

    #[test]
    fn test_topic_share_and_top_topics() {
        let stats = file_topic_stats(&[2, 2, 1, 0, 1, 2], 2);

        assert_eq!(stats.total_chunks, 6);
        assert_eq!(stats.topic_share.get(&2), Some(&0.5));
        assert!((stats.topic_share.values().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(stats.top_topics, vec![2, 1]);
    }

    #[test]
    fn test_top_topic_ties_break_by_id() {
        let stats = file_topic_stats(&[3, 1, 3, 1], 5);
        assert_eq!(stats.top_topics, vec![1, 3]);
    }

    #[test]
    fn test_invalid_chunks_are_excluded() {
        let chunks = vec![
            chunk("a.txt", 0, "first", Some(vec![1.0, 2.0])),
            chunk("a.txt", 1, "no vector", None),
            chunk("a.txt", 2, "empty vector", Some(vec![])),
            chunk("a.txt", 3, "wrong size", Some(vec![1.0, 2.0, 3.0])),
            chunk("a.txt", 4, "nan", Some(vec![f32::NAN, 1.0])),
            chunk("a.txt", 5, "   ", Some(vec![1.0, 2.0])),
            chunk("a.txt", 6, "second", Some(vec![3.0, 4.0])),
        ];

        let (valid, excluded) = validate_chunks(chunks);

        assert_eq!(excluded, 5);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[1].text, "second");
    }

    #[test]
    fn test_cluster_assigns_every_valid_chunk() {
        let model = cluster(corpus(), &config(2));

        assert_eq!(model.stats.chunks_clustered, 5);
        assert_eq!(model.stats.k_used, 2);
        assert_eq!(model.clusters.len(), 2);
        assert_eq!(model.clusters.iter().map(TopicCluster::size).sum::<usize>(), 5);

        let per_file = model.per_file(3);
        assert_eq!(per_file["a.txt"].total_chunks, 3);
        assert_eq!(per_file["a.txt"].switch_count, 1);
        assert_eq!(per_file["b.txt"].switch_count, 1);

        let garden = model.assignments[0].topic;
        assert!(model.clusters[garden].label.contains("garden"));
    }

    #[test]
    fn test_cluster_is_deterministic() {
        let first = cluster(corpus(), &config(2));
        let second = cluster(corpus(), &config(2));

        assert_eq!(first.clusters, second.clusters);
        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_k_shrinks_to_chunk_count() {
        let model = cluster(corpus(), &config(15));

        assert_eq!(model.stats.k_requested, 15);
        assert_eq!(model.stats.k_used, 5);
    }

    #[test]
    fn test_no_usable_chunks() {
        let model = cluster(vec![chunk("a.txt", 0, "text", None)], &config(3));

        assert!(model.clusters.is_empty());
        assert!(model.per_file(3).is_empty());
        assert_eq!(model.stats.chunks_excluded, 1);
    }

    #[test]
    fn test_switch_examples_are_capped() {
        let model = cluster(corpus(), &config(2));
        let examples = model.switch_examples(1, 10);

        assert!(!examples.is_empty());
        assert!(examples.iter().all(|e| e.from_topic != e.to_topic));
        assert!(examples.iter().all(|e| e.snippet.chars().count() <= 10));

        let topic_examples = model.topic_examples(1, 300);
        assert_eq!(topic_examples.len(), 2);
    }

    #[test]
    fn test_label_falls_back_to_topic_id() {
        assert_eq!(topic_label(4, &[], 3), "Topic 4");
        let terms = vec!["garden".to_string(), "roses".to_string(), "tea".to_string()];
        assert_eq!(topic_label(0, &terms, 2), "garden, roses");
    }
}
