use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An externally segmented span of transcript text with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    /// Transcript the chunk was cut from
    pub filename: String,
    /// Position within that transcript
    pub chunk_index: usize,
    pub text: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

/// A topic discovered by clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCluster {
    pub id: usize,
    pub label: String,
    pub top_terms: Vec<String>,
    pub centroid: Vec<f32>,
    pub member_chunk_ids: Vec<String>,
}

impl TopicCluster {
    pub fn size(&self) -> usize {
        self.member_chunk_ids.len()
    }
}

/// Catalog entry referenced by `top_topics` ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCatalogEntry {
    pub id: usize,
    pub label: String,
    pub top_terms: Vec<String>,
    pub size: usize,
}

impl From<&TopicCluster> for TopicCatalogEntry {
    fn from(cluster: &TopicCluster) -> Self {
        Self {
            id: cluster.id,
            label: cluster.label.clone(),
            top_terms: cluster.top_terms.clone(),
            size: cluster.size(),
        }
    }
}

/// Topic statistics for one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTopicStats {
    pub total_chunks: usize,
    /// Cluster id -> member chunk count
    pub topic_counts: BTreeMap<usize, usize>,
    /// Cluster id -> fraction of the file's chunks
    pub topic_share: BTreeMap<usize, f64>,
    pub top_topics: Vec<usize>,
    pub switch_count: usize,
    /// `"a->b"` -> number of transitions
    pub switches: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicExample {
    pub topic_id: usize,
    pub filename: String,
    pub chunk_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchExample {
    pub from_topic: usize,
    pub to_topic: usize,
    pub filename: String,
    pub chunk_index: usize,
    pub snippet: String,
}

/// Diagnostics from the clustering pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusteringStats {
    pub chunks_received: usize,
    pub chunks_clustered: usize,
    pub chunks_excluded: usize,
    pub k_requested: usize,
    pub k_used: usize,
    pub iterations: usize,
    pub converged: bool,
    pub inertia: f64,
}
