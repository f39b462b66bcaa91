use tracing::{info, warn};

use crate::config::TopicConfig;
use crate::models::Chunk;
use crate::topics::{cluster, TopicModel};

/// Execute Stage 2: corpus-wide topic clustering
///
/// The single barrier in the pipeline: it takes the whole chunk set at
/// once and runs on the blocking pool, parallelized internally.
pub async fn execute_stage2(chunks: Vec<Chunk>, config: TopicConfig) -> TopicModel {
    if chunks.is_empty() {
        info!("Stage 2: no chunks supplied, topic fields stay empty");
        return TopicModel::default();
    }

    info!("Stage 2: clustering {} chunks into up to {} topics", chunks.len(), config.k);
    match tokio::task::spawn_blocking(move || cluster(chunks, &config)).await {
        Ok(model) => model,
        Err(e) => {
            warn!("Topic clustering task failed, topic fields stay empty: {}", e);
            TopicModel::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_chunks_yields_empty_model() {
        let model = execute_stage2(Vec::new(), TopicConfig::default()).await;

        assert!(model.clusters.is_empty());
        assert_eq!(model.stats.chunks_received, 0);
    }

    #[tokio::test]
    async fn test_clusters_on_blocking_pool() {
        let chunks = (0..4)
            .map(|i| Chunk {
                chunk_id: format!("c{}", i),
                filename: "a.txt".to_string(),
                chunk_index: i,
                text: format!("garden talk {}", i),
                embedding: Some(vec![i as f32, 0.0]),
            })
            .collect();
        let config = TopicConfig {
            k: 2,
            ..Default::default()
        };

        let model = execute_stage2(chunks, config).await;

        assert_eq!(model.stats.k_used, 2);
        assert_eq!(model.assignments.len(), 4);
    }
}
