use crate::question::bounded_prefix;
use dossier_vector_index::{ScoredChunk, VectorIndex};

const QUESTION_K: usize = 3;
const FALLBACK_K: usize = 5;
const FALLBACK_PREFIX_CHARS: usize = 2000;
const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Aggregate retrieval context for one audit.
///
/// With questions, each one is queried in order and contributes a labeled
/// block. Without questions (economy mode), a bounded prefix of the addendum
/// itself is queried once with a wider `k`. Retrieval failure degrades into
/// a single block naming the failure, never an abort.
pub async fn build_context(
    index: &VectorIndex,
    project_id: &str,
    questions: &[String],
    addendum_text: &str,
) -> String {
    if questions.is_empty() {
        log::info!("No retrieval questions, falling back to direct addendum search");
        let prefix = bounded_prefix(addendum_text, FALLBACK_PREFIX_CHARS);
        return match index.query_text(project_id, prefix, FALLBACK_K).await {
            Ok(chunks) => format!("Result for direct addendum search:\n{}", join_chunks(&chunks)),
            Err(err) => degraded_block(&err.to_string()),
        };
    }

    let mut blocks = Vec::with_capacity(questions.len());
    for question in questions {
        match index.query_text(project_id, question, QUESTION_K).await {
            Ok(chunks) => {
                log::debug!("Question '{question}' matched {} chunks", chunks.len());
                blocks.push(format!("Result for '{question}':\n{}", join_chunks(&chunks)));
            }
            Err(err) => return degraded_block(&err.to_string()),
        }
    }
    blocks.join(BLOCK_SEPARATOR)
}

fn join_chunks(chunks: &[ScoredChunk]) -> String {
    if chunks.is_empty() {
        return "(no matching passages found)".to_string();
    }
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn degraded_block(reason: &str) -> String {
    log::warn!("Context retrieval failed, auditing without reference passages: {reason}");
    format!(
        "Data acquisition from the project's reference file failed: {reason}. \
         No reference passages are available for this audit."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_vector_index::HashEmbedder;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn docs(text: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("ref.txt".to_string(), text.to_string())])
    }

    #[tokio::test]
    async fn questions_produce_one_labeled_block_each() {
        let index = VectorIndex::new(Arc::new(HashEmbedder::default()), 400);
        index
            .reindex("acme_tower", &docs("hourly rate is 48 per hour for trade X"))
            .await
            .unwrap();

        let questions = vec![
            "What is the hourly rate?".to_string(),
            "Which trade is contracted?".to_string(),
        ];
        let context = build_context(&index, "acme_tower", &questions, "addendum").await;

        assert!(context.contains("Result for 'What is the hourly rate?':"));
        assert!(context.contains("Result for 'Which trade is contracted?':"));
        assert_eq!(context.matches("\n\n---\n\n").count(), 1);
    }

    #[tokio::test]
    async fn empty_questions_fall_back_to_direct_search() {
        let index = VectorIndex::new(Arc::new(HashEmbedder::default()), 400);
        index
            .reindex("acme_tower", &docs("hourly rate is 48"))
            .await
            .unwrap();

        let context = build_context(&index, "acme_tower", &[], "additional 10 hours").await;
        assert!(context.starts_with("Result for direct addendum search:"));
    }

    #[tokio::test]
    async fn unindexed_project_degrades_to_failure_block() {
        let index = VectorIndex::new(Arc::new(HashEmbedder::default()), 400);
        let questions = vec!["anything".to_string()];
        let context = build_context(&index, "ghost_project", &questions, "addendum").await;
        assert!(context.contains("Data acquisition from the project's reference file failed"));
        assert!(context.contains("ghost_project"));
    }
}
