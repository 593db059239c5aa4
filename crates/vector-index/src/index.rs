use crate::embeddings::{ensure_dimension, EmbeddingProvider};
use crate::error::{Result, VectorIndexError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

/// One query hit: chunk text plus its id and cosine similarity.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub score: f32,
}

struct IndexEntry {
    id: String,
    vector: Vec<f32>,
    text: String,
}

struct Collection {
    entries: Vec<IndexEntry>,
}

/// Per-project in-memory vector collections.
///
/// `reindex` is the only mutator and `query_*` the only readers. Rebuilds for
/// one project are serialized through a per-collection async mutex; the swap
/// itself (drop old, install new) happens in one short write-lock section so
/// readers never see chunks from two different index runs at once.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    window_words: usize,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    writers: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, window_words: usize) -> Self {
        Self {
            embedder,
            window_words,
            collections: RwLock::new(HashMap::new()),
            writers: Mutex::new(HashMap::new()),
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Rebuild the collection for `project_id` from scratch.
    ///
    /// Every document is chunked into word windows, all chunks are embedded
    /// up front, and only then is the previous collection replaced. A failure
    /// during embedding leaves the previous collection untouched.
    pub async fn reindex(
        &self,
        project_id: &str,
        documents: &BTreeMap<String, String>,
    ) -> Result<usize> {
        let writer = self.writer_for(project_id);
        let _guard = writer.lock().await;

        let mut chunks = Vec::new();
        for (filename, text) in documents {
            chunks.extend(dossier_chunker::chunk_document(
                filename,
                text,
                self.window_words,
            ));
        }
        log::info!(
            "Reindexing '{}': {} documents, {} chunks",
            project_id,
            documents.len(),
            chunks.len()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(VectorIndexError::EmbeddingError(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let expected = self.embedder.dimension();
        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors.into_iter()) {
            ensure_dimension(&vector, expected)?;
            entries.push(IndexEntry {
                id: chunk.id,
                vector,
                text: chunk.text,
            });
        }
        let count = entries.len();

        {
            let mut collections = self
                .collections
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            // Delete-before-insert: no stale residue from a previous run.
            collections.remove(project_id);
            collections.insert(project_id.to_string(), Arc::new(Collection { entries }));
        }

        log::info!("Collection '{project_id}' now holds {count} entries");
        Ok(count)
    }

    /// Query by raw text; the text is embedded first.
    pub async fn query_text(
        &self,
        project_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let vector = self.embedder.embed(query).await?;
        self.query_vector(project_id, &vector, k)
    }

    /// Query by an already-computed embedding vector.
    pub fn query_vector(
        &self,
        project_id: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        ensure_dimension(vector, self.embedder.dimension())?;
        let collection = {
            let collections = self
                .collections
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            collections
                .get(project_id)
                .cloned()
                .ok_or_else(|| VectorIndexError::NotIndexed(project_id.to_string()))?
        };

        let mut scored: Vec<ScoredChunk> = collection
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                id: entry.id.clone(),
                text: entry.text.clone(),
                score: dot(vector, &entry.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        log::debug!(
            "Query on '{}' returned {} of {} entries",
            project_id,
            scored.len(),
            collection.entries.len()
        );
        Ok(scored)
    }

    /// Number of entries currently indexed for `project_id`.
    pub fn len(&self, project_id: &str) -> usize {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        collections
            .get(project_id)
            .map_or(0, |collection| collection.entries.len())
    }

    pub fn is_empty(&self, project_id: &str) -> bool {
        self.len(project_id) == 0
    }

    pub fn chunk_ids(&self, project_id: &str) -> Vec<String> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        collections.get(project_id).map_or_else(Vec::new, |c| {
            c.entries.iter().map(|e| e.id.clone()).collect()
        })
    }

    fn writer_for(&self, project_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut writers = self
            .writers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writers
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Collection key for an organization + project pair.
///
/// Matches the on-disk project identity: `{organization}_{project}` with all
/// whitespace replaced by underscores.
pub fn collection_id(organization: &str, project: &str) -> String {
    let raw = format!("{organization}_{project}");
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
