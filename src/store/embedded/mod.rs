//! Embedded document store on Tantivy.
//!
//! Each named index lives in its own directory under the store root:
//!
//! ```text
//! <root>/<index>/schema.json   index definition and generation
//! <root>/<index>/data/         tantivy files
//! ```
//!
//! Several processes may share a root. Opening an index for search takes
//! no lock; the writer lock is only taken on the first write. Every
//! recreation writes a new generation, and open handles whose generation
//! no longer matches the one on disk are dropped and reopened.

mod collector;
mod query;
mod schema;
mod tokenizer;

pub use tokenizer::EdgeNgramTokenizer;

use crate::indexing::IndexSchema;
use crate::models::ApodDocument;
use crate::store::{
    BulkItemFailure, BulkOutcome, DateRange, DocumentStore, MultiMatch, StoreConnector, StoreError,
    StoreHit, StoreQuery, StoreRequest, StoreResponse, StoreResult, YearBucket, MAX_RESULT_WINDOW,
};
use async_trait::async_trait;
use chrono::Utc;
use collector::YearCountCollector;
use schema::{build_schema, from_tantivy_doc, register_tokenizers, to_tantivy_doc, ApodFields};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, Query};
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

const SCHEMA_FILE: &str = "schema.json";
const DATA_DIR: &str = "data";

/// Default indexing memory budget per index writer
pub const DEFAULT_WRITER_HEAP_SIZE: usize = 50_000_000;

/// Contents of `schema.json`
#[derive(Debug, Serialize, Deserialize)]
struct IndexManifest {
    /// Creation time in nanoseconds, distinct for every recreation
    generation: i64,
    definition: IndexSchema,
}

impl IndexManifest {
    fn new(definition: &IndexSchema) -> Self {
        Self {
            generation: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            definition: definition.clone(),
        }
    }

    /// Manifest of the index in `dir`, `None` once the index is gone
    async fn read(dir: &Path) -> StoreResult<Option<Self>> {
        match tokio::fs::read(dir.join(SCHEMA_FILE)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// One open index
struct EmbeddedIndex {
    generation: i64,
    definition: IndexSchema,
    index: Index,
    fields: ApodFields,
    reader: IndexReader,
    heap_size: usize,
    writer: Mutex<Option<IndexWriter>>,
}

impl EmbeddedIndex {
    fn create(dir: &Path, definition: &IndexSchema, heap_size: usize) -> StoreResult<Self> {
        let data_dir = dir.join(DATA_DIR);
        std::fs::create_dir_all(&data_dir)?;

        let index = Index::create_in_dir(&data_dir, build_schema(definition))?;
        let manifest = IndexManifest::new(definition);
        std::fs::write(dir.join(SCHEMA_FILE), serde_json::to_vec_pretty(&manifest)?)?;
        Self::from_index(index, manifest, heap_size)
    }

    fn open(dir: &Path, manifest: IndexManifest, heap_size: usize) -> StoreResult<Self> {
        let index = Index::open_in_dir(dir.join(DATA_DIR))?;
        Self::from_index(index, manifest, heap_size)
    }

    fn from_index(index: Index, manifest: IndexManifest, heap_size: usize) -> StoreResult<Self> {
        register_tokenizers(&index, &manifest.definition);
        let fields = ApodFields::from_schema(&index.schema())?;

        // Picks up commits made by other processes sharing the root
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        Ok(Self {
            generation: manifest.generation,
            definition: manifest.definition,
            index,
            fields,
            reader,
            heap_size,
            writer: Mutex::new(None),
        })
    }

    /// The index writer, taking the writer lock on first use
    fn open_writer<'a>(&self, slot: &'a mut Option<IndexWriter>) -> StoreResult<&'a mut IndexWriter> {
        let writer = match slot.take() {
            Some(writer) => writer,
            None => {
                debug!(heap_size = self.heap_size, "Opening index writer");
                self.index.writer(self.heap_size)?
            }
        };
        Ok(slot.insert(writer))
    }

    /// Reject documents the mapping cannot hold
    fn validate(&self, document: &ApodDocument) -> StoreResult<()> {
        match (self.definition.vector_dims(), &document.embedding) {
            (Some(dims), Some(embedding)) if embedding.len() != dims => {
                Err(StoreError::Rejected(format!(
                    "embedding has {} dimensions, index expects {}",
                    embedding.len(),
                    dims
                )))
            }
            _ => Ok(()),
        }
    }

    fn commit(&self, writer: &mut IndexWriter) -> StoreResult<()> {
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    fn load(&self, searcher: &Searcher, address: DocAddress) -> StoreResult<ApodDocument> {
        let doc: TantivyDocument = searcher.doc(address)?;
        from_tantivy_doc(&self.fields, &doc)
    }

    fn text_search(
        &self,
        must: &[MultiMatch],
        filter: &[DateRange],
        request: &StoreRequest,
    ) -> StoreResult<StoreResponse> {
        let query = query::build_bool_query(&self.index, &self.fields, must, filter)?;
        let searcher = self.searcher();

        let mut response = StoreResponse::default();

        if request.size == 0 {
            response.total = searcher.search(&*query, &Count)? as u64;
        } else {
            let collector = TopDocs::with_limit(request.size).and_offset(request.from);
            let (top_docs, total) = searcher.search(&*query, &(collector, Count))?;
            response.total = total as u64;

            for (score, address) in top_docs {
                response.hits.push(StoreHit {
                    document: self.load(&searcher, address)?.without_embedding(),
                    score,
                });
            }
        }

        if request.aggregation.is_some() {
            response.buckets = self.year_buckets(&searcher, &*query)?;
        }

        Ok(response)
    }

    /// Calendar-year counts of the documents matching `query`, oldest first.
    fn year_buckets(&self, searcher: &Searcher, query: &dyn Query) -> StoreResult<Vec<YearBucket>> {
        let counts = searcher.search(query, &YearCountCollector)?;

        Ok(counts
            .into_iter()
            .map(|(year, doc_count)| YearBucket {
                key_as_string: format!("{:04}", year),
                doc_count,
            })
            .collect())
    }

    /// Exact nearest neighbours by cosine similarity over every stored vector.
    fn knn_search(
        &self,
        vector: &[f32],
        k: usize,
        filter: &[DateRange],
        request: &StoreRequest,
    ) -> StoreResult<StoreResponse> {
        if k > MAX_RESULT_WINDOW {
            return Err(StoreError::InvalidQuery(format!(
                "k must not exceed {}",
                MAX_RESULT_WINDOW
            )));
        }
        let dims = self.definition.vector_dims().ok_or_else(|| {
            StoreError::InvalidQuery("index has no dense vector field".to_string())
        })?;
        if vector.len() != dims {
            return Err(StoreError::InvalidQuery(format!(
                "query vector has {} dimensions, index expects {}",
                vector.len(),
                dims
            )));
        }

        let searcher = self.searcher();
        let mut scored: Vec<(f32, DocAddress, ApodDocument)> = Vec::new();

        for address in searcher.search(&AllQuery, &DocSetCollector)? {
            let document = self.load(&searcher, address)?;
            if !filter.iter().all(|range| range.contains(document.date)) {
                continue;
            }
            let Some(embedding) = document.embedding.as_deref() else {
                continue;
            };
            // Same scale as Elasticsearch's cosine similarity: (1 + cos) / 2
            let score = (1.0 + cosine_similarity(vector, embedding)) / 2.0;
            scored.push((score, address, document));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(k);

        let total = scored.len() as u64;
        let hits = scored
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(score, _, document)| StoreHit {
                document: document.without_embedding(),
                score,
            })
            .collect();

        Ok(StoreResponse {
            hits,
            total,
            buckets: Vec::new(),
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Document store backed by Tantivy indices on local disk
pub struct EmbeddedStore {
    root: PathBuf,
    writer_heap_size: usize,
    indices: RwLock<HashMap<String, Arc<EmbeddedIndex>>>,
}

impl EmbeddedStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            writer_heap_size: DEFAULT_WRITER_HEAP_SIZE,
            indices: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_writer_heap_size(mut self, bytes: usize) -> Self {
        self.writer_heap_size = bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_dir(&self, name: &str) -> StoreResult<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StoreError::InvalidIndexName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Open index handle matching the generation on disk.
    ///
    /// A cached handle is reused while its generation is current; an index
    /// recreated or deleted by another store is reopened or reported missing.
    async fn get(&self, name: &str) -> StoreResult<Arc<EmbeddedIndex>> {
        let dir = self.index_dir(name)?;

        let Some(manifest) = IndexManifest::read(&dir).await? else {
            if self.indices.write().await.remove(name).is_some() {
                debug!(index = %name, "Dropped handle of deleted index");
            }
            return Err(StoreError::IndexNotFound(name.to_string()));
        };

        if let Some(index) = self.indices.read().await.get(name) {
            if index.generation == manifest.generation {
                return Ok(index.clone());
            }
        }

        let mut indices = self.indices.write().await;
        if let Some(index) = indices.get(name) {
            if index.generation == manifest.generation {
                return Ok(index.clone());
            }
            debug!(index = %name, "Index was recreated, reopening");
        }

        debug!(index = %name, path = ?dir, "Opening embedded index");
        let index = Arc::new(EmbeddedIndex::open(&dir, manifest, self.writer_heap_size)?);
        indices.insert(name.to_string(), index.clone());
        Ok(index)
    }
}

#[async_trait]
impl DocumentStore for EmbeddedStore {
    fn backend_name(&self) -> &'static str {
        "embedded"
    }

    async fn ping(&self) -> StoreResult<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Transport(format!(
                "store root {} is not a directory",
                self.root.display()
            )))
        }
    }

    async fn delete_index(&self, name: &str) -> StoreResult<()> {
        let dir = self.index_dir(name)?;
        let removed = self.indices.write().await.remove(name);
        // Release the writer lock before the files go away
        drop(removed);

        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
            info!(index = %name, "Deleted embedded index");
        }
        Ok(())
    }

    async fn create_index(&self, name: &str, definition: &IndexSchema) -> StoreResult<()> {
        let dir = self.index_dir(name)?;
        let mut indices = self.indices.write().await;

        if dir.exists() {
            return Err(StoreError::IndexAlreadyExists(name.to_string()));
        }

        let index = EmbeddedIndex::create(&dir, definition, self.writer_heap_size)?;
        indices.insert(name.to_string(), Arc::new(index));

        info!(index = %name, schema = %definition.kind(), "Created embedded index");
        Ok(())
    }

    async fn bulk_write(
        &self,
        name: &str,
        documents: &[ApodDocument],
    ) -> StoreResult<BulkOutcome> {
        let index = self.get(name).await?;
        let mut failures = Vec::new();

        let mut slot = index.writer.lock().await;
        let writer = index.open_writer(&mut slot)?;
        for (position, document) in documents.iter().enumerate() {
            let added = index
                .validate(document)
                .and_then(|_| to_tantivy_doc(&index.fields, document))
                .and_then(|doc| writer.add_document(doc).map_err(StoreError::from));

            if let Err(e) = added {
                failures.push(BulkItemFailure {
                    position,
                    status: 400,
                    reason: e.to_string(),
                });
            }
        }
        index.commit(writer)?;

        Ok(BulkOutcome {
            submitted: documents.len(),
            failures,
        })
    }

    async fn write_one(&self, name: &str, document: &ApodDocument) -> StoreResult<()> {
        let index = self.get(name).await?;
        index.validate(document)?;
        let doc = to_tantivy_doc(&index.fields, document)?;

        let mut slot = index.writer.lock().await;
        let writer = index.open_writer(&mut slot)?;
        writer.add_document(doc)?;
        index.commit(writer)
    }

    async fn refresh(&self, name: &str) -> StoreResult<()> {
        let index = self.get(name).await?;
        index.reader.reload()?;
        Ok(())
    }

    async fn count(&self, name: &str) -> StoreResult<u64> {
        let index = self.get(name).await?;
        Ok(index.searcher().num_docs())
    }

    async fn search(&self, name: &str, request: &StoreRequest) -> StoreResult<StoreResponse> {
        if request.window_end().is_none() {
            return Err(StoreError::InvalidQuery(format!(
                "from + size must not exceed {}",
                MAX_RESULT_WINDOW
            )));
        }
        let index = self.get(name).await?;

        match &request.query {
            StoreQuery::Bool { must, filter } => index.text_search(must, filter, request),
            StoreQuery::Knn {
                vector, k, filter, ..
            } => index.knn_search(vector, *k, filter, request),
        }
    }
}

/// Opens the embedded store at a fixed root directory
pub struct EmbeddedConnector {
    root: PathBuf,
}

impl EmbeddedConnector {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl StoreConnector for EmbeddedConnector {
    fn describe(&self) -> String {
        format!("embedded store at {}", self.root.display())
    }

    async fn connect(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        let store = EmbeddedStore::open(&self.root)?;
        store.ping().await?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::default_match_fields;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn doc(title: &str, explanation: &str, date: &str) -> ApodDocument {
        ApodDocument::new(
            title,
            explanation,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            format!("{}.jpg", title.to_lowercase().replace(' ', "_")),
        )
    }

    fn text(query: &str) -> StoreRequest {
        StoreRequest::new(StoreQuery::Bool {
            must: vec![MultiMatch {
                query: query.to_string(),
                fields: default_match_fields(),
            }],
            filter: vec![],
        })
    }

    async fn store_with(definition: IndexSchema, docs: &[ApodDocument]) -> (TempDir, EmbeddedStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = EmbeddedStore::open(temp_dir.path()).unwrap();
        store.create_index("apod", &definition).await.unwrap();
        store.bulk_write("apod", docs).await.unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_create_existing_index_fails() {
        let (_dir, store) = store_with(IndexSchema::standard(), &[]).await;
        let result = store.create_index("apod", &IndexSchema::standard()).await;
        assert!(matches!(result, Err(StoreError::IndexAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_delete_absent_index_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let store = EmbeddedStore::open(temp_dir.path()).unwrap();
        store.delete_index("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_search_unknown_index() {
        let temp_dir = TempDir::new().unwrap();
        let store = EmbeddedStore::open(temp_dir.path()).unwrap();
        let result = store.search("missing", &text("moon")).await;
        assert!(matches!(result, Err(StoreError::IndexNotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_path_like_index_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = EmbeddedStore::open(temp_dir.path()).unwrap();
        let result = store.create_index("../escape", &IndexSchema::standard()).await;
        assert!(matches!(result, Err(StoreError::InvalidIndexName(_))));
    }

    #[tokio::test]
    async fn test_title_matches_outrank_explanation_matches() {
        let docs = vec![
            doc("Spiral Galaxy", "A view of stars.", "2019-01-01"),
            doc("Star Field", "A spiral arm seen edge on.", "2019-01-02"),
        ];
        let (_dir, store) = store_with(IndexSchema::standard(), &docs).await;

        let response = store.search("apod", &text("spiral")).await.unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(response.hits[0].document.title, "Spiral Galaxy");
        assert!(response.hits[0].score > response.hits[1].score);
    }

    #[tokio::test]
    async fn test_pagination_window() {
        let docs: Vec<ApodDocument> = (1..=5)
            .map(|i| doc(&format!("Comet {}", i), "A comet.", &format!("2020-01-0{}", i)))
            .collect();
        let (_dir, store) = store_with(IndexSchema::standard(), &docs).await;

        let response = store
            .search("apod", &text("comet").with_page(3, 10))
            .await
            .unwrap();
        assert_eq!(response.total, 5);
        assert_eq!(response.hits.len(), 2);

        let counted = store
            .search("apod", &text("comet").with_page(0, 0))
            .await
            .unwrap();
        assert_eq!(counted.total, 5);
        assert!(counted.hits.is_empty());
    }

    #[tokio::test]
    async fn test_page_past_result_window_is_rejected() {
        let (_dir, store) = store_with(IndexSchema::standard(), &[]).await;

        for (from, size) in [(1, usize::MAX), (0, 1 << 40), (MAX_RESULT_WINDOW, 1)] {
            let result = store.search("apod", &text("comet").with_page(from, size)).await;
            assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
        }
    }

    #[tokio::test]
    async fn test_image_url_is_not_tokenized() {
        let docs = vec![doc("Moon", "Craters.", "2019-05-05")];
        let (_dir, store) = store_with(IndexSchema::standard(), &docs).await;

        let request = StoreRequest::new(StoreQuery::Bool {
            must: vec![MultiMatch {
                query: "moon".to_string(),
                fields: vec![crate::store::BoostedField::new("image_url", 1.0)],
            }],
            filter: vec![],
        });
        let result = store.search("apod", &request).await;
        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_bulk_write_reports_dimension_mismatch() {
        let docs = vec![
            doc("Aurora", "Green light.", "2021-03-01").with_embedding(vec![1.0, 0.0, 0.0]),
            doc("Eclipse", "Shadow.", "2021-03-02").with_embedding(vec![1.0, 0.0]),
        ];
        let temp_dir = TempDir::new().unwrap();
        let store = EmbeddedStore::open(temp_dir.path()).unwrap();
        store
            .create_index("apod", &IndexSchema::dense_vector(3))
            .await
            .unwrap();

        let outcome = store.bulk_write("apod", &docs).await.unwrap();
        assert_eq!(outcome.written(), 1);
        assert_eq!(outcome.failures[0].position, 1);
        assert_eq!(store.count("apod").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_knn_orders_by_similarity() {
        let temp_dir = TempDir::new().unwrap();
        let store = EmbeddedStore::open(temp_dir.path()).unwrap();
        store
            .create_index("vectors", &IndexSchema::dense_vector(2))
            .await
            .unwrap();
        for (title, vector) in [("East", vec![1.0, 0.0]), ("North", vec![0.0, 1.0]), ("NorthEast", vec![0.7, 0.7])] {
            store
                .write_one("vectors", &doc(title, "Direction.", "2022-01-01").with_embedding(vector))
                .await
                .unwrap();
        }

        let request = StoreRequest::new(StoreQuery::Knn {
            vector: vec![1.0, 0.1],
            k: 2,
            num_candidates: 100,
            filter: vec![],
        });
        let response = store.search("vectors", &request).await.unwrap();

        assert_eq!(response.total, 2);
        assert_eq!(response.hits[0].document.title, "East");
        assert_eq!(response.hits[1].document.title, "NorthEast");
        assert!(response.hits[0].document.embedding.is_none());
    }

    #[tokio::test]
    async fn test_index_reopens_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = EmbeddedStore::open(temp_dir.path()).unwrap();
            store.create_index("apod", &IndexSchema::edge_ngram()).await.unwrap();
            store
                .bulk_write("apod", &[doc("Apollo Landing", "Moon walk.", "1969-07-20")])
                .await
                .unwrap();
        }

        let store = EmbeddedStore::open(temp_dir.path()).unwrap();
        let response = store.search("apod", &text("ap")).await.unwrap();
        assert_eq!(response.total, 1);
    }

    #[tokio::test]
    async fn test_second_store_on_same_root_follows_recreation() {
        let temp_dir = TempDir::new().unwrap();
        let loader = EmbeddedStore::open(temp_dir.path()).unwrap();
        loader.create_index("apod", &IndexSchema::standard()).await.unwrap();
        loader
            .bulk_write("apod", &[doc("Moon", "Craters.", "2019-05-05")])
            .await
            .unwrap();

        // The loader still holds the writer lock here
        let server = EmbeddedStore::open(temp_dir.path()).unwrap();
        assert_eq!(server.search("apod", &text("moon")).await.unwrap().total, 1);

        loader.delete_index("apod").await.unwrap();
        let result = server.search("apod", &text("moon")).await;
        assert!(matches!(result, Err(StoreError::IndexNotFound(_))));

        loader.create_index("apod", &IndexSchema::standard()).await.unwrap();
        loader
            .bulk_write("apod", &[doc("Mars", "Red dust.", "2020-02-02")])
            .await
            .unwrap();

        assert_eq!(server.search("apod", &text("mars")).await.unwrap().total, 1);
        assert_eq!(server.search("apod", &text("moon")).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_stale_handle_is_replaced_after_recreation_elsewhere() {
        let temp_dir = TempDir::new().unwrap();
        let server = EmbeddedStore::open(temp_dir.path()).unwrap();
        server.create_index("apod", &IndexSchema::standard()).await.unwrap();
        server
            .bulk_write("apod", &[doc("Moon", "Craters.", "2019-05-05")])
            .await
            .unwrap();
        assert_eq!(server.count("apod").await.unwrap(), 1);

        let loader = EmbeddedStore::open(temp_dir.path()).unwrap();
        loader.delete_index("apod").await.unwrap();
        loader.create_index("apod", &IndexSchema::standard()).await.unwrap();

        assert_eq!(server.count("apod").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_year_buckets_span_segments() {
        let (_dir, store) = store_with(
            IndexSchema::standard(),
            &[
                doc("Comet West", "A bright comet.", "1976-03-09"),
                doc("Comet Hale", "A great comet.", "1997-04-01"),
            ],
        )
        .await;
        store
            .bulk_write(
                "apod",
                &[
                    doc("Comet Hyakutake", "A blue comet.", "1996-03-25"),
                    doc("Comet Hale Again", "The same comet.", "1997-12-31"),
                ],
            )
            .await
            .unwrap();

        let request = text("comet").with_page(0, 0).with_year_histogram("docs_per_year");
        let response = store.search("apod", &request).await.unwrap();

        let buckets: Vec<(&str, u64)> = response
            .buckets
            .iter()
            .map(|bucket| (bucket.key_as_string.as_str(), bucket.doc_count))
            .collect();
        assert_eq!(buckets, vec![("1976", 1), ("1996", 1), ("1997", 2)]);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
