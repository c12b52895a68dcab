//! In-process fakes for the pipeline's capability traits.
//!
//! These stand in for the embedding provider, generation provider, text
//! extractor, and both store traits so pipeline behavior can be tested
//! without network access or a database.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use regseek::db::{
    IngestionStatusRow, NewPassage, PassageHit, PassageStore, PendingDocument, SessionStore,
    StoredMessage,
};
use regseek::extract::{Page, TextExtractor};
use regseek::llm::GenerationProvider;
use regseek::rag::embeddings::EmbeddingProvider;
use regseek::types::{AppError, ChatTurn, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use uuid::Uuid;

// ============= Embedding =============

/// Deterministic embedder: the vector is derived from the text's bytes, so
/// identical text always embeds identically.
pub struct FakeEmbedder {
    pub dimensions: usize,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            dimensions: 3,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        (0..self.dimensions)
            .map(|i| {
                let byte = text.as_bytes().get(i).copied().unwrap_or(1) as f32;
                byte / 255.0 + text.len() as f32 / 1000.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Provider("embedding service down".to_string()));
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ============= Passage store =============

#[derive(Clone)]
pub struct FakeDocument {
    pub title: String,
    pub external_id: String,
    pub source_url: Option<String>,
}

#[derive(Clone)]
pub struct StoredPassage {
    pub passage: NewPassage,
}

#[derive(Default)]
pub struct FakePassageStore {
    pub documents: Mutex<HashMap<Uuid, FakeDocument>>,
    pub passages: Mutex<HashMap<Uuid, Vec<StoredPassage>>>,
    pub fail_replace: bool,
}

impl FakePassageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_replace() -> Self {
        Self {
            fail_replace: true,
            ..Self::default()
        }
    }

    pub fn add_document(&self, title: &str, external_id: &str, source_url: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.documents.lock().insert(
            id,
            FakeDocument {
                title: title.to_string(),
                external_id: external_id.to_string(),
                source_url: source_url.map(str::to_string),
            },
        );
        id
    }

    /// Seed a passage directly, bypassing the replace transaction.
    pub fn seed_passage(&self, document_id: Uuid, content: &str, chunk_index: i32, embedding: Vec<f32>) {
        self.passages
            .lock()
            .entry(document_id)
            .or_default()
            .push(StoredPassage {
                passage: NewPassage {
                    content: content.to_string(),
                    page_start: Some(1),
                    section_title: None,
                    chunk_index,
                    token_count: content.split_whitespace().count() as i32,
                    embedding,
                },
            });
    }

    pub fn stored(&self, document_id: Uuid) -> Vec<NewPassage> {
        self.passages
            .lock()
            .get(&document_id)
            .map(|v| v.iter().map(|s| s.passage.clone()).collect())
            .unwrap_or_default()
    }

    fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - (dot / (norm_a * norm_b)) as f64
    }
}

#[async_trait]
impl PassageStore for FakePassageStore {
    async fn replace_document_passages(
        &self,
        document_id: Uuid,
        passages: &[NewPassage],
    ) -> Result<usize> {
        if self.fail_replace {
            return Err(AppError::Database("insert failed, rolled back".to_string()));
        }
        // Swap under one lock: readers never see old and new mixed.
        let stored: Vec<StoredPassage> = passages
            .iter()
            .map(|p| StoredPassage { passage: p.clone() })
            .collect();
        self.passages.lock().insert(document_id, stored);
        Ok(passages.len())
    }

    async fn find_nearest(
        &self,
        query: &[f32],
        scope: Option<Uuid>,
        k: usize,
    ) -> Result<Vec<PassageHit>> {
        let documents = self.documents.lock().clone();
        let passages = self.passages.lock();

        let mut hits: Vec<PassageHit> = passages
            .iter()
            .filter(|(doc_id, _)| scope.is_none_or(|s| s == **doc_id))
            .flat_map(|(doc_id, stored)| {
                let doc = documents.get(doc_id).cloned().unwrap_or(FakeDocument {
                    title: String::new(),
                    external_id: String::new(),
                    source_url: None,
                });
                stored
                    .iter()
                    .map(|s| PassageHit {
                        document_id: *doc_id,
                        content: s.passage.content.clone(),
                        page_start: s.passage.page_start,
                        section_title: s.passage.section_title.clone(),
                        chunk_index: s.passage.chunk_index,
                        title: doc.title.clone(),
                        external_id: doc.external_id.clone(),
                        distance: Self::cosine_distance(query, &s.passage.embedding),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count_passages(&self, document_id: Uuid) -> Result<i64> {
        Ok(self
            .passages
            .lock()
            .get(&document_id)
            .map(|v| v.len() as i64)
            .unwrap_or(0))
    }

    async fn list_ingestion_status(&self) -> Result<Vec<IngestionStatusRow>> {
        let passages = self.passages.lock();
        Ok(self
            .documents
            .lock()
            .iter()
            .map(|(id, doc)| IngestionStatusRow {
                document_id: *id,
                title: doc.title.clone(),
                external_id: doc.external_id.clone(),
                chunks_count: passages.get(id).map(|v| v.len() as i64).unwrap_or(0),
            })
            .collect())
    }

    async fn document_exists(&self, document_id: Uuid) -> Result<bool> {
        Ok(self.documents.lock().contains_key(&document_id))
    }

    async fn list_pending_documents(&self) -> Result<Vec<PendingDocument>> {
        let passages = self.passages.lock();
        let mut pending: Vec<PendingDocument> = self
            .documents
            .lock()
            .iter()
            .filter(|(id, doc)| {
                doc.source_url.is_some()
                    && passages.get(id).map(|v| v.is_empty()).unwrap_or(true)
            })
            .map(|(id, doc)| PendingDocument {
                id: *id,
                title: doc.title.clone(),
                source_url: doc.source_url.clone().unwrap_or_default(),
            })
            .collect();
        pending.sort_by_key(|d| d.title.clone());
        Ok(pending)
    }
}

// ============= Session store =============

#[derive(Default)]
pub struct FakeSessionStore {
    pub messages: Mutex<HashMap<Uuid, Vec<StoredMessage>>>,
    pub fail_append: bool,
    clock: AtomicI64,
}

impl FakeSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_append() -> Self {
        Self {
            fail_append: true,
            ..Self::default()
        }
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap() + Duration::microseconds(tick)
    }

    /// Seed a message directly, bypassing the exchange transaction.
    pub fn seed_message(&self, session_id: Uuid, role: &str, content: &str) {
        let message = StoredMessage {
            id: Uuid::new_v4(),
            role: role.to_string(),
            content: content.to_string(),
            created_at: self.next_timestamp(),
        };
        self.messages.lock().entry(session_id).or_default().push(message);
    }

    pub fn messages_for(&self, session_id: Uuid) -> Vec<StoredMessage> {
        self.messages.lock().get(&session_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SessionStore for FakeSessionStore {
    async fn load_history(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatTurn>> {
        let messages = self.messages.lock();
        let Some(list) = messages.get(&session_id) else {
            return Ok(Vec::new());
        };
        list.iter()
            .take(limit as usize)
            .map(|m| Ok((m.role.parse()?, m.content.clone())))
            .collect()
    }

    async fn append_exchange(&self, session_id: Uuid, question: &str, answer: &str) -> Result<()> {
        if self.fail_append {
            // Nothing is written: the real store rolls the transaction back.
            return Err(AppError::Database("transaction failed".to_string()));
        }
        let user = StoredMessage {
            id: Uuid::new_v4(),
            role: "user".to_string(),
            content: question.to_string(),
            created_at: self.next_timestamp(),
        };
        let assistant = StoredMessage {
            id: Uuid::new_v4(),
            role: "assistant".to_string(),
            content: answer.to_string(),
            created_at: self.next_timestamp(),
        };
        let mut messages = self.messages.lock();
        let list = messages.entry(session_id).or_default();
        list.push(user);
        list.push(assistant);
        Ok(())
    }

    async fn session_messages(&self, session_id: Uuid) -> Result<Vec<StoredMessage>> {
        Ok(self.messages_for(session_id))
    }
}

// ============= Generation =============

pub struct FakeGenerator {
    pub fragments: Vec<String>,
    pub fail_after: Option<usize>,
    /// History passed to the most recent generate/stream call.
    pub last_history: Mutex<Vec<ChatTurn>>,
}

impl FakeGenerator {
    pub fn new(answer: &str) -> Self {
        Self {
            fragments: vec![answer.to_string()],
            fail_after: None,
            last_history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fragments(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            fail_after: None,
            last_history: Mutex::new(Vec::new()),
        }
    }

    /// Stream that fails after yielding `n` fragments.
    pub fn failing_after(fragments: &[&str], n: usize) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            fail_after: Some(n),
            last_history: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GenerationProvider for FakeGenerator {
    async fn generate(
        &self,
        _system: &str,
        history: &[ChatTurn],
        _question: &str,
    ) -> Result<String> {
        *self.last_history.lock() = history.to_vec();
        if self.fail_after == Some(0) {
            return Err(AppError::Provider("generation service down".to_string()));
        }
        Ok(self.fragments.concat())
    }

    async fn stream(
        &self,
        _system: &str,
        history: &[ChatTurn],
        _question: &str,
    ) -> Result<BoxStream<'static, Result<String>>> {
        *self.last_history.lock() = history.to_vec();
        let fragments = self.fragments.clone();
        let fail_after = self.fail_after;

        let items: Vec<Result<String>> = match fail_after {
            Some(n) => fragments
                .into_iter()
                .take(n)
                .map(Ok)
                .chain(std::iter::once(Err(AppError::Provider(
                    "stream interrupted".to_string(),
                ))))
                .collect(),
            None => fragments.into_iter().map(Ok).collect(),
        };
        Ok(futures::stream::iter(items).boxed())
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

// ============= Extraction =============

pub struct FakeExtractor {
    pages: Vec<Page>,
    by_source: Option<HashMap<String, Vec<Page>>>,
    fail: bool,
}

fn make_pages(pages: &[(i32, &str)]) -> Vec<Page> {
    pages
        .iter()
        .map(|(number, text)| Page {
            number: *number,
            text: text.to_string(),
        })
        .collect()
}

impl FakeExtractor {
    pub fn with_pages(pages: &[(i32, &str)]) -> Self {
        Self {
            pages: make_pages(pages),
            by_source: None,
            fail: false,
        }
    }

    /// Scripted per-source pages; an unknown source fails extraction.
    pub fn scripted(sources: &[(&str, &[(i32, &str)])]) -> Self {
        Self {
            pages: Vec::new(),
            by_source: Some(
                sources
                    .iter()
                    .map(|(source, pages)| (source.to_string(), make_pages(pages)))
                    .collect(),
            ),
            fail: false,
        }
    }

    pub fn empty() -> Self {
        Self {
            pages: Vec::new(),
            by_source: None,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            pages: Vec::new(),
            by_source: None,
            fail: true,
        }
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract(&self, source: &str) -> Result<Vec<Page>> {
        if self.fail {
            return Err(AppError::Extraction("unreadable source".to_string()));
        }
        if let Some(map) = &self.by_source {
            return map
                .get(source)
                .cloned()
                .ok_or_else(|| AppError::Extraction(format!("unreadable source: {}", source)));
        }
        Ok(self.pages.clone())
    }
}
