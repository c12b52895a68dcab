//! PostgreSQL implementation of the store traits, using the pgvector
//! extension for distance-ranked retrieval.

use crate::types::{ChatTurn, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::traits::{
    IngestionStatusRow, NewPassage, PassageHit, PassageStore, PendingDocument, SessionStore,
    StoredMessage,
};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the schema if it does not exist. Documents are owned by the
    /// surrounding system; the table is still created here so the server can
    /// run standalone.
    pub async fn migrate(&self, embedding_dimensions: usize) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                external_id TEXT NOT NULL,
                source_url TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS passages (
                id UUID PRIMARY KEY,
                document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                page_start INTEGER,
                section_title TEXT,
                chunk_index INTEGER NOT NULL,
                token_count INTEGER NOT NULL,
                embedding vector({})
            )
            "#,
            embedding_dimensions
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS passages_document_idx ON passages (document_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_sessions (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id UUID PRIMARY KEY,
                session_id UUID NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS chat_messages_session_idx \
             ON chat_messages (session_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn hit_from_row(row: &PgRow) -> Result<PassageHit> {
    Ok(PassageHit {
        document_id: row.try_get("document_id")?,
        content: row.try_get("content")?,
        page_start: row.try_get("page_start")?,
        section_title: row.try_get("section_title")?,
        chunk_index: row.try_get("chunk_index")?,
        title: row.try_get("title")?,
        external_id: row.try_get("external_id")?,
        distance: row.try_get("distance")?,
    })
}

#[async_trait]
impl PassageStore for PgStore {
    async fn replace_document_passages(
        &self,
        document_id: Uuid,
        passages: &[NewPassage],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent re-ingestions of the same document. The lock
        // is transaction-scoped and released on commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM passages WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for passage in passages {
            sqlx::query(
                r#"
                INSERT INTO passages
                    (id, document_id, content, page_start, section_title,
                     chunk_index, token_count, embedding)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(document_id)
            .bind(&passage.content)
            .bind(passage.page_start)
            .bind(&passage.section_title)
            .bind(passage.chunk_index)
            .bind(passage.token_count)
            .bind(Vector::from(passage.embedding.clone()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(passages.len())
    }

    async fn find_nearest(
        &self,
        query: &[f32],
        scope: Option<Uuid>,
        k: usize,
    ) -> Result<Vec<PassageHit>> {
        let vector = Vector::from(query.to_vec());
        let limit = k as i64;

        let rows = match scope {
            Some(document_id) => {
                sqlx::query(
                    r#"
                    SELECT p.document_id, p.content, p.page_start, p.section_title,
                           p.chunk_index, d.title, d.external_id,
                           p.embedding <=> $1 AS distance
                    FROM passages p
                    JOIN documents d ON d.id = p.document_id
                    WHERE p.embedding IS NOT NULL AND p.document_id = $2
                    ORDER BY p.embedding <=> $1
                    LIMIT $3
                    "#,
                )
                .bind(&vector)
                .bind(document_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT p.document_id, p.content, p.page_start, p.section_title,
                           p.chunk_index, d.title, d.external_id,
                           p.embedding <=> $1 AS distance
                    FROM passages p
                    JOIN documents d ON d.id = p.document_id
                    WHERE p.embedding IS NOT NULL
                    ORDER BY p.embedding <=> $1
                    LIMIT $2
                    "#,
                )
                .bind(&vector)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(hit_from_row).collect()
    }

    async fn count_passages(&self, document_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM passages WHERE document_id = $1")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn list_ingestion_status(&self) -> Result<Vec<IngestionStatusRow>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.title, d.external_id, COUNT(p.id) AS chunks_count
            FROM documents d
            LEFT JOIN passages p ON p.document_id = d.id
            GROUP BY d.id, d.title, d.external_id
            ORDER BY chunks_count DESC, d.title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(IngestionStatusRow {
                    document_id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    external_id: row.try_get("external_id")?,
                    chunks_count: row.try_get("chunks_count")?,
                })
            })
            .collect()
    }

    async fn document_exists(&self, document_id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM documents WHERE id = $1) AS found")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("found")?)
    }

    async fn list_pending_documents(&self) -> Result<Vec<PendingDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.title, d.source_url
            FROM documents d
            WHERE d.source_url IS NOT NULL
              AND NOT EXISTS (SELECT 1 FROM passages p WHERE p.document_id = d.id)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PendingDocument {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    source_url: row.try_get("source_url")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn load_history(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatTurn>> {
        let rows = sqlx::query(
            r#"
            SELECT role, content
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let role: String = row.try_get("role")?;
                let content: String = row.try_get("content")?;
                Ok((role.parse()?, content))
            })
            .collect()
    }

    async fn append_exchange(&self, session_id: Uuid, question: &str, answer: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Timestamps are computed in-process: NOW() is transaction-stable in
        // Postgres and would give both messages the same creation time.
        let user_ts = now;
        let assistant_ts = user_ts + Duration::microseconds(1);

        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, role, content, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind("user")
        .bind(question)
        .bind(user_ts)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, role, content, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind("assistant")
        .bind(answer)
        .bind(assistant_ts)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat_sessions SET updated_at = $2 WHERE id = $1")
            .bind(session_id)
            .bind(assistant_ts)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn session_messages(&self, session_id: Uuid) -> Result<Vec<StoredMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, role, content, created_at
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(StoredMessage {
                    id: row.try_get("id")?,
                    role: row.try_get("role")?,
                    content: row.try_get("content")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
