//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Each named index is a row in `collections` (its [`IndexSpec`] and build
//! time) plus its rows in `entries`. Vectors are stored as little-endian
//! f32 BLOBs; search loads one collection in `seq` order and ranks it by
//! cosine similarity in Rust.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use course_ta_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use course_ta_core::models::{by_score, DocumentMetadata, IndexEntry, IndexHit};
use course_ta_core::store::{check_vector, IndexError, IndexSpec, VectorIndex};

use crate::config::Config;
use crate::{db, migrate};

/// SQLite implementation of the [`VectorIndex`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
}

fn backend(e: impl std::fmt::Display) -> IndexError {
    IndexError::Backend(e.to_string())
}

impl SqliteIndex {
    /// Wrap a pool whose schema has already been created.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `[db].path` and ensure the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Unix timestamp at which `name` was last reset.
    pub async fn created_at(&self, name: &str) -> Result<Option<i64>, IndexError> {
        sqlx::query_scalar("SELECT created_at FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    /// Entry counts per `metadata.source`, largest first.
    pub async fn source_counts(&self, name: &str) -> Result<Vec<(String, i64)>, IndexError> {
        let rows = sqlx::query(
            r#"
            SELECT json_extract(metadata_json, '$.source') AS source, COUNT(*) AS n
            FROM entries
            WHERE collection = ?
            GROUP BY source
            ORDER BY n DESC
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .iter()
            .map(|r| {
                let source: Option<String> = r.get("source");
                (source.unwrap_or_else(|| "unknown".to_string()), r.get("n"))
            })
            .collect())
    }

    async fn require_spec(&self, name: &str) -> Result<IndexSpec, IndexError> {
        self.describe(name)
            .await?
            .ok_or_else(|| IndexError::Missing(name.to_string()))
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn reset(&self, name: &str, spec: &IndexSpec) -> Result<(), IndexError> {
        if spec.dims == 0 {
            return Err(IndexError::InvalidSpec("dims must be > 0".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO collections (name, model, dims, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                model = excluded.model,
                dims = excluded.dims,
                created_at = excluded.created_at
            "#,
        )
        .bind(name)
        .bind(&spec.model)
        .bind(spec.dims as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn add(&self, name: &str, entry: IndexEntry) -> Result<(), IndexError> {
        let spec = self.require_spec(name).await?;
        check_vector(name, &spec, &entry.vector)?;

        let metadata_json = serde_json::to_string(&entry.metadata).map_err(backend)?;
        let blob = vec_to_blob(&entry.vector);

        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Re-adding an id replaces it and moves it to the end.
        sqlx::query("DELETE FROM entries WHERE collection = ? AND id = ?")
            .bind(name)
            .bind(&entry.id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO entries (collection, seq, id, body, metadata_json, embedding)
            VALUES (?, (SELECT COALESCE(MAX(seq) + 1, 0) FROM entries WHERE collection = ?), ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(name)
        .bind(&entry.id)
        .bind(&entry.body)
        .bind(&metadata_json)
        .bind(&blob)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<IndexHit>, IndexError> {
        let spec = self.require_spec(name).await?;
        check_vector(name, &spec, vector)?;

        let rows = sqlx::query(
            "SELECT id, body, metadata_json, embedding FROM entries WHERE collection = ? ORDER BY seq",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let stored = blob_to_vec(&blob);
            let metadata_json: String = row.get("metadata_json");
            let metadata: DocumentMetadata =
                serde_json::from_str(&metadata_json).map_err(backend)?;
            hits.push(IndexHit {
                id: row.get("id"),
                body: row.get("body"),
                metadata,
                score: cosine_similarity(vector, &stored),
            });
        }

        // Stable: equal scores keep seq order.
        hits.sort_by(by_score);
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, name: &str) -> Result<usize, IndexError> {
        self.require_spec(name).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(count as usize)
    }

    async fn describe(&self, name: &str) -> Result<Option<IndexSpec>, IndexError> {
        let row = sqlx::query("SELECT model, dims FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(|r| {
            let dims: i64 = r.get("dims");
            IndexSpec {
                model: r.get("model"),
                dims: dims as usize,
            }
        }))
    }
}
