use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::document::DocumentChunk;
use crate::embedder::EmbeddingModelInfo;
use crate::similarity::DistanceMetric;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Collection '{0}' not found. Please create the index first using the --index option.")]
    CollectionNotFound(String),

    #[error("Collection '{collection}' was built with {existing}, not {requested}")]
    ModelMismatch {
        collection: String,
        existing: String,
        requested: String,
    },

    #[error("Expected {expected}-dimensional embedding, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Got {chunks} chunks but {embeddings} embeddings")]
    LengthMismatch { chunks: usize, embeddings: usize },

    #[error("Unknown distance metric stored for collection: {0}")]
    InvalidMetric(String),
}

/// A named set of embedded chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub embedding_model: String,
    /// Embedding dimension, 0 until the first vectors are stored
    pub dim: usize,
    pub metric: DistanceMetric,
    pub created_at: String,
}

/// One retrieved chunk with its distance to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub document_count: u32,
    pub chunk_count: u32,
}

/// SQLite-backed vector index
pub struct VectorStore {
    conn: Connection,
}

impl VectorStore {
    /// Create a new in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open (or create) a store file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                embedding_model TEXT NOT NULL,
                dim INTEGER NOT NULL,
                metric TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                source TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                chunk_count INTEGER NOT NULL,
                indexed_at TEXT NOT NULL,
                PRIMARY KEY (collection, source),
                FOREIGN KEY (collection) REFERENCES collections(name)
            );

            CREATE TABLE IF NOT EXISTS chunks (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, id),
                FOREIGN KEY (collection) REFERENCES collections(name)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(collection, source);
            "#,
        )?;
        Ok(())
    }

    /// Look up an existing collection
    pub fn get_collection(&self, name: &str) -> Result<Collection, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT name, embedding_model, dim, metric, created_at FROM collections WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let (name, embedding_model, dim, metric, created_at) =
            row.ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;
        let metric = metric
            .parse::<DistanceMetric>()
            .map_err(StoreError::InvalidMetric)?;

        Ok(Collection {
            name,
            embedding_model,
            dim: dim as usize,
            metric,
            created_at,
        })
    }

    /// Fetch a collection, creating it for `model` if it does not exist yet.
    ///
    /// An existing collection keeps its metric; asking for it with another
    /// embedding model is an error since the vectors would not be comparable.
    pub fn get_or_create_collection(
        &self,
        name: &str,
        model: &EmbeddingModelInfo,
        metric: DistanceMetric,
    ) -> Result<Collection, StoreError> {
        match self.get_collection(name) {
            Ok(existing) => {
                if existing.embedding_model != model.name {
                    return Err(StoreError::ModelMismatch {
                        collection: name.to_string(),
                        existing: existing.embedding_model,
                        requested: model.name.clone(),
                    });
                }
                Ok(existing)
            }
            Err(StoreError::CollectionNotFound(_)) => {
                let created_at = Utc::now().to_rfc3339();
                self.conn.execute(
                    "INSERT INTO collections (name, embedding_model, dim, metric, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![name, model.name, model.dim as i64, metric.as_str(), created_at],
                )?;
                debug!("Created collection '{}' for {}", name, model.name);

                Ok(Collection {
                    name: name.to_string(),
                    embedding_model: model.name.clone(),
                    dim: model.dim,
                    metric,
                    created_at,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Content hash recorded the last time `source` was indexed
    pub fn document_hash(&self, collection: &str, source: &str) -> Result<Option<String>, StoreError> {
        let hash = self
            .conn
            .query_row(
                "SELECT content_hash FROM documents WHERE collection = ?1 AND source = ?2",
                params![collection, source],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// Replace everything stored for `source` with the given chunks.
    ///
    /// Runs in one transaction: either all chunks of the document are
    /// visible afterwards or none of the new ones are.
    pub fn upsert_document(
        &mut self,
        collection: &mut Collection,
        source: &str,
        content_hash: &str,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        if chunks.len() != embeddings.len() {
            return Err(StoreError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let dim = match (collection.dim, embeddings.first()) {
            (0, Some(first)) => first.len(),
            (dim, _) => dim,
        };
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dim) {
            return Err(StoreError::DimensionMismatch {
                expected: dim,
                got: bad.len(),
            });
        }

        let tx = self.conn.transaction()?;

        if collection.dim != dim {
            tx.execute(
                "UPDATE collections SET dim = ?1 WHERE name = ?2",
                params![dim as i64, collection.name],
            )?;
        }

        tx.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND source = ?2",
            params![collection.name, source],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO chunks (collection, id, source, chunk_index, content, embedding) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (chunk, embedding) in chunks.iter().zip(embeddings) {
                stmt.execute(params![
                    collection.name,
                    chunk.id,
                    chunk.source,
                    chunk.index as i64,
                    chunk.text,
                    vector_to_bytes(embedding),
                ])?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO documents (collection, source, content_hash, chunk_count, indexed_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                collection.name,
                source,
                content_hash,
                chunks.len() as i64,
                Utc::now().to_rfc3339()
            ],
        )?;

        tx.commit()?;
        collection.dim = dim;

        Ok(())
    }

    /// Nearest chunks to `embedding`, closest first, ties broken by id
    pub fn query(
        &self,
        collection: &Collection,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryHit>, StoreError> {
        if collection.dim != 0 && embedding.len() != collection.dim {
            return Err(StoreError::DimensionMismatch {
                expected: collection.dim,
                got: embedding.len(),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, source, chunk_index, content, embedding FROM chunks WHERE collection = ?1",
        )?;

        let mut hits = stmt
            .query_map(params![collection.name], |row| {
                let vector_bytes: Vec<u8> = row.get(4)?;
                let vector = bytes_to_vector(&vector_bytes);
                Ok(QueryHit {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    chunk_index: row.get::<_, i64>(2)? as usize,
                    content: row.get(3)?,
                    distance: collection.metric.distance(embedding, &vector),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(n_results);

        Ok(hits)
    }

    pub fn stats(&self, collection: &str) -> Result<CollectionStats, StoreError> {
        let document_count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;

        let chunk_count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;

        Ok(CollectionStats {
            document_count,
            chunk_count,
        })
    }
}

fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
