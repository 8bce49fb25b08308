use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::document::{collect_text_files, Document};
use crate::embedder::Embedder;
use crate::store::{QueryHit, StoreError, VectorStore};

/// Outcome of an indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub files_indexed: usize,
    /// Unchanged since the last run
    pub files_skipped: usize,
    /// Could not be read
    pub files_failed: usize,
    /// Chunks written during this run
    pub chunks: usize,
}

/// Chunk, embed and store every text file under `paths`.
///
/// Files whose content hash matches the stored one are left alone unless
/// `force` is set. A file that cannot be read is logged and counted, the
/// rest of the run continues.
pub async fn create_index(
    paths: &[PathBuf],
    settings: &Settings,
    force: bool,
    embedder: &dyn Embedder,
    store: &mut VectorStore,
) -> Result<IndexReport> {
    let chunk_config = settings.chunk_config()?;
    let files = collect_text_files(paths)?;
    info!("Found {} text files to index", files.len());

    let mut collection = store
        .get_or_create_collection(&settings.collection_name, embedder.model(), settings.distance)
        .context(format!(
            "Failed to open collection '{}'",
            settings.collection_name
        ))?;

    let mut report = IndexReport::default();

    for path in &files {
        let document = match Document::read(path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                report.files_failed += 1;
                continue;
            }
        };

        if !force {
            let stored = store.document_hash(&collection.name, &document.source)?;
            if stored.as_deref() == Some(document.content_hash.as_str()) {
                debug!("{} unchanged, skipping", document.source);
                report.files_skipped += 1;
                continue;
            }
        }

        let chunks = document.chunk(&chunk_config);
        let embeddings = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts = chunks.iter().map(|c| c.text.clone()).collect();
            embedder
                .embed(texts)
                .await
                .context(format!("Failed to embed {}", document.source))?
        };

        store
            .upsert_document(
                &mut collection,
                &document.source,
                &document.content_hash,
                &chunks,
                &embeddings,
            )
            .context(format!("Failed to store {}", document.source))?;

        info!("Indexed {} ({} chunks)", document.source, chunks.len());
        report.files_indexed += 1;
        report.chunks += chunks.len();
    }

    if report.chunks == 0 && report.files_skipped == 0 {
        warn!("No text found to index");
    }

    info!(
        "Indexed {} files ({} chunks), skipped {} unchanged, {} failed",
        report.files_indexed, report.chunks, report.files_skipped, report.files_failed
    );

    Ok(report)
}

/// Embed `query` and return the closest chunks in the configured collection
pub async fn query_index(
    query: &str,
    settings: &Settings,
    embedder: &dyn Embedder,
    store: &VectorStore,
) -> Result<Vec<QueryHit>> {
    let collection = store.get_collection(&settings.collection_name)?;
    if collection.embedding_model != embedder.model().name {
        return Err(StoreError::ModelMismatch {
            collection: collection.name,
            existing: collection.embedding_model,
            requested: embedder.model().name.clone(),
        }
        .into());
    }

    let embedding = embedder
        .embed_query(query)
        .await
        .context("Failed to embed query")?;

    let hits = store.query(&collection, &embedding, settings.num_results)?;
    debug!("Query returned {} hits", hits.len());

    Ok(hits)
}
