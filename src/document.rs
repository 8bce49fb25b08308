use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::chunker::{self, ChunkConfig};

/// Extensions picked up when a directory is passed for indexing
const TEXT_EXTENSIONS: &[&str] = &["txt"];

/// A source text file loaded into memory
#[derive(Debug, Clone)]
pub struct Document {
    /// External name of the document (the file's base name)
    pub source: String,
    /// Path the document was read from
    pub path: PathBuf,
    /// Full text content
    pub text: String,
    /// Hex SHA-256 of the raw file bytes
    pub content_hash: String,
}

/// One chunk of a document, tagged for storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Composite id `<source>_<index>`
    pub id: String,
    pub source: String,
    /// Position of the chunk within its document
    pub index: usize,
    pub text: String,
}

impl Document {
    /// Build a document from text already in memory
    pub fn from_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            source: source.into(),
            path: PathBuf::new(),
            content_hash: hash_bytes(text.as_bytes()),
            text,
        }
    }

    /// Read a text file from disk
    pub fn read(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).context(format!("Failed to read text file: {}", path.display()))?;

        let content_hash = hash_bytes(&bytes);

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "{} is not valid UTF-8, replacing invalid sequences",
                    path.display()
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };

        Ok(Self {
            source: source_name(path),
            path: path.to_path_buf(),
            content_hash,
            text,
        })
    }

    /// Split the document and tag every chunk with its source and position
    pub fn chunk(&self, config: &ChunkConfig) -> Vec<DocumentChunk> {
        chunker::split(&self.text, config)
            .into_iter()
            .enumerate()
            .map(|(index, text)| DocumentChunk {
                id: chunk_id(&self.source, index),
                source: self.source.clone(),
                index,
                text,
            })
            .collect()
    }
}

/// Stable id of the `index`-th chunk of `source`
pub fn chunk_id(source: &str, index: usize) -> String {
    format!("{}_{}", source, index)
}

/// Base name used to identify a file in the index
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Compute SHA256 hash of raw contents
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Expand the paths given for indexing.
///
/// Files are taken as given, in order. Directories are walked recursively
/// for text files, sorted by path. A path that does not exist is an error.
pub fn collect_text_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let found = walk_text_files(path)?;
            debug!("Found {} text files under {}", found.len(), path.display());
            files.extend(found);
        } else {
            bail!("No such file or directory: {}", path.display());
        }
    }

    Ok(files)
}

fn walk_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if entry.file_type().is_file() && is_text_file(path) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ids_are_sequential() {
        let doc = Document::from_text("notes.txt", "x".repeat(25));
        let config = ChunkConfig::new(10, 0).unwrap();
        let chunks = doc.chunk(&config);

        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["notes.txt_0", "notes.txt_1", "notes.txt_2"]);
        assert!(chunks.iter().all(|c| c.source == "notes.txt"));
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn test_empty_document_has_no_chunks() {
        let doc = Document::from_text("empty.txt", "  \n\n ");
        assert!(doc.chunk(&ChunkConfig::default()).is_empty());
    }

    #[test]
    fn test_source_name_is_base_name() {
        assert_eq!(source_name(Path::new("/tmp/books/moby.txt")), "moby.txt");
        assert_eq!(source_name(Path::new("relative.txt")), "relative.txt");
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(
            hash_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        fs::write(&path, "Once upon a time.").unwrap();

        let doc = Document::read(&path).unwrap();
        assert_eq!(doc.source, "story.txt");
        assert_eq!(doc.text, "Once upon a time.");
        assert_eq!(doc.content_hash, hash_bytes(b"Once upon a time."));
    }

    #[test]
    fn test_read_invalid_utf8_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        fs::write(&path, [b'o', b'k', 0xff, b'!']).unwrap();

        let doc = Document::read(&path).unwrap();
        assert_eq!(doc.text, "ok\u{fffd}!");
    }

    #[test]
    fn test_read_missing_file() {
        assert!(Document::read(Path::new("/definitely/not/here.txt")).is_err());
    }

    #[test]
    fn test_collect_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.TXT"), "a").unwrap();
        fs::write(dir.path().join("skip.md"), "skip").unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "c").unwrap();

        let files = collect_text_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files.iter().map(|p| source_name(p)).collect();

        assert_eq!(names, vec!["a.TXT", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_collect_keeps_explicit_files() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        fs::write(&notes, "explicit files are not filtered").unwrap();

        let files = collect_text_files(&[notes.clone()]).unwrap();
        assert_eq!(files, vec![notes]);
    }

    #[test]
    fn test_collect_missing_path() {
        let result = collect_text_files(&[PathBuf::from("/definitely/not/here")]);
        assert!(result.is_err());
    }
}
