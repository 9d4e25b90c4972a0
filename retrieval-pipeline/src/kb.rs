use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use common::error::AppError;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Fixed slice width, in characters, used for scoring. Chunks never overlap.
pub const CHUNK_SIZE: usize = 2000;

/// One scoring unit. Only ever lives inside a cached [`KnowledgeBase`].
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub document: String,
    pub index: usize,
    pub text: String,
}

/// A directory of plain-text documents loaded as one retrievable corpus.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    document_texts: HashMap<String, String>,
    chunks: Vec<Chunk>,
}

impl KnowledgeBase {
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn document_text(&self, name: &str) -> Option<&str> {
        self.document_texts.get(name).map(String::as_str)
    }

    pub fn document_count(&self) -> usize {
        self.document_texts.len()
    }

    fn insert_document(&mut self, name: String, text: String) {
        for (index, slice) in chunk_text(&text, CHUNK_SIZE).into_iter().enumerate() {
            self.chunks.push(Chunk {
                document: name.clone(),
                index,
                text: slice,
            });
        }
        self.document_texts.insert(name, text);
    }
}

/// Slice `text` into consecutive pieces of at most `size` characters.
/// Concatenating the pieces reproduces the input exactly.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Process-wide cache of loaded knowledge bases, keyed by directory path.
/// The key is the path, not a content hash: a changed directory is only
/// picked up after a restart. Known limitation.
#[derive(Default)]
pub struct KnowledgeBaseCache {
    entries: RwLock<HashMap<String, Arc<KnowledgeBase>>>,
    disk_loads: AtomicUsize,
}

impl KnowledgeBaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of filesystem scans performed so far. Lets tests observe that
    /// repeat loads are served from the cache.
    pub fn disk_loads(&self) -> usize {
        self.disk_loads.load(Ordering::Relaxed)
    }

    pub async fn load(&self, path: &str) -> Result<Arc<KnowledgeBase>, AppError> {
        if let Some(kb) = self.entries.read().await.get(path) {
            return Ok(Arc::clone(kb));
        }

        let loaded = Arc::new(self.load_from_disk(path).await?);

        let mut entries = self.entries.write().await;
        // A concurrent load may have won the race; keep the first result so
        // chunk order stays stable for the lifetime of the cache entry.
        if let Some(existing) = entries.get(path) {
            return Ok(Arc::clone(existing));
        }
        entries.insert(path.to_string(), Arc::clone(&loaded));
        Ok(loaded)
    }

    async fn load_from_disk(&self, path: &str) -> Result<KnowledgeBase, AppError> {
        self.disk_loads.fetch_add(1, Ordering::Relaxed);

        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.ends_with(".txt") {
                names.push(file_name);
            }
        }
        // Directory enumeration order is platform-defined; sort so chunk
        // order is deterministic for a given directory content.
        names.sort();

        let mut kb = KnowledgeBase::default();
        for name in names {
            let full_path = Path::new(path).join(&name);
            match tokio::fs::read_to_string(&full_path).await {
                Ok(text) => kb.insert_document(name, text),
                Err(e) => {
                    error!("Could not read {}: {e}", full_path.display());
                    continue;
                }
            }
        }

        info!(
            "Loaded {} files and {} chunks from {path}",
            kb.document_count(),
            kb.chunks().len()
        );
        Ok(kb)
    }
}
