//! Blob store collaborator.
//!
//! Uploaded note bytes live outside the record store, addressed by a path
//! such as `notes/1700000000000-unit1.pdf`. Every backend derives a public
//! URL from the path alone, so the URL saved on a note never changes.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BlobError {
    /// The backend refused the call because its usage quota is used up.
    #[error("Blob store quota exhausted")]
    QuotaExhausted,

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Path traversal detected")]
    InvalidPath,

    #[error("Blob store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob store request failed: {0}")]
    Request(String),

    #[error("Blob store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Operation not supported by this blob store")]
    Unsupported,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `path` and return its public URL. `message`
    /// describes the upload for backends that keep a history.
    async fn put(&self, path: &str, data: &[u8], message: &str) -> Result<String, BlobError>;

    /// Public URL of `path`, whether or not it exists.
    fn public_url(&self, path: &str) -> String;

    /// Read a blob back. Only backends that are not publicly hosted serve
    /// their own files.
    async fn read(&self, path: &str) -> Result<Vec<u8>, BlobError>;

    /// Check that the backend is reachable; returns a short description of
    /// the target (repository name, directory).
    async fn probe(&self) -> Result<String, BlobError>;
}

// ---------------------------------------------------------------------------
// Local directory backend
// ---------------------------------------------------------------------------

/// Resolve `relative` inside `base`, rejecting anything that would escape it.
fn resolve_within(base: &Path, relative: &str) -> Result<PathBuf, BlobError> {
    let mut resolved = base.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => {
                resolved.push(c);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(BlobError::InvalidPath);
            }
        }
    }
    if depth == 0 {
        return Err(BlobError::InvalidPath);
    }
    Ok(resolved)
}

/// Stores blobs as plain files under a base directory. Used for local
/// development and tests; files are served back by the `/files` route.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub async fn new(base_path: PathBuf, public_base_url: String) -> Result<Self, BlobError> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Local blob store initialized");

        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, data: &[u8], message: &str) -> Result<String, BlobError> {
        let target = resolve_within(&self.base_path, path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, data).await?;

        debug!(path, size = data.len(), message, "Stored blob");
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        let target = resolve_within(&self.base_path, path)?;
        match fs::read(&target).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn probe(&self) -> Result<String, BlobError> {
        let meta = fs::metadata(&self.base_path).await?;
        if !meta.is_dir() {
            return Err(BlobError::Request(format!(
                "{} is not a directory",
                self.base_path.display()
            )));
        }
        Ok(self.base_path.display().to_string())
    }
}

// ---------------------------------------------------------------------------
// In-memory backend for tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Keeps blobs in a map; can be told to answer with quota exhaustion or
    /// a hard failure.
    #[derive(Default)]
    pub struct MemoryBlobStore {
        pub blobs: Mutex<HashMap<String, Vec<u8>>>,
        pub messages: Mutex<Vec<String>>,
        pub quota_exhausted: AtomicBool,
        pub broken: AtomicBool,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobStore {
        async fn put(&self, path: &str, data: &[u8], message: &str) -> Result<String, BlobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.quota_exhausted.load(Ordering::SeqCst) {
                return Err(BlobError::QuotaExhausted);
            }
            if self.broken.load(Ordering::SeqCst) {
                return Err(BlobError::Rejected {
                    status: 500,
                    message: "boom".into(),
                });
            }
            self.blobs
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            self.messages.lock().unwrap().push(message.to_string());
            Ok(self.public_url(path))
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://blobs.test/{path}")
        }

        async fn read(&self, path: &str) -> Result<Vec<u8>, BlobError> {
            self.blobs
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| BlobError::NotFound(path.to_string()))
        }

        async fn probe(&self) -> Result<String, BlobError> {
            Ok("memory".into())
        }
    }
}
