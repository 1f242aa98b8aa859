mod local;

use thiserror::Error;

pub use self::local::LocalBlobStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
}

/// Key/blob store for uploaded media.
///
/// Keys are relative slash-separated paths such as `media/<uuid>.png`.
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under `key`, replacing any existing blob.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove the blob. Deleting a key that does not exist is not an error.
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL for a stored key.
    fn url(&self, key: &str) -> String;
}

/// Build a fresh key under `dir` that keeps the upload's extension.
pub fn new_key(dir: &str, extension: &str) -> String {
    format!(
        "{}/{}.{}",
        dir,
        uuid::Uuid::now_v7(),
        extension.to_ascii_lowercase()
    )
}

/// Best-effort removal of a blob that no longer has an owning row.
pub fn discard(blobs: &dyn BlobStore, key: &str) {
    if let Err(e) = blobs.delete(key) {
        tracing::warn!("Failed to remove orphaned blob {}: {}", key, e);
    }
}

/// Reject keys that could escape the storage root.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_key_keeps_directory_and_extension() {
        let key = new_key("media", "PNG");
        assert!(key.starts_with("media/"));
        assert!(key.ends_with(".png"));
        assert_ne!(new_key("media", "png"), new_key("media", "png"));
    }

    #[test]
    fn validate_key_rejects_traversal() {
        assert!(validate_key("media/a.png").is_ok());
        assert!(validate_key("../a.png").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("media//a.png").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn discard_removes_blob_and_tolerates_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(tmp.path(), "http://localhost:3000").unwrap();
        store.put("media/orphan.png", b"x").unwrap();

        discard(&store, "media/orphan.png");
        assert!(!tmp.path().join("media/orphan.png").exists());

        discard(&store, "media/orphan.png");
        discard(&store, "../not-a-key");
    }
}
