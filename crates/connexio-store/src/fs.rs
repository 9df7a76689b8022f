//! Filesystem-backed blob store.
//!
//! Each blob is a single file named by its [`BlobId`]:
//!
//! ```text
//! <root>/
//! └── <blob-id>      # raw uploaded bytes
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use connexio_types::BlobId;
use tokio::fs;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobReader, BlobStore};

/// [`BlobStore`] that keeps one file per blob under a root directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Use `root` as the blob directory. The directory must exist before the
    /// first `put`; see [`FsBlobStore::create`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use `root` as the blob directory, creating it if missing.
    pub fn create(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a blob's file. The file exists only if the blob does.
    pub fn path_of(&self, id: &BlobId) -> PathBuf {
        self.root.join(id.to_string())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, reader: &mut (dyn AsyncRead + Send + Unpin)) -> StoreResult<BlobId> {
        let id = BlobId::new();
        let path = self.path_of(&id);

        let written = async {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await?;
            let bytes = tokio::io::copy(&mut *reader, &mut file).await?;
            file.sync_all().await?;
            Ok::<u64, io::Error>(bytes)
        }
        .await;

        match written {
            Ok(bytes) => {
                debug!(blob = %id, bytes, "blob written");
                Ok(id)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        warn!(blob = %id, error = %cleanup, "could not remove partial blob");
                    }
                }
                Err(e.into())
            }
        }
    }

    async fn open(&self, id: &BlobId) -> StoreResult<BlobReader> {
        match fs::File::open(self.path_of(id)).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::BlobNotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        match fs::metadata(self.path_of(id)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    struct BrokenReader;

    impl AsyncRead for BrokenReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away")))
        }
    }

    fn blob_files(store: &FsBlobStore) -> usize {
        std::fs::read_dir(store.root()).unwrap().count()
    }

    #[tokio::test]
    async fn put_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::create(dir.path().join("files")).unwrap();

        let mut data: &[u8] = b"hello blob";
        let id = store.put(&mut data).await.unwrap();

        assert!(store.path_of(&id).is_file());
        assert!(store.exists(&id).await.unwrap());
        assert_eq!(store.read_to_vec(&id).await.unwrap(), b"hello blob");
    }

    #[tokio::test]
    async fn empty_payload_is_a_valid_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::create(dir.path()).unwrap();

        let mut data: &[u8] = b"";
        let id = store.put(&mut data).await.unwrap();
        assert!(store.exists(&id).await.unwrap());
        assert!(store.read_to_vec(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn identical_payloads_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::create(dir.path()).unwrap();

        let mut a: &[u8] = b"same";
        let mut b: &[u8] = b"same";
        let id1 = store.put(&mut a).await.unwrap();
        let id2 = store.put(&mut b).await.unwrap();
        assert_ne!(id1, id2);
        assert_eq!(blob_files(&store), 2);
    }

    #[tokio::test]
    async fn large_payload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::create(dir.path()).unwrap();

        let payload: Vec<u8> = (0..2_000_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader: &[u8] = &payload;
        let id = store.put(&mut reader).await.unwrap();
        assert_eq!(store.read_to_vec(&id).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn open_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::create(dir.path()).unwrap();

        let id = BlobId::new();
        assert!(!store.exists(&id).await.unwrap());
        let err = store.open(&id).await.err().unwrap();
        assert!(matches!(err, StoreError::BlobNotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::create(dir.path()).unwrap();

        let err = store.put(&mut BrokenReader).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(blob_files(&store), 0);
    }

    #[tokio::test]
    async fn put_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("does-not-exist"));

        let mut data: &[u8] = b"x";
        assert!(matches!(store.put(&mut data).await, Err(StoreError::Io(_))));
    }
}
