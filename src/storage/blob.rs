//! Flat-directory blob store
//!
//! Uploads are streamed to a `.partial` sibling inside the storage root and
//! renamed into place once fully written, so a reader can never observe a
//! truncated blob. Published blobs are immutable; there is no delete path on
//! the serving side.
//!
//! Every operation resolves its name through [`BlobStore::resolve`], which
//! only accepts a single plain path component. Request paths are attacker
//! controlled and URL decoding can smuggle separators into one segment.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom, Take};
use tokio_util::io::ReaderStream;

use crate::error::AppError;

const PARTIAL_SUFFIX: &str = ".partial";

/// Storage-level errors, mapped onto the HTTP taxonomy by [`AppError`].
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob name: {0}")]
    InvalidName(String),

    #[error("upload exceeds size limit")]
    TooLarge,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(name) => AppError::NotFound(name),
            BlobError::InvalidName(name) => AppError::NotFound(name),
            BlobError::TooLarge => AppError::TooLarge,
            BlobError::Io(e) => AppError::Storage(e),
        }
    }
}

/// Metadata for a stored blob.
#[derive(Debug, Clone, Copy)]
pub struct BlobStat {
    pub size: u64,
}

/// Flat-directory blob store rooted at a single path.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a name to a path inside the root, rejecting anything that is
    /// not a single plain component.
    fn resolve(&self, name: &str) -> Result<PathBuf, BlobError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\')
            && !name.contains('\0')
            && !name.ends_with(PARTIAL_SUFFIX);

        if !valid {
            return Err(BlobError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Stream `data` into the store under `name`, enforcing `limit`.
    ///
    /// Returns the number of bytes written. On any failure the partial file
    /// is removed and the final name never appears.
    pub async fn put_stream<S, E>(
        &self,
        name: &str,
        mut data: S,
        limit: u64,
    ) -> Result<u64, BlobError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        let target = self.resolve(name)?;
        fs::create_dir_all(&self.root).await?;

        let partial = target.with_file_name(format!("{}{}", name, PARTIAL_SUFFIX));
        let mut file = File::create(&partial).await?;

        let mut written: u64 = 0;
        while let Some(chunk) = data.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&partial).await;
                    return Err(BlobError::Io(io::Error::new(io::ErrorKind::Other, e)));
                }
            };

            written += chunk.len() as u64;
            if written > limit {
                drop(file);
                let _ = fs::remove_file(&partial).await;
                return Err(BlobError::TooLarge);
            }

            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = fs::remove_file(&partial).await;
                return Err(BlobError::Io(e));
            }
        }

        // Publish atomically: flush, fsync, rename into place.
        if let Err(e) = async {
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&partial, &target).await
        }
        .await
        {
            let _ = fs::remove_file(&partial).await;
            return Err(BlobError::Io(e));
        }

        Ok(written)
    }

    pub async fn stat(&self, name: &str) -> Result<BlobStat, BlobError> {
        let path = self.resolve(name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(BlobStat { size: meta.len() }),
            Ok(_) => Err(BlobError::NotFound(name.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(name.to_string()))
            }
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    /// Open the full blob as a byte stream.
    pub async fn open(&self, name: &str) -> Result<ReaderStream<File>, BlobError> {
        let path = self.resolve(name)?;
        let file = open_existing(&path, name).await?;
        Ok(ReaderStream::new(file))
    }

    /// Open the inclusive byte window `[start, end]` of a blob.
    ///
    /// The caller validates the window against the blob size; this yields
    /// exactly `end - start + 1` bytes.
    pub async fn open_range(
        &self,
        name: &str,
        start: u64,
        end: u64,
    ) -> Result<ReaderStream<Take<File>>, BlobError> {
        let path = self.resolve(name)?;
        let mut file = open_existing(&path, name).await?;
        file.seek(SeekFrom::Start(start)).await?;
        Ok(ReaderStream::new(file.take(end - start + 1)))
    }

    /// Remove a published blob. Only used to undo an ingestion whose
    /// metadata commit failed.
    pub async fn remove(&self, name: &str) -> Result<(), BlobError> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(name.to_string()))
            }
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}

async fn open_existing(path: &Path, name: &str) -> Result<File, BlobError> {
    match OpenOptions::new().read(true).open(path).await {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(BlobError::NotFound(name.to_string()))
        }
        Err(e) => Err(BlobError::Io(e)),
    }
}
