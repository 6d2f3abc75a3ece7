//! Upload ingestion
//!
//! Orchestrates the write path: policy check, blob write, ledger insert,
//! audit line, retrieval URL. The ordering is load-bearing: the ban check
//! runs before any byte is accepted, and the ledger row is only written
//! after the blob is fully published, so no failure leaves a row without a
//! blob. If the ledger insert itself fails the just-published blob is
//! removed again.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use futures::Stream;

use crate::db::{NewUpload, UploadRepository};
use crate::error::{AppError, Result};
use crate::naming;
use crate::policy::Verdict;
use crate::state::AppState;

/// Extensions that downstream embedders stream rather than download; their
/// URLs carry a `?v` marker.
const STREAMING_EXTENSIONS: [&str; 6] = ["mp4", "m4v", "mov", "webm", "mkv", "avi"];

/// A blob published by [`IngestService::store`], awaiting its ledger row.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub stored_name: String,
    pub bytes: u64,
}

/// Outcome of a completed ingestion.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub id: i64,
    pub stored_name: String,
    pub url: String,
}

/// Write-path orchestrator. Exclusively owns the upload sequence; nothing
/// else inserts ledger rows or publishes blobs.
#[derive(Clone)]
pub struct IngestService {
    state: AppState,
}

impl IngestService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Evaluate the ban list for `ip`. Runs before the request body is read
    /// so banned clients never consume storage.
    pub fn check_policy(&self, ip: &str) -> Result<()> {
        match self.state.bans().check(ip) {
            Verdict::Allowed => Ok(()),
            Verdict::Denied { reason } => Err(AppError::Banned { reason }),
        }
    }

    /// Generate a stored name and stream the upload body into the blob
    /// store. Oversize and I/O failures clean up after themselves.
    ///
    /// The original name is untrusted; only its final path component feeds
    /// the generator, so a traversal-shaped filename cannot produce a
    /// stored name the blob store would refuse (or worse, honor).
    pub async fn store<S, E>(&self, original_name: &str, data: S) -> Result<StoredUpload>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut base = original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or("")
            .replace('\0', "");
        if base.is_empty() {
            base = "upload".to_string();
        }

        let stored_name = naming::generate(&base);
        let limit = self.state.config().storage.max_upload_bytes;

        let bytes = self
            .state
            .blobs()
            .put_stream(&stored_name, data, limit)
            .await?;

        Ok(StoredUpload { stored_name, bytes })
    }

    /// Remove a published blob that will not get a ledger row, e.g. when a
    /// later form field turns out malformed.
    pub async fn discard(&self, stored: StoredUpload) {
        if let Err(e) = self.state.blobs().remove(&stored.stored_name).await {
            tracing::error!(
                stored_name = %stored.stored_name,
                error = %e,
                "Failed to discard uncommitted blob"
            );
        }
    }

    /// Record a published blob in the ledger, write the audit line, and
    /// build the retrieval URL.
    pub async fn commit(
        &self,
        ip: &str,
        original_name: &str,
        stored: StoredUpload,
        is_public: bool,
        scheme: &str,
        host: &str,
    ) -> Result<Ingested> {
        let repo = UploadRepository::new(self.state.db());
        let row = NewUpload {
            filename: stored.stored_name.clone(),
            original_filename: original_name.to_string(),
            ip: ip.to_string(),
            create_time: now_unix_secs(),
            is_public,
        };

        let id = match repo.insert(&row).await {
            Ok(id) => id,
            Err(e) => {
                // Undo the publish so no orphaned blob remains.
                if let Err(cleanup) = self.state.blobs().remove(&stored.stored_name).await {
                    tracing::error!(
                        stored_name = %stored.stored_name,
                        error = %cleanup,
                        "Failed to remove blob after ledger insert failure"
                    );
                }
                return Err(e);
            }
        };

        if let Err(e) = self
            .state
            .audit()
            .record(ip, &stored.stored_name, stored.bytes)
            .await
        {
            tracing::error!(error = %e, "Audit log write failed");
        }

        tracing::info!(
            ip = %ip,
            stored_name = %stored.stored_name,
            bytes = stored.bytes,
            is_public,
            "Upload accepted"
        );

        Ok(Ingested {
            id,
            url: build_url(scheme, host, &stored.stored_name),
            stored_name: stored.stored_name,
        })
    }

    /// Full ingestion in one call, for callers that already hold every
    /// input. The upload route drives the steps individually because
    /// multipart fields arrive in client-chosen order.
    pub async fn ingest<S, E>(
        &self,
        ip: &str,
        original_name: &str,
        data: S,
        is_public: bool,
        scheme: &str,
        host: &str,
    ) -> Result<Ingested>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.check_policy(ip)?;
        let stored = self.store(original_name, data).await?;
        self.commit(ip, original_name, stored, is_public, scheme, host)
            .await
    }
}

/// Parse the `publicChest` form field. Only the literal strings are
/// accepted; anything else is a client error rather than a silent false.
pub fn parse_public_flag(value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(AppError::BadRequest(format!(
            "Invalid publicChest value: {:?}",
            other
        ))),
    }
}

pub fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Build the absolute retrieval URL for a stored name.
fn build_url(scheme: &str, host: &str, stored_name: &str) -> String {
    let mut url = format!(
        "{}://{}/uploads/{}",
        scheme,
        host,
        urlencoding::encode(stored_name)
    );
    if is_streaming_type(stored_name) {
        url.push_str("?v");
    }
    url
}

fn is_streaming_type(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            STREAMING_EXTENSIONS.iter().any(|&v| v == ext)
        })
        .unwrap_or(false)
}
