//! Upload route
//!
//! `POST /upload` accepts a multipart form with a `file` field and an
//! optional `publicChest` visibility flag. Multipart fields arrive in
//! whatever order the client chose, so the handler walks them and drives
//! the ingestion steps individually: the ban check runs before the first
//! field is read, the file field is streamed straight into the blob store,
//! and the ledger row is committed once the walk is done.

use axum::{
    async_trait,
    extract::{ConnectInfo, DefaultBodyLimit, Host, Multipart, State},
    http::{request::Parts, HeaderMap},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;

use crate::error::{AppError, Result};
use crate::ingest::{parse_public_flag, IngestService, StoredUpload};
use crate::policy::normalize_ip;
use crate::state::AppState;

/// Successful upload response
#[derive(Serialize)]
pub struct UploadResponse {
    pub url: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload))
        // The store enforces the 5 GiB ceiling per file and answers with
        // the proper JSON body, so the framework-level body cap is off.
        .layer(DefaultBodyLimit::disable())
}

/// Uploader IP: first hop of `X-Forwarded-For` when present, otherwise the
/// socket peer address. Normalized so ban entries match either notation.
pub struct ClientIp(pub String);

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());

        let ip = match forwarded {
            Some(ip) if !ip.is_empty() => ip,
            _ => parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };

        Ok(ClientIp(normalize_ip(&ip).to_string()))
    }
}

async fn upload(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Host(host): Host,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let svc = IngestService::new(state);

    // Banned clients are turned away before any body bytes are accepted.
    svc.check_policy(&ip)?;

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
        .to_string();

    let mut stored: Option<(String, StoredUpload)> = None;
    let mut is_public = false;

    let walk: Result<()> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" if stored.is_none() => {
                    let original_name = field
                        .file_name()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "upload".to_string());

                    let blob = svc.store(&original_name, Box::pin(field)).await?;
                    stored = Some((original_name, blob));
                }
                "publicChest" => {
                    let value = field.text().await.map_err(|e| {
                        AppError::BadRequest(format!("Unreadable publicChest field: {}", e))
                    })?;
                    is_public = parse_public_flag(&value)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    // A failure after the file was streamed must not strand the blob.
    if let Err(e) = walk {
        if let Some((_, blob)) = stored.take() {
            svc.discard(blob).await;
        }
        return Err(e);
    }

    let (original_name, blob) = stored.ok_or(AppError::NoFile)?;

    let ingested = svc
        .commit(&ip, &original_name, blob, is_public, &scheme, &host)
        .await?;

    Ok(Json(UploadResponse { url: ingested.url }))
}
