//! Stored-blob retrieval
//!
//! `GET /uploads/:name` serves a blob back, honoring single-range HTTP
//! requests so media players can seek and downloads can resume. Names come
//! straight from the URL path and go through the blob store's resolution,
//! which rejects anything that could escape the storage root.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    // Players embedded on other origins need to issue range requests.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/:name", get(serve_upload))
        .layer(cors)
}

async fn serve_upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: axum::http::HeaderMap,
) -> Result<Response> {
    let stat = state.blobs().stat(&name).await?;
    let mime = mime_guess::from_path(&name).first_or_octet_stream();

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, mime.essence_str())
        .header(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    match parse_range(headers.get(header::RANGE), stat.size)? {
        Some((start, end)) => {
            let length = end - start + 1;
            tracing::debug!(name = %name, start, end, length, "Serving byte range");

            let stream = state.blobs().open_range(&name, start, end).await?;
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, stat.size),
                )
                .header(header::CONTENT_LENGTH, length.to_string())
                .body(Body::from_stream(stream))
                .map_err(|e| AppError::Internal(e.to_string()))
        }
        None => {
            tracing::debug!(name = %name, size = stat.size, "Serving full blob");

            let stream = state.blobs().open(&name).await?;
            builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, stat.size.to_string())
                .body(Body::from_stream(stream))
                .map_err(|e| AppError::Internal(e.to_string()))
        }
    }
}

/// Parse a `Range` header against the blob size.
///
/// Returns the inclusive `(start, end)` window, or `None` when the header is
/// absent. Only a single explicit `bytes=<start>-[<end>]` range is
/// supported; anything malformed or out of bounds is unsatisfiable.
fn parse_range(header: Option<&HeaderValue>, size: u64) -> Result<Option<(u64, u64)>> {
    let Some(value) = header else {
        return Ok(None);
    };

    let unsatisfiable = || AppError::RangeNotSatisfiable { size };

    let value = value.to_str().map_err(|_| unsatisfiable())?;
    let ranges = value.strip_prefix("bytes=").ok_or_else(unsatisfiable)?;
    if ranges.contains(',') {
        return Err(unsatisfiable());
    }

    let (start, end) = ranges.split_once('-').ok_or_else(unsatisfiable)?;

    let start: u64 = start.trim().parse().map_err(|_| unsatisfiable())?;
    let end: u64 = match end.trim() {
        "" => size.checked_sub(1).ok_or_else(unsatisfiable)?,
        explicit => explicit.parse().map_err(|_| unsatisfiable())?,
    };

    if start > end || end >= size {
        return Err(unsatisfiable());
    }

    Ok(Some((start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(value: &str, size: u64) -> Result<Option<(u64, u64)>> {
        let header = HeaderValue::from_str(value).unwrap();
        parse_range(Some(&header), size)
    }

    #[test]
    fn absent_header_means_full_body() {
        assert_eq!(parse_range(None, 100).unwrap(), None);
    }

    #[test]
    fn explicit_range_is_inclusive() {
        assert_eq!(range("bytes=0-99", 100).unwrap(), Some((0, 99)));
        assert_eq!(range("bytes=10-20", 100).unwrap(), Some((10, 20)));
        assert_eq!(range("bytes=5-5", 100).unwrap(), Some((5, 5)));
    }

    #[test]
    fn open_ended_range_runs_to_last_byte() {
        assert_eq!(range("bytes=90-", 100).unwrap(), Some((90, 99)));
        assert_eq!(range("bytes=0-", 100).unwrap(), Some((0, 99)));
    }

    #[test]
    fn out_of_bounds_is_unsatisfiable() {
        assert!(matches!(
            range("bytes=0-100", 100),
            Err(AppError::RangeNotSatisfiable { size: 100 })
        ));
        assert!(matches!(
            range("bytes=200-300", 100),
            Err(AppError::RangeNotSatisfiable { .. })
        ));
    }

    #[test]
    fn inverted_range_is_unsatisfiable() {
        assert!(matches!(
            range("bytes=20-10", 100),
            Err(AppError::RangeNotSatisfiable { .. })
        ));
    }

    #[test]
    fn malformed_ranges_are_unsatisfiable() {
        for value in [
            "bytes=",
            "bytes=-",
            "bytes=abc-def",
            "bytes=1.5-2",
            "items=0-10",
            "bytes=0-10,20-30",
            "bytes=-50",
        ] {
            assert!(
                matches!(range(value, 100), Err(AppError::RangeNotSatisfiable { .. })),
                "accepted {:?}",
                value
            );
        }
    }

    #[test]
    fn any_range_on_empty_blob_is_unsatisfiable() {
        assert!(matches!(
            range("bytes=0-", 0),
            Err(AppError::RangeNotSatisfiable { size: 0 })
        ));
    }
}
