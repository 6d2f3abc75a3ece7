//! Public upload listing
//!
//! `GET /public` returns the uploads whose visibility flag is set, most
//! recent first. `?reverse=true` flips to oldest-first. Rendering is the
//! frontend's concern; this only exposes the ledger query.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{SortOrder, UploadRecord, UploadRepository};
use crate::error::Result;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PublicQuery {
    #[serde(default)]
    reverse: bool,
}

/// One public upload, without the submitter address.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUpload {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    pub create_time: i64,
    pub url: String,
}

#[derive(Serialize)]
pub struct PublicListResponse {
    pub uploads: Vec<PublicUpload>,
    pub total: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_public))
}

async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<PublicQuery>,
) -> Result<Json<PublicListResponse>> {
    let order = if query.reverse {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    };

    let records = UploadRepository::new(state.db()).list_public(order).await?;

    let uploads: Vec<PublicUpload> = records.into_iter().map(view).collect();
    let total = uploads.len();

    Ok(Json(PublicListResponse { uploads, total }))
}

fn view(record: UploadRecord) -> PublicUpload {
    let url = format!("/uploads/{}", urlencoding::encode(&record.filename));
    PublicUpload {
        id: record.id,
        filename: record.filename,
        original_filename: record.original_filename,
        create_time: record.create_time,
        url,
    }
}
