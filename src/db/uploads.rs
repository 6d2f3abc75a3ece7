//! Upload ledger persistence
//!
//! One row per accepted upload. Rows are never updated or deleted; the only
//! queries are the insert on ingestion and the public listing.

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::Result;

/// A recorded upload.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UploadRecord {
    pub id: i64,
    /// Stored name, unique for the lifetime of the store.
    pub filename: String,
    /// Untrusted name the client supplied.
    pub original_filename: String,
    pub ip: String,
    /// Unix seconds.
    pub create_time: i64,
    pub is_public: bool,
}

/// Insert payload; the id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub filename: String,
    pub original_filename: String,
    pub ip: String,
    pub create_time: i64,
    pub is_public: bool,
}

/// Listing order for the public feed. Most recent first unless the caller
/// asks otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Repository over the `uploads` table
pub struct UploadRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UploadRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an upload. Returns the auto-assigned, strictly increasing id.
    pub async fn insert(&self, upload: &NewUpload) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO uploads (filename, original_filename, ip, create_time, is_public)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&upload.filename)
        .bind(&upload.original_filename)
        .bind(&upload.ip)
        .bind(upload.create_time)
        .bind(upload.is_public)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// List public uploads ordered by creation time.
    pub async fn list_public(&self, order: SortOrder) -> Result<Vec<UploadRecord>> {
        let sql = match order {
            SortOrder::Descending => {
                r#"
                SELECT id, filename, original_filename, ip, create_time, is_public
                FROM uploads
                WHERE is_public = 1
                ORDER BY create_time DESC
                "#
            }
            SortOrder::Ascending => {
                r#"
                SELECT id, filename, original_filename, ip, create_time, is_public
                FROM uploads
                WHERE is_public = 1
                ORDER BY create_time ASC
                "#
            }
        };

        let records = sqlx::query_as::<_, UploadRecord>(sql)
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::initialize_schema(&pool).await.unwrap();
        pool
    }

    fn upload(filename: &str, create_time: i64, is_public: bool) -> NewUpload {
        NewUpload {
            filename: filename.to_string(),
            original_filename: format!("orig-{}", filename),
            ip: "127.0.0.1".to_string(),
            create_time,
            is_public,
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let pool = setup_test_db().await;
        let repo = UploadRepository::new(&pool);

        let a = repo.insert(&upload("a.txt", 100, false)).await.unwrap();
        let b = repo.insert(&upload("b.txt", 200, false)).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn duplicate_stored_name_is_rejected() {
        let pool = setup_test_db().await;
        let repo = UploadRepository::new(&pool);

        repo.insert(&upload("a.txt", 100, false)).await.unwrap();
        assert!(repo.insert(&upload("a.txt", 101, false)).await.is_err());
    }

    #[tokio::test]
    async fn list_public_filters_and_orders_descending() {
        let pool = setup_test_db().await;
        let repo = UploadRepository::new(&pool);

        repo.insert(&upload("old.txt", 100, true)).await.unwrap();
        repo.insert(&upload("secret.txt", 150, false)).await.unwrap();
        repo.insert(&upload("new.txt", 200, true)).await.unwrap();

        let records = repo.list_public(SortOrder::default()).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["new.txt", "old.txt"]);
        assert!(records.iter().all(|r| r.is_public));
    }

    #[tokio::test]
    async fn list_public_ascending_on_request() {
        let pool = setup_test_db().await;
        let repo = UploadRepository::new(&pool);

        repo.insert(&upload("old.txt", 100, true)).await.unwrap();
        repo.insert(&upload("new.txt", 200, true)).await.unwrap();

        let records = repo.list_public(SortOrder::Ascending).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["old.txt", "new.txt"]);
    }
}
