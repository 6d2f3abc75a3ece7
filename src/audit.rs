//! Append-only upload audit log
//!
//! One human-readable line per accepted upload. A failed write never fails
//! the request that triggered it; callers report the error and move on.

use std::path::PathBuf;

use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one upload event line.
    pub async fn record(&self, ip: &str, stored_name: &str, bytes: u64) -> std::io::Result<()> {
        let line = format!(
            "[{}] {} uploaded {} ({} bytes)\n",
            Utc::now().to_rfc3339(),
            ip,
            stored_name,
            bytes
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log"));

        log.record("10.0.0.1", "a_BCD.txt", 12).await.unwrap();
        log.record("10.0.0.2", "b_CDE.txt", 34).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("10.0.0.1 uploaded a_BCD.txt (12 bytes)"));
        assert!(lines[1].contains("10.0.0.2 uploaded b_CDE.txt (34 bytes)"));
    }
}
