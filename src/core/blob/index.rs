// src/core/blob/index.rs

//! The relational mirror of the object store's metadata (spec §4.8/§6),
//! backed by `sqlx` against SQLite. Grounded on the registry-crate choice
//! the retrieval pack uses for this same role (a small relational cache
//! fronting a larger remote store).

use super::info::BlobInfo;
use crate::core::errors::CoreResult;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

/// Tuning and counts returned by `bulk_update` (spec §4.8/§4.9).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkUpdateCounts {
    pub added: u64,
    pub updated: u64,
    pub kept: u64,
    pub deleted: u64,
}

#[derive(Debug, Clone)]
pub struct BlobIndexConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for BlobIndexConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 10,
        }
    }
}

/// The relational metadata mirror: authoritative for listing/filter
/// endpoints, mutated only by post-write hooks or the periodic reconciler.
pub struct BlobIndex {
    pool: SqlitePool,
}

impl BlobIndex {
    pub async fn connect(config: &BlobIndexConfig) -> CoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        let index = Self { pool };
        index.migrate().await?;
        Ok(index)
    }

    async fn migrate(&self) -> CoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                etag TEXT NOT NULL,
                size INTEGER NOT NULL,
                last_modified TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_blobs_etag ON blobs(etag)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_blobs_last_modified ON blobs(last_modified)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> CoreResult<Option<BlobInfo>> {
        let row = sqlx::query("SELECT key, etag, size, last_modified FROM blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_info))
    }

    pub async fn set(&self, blob: &BlobInfo) -> CoreResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO blobs (key, etag, size, last_modified) VALUES (?, ?, ?, ?)",
        )
        .bind(&blob.key)
        .bind(&blob.etag)
        .bind(blob.size)
        .bind(&blob.last_modified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_many(&self, blobs: &[BlobInfo]) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for blob in blobs {
            sqlx::query(
                "INSERT OR REPLACE INTO blobs (key, etag, size, last_modified) VALUES (?, ?, ?, ?)",
            )
            .bind(&blob.key)
            .bind(&blob.etag)
            .bind(blob.size)
            .bind(&blob.last_modified)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM blobs WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list(&self) -> CoreResult<Vec<BlobInfo>> {
        let rows = sqlx::query("SELECT key, etag, size, last_modified FROM blobs ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_info).collect())
    }

    pub async fn count(&self) -> CoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM blobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    pub async fn filter_by_prefix(&self, prefix: &str) -> CoreResult<Vec<BlobInfo>> {
        let pattern = format!("{}%", escape_like(prefix));
        let rows = sqlx::query(
            "SELECT key, etag, size, last_modified FROM blobs WHERE key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_info).collect())
    }

    pub async fn filter_by_suffix(&self, suffix: &str) -> CoreResult<Vec<BlobInfo>> {
        let pattern = format!("%{}", escape_like(suffix));
        let rows = sqlx::query(
            "SELECT key, etag, size, last_modified FROM blobs WHERE key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_info).collect())
    }

    pub async fn filter_by_key_glob(&self, pattern: &str) -> CoreResult<Vec<BlobInfo>> {
        let matcher = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| crate::core::errors::CoreError::InvalidKey(e.to_string()))?
            .compile_matcher();
        let all = self.list().await?;
        Ok(all.into_iter().filter(|b| matcher.is_match(&b.key)).collect())
    }

    pub async fn filter_by_time(&self, before: Option<&str>, after: Option<&str>) -> CoreResult<Vec<BlobInfo>> {
        let rows = match (before, after) {
            (Some(b), Some(a)) => {
                sqlx::query(
                    "SELECT key, etag, size, last_modified FROM blobs WHERE last_modified < ? AND last_modified > ? ORDER BY last_modified",
                )
                .bind(b)
                .bind(a)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(b), None) => {
                sqlx::query(
                    "SELECT key, etag, size, last_modified FROM blobs WHERE last_modified < ? ORDER BY last_modified",
                )
                .bind(b)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(a)) => {
                sqlx::query(
                    "SELECT key, etag, size, last_modified FROM blobs WHERE last_modified > ? ORDER BY last_modified",
                )
                .bind(a)
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => {
                sqlx::query("SELECT key, etag, size, last_modified FROM blobs ORDER BY last_modified")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(row_to_info).collect())
    }

    /// Diffs `blobs` against the current table contents in one transaction
    /// using a temporary table, and applies the diff (spec §4.8/§4.9).
    pub async fn bulk_update(&self, blobs: &[BlobInfo]) -> CoreResult<BulkUpdateCounts> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "CREATE TEMP TABLE IF NOT EXISTS blobs_incoming (
                key TEXT PRIMARY KEY,
                etag TEXT NOT NULL,
                size INTEGER NOT NULL,
                last_modified TEXT NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM blobs_incoming").execute(&mut *tx).await?;

        for blob in blobs {
            sqlx::query(
                "INSERT INTO blobs_incoming (key, etag, size, last_modified) VALUES (?, ?, ?, ?)",
            )
            .bind(&blob.key)
            .bind(&blob.etag)
            .bind(blob.size)
            .bind(&blob.last_modified)
            .execute(&mut *tx)
            .await?;
        }

        let added = sqlx::query(
            "SELECT COUNT(*) AS n FROM blobs_incoming i
             WHERE NOT EXISTS (SELECT 1 FROM blobs b WHERE b.key = i.key)",
        )
        .fetch_one(&mut *tx)
        .await?
        .try_get::<i64, _>("n")? as u64;

        let updated = sqlx::query(
            "SELECT COUNT(*) AS n FROM blobs_incoming i
             JOIN blobs b ON b.key = i.key
             WHERE b.etag != i.etag OR b.size != i.size OR b.last_modified != i.last_modified",
        )
        .fetch_one(&mut *tx)
        .await?
        .try_get::<i64, _>("n")? as u64;

        let kept = sqlx::query(
            "SELECT COUNT(*) AS n FROM blobs_incoming i
             JOIN blobs b ON b.key = i.key
             WHERE b.etag = i.etag AND b.size = i.size AND b.last_modified = i.last_modified",
        )
        .fetch_one(&mut *tx)
        .await?
        .try_get::<i64, _>("n")? as u64;

        let deleted = sqlx::query(
            "SELECT COUNT(*) AS n FROM blobs b
             WHERE NOT EXISTS (SELECT 1 FROM blobs_incoming i WHERE i.key = b.key)",
        )
        .fetch_one(&mut *tx)
        .await?
        .try_get::<i64, _>("n")? as u64;

        sqlx::query(
            "DELETE FROM blobs WHERE key NOT IN (SELECT key FROM blobs_incoming)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT OR REPLACE INTO blobs (key, etag, size, last_modified)
             SELECT key, etag, size, last_modified FROM blobs_incoming",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM blobs_incoming").execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(BulkUpdateCounts {
            added,
            updated,
            kept,
            deleted,
        })
    }
}

fn row_to_info(row: sqlx::sqlite::SqliteRow) -> BlobInfo {
    BlobInfo {
        key: row.get("key"),
        etag: row.get("etag"),
        size: row.get("size"),
        last_modified: row.get("last_modified"),
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(key: &str) -> BlobInfo {
        BlobInfo {
            key: key.to_string(),
            etag: "e1".to_string(),
            size: 10,
            last_modified: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let index = BlobIndex::connect(&BlobIndexConfig::default()).await.unwrap();
        index.set(&blob("a/b.txt")).await.unwrap();
        let fetched = index.get("a/b.txt").await.unwrap().unwrap();
        assert_eq!(fetched.etag, "e1");
    }

    #[tokio::test]
    async fn bulk_update_counts_add_update_delete() {
        let index = BlobIndex::connect(&BlobIndexConfig::default()).await.unwrap();
        index.set(&blob("keep.txt")).await.unwrap();
        index.set(&blob("gone.txt")).await.unwrap();

        let mut changed = blob("keep.txt");
        changed.etag = "e2".to_string();
        let incoming = vec![changed, blob("new.txt")];

        let counts = index.bulk_update(&incoming).await.unwrap();
        assert_eq!(counts.added, 1);
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.kept, 0);
        assert_eq!(counts.deleted, 1);

        let all = index.list().await.unwrap();
        let keys: Vec<_> = all.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["keep.txt", "new.txt"]);
    }

    #[tokio::test]
    async fn filter_by_prefix_and_suffix() {
        let index = BlobIndex::connect(&BlobIndexConfig::default()).await.unwrap();
        index.set(&blob("user1@e.com/a.txt")).await.unwrap();
        index.set(&blob("user1@e.com/b.md")).await.unwrap();
        index.set(&blob("user2@e.com/a.txt")).await.unwrap();

        let prefixed = index.filter_by_prefix("user1@e.com/").await.unwrap();
        assert_eq!(prefixed.len(), 2);

        let suffixed = index.filter_by_suffix(".md").await.unwrap();
        assert_eq!(suffixed.len(), 1);
    }
}
