//! SQLite checkpoint store.
//!
//! Single table, one row per published checkpoint:
//!
//! ```sql
//! CREATE TABLE postreference (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     agency TEXT, region TEXT, position TEXT, item_no TEXT,
//!     posting_date TEXT, closing_date TEXT,
//!     jobid TEXT NOT NULL UNIQUE, job_link TEXT
//! )
//! ```
//!
//! "Latest" is the row with the highest `id`.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions,
};
use sqlx::{FromRow, Row};

use crate::error::Result;
use crate::models::Posting;
use crate::storage::RecordStore;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS postreference (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agency TEXT NOT NULL DEFAULT '',
    region TEXT NOT NULL DEFAULT '',
    position TEXT NOT NULL DEFAULT '',
    item_no TEXT NOT NULL DEFAULT '',
    posting_date TEXT NOT NULL DEFAULT '',
    closing_date TEXT NOT NULL DEFAULT '',
    jobid TEXT NOT NULL UNIQUE,
    job_link TEXT NOT NULL DEFAULT ''
)
"#;

#[derive(FromRow)]
struct PostingRow {
    agency: String,
    region: String,
    position: String,
    item_no: String,
    posting_date: String,
    closing_date: String,
    jobid: String,
    job_link: String,
}

impl From<PostingRow> for Posting {
    fn from(row: PostingRow) -> Self {
        Posting {
            agency: row.agency,
            region: row.region,
            position: row.position,
            item_no: row.item_no,
            posting_date: row.posting_date,
            closing_date: row.closing_date,
            job_id: row.jobid,
            job_link: row.job_link,
        }
    }
}

/// SQLite-backed checkpoint store.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if needed) the database file and ensure the table exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        log::debug!("Opening checkpoint database {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

fn insert_query(posting: &Posting) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(
        "INSERT OR IGNORE INTO postreference \
         (agency, region, position, item_no, posting_date, closing_date, jobid, job_link) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&posting.agency)
    .bind(&posting.region)
    .bind(&posting.position)
    .bind(&posting.item_no)
    .bind(&posting.posting_date)
    .bind(&posting.closing_date)
    .bind(&posting.job_id)
    .bind(&posting.job_link)
}

#[async_trait]
impl RecordStore for SqliteStorage {
    async fn get_latest(&self) -> Result<Option<Posting>> {
        let row = sqlx::query_as::<_, PostingRow>(
            "SELECT agency, region, position, item_no, posting_date, closing_date, jobid, job_link \
             FROM postreference ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Posting::from))
    }

    async fn insert(&self, posting: &Posting) -> Result<()> {
        let result = insert_query(posting).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            log::debug!("Job {} already stored", posting.job_id);
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM postreference")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM postreference")
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    /// Delete and insert in one transaction, so a failed insert keeps
    /// the previous checkpoint.
    async fn replace_checkpoint(&self, posting: &Posting) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM postreference")
            .execute(&mut *tx)
            .await?;
        insert_query(posting).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
