//! Job posting persistence + HTTP fetch utilities for the job board.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobboard_core::{JobPosting, NewJobPosting};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobboard-storage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same guid already exists; nothing was written.
    AlreadyPresent,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Record-oriented persistence used by the ingestion pipeline and the listing.
///
/// No update or delete operations: postings are immutable once inserted.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_by_guid(&self, guid: &str) -> Result<Option<JobPosting>, StoreError>;

    /// Insert-or-ignore keyed on `guid`.
    async fn insert(&self, job: &NewJobPosting) -> Result<InsertOutcome, StoreError>;

    /// All postings, newest publication date first.
    async fn list_all(&self) -> Result<Vec<JobPosting>, StoreError>;
}

/// Process-local store for tests and embedding; holds nothing across restarts.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    rows: RwLock<Vec<JobPosting>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_by_guid(&self, guid: &str) -> Result<Option<JobPosting>, StoreError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|row| row.guid == guid)
            .cloned())
    }

    async fn insert(&self, job: &NewJobPosting) -> Result<InsertOutcome, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.guid == job.guid) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        rows.push(JobPosting::from_new(job.clone(), Utc::now()));
        Ok(InsertOutcome::Inserted)
    }

    async fn list_all(&self) -> Result<Vec<JobPosting>, StoreError> {
        let mut rows = self.rows.read().await.clone();
        rows.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        Ok(rows)
    }
}

const SCHEMA_DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id          UUID PRIMARY KEY,
        guid        TEXT NOT NULL,
        title       TEXT NOT NULL,
        url         TEXT NOT NULL,
        description TEXT NOT NULL,
        company     TEXT NOT NULL,
        pub_date    TIMESTAMPTZ NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS jobs_guid_key ON jobs (guid)",
    "CREATE INDEX IF NOT EXISTS jobs_pub_date_idx ON jobs (pub_date DESC)",
];

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("connecting to postgres")?;
        Ok(Self::new(pool))
    }

    /// Idempotent bootstrap of the `jobs` table and its unique guid index.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA_DDL {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("bootstrapping jobs schema")?;
        }
        Ok(())
    }
}

fn posting_from_row(row: &PgRow) -> Result<JobPosting, sqlx::Error> {
    Ok(JobPosting {
        id: row.try_get("id")?,
        guid: row.try_get("guid")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        description: row.try_get("description")?,
        company: row.try_get("company")?,
        pub_date: row.try_get::<DateTime<Utc>, _>("pub_date")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_by_guid(&self, guid: &str) -> Result<Option<JobPosting>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, guid, title, url, description, company, pub_date, created_at
              FROM jobs
             WHERE guid = $1
            "#,
        )
        .bind(guid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(posting_from_row).transpose()?)
    }

    async fn insert(&self, job: &NewJobPosting) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, guid, title, url, description, company, pub_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (guid) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&job.guid)
        .bind(&job.title)
        .bind(&job.url)
        .bind(&job.description)
        .bind(&job.company)
        .bind(job.pub_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyPresent)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn list_all(&self) -> Result<Vec<JobPosting>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, guid, title, url, description, company, pub_date, created_at
              FROM jobs
             ORDER BY pub_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(posting_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
        }
    }
}

/// Single-shot HTTP GET client shared by every live feed source.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    pub fn shared(config: HttpClientConfig) -> anyhow::Result<Arc<Self>> {
        Ok(Arc::new(Self::new(config)?))
    }

    pub async fn fetch_bytes(
        &self,
        run_id: Uuid,
        source_id: &str,
        url: &str,
    ) -> Result<FetchedResponse, FetchError> {
        let span = info_span!("http_fetch", %run_id, source_id, url);
        async {
            let resp = self.client.get(url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    url: resp.url().to_string(),
                });
            }

            let body = resp.bytes().await?.to_vec();
            debug!(bytes = body.len(), "fetched feed body");
            Ok(FetchedResponse { body })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_posting(guid: &str, day: u32) -> NewJobPosting {
        NewJobPosting {
            guid: guid.to_string(),
            title: format!("Job {guid}"),
            url: format!("https://example.com/{guid}"),
            description: "<p>desc</p>".into(),
            company: "Acme".into(),
            pub_date: Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).single().unwrap(),
        }
    }

    #[tokio::test]
    async fn memory_store_ignores_duplicate_guid() {
        let store = MemoryJobStore::new();
        assert_eq!(
            store.insert(&new_posting("a", 1)).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert(&new_posting("a", 2)).await.unwrap(),
            InsertOutcome::AlreadyPresent
        );
        assert_eq!(store.len().await, 1);

        let found = store.find_by_guid("a").await.unwrap().expect("row");
        assert_eq!(found.pub_date.format("%d").to_string(), "01");
        assert!(store.find_by_guid("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_lists_newest_first() {
        let store = MemoryJobStore::new();
        for (guid, day) in [("old", 1), ("newest", 20), ("mid", 10)] {
            store.insert(&new_posting(guid, day)).await.unwrap();
        }
        let guids = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.guid)
            .collect::<Vec<_>>();
        assert_eq!(guids, vec!["newest", "mid", "old"]);
    }

    #[test]
    fn http_fetcher_builds_with_user_agent() {
        let fetcher = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(5),
            user_agent: Some("jobboard-test/0.1".into()),
        });
        assert!(fetcher.is_ok());
    }
}
