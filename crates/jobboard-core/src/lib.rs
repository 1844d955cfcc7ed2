//! Core domain model for the job board: raw feed items and persisted postings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobboard-core";

/// Company value stored when no extraction strategy yields a name.
pub const UNKNOWN_COMPANY: &str = "N/A";

/// Parsed/pre-normalized handoff contract from feed adapters into the ingestion pipeline.
///
/// Every field is optional because feeds routinely omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub content: Option<String>,
    pub pub_date: Option<String>,
    pub guid: Option<String>,
    /// Feed-specific `<company>` extension element.
    pub company: Option<String>,
    /// `dc:creator` (or Atom `author/name`).
    pub creator: Option<String>,
}

impl FeedItem {
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn content_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Stable dedup key: the guid, falling back to the link for guid-less RSS items.
    pub fn identifier(&self) -> Option<&str> {
        self.guid
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .or_else(|| self.link.as_deref().map(str::trim).filter(|l| !l.is_empty()))
    }
}

/// Insert payload produced by the field extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobPosting {
    pub guid: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub company: String,
    pub pub_date: DateTime<Utc>,
}

/// Canonical persisted posting. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub guid: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub company: String,
    pub pub_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl JobPosting {
    pub fn from_new(new: NewJobPosting, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            guid: new.guid,
            title: new.title,
            url: new.url,
            description: new.description,
            company: new.company,
            pub_date: new.pub_date,
            created_at,
        }
    }
}
