//! Field extraction from raw feed items: company, publication date and the
//! dated description stored with each posting.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use jobboard_core::{FeedItem, NewJobPosting, UNKNOWN_COMPANY};
use regex::Regex;

/// A single company-name heuristic. Returns `None` when it does not apply.
pub type CompanyStrategy = fn(&FeedItem) -> Option<String>;

/// Applied in order; the first non-empty result wins.
pub const COMPANY_STRATEGIES: &[CompanyStrategy] = &[
    explicit_company,
    explicit_creator,
    title_prefix,
    body_company_label,
];

static COMPANY_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<b>Company:</b>\s*(.*?)<br\s*/?>").expect("company label pattern compiles")
});

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sept", "Oct", "Nov", "Dec",
];

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn explicit_company(item: &FeedItem) -> Option<String> {
    item.company.as_deref().and_then(non_empty)
}

pub fn explicit_creator(item: &FeedItem) -> Option<String> {
    item.creator.as_deref().and_then(non_empty)
}

/// `"Globex: Engineer"` → `"Globex"`.
pub fn title_prefix(item: &FeedItem) -> Option<String> {
    let (prefix, _) = item.title.as_deref()?.split_once(':')?;
    non_empty(prefix)
}

/// `<b>Company:</b> Initech<br>` inside the body.
pub fn body_company_label(item: &FeedItem) -> Option<String> {
    let content = item.content.as_deref()?;
    let captures = COMPANY_LABEL.captures(content)?;
    non_empty(captures.get(1)?.as_str())
}

pub fn company_name(item: &FeedItem) -> String {
    COMPANY_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(item))
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}

/// Parse a feed date: RFC 2822 (RSS), RFC 3339 (Atom), then a few bare ISO
/// forms interpreted as UTC.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Source date when parseable, otherwise the ingestion time.
pub fn publication_date(item: &FeedItem, now: DateTime<Utc>) -> DateTime<Utc> {
    item.pub_date
        .as_deref()
        .and_then(parse_pub_date)
        .unwrap_or(now)
}

/// `DD-Mon-YYYY`, locale independent.
pub fn format_display_date(date: DateTime<Utc>) -> String {
    format!(
        "{:02}-{}-{}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

pub fn describe_with_date(content: &str, formatted_date: &str) -> String {
    format!("<p><strong>Published on:</strong> {formatted_date}</p><br>{content}")
}

/// Build the insert payload for an item that already passed every filter.
pub fn extract_posting(item: &FeedItem, guid: &str, now: DateTime<Utc>) -> NewJobPosting {
    let pub_date = publication_date(item, now);
    let formatted = format_display_date(pub_date);
    NewJobPosting {
        guid: guid.to_string(),
        title: item
            .title
            .as_deref()
            .and_then(non_empty)
            .unwrap_or_else(|| "Untitled".to_string()),
        url: item.link.clone().unwrap_or_default(),
        description: describe_with_date(item.content_or_empty(), &formatted),
        company: company_name(item),
        pub_date,
    }
}
