//! Feed source contracts + RSS/Atom adapter implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use jobboard_core::FeedItem;
use jobboard_storage::{FetchError, HttpFetcher};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobboard-adapters";

/// How a configured source obtains its feed document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    #[default]
    Live,
    Fixture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterContext {
    pub run_id: Uuid,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to parse feed: {0}")]
    Parse(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    fn source_id(&self) -> &str;

    /// Where the feed document comes from (URL or fixture path), for logs.
    fn location(&self) -> String;

    async fn fetch_items(&self, ctx: &AdapterContext) -> Result<Vec<FeedItem>, AdapterError>;
}

/// Live RSS/Atom source fetched over HTTP.
#[derive(Debug, Clone)]
pub struct RssFeedSource {
    source_id: String,
    url: String,
    http: Arc<HttpFetcher>,
}

impl RssFeedSource {
    pub fn new(source_id: impl Into<String>, url: impl Into<String>, http: Arc<HttpFetcher>) -> Self {
        Self {
            source_id: source_id.into(),
            url: url.into(),
            http,
        }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch_items(&self, ctx: &AdapterContext) -> Result<Vec<FeedItem>, AdapterError> {
        let response = self
            .http
            .fetch_bytes(ctx.run_id, &self.source_id, &self.url)
            .await?;
        parse_feed(&response.body)
    }
}

/// Source reading a captured feed document from disk or from memory.
#[derive(Debug, Clone)]
pub struct FixtureFeedSource {
    source_id: String,
    path: Option<PathBuf>,
    inline_xml: Option<String>,
}

impl FixtureFeedSource {
    pub fn from_path(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: Some(path.into()),
            inline_xml: None,
        }
    }

    pub fn from_xml(source_id: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            path: None,
            inline_xml: Some(xml.into()),
        }
    }
}

#[async_trait]
impl FeedSource for FixtureFeedSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "<inline-fixture>".to_string(),
        }
    }

    async fn fetch_items(&self, _ctx: &AdapterContext) -> Result<Vec<FeedItem>, AdapterError> {
        if let Some(xml) = &self.inline_xml {
            return parse_feed(xml.as_bytes());
        }
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let bytes = read_fixture(path).await?;
        parse_feed(&bytes)
    }
}

async fn read_fixture(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("reading feed fixture {}", path.display()))
}

/// Per-item accumulator; content and date fields keep their alternatives
/// apart so precedence is resolved once the item closes.
#[derive(Debug, Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    atom_content: Option<String>,
    encoded_content: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    guid: Option<String>,
    company: Option<String>,
    creator: Option<String>,
}

impl ItemBuilder {
    /// `value` is the element's full text, whitespace included; it is trimmed
    /// here so text split across CDATA sections keeps its inner spacing.
    fn assign(&mut self, parent: &str, name: &str, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        if parent == "author" {
            if name == "name" {
                self.creator.get_or_insert(value);
            }
            return;
        }
        let slot = match name {
            "title" => &mut self.title,
            "link" => &mut self.link,
            "description" => &mut self.description,
            "content" => &mut self.atom_content,
            "content:encoded" => &mut self.encoded_content,
            "summary" => &mut self.summary,
            "pubDate" | "published" => &mut self.published,
            "updated" | "dc:date" => &mut self.updated,
            "guid" | "id" => &mut self.guid,
            "company" => &mut self.company,
            "dc:creator" => &mut self.creator,
            _ => return,
        };
        slot.get_or_insert(value);
    }

    fn link_from_attributes(&mut self, element: &BytesStart<'_>) {
        if self.link.is_some() {
            return;
        }
        let rel = attribute_value(element, "rel");
        if matches!(rel.as_deref(), None | Some("alternate")) {
            self.link = attribute_value(element, "href");
        }
    }

    fn build(self) -> FeedItem {
        FeedItem {
            title: self.title,
            link: self.link,
            // RSS <description> is the body; content:encoded only fills in
            // when it is absent. Atom prefers <content> over <summary>.
            content: self
                .description
                .or(self.atom_content)
                .or(self.encoded_content)
                .or(self.summary),
            pub_date: self.published.or(self.updated),
            guid: self.guid,
            company: self.company,
            creator: self.creator,
        }
    }
}

fn attribute_value(element: &BytesStart<'_>, key: &str) -> Option<String> {
    element
        .try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn text_value(text: &BytesText<'_>) -> String {
    text.unescape()
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(text).into_owned())
}

fn is_item_element(name: &str) -> bool {
    name == "item" || name == "entry"
}

fn is_feed_root(name: &str) -> bool {
    matches!(name, "rss" | "feed" | "rdf:RDF" | "channel")
}

/// Parse an RSS 2.0, RSS 1.0 or Atom document into feed items.
///
/// Unknown elements are ignored. A document without a feed root element is
/// rejected so that HTML error pages do not parse as an empty feed.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedItem>, AdapterError> {
    let mut reader = Reader::from_reader(xml);

    let mut items = Vec::new();
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut saw_root = false;

    // Index into `stack` of the open <item>/<entry>, if any.
    let mut item_depth: Option<usize> = None;
    let mut current: Option<ItemBuilder> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);
                if stack.is_empty() && is_feed_root(&name) {
                    saw_root = true;
                }
                if item_depth.is_none() && is_item_element(&name) {
                    item_depth = Some(stack.len());
                    current = Some(ItemBuilder::default());
                } else if let Some(builder) = current.as_mut() {
                    if name == "link" {
                        builder.link_from_attributes(&e);
                    }
                }
                stack.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                if let (Some(builder), "link") = (current.as_mut(), name.as_str()) {
                    builder.link_from_attributes(&e);
                }
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    text.push_str(&text_value(&e));
                }
            }
            Ok(Event::CData(e)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let name = stack.pop().unwrap_or_default();
                match item_depth {
                    Some(depth) if stack.len() == depth => {
                        if let Some(builder) = current.take() {
                            items.push(builder.build());
                        }
                        item_depth = None;
                    }
                    Some(depth) if stack.len() > depth => {
                        // Direct children of the item have no parent context.
                        let parent = if stack.len() == depth + 1 {
                            ""
                        } else {
                            stack.last().map(String::as_str).unwrap_or_default()
                        };
                        if let Some(builder) = current.as_mut() {
                            builder.assign(parent, &name, std::mem::take(&mut text));
                        }
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AdapterError::Parse(format!("XML parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(AdapterError::Parse(
            "document is not an RSS or Atom feed".to_string(),
        ));
    }

    debug!(items = items.len(), "parsed feed document");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Remote Jobs</title>
    <link>https://jobs.example.com</link>
    <item>
      <title>Acme Corp: Senior Rust Engineer</title>
      <link>https://jobs.example.com/1</link>
      <guid isPermaLink="false">job-1</guid>
      <pubDate>Tue, 05 Mar 2024 10:00:00 +0000</pubDate>
      <description>&lt;b&gt;Company:&lt;/b&gt; Acme Corp&lt;br&gt;Build things.</description>
      <company>Acme Corp</company>
    </item>
    <item>
      <title>Data Scientist</title>
      <link>https://jobs.example.com/2</link>
      <guid>job-2</guid>
      <dc:creator>Initech</dc:creator>
      <content:encoded><![CDATA[<p>Full <b>python</b> role</p>]]></content:encoded>
    </item>
    <item>
      <title>Analyst</title>
      <guid>job-3</guid>
      <description>&lt;b&gt;Company:&lt;/b&gt; Initech&lt;br&gt; pandas and numpy</description>
      <content:encoded><![CDATA[<p>Full posting body</p>]]></content:encoded>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Jobs</title>
  <entry>
    <title>ML Engineer</title>
    <link rel="alternate" href="https://atom.example.com/ml"/>
    <id>urn:uuid:1225c695</id>
    <updated>2024-03-01T08:00:00Z</updated>
    <published>2024-02-28T08:00:00Z</published>
    <author><name>Globex</name></author>
    <summary type="html">&lt;p&gt;pytorch&lt;/p&gt;</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items_with_extension_fields() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(items.len(), 3);

        let first = &items[0];
        assert_eq!(first.title.as_deref(), Some("Acme Corp: Senior Rust Engineer"));
        assert_eq!(first.link.as_deref(), Some("https://jobs.example.com/1"));
        assert_eq!(first.guid.as_deref(), Some("job-1"));
        assert_eq!(first.pub_date.as_deref(), Some("Tue, 05 Mar 2024 10:00:00 +0000"));
        assert_eq!(first.company.as_deref(), Some("Acme Corp"));
        assert_eq!(
            first.content.as_deref(),
            Some("<b>Company:</b> Acme Corp<br>Build things.")
        );

        let second = &items[1];
        assert_eq!(second.creator.as_deref(), Some("Initech"));
        assert_eq!(second.content.as_deref(), Some("<p>Full <b>python</b> role</p>"));
        assert!(second.pub_date.is_none());
    }

    #[test]
    fn rss_description_wins_over_encoded_content() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        let analyst = &items[2];
        assert_eq!(
            analyst.content.as_deref(),
            Some("<b>Company:</b> Initech<br> pandas and numpy")
        );
    }

    #[test]
    fn text_around_cdata_keeps_its_spacing() {
        let xml = r#"<rss><channel><item>
            <title>Analyst</title>
            <description>  Uses python <![CDATA[<b>and</b>]]> sql daily  </description>
        </item></channel></rss>"#;
        let items = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(
            items[0].content.as_deref(),
            Some("Uses python <b>and</b> sql daily")
        );
        assert_eq!(items[0].title.as_deref(), Some("Analyst"));
    }

    #[test]
    fn channel_level_fields_do_not_leak_into_items() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        assert!(items.iter().all(|i| i.title.as_deref() != Some("Remote Jobs")));
    }

    #[test]
    fn parses_atom_entries() {
        let items = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        let entry = &items[0];
        assert_eq!(entry.link.as_deref(), Some("https://atom.example.com/ml"));
        assert_eq!(entry.guid.as_deref(), Some("urn:uuid:1225c695"));
        assert_eq!(entry.pub_date.as_deref(), Some("2024-02-28T08:00:00Z"));
        assert_eq!(entry.creator.as_deref(), Some("Globex"));
        assert_eq!(entry.content.as_deref(), Some("<p>pytorch</p>"));
    }

    #[test]
    fn rejects_non_feed_documents() {
        let err = parse_feed(b"<html><body>Service Unavailable</body></html>").unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
    }

    #[tokio::test]
    async fn inline_fixture_source_parses_without_network() {
        let source = FixtureFeedSource::from_xml("inline", RSS);
        let ctx = AdapterContext { run_id: Uuid::new_v4() };
        let items = source.fetch_items(&ctx).await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(source.location(), "<inline-fixture>");
    }

    #[tokio::test]
    async fn missing_fixture_file_is_an_error() {
        let source = FixtureFeedSource::from_path("missing", "/definitely/not/here.xml");
        let ctx = AdapterContext { run_id: Uuid::new_v4() };
        assert!(source.fetch_items(&ctx).await.is_err());
    }
}
