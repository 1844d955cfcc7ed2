use std::path::{Path, PathBuf};

use jobboard_adapters::{AdapterContext, FeedSource, FixtureFeedSource};
use uuid::Uuid;

fn fixture(source_id: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(source_id)
        .join("sample/feed.xml")
}

#[tokio::test]
async fn remotive_fixture_parses_company_extension() {
    let source = FixtureFeedSource::from_path("remotive", fixture("remotive"));
    let ctx = AdapterContext { run_id: Uuid::new_v4() };
    let items = source.fetch_items(&ctx).await.expect("parse remotive fixture");

    assert_eq!(items.len(), 4);
    assert_eq!(items[0].guid.as_deref(), Some("remotive-1001"));
    assert_eq!(items[0].company.as_deref(), Some("Acme Analytics"));
    assert!(items[0].content_or_empty().contains("<b>pytorch</b>"));
    assert!(items[2].company.is_none());
}

#[tokio::test]
async fn weworkremotely_fixture_unescapes_html_descriptions() {
    let source = FixtureFeedSource::from_path("weworkremotely", fixture("weworkremotely"));
    let ctx = AdapterContext { run_id: Uuid::new_v4() };
    let items = source.fetch_items(&ctx).await.expect("parse wwr fixture");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title.as_deref(), Some("Globex: Full-Stack Engineer"));
    assert_eq!(
        items[0].link.as_deref(),
        Some("https://weworkremotely.com/remote-jobs/globex-full-stack-engineer")
    );
    assert!(items[1]
        .content_or_empty()
        .starts_with("<b>Company:</b> Initech<br>"));
}
