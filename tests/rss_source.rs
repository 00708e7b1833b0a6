// tests/rss_source.rs
use market_debate::news::sources::RssSource;
use market_debate::news::NewsSource;

#[tokio::test]
async fn fixture_feed_is_parsed_and_filtered() {
    let xml: &str = include_str!("fixtures/market_rss.xml");
    let src = RssSource::from_fixture("Market wire", "stock", xml, 30);
    let items = src.fetch_latest().await.expect("parse fixture");

    let links: Vec<_> = items.iter().map(|i| i.link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://news.example.com/articles/1001",
            "https://news.example.com/articles/1002",
            "https://news.example.com/articles/1005",
        ],
        "short titles and relative links must be dropped"
    );

    let first = &items[0];
    assert_eq!(first.title, "Samsung Electronics extends rally on HBM orders");
    assert_eq!(
        first.summary,
        "Chipmaker shares rose 3% after new AI memory contracts."
    );
    assert_eq!(first.source, "Market wire");
    assert_eq!(first.category, "stock");
    assert_eq!(first.published_at, "2025-03-03 00:30");
    assert!(first.fetched_at_local().is_some());

    // unparseable pubDate is kept verbatim
    assert_eq!(items[2].published_at, "not a date");
}

#[tokio::test]
async fn max_items_caps_output() {
    let xml: &str = include_str!("fixtures/market_rss.xml");
    let src = RssSource::from_fixture("Market wire", "stock", xml, 1);
    let items = src.fetch_latest().await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn malformed_xml_is_an_error() {
    let src = RssSource::from_fixture("Broken", "stock", "<rss><channel>", 10);
    assert!(src.fetch_latest().await.is_err());
}
