use econews_agent::dataset::ArticleTable;
use econews_agent::scraping::{HarvestConfig, NewsHarvester, ScrapingError};

const LISTING: &str = r#"<html><body>
<table class="forumgrid">
  <tr><td><a href="news/1">Fed holds rates</a></td></tr>
  <tr><td><a href="news/2">No body here</a></td></tr>
</table>
</body></html>"#;

fn harvester(server: &mockito::Server) -> NewsHarvester {
    let config = HarvestConfig::default()
        .with_listing_url(format!("{}/list", server.url()))
        .with_article_root(format!("{}/", server.url()));
    NewsHarvester::new(config).unwrap()
}

#[tokio::test]
async fn test_full_crawl_in_order_with_defaults() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/list")
        .with_status(200)
        .with_body(LISTING)
        .create_async()
        .await;
    let first = server
        .mock("GET", "/news/1")
        .with_status(200)
        .with_body("<html><body><h1>Fed holds rates</h1><article>Rates unchanged.</article></body></html>")
        .create_async()
        .await;
    let second = server
        .mock("GET", "/news/2")
        .with_status(200)
        .with_body("<html><body><h2>Sub heading only</h2></body></html>")
        .create_async()
        .await;

    let records = harvester(&server).harvest().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Fed holds rates");
    assert_eq!(records[0].article, "Rates unchanged.");
    assert_eq!(records[1].title, "No title");
    assert_eq!(records[1].article, "No content");
    first.assert_async().await;
    second.assert_async().await;

    let csv = ArticleTable::from_records(&records).to_csv_bytes().unwrap();
    let back = ArticleTable::from_csv_bytes(&csv).unwrap().to_records().unwrap();
    assert_eq!(back, records);
}

#[tokio::test]
async fn test_failed_article_aborts_harvest() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/list")
        .with_status(200)
        .with_body(LISTING)
        .create_async()
        .await;
    server
        .mock("GET", "/news/1")
        .with_status(503)
        .create_async()
        .await;
    let never = server
        .mock("GET", "/news/2")
        .expect(0)
        .create_async()
        .await;

    let result = harvester(&server).harvest().await;

    assert!(matches!(result, Err(ScrapingError::HttpStatus { status: 503, .. })));
    never.assert_async().await;
}
