use mockito::Matcher;
use mqcatalog::{ApiOptions, CatalogError, CatalogSearch, QobuzClient, SearchRequest};
use std::time::Duration;

fn client_for(url: &str) -> anyhow::Result<QobuzClient> {
    Ok(QobuzClient::with_options(
        ApiOptions::new("test-app").base_url(url),
    )?)
}

#[tokio::test]
async fn search_returns_normalized_tracks() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search/getResults")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("app_id".into(), "test-app".into()),
            Matcher::UrlEncoded("query".into(), "kind of blue".into()),
            Matcher::UrlEncoded("limit".into(), "5".into()),
            Matcher::UrlEncoded("offset".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "tracks": {
                    "total": 321,
                    "items": [
                        {
                            "id": 1234,
                            "title": "So What",
                            "performer": {"name": "Miles Davis"},
                            "album": {"title": "Kind of Blue", "image": {"small": "https://img/s.jpg"}}
                        },
                        {"title": "", "artist": {"name": ""}}
                    ]
                }
            }"#,
        )
        .create_async()
        .await;

    let client = client_for(&server.url())?;
    let request = SearchRequest::new("  kind of blue ", 5, 10)?;
    let page = client.search_tracks(&request).await?;

    mock.assert_async().await;
    assert_eq!(page.total, 321);
    assert_eq!(page.items.len(), 2);

    let first = &page.items[0];
    assert_eq!(first.id, "1234");
    assert_eq!(first.title, "So What");
    assert_eq!(first.artist, "Miles Davis");
    assert_eq!(first.album.as_deref(), Some("Kind of Blue"));
    assert_eq!(first.cover.as_deref(), Some("https://img/s.jpg"));

    let second = &page.items[1];
    assert!(!second.id.is_empty());
    assert_eq!(second.title, "Unknown title");
    assert_eq!(second.artist, "Unknown artist");
    assert_eq!(second.album, None);
    assert_eq!(second.cover, None);

    Ok(())
}

#[tokio::test]
async fn missing_total_falls_back_to_item_count() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search/getResults")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"tracks": {"items": [{"id": "a"}, {"id": "b"}, {"id": "c"}]}}"#)
        .create_async()
        .await;

    let client = client_for(&server.url())?;
    let page = client
        .search_tracks(&SearchRequest::new("x", 20, 0)?)
        .await?;

    assert_eq!(page.total, 3);
    Ok(())
}

#[tokio::test]
async fn missing_tracks_section_gives_empty_page() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search/getResults")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"albums": {"items": []}}"#)
        .create_async()
        .await;

    let client = client_for(&server.url())?;
    let page = client
        .search_tracks(&SearchRequest::new("x", 20, 0)?)
        .await?;

    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
    Ok(())
}

#[tokio::test]
async fn upstream_status_is_reported() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search/getResults")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("internal details that must not leak")
        .create_async()
        .await;

    let client = client_for(&server.url())?;
    let err = client
        .search_tracks(&SearchRequest::new("x", 20, 0)?)
        .await
        .unwrap_err();

    assert!(err.is_upstream());
    assert_eq!(
        err.to_string(),
        "Qobuz request failed: Qobuz responded with 500"
    );
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_upstream_error() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search/getResults")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let client = client_for(&server.url())?;
    let err = client
        .search_tracks(&SearchRequest::new("x", 20, 0)?)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Upstream(_)));
    Ok(())
}

#[tokio::test]
async fn silent_upstream_times_out() -> anyhow::Result<()> {
    // Accepte les connexions sans jamais répondre
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let holder = tokio::spawn(async move {
        let mut sockets = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            sockets.push(socket);
        }
    });

    let client = QobuzClient::with_options(
        ApiOptions::new("test-app")
            .base_url(format!("http://{}", addr))
            .timeouts(Duration::from_millis(200), Duration::from_millis(200)),
    )?;

    let err = client
        .search_tracks(&SearchRequest::new("x", 20, 0)?)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Qobuz request failed: Qobuz request timed out");
    holder.abort();
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_upstream_error() -> anyhow::Result<()> {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?
    };

    let client = client_for(&format!("http://{}", addr))?;
    let err = client
        .search_tracks(&SearchRequest::new("x", 20, 0)?)
        .await
        .unwrap_err();

    assert!(err.is_upstream());
    Ok(())
}
