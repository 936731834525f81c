use std::time::Duration;

use anyhow::Result;
use httpmock::prelude::*;
use webeval::{
    gallery::{GallerySession, Intent},
    resource::{build_resource_url, ResourceCache, ResourceFetcher},
    webeval::snippets,
};

const BYTES_PATH: &str = "/webeval/web/bytes";

#[tokio::test]
async fn fetch_downloads_once_and_then_serves_from_cache() -> Result<()> {
    let server = MockServer::start_async().await;
    let expr = snippets::file_bytes_expression("/data/a.png");
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/webeval/web/bytes/a.png")
                .query_param("code", expr.as_str())
                .query_param("content_type", "image/png")
                .query_param("cache_key", "0");
            then.status(200).header("content-type", "image/png").body(b"\x89PNG-bytes");
        })
        .await;

    let dir = tempfile::tempdir()?;
    let cache = ResourceCache::new(dir.path().to_path_buf(), 10);
    let fetcher = ResourceFetcher::new(Duration::from_secs(5), Some(cache.clone()))?;

    let url = build_resource_url(&server.url(BYTES_PATH), "a.png", &expr, "image/png", 0);
    assert_eq!(fetcher.fetch(&url).await?, b"\x89PNG-bytes");
    assert_eq!(fetcher.fetch(&url).await?, b"\x89PNG-bytes");
    assert_eq!(cache.get(&url).as_deref(), Some(&b"\x89PNG-bytes"[..]));

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn new_cache_key_bypasses_cached_bytes() -> Result<()> {
    let server = MockServer::start_async().await;
    let old = server
        .mock_async(|when, then| {
            when.method(GET).path("/webeval/web/bytes/a.png").query_param("cache_key", "0");
            then.status(200).body("old");
        })
        .await;
    let new = server
        .mock_async(|when, then| {
            when.method(GET).path("/webeval/web/bytes/a.png").query_param("cache_key", "1");
            then.status(200).body("new");
        })
        .await;

    let dir = tempfile::tempdir()?;
    let fetcher = ResourceFetcher::new(
        Duration::from_secs(5),
        Some(ResourceCache::new(dir.path().to_path_buf(), 10)),
    )?;
    let expr = snippets::file_bytes_expression("/data/a.png");
    let base = server.url(BYTES_PATH);

    assert_eq!(fetcher.fetch(&build_resource_url(&base, "a.png", &expr, "image/png", 0)).await?, b"old");
    assert_eq!(fetcher.fetch(&build_resource_url(&base, "a.png", &expr, "image/png", 1)).await?, b"new");
    old.assert_async().await;
    new.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn failed_fetch_is_a_resource_load_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/webeval/web/bytes/missing.png");
            then.status(500).body("FileNotFoundError");
        })
        .await;

    let dir = tempfile::tempdir()?;
    let cache = ResourceCache::new(dir.path().to_path_buf(), 10);
    let fetcher = ResourceFetcher::new(Duration::from_secs(5), Some(cache.clone()))?;
    let url = build_resource_url(&server.url(BYTES_PATH), "missing.png", "b''", "image/png", 0);

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(err.url, url);
    assert!(err.reason.contains("500"));
    // failures are not cached
    assert!(cache.is_empty());
    Ok(())
}

async fn fetch_visible(session: &mut GallerySession, fetcher: &ResourceFetcher) -> Result<Vec<Vec<u8>>> {
    let mut payloads = Vec::new();
    for request in session.sync_tiles() {
        payloads.push(fetcher.fetch(&request.url).await?);
    }
    Ok(payloads)
}

#[tokio::test]
async fn restarted_session_does_not_reuse_earlier_entries() -> Result<()> {
    let server = MockServer::start_async().await;
    let mut old = server
        .mock_async(|when, then| {
            when.method(GET).path("/webeval/web/bytes/img.png");
            then.status(200).body("OLD");
        })
        .await;

    let dir = tempfile::tempdir()?;
    let base = server.url(BYTES_PATH);

    // first run: epoch 0, then a reload to epoch 1
    let first = ResourceFetcher::new(
        Duration::from_secs(5),
        Some(ResourceCache::new(dir.path().to_path_buf(), 10)),
    )?;
    let mut session = GallerySession::new(&base, "image/png");
    session.resources = vec!["/img.png".to_string()];
    assert_eq!(fetch_visible(&mut session, &first).await?, vec![b"OLD".to_vec()]);
    session.dispatch(Intent::Reload);
    assert_eq!(fetch_visible(&mut session, &first).await?, vec![b"OLD".to_vec()]);

    old.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/webeval/web/bytes/img.png");
            then.status(200).body("NEW");
        })
        .await;

    // second run over the same cache dir starts again at epoch 0
    let second = ResourceFetcher::new(
        Duration::from_secs(5),
        Some(ResourceCache::new(dir.path().to_path_buf(), 10)),
    )?;
    let mut restarted = GallerySession::new(&base, "image/png");
    restarted.resources = vec!["/img.png".to_string()];
    assert_eq!(fetch_visible(&mut restarted, &second).await?, vec![b"NEW".to_vec()]);
    restarted.dispatch(Intent::Reload);
    assert_eq!(fetch_visible(&mut restarted, &second).await?, vec![b"NEW".to_vec()]);
    Ok(())
}

#[test]
fn cache_prunes_oldest_entries() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = ResourceCache::new(dir.path().to_path_buf(), 2);
    for i in 0..4 {
        cache.set(&format!("http://h/r?cache_key={}", i), b"x")?;
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(cache.len(), 2);
    assert!(cache.get("http://h/r?cache_key=3").is_some());
    Ok(())
}
