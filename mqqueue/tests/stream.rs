#![cfg(feature = "mqserver")]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mqqueue::api::create_router;
use mqqueue::{NewEntry, QueueManager, QueueRef};
use serde_json::Value;
use tower::ServiceExt;

/// Lit le prochain message SSE portant des données
async fn next_message(body: &mut Body) -> Value {
    let mut buffer = String::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("no SSE message within 5s")
            .expect("stream ended")
            .unwrap();
        if let Ok(data) = frame.into_data() {
            buffer.push_str(std::str::from_utf8(&data).unwrap());
        }

        while let Some(end) = buffer.find("\n\n") {
            let block: String = buffer.drain(..end + 2).collect();
            let data: String = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if !data.is_empty() {
                return serde_json::from_str(&data).unwrap();
            }
        }
    }
}

#[tokio::test]
async fn stream_sends_init_then_mutations() {
    let manager = QueueManager::in_memory().unwrap();
    let queue = manager.resolve(&QueueRef::by_name("party")).await.unwrap();
    let first = manager
        .add(&queue, NewEntry::new("So What", "Miles Davis").with_track_id("t1"))
        .await
        .unwrap();

    let response = create_router(manager.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/queue/stream?code={}", queue.code))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();

    let init = next_message(&mut body).await;
    assert_eq!(init["type"], "init");
    assert_eq!(init["name"], "party");
    assert_eq!(init["code"], queue.code.as_str());
    assert_eq!(init["items"].as_array().unwrap().len(), 1);

    manager
        .add(&queue, NewEntry::new("Blue in Green", "Miles Davis"))
        .await
        .unwrap();
    let added = next_message(&mut body).await;
    assert_eq!(added["type"], "add");
    assert_eq!(added["item"]["title"], "Blue in Green");
    assert_eq!(added["items"].as_array().unwrap().len(), 2);

    manager.remove(&queue, first.id).await.unwrap();
    let removed = next_message(&mut body).await;
    assert_eq!(removed["type"], "remove");
    assert_eq!(removed["queued_id"], first.id);
    assert_eq!(removed["track_id"], "t1");
    assert_eq!(removed["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn closing_the_stream_unsubscribes() {
    let manager = QueueManager::in_memory().unwrap();
    let queue = manager.create_queue(Some("party")).await.unwrap();

    let response = create_router(manager.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/queue/stream?queue_id={}", queue.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let mut body = response.into_body();
    next_message(&mut body).await;
    assert_eq!(manager.subscriber_count(queue.id), 1);

    drop(body);
    assert_eq!(manager.subscriber_count(queue.id), 0);
}

#[tokio::test]
async fn stream_on_unknown_queue_is_not_found() {
    let manager = QueueManager::in_memory().unwrap();
    let response = create_router(manager)
        .oneshot(
            Request::builder()
                .uri("/queue/stream?code=NOPE0000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
