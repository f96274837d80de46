use std::collections::HashSet;

use futures::future::join_all;
use mqqueue::{NewEntry, QueueManager, QueueRef};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_get_or_create_yields_one_queue() {
    let manager = QueueManager::in_memory().unwrap();

    let tasks = (0..32).map(|_| {
        let manager = manager.clone();
        tokio::spawn(async move { manager.resolve(&QueueRef::by_name("party")).await })
    });

    let ids: HashSet<i64> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().id)
        .collect();

    assert_eq!(ids.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_are_all_kept_in_order() {
    let manager = QueueManager::in_memory().unwrap();
    let queue = manager.create_queue(Some("party")).await.unwrap();

    let tasks = (0..40).map(|i| {
        let manager = manager.clone();
        let queue = queue.clone();
        tokio::spawn(async move {
            manager
                .add(&queue, NewEntry::new(format!("song {}", i), "artist"))
                .await
        })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let items = manager.list(&queue).unwrap();
    assert_eq!(items.len(), 40);
    assert!(items.windows(2).all(|w| w[0].created_at < w[1].created_at));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn subscribers_see_every_mutation_in_order() {
    let manager = QueueManager::in_memory().unwrap();
    let queue = manager.create_queue(Some("party")).await.unwrap();
    let (initial, mut first) = manager.watch(&queue).await.unwrap();
    let (_, mut second) = manager.watch(&queue).await.unwrap();
    assert!(initial.is_empty());

    for i in 0..10 {
        manager
            .add(&queue, NewEntry::new(format!("song {}", i), "artist"))
            .await
            .unwrap();
    }

    for subscription in [&mut first, &mut second] {
        for expected in 1..=10 {
            let event = subscription.recv().await.unwrap();
            assert_eq!(event.items.len(), expected);
        }
    }
}

#[tokio::test]
async fn queues_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queues.db");

    let (code, entry_id) = {
        let manager = QueueManager::new(&path, 8).unwrap();
        let queue = manager.create_queue(Some("party")).await.unwrap();
        let entry = manager
            .add(&queue, NewEntry::new("So What", "Miles Davis"))
            .await
            .unwrap();
        (queue.code, entry.id)
    };

    let manager = QueueManager::new(&path, 8).unwrap();
    let queue = manager.resolve(&QueueRef::by_code(&code)).await.unwrap();
    assert_eq!(queue.name, "party");

    let added = manager
        .add(&queue, NewEntry::new("Freddie Freeloader", "Miles Davis"))
        .await
        .unwrap();
    let items = manager.list(&queue).unwrap();
    assert_eq!(items[0].id, entry_id);
    assert_eq!(items[1].id, added.id);
    assert!(items[0].created_at < items[1].created_at);
}
