//! Store Concurrency Tests
//!
//! The pending queue is shared between the ingest handler and the hourly
//! cycle. These tests pound the store from concurrent tasks and verify
//! that the single-writer discipline loses no update: every enqueued link
//! is either drained by some cycle or still pending at the end.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use proxywatch::{ProxyLink, Store};

fn link(n: usize) -> ProxyLink {
    ProxyLink::new(format!(
        "tg://proxy?server=10.0.{}.{}&port=443&secret=aa{:030x}",
        n / 256,
        n % 256,
        n
    ))
}

#[tokio::test]
async fn test_concurrent_enqueue_and_drain_lose_nothing() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(Store::open(temp.path()).await.unwrap());

    const WRITERS: usize = 10;
    const LINKS_PER_WRITER: usize = 20;

    let mut tasks = Vec::new();

    // Writers ingest disjoint links...
    for w in 0..WRITERS {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..LINKS_PER_WRITER {
                store.enqueue(&[link(w * LINKS_PER_WRITER + i)]).await.unwrap();
                tokio::task::yield_now().await;
            }
            Vec::<ProxyLink>::new()
        }));
    }

    // ...while drainers race them, emulating overlapping hourly cycles
    for _ in 0..4 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let mut drained = Vec::new();
            for _ in 0..10 {
                drained.extend(store.drain_pending().await.unwrap());
                tokio::task::yield_now().await;
            }
            drained
        }));
    }

    let mut seen: Vec<ProxyLink> = Vec::new();
    for task in tasks {
        seen.extend(task.await.unwrap());
    }
    seen.extend(store.pending().await);

    // Every link accounted for exactly once
    let expected: HashSet<ProxyLink> = (0..WRITERS * LINKS_PER_WRITER).map(link).collect();
    let unique: HashSet<ProxyLink> = seen.iter().cloned().collect();
    assert_eq!(seen.len(), expected.len(), "a link was drained twice or lost");
    assert_eq!(unique, expected);
}

#[tokio::test]
async fn test_concurrent_enqueues_never_duplicate() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(Store::open(temp.path()).await.unwrap());

    // Every task ingests the same batch, as if the same message arrived
    // from several monitored channels at once.
    let batch: Vec<ProxyLink> = (0..10).map(link).collect();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let batch = batch.clone();
        tasks.push(tokio::spawn(async move {
            store.enqueue(&batch).await.unwrap()
        }));
    }

    let mut total_added = 0;
    for task in tasks {
        total_added += task.await.unwrap();
    }

    assert_eq!(total_added, 10);
    assert_eq!(store.pending().await.len(), 10);
}

#[tokio::test]
async fn test_enqueue_respects_registry_under_concurrency() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(Store::open(temp.path()).await.unwrap());

    // Half the links are already published
    for n in 0..5 {
        store.register(&link(n), Utc::now()).await.unwrap();
    }

    let batch: Vec<ProxyLink> = (0..10).map(link).collect();
    let added = store.enqueue(&batch).await.unwrap();

    assert_eq!(added, 5);
    let pending: HashSet<ProxyLink> = store.pending().await.into_iter().collect();
    let expected: HashSet<ProxyLink> = (5..10).map(link).collect();
    assert_eq!(pending, expected);
}
