//! Concurrent mutation safety of the marker store.

use std::collections::HashSet;
use std::sync::Arc;

use geopothole::markers::{Confidence, Marker, MarkerCandidate, MarkerStore, Provenance};
use geopothole::persist::{JsonFileSnapshot, SnapshotStore};

const WRITERS: u32 = 48;

fn detection(i: u32) -> MarkerCandidate {
    MarkerCandidate {
        lat: f64::from(i),
        lng: -f64::from(i),
        confidence: Confidence::Score(f64::from(i)),
        reported_by: Provenance::AutomatedDetection,
    }
}

async fn open_store(path: &std::path::Path) -> Arc<MarkerStore> {
    let snapshot: Arc<dyn SnapshotStore<Marker>> = Arc::new(JsonFileSnapshot::new(path));
    Arc::new(MarkerStore::open(snapshot).await.expect("open store"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_inserts_are_all_durable_with_distinct_ids() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pothole_data.json");
    let store = open_store(&path).await;

    let mut handles = Vec::new();
    for i in 0..WRITERS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.insert(detection(i)).await }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let marker = handle.await.expect("join").expect("insert");
        assert!(ids.insert(marker.id), "duplicate id issued");
    }

    let listed = store.list().await;
    assert_eq!(listed.len(), ids.len());

    // Every insert reached disk: nothing was lost to a racing overwrite.
    let reopened = open_store(&path).await;
    let persisted: HashSet<String> = reopened.list().await.into_iter().map(|m| m.id).collect();
    assert_eq!(persisted, ids);

    let lats: HashSet<u64> = listed.iter().map(|m| m.lat.to_bits()).collect();
    assert_eq!(lats.len(), usize::try_from(WRITERS).expect("fits"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_inserts_and_deletes_stay_consistent() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pothole_data.json");
    let store = open_store(&path).await;

    let mut doomed = Vec::new();
    for i in 0..WRITERS {
        doomed.push(store.insert(detection(i)).await.expect("seed insert").id);
    }

    let mut handles = Vec::new();
    for (i, id) in doomed.iter().cloned().enumerate() {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let deleted = store.delete(&id).await.expect("delete");
            let inserted = store
                .insert(detection(1000 + u32::try_from(i).expect("fits")))
                .await
                .expect("insert");
            (deleted, inserted.id)
        }));
    }

    let mut survivors = HashSet::new();
    for handle in handles {
        let (deleted, new_id) = handle.await.expect("join");
        assert!(deleted);
        survivors.insert(new_id);
    }

    let listed: HashSet<String> = store.list().await.into_iter().map(|m| m.id).collect();
    assert_eq!(listed, survivors);
    assert!(doomed.iter().all(|id| !listed.contains(id)));

    let reopened = open_store(&path).await;
    let persisted: HashSet<String> = reopened.list().await.into_iter().map(|m| m.id).collect();
    assert_eq!(persisted, survivors);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_only_observe_whole_snapshots() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = open_store(&dir.path().join("pothole_data.json")).await;

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..WRITERS {
                store.insert(detection(i)).await.expect("insert");
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let mut last_len = 0;
            while last_len < usize::try_from(WRITERS).expect("fits") {
                let snapshot = store.list().await;
                assert!(snapshot.len() >= last_len, "a list went backwards");
                // Inserts land in order, so a snapshot is always a prefix.
                for (i, marker) in snapshot.iter().enumerate() {
                    assert_eq!(marker.lat, f64::from(u32::try_from(i).expect("fits")));
                }
                last_len = snapshot.len();
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.expect("writer");
    reader.await.expect("reader");
}
