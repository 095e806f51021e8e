//! End-to-end sync passes through the `Syncer` facade.

use std::sync::Arc;

use bucketsync::store::{ObjectStore, SqliteStore};
use bucketsync::sync::SyncError;
use bucketsync::{
    BucketsyncError, FailureKind, FileStatus, Namespace, ObjectKey, SyncConfig, Syncer,
    SyncerConfig, CHUNK_SIZE,
};
use bucketsync_testkit::vectors::pattern;
use bucketsync_testkit::{memory_store, site_fixture, FailingStore, TreeFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn config(chunk_size: usize) -> SyncerConfig {
    SyncerConfig {
        sync: SyncConfig {
            chunk_size,
            concurrency: 4,
            page_size: 3,
            dry_run: false,
        },
    }
}

#[tokio::test]
async fn test_readme_example_default_chunk() -> anyhow::Result<()> {
    init_tracing();
    let (store, ns) = memory_store("bucket")?;
    let store = Arc::new(store);
    let syncer = Syncer::with_shared_store(Arc::clone(&store), SyncerConfig::default())?;

    let tree = TreeFixture::new()?;
    tree.write("a.txt", "hi")?;
    tree.write("b.bin", pattern(17 * 1024 * 1024))?;

    let first = syncer.sync(tree.root(), ns.clone()).await?;
    assert_eq!(first.uploaded, 2);
    assert_eq!(first.bytes_uploaded, 2 + 17 * 1024 * 1024);

    let objects = syncer.list_objects(ns.clone()).await?;
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].key.as_str(), "a.txt");
    assert_eq!(
        objects[0].fingerprint.as_str(),
        "49f68a5c8493ec2c0bf489821c21fc3b"
    );
    assert_eq!(
        objects[1].fingerprint.as_str(),
        "b86e9527cc4867474348929cdbafaec9-3"
    );
    match first.status_of("b.bin") {
        Some(FileStatus::Uploaded { parts, .. }) => assert_eq!(*parts, 3),
        other => panic!("unexpected status {:?}", other),
    }

    let writes = store.write_count();
    let second = syncer.sync(tree.root(), ns).await?;
    assert_eq!(second.uploaded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(store.write_count(), writes);
    Ok(())
}

#[tokio::test]
async fn test_one_changed_byte_one_upload() -> anyhow::Result<()> {
    init_tracing();
    let (store, ns) = memory_store("site")?;
    let store = Arc::new(store);
    let syncer = Syncer::with_shared_store(Arc::clone(&store), config(16))?;
    let tree = site_fixture()?;

    let first = syncer.sync(tree.root(), ns.clone()).await?;
    assert_eq!(first.uploaded, 6);
    assert!(first.is_success());

    tree.flip_byte("css/site.css", 3)?;
    let writes = store.write_count();
    let second = syncer.sync(tree.root(), ns).await?;

    assert_eq!(second.uploaded, 1);
    assert_eq!(second.skipped, 5);
    assert_eq!(store.write_count(), writes + 1);
    assert!(matches!(
        second.status_of("css/site.css"),
        Some(FileStatus::Uploaded { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_report_order_is_walk_order() -> anyhow::Result<()> {
    let (store, ns) = memory_store("site")?;
    let syncer = Syncer::new(store, config(16))?;
    let tree = site_fixture()?;

    let report = syncer.sync(tree.root(), ns).await?;
    let keys: Vec<_> = report.outcomes.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "about/index.html",
            "css/site.css",
            "img/logo.png",
            "index.html",
            "js/app.js",
            "robots.txt",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_content_types_guessed_from_key() -> anyhow::Result<()> {
    let (store, ns) = memory_store("site")?;
    let store = Arc::new(store);
    let syncer = Syncer::with_shared_store(Arc::clone(&store), config(CHUNK_SIZE))?;
    let tree = site_fixture()?;
    tree.write("LICENSE", "MIT")?;

    syncer.sync(tree.root(), ns.clone()).await?;

    let content_type = |key: &str| {
        store
            .get_object(&ns, &ObjectKey::from(key))
            .unwrap()
            .unwrap()
            .content_type
    };
    assert_eq!(content_type("index.html"), "text/html");
    assert_eq!(content_type("css/site.css"), "text/css");
    assert_eq!(content_type("img/logo.png"), "image/png");
    assert_eq!(content_type("LICENSE"), "text/plain");
    Ok(())
}

#[tokio::test]
async fn test_failed_upload_does_not_stop_pass() -> anyhow::Result<()> {
    init_tracing();
    let (inner, ns) = memory_store("site")?;
    let store = Arc::new(
        FailingStore::new(inner)
            .reject_key("index.html")
            .reject_parts_of("big.bin"),
    );
    let syncer = Syncer::with_shared_store(Arc::clone(&store), config(16))?;

    let tree = site_fixture()?;
    tree.write("big.bin", pattern(100))?;

    let report = syncer.sync(tree.root(), ns.clone()).await?;
    assert_eq!(report.failed, 2);
    assert_eq!(report.uploaded, 5);

    let mut failed: Vec<_> = report.failed_keys().into_iter().map(|k| k.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["big.bin", "index.html"]);
    for failure in report.failures() {
        assert!(matches!(
            failure.status,
            FileStatus::Failed {
                kind: FailureKind::Transfer,
                ..
            }
        ));
    }

    assert_eq!(store.aborts(), 1);
    assert_eq!(store.inner().pending_uploads(), 0);
    assert_eq!(store.inner().object_count(&ns)?, 5);
    Ok(())
}

#[tokio::test]
async fn test_listing_failure_aborts_before_upload() -> anyhow::Result<()> {
    let (inner, ns) = memory_store("site")?;
    let store = Arc::new(FailingStore::new(inner).fail_listing());
    let syncer = Syncer::with_shared_store(Arc::clone(&store), config(16))?;
    let tree = site_fixture()?;

    let err = syncer.sync(tree.root(), ns).await.unwrap_err();
    assert!(matches!(
        err,
        BucketsyncError::Sync(SyncError::ManifestLoad(_))
    ));
    assert_eq!(store.write_attempts(), 0);
    Ok(())
}

#[tokio::test]
async fn test_plan_then_sync() -> anyhow::Result<()> {
    let (store, ns) = memory_store("site")?;
    let store = Arc::new(store);
    let syncer = Syncer::with_shared_store(Arc::clone(&store), config(16))?;
    let tree = site_fixture()?;

    let plan = syncer.plan(tree.root(), ns.clone()).await?;
    assert_eq!(plan.planned, 6);
    assert_eq!(store.write_count(), 0);

    let report = syncer.sync(tree.root(), ns).await?;
    assert_eq!(report.uploaded, plan.planned);
    Ok(())
}

#[tokio::test]
async fn test_empty_files_sync_once() -> anyhow::Result<()> {
    let (store, ns) = memory_store("b")?;
    let syncer = Syncer::new(store, config(16))?;
    let tree = TreeFixture::new()?;
    tree.write("empty.txt", "")?;
    tree.mkdir("only/dirs/here")?;

    let first = syncer.sync(tree.root(), ns.clone()).await?;
    assert_eq!(first.uploaded, 1);
    assert_eq!(first.total(), 1);

    let second = syncer.sync(tree.root(), ns).await?;
    assert_eq!(second.skipped, 1);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_store_end_to_end() -> anyhow::Result<()> {
    init_tracing();
    let db = tempfile::tempdir()?;
    let path = db.path().join("objects.db");
    let ns = Namespace::from("site");
    let tree = site_fixture()?;
    tree.write("big.bin", pattern(1000))?;

    {
        let store = SqliteStore::open(&path)?;
        store.create_namespace(&ns)?;
        let syncer = Syncer::new(store, config(256))?;
        let report = syncer.sync(tree.root(), ns.clone()).await?;
        assert_eq!(report.uploaded, 7);
    }

    let store = SqliteStore::open(&path)?;
    let syncer = Syncer::new(store, config(256))?;
    let report = syncer.sync(tree.root(), ns.clone()).await?;
    assert_eq!(report.uploaded, 0);
    assert_eq!(report.skipped, 7);

    let objects = syncer.list_objects(ns).await?;
    let big = objects
        .iter()
        .find(|o| o.key.as_str() == "big.bin")
        .expect("big.bin listed");
    assert_eq!(big.fingerprint.as_str(), "32aad4f5270dd42bfa3fd29f11e7e002-4");
    assert_eq!(big.size, 1000);
    Ok(())
}

#[tokio::test]
async fn test_cancel_before_start() -> anyhow::Result<()> {
    let (store, ns) = memory_store("site")?;
    let store = Arc::new(store);
    let syncer = Syncer::with_shared_store(Arc::clone(&store), config(16))?;
    let tree = site_fixture()?;

    let (tx, rx) = tokio::sync::watch::channel(false);
    tx.send(true)?;
    let report = syncer.sync_until_cancelled(tree.root(), ns, rx).await?;

    assert_eq!(report.cancelled, 6);
    assert_eq!(store.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_store_trait_object_usable() -> anyhow::Result<()> {
    let (store, ns) = memory_store("b")?;
    let store: Arc<dyn ObjectStore> = Arc::new(store);
    let page = store.list_objects(&ns, None, 10).await?;
    assert!(page.objects.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_report_serializes() -> anyhow::Result<()> {
    let (store, ns) = memory_store("b")?;
    let syncer = Syncer::new(store, config(16))?;
    let tree = TreeFixture::new()?;
    tree.write("a.txt", "hi")?;

    let report = syncer.sync(tree.root(), ns).await?;
    let json = serde_json::to_value(&report)?;

    assert_eq!(json["namespace"], "b");
    assert_eq!(json["uploaded"], 1);
    assert_eq!(json["outcomes"][0]["key"], "a.txt");
    assert_eq!(json["outcomes"][0]["status"], "uploaded");
    assert_eq!(json["outcomes"][0]["reason"], "new");
    assert_eq!(
        json["outcomes"][0]["fingerprint"],
        "49f68a5c8493ec2c0bf489821c21fc3b"
    );
    Ok(())
}
