mod common;

use common::{Op, USER, file, fixture, key, put};
use stash_fs::{Download, FsError};

#[tokio::test]
async fn file_move_never_deletes_before_copy() {
    let (service, store) = fixture().await;
    put(&service, "a.txt", "payload").await;
    store.clear_calls();

    store.fail(Op::Copy, &key("a.txt"));
    let err = service.move_or_rename(USER, "a.txt", "b.txt").await.unwrap_err();
    assert!(matches!(err, FsError::StorageOperation { .. }));
    assert!(store.calls_of(Op::Delete).is_empty());
    assert!(store.contains(&key("a.txt")));
    assert!(!store.contains(&key("b.txt")));

    // Once healed, the copy precedes the delete.
    store.heal();
    store.clear_calls();
    service.move_or_rename(USER, "a.txt", "b.txt").await.unwrap();
    let mutations: Vec<Op> = store
        .calls()
        .into_iter()
        .map(|call| call.op)
        .filter(|op| matches!(op, Op::Copy | Op::Delete))
        .collect();
    assert_eq!(mutations, vec![Op::Copy, Op::Delete]);
}

#[tokio::test]
async fn file_move_with_failed_delete_keeps_both() {
    let (service, store) = fixture().await;
    put(&service, "a.txt", "payload").await;

    store.fail(Op::Delete, &key("a.txt"));
    assert!(
        service
            .move_or_rename(USER, "a.txt", "b.txt")
            .await
            .is_err()
    );
    assert!(store.contains(&key("a.txt")));
    assert!(store.contains(&key("b.txt")));
}

#[tokio::test]
async fn folder_move_copy_failure_deletes_nothing() {
    let (service, store) = fixture().await;
    put(&service, "a/x.txt", "x").await;
    put(&service, "a/sub/y.txt", "y").await;
    let before = store.keys();
    store.clear_calls();

    // Memory listings are ordered, so this is the last key copied.
    store.fail(Op::Copy, &key("a/x.txt"));
    let err = service.move_or_rename(USER, "a/", "b/").await.unwrap_err();
    assert!(matches!(err, FsError::StorageOperation { .. }));

    assert!(store.calls_of(Op::Delete).is_empty());
    for source in &before {
        assert!(store.contains(source), "{source} was removed");
    }
    assert!(!store.contains(&key("b/x.txt")));
}

#[tokio::test]
async fn folder_move_deletes_only_after_every_copy() {
    let (service, store) = fixture().await;
    put(&service, "a/x.txt", "x").await;
    put(&service, "a/sub/y.txt", "y").await;
    store.clear_calls();

    service.move_or_rename(USER, "a/", "b/").await.unwrap();

    let calls = store.calls();
    let last_copy = calls.iter().rposition(|call| call.op == Op::Copy).unwrap();
    let first_delete = calls.iter().position(|call| call.op == Op::Delete).unwrap();
    assert!(last_copy < first_delete);
    assert_eq!(store.calls_of(Op::Copy).len(), 4);
    assert_eq!(store.calls_of(Op::Delete).len(), 4);
}

#[tokio::test]
async fn folder_move_delete_failure_leaves_duplicates() {
    let (service, store) = fixture().await;
    put(&service, "a/x.txt", "x").await;
    put(&service, "a/sub/y.txt", "y").await;

    store.fail(Op::Delete, &key("a/sub/y.txt"));
    assert!(service.move_or_rename(USER, "a/", "b/").await.is_err());

    // The destination is complete; the failed source is still there.
    for moved in ["b/", "b/sub/", "b/sub/y.txt", "b/x.txt"] {
        assert!(store.contains(&key(moved)), "{moved} missing");
    }
    assert!(store.contains(&key("a/sub/y.txt")));

    // Retrying the cleanup by hand converges.
    store.heal();
    service.delete(USER, "a/").await.unwrap();
    assert!(!store.keys().iter().any(|k| k.starts_with(&key("a/"))));
}

#[tokio::test]
async fn upload_failure_keeps_earlier_files() {
    let (service, store) = fixture().await;
    service.create_folder(USER, "in/").await.unwrap();

    store.fail(Op::Put, &key("in/b.txt"));
    let err = service
        .upload(
            USER,
            "in/",
            vec![file("a.txt", "a"), file("b.txt", "b"), file("c.txt", "c")],
        )
        .await
        .unwrap_err();

    match err {
        FsError::UploadError { key: failed, .. } => assert_eq!(failed, "in/b.txt"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.contains(&key("in/a.txt")));
    assert!(!store.contains(&key("in/b.txt")));
    assert!(!store.contains(&key("in/c.txt")));
}

#[tokio::test]
async fn upload_marker_failure_is_an_upload_error() {
    let (service, store) = fixture().await;

    store.fail(Op::Put, &key("new/"));
    let err = service
        .upload(USER, "new/", vec![file("a.txt", "a")])
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::UploadError { .. }));
    assert!(!store.contains(&key("new/a.txt")));
}

#[tokio::test]
async fn listing_failure_is_a_storage_error() {
    let (service, store) = fixture().await;
    service.create_folder(USER, "docs/").await.unwrap();

    store.fail(Op::List, &key("docs/"));
    let err = service.list(USER, "docs/").await.unwrap_err();
    assert!(matches!(err, FsError::StorageOperation { .. }));
    assert_eq!(err.kind().status_code(), 500);
}

#[tokio::test]
async fn stat_failure_is_not_reported_as_missing() {
    let (service, store) = fixture().await;
    put(&service, "a.txt", "a").await;

    store.fail(Op::Stat, &key("a.txt"));
    let err = service.get_resource(USER, "a.txt").await.unwrap_err();
    assert!(matches!(err, FsError::StorageOperation { .. }));
}

#[tokio::test]
async fn archive_body_failure_is_a_storage_error() {
    let (service, store) = fixture().await;
    put(&service, "docs/a.txt", "alpha").await;
    put(&service, "docs/b.txt", "beta").await;
    store.fail(Op::ReadBody, &key("docs/b.txt"));

    let Download::Archive(archive) = service.download(USER, "docs/").await.unwrap() else {
        panic!("expected an archive");
    };
    match archive.write_to(Vec::new()).await {
        Err(FsError::StorageOperation { context, .. }) => {
            assert!(context.contains("docs/b.txt"), "{context}")
        }
        other => panic!("expected a storage error, got {other:?}"),
    }
}

#[tokio::test]
async fn archive_open_failure_is_a_storage_error() {
    let (service, store) = fixture().await;
    put(&service, "docs/a.txt", "alpha").await;
    store.fail(Op::Read, &key("docs/a.txt"));

    let Download::Archive(archive) = service.download(USER, "docs/").await.unwrap() else {
        panic!("expected an archive");
    };
    assert!(matches!(
        archive.write_to(Vec::new()).await,
        Err(FsError::StorageOperation { .. })
    ));
}
