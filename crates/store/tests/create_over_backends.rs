//! File creation and deletion over SQLite and object storage

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use common::metadata::EntryKey;
use common::object::ObjectBackend;
use common::prelude::*;
use store::{ObjectStorage, ObjectStoreConfig, SqliteMetadataBackend};

const TABLE: &str = "permfs-files";
const BUCKET: &str = "files";

async fn setup(
    metadata: SqliteMetadataBackend,
    config: ObjectStoreConfig,
) -> (FileCreator, SqliteMetadataBackend, ObjectStorage) {
    metadata.ensure_table(TABLE).await.unwrap();
    let objects = ObjectStorage::new(config, BUCKET).await.unwrap();
    let creator = FileCreator::new(
        MetadataStoreClient::new(TABLE, Arc::new(metadata.clone())),
        ObjectStoreClient::new(BUCKET, Arc::new(objects.clone())),
    );
    (creator, metadata, objects)
}

#[tokio::test]
async fn test_create_in_memory() {
    let (creator, _, objects) = setup(
        SqliteMetadataBackend::in_memory().await.unwrap(),
        ObjectStoreConfig::Memory,
    )
    .await;

    creator
        .create_for("alice", "/alice/docs/notes.txt")
        .await
        .unwrap();

    let path = PathIdentity::from_absolute("/alice/docs/notes.txt").unwrap();
    let entry = creator.metadata().get_entry(&path).await.unwrap();
    assert_eq!(entry.users, BTreeSet::from(["alice".to_string()]));
    assert!(entry.read && entry.write);
    objects.head("alice/docs/notes.txt").await.unwrap();

    let err = creator
        .create_for("alice", "/alice/docs/notes.txt")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_create_on_disk() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (creator, _, _) = setup(
        SqliteMetadataBackend::new(&temp_dir.path().join("db").join("permfs.db"))
            .await
            .unwrap(),
        ObjectStoreConfig::Local {
            path: temp_dir.path().join("objects"),
        },
    )
    .await;

    creator.create_for("alice", "/alice/a.txt").await.unwrap();
    assert!(temp_dir
        .path()
        .join("objects")
        .join(BUCKET)
        .join("alice")
        .join("a.txt")
        .exists());
}

#[tokio::test]
async fn test_orphan_object_is_reported() {
    let (creator, metadata, objects) = setup(
        SqliteMetadataBackend::in_memory().await.unwrap(),
        ObjectStoreConfig::Memory,
    )
    .await;
    objects
        .put("alice/a.txt", Bytes::from_static(b"left over"))
        .await
        .unwrap();

    let err = creator.create_for("alice", "/alice/a.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert!(err.message().contains("retry the request"));

    let row = metadata
        .get(TABLE, &EntryKey::new("alice", "alice/a.txt"), &[])
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn test_delete_shared_entry() {
    let (creator, metadata, _) = setup(
        SqliteMetadataBackend::in_memory().await.unwrap(),
        ObjectStoreConfig::Memory,
    )
    .await;

    // share a file with 40 users by hand
    let path = PathIdentity::from_absolute("/alice/shared.txt").unwrap();
    let mut users = BTreeSet::from(["alice".to_string()]);
    for i in 0..40 {
        let user = format!("user-{:02}", i);
        let key = EntryKey::new(user.as_str(), path.normalized_path());
        let item = serde_json::json!({"user": user, "path": path.normalized_path(), "read": true, "write": false});
        metadata
            .put_if_absent(TABLE, &key, item.as_object().unwrap().clone())
            .await
            .unwrap();
        users.insert(user);
    }
    let master = serde_json::json!({
        "user": "alice",
        "path": path.normalized_path(),
        "read": true,
        "write": true,
        "users": users
    });
    metadata
        .put_if_absent(
            TABLE,
            &EntryKey::master(&path),
            master.as_object().unwrap().clone(),
        )
        .await
        .unwrap();

    creator.metadata().delete_entry(&path).await.unwrap();

    for user in &users {
        let row = metadata
            .get(TABLE, &EntryKey::new(user.as_str(), path.normalized_path()), &[])
            .await
            .unwrap();
        assert!(row.is_none(), "record of {} left behind", user);
    }
    let err = creator.metadata().get_entry(&path).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
