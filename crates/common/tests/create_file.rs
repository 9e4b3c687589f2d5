//! Integration tests for file creation across both stores

mod common;

use std::collections::BTreeSet;

use ::common::error::{ErrorKind, FsError};
use ::common::metadata::{EntryKey, MetadataFaults};
use ::common::object::ObjectFaults;
use ::common::path::PathIdentity;

#[tokio::test]
async fn test_create_fresh_file() {
    let env = common::setup_test_env();

    let path = env
        .creator
        .create_for("alice", "/alice/docs/notes.txt")
        .await
        .unwrap();
    assert_eq!(path.absolute_path(), "/alice/docs/notes.txt");

    let entry = env.master("/alice/docs/notes.txt").unwrap();
    assert_eq!(entry.user, "alice");
    assert_eq!(entry.path, "alice/docs/notes.txt");
    assert!(entry.read && entry.write);
    assert_eq!(entry.users, BTreeSet::from(["alice".to_string()]));
    assert!(env.objects.object("alice/docs/notes.txt").is_some());
}

#[tokio::test]
async fn test_create_cleans_path() {
    let env = common::setup_test_env();

    env.creator
        .create_for("alice", "/alice//docs/./tmp/../notes.txt")
        .await
        .unwrap();
    assert!(env.master("/alice/docs/notes.txt").is_some());
    assert!(env.objects.object("alice/docs/notes.txt").is_some());
}

#[tokio::test]
async fn test_create_twice_conflicts() {
    let env = common::setup_test_env();
    env.creator.create_for("alice", "/alice/a").await.unwrap();

    let err = env.creator.create_for("alice", "/alice/a").await.unwrap_err();
    assert_eq!(err, FsError::conflict("File already exists"));

    // stores unchanged
    assert!(env.master("/alice/a").is_some());
    assert_eq!(env.objects.len(), 1);
    assert_eq!(env.metadata.len(common::TABLE), 1);
}

#[tokio::test]
async fn test_existing_entry_without_object_conflicts() {
    let env = common::setup_test_env();
    let path = PathIdentity::from_absolute("/alice/a").unwrap();
    env.creator.metadata().create_entry(&path).await.unwrap();

    let err = env.creator.create(&path).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    // the other request's object is not written by us
    assert!(env.objects.is_empty());
    assert!(env.master("/alice/a").is_some());
}

#[tokio::test]
async fn test_orphan_object_rolls_back_entry() {
    let env = common::setup_test_env();
    env.seed_object("/alice/a");

    let err = env.creator.create_for("alice", "/alice/a").await.unwrap_err();
    assert_eq!(
        err,
        FsError::server(
            "File may still be in the process of being deleted, wait a few seconds and retry the request."
        )
    );
    assert!(env.master("/alice/a").is_none());
    assert_eq!(
        env.objects.object("alice/a").as_deref(),
        Some(&b"existing"[..])
    );
}

#[tokio::test]
async fn test_probe_failure_rolls_back_entry() {
    let env = common::setup_test_env();
    env.objects.set_faults(ObjectFaults {
        fail_head: true,
        ..Default::default()
    });

    let err = env.creator.create_for("alice", "/alice/a").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert!(env.master("/alice/a").is_none());
    assert!(env.objects.is_empty());
}

#[tokio::test]
async fn test_rollback_failure() {
    let env = common::setup_test_env();
    env.seed_object("/alice/a");
    env.metadata.set_faults(MetadataFaults {
        fail_delete: true,
        ..Default::default()
    });

    let err = env.creator.create_for("alice", "/alice/a").await.unwrap_err();
    assert_eq!(err, FsError::server("Failed to create file"));
}

#[tokio::test]
async fn test_object_write_failure_rolls_back_entry() {
    let env = common::setup_test_env();
    env.objects.set_faults(ObjectFaults {
        fail_put: true,
        ..Default::default()
    });

    let err = env.creator.create_for("alice", "/alice/a").await.unwrap_err();
    assert_eq!(err, FsError::server("Failed to create file"));
    assert!(env.master("/alice/a").is_none());
    assert!(env.objects.is_empty());

    // once the object store recovers the same path can be created
    env.objects.set_faults(ObjectFaults::default());
    env.creator.create_for("alice", "/alice/a").await.unwrap();
}

#[tokio::test]
async fn test_object_write_failure_and_rollback_failure() {
    let env = common::setup_test_env();
    env.objects.set_faults(ObjectFaults {
        fail_put: true,
        ..Default::default()
    });
    env.metadata.set_faults(MetadataFaults {
        fail_batch: true,
        ..Default::default()
    });

    let err = env.creator.create_for("alice", "/alice/a").await.unwrap_err();
    assert_eq!(err, FsError::server("Failed to create file"));
}

#[tokio::test]
async fn test_metadata_failure_propagates() {
    let env = common::setup_test_env();
    env.metadata.set_faults(MetadataFaults {
        fail_put: true,
        ..Default::default()
    });

    let err = env.creator.create_for("alice", "/alice/a").await.unwrap_err();
    assert_eq!(err, FsError::server("Failed to create master entry"));
    assert!(env.objects.is_empty());
}

#[tokio::test]
async fn test_metadata_failure_with_existing_object_propagates() {
    let env = common::setup_test_env();
    env.seed_object("/alice/a");
    env.metadata.set_faults(MetadataFaults {
        fail_put: true,
        ..Default::default()
    });

    let err = env.creator.create_for("alice", "/alice/a").await.unwrap_err();
    assert_eq!(err, FsError::server("Failed to create master entry"));
}

#[tokio::test]
async fn test_owner_mismatch_touches_no_store() {
    let env = common::setup_test_env();

    let err = env.creator.create_for("bob", "/alice/a").await.unwrap_err();
    assert_eq!(
        err,
        FsError::forbidden("Trying to manipulate data of another user")
    );
    assert_eq!(env.calls(), 0);
}

#[tokio::test]
async fn test_invalid_paths_touch_no_store() {
    let env = common::setup_test_env();

    for raw in ["alice/a", "/", "/alice", ""] {
        let err = env.creator.create_for("alice", raw).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument, "input {:?}", raw);
    }
    assert_eq!(env.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_creates_have_one_winner() {
    let env = common::setup_test_env();

    let results = futures::future::join_all(
        (0..8).map(|_| env.creator.create_for("alice", "/alice/race.txt")),
    )
    .await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for err in results.into_iter().filter_map(Result::err) {
        // losers either see the entry or the winner's object
        assert!(
            matches!(err.kind(), ErrorKind::Conflict | ErrorKind::Server),
            "unexpected {}",
            err
        );
    }
    assert!(env
        .metadata
        .item(
            common::TABLE,
            &EntryKey::new("alice", "alice/race.txt")
        )
        .is_some());
    assert_eq!(env.objects.len(), 1);
}
