//! Shared test utilities for file creation integration tests
#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use common::metadata::{EntryKey, MemoryMetadataBackend};
use common::object::MemoryObjectBackend;
use common::prelude::*;

pub const TABLE: &str = "permissions";
pub const BUCKET: &str = "files";

pub struct TestEnv {
    pub creator: FileCreator,
    pub metadata: MemoryMetadataBackend,
    pub objects: MemoryObjectBackend,
}

impl TestEnv {
    pub fn master(&self, raw: &str) -> Option<MasterEntry> {
        let path = PathIdentity::from_absolute(raw).unwrap();
        self.metadata
            .item(TABLE, &EntryKey::master(&path))
            .map(|item| serde_json::from_value(serde_json::Value::Object(item)).unwrap())
    }

    pub fn seed_object(&self, raw: &str) {
        let path = PathIdentity::from_absolute(raw).unwrap();
        self.objects
            .insert(path.normalized_path(), Bytes::from_static(b"existing"));
    }

    pub fn calls(&self) -> usize {
        self.metadata.call_count() + self.objects.call_count()
    }
}

/// Set up a file creator over fresh in-memory stores
pub fn setup_test_env() -> TestEnv {
    let metadata = MemoryMetadataBackend::new();
    let objects = MemoryObjectBackend::new();
    let creator = FileCreator::new(
        MetadataStoreClient::new(TABLE, Arc::new(metadata.clone())),
        ObjectStoreClient::new(BUCKET, Arc::new(objects.clone())),
    );
    TestEnv {
        creator,
        metadata,
        objects,
    }
}
