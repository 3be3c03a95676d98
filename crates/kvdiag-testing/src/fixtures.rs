//! Backend store fixtures.
//!
//! A `StoreFixture` owns a temporary data directory laid out the way a
//! member lays it out, and rewrites its backend file after every change.

use crate::bolt::BoltFile;
use anyhow::Result;
use kvdiag_store::{KEY_BUCKET, backend_path};
use kvdiag_types::{BucketKey, KeyValue};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

const META_BUCKET: &str = "meta";

pub struct StoreFixture {
    dir: TempDir,
    file: BoltFile,
    next_main: i64,
    versions: HashMap<String, i64>,
}

impl StoreFixture {
    /// Create a data directory whose backend file has an empty `key` bucket.
    pub fn new() -> Result<Self> {
        let mut file = BoltFile::new();
        file.bucket(KEY_BUCKET)
            .inline_bucket(META_BUCKET)
            .put(META_BUCKET, b"consistent_index", &1u64.to_be_bytes());

        let fixture = Self {
            dir: TempDir::new()?,
            file,
            next_main: 2,
            versions: HashMap::new(),
        };
        fixture.flush()?;
        Ok(fixture)
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    fn flush(&self) -> Result<()> {
        self.file.write_to(&backend_path(self.dir.path()))?;
        Ok(())
    }

    fn next_revision(&mut self) -> i64 {
        let main = self.next_main;
        self.next_main += 1;
        main
    }

    /// Write a new revision of `key`.
    pub fn put(&mut self, key: &str, value: &str) -> Result<BucketKey> {
        let main = self.next_revision();
        let version = self.versions.entry(key.to_string()).or_insert(0);
        *version += 1;

        let rev = BucketKey::new(main, 0);
        let kv = KeyValue {
            key: key.as_bytes().to_vec(),
            create_revision: main - (*version - 1),
            mod_revision: main,
            version: *version,
            value: value.as_bytes().to_vec(),
            lease: 0,
        };
        self.put_raw(&rev.to_bytes(), &kv.to_record())?;
        Ok(rev)
    }

    /// Write `count` revisions of `key`.
    pub fn put_many(&mut self, key: &str, count: usize) -> Result<()> {
        for i in 0..count {
            self.put(key, &format!("v{}", i))?;
        }
        Ok(())
    }

    /// Record a deletion of `key`.
    pub fn delete(&mut self, key: &str) -> Result<BucketKey> {
        let main = self.next_revision();
        self.versions.remove(key);

        let rev = BucketKey::tombstone(main, 0);
        let kv = KeyValue {
            key: key.as_bytes().to_vec(),
            mod_revision: main,
            ..Default::default()
        };
        self.put_raw(&rev.to_bytes(), &kv.to_record())?;
        Ok(rev)
    }

    /// Write a well-formed revision whose value is not a valid record.
    pub fn put_corrupt_value(&mut self) -> Result<BucketKey> {
        let rev = BucketKey::new(self.next_revision(), 0);
        self.put_raw(&rev.to_bytes(), &[0xff, 0xff, 0xff, 0xff])?;
        Ok(rev)
    }

    /// Write a raw entry into the `key` bucket, bypassing the key encoding.
    pub fn put_raw(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.file.put(KEY_BUCKET, key, value);
        self.flush()
    }
}
