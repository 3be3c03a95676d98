use kvdiag_store::page::{META_CHECKSUM_OFFSET, PAGE_HEADER_SIZE};
use kvdiag_store::{Backend, DEFAULT_OPEN_TIMEOUT, Error, KEY_BUCKET, backend_path};
use kvdiag_testing::BoltFile;
use kvdiag_types::{BucketKey, KeyValue};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn record(key: &str, rev: i64) -> Vec<u8> {
    KeyValue {
        key: key.as_bytes().to_vec(),
        create_revision: rev,
        mod_revision: rev,
        version: 1,
        value: Vec::new(),
        lease: 0,
    }
    .to_record()
}

fn write(dir: &Path, file: &BoltFile) -> anyhow::Result<PathBuf> {
    let path = backend_path(dir);
    file.write_to(&path)?;
    Ok(path)
}

fn scan_keys(backend: &Backend) -> anyhow::Result<Vec<BucketKey>> {
    let mut keys = Vec::new();
    backend.for_each(KEY_BUCKET, |k, _| {
        keys.push(BucketKey::from_bytes(k).unwrap());
    })?;
    Ok(keys)
}

#[test]
fn test_member_written_file_is_readable_offline() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let mut file = BoltFile::new();
    file.put(KEY_BUCKET, &BucketKey::new(3, 0).to_bytes(), &record("foo", 3))
        .put(KEY_BUCKET, &BucketKey::new(2, 0).to_bytes(), &record("foo", 2))
        .inline_bucket("meta")
        .put("meta", b"consistent_index", &[0, 0, 0, 0, 0, 0, 0, 9]);
    let path = write(data_dir.path(), &file)?;

    let backend = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT)?;
    assert_eq!(backend.page_size(), 4096);
    assert_eq!(backend.txid(), 1);

    let mut keys = Vec::new();
    let visited = backend.for_each(KEY_BUCKET, |_, v| {
        keys.push(KeyValue::from_record(v).unwrap().mod_revision);
    })?;
    assert_eq!(visited, 2);
    assert_eq!(keys, vec![2, 3]);
    Ok(())
}

#[test]
fn test_multi_level_tree_walks_in_revision_order() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let mut file = BoltFile::new().with_leaf_capacity(3);
    for main in (2..40).rev() {
        file.put(KEY_BUCKET, &BucketKey::new(main, 0).to_bytes(), &record("k", main));
    }
    file.put(KEY_BUCKET, &BucketKey::tombstone(40, 0).to_bytes(), &record("k", 40));
    let path = write(data_dir.path(), &file)?;

    let backend = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT)?;
    let keys = scan_keys(&backend)?;

    let expected: Vec<BucketKey> = (2..40)
        .map(|main| BucketKey::new(main, 0))
        .chain([BucketKey::tombstone(40, 0)])
        .collect();
    assert_eq!(keys, expected);
    Ok(())
}

#[test]
fn test_values_larger_than_a_page_use_overflow_pages() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let big = vec![b'x'; 10_000];
    let mut file = BoltFile::new();
    file.put(KEY_BUCKET, &BucketKey::new(2, 0).to_bytes(), &big)
        .put(KEY_BUCKET, &BucketKey::new(3, 0).to_bytes(), &record("b", 3));
    let path = write(data_dir.path(), &file)?;

    let backend = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT)?;
    let mut sizes = Vec::new();
    backend.for_each(KEY_BUCKET, |_, v| sizes.push(v.len()))?;
    assert_eq!(sizes[0], 10_000);
    assert_eq!(sizes.len(), 2);
    Ok(())
}

#[test]
fn test_inline_bucket_is_readable() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let mut file = BoltFile::new();
    file.inline_bucket(KEY_BUCKET)
        .put(KEY_BUCKET, &BucketKey::new(5, 0).to_bytes(), &record("a", 5));
    let path = write(data_dir.path(), &file)?;

    let backend = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT)?;
    assert_eq!(scan_keys(&backend)?, vec![BucketKey::new(5, 0)]);
    Ok(())
}

#[test]
fn test_damaged_newest_meta_falls_back_to_older_copy() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let mut file = BoltFile::new();
    file.put(KEY_BUCKET, &BucketKey::new(2, 0).to_bytes(), &record("a", 2));

    let mut bytes = file.to_bytes();
    bytes[4096 + PAGE_HEADER_SIZE + META_CHECKSUM_OFFSET] ^= 0xff;
    let path = backend_path(data_dir.path());
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(&path, &bytes)?;

    let backend = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT)?;
    assert_eq!(backend.txid(), 0);
    assert_eq!(scan_keys(&backend)?.len(), 1);
    Ok(())
}

#[test]
fn test_file_without_valid_meta_is_rejected() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let path = data_dir.path().join("db");

    std::fs::write(&path, b"SQLite format 3\0")?;
    let err = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT).err().unwrap();
    assert!(matches!(err, Error::InvalidMeta(_)));

    std::fs::write(&path, vec![0u8; 8192])?;
    let err = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT).err().unwrap();
    assert!(matches!(err, Error::InvalidMeta("not a meta page")));
    Ok(())
}

#[test]
fn test_missing_bucket_is_reported() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let mut file = BoltFile::new();
    file.bucket("lease");
    let path = write(data_dir.path(), &file)?;

    let backend = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT)?;
    let err = backend.for_each(KEY_BUCKET, |_, _| {}).unwrap_err();
    assert!(matches!(err, Error::MissingBucket(name) if name == "key"));
    Ok(())
}

#[test]
fn test_truncated_file_is_corrupt() -> anyhow::Result<()> {
    let data_dir = TempDir::new()?;
    let mut file = BoltFile::new();
    file.put(KEY_BUCKET, &BucketKey::new(2, 0).to_bytes(), &record("a", 2));

    let bytes = file.to_bytes();
    let path = backend_path(data_dir.path());
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(&path, &bytes[..bytes.len() - 4096])?;

    let backend = Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT)?;
    let err = backend.for_each(KEY_BUCKET, |_, _| {}).unwrap_err();
    assert!(matches!(err, Error::Corrupt { .. }));
    Ok(())
}

#[test]
fn test_open_missing_file_fails() {
    let data_dir = TempDir::new().unwrap();
    let path = backend_path(data_dir.path());

    assert!(matches!(
        Backend::open_read_only(&path, DEFAULT_OPEN_TIMEOUT),
        Err(Error::Io(_))
    ));
}

#[cfg(unix)]
#[test]
fn test_exclusive_lock_holder_times_out_reader() -> anyhow::Result<()> {
    use std::os::unix::io::AsRawFd;
    use std::time::Duration;

    let data_dir = TempDir::new()?;
    let path = write(data_dir.path(), BoltFile::new().bucket(KEY_BUCKET))?;

    let member = std::fs::File::open(&path)?;
    let rc = unsafe { libc::flock(member.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    assert_eq!(rc, 0);

    let err = Backend::open_read_only(&path, Duration::from_millis(100))
        .err()
        .unwrap();
    assert!(matches!(err, Error::Locked(_)));

    drop(member);
    assert!(Backend::open_read_only(&path, Duration::from_millis(100)).is_ok());
    Ok(())
}
