use crate::stats::{KeyRevisionIndex, KeyStat, write_stats};
use crate::{Error, Result};
use kvdiag_store::{Backend, DEFAULT_OPEN_TIMEOUT, KEY_BUCKET, backend_path};
use kvdiag_types::{BucketKey, KeyValue};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of one scan of the `key` bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub stats: Vec<KeyStat>,
    /// Entries visited, corrupt ones included.
    pub scanned: usize,
    /// Entries whose key or value could not be decoded.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No backend file under the data directory.
    Missing(PathBuf),
    Analyzed(Analysis),
}

/// Scan the backend file of `data_dir`.
///
/// A missing backend file is an outcome, not an error. Corrupt entries are
/// logged and skipped.
pub fn analyze(data_dir: &Path) -> Result<Outcome> {
    let db_path = backend_path(data_dir);
    if !db_path.try_exists()? {
        warn!("{} does not exist", db_path.display());
        return Ok(Outcome::Missing(db_path));
    }

    let store_err = |source: kvdiag_store::Error| Error::Store {
        path: db_path.clone(),
        source,
    };
    let backend = Backend::open_read_only(&db_path, DEFAULT_OPEN_TIMEOUT).map_err(store_err)?;
    debug!(
        "opened {} (page size {}, txid {})",
        db_path.display(),
        backend.page_size(),
        backend.txid()
    );

    let mut index = KeyRevisionIndex::new();
    let mut skipped = 0;
    let scanned = backend
        .for_each(KEY_BUCKET, |raw_key, raw_value| {
            match decode_entry(raw_key, raw_value) {
                Some((key, rev)) => index.record(key, rev),
                None => skipped += 1,
            }
        })
        .map_err(store_err)?;
    drop(backend);

    Ok(Outcome::Analyzed(Analysis {
        stats: index.into_stats(),
        scanned,
        skipped,
    }))
}

fn decode_entry(raw_key: &[u8], raw_value: &[u8]) -> Option<(String, BucketKey)> {
    let rev = match BucketKey::from_bytes(raw_key) {
        Ok(rev) => rev,
        Err(err) => {
            warn!("Failed to decode bucket key {:?}, error: {}", raw_key, err);
            return None;
        }
    };

    match KeyValue::from_record(raw_value) {
        Ok(kv) => Some((kv.key_lossy(), rev)),
        Err(err) => {
            warn!("Failed to unmarshal key: {}, error: {}", rev, err);
            None
        }
    }
}

/// Analyze `data_dir` and print the per-key statistics to `out`.
pub fn analyze_offline<W: Write>(data_dir: &Path, out: &mut W) -> Result<Outcome> {
    info!("kvdiag performs offline analysis...");

    let outcome = analyze(data_dir)?;
    if let Outcome::Analyzed(analysis) = &outcome {
        if analysis.skipped > 0 {
            warn!(
                "skipped {} of {} entries that could not be decoded",
                analysis.skipped, analysis.scanned
            );
        }
        write_stats(out, &analysis.stats)?;
    }
    Ok(outcome)
}
