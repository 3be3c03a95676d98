use kvdiag_types::BucketKey;
use std::collections::HashMap;
use std::io::Write;

/// Revision count of one logical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStat {
    pub key: String,
    pub revisions: usize,
}

/// Logical key -> bucket keys seen for it, in scan order.
#[derive(Debug, Default)]
pub struct KeyRevisionIndex {
    revisions: HashMap<String, Vec<BucketKey>>,
}

impl KeyRevisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: String, rev: BucketKey) {
        self.revisions.entry(key).or_default().push(rev);
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn revisions(&self, key: &str) -> Option<&[BucketKey]> {
        self.revisions.get(key).map(Vec::as_slice)
    }

    /// Consume the index into stats, most revisions first, ties by key.
    pub fn into_stats(self) -> Vec<KeyStat> {
        let mut stats: Vec<KeyStat> = self
            .revisions
            .into_iter()
            .map(|(key, revs)| KeyStat {
                key,
                revisions: revs.len(),
            })
            .collect();
        stats.sort_by(|a, b| b.revisions.cmp(&a.revisions).then_with(|| a.key.cmp(&b.key)));
        stats
    }
}

/// Print the `All key stats:` listing.
pub fn write_stats<W: Write>(out: &mut W, stats: &[KeyStat]) -> std::io::Result<()> {
    writeln!(out, "All key stats:")?;
    for stat in stats {
        writeln!(out, "{}: {}", stat.key, stat.revisions)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_sorted_by_count_then_key() {
        let mut index = KeyRevisionIndex::new();
        let mut main = 1;
        for key in ["b", "a", "c", "a", "c", "a"] {
            index.record(key.to_string(), BucketKey::new(main, 0));
            main += 1;
        }

        assert_eq!(index.len(), 3);
        assert_eq!(
            index.revisions("c"),
            Some(&[BucketKey::new(3, 0), BucketKey::new(5, 0)][..])
        );

        let mut out = Vec::new();
        write_stats(&mut out, &index.into_stats()).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        All key stats:
        a: 3
        c: 2
        b: 1
        ");
    }

    #[test]
    fn test_equal_counts_are_lexical() {
        let mut index = KeyRevisionIndex::new();
        index.record("zeta".to_string(), BucketKey::new(2, 0));
        index.record("alpha".to_string(), BucketKey::new(3, 0));

        let keys: Vec<String> = index.into_stats().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_empty_listing_has_header_only() {
        let mut out = Vec::new();
        write_stats(&mut out, &[]).unwrap();
        assert_eq!(out, b"All key stats:\n");
    }
}
