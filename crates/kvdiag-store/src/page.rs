//! On-disk page layout of the backend file.
//!
//! The file is a sequence of fixed-size pages. Pages 0 and 1 hold the two
//! meta copies, the newest valid one names the root bucket page. Buckets are
//! B+trees of branch and leaf pages; small buckets are stored inline in their
//! parent's leaf value. Integers are little-endian, and element positions are
//! relative to the start of the element itself.

pub const MAGIC: u32 = 0xED0C_DAED;
pub const VERSION: u32 = 2;
pub const DEFAULT_PAGE_SIZE: usize = 4096;

pub const PAGE_HEADER_SIZE: usize = 16;
pub const ELEMENT_SIZE: usize = 16;
pub const BUCKET_HEADER_SIZE: usize = 16;
pub const META_SIZE: usize = 64;
/// Meta bytes covered by the checksum that follows them.
pub const META_CHECKSUM_OFFSET: usize = 56;

pub const BRANCH_PAGE: u16 = 0x01;
pub const LEAF_PAGE: u16 = 0x02;
pub const META_PAGE: u16 = 0x04;
pub const FREELIST_PAGE: u16 = 0x10;

/// Leaf element flag of a nested bucket.
pub const BUCKET_LEAF_FLAG: u32 = 0x01;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over the meta fields preceding the checksum.
pub fn meta_checksum(meta: &[u8]) -> u64 {
    meta.iter()
        .take(META_CHECKSUM_OFFSET)
        .fold(FNV_OFFSET_BASIS, |hash, &byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        })
}

fn field<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    data.get(offset..offset.checked_add(N)?)?.try_into().ok()
}

pub(crate) fn le_u16(data: &[u8], offset: usize) -> Option<u16> {
    field(data, offset).map(u16::from_le_bytes)
}

pub(crate) fn le_u32(data: &[u8], offset: usize) -> Option<u32> {
    field(data, offset).map(u32::from_le_bytes)
}

pub(crate) fn le_u64(data: &[u8], offset: usize) -> Option<u64> {
    field(data, offset).map(u64::from_le_bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub id: u64,
    pub flags: u16,
    pub count: u16,
    pub overflow: u32,
}

impl PageHeader {
    pub fn decode(data: &[u8]) -> Option<Self> {
        Some(Self {
            id: le_u64(data, 0)?,
            flags: le_u16(data, 8)?,
            count: le_u16(data, 10)?,
            overflow: le_u32(data, 12)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub page_size: u32,
    pub flags: u32,
    /// Page of the root bucket, which holds every top-level bucket.
    pub root: u64,
    pub freelist: u64,
    /// One past the highest page id in use.
    pub high_water: u64,
    pub txid: u64,
}

impl Meta {
    /// Decode and validate the meta block that follows a meta page header.
    pub fn decode(block: &[u8]) -> Result<Self, &'static str> {
        const TRUNCATED: &str = "truncated meta page";

        let magic = le_u32(block, 0).ok_or(TRUNCATED)?;
        if magic != MAGIC {
            return Err("invalid magic");
        }
        let version = le_u32(block, 4).ok_or(TRUNCATED)?;
        if version != VERSION {
            return Err("unsupported format version");
        }
        let checksum = le_u64(block, META_CHECKSUM_OFFSET).ok_or(TRUNCATED)?;
        if checksum != meta_checksum(block) {
            return Err("meta checksum mismatch");
        }

        let page_size = le_u32(block, 8).ok_or(TRUNCATED)?;
        if page_size < 512 || !page_size.is_power_of_two() {
            return Err("invalid page size");
        }

        Ok(Self {
            page_size,
            flags: le_u32(block, 12).ok_or(TRUNCATED)?,
            root: le_u64(block, 16).ok_or(TRUNCATED)?,
            freelist: le_u64(block, 32).ok_or(TRUNCATED)?,
            high_water: le_u64(block, 40).ok_or(TRUNCATED)?,
            txid: le_u64(block, 48).ok_or(TRUNCATED)?,
        })
    }
}

/// Entry of a leaf page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LeafElement<'a> {
    pub flags: u32,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl LeafElement<'_> {
    pub fn is_bucket(&self) -> bool {
        self.flags & BUCKET_LEAF_FLAG != 0
    }
}

/// Elements of a leaf page, in key order. `None` when an element points
/// outside the page.
pub(crate) fn leaf_elements(data: &[u8], count: u16) -> Option<Vec<LeafElement<'_>>> {
    (0..usize::from(count))
        .map(|i| {
            let at = PAGE_HEADER_SIZE + i * ELEMENT_SIZE;
            let flags = le_u32(data, at)?;
            let pos = le_u32(data, at + 4)? as usize;
            let ksize = le_u32(data, at + 8)? as usize;
            let vsize = le_u32(data, at + 12)? as usize;

            let key_start = at.checked_add(pos)?;
            let value_start = key_start.checked_add(ksize)?;
            Some(LeafElement {
                flags,
                key: data.get(key_start..value_start)?,
                value: data.get(value_start..value_start.checked_add(vsize)?)?,
            })
        })
        .collect()
}

/// Child page ids of a branch page, in key order.
pub(crate) fn branch_children(data: &[u8], count: u16) -> Option<Vec<u64>> {
    (0..usize::from(count))
        .map(|i| le_u64(data, PAGE_HEADER_SIZE + i * ELEMENT_SIZE + 8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_block(page_size: u32, txid: u64) -> Vec<u8> {
        let mut block = vec![0u8; META_SIZE];
        block[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        block[4..8].copy_from_slice(&VERSION.to_le_bytes());
        block[8..12].copy_from_slice(&page_size.to_le_bytes());
        block[16..24].copy_from_slice(&3u64.to_le_bytes());
        block[32..40].copy_from_slice(&2u64.to_le_bytes());
        block[40..48].copy_from_slice(&4u64.to_le_bytes());
        block[48..56].copy_from_slice(&txid.to_le_bytes());
        let sum = meta_checksum(&block);
        block[56..64].copy_from_slice(&sum.to_le_bytes());
        block
    }

    #[test]
    fn test_checksum_of_empty_input_is_offset_basis() {
        assert_eq!(meta_checksum(&[]), FNV_OFFSET_BASIS);
        assert_eq!(meta_checksum(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_meta_decode() {
        let meta = Meta::decode(&meta_block(4096, 7)).unwrap();
        assert_eq!(meta.page_size, 4096);
        assert_eq!(meta.root, 3);
        assert_eq!(meta.freelist, 2);
        assert_eq!(meta.high_water, 4);
        assert_eq!(meta.txid, 7);
    }

    #[test]
    fn test_meta_rejects_damage() {
        let mut block = meta_block(4096, 7);
        block[48] ^= 0xff;
        assert_eq!(Meta::decode(&block), Err("meta checksum mismatch"));

        let mut block = meta_block(4096, 7);
        block[0] = 0;
        assert_eq!(Meta::decode(&block), Err("invalid magic"));

        assert_eq!(Meta::decode(&meta_block(1000, 7)), Err("invalid page size"));
        assert_eq!(Meta::decode(&[0xed, 0xda]), Err("truncated meta page"));
    }

    #[test]
    fn test_leaf_elements_resolve_relative_positions() {
        let mut page = vec![0u8; PAGE_HEADER_SIZE + 2 * ELEMENT_SIZE];
        let entries: [(&[u8], &[u8]); 2] = [(b"a", b"1"), (b"bc", b"")];
        for (i, (key, value)) in entries.iter().enumerate() {
            let at = PAGE_HEADER_SIZE + i * ELEMENT_SIZE;
            let pos = (page.len() - at) as u32;
            page[at + 4..at + 8].copy_from_slice(&pos.to_le_bytes());
            page[at + 8..at + 12].copy_from_slice(&(key.len() as u32).to_le_bytes());
            page[at + 12..at + 16].copy_from_slice(&(value.len() as u32).to_le_bytes());
            page.extend_from_slice(key);
            page.extend_from_slice(value);
        }

        let elements = leaf_elements(&page, 2).unwrap();
        assert_eq!(elements[0].key, b"a");
        assert_eq!(elements[0].value, b"1");
        assert_eq!(elements[1].key, b"bc");
        assert!(elements[1].value.is_empty());
        assert!(!elements[1].is_bucket());

        assert!(leaf_elements(&page, 3).is_none());
    }
}
