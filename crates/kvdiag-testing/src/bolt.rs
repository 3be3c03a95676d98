//! Writer for backend files in the paged layout a member writes.
//!
//! Produces two valid meta pages, an empty freelist page, one B+tree per
//! bucket and the root bucket naming them. Buckets marked inline are stored
//! inside the root bucket's leaf value instead of pages of their own.

use kvdiag_store::page::{
    BRANCH_PAGE, BUCKET_HEADER_SIZE, BUCKET_LEAF_FLAG, DEFAULT_PAGE_SIZE, ELEMENT_SIZE,
    FREELIST_PAGE, LEAF_PAGE, MAGIC, META_CHECKSUM_OFFSET, META_PAGE, META_SIZE,
    PAGE_HEADER_SIZE, VERSION, meta_checksum,
};
use std::collections::BTreeMap;
use std::path::Path;

const FREELIST_PAGE_ID: u64 = 2;
const FIRST_DATA_PAGE: u64 = 3;

#[derive(Debug, Clone, Default)]
struct BucketData {
    inline: bool,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

struct Element {
    flags: u32,
    key: Vec<u8>,
    value: Vec<u8>,
}

/// In-memory backend file.
#[derive(Debug, Clone)]
pub struct BoltFile {
    page_size: usize,
    leaf_capacity: usize,
    buckets: BTreeMap<String, BucketData>,
}

impl Default for BoltFile {
    fn default() -> Self {
        Self::new()
    }
}

impl BoltFile {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            leaf_capacity: 64,
            buckets: BTreeMap::new(),
        }
    }

    /// Maximum elements per leaf or branch page. Small values force
    /// multi-level trees.
    pub fn with_leaf_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity = capacity.max(2);
        self
    }

    /// Ensure a bucket with pages of its own exists.
    pub fn bucket(&mut self, name: &str) -> &mut Self {
        self.buckets.entry(name.to_string()).or_default();
        self
    }

    /// Ensure a bucket stored inline in the root bucket exists.
    pub fn inline_bucket(&mut self, name: &str) -> &mut Self {
        self.buckets.entry(name.to_string()).or_default().inline = true;
        self
    }

    /// Insert or replace an entry, creating the bucket when needed.
    pub fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> &mut Self {
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .entries
            .insert(key.to_vec(), value.to_vec());
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pages = PageWriter {
            page_size: self.page_size,
            out: vec![0u8; FIRST_DATA_PAGE as usize * self.page_size],
            next: FIRST_DATA_PAGE,
        };

        let freelist = FREELIST_PAGE_ID as usize * self.page_size;
        write_page_header(&mut pages.out[freelist..], FREELIST_PAGE_ID, FREELIST_PAGE, 0, 0);

        let mut root_elements = Vec::new();
        for (name, bucket) in &self.buckets {
            let elements: Vec<Element> = bucket
                .entries
                .iter()
                .map(|(key, value)| Element {
                    flags: 0,
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect();

            let mut header = vec![0u8; BUCKET_HEADER_SIZE];
            if bucket.inline {
                header.extend(leaf_node(&elements));
            } else {
                let root = self.write_tree(&mut pages, elements);
                header[..8].copy_from_slice(&root.to_le_bytes());
            }
            root_elements.push(Element {
                flags: BUCKET_LEAF_FLAG,
                key: name.as_bytes().to_vec(),
                value: header,
            });
        }
        let root = self.write_tree(&mut pages, root_elements);

        let high_water = pages.next;
        for (id, txid) in [(0u64, 0u64), (1, 1)] {
            let offset = id as usize * self.page_size;
            let page = self.meta_page(id, root, high_water, txid);
            pages.out[offset..offset + page.len()].copy_from_slice(&page);
        }
        pages.out
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bytes())
    }

    fn write_tree(&self, pages: &mut PageWriter, elements: Vec<Element>) -> u64 {
        if elements.is_empty() {
            return pages.alloc(leaf_node(&[]));
        }

        let mut level: Vec<(Vec<u8>, u64)> = elements
            .chunks(self.leaf_capacity)
            .map(|chunk| (chunk[0].key.clone(), pages.alloc(leaf_node(chunk))))
            .collect();

        while level.len() > 1 {
            level = level
                .chunks(self.leaf_capacity)
                .map(|chunk| (chunk[0].0.clone(), pages.alloc(branch_node(chunk))))
                .collect();
        }
        level[0].1
    }

    fn meta_page(&self, id: u64, root: u64, high_water: u64, txid: u64) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_HEADER_SIZE + META_SIZE];
        write_page_header(&mut page, id, META_PAGE, 0, 0);

        let meta = &mut page[PAGE_HEADER_SIZE..];
        meta[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        meta[4..8].copy_from_slice(&VERSION.to_le_bytes());
        meta[8..12].copy_from_slice(&(self.page_size as u32).to_le_bytes());
        meta[16..24].copy_from_slice(&root.to_le_bytes());
        meta[32..40].copy_from_slice(&FREELIST_PAGE_ID.to_le_bytes());
        meta[40..48].copy_from_slice(&high_water.to_le_bytes());
        meta[48..56].copy_from_slice(&txid.to_le_bytes());
        let checksum = meta_checksum(meta);
        meta[META_CHECKSUM_OFFSET..META_SIZE].copy_from_slice(&checksum.to_le_bytes());
        page
    }
}

struct PageWriter {
    page_size: usize,
    out: Vec<u8>,
    next: u64,
}

impl PageWriter {
    /// Place a node at the next free page id, spilling into overflow pages.
    fn alloc(&mut self, mut node: Vec<u8>) -> u64 {
        let id = self.next;
        let count = node.len().div_ceil(self.page_size).max(1);
        node[0..8].copy_from_slice(&id.to_le_bytes());
        node[12..16].copy_from_slice(&((count - 1) as u32).to_le_bytes());
        node.resize(count * self.page_size, 0);

        self.out.extend(node);
        self.next += count as u64;
        id
    }
}

fn write_page_header(page: &mut [u8], id: u64, flags: u16, count: u16, overflow: u32) {
    page[0..8].copy_from_slice(&id.to_le_bytes());
    page[8..10].copy_from_slice(&flags.to_le_bytes());
    page[10..12].copy_from_slice(&count.to_le_bytes());
    page[12..16].copy_from_slice(&overflow.to_le_bytes());
}

fn leaf_node(elements: &[Element]) -> Vec<u8> {
    let mut node = vec![0u8; PAGE_HEADER_SIZE + elements.len() * ELEMENT_SIZE];
    write_page_header(&mut node, 0, LEAF_PAGE, elements.len() as u16, 0);
    for (i, element) in elements.iter().enumerate() {
        let at = PAGE_HEADER_SIZE + i * ELEMENT_SIZE;
        let pos = (node.len() - at) as u32;
        node[at..at + 4].copy_from_slice(&element.flags.to_le_bytes());
        node[at + 4..at + 8].copy_from_slice(&pos.to_le_bytes());
        node[at + 8..at + 12].copy_from_slice(&(element.key.len() as u32).to_le_bytes());
        node[at + 12..at + 16].copy_from_slice(&(element.value.len() as u32).to_le_bytes());
        node.extend_from_slice(&element.key);
        node.extend_from_slice(&element.value);
    }
    node
}

fn branch_node(children: &[(Vec<u8>, u64)]) -> Vec<u8> {
    let mut node = vec![0u8; PAGE_HEADER_SIZE + children.len() * ELEMENT_SIZE];
    write_page_header(&mut node, 0, BRANCH_PAGE, children.len() as u16, 0);
    for (i, (key, child)) in children.iter().enumerate() {
        let at = PAGE_HEADER_SIZE + i * ELEMENT_SIZE;
        let pos = (node.len() - at) as u32;
        node[at..at + 4].copy_from_slice(&pos.to_le_bytes());
        node[at + 4..at + 8].copy_from_slice(&(key.len() as u32).to_le_bytes());
        node[at + 8..at + 16].copy_from_slice(&child.to_le_bytes());
        node.extend_from_slice(key);
    }
    node
}
