use crate::lock::lock_shared;
use crate::page::{
    BRANCH_PAGE, BUCKET_HEADER_SIZE, DEFAULT_PAGE_SIZE, LEAF_PAGE, LeafElement, META_PAGE,
    META_SIZE, Meta, PAGE_HEADER_SIZE, PageHeader, branch_children, le_u64, leaf_elements,
};
use crate::{Error, Result};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

/// How long a read-only open waits on a lock held by a live member.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(1);

/// Revision index bucket: bucket key -> encoded `KeyValue`.
pub const KEY_BUCKET: &str = "key";

// Deeper trees only come from cycles in a damaged file.
const MAX_TREE_DEPTH: usize = 64;

/// Read-only handle on a backend file.
///
/// Holds a shared lock on the file, released when the handle is dropped.
pub struct Backend {
    file: File,
    page_size: usize,
    meta: Meta,
}

impl Backend {
    /// Open an existing backend file without write access.
    ///
    /// Waits at most `timeout` for a lock held by another process.
    pub fn open_read_only(path: &Path, timeout: Duration) -> Result<Self> {
        let file = File::open(path)?;
        lock_shared(&file, timeout)?;

        let meta = read_meta(&file)?;
        Ok(Self {
            file,
            page_size: meta.page_size as usize,
            meta,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Transaction id of the meta page in use.
    pub fn txid(&self) -> u64 {
        self.meta.txid
    }

    /// Walk a top-level bucket in key order.
    ///
    /// Nested buckets are not visited. Returns the number of entries visited.
    pub fn for_each<F>(&self, bucket: &str, mut visit: F) -> Result<usize>
    where
        F: FnMut(&[u8], &[u8]),
    {
        let header = self
            .find_bucket(bucket)?
            .ok_or_else(|| Error::MissingBucket(bucket.to_string()))?;
        let root = le_u64(&header, 0)
            .ok_or_else(|| Error::corrupt(self.meta.root, "truncated bucket header"))?;

        let mut visited = 0;
        let mut visit_entry = |element: &LeafElement<'_>| {
            if !element.is_bucket() {
                visit(element.key, element.value);
                visited += 1;
            }
        };

        if root == 0 {
            let inline = header.get(BUCKET_HEADER_SIZE..).unwrap_or_default();
            for element in inline_elements(self.meta.root, inline)? {
                visit_entry(&element);
            }
        } else {
            self.walk(root, 0, &mut visit_entry)?;
        }

        Ok(visited)
    }

    /// Header and inline page of a top-level bucket.
    fn find_bucket(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut found = None;
        self.walk(self.meta.root, 0, &mut |element: &LeafElement<'_>| {
            if found.is_none() && element.is_bucket() && element.key == name.as_bytes() {
                found = Some(element.value.to_vec());
            }
        })?;
        Ok(found)
    }

    fn walk<F>(&self, id: u64, depth: usize, visit: &mut F) -> Result<()>
    where
        F: FnMut(&LeafElement<'_>),
    {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::corrupt(
                id,
                format!("tree deeper than {} levels", MAX_TREE_DEPTH),
            ));
        }

        let (header, data) = self.read_page(id)?;
        match header.flags {
            LEAF_PAGE => {
                let elements = leaf_elements(&data, header.count)
                    .ok_or_else(|| Error::corrupt(id, "leaf element out of bounds"))?;
                for element in &elements {
                    visit(element);
                }
            }
            BRANCH_PAGE => {
                let children = branch_children(&data, header.count)
                    .ok_or_else(|| Error::corrupt(id, "branch element out of bounds"))?;
                for child in children {
                    self.walk(child, depth + 1, visit)?;
                }
            }
            flags => {
                return Err(Error::corrupt(
                    id,
                    format!("unexpected page flags {:#x}", flags),
                ));
            }
        }
        Ok(())
    }

    /// Read a page and its overflow pages.
    fn read_page(&self, id: u64) -> Result<(PageHeader, Vec<u8>)> {
        if id < 2 || id >= self.meta.high_water {
            return Err(Error::corrupt(
                id,
                format!("page id outside 2..{}", self.meta.high_water),
            ));
        }

        let offset = id * self.page_size as u64;
        let first = read_at(&self.file, offset, PAGE_HEADER_SIZE)
            .map_err(|err| page_read_error(id, err))?;
        let header = PageHeader::decode(&first)
            .ok_or_else(|| Error::corrupt(id, "truncated page header"))?;
        if header.id != id {
            return Err(Error::corrupt(
                id,
                format!("page header names page {}", header.id),
            ));
        }

        let len = (header.overflow as usize + 1) * self.page_size;
        let data = read_at(&self.file, offset, len).map_err(|err| page_read_error(id, err))?;
        Ok((header, data))
    }
}

fn inline_elements(parent: u64, page: &[u8]) -> Result<Vec<LeafElement<'_>>> {
    let header =
        PageHeader::decode(page).ok_or_else(|| Error::corrupt(parent, "truncated inline bucket"))?;
    if header.flags != LEAF_PAGE {
        return Err(Error::corrupt(
            parent,
            format!("inline bucket with page flags {:#x}", header.flags),
        ));
    }
    leaf_elements(page, header.count)
        .ok_or_else(|| Error::corrupt(parent, "inline element out of bounds"))
}

/// Pick the newest valid meta page. The second copy sits one page size in,
/// which is only known once the first copy decodes.
fn read_meta(file: &File) -> Result<Meta> {
    let first = read_meta_page(file, 0);
    let page_size = match &first {
        Ok(meta) => meta.page_size as usize,
        Err(_) => DEFAULT_PAGE_SIZE,
    };
    let second = read_meta_page(file, page_size as u64);

    match (first, second) {
        (Ok(a), Ok(b)) => Ok(if b.txid > a.txid { b } else { a }),
        (Ok(meta), Err(_)) | (Err(_), Ok(meta)) => Ok(meta),
        (Err(reason), Err(_)) => Err(Error::InvalidMeta(reason)),
    }
}

fn read_meta_page(file: &File, offset: u64) -> std::result::Result<Meta, &'static str> {
    let data = read_at(file, offset, PAGE_HEADER_SIZE + META_SIZE).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            "file too small"
        } else {
            "meta page unreadable"
        }
    })?;
    let header = PageHeader::decode(&data).ok_or("truncated meta page")?;
    if header.flags & META_PAGE == 0 {
        return Err("not a meta page");
    }
    Meta::decode(&data[PAGE_HEADER_SIZE..])
}

fn read_at(file: &File, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
    let mut file = file;
    let mut buf = vec![0u8; len];
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

fn page_read_error(id: u64, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::UnexpectedEof {
        Error::corrupt(id, "page extends past end of file")
    } else {
        Error::Io(err)
    }
}
