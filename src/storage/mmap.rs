//! # Memory-Mapped Page Store
//!
//! `PageStore` owns the backing file and its mapping, hands out page indices
//! and grows the file on demand. It is the only component that touches the
//! file descriptor or the mapping.
//!
//! ## File Layout
//!
//! ```text
//! +-----------------------------+  offset 0
//! | Caller header (header_size) |  opaque, for embedding in another format
//! +-----------------------------+
//! | Descriptor (16 bytes)       |  capacity, used pages, root page
//! +-----------------------------+
//! | Page 0                      |  PAGE_SIZE bytes each
//! | Page 1                      |
//! | ...                         |
//! | Page capacity-1             |
//! +-----------------------------+
//! ```
//!
//! ## Safety Model
//!
//! Growing the file remaps it, and the new mapping may live at a different
//! address. Instead of raw pointers that go stale, callers hold page indices
//! and re-resolve them through the store:
//!
//! ```text
//! page(&self, no) -> Result<&Page>          // Immutable borrow of self
//! page_mut(&mut self, no) -> Result<&mut Page>
//! add_page(&mut self) -> Result<u32>        // Mutable borrow (exclusive)
//! ```
//!
//! Since `add_page()` requires `&mut self`, the compiler rejects any code that
//! keeps a page reference alive across a call that might remap.
//!
//! ## Growth
//!
//! When every page is in use, `add_page()` doubles the capacity:
//!
//! 1. extend the file to the new length
//! 2. map the new length (the old mapping stays valid until this succeeds)
//! 3. initialise every new page with nil child links
//! 4. publish the new capacity in the descriptor
//!
//! A failure at steps 1–2 leaves the descriptor and all existing pages as
//! they were; the file is trimmed back to its old length on a best-effort
//! basis.
//!
//! ## Sharing a File
//!
//! Several handles, in one process or many, may map the same file. Mappings
//! are `MAP_SHARED`, so value updates are visible immediately. A handle that
//! did not perform a growth learns about it through [`PageStore::refresh`].

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::{Mmap, MmapMut, MmapOptions};
use tracing::{debug, warn};
use zerocopy::FromBytes;

use super::descriptor::Descriptor;
use super::page::Page;
use crate::config::{DEFAULT_INITIAL_BYTES, DESCRIPTOR_SIZE, HEADER_ALIGN, NIL_PAGE, PAGE_SIZE};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

/// Byte offsets of the regions inside a store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    header_size: usize,
}

impl Layout {
    pub fn new(header_size: usize) -> Self {
        Self { header_size }
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    pub fn descriptor_offset(&self) -> usize {
        self.header_size
    }

    pub fn page_offset(&self, page_no: u32) -> usize {
        self.header_size + DESCRIPTOR_SIZE + page_no as usize * PAGE_SIZE
    }

    pub fn file_len(&self, page_capacity: u32) -> u64 {
        (self.header_size + DESCRIPTOR_SIZE) as u64 + page_capacity as u64 * PAGE_SIZE as u64
    }

    /// Pages that fit in `DEFAULT_INITIAL_BYTES` after the header and
    /// descriptor, never fewer than one.
    pub fn default_capacity(&self) -> u32 {
        let room = DEFAULT_INITIAL_BYTES.saturating_sub(self.header_size + DESCRIPTOR_SIZE);
        (room / PAGE_SIZE).max(1) as u32
    }
}

#[derive(Debug)]
enum Mapping {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Mapping::ReadOnly(m) => &m[..],
            Mapping::ReadWrite(m) => &m[..],
        }
    }

    fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Mapping::ReadOnly(_) => None,
            Mapping::ReadWrite(m) => Some(&mut m[..]),
        }
    }
}

#[derive(Debug)]
pub struct PageStore {
    file: File,
    path: PathBuf,
    mapping: Mapping,
    layout: Layout,
    mapped_capacity: u32,
}

impl PageStore {
    /// Opens `path`, creating and initialising it when it is empty.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode, header_size: usize) -> Result<Self> {
        Self::open_with_capacity(path, mode, header_size, None)
    }

    /// Like [`PageStore::open`], but a newly created file gets
    /// `initial_capacity` pages instead of the default.
    pub fn open_with_capacity<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        header_size: usize,
        initial_capacity: Option<u32>,
    ) -> Result<Self> {
        let path = path.as_ref();
        ensure!(
            header_size % HEADER_ALIGN == 0,
            "header size {} for '{}' is not a multiple of {}",
            header_size,
            path.display(),
            HEADER_ALIGN
        );
        let layout = Layout::new(header_size);

        let file = match mode {
            OpenMode::ReadOnly => OpenOptions::new().read(true).open(path),
            OpenMode::ReadWrite => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path),
        }
        .map_err(|e| StoreError::unavailable(path, "open", e))?;

        let file_len = file
            .metadata()
            .map_err(|e| StoreError::unavailable(path, "stat", e))?
            .len();

        if file_len == 0 {
            if mode == OpenMode::ReadOnly {
                return Err(StoreError::invalid(path, "file is empty").into());
            }
            let capacity = initial_capacity.unwrap_or_else(|| layout.default_capacity());
            ensure!(
                capacity > 0 && capacity < NIL_PAGE,
                "initial capacity must be in 1..{}, got {}",
                NIL_PAGE,
                capacity
            );
            return Self::create(file, path, layout, capacity);
        }

        Self::attach(file, path, layout, mode, file_len)
    }

    fn create(file: File, path: &Path, layout: Layout, capacity: u32) -> Result<Self> {
        let file_len = layout.file_len(capacity);
        file.set_len(file_len)
            .map_err(|e| StoreError::unavailable(path, "resize", e))?;

        let mmap = map_read_write(&file, path, file_len)?;
        let mut store = Self {
            file,
            path: path.to_path_buf(),
            mapping: Mapping::ReadWrite(mmap),
            layout,
            mapped_capacity: capacity,
        };

        store.init_pages(0, capacity)?;
        *store.descriptor_mut()? = Descriptor::new(capacity, 1, 0);

        debug!(
            path = %path.display(),
            capacity,
            header_size = layout.header_size(),
            "created page store"
        );
        Ok(store)
    }

    fn attach(file: File, path: &Path, layout: Layout, mode: OpenMode, file_len: u64) -> Result<Self> {
        if file_len < layout.file_len(0) {
            return Err(StoreError::invalid(
                path,
                format!(
                    "file length {} too short for a {}-byte header and descriptor",
                    file_len,
                    layout.header_size() + DESCRIPTOR_SIZE
                ),
            )
            .into());
        }

        let mapping = map(&file, path, mode, file_len)?;
        let capacity = {
            let offset = layout.descriptor_offset();
            let desc = Descriptor::from_bytes(&mapping.bytes()[offset..offset + DESCRIPTOR_SIZE])?;
            if let Some(reason) = desc.validate() {
                return Err(StoreError::invalid(path, reason).into());
            }
            desc.page_capacity()
        };

        let required = layout.file_len(capacity);
        if file_len < required {
            return Err(StoreError::invalid(
                path,
                format!(
                    "file length {} shorter than the {} bytes {} pages need",
                    file_len, required, capacity
                ),
            )
            .into());
        }
        if file_len > required {
            warn!(
                path = %path.display(),
                file_len,
                required,
                "file longer than its descriptor implies, ignoring trailing bytes"
            );
        }

        debug!(path = %path.display(), capacity, ?mode, "opened page store");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            mapping,
            layout,
            mapped_capacity: capacity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        match self.mapping {
            Mapping::ReadOnly(_) => OpenMode::ReadOnly,
            Mapping::ReadWrite(_) => OpenMode::ReadWrite,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Pages covered by this handle's mapping.
    pub fn page_capacity(&self) -> u32 {
        self.mapped_capacity
    }

    pub fn used_pages(&self) -> Result<u32> {
        Ok(self.descriptor()?.used_pages())
    }

    pub fn root_page(&self) -> Result<u32> {
        Ok(self.descriptor()?.root_page())
    }

    pub fn set_root_page(&mut self, page_no: u32) -> Result<()> {
        let used = self.used_pages()?;
        ensure!(
            page_no < used,
            "root page {} not allocated (used_pages={})",
            page_no,
            used
        );
        self.descriptor_mut()?.set_root_page(page_no);
        Ok(())
    }

    /// A second handle to the backing file, sharing its open file description.
    pub fn try_clone_file(&self) -> Result<File> {
        self.file
            .try_clone()
            .wrap_err_with(|| format!("failed to duplicate handle for '{}'", self.path.display()))
    }

    pub fn descriptor(&self) -> Result<&Descriptor> {
        let offset = self.layout.descriptor_offset();
        Descriptor::from_bytes(&self.mapping.bytes()[offset..offset + DESCRIPTOR_SIZE])
    }

    fn descriptor_mut(&mut self) -> Result<&mut Descriptor> {
        let offset = self.layout.descriptor_offset();
        let bytes = self.writable_bytes()?;
        Descriptor::from_bytes_mut(&mut bytes[offset..offset + DESCRIPTOR_SIZE])
    }

    /// The caller-supplied header region.
    pub fn header(&self) -> &[u8] {
        &self.mapping.bytes()[..self.layout.header_size()]
    }

    pub fn header_mut(&mut self) -> Result<&mut [u8]> {
        let len = self.layout.header_size();
        Ok(&mut self.writable_bytes()?[..len])
    }

    pub fn page(&self, page_no: u32) -> Result<&Page> {
        self.check_bounds(page_no)?;
        let offset = self.layout.page_offset(page_no);
        Page::ref_from_bytes(&self.mapping.bytes()[offset..offset + PAGE_SIZE])
            .map_err(|e| eyre::eyre!("failed to read page {}: {:?}", page_no, e))
    }

    pub fn page_mut(&mut self, page_no: u32) -> Result<&mut Page> {
        self.check_bounds(page_no)?;
        let offset = self.layout.page_offset(page_no);
        let bytes = self.writable_bytes()?;
        Page::mut_from_bytes(&mut bytes[offset..offset + PAGE_SIZE])
            .map_err(|e| eyre::eyre!("failed to read page {}: {:?}", page_no, e))
    }

    /// Returns the next unused page, initialised empty with nil links.
    ///
    /// May grow and remap the file. Every page reference obtained before the
    /// call must be re-resolved afterwards; the `&mut self` receiver makes the
    /// compiler enforce that.
    pub fn add_page(&mut self) -> Result<u32> {
        self.refresh()?;

        let used = self.used_pages()?;
        if used >= self.mapped_capacity {
            self.grow()?;
        }

        *self.page_mut(used)? = Page::empty();
        self.descriptor_mut()?.set_used_pages(used + 1);
        Ok(used)
    }

    fn grow(&mut self) -> Result<()> {
        let old_capacity = self.mapped_capacity;
        let new_capacity = old_capacity
            .checked_mul(2)
            .filter(|&c| c < NIL_PAGE)
            .ok_or(StoreError::CapacityExhausted {
                capacity: old_capacity,
            })?;

        let old_len = self.layout.file_len(old_capacity);
        let new_len = self.layout.file_len(new_capacity);

        self.file
            .set_len(new_len)
            .map_err(|e| StoreError::unavailable(&self.path, "resize", e))?;

        let mmap = match map_read_write(&self.file, &self.path, new_len) {
            Ok(mmap) => mmap,
            Err(e) => {
                if let Err(trim) = self.file.set_len(old_len) {
                    warn!(path = %self.path.display(), error = %trim, "failed to trim file after failed remap");
                }
                return Err(e);
            }
        };

        self.mapping = Mapping::ReadWrite(mmap);
        self.mapped_capacity = new_capacity;
        self.init_pages(old_capacity, new_capacity)?;
        self.descriptor_mut()?.set_page_capacity(new_capacity);

        debug!(
            path = %self.path.display(),
            old_capacity,
            new_capacity,
            "grew page store"
        );
        Ok(())
    }

    /// Remaps if another handle grew the file. Returns whether it did.
    pub fn refresh(&mut self) -> Result<bool> {
        let recorded = self.descriptor()?.page_capacity();
        if recorded <= self.mapped_capacity {
            return Ok(false);
        }

        let required = self.layout.file_len(recorded);
        let file_len = self
            .file
            .metadata()
            .map_err(|e| StoreError::unavailable(&self.path, "stat", e))?
            .len();
        if file_len < required {
            return Err(StoreError::invalid(
                &self.path,
                format!(
                    "descriptor records {} pages but file holds {} bytes",
                    recorded, file_len
                ),
            )
            .into());
        }

        self.mapping = map(&self.file, &self.path, self.mode(), required)?;
        debug!(
            path = %self.path.display(),
            old_capacity = self.mapped_capacity,
            new_capacity = recorded,
            "remapped after external growth"
        );
        self.mapped_capacity = recorded;
        Ok(true)
    }

    /// Schedules an asynchronous flush of the header, descriptor and used
    /// pages. No stronger durability is promised.
    pub fn sync(&self) -> Result<()> {
        if let Mapping::ReadWrite(mmap) = &self.mapping {
            let used = self.used_pages()?.min(self.mapped_capacity);
            let len = self.layout.page_offset(used);
            mmap.flush_async_range(0, len)
                .map_err(|e| StoreError::unavailable(&self.path, "flush", e))?;
        }
        Ok(())
    }

    /// Flushes, unmaps and closes the file.
    pub fn close(self) -> Result<()> {
        self.sync()?;
        debug!(path = %self.path.display(), "closed page store");
        Ok(())
    }

    fn init_pages(&mut self, from: u32, to: u32) -> Result<()> {
        for page_no in from..to {
            *self.page_mut(page_no)? = Page::empty();
        }
        Ok(())
    }

    fn check_bounds(&self, page_no: u32) -> Result<()> {
        if page_no >= self.mapped_capacity {
            return Err(StoreError::PageOutOfBounds {
                page: page_no,
                capacity: self.mapped_capacity,
            }
            .into());
        }
        Ok(())
    }

    fn writable_bytes(&mut self) -> Result<&mut [u8]> {
        let path = &self.path;
        self.mapping
            .bytes_mut()
            .ok_or_else(|| StoreError::ReadOnly { path: path.clone() }.into())
    }
}

fn map(file: &File, path: &Path, mode: OpenMode, len: u64) -> Result<Mapping> {
    Ok(match mode {
        OpenMode::ReadOnly => Mapping::ReadOnly(map_read_only(file, path, len)?),
        OpenMode::ReadWrite => Mapping::ReadWrite(map_read_write(file, path, len)?),
    })
}

fn map_len(path: &Path, len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| {
        StoreError::invalid(path, format!("length {} does not fit the address space", len)).into()
    })
}

fn map_read_write(file: &File, path: &Path, len: u64) -> Result<MmapMut> {
    let len = map_len(path, len)?;
    // SAFETY: mapping a file is unsafe because other processes may modify it
    // underneath us. This is sound here because:
    // 1. The file is at least `len` bytes long (set_len or a length check precedes every call)
    // 2. Concurrent writers only mutate through the same layout and the
    //    structural lock, and values are plain integers valid for any bit pattern
    // 3. All access goes through page()/page_mut(), which bounds-check page_no
    //    against the mapped capacity
    unsafe {
        MmapOptions::new()
            .len(len)
            .map_mut(file)
            .map_err(|e| StoreError::unavailable(path, "map", e).into())
    }
}

fn map_read_only(file: &File, path: &Path, len: u64) -> Result<Mmap> {
    let len = map_len(path, len)?;
    // SAFETY: see map_read_write; a read-only mapping never writes.
    unsafe {
        MmapOptions::new()
            .len(len)
            .map(file)
            .map_err(|e| StoreError::unavailable(path, "map", e).into())
    }
}
