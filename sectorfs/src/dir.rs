use crate::error::{FsError, Result};
use crate::file::OpenFile;
use crate::io::BlockStorage;
use crate::node::FileHeader;
use crate::FILE_NAME_MAX_LEN;

use std::fmt;
use std::io::Write;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

const KIND_FILE: u32 = 0;
const KIND_DIR: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "F"),
            EntryKind::Directory => write!(f, "D"),
        }
    }
}

/// One slot of a directory table, stored on disk exactly as laid out here.
#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    in_use: u32,
    /// Sector of the entry's `FileHeader`.
    sector: i32,
    /// NUL padded name.
    name: [u8; FILE_NAME_MAX_LEN + 1],
    kind: u32,
}

/// Size in bytes of one directory slot on disk.
pub const DIR_ENTRY_SIZE: usize = std::mem::size_of::<DirEntry>();

impl DirEntry {
    fn new(name: &str, sector: i32, kind: EntryKind) -> Self {
        let mut entry = Self::new_zeroed();
        entry.in_use = 1;
        entry.sector = sector;
        entry.name[..name.len()].copy_from_slice(name.as_bytes());
        entry.kind = match kind {
            EntryKind::File => KIND_FILE,
            EntryKind::Directory => KIND_DIR,
        };
        entry
    }

    pub fn in_use(&self) -> bool {
        self.in_use != 0
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILE_NAME_MAX_LEN);
        std::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    pub fn sector(&self) -> i32 {
        self.sector
    }

    pub fn kind(&self) -> EntryKind {
        if self.kind == KIND_DIR {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == EntryKind::Directory
    }
}

impl fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirEntry")
            .field("in_use", &self.in_use())
            .field("name", &self.name())
            .field("sector", &self.sector)
            .field("kind", &self.kind())
            .finish()
    }
}

/// A fixed number of name to header-sector slots. A directory is stored as
/// an ordinary file holding the whole table, so directories nest by naming
/// the header of another directory file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    table: Vec<DirEntry>,
}

impl Directory {
    /// An empty table with `size` slots.
    pub fn new(size: usize) -> Self {
        Self {
            table: vec![DirEntry::new_zeroed(); size],
        }
    }

    /// Bytes needed to store a table of `size` slots.
    pub const fn file_size(size: usize) -> usize {
        size * DIR_ENTRY_SIZE
    }

    /// Replaces the in-memory table with the one stored in `file`.
    pub fn fetch_from<D: BlockStorage + ?Sized>(&mut self, dev: &mut D, file: &OpenFile) -> Result<()> {
        self.table.iter_mut().for_each(|e| *e = DirEntry::new_zeroed());
        file.read_at(dev, self.table.as_mut_slice().as_bytes_mut(), 0)?;
        Ok(())
    }

    pub fn write_back<D: BlockStorage + ?Sized>(&self, dev: &mut D, file: &OpenFile) -> Result<()> {
        file.write_at(dev, self.table.as_slice().as_bytes(), 0)?;
        Ok(())
    }

    fn find_index(&self, name: &str) -> Option<usize> {
        self.table
            .iter()
            .position(|e| e.in_use() && e.name() == name)
    }

    /// Header sector of `name`, if present.
    pub fn find(&self, name: &str) -> Option<i32> {
        self.find_entry(name).map(DirEntry::sector)
    }

    pub fn find_entry(&self, name: &str) -> Option<&DirEntry> {
        self.find_index(name).map(|i| &self.table[i])
    }

    /// Claims the first free slot for `name`.
    pub fn add(&mut self, name: &str, sector: i32, kind: EntryKind) -> Result<()> {
        if name.len() > FILE_NAME_MAX_LEN {
            return Err(FsError::NameTooLong(name.to_string()));
        }
        // Stored names end at the first NUL.
        if name.is_empty() || name.contains('\0') {
            return Err(FsError::InvalidPath(name.escape_default().to_string()));
        }
        if self.find_index(name).is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        let slot = self
            .table
            .iter_mut()
            .find(|e| !e.in_use())
            .ok_or(FsError::DirectoryFull)?;
        *slot = DirEntry::new(name, sector, kind);
        Ok(())
    }

    /// Frees the slot of `name`. Other slots keep their position.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let index = self
            .find_index(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        self.table[index].in_use = 0;
        Ok(())
    }

    /// In-use entries in slot order.
    pub fn list(&self) -> Vec<&DirEntry> {
        self.table.iter().filter(|e| e.in_use()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.table.iter().all(|e| !e.in_use())
    }

    /// Lists every entry together with its header and contents.
    pub fn print<D: BlockStorage + ?Sized>(&self, dev: &mut D, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "Directory contents:")?;
        for entry in self.list() {
            writeln!(
                out,
                "Name: {}, Sector: {}, Kind: {}",
                entry.name(),
                entry.sector(),
                entry.kind()
            )?;
            FileHeader::fetch_from(dev, entry.sector())?.print(dev, out)?;
        }
        writeln!(out)?;
        Ok(())
    }
}
