//! An indexed-allocation file system over a sector addressed disk.
//!
//! # Layout
//! ==============================================================================
//! | Bitmap header (0) | Root directory header (1) | headers, index and data ... |
//! ==============================================================================
//!
//! The free-sector bitmap and the root directory are ordinary files whose
//! headers sit in sectors 0 and 1. Every other sector is handed out from the
//! bitmap as file headers, index blocks or data.
//!
//! Nothing here is synchronized: a `FileSystem` assumes one mutating call at
//! a time, and there is no journal to recover from a crash mid-operation.

mod alloc;
mod dir;
mod error;
mod file;
mod fs;
pub mod io;
mod node;

use std::mem::size_of;

pub use crate::alloc::Bitmap;
pub use crate::dir::{DirEntry, Directory, EntryKind, DIR_ENTRY_SIZE};
pub use crate::error::{FsError, Result};
pub use crate::file::OpenFile;
pub use crate::fs::{
    resolve_dir, split_path, FileSystem, OpenFileId, DIRECTORY_FILE_SIZE, DIRECTORY_SECTOR,
    FREE_MAP_SECTOR,
};
pub use crate::node::{index_sectors_needed, FileHeader, SectorRef, NO_SECTOR};

/// Bytes per disk sector, the unit of every disk transfer.
pub const SECTOR_SIZE: usize = 128;

/// Data sectors named directly by a file header. The rest of the header holds
/// the two byte counts and the two indirect pointers.
pub const NUM_DIRECT: usize = (SECTOR_SIZE - 4 * size_of::<i32>()) / size_of::<i32>();

/// Pointers held by one index block after its count.
pub const NUM_INDIRECT: usize = (SECTOR_SIZE - size_of::<i32>()) / size_of::<i32>();

/// Data sectors reachable through the direct, single and double indirect tiers.
pub const MAX_FILE_SECTORS: usize = NUM_DIRECT + NUM_INDIRECT + NUM_INDIRECT * NUM_INDIRECT;

pub const MAX_FILE_SIZE: usize = MAX_FILE_SECTORS * SECTOR_SIZE;

/// Slots per directory. Directories never grow.
pub const NUM_DIR_ENTRIES: usize = 10;

pub const FILE_NAME_MAX_LEN: usize = 19;
