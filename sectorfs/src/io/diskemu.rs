use crate::io::{BlockStorage, SectorNumber};
use crate::SECTOR_SIZE;
use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{BufWriter, ErrorKind, SeekFrom};
use std::path::Path;

pub struct FileBlockEmulator {
    /// The file must be a fixed-size file some exact multiple of the size of a sector.
    fd: File,
    /// The total number of sectors available in the file store.
    sector_count: usize,
}

/// Emulates a sector addressed disk in userspace using a file as storage.
/// This is only meant to be used for file system development and testing.
impl FileBlockEmulator {
    /// Returns ownership of the underlying file descriptor to the caller.
    pub fn into_file(self) -> File {
        self.fd
    }

    fn check_range(&self, sector: SectorNumber) -> std::io::Result<()> {
        if sector >= self.sector_count {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("sector {} out of range", sector),
            ));
        }
        Ok(())
    }
}

impl BlockStorage for FileBlockEmulator {
    fn open_disk<P: AsRef<Path>>(dest: P, nsectors: usize) -> std::io::Result<Self>
    where
        Self: std::marker::Sized,
    {
        // Return error if the file does not exist rather than create one.
        let file = OpenOptions::new().read(true).write(true).open(dest)?;
        Ok(FileBlockEmulator {
            fd: file,
            sector_count: nsectors,
        })
    }

    fn read_sector(&mut self, sector: SectorNumber, buf: &mut [u8]) -> std::io::Result<()> {
        self.check_range(sector)?;
        if buf.len() < SECTOR_SIZE {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer does not contain enough space to read sector",
            ));
        }
        self.fd
            .seek(SeekFrom::Start((sector * SECTOR_SIZE) as u64))?;
        self.fd.read_exact(&mut buf[..SECTOR_SIZE])
    }

    fn write_sector(&mut self, sector: SectorNumber, buf: &[u8]) -> std::io::Result<()> {
        self.check_range(sector)?;
        if buf.len() != SECTOR_SIZE {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer length must equal the sector size",
            ));
        }
        self.fd
            .seek(SeekFrom::Start((sector * SECTOR_SIZE) as u64))?;
        self.fd.write_all(buf)
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        self.fd.sync_all()
    }

    fn sector_count(&self) -> usize {
        self.sector_count
    }
}

pub struct FileBlockEmulatorBuilder {
    fd: File,
    sector_count: usize,
    clear_medium: bool,
}

impl From<File> for FileBlockEmulatorBuilder {
    fn from(fd: File) -> Self {
        FileBlockEmulatorBuilder {
            fd,
            sector_count: 0,
            clear_medium: true,
        }
    }
}

impl FileBlockEmulatorBuilder {
    /// Sets the number of desired sectors in the device.
    pub fn with_sector_count(mut self, sectors: usize) -> Self {
        self.sector_count = sectors;
        self
    }

    /// Whether `build` zeroes the medium. Reopening a formatted disk image
    /// must leave its contents alone.
    pub fn clear_medium(mut self, clear: bool) -> Self {
        self.clear_medium = clear;
        self
    }

    /// This builder assumes ownership of the file descriptor used and, unless told
    /// otherwise, does destructive things to prepare the file for use. Ownership
    /// of the file is transfered to the emulator meaning this builder can only
    /// be used to create one emulator.
    pub fn build(mut self) -> std::io::Result<FileBlockEmulator> {
        if self.sector_count == 0 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "device needs at least one sector",
            ));
        }
        if self.clear_medium {
            self.zero_sectors()?;
        }
        Ok(FileBlockEmulator {
            fd: self.fd,
            sector_count: self.sector_count,
        })
    }

    fn zero_sectors(&mut self) -> std::io::Result<()> {
        self.fd.seek(SeekFrom::Start(0))?;
        let mut bfd = BufWriter::new(&self.fd);
        // Zero out the "disk", buffering each write to prevent excessive syscalls.
        let zeroes = [0x00; SECTOR_SIZE];
        for _ in 0..self.sector_count {
            bfd.write_all(&zeroes)?;
        }
        bfd.flush()
    }
}
