use crate::error::Result;
use crate::io::BlockStorage;
use crate::node::FileHeader;
use crate::SECTOR_SIZE;

use std::cmp::min;

/// An open file: the sector holding its header, an in-memory copy of that
/// header, and a seek position. The handle does not own the disk, so every
/// transfer borrows it from the caller.
///
/// Files have a fixed size chosen at creation. Reads and writes stop at the
/// end of the file rather than growing it.
#[derive(Debug, Clone)]
pub struct OpenFile {
    sector: i32,
    header: FileHeader,
    position: usize,
}

impl OpenFile {
    /// Opens the file whose header is stored at `sector`.
    pub fn open<D: BlockStorage + ?Sized>(dev: &mut D, sector: i32) -> Result<Self> {
        Ok(Self {
            sector,
            header: FileHeader::fetch_from(dev, sector)?,
            position: 0,
        })
    }

    pub fn sector(&self) -> i32 {
        self.sector
    }

    pub fn length(&self) -> usize {
        self.header.file_length()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Reads from the current position and advances it by the bytes read.
    pub fn read<D: BlockStorage + ?Sized>(&mut self, dev: &mut D, buf: &mut [u8]) -> Result<usize> {
        let read = self.read_at(dev, buf, self.position)?;
        self.position += read;
        Ok(read)
    }

    /// Writes at the current position and advances it by the bytes written.
    pub fn write<D: BlockStorage + ?Sized>(&mut self, dev: &mut D, buf: &[u8]) -> Result<usize> {
        let written = self.write_at(dev, buf, self.position)?;
        self.position += written;
        Ok(written)
    }

    pub fn read_at<D>(&self, dev: &mut D, buf: &mut [u8], position: usize) -> Result<usize>
    where
        D: BlockStorage + ?Sized,
    {
        let length = self.length();
        if position >= length || buf.is_empty() {
            return Ok(0);
        }
        let end = min(position + buf.len(), length);
        let mut start = position;
        let mut read_size = 0usize;
        let mut sector_buf = [0u8; SECTOR_SIZE];
        while start < end {
            let in_sector = start % SECTOR_SIZE;
            let chunk = min(end - start, SECTOR_SIZE - in_sector);
            let sector = self.header.byte_to_sector(dev, start)?;
            dev.read_sector(sector as usize, &mut sector_buf)?;
            buf[read_size..read_size + chunk]
                .copy_from_slice(&sector_buf[in_sector..in_sector + chunk]);
            read_size += chunk;
            start += chunk;
        }
        Ok(read_size)
    }

    pub fn write_at<D>(&self, dev: &mut D, buf: &[u8], position: usize) -> Result<usize>
    where
        D: BlockStorage + ?Sized,
    {
        let length = self.length();
        if position >= length || buf.is_empty() {
            return Ok(0);
        }
        let end = min(position + buf.len(), length);
        let mut start = position;
        let mut write_size = 0usize;
        let mut sector_buf = [0u8; SECTOR_SIZE];
        while start < end {
            let in_sector = start % SECTOR_SIZE;
            let chunk = min(end - start, SECTOR_SIZE - in_sector);
            let sector = self.header.byte_to_sector(dev, start)? as usize;
            // Partial sectors keep the bytes around the written range.
            if chunk < SECTOR_SIZE {
                dev.read_sector(sector, &mut sector_buf)?;
            }
            sector_buf[in_sector..in_sector + chunk]
                .copy_from_slice(&buf[write_size..write_size + chunk]);
            dev.write_sector(sector, &sector_buf)?;
            write_size += chunk;
            start += chunk;
        }
        Ok(write_size)
    }
}
