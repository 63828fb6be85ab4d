use std::path::Path;

/// The sector number to access ranging from 0 (the first sector) to n - 1 (the last
/// sector) where n is number of sectors available.
pub type SectorNumber = usize;

/// A synchronous disk made of fixed size sectors. Every transfer moves exactly
/// one `SECTOR_SIZE` sector and completes before the call returns.
pub trait BlockStorage {
    /// Opens a disk at the specified path. This method does not validate the
    /// sectors, it is up for clients to ensure disks are appropriately formatted.
    fn open_disk<P: AsRef<Path>>(path: P, nsectors: usize) -> std::io::Result<Self>
    where
        Self: std::marker::Sized;
    /// Reads disk sector number into provided buffer.
    ///
    /// # Errors
    ///
    /// Attempting to read a sector out of range, or into a buffer smaller than a
    /// sector, will return an error.
    fn read_sector(&mut self, sector: SectorNumber, buf: &mut [u8]) -> std::io::Result<()>;
    /// Writes provided buffer into the specified sector number.
    ///
    /// # Errors
    ///
    /// Attempting to write a sector out of range, or a buffer that is not exactly
    /// one sector long, will return an error.
    fn write_sector(&mut self, sector: SectorNumber, buf: &[u8]) -> std::io::Result<()>;
    /// Flush any buffered disk IO from memory. This is useful if it must guaranteed
    /// the disk writes actually occurred, for instance, if being re-read from
    /// disk.
    fn sync_disk(&mut self) -> std::io::Result<()>;
    /// Total number of addressable sectors.
    fn sector_count(&self) -> usize;
}
