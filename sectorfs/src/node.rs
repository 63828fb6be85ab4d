use crate::alloc::Bitmap;
use crate::error::{FsError, Result};
use crate::io::BlockStorage;
use crate::{MAX_FILE_SIZE, NUM_DIRECT, NUM_INDIRECT, SECTOR_SIZE};

use log::{debug, trace};
use std::io::Write;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Marks an index pointer that has no block behind it.
pub const NO_SECTOR: i32 = -1;

/// A structure that occupies exactly one sector on disk.
pub(crate) trait SectorImage: AsBytes + FromBytes + Sized {
    fn fetch_from<D: BlockStorage + ?Sized>(dev: &mut D, sector: i32) -> Result<Self> {
        let mut image = Self::new_zeroed();
        dev.read_sector(sector as usize, image.as_bytes_mut())?;
        Ok(image)
    }

    fn write_back<D: BlockStorage + ?Sized>(&self, dev: &mut D, sector: i32) -> Result<()> {
        dev.write_sector(sector as usize, self.as_bytes())?;
        Ok(())
    }
}

#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, PartialEq, Eq)]
/// Describes where on disk the data of one file lives. This structure __must
/// be exactly one sector.__
///
/// The first `NUM_DIRECT` data sectors are named directly. The next
/// `NUM_INDIRECT` go through a single indirect block, and the rest through a
/// double indirect block whose entries each name a single indirect block.
pub struct FileHeader {
    /// The total size of the file in bytes.
    num_bytes: i32,
    /// Number of data sectors, always `num_bytes` rounded up to whole sectors.
    num_sectors: i32,
    /// Data sectors for the start of the file.
    data_sectors: [i32; NUM_DIRECT],
    /// Sector of the `SingleIndirectBlock`, or `NO_SECTOR`.
    single_indirect: i32,
    /// Sector of the `DoubleIndirectBlock`, or `NO_SECTOR`.
    double_indirect: i32,
}

#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug)]
pub struct SingleIndirectBlock {
    count: i32,
    sectors: [i32; NUM_INDIRECT],
}

#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug)]
pub struct DoubleIndirectBlock {
    count: i32,
    children: [i32; NUM_INDIRECT],
}

const _: () = assert!(std::mem::size_of::<FileHeader>() == SECTOR_SIZE);
const _: () = assert!(std::mem::size_of::<SingleIndirectBlock>() == SECTOR_SIZE);
const _: () = assert!(std::mem::size_of::<DoubleIndirectBlock>() == SECTOR_SIZE);

impl SectorImage for FileHeader {}
impl SectorImage for SingleIndirectBlock {}
impl SectorImage for DoubleIndirectBlock {}

/// Where the pointer for one logical sector of a file is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorRef {
    /// The header names the data sector itself.
    Direct(i32),
    /// Entry `index` of the single indirect block at the given sector.
    ViaSingle(i32, usize),
    /// Entry `index` of child `child` of the double indirect block at the
    /// given sector.
    ViaDouble(i32, usize, usize),
}

/// Number of index blocks a file of `num_sectors` data sectors needs.
///
/// Filling the single indirect block opens the double indirect tier, even
/// when no sector is left over for it.
pub fn index_sectors_needed(num_sectors: usize) -> usize {
    if num_sectors <= NUM_DIRECT {
        0
    } else if num_sectors < NUM_DIRECT + NUM_INDIRECT {
        1
    } else {
        2 + (num_sectors - NUM_DIRECT - NUM_INDIRECT).div_ceil(NUM_INDIRECT)
    }
}

/// Takes one free sector and remembers it so a failed allocation can hand it back.
fn draw(bitmap: &mut Bitmap, drawn: &mut Vec<usize>) -> Result<i32> {
    let sector = bitmap.find_and_set().ok_or(FsError::NoSpace)?;
    drawn.push(sector);
    Ok(sector as i32)
}

impl SingleIndirectBlock {
    fn allocate(count: usize, bitmap: &mut Bitmap, drawn: &mut Vec<usize>) -> Result<Self> {
        let mut block = Self::new_zeroed();
        for slot in block.sectors[..count].iter_mut() {
            *slot = draw(bitmap, drawn)?;
        }
        block.count = count as i32;
        Ok(block)
    }

    fn entries(&self) -> &[i32] {
        &self.sectors[..self.count as usize]
    }
}

impl DoubleIndirectBlock {
    fn entries(&self) -> &[i32] {
        &self.children[..self.count as usize]
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            num_bytes: 0,
            num_sectors: 0,
            data_sectors: [NO_SECTOR; NUM_DIRECT],
            single_indirect: NO_SECTOR,
            double_indirect: NO_SECTOR,
        }
    }
}

impl FileHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes a fresh header for a file of `file_size` bytes, drawing its
    /// data sectors and any index blocks from `bitmap`.
    ///
    /// Index blocks are written to disk as soon as they are filled; the header
    /// itself is left for the caller to write back. Nothing is drawn from the
    /// bitmap unless the whole file fits, and on any error every sector taken
    /// by this call is returned to the bitmap before the error is reported.
    pub fn allocate<D>(&mut self, bitmap: &mut Bitmap, dev: &mut D, file_size: usize) -> Result<()>
    where
        D: BlockStorage + ?Sized,
    {
        if file_size > MAX_FILE_SIZE {
            return Err(FsError::FileTooLarge(file_size));
        }
        let num_sectors = file_size.div_ceil(SECTOR_SIZE);
        let required = num_sectors + index_sectors_needed(num_sectors);
        if bitmap.num_clear() < required {
            debug!(
                "{} sectors needed for {} bytes, {} free",
                required,
                file_size,
                bitmap.num_clear()
            );
            return Err(FsError::NoSpace);
        }

        *self = Self::default();
        self.num_bytes = file_size as i32;
        self.num_sectors = num_sectors as i32;

        let mut drawn = Vec::with_capacity(required);
        if let Err(e) = self.fill(bitmap, dev, &mut drawn) {
            for &sector in drawn.iter().rev() {
                bitmap.clear(sector);
            }
            *self = Self::default();
            return Err(e);
        }
        Ok(())
    }

    fn fill<D>(&mut self, bitmap: &mut Bitmap, dev: &mut D, drawn: &mut Vec<usize>) -> Result<()>
    where
        D: BlockStorage + ?Sized,
    {
        let total = self.num_sectors as usize;
        let direct = total.min(NUM_DIRECT);
        for slot in self.data_sectors[..direct].iter_mut() {
            *slot = draw(bitmap, drawn)?;
        }
        let mut remaining = total - direct;
        if remaining == 0 {
            trace!("direct pointers are enough for {} bytes", self.num_bytes);
            return Ok(());
        }

        self.single_indirect = draw(bitmap, drawn)?;
        let count = remaining.min(NUM_INDIRECT);
        let single = SingleIndirectBlock::allocate(count, bitmap, drawn)?;
        single.write_back(dev, self.single_indirect)?;
        remaining -= count;
        if count < NUM_INDIRECT {
            trace!("single indirect block at {}", self.single_indirect);
            return Ok(());
        }

        self.double_indirect = draw(bitmap, drawn)?;
        let mut double = DoubleIndirectBlock::new_zeroed();
        while remaining > 0 {
            if double.count as usize == NUM_INDIRECT {
                return Err(FsError::FileTooLarge(self.num_bytes as usize));
            }
            let child_sector = draw(bitmap, drawn)?;
            let count = remaining.min(NUM_INDIRECT);
            let child = SingleIndirectBlock::allocate(count, bitmap, drawn)?;
            child.write_back(dev, child_sector)?;
            double.children[double.count as usize] = child_sector;
            double.count += 1;
            remaining -= count;
        }
        double.write_back(dev, self.double_indirect)?;
        trace!(
            "double indirect block at {} with {} children",
            self.double_indirect,
            double.count
        );
        Ok(())
    }

    /// Returns every sector of this file, data and index blocks alike, to the
    /// bitmap. Index blocks are read back from disk only if the header points
    /// at them.
    pub fn deallocate<D>(&mut self, bitmap: &mut Bitmap, dev: &mut D) -> Result<()>
    where
        D: BlockStorage + ?Sized,
    {
        let direct = (self.num_sectors as usize).min(NUM_DIRECT);
        for &sector in &self.data_sectors[..direct] {
            bitmap.clear(sector as usize);
        }

        if self.single_indirect != NO_SECTOR {
            let single = SingleIndirectBlock::fetch_from(dev, self.single_indirect)?;
            for &sector in single.entries() {
                bitmap.clear(sector as usize);
            }
            bitmap.clear(self.single_indirect as usize);
            self.single_indirect = NO_SECTOR;
        }

        if self.double_indirect != NO_SECTOR {
            let double = DoubleIndirectBlock::fetch_from(dev, self.double_indirect)?;
            for &child_sector in double.entries() {
                let child = SingleIndirectBlock::fetch_from(dev, child_sector)?;
                for &sector in child.entries() {
                    bitmap.clear(sector as usize);
                }
                bitmap.clear(child_sector as usize);
            }
            bitmap.clear(self.double_indirect as usize);
            self.double_indirect = NO_SECTOR;
        }
        Ok(())
    }

    pub fn fetch_from<D: BlockStorage + ?Sized>(dev: &mut D, sector: i32) -> Result<Self> {
        <Self as SectorImage>::fetch_from(dev, sector)
    }

    pub fn write_back<D: BlockStorage + ?Sized>(&self, dev: &mut D, sector: i32) -> Result<()> {
        <Self as SectorImage>::write_back(self, dev, sector)
    }

    /// Which tier holds the pointer for logical sector `index` of the file.
    pub fn locate(&self, index: usize) -> SectorRef {
        if index < NUM_DIRECT {
            SectorRef::Direct(self.data_sectors[index])
        } else if index < NUM_DIRECT + NUM_INDIRECT {
            SectorRef::ViaSingle(self.single_indirect, index - NUM_DIRECT)
        } else {
            let rest = index - NUM_DIRECT - NUM_INDIRECT;
            SectorRef::ViaDouble(
                self.double_indirect,
                rest / NUM_INDIRECT,
                rest % NUM_INDIRECT,
            )
        }
    }

    /// Translates a byte offset within the file into the disk sector storing it.
    pub fn byte_to_sector<D>(&self, dev: &mut D, offset: usize) -> Result<i32>
    where
        D: BlockStorage + ?Sized,
    {
        if offset >= self.file_length() {
            return Err(FsError::OutOfRange {
                offset,
                length: self.file_length(),
            });
        }
        match self.locate(offset / SECTOR_SIZE) {
            SectorRef::Direct(sector) => Ok(sector),
            SectorRef::ViaSingle(block, index) => {
                Ok(SingleIndirectBlock::fetch_from(dev, block)?.sectors[index])
            }
            SectorRef::ViaDouble(block, child, index) => {
                let double = DoubleIndirectBlock::fetch_from(dev, block)?;
                let single = SingleIndirectBlock::fetch_from(dev, double.children[child])?;
                Ok(single.sectors[index])
            }
        }
    }

    pub fn file_length(&self) -> usize {
        self.num_bytes as usize
    }

    pub fn num_sectors(&self) -> usize {
        self.num_sectors as usize
    }

    pub fn single_indirect(&self) -> Option<i32> {
        Some(self.single_indirect).filter(|&s| s != NO_SECTOR)
    }

    pub fn double_indirect(&self) -> Option<i32> {
        Some(self.double_indirect).filter(|&s| s != NO_SECTOR)
    }

    /// All data sectors of the file in logical order.
    pub fn data_sectors<D>(&self, dev: &mut D) -> Result<Vec<i32>>
    where
        D: BlockStorage + ?Sized,
    {
        let direct = self.num_sectors().min(NUM_DIRECT);
        let mut sectors = self.data_sectors[..direct].to_vec();
        if let Some(block) = self.single_indirect() {
            sectors.extend_from_slice(SingleIndirectBlock::fetch_from(dev, block)?.entries());
        }
        if let Some(block) = self.double_indirect() {
            let double = DoubleIndirectBlock::fetch_from(dev, block)?;
            for &child in double.entries() {
                sectors.extend_from_slice(SingleIndirectBlock::fetch_from(dev, child)?.entries());
            }
        }
        Ok(sectors)
    }

    /// Sectors holding index blocks rather than file data.
    pub fn index_sectors<D>(&self, dev: &mut D) -> Result<Vec<i32>>
    where
        D: BlockStorage + ?Sized,
    {
        let mut sectors: Vec<i32> = self.single_indirect().into_iter().collect();
        if let Some(block) = self.double_indirect() {
            sectors.push(block);
            sectors.extend_from_slice(DoubleIndirectBlock::fetch_from(dev, block)?.entries());
        }
        Ok(sectors)
    }

    /// Dumps the header and the file's contents, printable bytes as-is and
    /// everything else as hex escapes.
    pub fn print<D>(&self, dev: &mut D, out: &mut dyn Write) -> Result<()>
    where
        D: BlockStorage + ?Sized,
    {
        let sectors = self.data_sectors(dev)?;
        writeln!(
            out,
            "FileHeader contents.  File size: {}.  File blocks:",
            self.num_bytes
        )?;
        for sector in &sectors {
            write!(out, "{} ", sector)?;
        }
        write!(out, "\nFile contents:\n")?;

        let mut data = [0u8; SECTOR_SIZE];
        let mut left = self.file_length();
        for &sector in &sectors {
            dev.read_sector(sector as usize, &mut data)?;
            for &byte in &data[..left.min(SECTOR_SIZE)] {
                if (0x20..=0x7e).contains(&byte) {
                    write!(out, "{}", byte as char)?;
                } else {
                    write!(out, "\\{:x}", byte)?;
                }
            }
            left = left.saturating_sub(SECTOR_SIZE);
            writeln!(out)?;
        }
        Ok(())
    }
}
