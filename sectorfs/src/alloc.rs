use crate::error::Result;
use crate::file::OpenFile;
use crate::io::BlockStorage;
use std::io::Write;

const BITS_PER_WORD: usize = 64;

/// Tracks which disk sectors are in use, one bit per sector. The map is itself
/// stored as an ordinary file whose header lives at a well known sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    map: Vec<u64>,
    num_bits: usize,
}

impl Bitmap {
    /// A map with every sector free.
    pub fn new(num_bits: usize) -> Self {
        Self {
            map: vec![0; (num_bits + BITS_PER_WORD - 1) / BITS_PER_WORD],
            num_bits,
        }
    }

    /// Size in bytes of the file needed to persist a map of `num_bits` sectors.
    pub fn file_size(num_bits: usize) -> usize {
        (num_bits + 7) / 8
    }

    pub fn test(&self, which: usize) -> bool {
        assert!(which < self.num_bits, "sector {} outside bitmap", which);
        self.map[which / BITS_PER_WORD] & (1 << (which % BITS_PER_WORD)) != 0
    }

    pub fn mark(&mut self, which: usize) {
        assert!(which < self.num_bits, "sector {} outside bitmap", which);
        self.map[which / BITS_PER_WORD] |= 1 << (which % BITS_PER_WORD);
    }

    /// Frees a sector. Freeing a sector that is not in use means the on-disk
    /// structures disagree with the map and nothing after this point can be
    /// trusted, so it panics.
    pub fn clear(&mut self, which: usize) {
        assert!(
            self.test(which),
            "freed sector {} was not marked in use",
            which
        );
        self.map[which / BITS_PER_WORD] &= !(1 << (which % BITS_PER_WORD));
    }

    /// Marks and returns the lowest free sector.
    pub fn find_and_set(&mut self) -> Option<usize> {
        for (pos, word) in self.map.iter_mut().enumerate() {
            if *word != u64::MAX {
                let which = pos * BITS_PER_WORD + word.trailing_ones() as usize;
                if which >= self.num_bits {
                    return None;
                }
                *word |= 1 << (which % BITS_PER_WORD);
                return Some(which);
            }
        }
        None
    }

    pub fn num_clear(&self) -> usize {
        let used: usize = self.map.iter().map(|w| w.count_ones() as usize).sum();
        self.num_bits - used
    }

    /// Iterates over every sector currently in use.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_bits).filter(move |&i| self.test(i))
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.map.iter().flat_map(|w| w.to_le_bytes()).collect();
        bytes.truncate(Self::file_size(self.num_bits));
        bytes
    }

    fn from_bytes(bytes: &[u8], num_bits: usize) -> Self {
        let mut bitmap = Self::new(num_bits);
        for (word, chunk) in bitmap.map.iter_mut().zip(bytes.chunks(8)) {
            let mut le = [0u8; 8];
            le[..chunk.len()].copy_from_slice(chunk);
            *word = u64::from_le_bytes(le);
        }
        bitmap
    }

    /// Loads the map from its backing file.
    pub fn fetch_from<D>(dev: &mut D, file: &OpenFile, num_bits: usize) -> Result<Self>
    where
        D: BlockStorage + ?Sized,
    {
        let mut bytes = vec![0; Self::file_size(num_bits)];
        file.read_at(dev, &mut bytes, 0)?;
        Ok(Self::from_bytes(&bytes, num_bits))
    }

    /// Flushes the map into its backing file.
    pub fn write_back<D>(&self, dev: &mut D, file: &OpenFile) -> Result<()>
    where
        D: BlockStorage + ?Sized,
    {
        file.write_at(dev, &self.to_bytes(), 0)?;
        Ok(())
    }

    pub fn print(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "Bitmap set:")?;
        for sector in self.iter_set() {
            write!(out, "{}, ", sector)?;
        }
        writeln!(out)
    }
}
