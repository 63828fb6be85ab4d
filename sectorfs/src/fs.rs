use crate::alloc::Bitmap;
use crate::dir::{DirEntry, Directory, EntryKind};
use crate::error::{FsError, Result};
use crate::file::OpenFile;
use crate::io::BlockStorage;
use crate::node::FileHeader;
use crate::NUM_DIR_ENTRIES;

use log::{debug, info, trace, warn};
use rand::Rng;
use std::collections::HashMap;
use std::io::Write;

/// Known locations.
pub const FREE_MAP_SECTOR: i32 = 0;
pub const DIRECTORY_SECTOR: i32 = 1;

/// Every directory file holds the full table, used or not.
pub const DIRECTORY_FILE_SIZE: usize = Directory::file_size(NUM_DIR_ENTRIES);

/// Process visible name for a file in the open table.
pub type OpenFileId = i32;

/// Splits a `/` separated path into its component names. Empty components
/// are skipped, so `/a//b/` and `a/b` name the same entry.
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if let Some(c) = components.iter().find(|&&c| c == "." || c == "..") {
        return Err(FsError::InvalidPath(format!(
            "relative component \"{}\" in {}",
            c, path
        )));
    }
    Ok(components)
}

/// Splits a path into the directories to walk and the final name.
fn split_target(path: &str) -> Result<(Vec<&str>, &str)> {
    let mut components = split_path(path)?;
    let name = components
        .pop()
        .ok_or_else(|| FsError::InvalidPath(format!("{} names no entry", path)))?;
    Ok((components, name))
}

/// Walks `components` down from the root directory and returns the file and
/// table of the directory reached. Every component must name a directory.
pub fn resolve_dir<D>(dev: &mut D, root: &OpenFile, components: &[&str]) -> Result<(OpenFile, Directory)>
where
    D: BlockStorage + ?Sized,
{
    let mut file = root.clone();
    let mut dir = Directory::new(NUM_DIR_ENTRIES);
    dir.fetch_from(dev, &file)?;
    for (depth, &name) in components.iter().enumerate() {
        let walked = || format!("/{}", components[..=depth].join("/"));
        let entry = *dir
            .find_entry(name)
            .ok_or_else(|| FsError::NotFound(walked()))?;
        if !entry.is_dir() {
            return Err(FsError::NotADirectory(walked()));
        }
        trace!("descending into {} at sector {}", name, entry.sector());
        file = OpenFile::open(dev, entry.sector())?;
        dir.fetch_from(dev, &file)?;
    }
    Ok((file, dir))
}

fn walk<D>(dev: &mut D, dir: &Directory, depth: usize, out: &mut Vec<(usize, DirEntry)>) -> Result<()>
where
    D: BlockStorage + ?Sized,
{
    for entry in dir.list() {
        out.push((depth, *entry));
        if entry.is_dir() {
            let file = OpenFile::open(dev, entry.sector())?;
            let mut sub = Directory::new(NUM_DIR_ENTRIES);
            sub.fetch_from(dev, &file)?;
            walk(dev, &sub, depth + 1, out)?;
        }
    }
    Ok(())
}

/// The naming layer over a sector device.
///
/// Mutating calls load private copies of the bitmap and the affected
/// directory, change those, and write them back only once the whole
/// operation has succeeded. A failed call leaves both on disk as they were.
/// Path resolution state never outlives the call that needed it.
pub struct FileSystem<T: BlockStorage> {
    dev: T,
    /// Bit map of free disk sectors, represented as a file.
    free_map_file: OpenFile,
    /// The root directory, represented as a file.
    directory_file: OpenFile,
    opened: HashMap<OpenFileId, OpenFile>,
}

impl<T: BlockStorage> FileSystem<T> {
    /// Initializes an empty file system onto owned storage.
    ///
    /// The bitmap and root directory are files like any other, but opening a
    /// file reads its header from disk. Both headers are therefore written to
    /// their well known sectors before either file is opened and flushed.
    pub fn format(mut dev: T) -> Result<Self> {
        let num_sectors = dev.sector_count();
        info!("formatting a {} sector disk", num_sectors);
        if num_sectors <= DIRECTORY_SECTOR as usize {
            return Err(FsError::NoSpace);
        }

        let mut free_map = Bitmap::new(num_sectors);
        let directory = Directory::new(NUM_DIR_ENTRIES);
        let mut map_hdr = FileHeader::new();
        let mut dir_hdr = FileHeader::new();

        // Claim the header sectors before the data allocations can.
        free_map.mark(FREE_MAP_SECTOR as usize);
        free_map.mark(DIRECTORY_SECTOR as usize);
        map_hdr.allocate(&mut free_map, &mut dev, Bitmap::file_size(num_sectors))?;
        dir_hdr.allocate(&mut free_map, &mut dev, DIRECTORY_FILE_SIZE)?;

        debug!("writing bitmap and directory headers");
        map_hdr.write_back(&mut dev, FREE_MAP_SECTOR)?;
        dir_hdr.write_back(&mut dev, DIRECTORY_SECTOR)?;

        let free_map_file = OpenFile::open(&mut dev, FREE_MAP_SECTOR)?;
        let directory_file = OpenFile::open(&mut dev, DIRECTORY_SECTOR)?;
        free_map.write_back(&mut dev, &free_map_file)?;
        directory.write_back(&mut dev, &directory_file)?;
        dev.sync_disk()?;

        Ok(FileSystem {
            dev,
            free_map_file,
            directory_file,
            opened: HashMap::new(),
        })
    }

    /// Opens a file system previously written by `format`.
    pub fn mount(mut dev: T) -> Result<Self> {
        let free_map_file = OpenFile::open(&mut dev, FREE_MAP_SECTOR)?;
        let directory_file = OpenFile::open(&mut dev, DIRECTORY_SECTOR)?;
        if free_map_file.length() != Bitmap::file_size(dev.sector_count())
            || directory_file.length() != DIRECTORY_FILE_SIZE
        {
            warn!("sectors 0 and 1 do not hold bitmap and directory headers");
            return Err(FsError::Unformatted);
        }
        info!("mounted a {} sector disk", dev.sector_count());

        Ok(FileSystem {
            dev,
            free_map_file,
            directory_file,
            opened: HashMap::new(),
        })
    }

    /// Flushes the device and hands it back.
    pub fn into_device(mut self) -> Result<T> {
        self.dev.sync_disk()?;
        Ok(self.dev)
    }

    fn fetch_free_map(&mut self) -> Result<Bitmap> {
        let num_sectors = self.dev.sector_count();
        Bitmap::fetch_from(&mut self.dev, &self.free_map_file, num_sectors)
    }

    fn resolve(&mut self, components: &[&str]) -> Result<(OpenFile, Directory)> {
        resolve_dir(&mut self.dev, &self.directory_file, components)
    }

    /// Creates a file of a fixed `initial_size` bytes. Files never grow.
    pub fn create(&mut self, path: &str, initial_size: usize) -> Result<()> {
        self.create_entry(path, initial_size, EntryKind::File)
            .map(|_| ())
            .inspect_err(|e| debug!("creating {} failed: {}", path, e))
    }

    /// Creates an empty directory. The path must be absolute.
    pub fn make_new_dir(&mut self, path: &str) -> Result<()> {
        if !path.starts_with('/') {
            return Err(FsError::InvalidPath(format!(
                "{} must start with \"/\"",
                path
            )));
        }
        self.create_entry(path, DIRECTORY_FILE_SIZE, EntryKind::Directory)
            .map(|_| ())
            .inspect_err(|e| debug!("creating directory {} failed: {}", path, e))
    }

    fn create_entry(&mut self, path: &str, size: usize, kind: EntryKind) -> Result<i32> {
        let (parents, name) = split_target(path)?;
        debug!("creating {:?} {} of {} bytes", kind, path, size);

        let (dir_file, mut dir) = self.resolve(&parents)?;
        if dir.find(name).is_some() {
            return Err(FsError::AlreadyExists(path.to_string()));
        }

        let mut free_map = self.fetch_free_map()?;
        let sector = free_map.find_and_set().ok_or(FsError::NoSpace)? as i32;
        dir.add(name, sector, kind)?;
        let mut hdr = FileHeader::new();
        hdr.allocate(&mut free_map, &mut self.dev, size)?;

        // Everything worked, flush all changes back to disk.
        hdr.write_back(&mut self.dev, sector)?;
        if kind == EntryKind::Directory {
            let content = OpenFile::open(&mut self.dev, sector)?;
            Directory::new(NUM_DIR_ENTRIES).write_back(&mut self.dev, &content)?;
        }
        dir.write_back(&mut self.dev, &dir_file)?;
        free_map.write_back(&mut self.dev, &self.free_map_file)?;
        Ok(sector)
    }

    /// Opens the file or directory at `path` without recording it in the
    /// open table.
    pub fn open(&mut self, path: &str) -> Result<OpenFile> {
        let (parents, name) = split_target(path)?;
        debug!("opening {}", path);
        let (_, dir) = self.resolve(&parents)?;
        let sector = dir
            .find(name)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        OpenFile::open(&mut self.dev, sector)
    }

    /// Opens `path` and records it under a fresh id. Ids are drawn at random
    /// and redrawn until one not currently open turns up.
    pub fn open_a_file(&mut self, path: &str) -> Result<OpenFileId> {
        let file = self.open(path)?;
        let mut rng = rand::rng();
        let id = loop {
            let id: OpenFileId = rng.random_range(1..=OpenFileId::MAX);
            if !self.opened.contains_key(&id) {
                break id;
            }
        };
        self.opened.insert(id, file);
        Ok(id)
    }

    /// Reads at the handle's position. An unknown id transfers nothing.
    pub fn read_a_file(&mut self, id: OpenFileId, buf: &mut [u8]) -> Result<usize> {
        match self.opened.get_mut(&id) {
            Some(file) => file.read(&mut self.dev, buf),
            None => {
                warn!("read from unknown file id {}", id);
                Ok(0)
            }
        }
    }

    /// Writes at the handle's position. An unknown id transfers nothing.
    pub fn write_a_file(&mut self, id: OpenFileId, buf: &[u8]) -> Result<usize> {
        match self.opened.get_mut(&id) {
            Some(file) => file.write(&mut self.dev, buf),
            None => {
                warn!("write to unknown file id {}", id);
                Ok(0)
            }
        }
    }

    pub fn close_a_file(&mut self, id: OpenFileId) -> Result<()> {
        self.opened
            .remove(&id)
            .map(|_| ())
            .ok_or(FsError::InvalidHandle(id))
    }

    /// The handle recorded under `id`, if it is open.
    pub fn handle(&self, id: OpenFileId) -> Option<&OpenFile> {
        self.opened.get(&id)
    }

    /// Deletes a file, or an empty directory, and releases all its sectors.
    ///
    /// Ids open on the removed file are dropped from the open table, so later
    /// transfers through them move nothing instead of touching sectors that a
    /// new file may own.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let (parents, name) = split_target(path)?;
        debug!("removing {}", path);

        let (dir_file, mut dir) = self.resolve(&parents)?;
        let entry = *dir
            .find_entry(name)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        let mut hdr = FileHeader::fetch_from(&mut self.dev, entry.sector())?;
        if entry.is_dir() {
            let content = OpenFile::open(&mut self.dev, entry.sector())?;
            let mut sub = Directory::new(NUM_DIR_ENTRIES);
            sub.fetch_from(&mut self.dev, &content)?;
            if !sub.is_empty() {
                return Err(FsError::DirectoryNotEmpty(path.to_string()));
            }
        }

        let mut free_map = self.fetch_free_map()?;
        hdr.deallocate(&mut free_map, &mut self.dev)?;
        free_map.clear(entry.sector() as usize);
        dir.remove(name)?;

        free_map.write_back(&mut self.dev, &self.free_map_file)?;
        dir.write_back(&mut self.dev, &dir_file)?;

        let before = self.opened.len();
        self.opened.retain(|_, file| file.sector() != entry.sector());
        if self.opened.len() != before {
            debug!("dropped {} open ids on {}", before - self.opened.len(), path);
        }
        Ok(())
    }

    /// Entries of the directory at `path`, in slot order.
    pub fn list(&mut self, path: &str) -> Result<Vec<DirEntry>> {
        let components = split_path(path)?;
        let (_, dir) = self.resolve(&components)?;
        Ok(dir.list().into_iter().copied().collect())
    }

    /// Every entry below `path`, depth first, paired with its depth.
    pub fn list_recursive(&mut self, path: &str) -> Result<Vec<(usize, DirEntry)>> {
        let components = split_path(path)?;
        let (_, dir) = self.resolve(&components)?;
        let mut entries = Vec::new();
        walk(&mut self.dev, &dir, 0, &mut entries)?;
        Ok(entries)
    }

    /// Number of sectors not yet handed out.
    pub fn free_sectors(&mut self) -> Result<usize> {
        Ok(self.fetch_free_map()?.num_clear())
    }

    /// Dumps the bitmap and directory headers, the bitmap, and every root
    /// entry with its header and contents.
    pub fn print(&mut self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "Bit map file header:")?;
        FileHeader::fetch_from(&mut self.dev, FREE_MAP_SECTOR)?.print(&mut self.dev, out)?;

        writeln!(out, "Directory file header:")?;
        FileHeader::fetch_from(&mut self.dev, DIRECTORY_SECTOR)?.print(&mut self.dev, out)?;

        self.fetch_free_map()?.print(out)?;

        let (_, root) = self.resolve(&[])?;
        root.print(&mut self.dev, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{FileBlockEmulator, FileBlockEmulatorBuilder};
    use crate::{MAX_FILE_SIZE, SECTOR_SIZE};
    use std::collections::HashSet;

    const DISK_SECTORS: usize = 1024;

    fn create_test_device() -> FileBlockEmulator {
        FileBlockEmulatorBuilder::from(tempfile::tempfile().unwrap())
            .with_sector_count(DISK_SECTORS)
            .build()
            .expect("Could not initialize disk emulator.")
    }

    fn formatted() -> FileSystem<FileBlockEmulator> {
        FileSystem::format(create_test_device()).unwrap()
    }

    fn disk_image(fs: &mut FileSystem<FileBlockEmulator>) -> Vec<u8> {
        let mut image = vec![0; DISK_SECTORS * SECTOR_SIZE];
        for (i, chunk) in image.chunks_mut(SECTOR_SIZE).enumerate() {
            fs.dev.read_sector(i, chunk).unwrap();
        }
        image
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn format_reserves_well_known_sectors() {
        let mut fs = formatted();
        let free_map = fs.fetch_free_map().unwrap();

        assert!(free_map.test(FREE_MAP_SECTOR as usize));
        assert!(free_map.test(DIRECTORY_SECTOR as usize));
        // One sector of bitmap, three of directory.
        assert_eq!(free_map.num_clear(), DISK_SECTORS - 2 - 1 - 3);
        assert!(fs.list("/").unwrap().is_empty());
    }

    #[test]
    fn create_open_remove_scenario() {
        let mut fs = formatted();
        let free_before = fs.free_sectors().unwrap();

        fs.create("/a.txt", 200).unwrap();
        let file = fs.open("/a.txt").unwrap();
        assert_eq!(file.length(), 200);
        // Header plus two data sectors.
        assert_eq!(fs.free_sectors().unwrap(), free_before - 3);

        fs.remove("/a.txt").unwrap();
        assert!(matches!(fs.open("/a.txt"), Err(FsError::NotFound(_))));
        assert_eq!(fs.free_sectors().unwrap(), free_before);
    }

    #[test]
    fn creating_an_existing_name_changes_nothing_on_disk() {
        let mut fs = formatted();
        fs.create("/a.txt", 200).unwrap();
        let before = disk_image(&mut fs);

        match fs.create("/a.txt", 500).unwrap_err() {
            FsError::AlreadyExists(path) => assert_eq!(path, "/a.txt"),
            e => panic!("unexpected error {:?}", e),
        }
        assert_eq!(disk_image(&mut fs), before);
        assert_eq!(fs.open("/a.txt").unwrap().length(), 200);
    }

    #[test]
    fn failed_creates_leave_bitmap_and_directory_alone() {
        let mut fs = formatted();
        let before = disk_image(&mut fs);

        assert!(matches!(
            fs.create("/huge", MAX_FILE_SIZE + 1),
            Err(FsError::FileTooLarge(_))
        ));
        assert!(matches!(
            fs.create("/big", 1000 * SECTOR_SIZE),
            Err(FsError::NoSpace)
        ));
        assert!(matches!(
            fs.create("/no/such/dir/f", 1),
            Err(FsError::NotFound(_))
        ));
        assert_eq!(disk_image(&mut fs), before);
    }

    #[test]
    fn full_directory_rejects_another_file() {
        let mut fs = formatted();
        for i in 0..NUM_DIR_ENTRIES {
            fs.create(&format!("/f{}", i), 10).unwrap();
        }
        let before = disk_image(&mut fs);

        assert!(matches!(
            fs.create("/one-more", 10),
            Err(FsError::DirectoryFull)
        ));
        assert_eq!(disk_image(&mut fs), before);
    }

    #[test]
    fn subdirectory_scenario() {
        let mut fs = formatted();

        fs.make_new_dir("/sub").unwrap();
        fs.create("/sub/f", 50).unwrap();

        assert_eq!(names(&fs.list("/sub").unwrap()), vec!["f"]);
        let root = fs.list("/").unwrap();
        assert_eq!(names(&root), vec!["sub"]);
        assert_eq!(root[0].kind(), EntryKind::Directory);
        assert_eq!(fs.open("/sub/f").unwrap().length(), 50);
    }

    #[test]
    fn nested_directories_resolve_component_by_component() {
        let mut fs = formatted();
        fs.make_new_dir("/a").unwrap();
        fs.make_new_dir("/a/b").unwrap();
        fs.create("/a/b/c.txt", 300).unwrap();
        fs.create("/a/top", 1).unwrap();

        assert_eq!(fs.open("/a/b/c.txt").unwrap().length(), 300);
        // Names are scoped to their directory.
        fs.create("/c.txt", 5).unwrap();
        assert_eq!(fs.open("/c.txt").unwrap().length(), 5);

        let tree: Vec<(usize, String)> = fs
            .list_recursive("/")
            .unwrap()
            .into_iter()
            .map(|(depth, e)| (depth, e.name().to_string()))
            .collect();
        assert_eq!(
            tree,
            vec![
                (0, "a".to_string()),
                (1, "b".to_string()),
                (2, "c.txt".to_string()),
                (1, "top".to_string()),
                (0, "c.txt".to_string())
            ]
        );

        let listing: Vec<(usize, String)> = fs
            .list_recursive("/a")
            .unwrap()
            .into_iter()
            .map(|(depth, e)| (depth, e.name().to_string()))
            .collect();
        assert_eq!(
            listing,
            vec![
                (0, "b".to_string()),
                (1, "c.txt".to_string()),
                (0, "top".to_string())
            ]
        );
    }

    #[test]
    fn walking_through_a_file_is_not_a_directory() {
        let mut fs = formatted();
        fs.create("/plain", 10).unwrap();

        assert!(matches!(
            fs.create("/plain/inner", 10),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(fs.list("/plain"), Err(FsError::NotADirectory(_))));
    }

    #[test]
    fn make_new_dir_requires_absolute_path() {
        let mut fs = formatted();
        assert!(matches!(
            fs.make_new_dir("sub"),
            Err(FsError::InvalidPath(_))
        ));
        assert!(fs.list("/").unwrap().is_empty());
    }

    #[test]
    fn paths_must_name_an_entry_without_dot_components() {
        let mut fs = formatted();
        assert!(matches!(fs.create("/", 1), Err(FsError::InvalidPath(_))));
        assert!(matches!(fs.remove("/"), Err(FsError::InvalidPath(_))));
        assert!(matches!(
            fs.open("/a/../b"),
            Err(FsError::InvalidPath(_))
        ));
    }

    #[test]
    fn split_path_skips_empty_components() {
        assert_eq!(split_path("/a//b/").unwrap(), vec!["a", "b"]);
        assert_eq!(split_path("a/b").unwrap(), vec!["a", "b"]);
        assert!(split_path("/").unwrap().is_empty());
    }

    #[test]
    fn remove_releases_every_tier() {
        let mut fs = formatted();
        let free_before = fs.free_sectors().unwrap();

        fs.create("/large", 100 * SECTOR_SIZE).unwrap();
        assert!(fs.free_sectors().unwrap() < free_before - 100);
        fs.remove("/large").unwrap();

        assert_eq!(fs.free_sectors().unwrap(), free_before);
    }

    #[test]
    fn only_empty_directories_can_be_removed() {
        let mut fs = formatted();
        fs.make_new_dir("/sub").unwrap();
        fs.create("/sub/f", 10).unwrap();

        assert!(matches!(
            fs.remove("/sub"),
            Err(FsError::DirectoryNotEmpty(_))
        ));
        fs.remove("/sub/f").unwrap();
        fs.remove("/sub").unwrap();
        assert!(fs.list("/").unwrap().is_empty());
        assert!(matches!(fs.remove("/sub"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn reused_sectors_start_as_an_empty_directory() {
        let mut fs = formatted();
        // Dirty some sectors, free them, and let a directory pick them up.
        fs.create("/junk", 4 * SECTOR_SIZE).unwrap();
        let id = fs.open_a_file("/junk").unwrap();
        fs.write_a_file(id, &[0xff; 4 * SECTOR_SIZE]).unwrap();
        fs.close_a_file(id).unwrap();
        fs.remove("/junk").unwrap();

        fs.make_new_dir("/fresh").unwrap();
        assert!(fs.list("/fresh").unwrap().is_empty());
    }

    #[test]
    fn open_table_reads_and_writes_through_ids() {
        let mut fs = formatted();
        fs.create("/a.txt", 200).unwrap();

        let id = fs.open_a_file("/a.txt").unwrap();
        assert_eq!(fs.write_a_file(id, b"hello, sectors").unwrap(), 14);
        fs.close_a_file(id).unwrap();

        let id = fs.open_a_file("/a.txt").unwrap();
        let mut buf = [0; 14];
        assert_eq!(fs.read_a_file(id, &mut buf).unwrap(), 14);
        assert_eq!(&buf, b"hello, sectors");
        assert_eq!(fs.handle(id).unwrap().position(), 14);
    }

    #[test]
    fn unknown_ids_transfer_nothing() {
        let mut fs = formatted();
        let mut buf = [0; 8];

        assert_eq!(fs.read_a_file(42, &mut buf).unwrap(), 0);
        assert_eq!(fs.write_a_file(42, &buf).unwrap(), 0);
        assert!(matches!(
            fs.close_a_file(42),
            Err(FsError::InvalidHandle(42))
        ));
    }

    #[test]
    fn open_ids_are_distinct_and_positive() {
        let mut fs = formatted();
        fs.create("/a.txt", 10).unwrap();

        let ids: HashSet<OpenFileId> = (0..64)
            .map(|_| fs.open_a_file("/a.txt").unwrap())
            .collect();
        assert_eq!(ids.len(), 64);
        assert!(ids.iter().all(|&id| id > 0));

        let closed = *ids.iter().next().unwrap();
        fs.close_a_file(closed).unwrap();
        assert!(fs.handle(closed).is_none());
        assert!(matches!(
            fs.close_a_file(closed),
            Err(FsError::InvalidHandle(_))
        ));
    }

    #[test]
    fn removed_files_drop_their_open_ids() {
        let mut fs = formatted();
        fs.create("/old", 2 * SECTOR_SIZE).unwrap();
        fs.create("/keep", 10).unwrap();
        let stale = fs.open_a_file("/old").unwrap();
        let kept = fs.open_a_file("/keep").unwrap();

        fs.remove("/old").unwrap();
        // The new file takes over the released sectors.
        fs.create("/new", 2 * SECTOR_SIZE).unwrap();
        let new = fs.open_a_file("/new").unwrap();
        fs.write_a_file(new, &[0x5a; 2 * SECTOR_SIZE]).unwrap();

        assert!(fs.handle(stale).is_none());
        assert_eq!(fs.write_a_file(stale, &[0xff; 16]).unwrap(), 0);
        assert!(matches!(
            fs.close_a_file(stale),
            Err(FsError::InvalidHandle(_))
        ));
        assert!(fs.handle(kept).is_some());

        fs.close_a_file(new).unwrap();
        let new = fs.open_a_file("/new").unwrap();
        let mut back = [0; 2 * SECTOR_SIZE];
        fs.read_a_file(new, &mut back).unwrap();
        assert!(back.iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn names_with_nul_bytes_cannot_shadow_entries() {
        let mut fs = formatted();
        fs.create("/a", 10).unwrap();
        let before = disk_image(&mut fs);

        assert!(matches!(
            fs.create("/a\0", 10),
            Err(FsError::InvalidPath(_))
        ));
        assert!(matches!(
            fs.make_new_dir("/a\0b"),
            Err(FsError::InvalidPath(_))
        ));
        assert_eq!(names(&fs.list("/").unwrap()), vec!["a"]);
        assert_eq!(disk_image(&mut fs), before);
    }

    #[test]
    fn huge_sizes_are_too_large_not_a_panic() {
        let mut fs = formatted();
        let before = disk_image(&mut fs);

        assert!(matches!(
            fs.create("/x", usize::MAX),
            Err(FsError::FileTooLarge(_))
        ));
        assert!(matches!(
            fs.create("/x", MAX_FILE_SIZE + 1),
            Err(FsError::FileTooLarge(_))
        ));
        assert!(fs.list("/").unwrap().is_empty());
        assert_eq!(disk_image(&mut fs), before);
    }

    #[test]
    fn opening_a_missing_file_records_nothing() {
        let mut fs = formatted();
        assert!(matches!(
            fs.open_a_file("/missing"),
            Err(FsError::NotFound(_))
        ));
        assert!(fs.opened.is_empty());
    }

    #[test]
    fn print_dumps_headers_bitmap_and_entries() {
        let mut fs = formatted();
        fs.create("/a.txt", 5).unwrap();
        let id = fs.open_a_file("/a.txt").unwrap();
        fs.write_a_file(id, b"abcde").unwrap();

        let mut out = Vec::new();
        fs.print(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Bit map file header:"));
        assert!(out.contains("Directory file header:"));
        assert!(out.contains("Bitmap set:\n0, 1, "));
        assert!(out.contains("Name: a.txt"));
        assert!(out.contains("abcde"));
    }
}
