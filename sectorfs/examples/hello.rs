use sectorfs::{self, FileSystem};

pub fn main() {
    let tmp = tempfile::tempfile().unwrap();
    let dev = sectorfs::io::FileBlockEmulatorBuilder::from(tmp)
        .with_sector_count(1024)
        .build()
        .expect("Could not initialize disk emulator.");

    // format a new file system on the device and write a greeting
    let mut fs = FileSystem::format(dev).expect("should format");
    fs.make_new_dir("/home").unwrap();
    fs.create("/home/hello.txt", 13).unwrap();
    let id = fs.open_a_file("/home/hello.txt").unwrap();
    fs.write_a_file(id, b"hello, world\n").unwrap();
    fs.close_a_file(id).unwrap();

    fs.print(&mut std::io::stdout()).unwrap();
}
