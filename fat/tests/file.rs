mod common;

use std::fs::OpenOptions;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;

use block_dev::BlockDevice;
use common::*;
use fat::volume::{BLOCK_SIZE, FAT_ENTRIES, IMAGE_SIZE, MAX_FILE_BLOCKS};
use fat::{BlockError, BlockId, Error, FatFileSystem, image};

#[test]
fn round_trip() {
    let (disk, mut fs) = fresh();

    for (i, len) in [0, 1, 511, 512, 513, 600, 5 * BLOCK_SIZE].into_iter().enumerate() {
        let name = format!("f{len}");
        let data = pattern(len, i as u8);
        store(&mut fs, &name, &data);
        assert_eq!(data, retrieve(&fs, &name), "length {len}");
        assert_eq!(fs.stat(&name).unwrap().blocks(), chain_of(&fs, &name).len());
        assert_eq!(len.div_ceil(BLOCK_SIZE), chain_of(&fs, &name).len());
    }

    // 新的一次调用看到同样的内容
    let fs = reload(&disk);
    assert_eq!(pattern(513, 4), retrieve(&fs, "f513"));
}

#[test]
fn largest_file() {
    let (_, mut fs) = fresh();
    let data = pattern(MAX_FILE_BLOCKS * BLOCK_SIZE, 7);

    store(&mut fs, "big", &data);
    assert_eq!(0, fs.fat().count_free());
    assert_eq!(data, retrieve(&fs, "big"));
}

#[test]
fn empty_file_owns_no_blocks() {
    let (_, mut fs) = fresh();
    store(&mut fs, "empty", &[]);

    let info = fs.stat("empty").unwrap();
    assert_eq!(BlockId::FREE, info.first_block);
    assert_eq!(0, info.size);
    assert!(retrieve(&fs, "empty").is_empty());
    assert_eq!(FAT_ENTRIES - 1, fs.fat().count_free());

    fs.delete("empty").unwrap();
    assert!(fs.stat("empty").is_err());
}

#[test]
fn disk_full_allocates_nothing() {
    let (disk, mut fs) = fresh();
    store(&mut fs, "a", &pattern(BLOCK_SIZE, 0));
    let before = disk.snapshot();

    let data = pattern(MAX_FILE_BLOCKS * BLOCK_SIZE, 1);
    let err = fs.store("b", Cursor::new(&data)).unwrap_err();
    assert!(matches!(
        err,
        Error::DiskFull {
            needed: MAX_FILE_BLOCKS,
            free,
        } if free == MAX_FILE_BLOCKS - 1
    ));

    assert_eq!(before, disk.snapshot());
    assert!(fs.stat("b").is_err());
    assert_eq!(MAX_FILE_BLOCKS - 1, fs.fat().count_free());
}

#[test]
fn directory_full() {
    let (_, mut fs) = fresh();
    for i in 0..fat::volume::DIR_ENTRIES {
        store(&mut fs, &format!("f{i}"), b"x");
    }

    let err = fs.store("one-more", Cursor::new(b"x")).unwrap_err();
    assert!(matches!(err, Error::DirectoryFull));
}

#[test]
fn freed_blocks_are_reused_lowest_first() {
    let (_, mut fs) = fresh();
    store(&mut fs, "a.txt", &pattern(600, 0));
    store(&mut fs, "b.txt", &pattern(100, 1));

    let a_blocks = chain_of(&fs, "a.txt");
    assert_eq!(vec![BlockId::new(1), BlockId::new(2)], a_blocks);
    assert_eq!(vec![BlockId::new(3)], chain_of(&fs, "b.txt"));

    fs.delete("a.txt").unwrap();
    store(&mut fs, "c.txt", &pattern(50, 2));

    let c_first = fs.stat("c.txt").unwrap().first_block;
    assert!(a_blocks.contains(&c_first));
    assert_eq!(BlockId::new(1), c_first);
}

#[test]
fn free_space_is_conserved() {
    let (disk, mut fs) = fresh();
    let sizes = [1500, 20, 0, 4096, 513, 77, 9000];
    for (i, len) in sizes.into_iter().enumerate() {
        store(&mut fs, &format!("f{i}"), &pattern(len, i as u8));
    }
    for i in [1, 3, 5] {
        fs.delete(&format!("f{i}")).unwrap();
    }
    store(&mut fs, "late", &pattern(3000, 9));

    let fs = reload(&disk);
    let reachable: usize = fs
        .dir()
        .occupied()
        .map(|(_, dirent)| fs.fat().chain(dirent.first_block()).unwrap().len())
        .sum();
    assert_eq!(FAT_ENTRIES - 1, fs.fat().count_free() + reachable);

    let usage = fs.usage();
    assert_eq!(reachable, usage.used_blocks);
    assert_eq!(5, usage.used_slots);
}

#[test]
fn delete_leaves_no_dangling_entry() {
    let (disk, mut fs) = fresh();
    store(&mut fs, "a", &pattern(1200, 0));
    let first = fs.stat("a").unwrap().first_block;

    fs.delete("a").unwrap();

    let fs = reload(&disk);
    assert!(fs.dir().occupied().all(|(_, d)| d.first_block() != first));
    assert_eq!(Some(BlockId::FREE), fs.fat().get(first));
    assert_eq!(FAT_ENTRIES - 1, fs.fat().count_free());
}

#[test]
fn missing_names() {
    let (_, mut fs) = fresh();

    assert!(matches!(fs.delete("nope"), Err(Error::NotFound(name)) if name == "nope"));
    assert!(matches!(
        fs.retrieve("nope", Vec::new()),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn same_name_twice_creates_two_entries() {
    let (_, mut fs) = fresh();
    store(&mut fs, "dup", b"first");
    store(&mut fs, "dup", b"second");

    assert_eq!(2, fs.list().len());
    // 查找总是命中槽位靠前的那一个
    assert_eq!(b"first".to_vec(), retrieve(&fs, "dup"));
}

#[test]
fn invalid_names() {
    let (_, mut fs) = fresh();
    assert!(matches!(
        fs.store("", Cursor::new(b"x")),
        Err(Error::InvalidName { .. })
    ));
    assert!(matches!(
        fs.store(&"n".repeat(300), Cursor::new(b"x")),
        Err(Error::InvalidName { .. })
    ));
}

#[test]
fn unformatted_image_is_rejected() {
    let dev: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(IMAGE_SIZE));
    assert!(matches!(
        FatFileSystem::load(&dev),
        Err(Error::NotFormatted)
    ));
}

#[test]
fn cyclic_chain_is_reported() {
    let (disk, mut fs) = fresh();
    store(&mut fs, "loop", &pattern(3 * BLOCK_SIZE, 0));
    assert_eq!(
        vec![BlockId::new(1), BlockId::new(2), BlockId::new(3)],
        chain_of(&fs, "loop")
    );

    // 3号条目指回1号
    disk.poke(3 * 4, &1u32.to_be_bytes());

    let mut fs = reload(&disk);
    assert!(matches!(
        fs.retrieve("loop", Vec::new()),
        Err(Error::CorruptChain {
            reason: BlockError::OutOfRange,
            ..
        })
    ));
    assert!(matches!(fs.delete("loop"), Err(Error::CorruptChain { .. })));
    // 删除失败时目录项与分配表都保持原样
    assert!(fs.stat("loop").is_ok());
    assert_eq!(FAT_ENTRIES - 4, fs.fat().count_free());
}

#[test]
fn short_chain_truncates_output() {
    let (disk, mut fs) = fresh();
    let data = pattern(2 * BLOCK_SIZE, 3);
    store(&mut fs, "short", &data);

    // 1号条目提前结束链表
    disk.poke(4, &u32::MAX.to_be_bytes());

    let fs = reload(&disk);
    let mut out = Vec::new();
    assert_eq!(BLOCK_SIZE as u64, fs.retrieve("short", &mut out).unwrap());
    assert_eq!(&data[..BLOCK_SIZE], out.as_slice());
}

#[test]
fn failed_store_leaves_no_allocated_blocks() {
    // 3个数据块的写入依次为第0、1、2次，元数据为第3次
    for fail_at in [0, 2, 3] {
        let (disk, _) = fresh();
        let mut fs = load_flaky(&disk, fail_at);

        let err = fs.store("a", Cursor::new(pattern(1500, 0))).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "fail_at {fail_at}");
        assert!(fs.stat("a").is_err());
        assert_eq!(FAT_ENTRIES - 1, fs.fat().count_free());

        // 同一个句柄上的下一次修改不会把半截链表带到镜像里
        store(&mut fs, "b", &pattern(10, 1));
        let reloaded = reload(&disk);
        assert_conserved(&reloaded);
        assert_eq!(fs.fat(), reloaded.fat());
        assert_eq!(vec![BlockId::MIN], chain_of(&reloaded, "b"));
        assert_eq!(FAT_ENTRIES - 2, reloaded.fat().count_free());
    }
}

#[test]
fn failed_delete_keeps_the_file() {
    let (disk, mut fs) = fresh();
    store(&mut fs, "a", &pattern(700, 0));
    let before = fs.fat().clone();

    let mut fs = load_flaky(&disk, 0);
    assert!(matches!(fs.delete("a"), Err(Error::Io(_))));
    assert_eq!(&before, fs.fat());
    assert_eq!(pattern(700, 0), retrieve(&fs, "a"));

    fs.delete("a").unwrap();
    assert_conserved(&reload(&disk));
}

#[test]
fn read_of_corrupt_file_creates_no_destination() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.img");
    let mut fs = image::format(&path).unwrap();
    store(&mut fs, "loop", &pattern(3 * BLOCK_SIZE, 0));
    drop(fs);

    // 3号条目指回1号
    let mut img = OpenOptions::new().write(true).open(&path).unwrap();
    img.seek(SeekFrom::Start(3 * 4)).unwrap();
    img.write_all(&1u32.to_be_bytes()).unwrap();
    drop(img);

    let fs = image::open(&path).unwrap();
    let dest = dir.path().join("out.bin");
    assert!(matches!(
        image::read_file(&fs, "loop", &dest),
        Err(Error::CorruptChain { .. })
    ));
    assert!(!dest.exists());
}
