//! Common utilities for tests
#![allow(dead_code)]

use std::io::{self, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use block_dev::BlockDevice;
use fat::volume::{FAT_ENTRIES, IMAGE_SIZE};
use fat::{BlockId, FatFileSystem};

/// 内存中的镜像，克隆出的句柄共享同一份数据。
#[derive(Debug, Clone)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl RamDisk {
    pub fn new(len: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vec![0; len])),
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }

    /// 绕过文件系统直接改写字节，用来制造损坏的镜像。
    pub fn poke(&self, offset: usize, bytes: &[u8]) {
        self.inner.lock().unwrap()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl BlockDevice for RamDisk {
    fn read_region(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let data = self.inner.lock().unwrap();
        let start = offset as usize;
        let src = data
            .get(start..start + buf.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_region(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut data = self.inner.lock().unwrap();
        let start = offset as usize;
        let dst = data
            .get_mut(start..start + buf.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::WriteZero))?;
        dst.copy_from_slice(buf);
        Ok(())
    }
}

/// 写入若干次之后开始失败，模拟中途被打断的暂存镜像。
#[derive(Debug)]
pub struct FailingDisk {
    disk: RamDisk,
    writes_left: AtomicUsize,
}

impl FailingDisk {
    pub fn new(writes: usize) -> Self {
        Self {
            disk: RamDisk::new(IMAGE_SIZE),
            writes_left: AtomicUsize::new(writes),
        }
    }
}

impl BlockDevice for FailingDisk {
    fn read_region(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.disk.read_region(offset, buf)
    }

    fn write_region(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let left = self.writes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(io::Error::other("injected write failure"));
        }
        self.writes_left.store(left - 1, Ordering::SeqCst);
        self.disk.write_region(offset, buf)
    }
}

/// 与另一个`RamDisk`共享数据，只让第`fail_at`次写入（从0计）失败一次。
#[derive(Debug)]
pub struct FlakyDisk {
    disk: RamDisk,
    fail_at: usize,
    writes: AtomicUsize,
}

impl FlakyDisk {
    pub fn new(disk: &RamDisk, fail_at: usize) -> Self {
        Self {
            disk: disk.clone(),
            fail_at,
            writes: AtomicUsize::new(0),
        }
    }
}

impl BlockDevice for FlakyDisk {
    fn read_region(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.disk.read_region(offset, buf)
    }

    fn write_region(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) == self.fail_at {
            return Err(io::Error::other("injected write failure"));
        }
        self.disk.write_region(offset, buf)
    }
}

/// 在`disk`上载入文件系统，写入经过`FlakyDisk`。
pub fn load_flaky(disk: &RamDisk, fail_at: usize) -> FatFileSystem {
    let dev: Arc<dyn BlockDevice> = Arc::new(FlakyDisk::new(disk, fail_at));
    FatFileSystem::load(&dev).unwrap()
}

/// 空闲块与所有链表上的块合起来恰好覆盖整个数据区（0号块除外）。
pub fn assert_conserved(fs: &FatFileSystem) {
    let reachable: usize = fs
        .dir()
        .occupied()
        .map(|(_, dirent)| fs.fat().chain(dirent.first_block()).unwrap().len())
        .sum();
    assert_eq!(FAT_ENTRIES - 1, fs.fat().count_free() + reachable);
}

/// 格式化一块新的内存镜像
pub fn fresh() -> (RamDisk, FatFileSystem) {
    let disk = RamDisk::new(IMAGE_SIZE);
    let dev: Arc<dyn BlockDevice> = Arc::new(disk.clone());
    let fs = FatFileSystem::format(&dev).unwrap();
    (disk, fs)
}

/// 重新从镜像载入，模拟一次新的调用
pub fn reload(disk: &RamDisk) -> FatFileSystem {
    let dev: Arc<dyn BlockDevice> = Arc::new(disk.clone());
    FatFileSystem::load(&dev).unwrap()
}

/// 可区分位置的测试数据
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

pub fn store(fs: &mut FatFileSystem, name: &str, data: &[u8]) -> usize {
    fs.store(name, Cursor::new(data)).unwrap()
}

pub fn retrieve(fs: &FatFileSystem, name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    fs.retrieve(name, &mut out).unwrap();
    out
}

pub fn chain_of(fs: &FatFileSystem, name: &str) -> Vec<BlockId> {
    let info = fs.stat(name).unwrap();
    fs.fat().chain(info.first_block).unwrap()
}
