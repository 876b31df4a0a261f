use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use send_wrapper::SendWrapper;

use crate::BlockDevice;

/// 以宿主机文件为后端的磁盘镜像。
///
/// 只在创建它的线程上使用，文件句柄随值一同释放。
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
}

impl BlockFile {
    pub fn new(fd: File) -> Self {
        Self {
            inner: SendWrapper::new(RefCell::new(fd)),
        }
    }

    /// 以读写方式打开已存在的镜像。
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let fd = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(fd))
    }

    /// 创建（或截断）镜像，并将其长度设为`len`，新区域全部为零。
    pub fn create(path: impl AsRef<Path>, len: u64) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        fd.set_len(len)?;
        Ok(Self::new(fd))
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(self.inner.borrow().metadata()?.len())
    }
}

impl BlockDevice for BlockFile {
    fn read_region(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        log::trace!("read {} bytes at {offset:#x}", buf.len());
        Ok(())
    }

    fn write_region(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.flush()?;
        log::trace!("wrote {} bytes at {offset:#x}", buf.len());
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        self.inner.borrow().sync_data()
    }
}
