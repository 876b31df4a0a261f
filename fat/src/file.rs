//! 文件内容的写入、读出与删除

use std::io::{self, ErrorKind, Read, Seek, Write};

use crate::volume::dir_entry::{DirEntry, validate_name};
use crate::volume::{BLOCK_SIZE, DataBlock};
use crate::{BlockId, Error, FatFileSystem, Result};

/// 目录项的只读视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub slot: usize,
    pub name: String,
    pub first_block: BlockId,
    pub size: usize,
    pub hidden: bool,
}

impl FileInfo {
    pub(crate) fn new(slot: usize, dirent: &DirEntry) -> Self {
        Self {
            slot,
            name: dirent.name().into_owned(),
            first_block: dirent.first_block(),
            size: dirent.size(),
            hidden: dirent.is_hidden(),
        }
    }

    pub fn blocks(&self) -> usize {
        self.size.div_ceil(BLOCK_SIZE)
    }
}

impl FatFileSystem {
    /// 写入文件，返回其目录槽位。
    ///
    /// 先完整扫描一遍数据源得到大小，空间不足时不分配任何块；
    /// 再回到开头逐块写入。同名文件不做特殊处理。
    pub fn store<R: Read + Seek>(&mut self, name: &str, mut src: R) -> Result<usize> {
        validate_name(name)?;
        let slot = self.dir.find_free().ok_or(Error::DirectoryFull)?;

        let size = io::copy(&mut src, &mut io::sink())?;
        src.rewind()?;

        let needed = size.div_ceil(BLOCK_SIZE as u64) as usize;
        let free = self.fat.count_free();
        if free < needed {
            return Err(Error::DiskFull { needed, free });
        }
        log::debug!("store {name:?}: {size} bytes in {needed} blocks into slot {slot}");

        self.with_rollback(|fs| {
            let mut dirent = DirEntry::new(name, BlockId::FREE, 0)?;
            let mut prev = None;
            let mut block: DataBlock = [0; BLOCK_SIZE];
            for _ in 0..needed {
                let len = read_chunk(&mut src, &mut block)?;
                if len == 0 {
                    // 数据源在两次扫描之间变短了
                    log::warn!("{name:?} shrank while being stored");
                    break;
                }
                block[len..].fill(0);

                let id = fs.alloc_after(prev)?;
                if prev.is_none() {
                    dirent.set_first_block(id);
                }
                fs.write_block(id, &block)?;
                dirent.resize(dirent.size() + len);
                prev = Some(id);
            }

            fs.dir.insert(slot, dirent);
            fs.flush()
        })?;

        log::info!("File: {name} written to disk");
        Ok(slot)
    }

    /// 读出文件内容，返回写出的字节数。
    ///
    /// 链表比记录的大小短时，输出被静默截断。
    pub fn retrieve<W: Write>(&self, name: &str, mut dst: W) -> Result<u64> {
        let slot = self.lookup(name)?;
        let dirent = self.dir.get(slot);

        let mut remaining = dirent.size();
        let mut block: DataBlock = [0; BLOCK_SIZE];
        for id in self.fat.chain(dirent.first_block())? {
            if remaining == 0 {
                break;
            }
            self.read_block(id, &mut block)?;
            let len = remaining.min(BLOCK_SIZE);
            dst.write_all(&block[..len])?;
            remaining -= len;
        }
        dst.flush()?;

        if remaining > 0 {
            log::warn!("{name:?} is {remaining} bytes short of its recorded size");
        }
        Ok((dirent.size() - remaining) as u64)
    }

    /// 删除文件：释放整条链表，再清空目录项。
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let slot = self.lookup(name)?;
        let freed = self.with_rollback(|fs| {
            let freed = fs.fat.release(fs.dir.get(slot).first_block())?;
            fs.dir.remove(slot);
            fs.flush()?;
            Ok(freed)
        })?;

        log::info!("File deleted: {name} ({freed} blocks freed)");
        Ok(())
    }

    pub fn stat(&self, name: &str) -> Result<FileInfo> {
        let slot = self.lookup(name)?;
        Ok(FileInfo::new(slot, self.dir.get(slot)))
    }
}

/// 尽量读满一个块，只有到达末尾才会返回不足一块的长度。
fn read_chunk<R: Read>(src: &mut R, buf: &mut DataBlock) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
