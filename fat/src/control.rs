use std::io::Cursor;
use std::sync::Arc;

use binrw::{BinRead, BinWrite};
use block_dev::BlockDevice;
use typed_bytesize::ByteSizeIec;

use crate::volume::dir_entry::Directory;
use crate::volume::fat::FatArea;
use crate::volume::{BLOCK_SIZE, DATA_OFFSET, DATA_SIZE, DIR_ENTRIES, DataBlock, IMAGE_SIZE};
use crate::{BlockId, Error, Result};

/// 一次操作所需的全部状态：镜像句柄与读入内存的两块元数据。
///
/// 操作之间不保留会话，每个修改操作结束前都把两块元数据整体写回。
#[derive(Debug)]
pub struct FatFileSystem {
    dev: Arc<dyn BlockDevice>,
    pub(crate) fat: FatArea,
    pub(crate) dir: Directory,
}

/// 空间占用概况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub free_blocks: usize,
    pub used_blocks: usize,
    pub used_slots: usize,
    pub free_slots: usize,
}

impl FatFileSystem {
    /// 写入空的分配表与目录，并清零数据区。
    pub fn format(dev: &Arc<dyn BlockDevice>) -> Result<Self> {
        let fs = Self {
            dev: Arc::clone(dev),
            fat: FatArea::new(),
            dir: Directory::new(),
        };

        fs.dev.write_region(DATA_OFFSET as u64, &vec![0; DATA_SIZE])?;
        fs.flush()?;

        log::info!("Disk formatted: {}", ByteSizeIec(IMAGE_SIZE as u64));
        Ok(fs)
    }

    /// 读入分配表与目录。
    pub fn load(dev: &Arc<dyn BlockDevice>) -> Result<Self> {
        let mut buf = vec![0; DATA_OFFSET];
        dev.read_region(0, &mut buf)?;

        let mut cursor = Cursor::new(buf);
        let fat = FatArea::read(&mut cursor)?;
        let dir = Directory::read(&mut cursor)?;

        if !fat.is_formatted() {
            return Err(Error::NotFormatted);
        }

        let fs = Self {
            dev: Arc::clone(dev),
            fat,
            dir,
        };
        log::debug!("loaded image: {:?}", fs.usage());
        Ok(fs)
    }

    pub fn fat(&self) -> &FatArea {
        &self.fat
    }

    pub fn dir(&self) -> &Directory {
        &self.dir
    }

    pub fn usage(&self) -> Usage {
        let free_blocks = self.fat.count_free();
        let used_slots = self.dir.occupied().count();
        Usage {
            free_blocks,
            used_blocks: self.fat.entries().len() - 1 - free_blocks,
            used_slots,
            free_slots: DIR_ENTRIES - used_slots,
        }
    }
}

impl FatFileSystem {
    /// 两块元数据在镜像中相邻，序列化后一次写回。
    pub(crate) fn flush(&self) -> Result<()> {
        write_metadata(self.dev.as_ref(), &self.fat, &self.dir)?;
        self.dev.sync()?;
        Ok(())
    }

    /// 执行一个修改操作，失败时把内存中的分配表与目录恢复到操作之前。
    ///
    /// 元数据只在`op`末尾的`flush`中落盘，所以恢复后内存与镜像一致。
    pub(crate) fn with_rollback<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let fat = self.fat.clone();
        let dir = self.dir.clone();

        let result = op(self);
        if let Err(e) = &result {
            log::warn!("Rolling back in-memory metadata: {e}");
            self.fat = fat;
            self.dir = dir;
        }
        result
    }

    pub(crate) fn read_block(&self, id: BlockId, buf: &mut DataBlock) -> Result<()> {
        self.dev.read_region(block_offset(id), buf)?;
        Ok(())
    }

    pub(crate) fn write_block(&self, id: BlockId, buf: &DataBlock) -> Result<()> {
        self.dev.write_region(block_offset(id), buf)?;
        Ok(())
    }

    /// 分配一个块并接到`prev`之后；`prev`为`None`时分配链表的首块。
    ///
    /// 新块立即标记为链尾，所以随后的搜索不会再次返回它。
    pub(crate) fn alloc_after(&mut self, prev: Option<BlockId>) -> Result<BlockId> {
        let start = prev.map_or(BlockId::MIN, |prev| prev + 1);
        let id = self
            .fat
            .find_free(start)
            .or_else(|| self.fat.find_free(BlockId::MIN))
            .ok_or(Error::DiskFull {
                needed: 1,
                free: 0,
            })?;

        self.fat.terminate(id);
        if let Some(prev) = prev {
            self.fat.couple(prev, id);
        }
        log::trace!("alloc {id} after {prev:?}");
        Ok(id)
    }

    /// 按名称查找目录项（含隐藏项）。
    pub(crate) fn lookup(&self, name: &str) -> Result<usize> {
        self.dir
            .find(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))
    }
}

pub(crate) fn block_offset(id: BlockId) -> u64 {
    (DATA_OFFSET + usize::from(id) * BLOCK_SIZE) as u64
}

pub(crate) fn write_metadata(dev: &dyn BlockDevice, fat: &FatArea, dir: &Directory) -> Result<()> {
    let mut cursor = Cursor::new(Vec::with_capacity(DATA_OFFSET));
    fat.write(&mut cursor)?;
    dir.write(&mut cursor)?;
    let buf = cursor.into_inner();
    debug_assert_eq!(DATA_OFFSET, buf.len());

    dev.write_region(0, &buf)?;
    Ok(())
}
