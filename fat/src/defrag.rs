use std::sync::Arc;

use block_dev::BlockDevice;

use crate::control::{block_offset, write_metadata};
use crate::volume::fat::FatArea;
use crate::volume::{BLOCK_SIZE, DataBlock, FAT_ENTRIES};
use crate::{BlockId, Error, FatFileSystem, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefragReport {
    pub files: usize,
    pub blocks: usize,
}

impl FatFileSystem {
    /// 将整理后的镜像写入`staging`，当前镜像只读不写。
    ///
    /// 按槽位顺序把每条链表搬到从1开始连续编号的块上，
    /// 编号跨文件递增；分配表从空表重建，目录项只改起始块。
    /// 提交（用`staging`替换原镜像）由调用方完成。
    pub fn defragment_into(&self, staging: &Arc<dyn BlockDevice>) -> Result<DefragReport> {
        let mut fat = FatArea::new();
        let mut dir = self.dir.clone();
        let mut report = DefragReport::default();

        let mut next = BlockId::MIN;
        let mut block: DataBlock = [0; BLOCK_SIZE];
        for (slot, dirent) in self.dir.occupied() {
            report.files += 1;

            let chain = self.fat.chain(dirent.first_block())?;
            if chain.is_empty() {
                continue;
            }
            if usize::from(next) + chain.len() > FAT_ENTRIES {
                return Err(Error::DiskFull {
                    needed: usize::from(next) + chain.len() - 1,
                    free: FAT_ENTRIES - 1,
                });
            }

            log::debug!("{:?}: {} -> {next}", dirent.name(), dirent.first_block());
            dir.get_mut(slot).set_first_block(next);

            let last = chain.len() - 1;
            for (i, old) in chain.into_iter().enumerate() {
                self.read_block(old, &mut block)?;
                staging.write_region(block_offset(next), &block)?;

                if i == last {
                    fat.terminate(next);
                } else {
                    fat.couple(next, next + 1);
                }
                next = next + 1;
                report.blocks += 1;
            }
        }

        write_metadata(staging.as_ref(), &fat, &dir)?;
        staging.sync()?;

        Ok(report)
    }
}
