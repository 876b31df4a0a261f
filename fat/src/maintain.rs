//! 只涉及目录的维护操作，以及复制。

use crate::file::FileInfo;
use crate::volume::dir_entry::{DirEntry, validate_name};
use crate::volume::{BLOCK_SIZE, DataBlock};
use crate::{BlockId, Error, FatFileSystem, Result};

impl FatFileSystem {
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let slot = self.lookup(old_name)?;
        self.with_rollback(|fs| {
            fs.dir.rename(slot, new_name)?;
            fs.flush()
        })?;

        log::info!("The name of the file {old_name} is changed to {new_name}");
        Ok(())
    }

    /// 复制文件，返回副本的名称（`<name>_copy`）。
    ///
    /// 副本拥有自己的块链表，两个目录项之间不共享数据块。
    pub fn duplicate(&mut self, name: &str) -> Result<String> {
        let slot = self.lookup(name)?;
        let src = self.dir.get(slot).clone();

        let copy_name = format!("{}_copy", src.name());
        validate_name(&copy_name)?;
        let copy_slot = self.dir.find_free().ok_or(Error::DirectoryFull)?;

        let chain = self.fat.chain(src.first_block())?;
        let free = self.fat.count_free();
        if free < chain.len() {
            return Err(Error::DiskFull {
                needed: chain.len(),
                free,
            });
        }

        let mut copy = DirEntry::new(&copy_name, BlockId::FREE, src.size() as u32)?;
        self.with_rollback(|fs| {
            let mut prev = None;
            let mut block: DataBlock = [0; BLOCK_SIZE];
            for old in chain {
                fs.read_block(old, &mut block)?;
                let id = fs.alloc_after(prev)?;
                if prev.is_none() {
                    copy.set_first_block(id);
                }
                fs.write_block(id, &block)?;
                prev = Some(id);
            }

            fs.dir.insert(copy_slot, copy);
            fs.flush()
        })?;

        log::info!("File: {name} duplicated as {copy_name}");
        Ok(copy_name)
    }

    /// 重复隐藏不会报错，也不会产生其它影响。
    pub fn hide(&mut self, name: &str) -> Result<()> {
        self.set_hidden(name, true)
    }

    pub fn unhide(&mut self, name: &str) -> Result<()> {
        self.set_hidden(name, false)
    }

    /// 只在未隐藏的文件中搜索
    pub fn search(&self, name: &str) -> bool {
        self.dir.find_visible(name).is_some()
    }

    /// 按槽位顺序列出未隐藏的文件
    pub fn list(&self) -> Vec<FileInfo> {
        self.dir
            .occupied()
            .filter(|(_, dirent)| !dirent.is_hidden())
            .map(|(slot, dirent)| FileInfo::new(slot, dirent))
            .collect()
    }

    /// 按大小升序列出未隐藏的文件，大小相同的保持槽位顺序。
    ///
    /// 排序结果不写回镜像。
    pub fn list_by_size(&self) -> Vec<FileInfo> {
        let mut files = self.list();
        files.sort_by_key(|info| info.size);
        files
    }

    fn set_hidden(&mut self, name: &str, hidden: bool) -> Result<()> {
        let slot = self.lookup(name)?;
        if self.dir.get(slot).is_hidden() == hidden {
            log::debug!("{name:?} already has hidden={hidden}");
            return Ok(());
        }
        self.with_rollback(|fs| {
            fs.dir.set_hidden(slot, hidden);
            fs.flush()
        })?;

        log::info!("File: {name} hidden={hidden}");
        Ok(())
    }
}
