//! 分配表区
//!
//! 每个块对应一个条目，条目的值是链表上下一个块的编号。
//! 条目以大端序存放：下一块编号在落盘时做一次32位字节序翻转，
//! 而`FREE`与`EOF`的各字节相同，翻转后保持不变。

use binrw::binrw;

use crate::volume::FAT_ENTRIES;
use crate::{BlockError, BlockId, Error, Result};

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatArea {
    #[br(count = FAT_ENTRIES)]
    entries: Vec<BlockId>,
}

impl Default for FatArea {
    fn default() -> Self {
        Self::new()
    }
}

impl FatArea {
    /// 空表：0号条目为[`BlockId::EOF`]，其余皆空闲。
    pub fn new() -> Self {
        let mut entries = vec![BlockId::FREE; FAT_ENTRIES];
        entries[0] = BlockId::EOF;
        Self { entries }
    }

    /// 0号条目是否仍为保留的链尾标记
    pub fn is_formatted(&self) -> bool {
        self.entries.len() == FAT_ENTRIES && self.entries[0] == BlockId::EOF
    }

    pub fn entries(&self) -> &[BlockId] {
        &self.entries
    }

    pub fn get(&self, id: BlockId) -> Option<BlockId> {
        self.entries.get(usize::from(id)).copied()
    }

    /// 从`start`开始线性搜索第一个空闲条目，跳过保留的0号条目。
    pub fn find_free(&self, start: BlockId) -> Option<BlockId> {
        let start = usize::from(start.max(BlockId::MIN));
        self.entries
            .iter()
            .skip(start)
            .position(|&id| id == BlockId::FREE)
            .map(|idx| BlockId::new((start + idx) as u32))
    }

    pub fn count_free(&self) -> usize {
        self.entries
            .iter()
            .skip(BlockId::MIN.into())
            .filter(|&&id| id == BlockId::FREE)
            .count()
    }

    /// 获取下一个块编号。
    /// 若`id`指向未分配的块，则报错。
    /// `Ok(None)`表示`id`为链表上最后一个块。
    pub fn next(&self, id: BlockId) -> core::result::Result<Option<BlockId>, BlockError> {
        let id = id.validate()?;
        match self.entries[usize::from(id)] {
            BlockId::FREE => Err(BlockError::Free),
            BlockId::EOF => Ok(None),
            next => next.validate().map(Some),
        }
    }

    /// 沿链表收集全部块编号。
    ///
    /// 起始为[`BlockId::FREE`]的是空文件，返回空链。
    /// 遍历长度以表容量为界，超出即视为成环。
    pub fn chain(&self, start: BlockId) -> Result<Vec<BlockId>> {
        let mut blocks = Vec::new();
        if start == BlockId::FREE {
            return Ok(blocks);
        }

        let corrupt = |reason| {
            log::error!("Corrupt chain from {start}: {reason:?}");
            Error::CorruptChain { start, reason }
        };

        let mut current = start.validate().map_err(corrupt)?;
        loop {
            if blocks.len() == FAT_ENTRIES {
                return Err(corrupt(BlockError::OutOfRange));
            }
            blocks.push(current);
            match self.next(current).map_err(corrupt)? {
                Some(next) => current = next,
                None => break,
            }
        }

        log::debug!("chain from {start}: {} blocks", blocks.len());
        Ok(blocks)
    }

    /// 将`id`标记为链尾，即占用该块。
    pub fn terminate(&mut self, id: BlockId) {
        debug_assert!(id.validate().is_ok());
        self.entries[usize::from(id)] = BlockId::EOF;
    }

    /// 使`prev`指向`next`。
    pub fn couple(&mut self, prev: BlockId, next: BlockId) {
        debug_assert!(prev.validate().is_ok() && next.validate().is_ok());
        self.entries[usize::from(prev)] = next;
    }

    /// 释放整个块链表，返回释放的块数。
    ///
    /// 先完整遍历一次，链表损坏时不会释放任何块。
    pub fn release(&mut self, start: BlockId) -> Result<usize> {
        let blocks = self.chain(start)?;
        for &id in &blocks {
            self.entries[usize::from(id)] = BlockId::FREE;
        }
        Ok(blocks.len())
    }
}
