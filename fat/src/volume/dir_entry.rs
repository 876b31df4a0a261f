//! 目录区，存放文件记录的定长数组。
//!
//! 名称首字节为NUL的槽位视为空闲。

use std::borrow::Cow;

use binrw::binrw;
use enumflags2::{BitFlags, bitflags};

use crate::volume::{DIR_ENTRIES, NAME_CAP};
use crate::{BlockId, Error, Result};

#[binrw]
#[brw(little)]
#[derive(Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// NUL结尾的文件名
    name: [u8; NAME_CAP],

    /// 块链表的起始块，空文件为[`BlockId::FREE`]
    first_block: BlockId,

    /// 文件的字节数
    file_size: u32,

    #[br(map = |raw: u32| BitFlags::from_bits_truncate(raw))]
    #[bw(map = |attr: &BitFlags<AttrFlag>| attr.bits())]
    attr: BitFlags<AttrFlag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[bitflags]
#[repr(u32)]
pub enum AttrFlag {
    /// 不出现在列表与搜索结果中
    Hidden = 0b0000_0001,
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            name: [0; NAME_CAP],
            first_block: BlockId::FREE,
            file_size: 0,
            attr: BitFlags::empty(),
        }
    }
}

impl core::fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirEntry")
            .field("name", &self.name())
            .field("first_block", &self.first_block)
            .field("file_size", &self.file_size)
            .field("attr", &self.attr)
            .finish()
    }
}

impl DirEntry {
    pub fn new(name: &str, first_block: BlockId, size: u32) -> Result<Self> {
        let mut dirent = Self {
            first_block,
            file_size: size,
            ..Default::default()
        };
        dirent.rename(name)?;
        Ok(dirent)
    }

    pub fn is_free(&self) -> bool {
        self.name[0] == b'\0'
    }

    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == b'\0')
            .unwrap_or(NAME_CAP);
        &self.name[..len]
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    pub fn first_block(&self) -> BlockId {
        self.first_block
    }

    pub fn set_first_block(&mut self, id: BlockId) {
        self.first_block = id;
    }

    pub const fn size(&self) -> usize {
        self.file_size as usize
    }

    pub fn resize(&mut self, size: usize) {
        self.file_size = size as u32;
    }

    pub fn is_hidden(&self) -> bool {
        self.attr.contains(AttrFlag::Hidden)
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.attr.set(AttrFlag::Hidden, hidden);
    }

    /// 重写名称字段，不足处补NUL。
    pub fn rename(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.name = [0; NAME_CAP];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(())
    }
}

/// 文件名必须非空、不含NUL，且留出结尾NUL的位置。
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "empty name"
    } else if name.contains('\0') {
        "contains NUL"
    } else if name.len() >= NAME_CAP {
        "too long"
    } else {
        return Ok(());
    };

    Err(Error::InvalidName {
        name: name.to_owned(),
        reason,
    })
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    #[br(count = DIR_ENTRIES)]
    entries: Vec<DirEntry>,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory {
    pub fn new() -> Self {
        Self {
            entries: vec![DirEntry::default(); DIR_ENTRIES],
        }
    }

    pub fn get(&self, slot: usize) -> &DirEntry {
        &self.entries[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut DirEntry {
        &mut self.entries[slot]
    }

    /// 按槽位顺序遍历已占用的目录项
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &DirEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, dirent)| !dirent.is_free())
    }

    /// 按名称查找，隐藏的目录项同样匹配。
    pub fn find(&self, name: &str) -> Option<usize> {
        self.occupied()
            .find_map(|(slot, dirent)| (dirent.name_bytes() == name.as_bytes()).then_some(slot))
    }

    /// 按名称查找未隐藏的目录项。
    pub fn find_visible(&self, name: &str) -> Option<usize> {
        self.occupied().find_map(|(slot, dirent)| {
            (!dirent.is_hidden() && dirent.name_bytes() == name.as_bytes()).then_some(slot)
        })
    }

    pub fn find_free(&self) -> Option<usize> {
        self.entries.iter().position(DirEntry::is_free)
    }

    pub fn insert(&mut self, slot: usize, dirent: DirEntry) {
        debug_assert!(self.entries[slot].is_free());
        self.entries[slot] = dirent;
    }

    /// 清空名称、起始块与大小。
    pub fn remove(&mut self, slot: usize) -> DirEntry {
        std::mem::take(&mut self.entries[slot])
    }

    /// 原地改名，新旧名称相同时报错。
    pub fn rename(&mut self, slot: usize, new_name: &str) -> Result<()> {
        let dirent = &mut self.entries[slot];
        if dirent.name_bytes() == new_name.as_bytes() {
            return Err(Error::NoOpRename(new_name.to_owned()));
        }
        dirent.rename(new_name)
    }

    pub fn set_hidden(&mut self, slot: usize, hidden: bool) {
        self.entries[slot].set_hidden(hidden);
    }
}
