use core::fmt;
use core::ops::Add;

use binrw::binrw;
use derive_more::{From, Into};

use crate::volume::FAT_ENTRIES;

/// 块编号，同时也是分配表中的条目值。
///
/// 条目值有三类：[`BlockId::FREE`]、[`BlockId::EOF`]以及下一个块的编号。
#[binrw]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct BlockId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// 未分配
    Free,
    /// 链表末尾
    Eof,
    /// 超出分配表容量
    OutOfRange,
}

impl Add<u32> for BlockId {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.wrapping_add(rhs))
    }
}

impl From<BlockId> for usize {
    fn from(id: BlockId) -> Self {
        id.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FREE => f.write_str("FREE"),
            Self::EOF => f.write_str("EOF"),
            Self(raw) => write!(f, "#{raw}"),
        }
    }
}

impl BlockId {
    pub const FREE: Self = Self(0);

    /// 最小的可分配块号，0号块格式化后永久保留
    pub const MIN: Self = Self(1);

    pub const EOF: Self = Self(u32::MAX);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// 判断`self`能否作为一个数据块的编号。
    pub fn validate(self) -> Result<Self, BlockError> {
        match self {
            BlockId::FREE => Err(BlockError::Free),
            BlockId::EOF => Err(BlockError::Eof),
            id if usize::from(id) >= FAT_ENTRIES => Err(BlockError::OutOfRange),
            id => Ok(id),
        }
    }
}
