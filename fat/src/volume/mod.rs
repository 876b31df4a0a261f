//! 镜像的布局
//!
//! 分配表区 | 目录区 | 数据区
//!
//! 三个区域大小固定，由格式本身决定。

pub mod dir_entry;
pub mod fat;

/// 数据块大小，分配与读写文件内容的单位
pub const BLOCK_SIZE: usize = 512;

/// 分配表条目数，同时也是数据区的块数
pub const FAT_ENTRIES: usize = 4096;

/// 目录项个数
pub const DIR_ENTRIES: usize = 128;

/// 文件名字段的字节数，含结尾的NUL
pub const NAME_CAP: usize = 248;

pub const FAT_ENTRY_SIZE: usize = 4;

/// 名称 + 起始块 + 大小 + 属性
pub const DIR_ENTRY_SIZE: usize = NAME_CAP + 3 * 4;

pub const FAT_AREA_SIZE: usize = FAT_ENTRIES * FAT_ENTRY_SIZE;

pub const DIR_AREA_SIZE: usize = DIR_ENTRIES * DIR_ENTRY_SIZE;

/// 元数据（分配表 + 目录）的总字节数，也是数据区的起始偏移
pub const DATA_OFFSET: usize = FAT_AREA_SIZE + DIR_AREA_SIZE;

pub const DATA_SIZE: usize = FAT_ENTRIES * BLOCK_SIZE;

pub const IMAGE_SIZE: usize = DATA_OFFSET + DATA_SIZE;

/// 单个文件最多能占用的块数（0号块保留）
pub const MAX_FILE_BLOCKS: usize = FAT_ENTRIES - 1;

pub type DataBlock = [u8; BLOCK_SIZE];
