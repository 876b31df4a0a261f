//! 存放在单个镜像文件中的FAT式文件系统
//!
//! ## 分层（自下而上）
//!
//! 1. 镜像访问层：[`block_dev::BlockDevice`]
//! 2. 布局层：分配表、目录与数据区，见[`volume`]
//! 3. 操作层：[`FatFileSystem`]上的读写、维护与碎片整理
//! 4. 路径层：[`image`]，打开宿主机上的镜像与文件

mod block;
mod control;
mod defrag;
mod dump;
mod error;
mod file;
pub mod image;
mod maintain;
pub mod volume;

pub use self::{
    block::{BlockError, BlockId},
    control::{FatFileSystem, Usage},
    defrag::DefragReport,
    error::{Error, Result},
    file::FileInfo,
};
