use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{BlockError, BlockId};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open disk image {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("could not open source file {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("file list is full")]
    DirectoryFull,

    #[error("not enough free space on disk: {needed} blocks needed, {free} free")]
    DiskFull { needed: usize, free: usize },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("new name is the same as the old name: {0}")]
    NoOpRename(String),

    #[error("invalid file name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// 遍历越过表容量（成环）或碰到悬空指针
    #[error("corrupt block chain starting at {start}: {reason:?}")]
    CorruptChain { start: BlockId, reason: BlockError },

    #[error("disk image is not formatted")]
    NotFormatted,

    #[error("malformed metadata: {0}")]
    Format(#[from] binrw::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
