//! 以宿主机路径为单位的操作
//!
//! 负责打开镜像与源文件，并把宿主机上的“找不到”映射为相应的错误。

use std::fs::{self as host_fs, File};
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;

use block_dev::{BlockDevice, BlockFile};
use tempfile::NamedTempFile;

use crate::defrag::DefragReport;
use crate::volume::IMAGE_SIZE;
use crate::{Error, FatFileSystem, Result};

/// 创建（或覆盖）镜像并格式化。
pub fn format(path: &Path) -> Result<FatFileSystem> {
    let dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::create(path, IMAGE_SIZE as u64)?);
    FatFileSystem::format(&dev)
}

pub fn open(path: &Path) -> Result<FatFileSystem> {
    let dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::ImageNotFound(path.to_owned())
        } else {
            e.into()
        }
    })?);
    FatFileSystem::load(&dev)
}

/// 将宿主机文件`src`存入镜像，命名为`name`。
pub fn write_file(fs: &mut FatFileSystem, src: &Path, name: &str) -> Result<usize> {
    let file = File::open(src).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::SourceNotFound(src.to_owned())
        } else {
            e.into()
        }
    })?;
    fs.store(name, file)
}

/// 将镜像中的`name`读到宿主机文件`dest`。
///
/// 先确认文件存在且链表完好，再创建目标文件。
pub fn read_file(fs: &FatFileSystem, name: &str, dest: &Path) -> Result<u64> {
    let info = fs.stat(name)?;
    fs.fat().chain(info.first_block)?;
    let out = BufWriter::new(File::create(dest)?);
    fs.retrieve(name, out)
}

/// 碎片整理：先写入同目录下的临时镜像，再原子地重命名覆盖原镜像。
///
/// 重命名之前的任何失败都不会改动原镜像，临时镜像随之删除。
pub fn defragment(path: &Path) -> Result<DefragReport> {
    let fs = open(path)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = NamedTempFile::new_in(parent)?;
    staging.as_file().set_len(IMAGE_SIZE as u64)?;

    let dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(staging.reopen()?));
    let report = fs.defragment_into(&dev)?;
    drop(dev);
    drop(fs);

    // 临时文件默认只有属主可读写，换上原镜像的权限
    let perms = host_fs::metadata(path)?.permissions();
    staging.as_file().set_permissions(perms)?;

    staging.persist(path).map_err(|e| {
        log::error!("Could not rename staged image over {}", path.display());
        Error::Io(e.error)
    })?;

    log::info!(
        "Defragmentation complete: {} files, {} blocks",
        report.files,
        report.blocks
    );
    Ok(report)
}
