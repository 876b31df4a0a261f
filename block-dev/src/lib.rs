//! # 磁盘镜像访问层
//!
//! 整个文件系统存放在宿主机的一个普通文件（磁盘镜像）里，
//! [`BlockDevice`] 是对按偏移量读写镜像区域的抽象，
//! 上层只通过它接触原始存储。

mod block_file;

use std::any::Any;
use std::fmt::Debug;
use std::io;

pub use self::block_file::BlockFile;

/// 磁盘镜像驱动特质
///
/// 写入立即交给操作系统，不在操作之间缓冲；
/// [`BlockDevice::sync`] 在每个修改操作结束时调用。
pub trait BlockDevice: Debug + Send + Sync + Any {
    /// 从`offset`开始读满`buf`，不足则报错。
    fn read_region(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// 将`buf`完整写到`offset`处。
    fn write_region(&self, offset: u64, buf: &[u8]) -> io::Result<()>;

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}
