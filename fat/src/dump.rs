//! 元数据的文本转储，仅供诊断，不修改镜像。

use std::io::{self, Write};

use crate::FatFileSystem;

/// 每行打印的分配表条目数
const FAT_COLUMNS: usize = 4;

impl FatFileSystem {
    /// 转储全部已占用的目录项，隐藏项同样列出。
    pub fn dump_file_list<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "Item\tFilename\t\tFirst Block\tFile Size(bytes)\tHidden")?;
        for (slot, dirent) in self.dir.occupied() {
            writeln!(
                out,
                "{slot}\t\t{:<15}\t{:>4}\t\t{}\t\t\t{}",
                dirent.name(),
                dirent.first_block().raw(),
                dirent.size(),
                if dirent.is_hidden() { "yes" } else { "no" },
            )?;
        }
        out.flush()
    }

    /// 转储整张分配表，打印的是解码后的条目值。
    pub fn dump_fat<W: Write>(&self, mut out: W) -> io::Result<()> {
        let header = vec!["Entry\tValue\t"; FAT_COLUMNS].join("\t");
        writeln!(out, "{}", header.trim_end())?;

        for (row, ids) in self.fat.entries().chunks(FAT_COLUMNS).enumerate() {
            let line = ids
                .iter()
                .enumerate()
                .map(|(col, id)| format!("{:04x}\t{:08x}", row * FAT_COLUMNS + col, id.raw()))
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(out, "{line}")?;
        }
        out.flush()
    }
}
