use std::path::PathBuf;

use clap::{ArgAction, Parser};
use thiserror::Error;

/// 命令词以`-`开头（如`-hide`），为避免与`-h`冲突，只保留`--help`。
#[derive(Parser, Debug)]
#[command(about = "A FAT-style filesystem stored in a single disk image")]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Directory receiving `filelist.txt` and `fat.txt`
    #[arg(long, short = 'O', default_value = ".")]
    pub out_dir: PathBuf,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Disk image
    pub image: PathBuf,

    /// Command and its arguments, e.g. `-write src.txt a.txt`
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Format,
    Write { src: PathBuf, dest: String },
    Read { src: String, dest: PathBuf },
    Delete(String),
    List,
    SortBySize,
    Rename { old: String, new: String },
    Duplicate(String),
    Search(String),
    Hide(String),
    Unhide(String),
    PrintFileList,
    PrintFat,
    Defragment,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("missing command")]
    Missing,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("invalid number of arguments for -{command}, expected: -{command} {usage}")]
    Arguments {
        command: &'static str,
        usage: &'static str,
    },
}

impl TryFrom<&[String]> for Command {
    type Error = UsageError;

    fn try_from(words: &[String]) -> Result<Self, Self::Error> {
        let (word, args) = words.split_first().ok_or(UsageError::Missing)?;
        // 命令词可以用`-`或`–`开头
        let name = word.trim_start_matches(['-', '–']);

        let arity = |command: &'static str, usage: &'static str, n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(UsageError::Arguments { command, usage })
            }
        };

        let command = match name {
            "format" => arity("format", "", 0).map(|_| Self::Format),
            "write" => arity("write", "<source_file> <destination_file>", 2).map(|_| Self::Write {
                src: PathBuf::from(&args[0]),
                dest: args[1].clone(),
            }),
            "read" => arity("read", "<source_file> <destination_file>", 2).map(|_| Self::Read {
                src: args[0].clone(),
                dest: PathBuf::from(&args[1]),
            }),
            "delete" => arity("delete", "<file>", 1).map(|_| Self::Delete(args[0].clone())),
            "list" => arity("list", "", 0).map(|_| Self::List),
            "sorta" => arity("sorta", "", 0).map(|_| Self::SortBySize),
            "rename" => arity("rename", "<source_file> <new_name>", 2).map(|_| Self::Rename {
                old: args[0].clone(),
                new: args[1].clone(),
            }),
            "duplicate" => {
                arity("duplicate", "<source_file>", 1).map(|_| Self::Duplicate(args[0].clone()))
            }
            "search" => arity("search", "<source_file>", 1).map(|_| Self::Search(args[0].clone())),
            "hide" => arity("hide", "<source_file>", 1).map(|_| Self::Hide(args[0].clone())),
            "unhide" => arity("unhide", "<source_file>", 1).map(|_| Self::Unhide(args[0].clone())),
            "printfilelist" => arity("printfilelist", "", 0).map(|_| Self::PrintFileList),
            "printfat" => arity("printfat", "", 0).map(|_| Self::PrintFat),
            "defragment" => arity("defragment", "", 0).map(|_| Self::Defragment),
            _ => Err(UsageError::Unknown(word.clone())),
        }?;

        Ok(command)
    }
}
