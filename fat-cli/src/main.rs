mod cli;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use fat::{FileInfo, image};

use crate::cli::{Cli, Command};

const FILE_LIST: &str = "filelist.txt";
const FAT_DUMP: &str = "fat.txt";

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let command = match Command::try_from(cli.command.as_slice()) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };
    log::debug!("{} {:?}", cli.image.display(), command);

    let stdout = io::stdout();
    match run(&cli.image, command, &cli.out_dir, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// 执行一条命令，结果写入`out`。
fn run(img: &Path, command: Command, out_dir: &Path, out: &mut impl Write) -> fat::Result<()> {
    match command {
        Command::Format => {
            image::format(img)?;
            writeln!(out, "Disk formatted")?;
        }
        Command::Write { src, dest } => {
            let mut fs = image::open(img)?;
            image::write_file(&mut fs, &src, &dest)?;
            writeln!(out, "File: {dest} written to disk")?;
        }
        Command::Read { src, dest } => {
            let fs = image::open(img)?;
            image::read_file(&fs, &src, &dest)?;
            writeln!(out, "File: {src} read from disk")?;
        }
        Command::Delete(name) => {
            image::open(img)?.delete(&name)?;
            writeln!(out, "File deleted: {name}")?;
        }
        Command::List => {
            let fs = image::open(img)?;
            print_files(out, &fs.list())?;
            let usage = fs.usage();
            writeln!(
                out,
                "{} files, {} blocks free, {} slots free",
                usage.used_slots, usage.free_blocks, usage.free_slots
            )?;
        }
        Command::SortBySize => {
            print_files(out, &image::open(img)?.list_by_size())?;
        }
        Command::Rename { old, new } => {
            image::open(img)?.rename(&old, &new)?;
            writeln!(out, "The name of the file {old} is changed to {new}")?;
        }
        Command::Duplicate(name) => {
            let copy = image::open(img)?.duplicate(&name)?;
            writeln!(out, "File: {name} duplicated as {copy}")?;
        }
        Command::Search(name) => {
            let found = image::open(img)?.search(&name);
            writeln!(out, "{}", if found { "YES" } else { "NO" })?;
        }
        Command::Hide(name) => {
            image::open(img)?.hide(&name)?;
            writeln!(out, "File: {name} is hidden")?;
        }
        Command::Unhide(name) => {
            image::open(img)?.unhide(&name)?;
            writeln!(out, "File: {name} is unhidden")?;
        }
        Command::PrintFileList => {
            let fs = image::open(img)?;
            let path = out_dir.join(FILE_LIST);
            let mut file = BufWriter::new(File::create(&path)?);
            fs.dump_file_list(&mut file)?;
            file.flush()?;
            writeln!(out, "File: {FILE_LIST} is created successfully")?;
        }
        Command::PrintFat => {
            let fs = image::open(img)?;
            let path = out_dir.join(FAT_DUMP);
            let mut file = BufWriter::new(File::create(&path)?);
            fs.dump_fat(&mut file)?;
            file.flush()?;
            writeln!(out, "File: {FAT_DUMP} is created successfully")?;
        }
        Command::Defragment => {
            let report = image::defragment(img)?;
            writeln!(
                out,
                "Defragmentation complete: {} files, {} blocks",
                report.files, report.blocks
            )?;
        }
    }

    Ok(())
}

fn print_files(out: &mut impl Write, files: &[FileInfo]) -> io::Result<()> {
    if files.is_empty() {
        return writeln!(out, "No files on disk");
    }

    writeln!(out, "Filename\tSize")?;
    for info in files {
        writeln!(out, "{:<15}\t{}", info.name, info.size)?;
    }
    Ok(())
}
