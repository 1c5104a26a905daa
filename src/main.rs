use anyhow::{bail, Context, Result};
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use crossterm::style::Stylize;
use inquire::Confirm;
use std::{
    fs::{metadata, File},
    io::{Read, Seek, SeekFrom},
    path::Path,
    process::exit,
};
use unsign::{Error, Magic, Status};

const SUFFIX: &str = ".unsigned";

#[derive(Parser, Debug)]
#[command(about = "Strip the code signature load command from a Mach-O file")]
struct Args {
    /// The signed Mach-O file, left untouched
    input_file: String,
    /// Output path, defaults to the input path with `.unsigned` appended
    output_file: Option<String>,
    /// File offset of the Mach-O image (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0", value_parser = parse_offset)]
    offset: u64,
    /// Run without asking for confirmation
    #[arg(long, short('y'))]
    all_yes: bool,
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

fn parse_offset(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid offset `{s}`: {e}"))
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    if let Err(e) = args.run() {
        match e.downcast_ref::<Error>() {
            Some(Error::UnsupportedMagic(magic)) => eprintln!(
                "Unknown mach-o magic number: {}",
                format!("{:#010x}", magic).red()
            ),
            _ => eprintln!("{} {:#}", "error:".red().bold(), e),
        }
        exit(1);
    }
}

trait Utils {
    fn ask_for_confirmation(&self, msg: &str) -> bool;
    fn output_file(&self) -> String;
    fn detect_magic(&self) -> Result<Magic>;
    fn run(&self) -> Result<()>;
}

impl Utils for Args {
    fn ask_for_confirmation(&self, msg: &str) -> bool {
        if self.all_yes {
            return true;
        }

        Confirm::new(msg)
            .with_default(true)
            .prompt()
            .unwrap_or(false)
    }

    fn output_file(&self) -> String {
        self.output_file
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.input_file, SUFFIX))
    }

    fn detect_magic(&self) -> Result<Magic> {
        let mut file = File::open(&self.input_file)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic).with_context(|| {
            format!(
                "`{}` has no Mach-O header at offset {:#x}",
                self.input_file, self.offset
            )
        })?;
        Ok(Magic::detect(magic)?)
    }

    fn run(&self) -> Result<()> {
        if !Path::new(&self.input_file).exists() {
            bail!("Input file `{}` does not exist", self.input_file);
        }

        if !metadata(&self.input_file)?.is_file() {
            bail!("Input file `{}` is not a file", self.input_file);
        }

        let magic = self.detect_magic()?;
        println!("match {} file", magic.to_string().red());

        let output_file = self.output_file();
        if Path::new(&output_file).exists() {
            // a hard link shares the input's inode, so compare identity
            if same_file::is_same_file(&self.input_file, &output_file)? {
                bail!("Output file must differ from the input file");
            }
            if !self.ask_for_confirmation(&format!(
                "Output file `{}` already exists, overwrite?",
                output_file
            )) {
                exit(0);
            }
        }

        std::fs::copy(&self.input_file, &output_file).with_context(|| {
            format!("Failed to copy `{}` to `{}`", self.input_file, output_file)
        })?;
        log::debug!("Copied `{}` to `{}`", self.input_file, output_file);

        let status = unsign::unsign_path(&output_file, self.offset)
            .with_context(|| format!("Failed to patch `{}`", output_file))?;

        match status {
            Status::Unsigned(removal) => {
                println!(
                    "removed load command #{} at offset: {:#x}",
                    removal.index, removal.command_offset
                );
                println!(
                    "zeroed signature data: {:#x}..{:#x}",
                    self.offset + removal.dataoff as u64,
                    self.offset + removal.dataoff as u64 + removal.datasize as u64
                );
                println!(
                    "ncmds: {}, sizeofcmds: {:#x}",
                    removal.ncmds, removal.sizeofcmds
                );
                println!("{} `{}`", "Done!".green().bold(), output_file);
            }
            Status::SignatureNotFound { .. } => {
                println!(
                    "{} `{}` is an unchanged copy",
                    "No code signature found,".yellow(),
                    output_file
                );
            }
        }

        Ok(())
    }
}
