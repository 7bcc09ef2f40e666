use anyhow::{bail, Context};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use env_logger::{Builder, Env};
use log::error;
use std::path::{Path, PathBuf};
use tg165fw::{Layout, PageFormat};

/// Injects a jump stub into a TG165 firmware image and appends an alternate
/// firmware to it.
#[derive(Parser)]
#[clap(name = "fwpatch")]
struct Fwpatch {
    /// Original firmware image (e.g. Upgrade.bin).
    container: PathBuf,
    /// Raw shellcode to inject.
    shellcode: PathBuf,
    /// Raw alternate firmware to append.
    additional_firmware: PathBuf,
    /// Where to write the patched image.
    output: PathBuf,

    /// Offset of the shellcode in the unpacked image.
    #[clap(long, value_parser = parse_number, default_value = "0x36b4")]
    shellcode_location: usize,
    /// Offset of the alternate firmware in the unpacked image.
    #[clap(long, value_parser = parse_number, default_value = "0x40000")]
    alt_fw_location: usize,
    /// Payload bytes per page.
    #[clap(long, value_parser = parse_number, default_value = "1024")]
    page_size: usize,
    /// Byte used to fill the gap before the alternate firmware.
    #[clap(long, value_parser = parse_byte, default_value = "0xff")]
    fill: u8,
    /// Refuse input images with bad checksums or padding.
    #[clap(long)]
    strict: bool,
}

fn parse_number(s: &str) -> Result<usize, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("`{}` is not a number: {}", s, e))
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let n = parse_number(s)?;
    u8::try_from(n).map_err(|_| format!("`{}` does not fit in a byte", s))
}

fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = match Fwpatch::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::MissingRequiredArgument
            | ErrorKind::UnknownArgument
            | ErrorKind::WrongNumberOfValues
            | ErrorKind::TooManyValues => {
                println!("{}", Fwpatch::command().render_usage());
                return Ok(());
            }
            _ => e.exit(),
        },
    };

    let format = PageFormat::new(args.page_size)?;
    let layout = Layout {
        shellcode_location: args.shellcode_location,
        alt_fw_location: args.alt_fw_location,
        fill_byte: args.fill,
    };

    let shellcode = read(&args.shellcode)?;
    let container = read(&args.container)?;
    let additional = read(&args.additional_firmware)?;

    let patched = tg165fw::patch_container(&container, &shellcode, &additional, format, &layout)?;

    for w in &patched.warnings {
        eprintln!("warning: {}: {}", args.container.display(), w);
    }
    if args.strict && !patched.warnings.is_empty() {
        bail!(
            "{} has {} damaged frame(s), refusing to patch",
            args.container.display(),
            patched.warnings.len()
        );
    }

    std::fs::write(&args.output, &patched.container)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "success, {:#x} byte image extended to {:#x}, wrote {:#x} bytes to {}",
        patched.raw_len,
        patched.extended_len,
        patched.container.len(),
        args.output.display()
    );

    Ok(())
}
