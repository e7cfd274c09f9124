//! tracecap - Capture values and memory from a debugging session
//!
//! Entry point that handles CLI argument parsing, picks the memory
//! context and runs either the given commands or the interactive REPL.

use anyhow::{bail, Context};
use clap::Parser;
use tracecap::app::{dispatch, Session};
use tracecap::capture::CaptureStore;
use tracecap::config::Config;
use tracecap::core::{to_address, ImageMemory, MemoryContext, ProcessMemory};
use tracecap::parse::parse_int;
use tracecap::ui::cli::run_cli;

/// tracecap: capture values and memory regions into a JSON log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read memory of a running process (Linux)
    #[arg(short, long, conflicts_with = "image")]
    pid: Option<u32>,

    /// Treat a file as memory image
    #[arg(short, long)]
    image: Option<String>,

    /// Load address of the image (accepts 0x/0b/0o and k/M/G)
    #[arg(long, default_value = "0")]
    base: String,

    /// Image symbol, NAME=ADDRESS (repeatable)
    #[arg(long = "symbol", value_name = "NAME=ADDRESS")]
    symbols: Vec<String>,

    /// Pointer width of the target in bytes
    #[arg(long)]
    pointer_width: Option<usize>,

    /// Configuration file (defaults to $TRACECAP_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Capture log path, overrides the configuration
    #[arg(long)]
    capture: Option<String>,

    /// Run these commands and exit instead of starting the REPL
    #[arg(short, long = "exec", value_name = "COMMAND")]
    exec: Vec<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_address(text: &str) -> anyhow::Result<u64> {
    Ok(to_address(parse_int(text)?))
}

fn build_context(args: &Args) -> anyhow::Result<Box<dyn MemoryContext>> {
    if let Some(pid) = args.pid {
        if !args.symbols.is_empty() || args.pointer_width.is_some() {
            bail!("--symbol and --pointer-width only apply to --image");
        }
        return Ok(Box::new(ProcessMemory::open(pid)?));
    }

    let mut image = match &args.image {
        Some(path) => ImageMemory::from_file(path, parse_address(&args.base)?)
            .with_context(|| format!("Failed to load image {}", path))?,
        None => ImageMemory::empty(),
    };

    for symbol in &args.symbols {
        let Some((name, address)) = symbol.split_once('=') else {
            bail!("Invalid symbol '{}', expected NAME=ADDRESS", symbol);
        };
        image = image.with_symbol(name, parse_address(address)?);
    }
    if let Some(width) = args.pointer_width {
        image = image.with_pointer_width(width);
    }

    Ok(Box::new(image))
}

fn main() -> anyhow::Result<()> {
    // 1. Parse command line arguments
    let args = Args::parse();

    // 2. Initialize logger with verbosity level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    ))
    .init();

    // 3. Resolve the capture log location
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(capture) = &args.capture {
        config.capture = capture.into();
    }
    log::debug!("Capture log: {}", config.capture.display());

    let context = build_context(&args)?;
    log::info!("Memory context: {}", context.describe());
    let mut session = Session::new(context, CaptureStore::new(config.capture));

    // 4. Batch mode stops at the first failing command
    if !args.exec.is_empty() {
        for line in &args.exec {
            let output = dispatch(&mut session, line).with_context(|| format!("'{}' failed", line))?;
            println!("{}", output);
        }
        return Ok(());
    }

    println!("[*] tracecap v{}", env!("CARGO_PKG_VERSION"));
    run_cli(&mut session)
}
