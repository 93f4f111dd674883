use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info, Level};

/// Hack assembler
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input `.asm` file
    filename: PathBuf,

    /// Override the output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::WARN })
        .init();

    if args.filename.extension().map_or(true, |ext| ext != "asm") {
        bail!("{}: expected a .asm file", args.filename.display());
    }

    let source = fs::read_to_string(&args.filename)
        .with_context(|| format!("failed to read {}", args.filename.display()))?;

    let words = hasm::assemble(&source)
        .map_err(|error| anyhow::anyhow!("{}: {}", args.filename.display(), error))?;

    debug!(words = words.len(), "assembled");

    let output = args
        .output
        .unwrap_or_else(|| args.filename.with_extension("hack"));

    let file = fs::File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let mut writer = BufWriter::new(file);
    hasm::write_words(&words, &mut writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!("wrote {}", output.display());

    Ok(())
}
