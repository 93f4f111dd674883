use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info, Level};

use vmtrans::Translator;

/// Hack VM translator
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input `.vm` file or directory of `.vm` files
    filename: PathBuf,

    /// Override the output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Enable verbose logging and annotate the output with one comment
    /// per VM instruction
    #[arg(short, long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::WARN })
        .init();

    let (inputs, output) = gather(&args.filename)?;
    let output = args.output.unwrap_or(output);

    let mut translator = Translator::new();
    let mut text = Vec::new();

    // El arranque se emite exactamente una vez, solo para directorios
    if args.filename.is_dir() {
        translator.bootstrap();
        flush(&mut translator, &mut text)?;
    }

    for input in &inputs {
        let stem = input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .with_context(|| format!("bad file name {}", input.display()))?;

        translator.begin_file(stem);

        let source = fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?;

        for (index, raw) in source.lines().enumerate() {
            let inst = match vmtrans::decode_line(raw) {
                Ok(Some(inst)) => inst,
                Ok(None) => continue,
                Err(error) => {
                    bail!("{}:{}: {}", input.display(), index + 1, error);
                }
            };

            if args.debug {
                writeln!(text, "// {}", inst)?;
            }

            translator.translate(&inst);
            flush(&mut translator, &mut text)?;
        }

        debug!(file = %input.display(), "translated");
    }

    fs::write(&output, &text).with_context(|| format!("failed to write {}", output.display()))?;
    info!("wrote {}", output.display());

    Ok(())
}

fn flush(translator: &mut Translator, text: &mut Vec<u8>) -> anyhow::Result<()> {
    for inst in translator.drain() {
        writeln!(text, "{}", inst)?;
    }

    Ok(())
}

/// Resuelve la lista de archivos de entrada y la ruta de salida
/// predeterminada. Los directorios aportan sus `.vm` inmediatos en
/// orden lexicográfico y producen `<directorio>.asm` en su interior.
fn gather(input: &Path) -> anyhow::Result<(Vec<PathBuf>, PathBuf)> {
    if input.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(input)
            .with_context(|| format!("failed to list {}", input.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "vm"))
            .collect();

        files.sort();

        if files.is_empty() {
            bail!("{}: no .vm files found", input.display());
        }

        let name = input
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("bad directory name {}", input.display()))?;

        let output = input.join(format!("{}.asm", name));
        Ok((files, output))
    } else {
        if input.extension().map_or(true, |ext| ext != "vm") {
            bail!("{}: expected a .vm file or a directory", input.display());
        }

        let output = input.with_extension("asm");
        Ok((vec![input.to_path_buf()], output))
    }
}
