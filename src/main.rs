use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::{debug, info, Level};

use jackc::error::Diagnostic;
use jackc::{lex, parse, xml};

/// Jack compiler
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input `.jack` file or directory of `.jack` files
    filename: PathBuf,

    /// Override the output path (single-file input only)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'd', long)]
    debug: bool,

    /// Output mode
    #[arg(short = 'm', long, value_enum, default_value_t = OutMode::Vm)]
    outmode: OutMode,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutMode {
    Vm,
    Xml,
}

impl OutMode {
    fn extension(self) -> &'static str {
        match self {
            OutMode::Vm => "vm",
            OutMode::Xml => "xml",
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::WARN })
        .init();

    let inputs = gather(&args.filename)?;

    if args.output.is_some() && inputs.len() > 1 {
        bail!("-o is only valid for single-file inputs");
    }

    for input in &inputs {
        let output = match &args.output {
            Some(output) => output.clone(),
            None => input.with_extension(args.outmode.extension()),
        };

        translate_file(input, &output, args.outmode)?;
        info!("wrote {}", output.display());
    }

    Ok(())
}

/// Compila un archivo a su salida, sin dejar salidas parciales: el
/// texto completo se produce en memoria antes de tocar el disco.
fn translate_file(input: &Path, output: &Path, mode: OutMode) -> anyhow::Result<()> {
    let file = input.display().to_string();
    let source = fs::read_to_string(input).with_context(|| format!("failed to read {}", file))?;

    let tokens = match lex::tokenize(&source) {
        Ok(tokens) => tokens,
        Err(error) => bail!("{}", Diagnostic::new(&file, &source, &error)),
    };

    debug!(file = %file, tokens = tokens.len(), "lexed");

    let mut text = Vec::new();
    match mode {
        OutMode::Xml => xml::write_tokens(&tokens, &mut text)?,

        OutMode::Vm => {
            let code = match parse::compile(&tokens) {
                Ok(code) => code,
                Err(error) => bail!("{}", Diagnostic::new(&file, &source, &error)),
            };

            debug!(file = %file, instructions = code.len(), "compiled");

            for inst in &code {
                writeln!(text, "{}", inst)?;
            }
        }
    }

    fs::write(output, &text).with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

/// Resuelve la lista de archivos de entrada: un `.jack` suelto o todos
/// los `.jack` inmediatos de un directorio, en orden lexicográfico.
fn gather(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(input)
            .with_context(|| format!("failed to list {}", input.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "jack"))
            .collect();

        files.sort();

        if files.is_empty() {
            bail!("{}: no .jack files found", input.display());
        }

        Ok(files)
    } else {
        if input.extension().map_or(true, |ext| ext != "jack") {
            bail!("{}: expected a .jack file or a directory", input.display());
        }

        Ok(vec![input.to_path_buf()])
    }
}
