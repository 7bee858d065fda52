//! The assembler frontend: assembles LMC source into an LMCX executable.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use lmc_ensemble::asm::assemble;
use lmc_ensemble::err;
use lmc_ensemble::parse::parse_program;

#[derive(Parser)]
#[command(version, about = "Assembles Little Man Computer source into an LMCX executable")]
struct Args {
    /// The source file to assemble
    infile: PathBuf,

    /// The file to write the executable to.
    ///
    /// Defaults to the source file's name with an .lmc extension,
    /// in the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep the output file if it already exists, refusing to overwrite it
    #[arg(short = 'k', long)]
    no_overwrite: bool,
}

fn main() -> ExitCode {
    match run(&Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        },
    }
}

fn run(args: &Args) -> Result<(), String> {
    let src = std::fs::read_to_string(&args.infile)
        .map_err(|e| format!("error: cannot read {}: {e}", args.infile.display()))?;

    let stmts = parse_program(&src).map_err(|e| err::report(&e))?;
    let ex = assemble(&stmts).map_err(|e| err::report(&e))?;

    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output(&args.infile),
    };
    ex.write_file(&output, !args.no_overwrite).map_err(|e| err::report(&e))?;

    Ok(())
}

fn default_output(infile: &Path) -> PathBuf {
    let stem = infile.file_stem().unwrap_or_else(|| OsStr::new("out"));
    PathBuf::from(stem).with_extension("lmc")
}
