//! The virtual machine frontend: runs an LMCX executable on stdio.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use lmc_ensemble::asm::Executable;
use lmc_ensemble::err;
use lmc_ensemble::sim::io::BiChannelIO;
use lmc_ensemble::sim::Simulator;

#[derive(Parser)]
#[command(version, about = "Runs an LMCX executable on the Little Man Computer")]
struct Args {
    /// The executable file to run
    infile: PathBuf,
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
    let ex = Executable::read_file(&args.infile).map_err(|e| err::report(&e))?;

    let mut sim = Simulator::new(BiChannelIO::stdio().into());
    sim.load_executable(&ex).map_err(|e| err::report(&e))?;

    let result = sim.run();
    // Let pending output lines reach the terminal before reporting.
    sim.close_io();
    result.map_err(|e| err::report(&e))
}
