//! A toolchain and simulator for the Little Man Computer (LMC).
//!
//! This crate covers the whole pipeline from assembly source to a running
//! machine:
//! - **parse**: convert LMC assembly text into a statement sequence
//!   ([`parse`]);
//! - **assemble**: validate the statements, resolve labels, and encode the
//!   machine words ([`asm`]);
//! - **encode**: write and read the binary `.lmc` executable format
//!   ([`asm::encoding`]);
//! - **simulate**: load an executable and run its
//!   fetch-decode-execute loop ([`sim`]).
//!
//! # Usage
//!
//! Assembling and running a program:
//!
//! ```
//! use lmc_ensemble::asm::assemble;
//! use lmc_ensemble::parse::parse_program;
//! use lmc_ensemble::sim::Simulator;
//! use lmc_ensemble::sim::io::BufferedIO;
//!
//! // Adds two inputs and prints the sum.
//! let src = "
//!     INP
//!     STA first
//!     INP
//!     ADD first
//!     OUT
//!     HLT
//!     first DAT 0
//! ";
//!
//! // parse + assemble
//! let stmts = parse_program(src).unwrap();
//! let ex = assemble(&stmts).unwrap();
//!
//! // attach IO and run
//! let io = BufferedIO::with_input(["19", "23"]);
//! let output = io.get_output();
//!
//! let mut sim = Simulator::new(io.into());
//! sim.load_executable(&ex).unwrap();
//! sim.run().unwrap();
//!
//! assert_eq!(*output.read().unwrap(), vec!["42".to_string()]);
//! ```
//!
//! Executables round-trip through the binary format with
//! [`Executable::write_bytes`] and [`Executable::read_bytes`] (or
//! `write_file`/`read_file`), so assembling and running can happen in
//! separate processes.
//!
//! [`Executable::write_bytes`]: asm::Executable::write_bytes
//! [`Executable::read_bytes`]: asm::Executable::read_bytes

#![warn(missing_docs)]

pub mod asm;
pub mod err;
pub mod parse;
pub mod sim;
