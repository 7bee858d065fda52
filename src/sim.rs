//! Executing LMC machine code.
//!
//! This module manages the execution of assembled programs:
//!
//! ```
//! use lmc_ensemble::asm::assemble;
//! use lmc_ensemble::parse::parse_program;
//! use lmc_ensemble::sim::Simulator;
//! use lmc_ensemble::sim::io::BufferedIO;
//!
//! // Doubles its input.
//! let stmts = parse_program("
//!     INP
//!     STA num
//!     ADD num
//!     OUT
//!     HLT
//!     num DAT 0
//! ").unwrap();
//! let ex = assemble(&stmts).unwrap();
//!
//! let io = BufferedIO::with_input(["21"]);
//! let output = io.get_output();
//!
//! let mut sim = Simulator::new(io.into());
//! sim.load_executable(&ex).unwrap();
//! sim.run().unwrap();
//!
//! assert_eq!(*output.read().unwrap(), vec!["42".to_string()]);
//! ```
//!
//! The machine has a program counter (`PC`), an accumulator (`ACC`), and a
//! memory address register (`MAR`) rederived on every cycle. Each cycle
//! fetches the word at `PC`, decodes it as `opcode * 100 + address`, and
//! dispatches; the run ends on HLT or on the first [`SimErr`].

pub mod io;

use std::borrow::Cow;

use crate::asm::{Executable, EXT_SUPPORTED_VERSION, MEM_SIZE, WORD_MAX};
use io::{IODevice, SimIO};

/// Errors that can occur during simulation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SimErr {
    /// The fetched word does not decode to any instruction.
    IllegalInstr(u16),
    /// An ADD pushed the accumulator past its numeric range.
    Overflow,
    /// A SUB pushed the accumulator below its numeric range.
    Underflow,
    /// A STA fired while the accumulator held a value no memory word can
    /// (outside `0..=999`).
    StoreRange(i32),
    /// An INP fired but the input source is closed.
    InputClosed,
    /// An OUT fired but no output sink is connected.
    OutputClosed,
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErr::IllegalInstr(w) => write!(f, "illegal instruction {w:03}"),
            SimErr::Overflow        => f.write_str("accumulator overflow on ADD"),
            SimErr::Underflow       => f.write_str("accumulator underflow on SUB"),
            SimErr::StoreRange(v)   => write!(f, "cannot store accumulator value {v} into a memory word"),
            SimErr::InputClosed     => f.write_str("input requested but input is closed"),
            SimErr::OutputClosed    => f.write_str("output produced but no output device is connected"),
        }
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<Cow<str>> {
        match self {
            SimErr::StoreRange(_) => Some(format!("memory words hold 0 to {WORD_MAX}").into()),
            _ => None,
        }
    }
}

/// Errors that can occur while loading an executable into the machine.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LoadErr {
    /// The image has more words than the machine has memory.
    TooBig(usize),
    /// The image's extension version is newer than this simulator supports.
    UnsupportedVersion(u16),
}
impl std::fmt::Display for LoadErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadErr::TooBig(n) => {
                write!(f, "executable has {n} words but the machine only has {MEM_SIZE}")
            },
            LoadErr::UnsupportedVersion(v) => {
                write!(f, "executable requires extension version {v}")
            },
        }
    }
}
impl std::error::Error for LoadErr {}
impl crate::err::Error for LoadErr {
    fn help(&self) -> Option<Cow<str>> {
        match self {
            LoadErr::UnsupportedVersion(_) => {
                Some(format!("this simulator supports versions up to {EXT_SUPPORTED_VERSION}").into())
            },
            LoadErr::TooBig(_) => None,
        }
    }
}

/// A decoded instruction, paired with the address field where one applies.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Instr {
    Add,
    Sub,
    Sta,
    Lda,
    Bra,
    Brz,
    Brp,
    Inp,
    Out,
    Hlt,
}

/// Decodes a machine word into an instruction and its address field.
///
/// The IO/HALT family is matched on the exact 3-digit code, so stray words
/// like 903 or 017 fail to decode instead of aliasing a real instruction.
fn decode(word: u16) -> Result<(Instr, u16), SimErr> {
    let mar = word % 100;
    let instr = match word / 100 {
        1 => Instr::Add,
        2 => Instr::Sub,
        3 => Instr::Sta,
        5 => Instr::Lda,
        6 => Instr::Bra,
        7 => Instr::Brz,
        8 => Instr::Brp,
        9 if word == 901 => Instr::Inp,
        9 if word == 902 => Instr::Out,
        0 if word == 0 => Instr::Hlt,
        _ => return Err(SimErr::IllegalInstr(word)),
    };
    Ok((instr, mar))
}

/// Executes LMC machine code.
///
/// A simulator is created with [`Simulator::new`], given a program with
/// [`Simulator::load_executable`], and driven with [`Simulator::run`] (or
/// [`Simulator::step`] for one cycle at a time).
#[derive(Debug)]
pub struct Simulator {
    /// The machine's memory.
    pub mem: [u16; MEM_SIZE],

    /// The program counter.
    pub pc: u16,

    /// The accumulator.
    ///
    /// This is deliberately wider than a machine word: intermediate values
    /// may hold anything an `i32` can, and only STA insists the value fits
    /// back into a word.
    pub acc: i32,

    /// The memory address register, as of the most recent decode.
    pub mar: u16,

    /// The IO device the machine's INP and OUT instructions talk to.
    pub io: SimIO,

    halted: bool,
}

impl Simulator {
    /// Creates a machine with zeroed memory and registers, attached to the
    /// given IO device.
    pub fn new(io: SimIO) -> Self {
        Self {
            mem: [0; MEM_SIZE],
            pc: 0,
            acc: 0,
            mar: 0,
            io,
            halted: false,
        }
    }

    /// Loads an executable image into memory and resets the registers.
    ///
    /// Images longer than memory are rejected rather than truncated, as are
    /// images carrying an extension version this simulator does not know.
    /// Memory past the image's last word is zeroed.
    pub fn load_executable(&mut self, ex: &Executable) -> Result<(), LoadErr> {
        if ex.ext_version() > EXT_SUPPORTED_VERSION {
            return Err(LoadErr::UnsupportedVersion(ex.ext_version()));
        }
        if ex.len() > MEM_SIZE {
            return Err(LoadErr::TooBig(ex.len()));
        }

        self.mem = [0; MEM_SIZE];
        self.mem[..ex.len()].copy_from_slice(ex.words());
        self.pc = 0;
        self.acc = 0;
        self.mar = 0;
        self.halted = false;
        Ok(())
    }

    /// Whether the machine has executed a HLT.
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Detaches and closes the machine's IO device.
    pub fn close_io(&mut self) {
        std::mem::take(&mut self.io).close();
    }

    /// Executes one fetch-decode-execute cycle.
    ///
    /// Does nothing if the machine has already halted. On an error the
    /// registers keep the values they had when the error fired, so the
    /// faulting state can be inspected.
    pub fn step(&mut self) -> Result<(), SimErr> {
        if self.halted {
            return Ok(());
        }

        let word = self.mem[usize::from(self.pc) % MEM_SIZE];
        let (instr, mar) = decode(word)?;
        self.mar = mar;
        let mem_in = self.mem[usize::from(mar)];

        match instr {
            Instr::Add => {
                self.acc = self.acc.checked_add(i32::from(mem_in)).ok_or(SimErr::Overflow)?;
                self.advance_pc();
            },
            Instr::Sub => {
                self.acc = self.acc.checked_sub(i32::from(mem_in)).ok_or(SimErr::Underflow)?;
                self.advance_pc();
            },
            Instr::Sta => {
                if !(0..=i32::from(WORD_MAX)).contains(&self.acc) {
                    return Err(SimErr::StoreRange(self.acc));
                }
                self.mem[usize::from(mar)] = self.acc as u16;
                self.advance_pc();
            },
            Instr::Lda => {
                self.acc = i32::from(mem_in);
                self.advance_pc();
            },
            Instr::Bra => self.pc = mar,
            Instr::Brz => match self.acc == 0 {
                true  => self.pc = mar,
                false => self.advance_pc(),
            },
            Instr::Brp => match self.acc >= 0 {
                true  => self.pc = mar,
                false => self.advance_pc(),
            },
            Instr::Inp => {
                // Non-numeric lines are dropped and input is asked for
                // again; only a closed input is an error.
                self.acc = loop {
                    let line = self.io.read_line().ok_or(SimErr::InputClosed)?;
                    if let Ok(value) = line.trim().parse::<i32>() {
                        break value;
                    }
                };
                self.advance_pc();
            },
            Instr::Out => {
                if !self.io.write_line(&self.acc.to_string()) {
                    return Err(SimErr::OutputClosed);
                }
                self.advance_pc();
            },
            Instr::Hlt => self.halted = true,
        }

        Ok(())
    }

    /// Execution runs off the end of memory back to address 0.
    fn advance_pc(&mut self) {
        self.pc = (self.pc + 1) % (MEM_SIZE as u16);
    }

    /// Runs the machine until it halts or errors.
    ///
    /// A program that never halts (e.g. a BRA-only loop) makes this spin
    /// forever; that is the program's business, not an error.
    pub fn run(&mut self) -> Result<(), SimErr> {
        self.run_while(|_| true)
    }

    /// Runs the machine until it halts, errors, or the given condition
    /// turns false.
    ///
    /// The condition is checked before every cycle.
    pub fn run_while(&mut self, mut cond: impl FnMut(&Simulator) -> bool) -> Result<(), SimErr> {
        while !self.halted && cond(self) {
            self.step()?;
        }
        Ok(())
    }

    /// Runs the machine for at most the given number of cycles.
    pub fn run_with_limit(&mut self, max_cycles: u64) -> Result<(), SimErr> {
        let mut left = max_cycles;
        self.run_while(|_| {
            let go = left > 0;
            left = left.saturating_sub(1);
            go
        })
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimIO::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::io::{BufferedIO, SimIO};
    use super::{LoadErr, SimErr, Simulator};
    use crate::asm::{assemble, Executable, MEM_SIZE};
    use crate::parse::parse_program;

    fn load(src: &str, io: impl Into<SimIO>) -> Simulator {
        let ex = assemble(&parse_program(src).unwrap()).unwrap();
        let mut sim = Simulator::new(io.into());
        sim.load_executable(&ex).unwrap();
        sim
    }

    #[test]
    fn test_counting_loop() {
        // Prints 1 through 5.
        let io = BufferedIO::new();
        let output = io.get_output();
        let mut sim = load("
            loop LDA count
            ADD one
            STA count
            OUT
            SUB limit
            BRZ done
            BRA loop
            done HLT
            count DAT 0
            one DAT 1
            limit DAT 5
        ", io);

        sim.run_with_limit(1000).unwrap();
        assert!(sim.halted());
        assert_eq!(*output.read().unwrap(), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_branches() {
        // BRP follows a non-negative accumulator, BRZ only zero.
        let mut sim = load("
            LDA one
            BRZ bad
            BRP ok
            bad HLT
            ok LDA one
            SUB one
            BRZ done
            HLT
            done HLT
            one DAT 1
        ", SimIO::Empty);

        sim.run_with_limit(100).unwrap();
        assert!(sim.halted());
        assert_eq!(sim.pc, 8);
    }

    #[test]
    fn test_negative_accumulator_falls_through_brp() {
        let mut sim = load("
            LDA zero
            SUB one
            BRP bad
            HLT
            bad HLT
            zero DAT 0
            one DAT 1
        ", SimIO::Empty);

        sim.run_with_limit(100).unwrap();
        assert_eq!(sim.pc, 3);
        assert_eq!(sim.acc, -1);
    }

    #[test]
    fn test_illegal_instruction() {
        let mut sim = Simulator::default();
        sim.mem[0] = 999;
        assert_eq!(sim.step(), Err(SimErr::IllegalInstr(999)));

        // Opcode 4 is unassigned.
        let mut sim = Simulator::default();
        sim.mem[0] = 405;
        assert_eq!(sim.step(), Err(SimErr::IllegalInstr(405)));

        // 0 is HLT only as the exact word 000.
        let mut sim = Simulator::default();
        sim.mem[0] = 17;
        assert_eq!(sim.step(), Err(SimErr::IllegalInstr(17)));
    }

    #[test]
    fn test_add_overflow_keeps_acc() {
        let mut sim = Simulator::default();
        sim.mem[0] = 105; // ADD 5
        sim.mem[5] = 7;
        sim.acc = i32::MAX - 3;

        assert_eq!(sim.step(), Err(SimErr::Overflow));
        assert_eq!(sim.acc, i32::MAX - 3);
        assert_eq!(sim.pc, 0);
    }

    #[test]
    fn test_sub_underflow_keeps_acc() {
        let mut sim = Simulator::default();
        sim.mem[0] = 205; // SUB 5
        sim.mem[5] = 7;
        sim.acc = i32::MIN + 3;

        assert_eq!(sim.step(), Err(SimErr::Underflow));
        assert_eq!(sim.acc, i32::MIN + 3);
    }

    #[test]
    fn test_sta_range() {
        let mut sim = Simulator::default();
        sim.mem[0] = 305; // STA 5
        sim.acc = 1000;
        assert_eq!(sim.step(), Err(SimErr::StoreRange(1000)));

        let mut sim = Simulator::default();
        sim.mem[0] = 305;
        sim.acc = -1;
        assert_eq!(sim.step(), Err(SimErr::StoreRange(-1)));

        // 999 just fits.
        let mut sim = Simulator::default();
        sim.mem[0] = 305;
        sim.acc = 999;
        sim.step().unwrap();
        assert_eq!(sim.mem[5], 999);
    }

    #[test]
    fn test_inp_skips_malformed_lines() {
        let mut sim = load("INP\nOUT\nHLT", BufferedIO::with_input(["abc", "", "42"]));
        sim.run_with_limit(100).unwrap();
        assert_eq!(sim.acc, 42);
    }

    #[test]
    fn test_inp_accepts_negative_input() {
        let mut sim = load("INP\nHLT", BufferedIO::with_input(["-17"]));
        sim.run_with_limit(100).unwrap();
        assert_eq!(sim.acc, -17);
    }

    #[test]
    fn test_inp_on_closed_input() {
        let mut sim = load("INP\nHLT", SimIO::Empty);
        assert_eq!(sim.run_with_limit(100), Err(SimErr::InputClosed));
        assert!(!sim.halted());
    }

    #[test]
    fn test_out_without_device() {
        let mut sim = load("LDA x\nOUT\nHLT\nx DAT 9", SimIO::Empty);
        assert_eq!(sim.run_with_limit(100), Err(SimErr::OutputClosed));
    }

    #[test]
    fn test_load_rejects_oversized_image() {
        let ex = Executable::new(vec![0; MEM_SIZE + 1]);
        let mut sim = Simulator::default();
        assert_eq!(sim.load_executable(&ex), Err(LoadErr::TooBig(MEM_SIZE + 1)));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let ex = Executable::new_extended(vec![0], 1);
        let mut sim = Simulator::default();
        assert_eq!(sim.load_executable(&ex), Err(LoadErr::UnsupportedVersion(1)));
    }

    #[test]
    fn test_load_zero_pads_short_image() {
        let ex = Executable::new(vec![901, 902]);
        let mut sim = Simulator::default();
        sim.mem = [111; MEM_SIZE];
        sim.load_executable(&ex).unwrap();

        assert_eq!(sim.mem[0], 901);
        assert_eq!(sim.mem[1], 902);
        assert!(sim.mem[2..].iter().all(|&w| w == 0));
    }

    #[test]
    fn test_run_while_pause() {
        let mut sim = load("
            loop LDA count
            ADD one
            STA count
            BRA loop
            count DAT 0
            one DAT 1
        ", SimIO::Empty);

        // Pause once the counter cell reaches 3.
        sim.run_while(|s| s.mem[4] < 3).unwrap();
        assert!(!sim.halted());
        assert_eq!(sim.mem[4], 3);
    }
}
