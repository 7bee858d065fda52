//! Assembling statement sequences into executable images.
//!
//! This module is used to convert a parsed statement sequence
//! (see the [`parse`] module) into an [`Executable`] that can be
//! written to disk (see [`encoding`]) or run directly (see [`sim`]).
//!
//! Assembly happens in two stages:
//! - [`validate`] checks the statements structurally and resolves every
//!   label to the address of the statement defining it, producing a
//!   [`SymbolTable`];
//! - [`codegen`] encodes each statement into a machine word using that
//!   table.
//!
//! [`assemble`] runs both stages in order.
//!
//! # Example
//! ```
//! use lmc_ensemble::asm::assemble;
//! use lmc_ensemble::parse::parse_program;
//!
//! let stmts = parse_program("
//!     LDA five
//!     ADD five
//!     OUT
//!     HLT
//!     five DAT 5
//! ").unwrap();
//!
//! let ex = assemble(&stmts).unwrap();
//! assert_eq!(&ex.words()[..5], &[504, 104, 902, 0, 5]);
//! ```
//!
//! [`parse`]: crate::parse
//! [`sim`]: crate::sim

pub mod encoding;
pub mod symbol;

use std::borrow::Cow;

use crate::parse::lex::Mnemonic;
use crate::parse::Stmt;
use symbol::SymbolTable;

/// The number of memory words in the machine, and therefore the largest
/// number of statements a program can have.
pub const MEM_SIZE: usize = 100;
/// The largest value a machine word can hold (and a `DAT` can declare).
pub const WORD_MAX: u16 = 999;
/// The largest addressable memory location.
pub const ADDR_MAX: u16 = 99;

/// The highest executable extension version this crate understands.
///
/// Version 0 is the standard format. Positive versions flag extension
/// variants that are not specified yet, so images carrying one are
/// recognized at the codec level but refused by the simulator.
pub const EXT_SUPPORTED_VERSION: u16 = 0;

/// An assembled (or loaded) executable image.
///
/// This holds the machine words, their logical count, and the extension
/// version tag. It is produced by [`codegen`] on the assembly path or by
/// [`Executable::read_bytes`] on the load path, and consumed by
/// [`Executable::write_bytes`] or by [`Simulator::load_executable`].
///
/// [`Simulator::load_executable`]: crate::sim::Simulator::load_executable
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Executable {
    words: Vec<u16>,
    ext_version: u16,
}

impl Executable {
    /// Creates an executable from its machine words, using the standard
    /// (non-extended) format.
    pub fn new(words: Vec<u16>) -> Self {
        Self { words, ext_version: 0 }
    }

    /// Creates an executable tagged with an extension version.
    ///
    /// A version of 0 is the standard format; the extended on-disk header
    /// is only emitted for non-zero versions.
    pub fn new_extended(words: Vec<u16>, ext_version: u16) -> Self {
        Self { words, ext_version }
    }

    /// The machine words of this image.
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// The number of machine words in this image.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether this image has no machine words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The extension version of this image (0 for the standard format).
    pub fn ext_version(&self) -> u16 {
        self.ext_version
    }
}

/// Error from assembling a statement sequence.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AsmErr {
    /// The program failed validation. This is a user error.
    Validate(ValidateErr),
    /// Code generation hit a value validation should have rejected.
    /// This indicates a defect in the assembler, not in the program.
    Codegen(CodegenErr),
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsmErr::Validate(e) => e.fmt(f),
            AsmErr::Codegen(e) => e.fmt(f),
        }
    }
}
impl std::error::Error for AsmErr {}
impl crate::err::Error for AsmErr {
    fn line(&self) -> Option<usize> {
        match self {
            AsmErr::Validate(e) => crate::err::Error::line(e),
            AsmErr::Codegen(e) => crate::err::Error::line(e),
        }
    }

    fn help(&self) -> Option<Cow<str>> {
        match self {
            AsmErr::Validate(e) => e.help(),
            AsmErr::Codegen(e) => e.help(),
        }
    }
}
impl From<ValidateErr> for AsmErr {
    fn from(e: ValidateErr) -> Self {
        AsmErr::Validate(e)
    }
}
impl From<CodegenErr> for AsmErr {
    fn from(e: CodegenErr) -> Self {
        AsmErr::Codegen(e)
    }
}

/// Error from validating a statement sequence.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ValidateErr {
    /// The kind of error.
    pub kind: ValidateErrKind,
    /// The source line (0-indexed) of the offending statement.
    pub line: usize,
}

/// The kinds of validation errors.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ValidateErrKind {
    /// A zero-operand mnemonic was given an operand.
    UnexpectedOperand(Mnemonic),
    /// A mnemonic that addresses memory was given no operand.
    MissingOperand(Mnemonic),
    /// A `DAT` statement has no label naming it.
    DatWithoutLabel,
    /// A label contains characters other than ASCII letters.
    InvalidLabel(String),
    /// A label is declared at more than one address.
    DuplicateLabel(String),
    /// An operand refers to a label no statement declares.
    UnresolvedLabel(String),
    /// An operand is neither a label nor a decimal number.
    NotNumeric(String),
    /// A numeric operand does not fit its field.
    OperandOutOfRange {
        /// The operand text.
        text: String,
        /// The largest value the field admits.
        max: u16,
    },
    /// The sequence has more statements than the machine has memory.
    ProgramTooBig(usize),
}
impl std::fmt::Display for ValidateErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ValidateErrKind::UnexpectedOperand(m)       => write!(f, "{m} does not take an operand"),
            ValidateErrKind::MissingOperand(m)          => write!(f, "{m} requires an operand"),
            ValidateErrKind::DatWithoutLabel            => write!(f, "DAT must have a label"),
            ValidateErrKind::InvalidLabel(l)            => write!(f, "invalid label {l:?}"),
            ValidateErrKind::DuplicateLabel(l)          => write!(f, "label {l:?} is already declared"),
            ValidateErrKind::UnresolvedLabel(l)         => write!(f, "label {l:?} doesn't exist"),
            ValidateErrKind::NotNumeric(t)              => write!(f, "operand {t:?} is not a number or label"),
            ValidateErrKind::OperandOutOfRange { text, max } => write!(f, "operand {text:?} does not fit in 0-{max}"),
            ValidateErrKind::ProgramTooBig(n)           => write!(f, "program has {n} statements but the machine only has {MEM_SIZE} memory words"),
        }
    }
}
impl std::error::Error for ValidateErr {}
impl crate::err::Error for ValidateErr {
    fn line(&self) -> Option<usize> {
        Some(self.line)
    }

    fn help(&self) -> Option<Cow<str>> {
        match &self.kind {
            ValidateErrKind::DatWithoutLabel => Some("unnamed data cannot be referenced; give the DAT a label".into()),
            ValidateErrKind::InvalidLabel(_) => Some("labels consist of ASCII letters only".into()),
            ValidateErrKind::OperandOutOfRange { max, .. } if *max == ADDR_MAX => {
                Some(format!("addresses run from 0 to {ADDR_MAX}").into())
            },
            ValidateErrKind::OperandOutOfRange { .. } => {
                Some(format!("a machine word holds at most {WORD_MAX}").into())
            },
            _ => None,
        }
    }
}

/// Error from generating code for a validated statement sequence.
///
/// These only occur if code generation is handed statements that did not
/// pass [`validate`], so hitting one is a defect in the caller.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CodegenErr {
    /// A resolved operand or data value exceeds its field's range.
    ValueOutOfRange {
        /// The source line (0-indexed) of the offending statement.
        line: usize,
        /// The resolved value.
        value: u32,
        /// The largest value the field admits.
        max: u16,
    },
    /// An operand could not be resolved to a value at all.
    UnresolvedOperand {
        /// The source line (0-indexed) of the offending statement.
        line: usize,
        /// The operand text.
        text: String,
    },
    /// The sequence has more statements than the machine has memory.
    TooManyStatements(usize),
}
impl std::fmt::Display for CodegenErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenErr::ValueOutOfRange { value, max, .. } => {
                write!(f, "codegen produced value {value} outside 0-{max}")
            },
            CodegenErr::UnresolvedOperand { text, .. } => {
                write!(f, "codegen could not resolve operand {text:?}")
            },
            CodegenErr::TooManyStatements(n) => {
                write!(f, "codegen was handed {n} statements but memory holds {MEM_SIZE}")
            },
        }
    }
}
impl std::error::Error for CodegenErr {}
impl crate::err::Error for CodegenErr {
    fn line(&self) -> Option<usize> {
        match self {
            CodegenErr::ValueOutOfRange { line, .. } => Some(*line),
            CodegenErr::UnresolvedOperand { line, .. } => Some(*line),
            CodegenErr::TooManyStatements(_) => None,
        }
    }

    fn help(&self) -> Option<Cow<str>> {
        Some("this indicates a bug in the assembler, not in the program".into())
    }
}

/// The opcode prefix of an addressing mnemonic.
///
/// The IO family (INP, OUT, HLT) and DAT encode without an opcode prefix
/// and return `None`.
fn opcode_prefix(m: Mnemonic) -> Option<u16> {
    match m {
        Mnemonic::ADD => Some(1),
        Mnemonic::SUB => Some(2),
        Mnemonic::STA => Some(3),
        Mnemonic::LDA => Some(5),
        Mnemonic::BRA => Some(6),
        Mnemonic::BRZ => Some(7),
        Mnemonic::BRP => Some(8),
        Mnemonic::INP | Mnemonic::OUT | Mnemonic::HLT | Mnemonic::DAT => None,
    }
}

fn is_label_text(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Validates a statement sequence, resolving labels into a [`SymbolTable`].
///
/// The sequence must fit in memory (at most [`MEM_SIZE`] statements).
/// Three passes then run in order, stopping at the first error:
/// 1. operand arity: zero-operand mnemonics take no operand, addressing
///    mnemonics require one (`DAT`'s operand stays optional);
/// 2. labels: `DAT` must be labeled; every label must be alphabetic and
///    declared only once, and is bound to its statement's address;
/// 3. operand references: alphabetic operands must name a declared label,
///    numeric operands must be all digits and fit their field
///    (0-[`ADDR_MAX`] for instructions, 0-[`WORD_MAX`] for `DAT`).
pub fn validate(stmts: &[Stmt]) -> Result<SymbolTable, ValidateErr> {
    let err = |kind, line| ValidateErr { kind, line };

    if stmts.len() > MEM_SIZE {
        return Err(err(ValidateErrKind::ProgramTooBig(stmts.len()), stmts[MEM_SIZE].line));
    }

    for stmt in stmts {
        if stmt.mnemonic.is_nullary() {
            if stmt.operand.is_some() {
                return Err(err(ValidateErrKind::UnexpectedOperand(stmt.mnemonic), stmt.line));
            }
        } else if stmt.mnemonic != Mnemonic::DAT && stmt.operand.is_none() {
            return Err(err(ValidateErrKind::MissingOperand(stmt.mnemonic), stmt.line));
        }
    }

    let mut sym = SymbolTable::new();
    for (addr, stmt) in stmts.iter().enumerate() {
        if stmt.mnemonic == Mnemonic::DAT && stmt.label.is_none() {
            return Err(err(ValidateErrKind::DatWithoutLabel, stmt.line));
        }
        if let Some(label) = &stmt.label {
            if !is_label_text(label) {
                return Err(err(ValidateErrKind::InvalidLabel(label.clone()), stmt.line));
            }
            if sym.lookup_label(label).is_some() {
                return Err(err(ValidateErrKind::DuplicateLabel(label.clone()), stmt.line));
            }
            sym.add_label(label, addr as u16);
        }
    }

    for stmt in stmts {
        let Some(op) = &stmt.operand else { continue };

        if is_label_text(op) {
            if sym.lookup_label(op).is_none() {
                return Err(err(ValidateErrKind::UnresolvedLabel(op.clone()), stmt.line));
            }
        } else {
            if !op.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err(ValidateErrKind::NotNumeric(op.clone()), stmt.line));
            }
            let max = match stmt.mnemonic {
                Mnemonic::DAT => WORD_MAX,
                _ => ADDR_MAX,
            };
            match op.parse::<u32>() {
                Ok(n) if n <= u32::from(max) => {},
                _ => return Err(err(
                    ValidateErrKind::OperandOutOfRange { text: op.clone(), max },
                    stmt.line,
                )),
            }
        }
    }

    Ok(sym)
}

/// Generates the executable image for a validated statement sequence.
///
/// The image always spans the machine's full [`MEM_SIZE`] words; addresses
/// past the last statement stay zero, which decodes as HLT. Sequence size
/// and operand ranges are checked again here even though [`validate`]
/// already did, so a malformed or truncated image can never be emitted.
pub fn codegen(stmts: &[Stmt], sym: &SymbolTable) -> Result<Executable, CodegenErr> {
    if stmts.len() > MEM_SIZE {
        return Err(CodegenErr::TooManyStatements(stmts.len()));
    }

    let mut words = vec![0u16; MEM_SIZE];

    for (addr, stmt) in stmts.iter().enumerate() {
        words[addr] = match stmt.mnemonic {
            Mnemonic::INP => 901,
            Mnemonic::OUT => 902,
            Mnemonic::HLT => 0,
            m => {
                let value = match &stmt.operand {
                    None => 0,
                    Some(op) => match sym.lookup_label(op) {
                        Some(a) => u32::from(a),
                        None => op.parse::<u32>().map_err(|_| CodegenErr::UnresolvedOperand {
                            line: stmt.line,
                            text: op.clone(),
                        })?,
                    },
                };

                let max = match m {
                    Mnemonic::DAT => WORD_MAX,
                    _ => ADDR_MAX,
                };
                if value > u32::from(max) {
                    return Err(CodegenErr::ValueOutOfRange { line: stmt.line, value, max });
                }

                match opcode_prefix(m) {
                    Some(op) => op * 100 + value as u16,
                    None => value as u16,
                }
            },
        };
    }

    Ok(Executable::new(words))
}

/// Assembles a statement sequence into an executable image.
///
/// This validates the statements and then generates code for them;
/// see [`validate`] and [`codegen`].
pub fn assemble(stmts: &[Stmt]) -> Result<Executable, AsmErr> {
    let sym = validate(stmts)?;
    let ex = codegen(stmts, &sym)?;
    Ok(ex)
}
