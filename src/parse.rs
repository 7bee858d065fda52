//! Parsing LMC assembly source code into a statement sequence.
//!
//! This module is used to convert source text into a list of statements
//! ([`Stmt`]), which can then be assembled into an executable image
//! (see the [`asm`] module).
//!
//! The parser scans the raw token stream produced by [`lex`] line by line:
//! - blank lines and comment-only lines are dropped without producing a statement,
//! - every other line must reduce to `[LABEL] MNEMONIC [OPERAND]`.
//!
//! The statement at index *i* of the resulting sequence occupies memory
//! address *i* of the assembled image.
//!
//! # Example
//! ```
//! use lmc_ensemble::parse::parse_program;
//!
//! let stmts = parse_program("
//!     INP       ; read a number
//!     STA num
//!     OUT
//!     HLT
//!     num DAT 0
//! ").unwrap();
//!
//! assert_eq!(stmts.len(), 5);
//! assert_eq!(stmts[1].operand.as_deref(), Some("num"));
//! assert_eq!(stmts[4].label.as_deref(), Some("num"));
//! ```
//!
//! [`asm`]: crate::asm

pub mod lex;

use logos::Logos;

use crate::asm::MEM_SIZE;
use lex::{LexErrKind, Mnemonic, Token};

/// One statement of an LMC program, i.e. one non-blank source line.
///
/// The operand (if any) is kept as raw text here: deciding whether it is a
/// label reference or a numeric literal is the validator's job
/// (see [`validate`]), so that malformed operands surface as validation
/// errors naming the statement, not as parse failures.
///
/// [`validate`]: crate::asm::validate
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Stmt {
    /// The label defined at this statement's address, if any.
    pub label: Option<String>,
    /// The instruction keyword.
    pub mnemonic: Mnemonic,
    /// The raw operand text, if any.
    pub operand: Option<String>,
    /// The source line (0-indexed) this statement came from.
    pub line: usize,
}

/// Error from parsing LMC source code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LexErr {
    /// The kind of error.
    pub kind: LexErrKind,
    /// The source line (0-indexed) the error occurred on.
    pub line: usize,
    /// The text of the offending line.
    pub text: String,
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.text.is_empty() {
            true  => self.kind.fmt(f),
            false => write!(f, "{}: {:?}", self.kind, self.text),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn line(&self) -> Option<usize> {
        Some(self.line)
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self.kind {
            LexErrKind::TooManyFields      => Some("a line is at most LABEL MNEMONIC OPERAND".into()),
            LexErrKind::DuplicateMnemonic  => Some("only one mnemonic is allowed per line".into()),
            LexErrKind::DuplicateOperand   => Some("only one operand is allowed per line".into()),
            LexErrKind::MissingMnemonic    => Some("every statement needs a mnemonic, e.g. ADD, STA, HLT".into()),
            LexErrKind::ProgramTooBig      => Some(format!("the machine has {MEM_SIZE} memory words, one per statement").into()),
            LexErrKind::UnrecognizedSymbol => None,
        }
    }
}

/// Parses a source string into a sequence of statements.
///
/// Blank and comment-only lines produce no statement. Any malformed line
/// aborts the parse with a [`LexErr`]; no partial sequence is returned.
pub fn parse_program(src: &str) -> Result<Vec<Stmt>, LexErr> {
    let mut stmts = vec![];

    let mut lexer = Token::lexer(src);
    let mut line = 0;
    let mut fields = vec![];

    let err = |kind, line| LexErr {
        kind,
        line,
        text: src.lines().nth(line).unwrap_or("").trim().to_string(),
    };

    while let Some(m_token) = lexer.next() {
        match m_token {
            Ok(Token::Field(f)) => fields.push(f),
            Ok(Token::Comment) => {},
            Ok(Token::NewLine) => {
                if !fields.is_empty() {
                    stmts.push(classify_line(std::mem::take(&mut fields), line)
                        .map_err(|kind| err(kind, line))?);
                }
                line += 1;
            },
            Err(kind) => return Err(err(kind, line)),
        }
    }
    // Last line has no trailing newline.
    if !fields.is_empty() {
        stmts.push(classify_line(fields, line)
            .map_err(|kind| err(kind, line))?);
    }

    if stmts.len() > MEM_SIZE {
        return Err(err(LexErrKind::ProgramTooBig, stmts[MEM_SIZE].line));
    }

    Ok(stmts)
}

/// Classifies the fields of one line into label, mnemonic, and operand.
///
/// The mnemonic may only appear in the first two fields: field 0 directly,
/// or field 1 with a label in front of it. Anything after the mnemonic is
/// the (single) operand.
fn classify_line(fields: Vec<String>, line: usize) -> Result<Stmt, LexErrKind> {
    if fields.len() > 3 {
        return Err(LexErrKind::TooManyFields);
    }

    let m_pos = fields.iter()
        .take(2)
        .position(|f| f.parse::<Mnemonic>().is_ok());
    let Some(pos) = m_pos else {
        return Err(LexErrKind::MissingMnemonic);
    };

    // The line is MNE [OP]; there is no label slot to justify a third field.
    if pos == 0 && fields.len() == 3 {
        return Err(LexErrKind::TooManyFields);
    }

    let mut fields = fields.into_iter();
    let label = (pos == 1).then(|| fields.next().unwrap_or_default());
    let mnemonic = fields.next()
        .and_then(|f| f.parse::<Mnemonic>().ok())
        .ok_or(LexErrKind::MissingMnemonic)?;

    let mut operand = None;
    for field in fields {
        if field.parse::<Mnemonic>().is_ok() {
            return Err(LexErrKind::DuplicateMnemonic);
        }
        if operand.is_some() {
            return Err(LexErrKind::DuplicateOperand);
        }
        operand = Some(field);
    }

    Ok(Stmt { label, mnemonic, operand, line })
}

#[cfg(test)]
mod tests {
    use super::lex::{LexErrKind, Mnemonic};
    use super::{parse_program, LexErr, Stmt};

    fn assert_lex_fail(r: Result<Vec<Stmt>, LexErr>, kind: LexErrKind) {
        assert_eq!(r.unwrap_err().kind, kind);
    }

    #[test]
    fn test_basic_program() {
        let stmts = parse_program("loop LDA count\nADD one\nOUT\nend HLT\ncount DAT 0\none DAT 1").unwrap();

        assert_eq!(stmts.len(), 6);
        assert_eq!(stmts[0], Stmt {
            label: Some("loop".to_string()),
            mnemonic: Mnemonic::LDA,
            operand: Some("count".to_string()),
            line: 0,
        });
        assert_eq!(stmts[2], Stmt {
            label: None,
            mnemonic: Mnemonic::OUT,
            operand: None,
            line: 2,
        });
        assert_eq!(stmts[5], Stmt {
            label: Some("one".to_string()),
            mnemonic: Mnemonic::DAT,
            operand: Some("1".to_string()),
            line: 5,
        });
    }

    #[test]
    fn test_blank_and_comment_lines_dropped() {
        let stmts = parse_program("\n  \t \nINP\n; just a comment\nOUT ; trailing\n\nHLT\n").unwrap();

        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0].mnemonic, Mnemonic::INP);
        assert_eq!(stmts[0].line, 2);
        assert_eq!(stmts[1].mnemonic, Mnemonic::OUT);
        assert_eq!(stmts[1].operand, None);
        assert_eq!(stmts[2].mnemonic, Mnemonic::HLT);
        assert_eq!(stmts[2].line, 6);
    }

    #[test]
    fn test_four_fields_rejected() {
        assert_lex_fail(parse_program("a LDA b c"), LexErrKind::TooManyFields);
    }

    #[test]
    fn test_three_fields_without_label_rejected() {
        // The mnemonic is first, so there is no label to account for a third field.
        assert_lex_fail(parse_program("LDA b c"), LexErrKind::TooManyFields);
    }

    #[test]
    fn test_missing_mnemonic() {
        assert_lex_fail(parse_program("hello world"), LexErrKind::MissingMnemonic);
        assert_lex_fail(parse_program("justalabel"), LexErrKind::MissingMnemonic);
        // A mnemonic in the third field does not count.
        assert_lex_fail(parse_program("a b ADD"), LexErrKind::MissingMnemonic);
    }

    #[test]
    fn test_duplicate_mnemonic() {
        assert_lex_fail(parse_program("lbl ADD SUB"), LexErrKind::DuplicateMnemonic);
    }

    #[test]
    fn test_error_carries_line_and_text() {
        let e = parse_program("INP\nOUT\nx y z w").unwrap_err();
        assert_eq!(e.kind, LexErrKind::TooManyFields);
        assert_eq!(e.line, 2);
        assert_eq!(e.text, "x y z w");
    }

    #[test]
    fn test_program_too_big() {
        let src = "HLT\n".repeat(100);
        assert_eq!(parse_program(&src).unwrap().len(), 100);

        let src = "HLT\n".repeat(101);
        assert_lex_fail(parse_program(&src), LexErrKind::ProgramTooBig);
    }

    #[test]
    fn test_last_line_without_newline() {
        let stmts = parse_program("INP\nHLT").unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1].mnemonic, Mnemonic::HLT);
        assert_eq!(stmts[1].line, 1);
    }
}
