//! Tokenizing LMC assembly.
//!
//! This module holds the raw tokens that characterize LMC assembly ([`Token`]),
//! as well as the instruction keyword set ([`Mnemonic`]).
//! This module is used by the parser to facilitate the conversion of
//! assembly source code into a statement sequence.
//!
//! LMC assembly has a flat, line-oriented grammar: each line is at most three
//! whitespace-delimited fields (`[LABEL] MNEMONIC [OPERAND]`), with `;`
//! starting a comment that spans the rest of the line. The lexer therefore
//! only distinguishes fields, comments, and line breaks; classifying a field
//! as label, mnemonic, or operand is the parser's job.

use logos::Logos;

/// A unit of information in LMC source code.
#[derive(Debug, Logos, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+", error = LexErrKind)]
pub enum Token {
    /// A whitespace-delimited field.
    ///
    /// This can be a label, a mnemonic, or an operand;
    /// the parser decides which based on position and the mnemonic set.
    #[regex(r"[^ \t\r\n;]+", |lx| lx.slice().to_string())]
    Field(String),

    /// A comment, which starts with a semicolon and spans the remaining part of the line.
    #[regex(r";[^\n]*")]
    Comment,

    /// A new line
    #[token("\n")]
    NewLine,
}

macro_rules! mnemonic_enum {
    ($($instr:ident = $doc:literal),+ $(,)?) => {
        /// An instruction keyword of LMC assembly.
        ///
        /// Mnemonic matching is case-insensitive ([`FromStr`]),
        /// but the mnemonic is always rendered uppercase ([`Display`]).
        ///
        /// [`FromStr`]: std::str::FromStr
        /// [`Display`]: std::fmt::Display
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum Mnemonic {
            $(
                #[doc = $doc]
                $instr
            ),+
        }

        impl std::str::FromStr for Mnemonic {
            type Err = NotMnemonic;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match &*s.to_uppercase() {
                    $(stringify!($instr) => Ok(Self::$instr)),*,
                    _ => Err(NotMnemonic)
                }
            }
        }

        impl std::fmt::Display for Mnemonic {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$instr => f.write_str(stringify!($instr))),*
                }
            }
        }
    };
}
mnemonic_enum! {
    ADD = "Add a memory word to the accumulator.",
    SUB = "Subtract a memory word from the accumulator.",
    STA = "Store the accumulator into a memory word.",
    LDA = "Load a memory word into the accumulator.",
    BRA = "Branch unconditionally.",
    BRZ = "Branch if the accumulator is zero.",
    BRP = "Branch if the accumulator is non-negative.",
    INP = "Read a number from the input device into the accumulator.",
    OUT = "Write the accumulator to the output device.",
    HLT = "Halt execution.",
    DAT = "Reserve a (labeled) data word.",
}

/// Marker error indicating a field is not in the mnemonic set.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NotMnemonic;

impl Mnemonic {
    /// Whether this mnemonic forbids an operand (`INP`, `OUT`, `HLT`).
    pub fn is_nullary(self) -> bool {
        matches!(self, Mnemonic::INP | Mnemonic::OUT | Mnemonic::HLT)
    }
}

/// Kinds of errors that can be raised in attempting to tokenize and
/// classify a line of LMC source.
///
/// See [`LexErr`] for this error type with line information included.
///
/// [`LexErr`]: crate::parse::LexErr
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErrKind {
    /// Line has more than three fields (or three with no leading label).
    TooManyFields,
    /// A second field matching the mnemonic set appeared after the mnemonic.
    DuplicateMnemonic,
    /// A second field appeared after the operand.
    DuplicateOperand,
    /// No field in the label/mnemonic positions matched the mnemonic set.
    MissingMnemonic,
    /// The program has more statements than the machine has memory words.
    ProgramTooBig,
    /// A symbol occurred which no token of LMC assembly contains.
    #[default]
    UnrecognizedSymbol,
}
impl std::fmt::Display for LexErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErrKind::TooManyFields      => f.write_str("too many tokens"),
            LexErrKind::DuplicateMnemonic  => f.write_str("duplicate mnemonic"),
            LexErrKind::DuplicateOperand   => f.write_str("duplicate operand"),
            LexErrKind::MissingMnemonic    => f.write_str("missing or invalid mnemonic"),
            LexErrKind::ProgramTooBig      => f.write_str("program exceeds machine memory"),
            LexErrKind::UnrecognizedSymbol => f.write_str("unrecognized symbol"),
        }
    }
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use super::{Mnemonic, Token};

    fn field(s: &str) -> Token {
        Token::Field(s.to_string())
    }

    #[test]
    fn test_fields_and_comments() {
        let mut tokens = Token::lexer("loop LDA count ; increments\nOUT");
        assert_eq!(tokens.next(), Some(Ok(field("loop"))));
        assert_eq!(tokens.next(), Some(Ok(field("LDA"))));
        assert_eq!(tokens.next(), Some(Ok(field("count"))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comment)));
        assert_eq!(tokens.next(), Some(Ok(Token::NewLine)));
        assert_eq!(tokens.next(), Some(Ok(field("OUT"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_comment_to_end_of_line() {
        let mut tokens = Token::lexer(";abc def\nHLT");
        assert_eq!(tokens.next(), Some(Ok(Token::Comment)));
        assert_eq!(tokens.next(), Some(Ok(Token::NewLine)));
        assert_eq!(tokens.next(), Some(Ok(field("HLT"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_tabs_and_crlf() {
        let mut tokens = Token::lexer("\tADD\tone\r\nSUB two");
        assert_eq!(tokens.next(), Some(Ok(field("ADD"))));
        assert_eq!(tokens.next(), Some(Ok(field("one"))));
        assert_eq!(tokens.next(), Some(Ok(Token::NewLine)));
        assert_eq!(tokens.next(), Some(Ok(field("SUB"))));
        assert_eq!(tokens.next(), Some(Ok(field("two"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_mnemonic_case_insensitivity() {
        for s in ["ADD", "add", "Add", "aDd"] {
            assert_eq!(s.parse(), Ok(Mnemonic::ADD));
        }
        for s in ["hlt", "HLT"] {
            assert_eq!(s.parse(), Ok(Mnemonic::HLT));
        }
        assert!("ADDD".parse::<Mnemonic>().is_err());
        assert!("count".parse::<Mnemonic>().is_err());
        assert!("91".parse::<Mnemonic>().is_err());
    }

    #[test]
    fn test_nullary_set() {
        let nullary = [Mnemonic::INP, Mnemonic::OUT, Mnemonic::HLT];
        let unary = [
            Mnemonic::ADD, Mnemonic::SUB, Mnemonic::STA, Mnemonic::LDA,
            Mnemonic::BRA, Mnemonic::BRZ, Mnemonic::BRP, Mnemonic::DAT,
        ];
        assert!(nullary.iter().all(|m| m.is_nullary()));
        assert!(unary.iter().all(|m| !m.is_nullary()));
    }
}
