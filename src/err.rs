//! Error diagnostic handling for this crate.
//!
//! Every stage of the toolchain (lexing, validation, code generation,
//! executable encoding, simulation) defines its own error enum.
//! This module holds the [`Error`] trait, which those error types implement
//! so that frontends can render them uniformly.
//!
//! LMC programs map one statement to one memory address, so diagnostics here
//! are line-indexed rather than span-indexed: an error that can be tied to a
//! source line exposes it through [`Error::line`].

use std::borrow::Cow;

/// Unified error interface for this crate.
///
/// All of the error types of this crate ([`LexErr`], [`AsmErr`], [`FormatErr`], [`SimErr`], etc.)
/// implement this trait.
///
/// [`LexErr`]: crate::parse::LexErr
/// [`AsmErr`]: crate::asm::AsmErr
/// [`FormatErr`]: crate::asm::encoding::FormatErr
/// [`SimErr`]: crate::sim::SimErr
pub trait Error: std::error::Error {
    /// The source line (0-indexed) tied to this error, if there is one.
    fn line(&self) -> Option<usize> {
        None
    }

    /// A possible help message that could be displayed to aid the user.
    fn help(&self) -> Option<Cow<str>> {
        None
    }
}

/// Renders an error in a form suitable for terminal output, including
/// its line number (displayed 1-indexed) and help text when available.
pub fn report(err: &dyn Error) -> String {
    use std::fmt::Write;

    let mut buf = String::new();

    match err.line() {
        Some(line) => { let _ = write!(buf, "error (line {}): {err}", line + 1); },
        None       => { let _ = write!(buf, "error: {err}"); },
    }
    if let Some(help) = err.help() {
        let _ = write!(buf, "\n  help: {help}");
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::{report, Error};

    #[derive(Debug)]
    struct Oops;
    impl std::fmt::Display for Oops {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("something broke")
        }
    }
    impl std::error::Error for Oops {}
    impl Error for Oops {
        fn line(&self) -> Option<usize> {
            Some(4)
        }
        fn help(&self) -> Option<std::borrow::Cow<str>> {
            Some("unbreak it".into())
        }
    }

    #[test]
    fn test_report_includes_line_and_help() {
        let msg = report(&Oops);
        assert_eq!(msg, "error (line 5): something broke\n  help: unbreak it");
    }
}
