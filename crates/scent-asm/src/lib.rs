//! # Scent assembly
//!
//! This crate implements the low-level instruction language of the Scent
//! compiler, called Scent assembly. A Scent assembly program is a textual
//! sequence of PDF content-stream instructions together with the page and
//! resource declarations they need:
//!
//! ```text
//! scent-assembly 1.0
//! ' A minimal one-page document.
//! font_standard F1 Helvetica
//! begin page
//! dim 595.27559 841.88976
//! body
//! begin text -
//! font F1 12
//! advance 72 720
//! write "Hello, world"
//! end text
//! end page
//! ```
//!
//! The crate is organised in three layers:
//!
//! - [`parse`] turns source lines into typed [`Instruction`] values,
//!   checking token classes and arity.
//! - [`Machine`] enforces the layered state machine of the language
//!   (top level, page header, page body with its initial/path/text
//!   sub-modes), validates instruction arguments, and dispatches.
//! - [`Assembler`] is the strategy the machine drives: one hook per
//!   instruction, receiving pre-validated arguments. [`TextAssembler`]
//!   re-emits canonical assembly text; the PDF assembler lives in the
//!   `scent-pdf` crate.
//!
//! Higher layers (the Scent evaluator) can skip the text format entirely
//! and feed [`Instruction`] values straight into [`Machine::execute`].

use scent_core::ErrorKind;

mod assembler;
mod inst;
mod lexer;
mod machine;
pub mod parse;

pub use assembler::{Assembler, TextAssembler};
pub use inst::{BoxCorners, Instruction, LineCap, LineJoin, PaintRule};
pub use machine::Machine;

/// The header line every assembly source must start with.
pub const HEADER: &str = "scent-assembly 1.0";

/// An error raised while parsing or executing Scent assembly.
///
/// Errors raised while running assembly text carry the 1-based source
/// line they were raised on; errors from directly executed instructions
/// carry none.
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
}

impl Error {
    pub fn new<T: Into<String>>(kind: ErrorKind, message: T) -> Error {
        Error {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn syntax<T: Into<String>>(message: T) -> Error {
        Error::new(ErrorKind::Syntax, message)
    }

    pub fn state<T: Into<String>>(message: T) -> Error {
        Error::new(ErrorKind::State, message)
    }

    pub fn name<T: Into<String>>(message: T) -> Error {
        Error::new(ErrorKind::Name, message)
    }

    pub fn domain<T: Into<String>>(message: T) -> Error {
        Error::new(ErrorKind::Domain, message)
    }

    pub fn resource<T: Into<String>>(message: T) -> Error {
        Error::new(ErrorKind::Resource, message)
    }

    /// Attach a source line, unless one is already recorded.
    pub fn at_line(mut self, line: usize) -> Error {
        self.line.get_or_insert(line);
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write![f, "line {line}: {}: {}", self.kind, self.message],
            None => write![f, "{}: {}", self.kind, self.message],
        }
    }
}

impl std::error::Error for Error {}
