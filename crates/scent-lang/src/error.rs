//! Error handling for the Scent evaluator.

use scent_core::ErrorKind;

/// An error raised while scanning or evaluating a Scent document.
///
/// Every error is fatal for the current compilation; there is no
/// recovery. Errors carry the 1-based source line they were raised on
/// when it is known.
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

    pub fn type_error<T: Into<String>>(message: T) -> Error {
        Error::new(ErrorKind::Type, message)
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

impl From<scent_asm::Error> for Error {
    fn from(e: scent_asm::Error) -> Error {
        Error {
            kind: e.kind,
            message: e.message,
            line: e.line,
        }
    }
}
