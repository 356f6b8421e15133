//! Error types shared by the readers, writers and sequence algorithms.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

fn at_line(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" at line {}", line),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("compression error: {0}")]
    Compression(#[from] niffler::Error),

    /// Structural violation: wrong column count, unbalanced `<...>`, missing header line.
    #[error("format error{}: {msg}", at_line(.line))]
    Format { line: Option<usize>, msg: String },

    /// A field's text could not be converted to its declared type.
    #[error("parse error{}: invalid {field} {value:?}", at_line(.line))]
    Parse {
        line: Option<usize>,
        field: &'static str,
        value: String,
    },

    /// Binary length or type-tag inconsistency, or a dictionary index out of range.
    #[error("decode error at byte {offset}: {msg}")]
    Decode { offset: u64, msg: String },

    #[error("key not found: {0}")]
    Key(String),

    #[error("sample index {index} out of range for {len} samples")]
    Index { index: usize, len: usize },

    #[error("sequences differ in length: {left} != {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    Dimension { expected: usize, found: usize },
}

impl Error {
    pub(crate) fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format {
            line: None,
            msg: msg.into(),
        }
    }

    pub(crate) fn parse<S: Into<String>>(field: &'static str, value: S) -> Self {
        Error::Parse {
            line: None,
            field,
            value: value.into(),
        }
    }

    pub(crate) fn decode<S: Into<String>>(offset: u64, msg: S) -> Self {
        Error::Decode {
            offset,
            msg: msg.into(),
        }
    }

    /// Attach a line number to text-level errors that do not carry one yet.
    pub(crate) fn at_line(self, n: usize) -> Self {
        match self {
            Error::Format { line: None, msg } => Error::Format { line: Some(n), msg },
            Error::Parse {
                line: None,
                field,
                value,
            } => Error::Parse {
                line: Some(n),
                field,
                value,
            },
            other => other,
        }
    }

    /// Shift a block-relative decode offset to an absolute stream offset.
    pub(crate) fn at_offset(self, base: u64) -> Self {
        match self {
            Error::Decode { offset, msg } => Error::Decode {
                offset: base + offset,
                msg,
            },
            other => other,
        }
    }
}
