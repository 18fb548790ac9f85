use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    InvalidData(String),
    InvalidConfig(String),
    InvalidShape(String),
    /// A weight vector or matrix does not have the size its consumer expects.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Zero-norm row encountered while computing a cosine similarity.
    DegenerateVector { row: usize },
    /// The argument of a logarithm was not strictly positive.
    InvalidLogDomain(f32),
    VocabularyMiss(String),
    UnknownPosTag(String),
    ResourceLoad { path: String, reason: String },
    /// Serializing or writing a file failed.
    ResourceWrite { path: String, reason: String },
    /// Training produced a NaN or infinite value.
    NonFinite { iteration: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn resource(path: &std::path::Path, reason: impl fmt::Display) -> Self {
        Error::ResourceLoad {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn resource_write(path: &std::path::Path, reason: impl fmt::Display) -> Self {
        Error::ResourceWrite {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
            Error::ShapeMismatch {
                what,
                expected,
                actual,
            } => write!(f, "shape mismatch: {what} expected {expected}, got {actual}"),
            Error::DegenerateVector { row } => {
                write!(f, "degenerate vector: row {row} has zero norm")
            }
            Error::InvalidLogDomain(v) => {
                write!(f, "invalid log domain: log({v}) is undefined")
            }
            Error::VocabularyMiss(word) => write!(f, "vocabulary miss: {word:?}"),
            Error::UnknownPosTag(tag) => write!(f, "unknown POS tag: {tag:?}"),
            Error::ResourceLoad { path, reason } => {
                write!(f, "failed to load {path}: {reason}")
            }
            Error::ResourceWrite { path, reason } => {
                write!(f, "failed to write {path}: {reason}")
            }
            Error::NonFinite { iteration } => {
                write!(f, "non-finite value encountered at iteration {iteration}")
            }
        }
    }
}

impl std::error::Error for Error {}
