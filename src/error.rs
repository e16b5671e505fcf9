use std::fmt;
use std::io;

/// Errors that abort parsing of a whole file. Per-field metadata problems
/// never surface here; they degrade to documented defaults instead.
#[derive(Debug)]
pub enum FcsError {
    Io(io::Error),
    /// The 6-byte version tag does not start with the FCS family prefix.
    NotAnFcsFile,
    /// The buffer ends before the fixed-offset header block.
    TruncatedHeader,
    /// The TEXT or DATA offset fields are not decimal numbers.
    BadSegmentOffsets(String),
    /// The declared $DATATYPE tag is none of I, F, D, A.
    UnsupportedDataType(String),
}

impl fmt::Display for FcsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FcsError::Io(err) => write!(f, "IO error: {}", err),
            FcsError::NotAnFcsFile => write!(f, "not a recognized FCS file"),
            FcsError::TruncatedHeader => write!(f, "file ends inside the fixed header"),
            FcsError::BadSegmentOffsets(field) => {
                write!(f, "unparsable {} segment offsets", field)
            }
            FcsError::UnsupportedDataType(tag) => {
                write!(f, "unsupported data representation '{}'", tag)
            }
        }
    }
}

impl std::error::Error for FcsError {}

impl From<io::Error> for FcsError {
    fn from(err: io::Error) -> FcsError {
        FcsError::Io(err)
    }
}
