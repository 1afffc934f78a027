//! Synthetic communication-workload generation and replay.
//!
//! A workload is recorded as a [`trace::Trace`]: an ordered list of
//! point-to-point transfers plus the header a replaying process needs to
//! size its buffer and pace itself. Traces are produced by one of the two
//! generators in [`generate`] and executed by the [`replay`] engine over
//! any [`transport::Transport`] implementation.
use std::fmt;
use std::io;

pub mod generate;
pub mod matrix;
pub mod replay;
pub mod trace;
pub mod transport;

#[derive(Debug)]
pub enum Error {
    /// Missing or out-of-range generation parameter
    Config(String),

    /// File open/read/write failure
    Io(io::Error),

    /// Malformed trace or matrix content
    Format(String),

    /// Launched rank count too small for the trace
    Topology(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Io(err) => write!(f, "i/o error: {}", err),
            Error::Format(msg) => write!(f, "format error: {}", msg),
            Error::Topology(msg) => write!(f, "topology error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
