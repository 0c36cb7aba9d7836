//! `chwire` error types.
use std::{backtrace::Backtrace, fmt, io, time::Duration};

use crate::{
    binary::DecodeError,
    connection::ParseError,
    pool::NoAvailableHost,
    protocol::{ProtocolError, ServerException},
    types::TypeError,
};

/// A specialized [`Result`] type for `chwire` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `chwire` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Attach a context message, displayed before the error itself.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Returns the raw length the input must reach before decoding can be retried,
    /// if this error is a truncated input.
    pub(crate) fn incomplete(&self) -> Option<usize> {
        match self.kind {
            ErrorKind::Decode(DecodeError::Incomplete { expect }) => Some(expect),
            _ => None,
        }
    }
}

/// All possible error kind from `chwire` library.
pub enum ErrorKind {
    Config(ParseError),
    Io(io::Error),
    Timeout(TimeoutError),
    Decode(DecodeError),
    Protocol(ProtocolError),
    Server(ServerException),
    Type(TypeError),
    NoHost(NoAvailableHost),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ParseError>e => ErrorKind::Config(e));
from!(<io::Error>e => ErrorKind::Io(e));
from!(<TimeoutError>e => ErrorKind::Timeout(e));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<ServerException>e => ErrorKind::Server(e));
from!(<TypeError>e => ErrorKind::Type(e));
from!(<NoAvailableHost>e => ErrorKind::NoHost(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Timeout(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Server(e) => e.fmt(f),
            Self::Type(e) => e.fmt(f),
            Self::NoHost(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// A read did not complete within the configured timeout.
pub struct TimeoutError {
    pub(crate) after: Duration,
}

impl TimeoutError {
    /// The timeout that elapsed.
    pub fn after(&self) -> Duration {
        self.after
    }
}

impl std::error::Error for TimeoutError { }

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "read timed out after {:?}", self.after)
    }
}

impl fmt::Debug for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
