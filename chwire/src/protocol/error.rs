//! Protocol error
use std::fmt;

use super::ServerPacket;

/// An error when the server sends a packet the client does not expect.
pub enum ProtocolError {
    Unexpected {
        expect: Option<u64>,
        found: u64,
        phase: Option<&'static str>,
    },
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolError::Unexpected { expect, found, phase } => {
                let name = ServerPacket::packet_name(found);
                match expect {
                    Some(p) => write!(
                        f,
                        "Expected packet `{}` found `{name}`",
                        ServerPacket::packet_name(p),
                    )?,
                    None => write!(f, "Unexpected packet `{name}`")?,
                }
                if name == "Unknown" {
                    write!(f, " ({found})")?;
                }
                if let Some(phase) = phase {
                    write!(f, " in `{phase}`")?
                }
                Ok(())
            },
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl ProtocolError {
    pub(crate) fn unknown(found: u64) -> ProtocolError {
        Self::Unexpected {
            expect: None,
            found,
            phase: None,
        }
    }

    pub(crate) fn unexpected(expect: u64, found: u64) -> ProtocolError {
        Self::Unexpected {
            expect: Some(expect),
            found,
            phase: None,
        }
    }

    pub(crate) fn unexpected_phase(found: u64, phase: &'static str) -> ProtocolError {
        Self::Unexpected {
            expect: None,
            found,
            phase: Some(phase),
        }
    }
}

/// An exception sent by the server.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerException {
    pub code: i32,
    pub name: String,
    pub message: String,
    pub stack_trace: String,
    /// The exception that caused this one.
    pub nested: Option<Box<ServerException>>,
}

impl std::error::Error for ServerException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.nested.as_deref().map(|e| e as _)
    }
}

impl fmt::Display for ServerException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code: {}. {}: {}", self.code, self.name, self.message)?;
        if let Some(nested) = &self.nested {
            write!(f, ", caused by {nested}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ServerException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages() {
        let err = ProtocolError::unexpected(ServerPacket::PONG, ServerPacket::DATA);
        assert_eq!(err.to_string(), "Expected packet `Pong` found `Data`");

        let err = ProtocolError::unexpected_phase(ServerPacket::HELLO, "query");
        assert_eq!(err.to_string(), "Unexpected packet `Hello` in `query`");

        assert_eq!(ProtocolError::unknown(42).to_string(), "Unexpected packet `Unknown` (42)");

        let exception = ServerException {
            code: 60,
            name: "DB::Exception".into(),
            message: "Table default.t doesn't exist".into(),
            stack_trace: String::new(),
            nested: None,
        };
        assert_eq!(exception.to_string(), "Code: 60. DB::Exception: Table default.t doesn't exist");
    }
}
