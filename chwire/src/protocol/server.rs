//! Packets sent by the server.
use super::{ProtocolError, ServerException, revision};
use crate::{
    Result,
    binary::{DecodeError, Deserializer, Mode},
    block::Block,
    common::verbose,
    types::TypeRegistry,
};

/// A packet sent by the server.
#[derive(Debug)]
pub enum ServerPacket {
    Hello(ServerInfo),
    Data(Block),
    Exception(ServerException),
    Progress(Progress),
    Pong,
    EndOfStream,
    ProfileInfo(ProfileInfo),
    Totals(Block),
    Extremes(Block),
}

macro_rules! match_server {
    ($($name:ident = $code:ident,)*) => {
        impl ServerPacket {
            pub fn code(&self) -> u64 {
                match self {
                    $(Self::$name { .. } => Self::$code,)*
                }
            }

            /// Get packet name from packet code.
            ///
            /// Returns `"Unknown"` for unknown packet code.
            pub fn packet_name(code: u64) -> &'static str {
                match code {
                    $(Self::$code => stringify!($name),)*
                    _ => "Unknown",
                }
            }
        }
    };
}

match_server! {
    Hello = HELLO,
    Data = DATA,
    Exception = EXCEPTION,
    Progress = PROGRESS,
    Pong = PONG,
    EndOfStream = END_OF_STREAM,
    ProfileInfo = PROFILE_INFO,
    Totals = TOTALS,
    Extremes = EXTREMES,
}

impl ServerPacket {
    pub const HELLO: u64 = 0;
    pub const DATA: u64 = 1;
    pub const EXCEPTION: u64 = 2;
    pub const PROGRESS: u64 = 3;
    pub const PONG: u64 = 4;
    pub const END_OF_STREAM: u64 = 5;
    pub const PROFILE_INFO: u64 = 6;
    pub const TOTALS: u64 = 7;
    pub const EXTREMES: u64 = 8;

    /// Decode one packet.
    ///
    /// `revision` is the negotiated protocol revision, ignored for `Hello` which is
    /// the packet that negotiates it.
    pub fn decode(de: &mut Deserializer, registry: &TypeRegistry, revision: u64) -> Result<ServerPacket> {
        let code = de.read_var_uint()?;
        let packet = match code {
            Self::HELLO => Self::Hello(ServerInfo::decode(de)?),
            Self::DATA => Self::Data(read_block(de, registry, revision)?),
            Self::EXCEPTION => Self::Exception(read_exception(de)?),
            Self::PROGRESS => Self::Progress(Progress::decode(de, revision)?),
            Self::PONG => Self::Pong,
            Self::END_OF_STREAM => Self::EndOfStream,
            Self::PROFILE_INFO => Self::ProfileInfo(ProfileInfo::decode(de)?),
            Self::TOTALS => Self::Totals(read_block(de, registry, revision)?),
            Self::EXTREMES => Self::Extremes(read_block(de, registry, revision)?),
            _ => return Err(ProtocolError::unknown(code).into()),
        };
        verbose!("Recv: {}", Self::packet_name(code));
        Ok(packet)
    }
}

fn read_block(de: &mut Deserializer, registry: &TypeRegistry, revision: u64) -> Result<Block> {
    if revision >= revision::TEMPORARY_TABLES {
        let _table = de.read_string()?;
    }
    de.switch_mode(Mode::Compressed);
    let block = Block::deserialize(de, registry, revision);
    de.switch_mode(Mode::Direct);
    block
}

fn read_exception(de: &mut Deserializer) -> Result<ServerException, DecodeError> {
    let mut chain = Vec::new();
    loop {
        let exception = ServerException {
            code: de.read_i32()?,
            name: de.read_string()?,
            message: de.read_string()?,
            stack_trace: de.read_string()?,
            nested: None,
        };
        chain.push(exception);
        if de.read_u8()? == 0 {
            break;
        }
    }

    let mut nested = None;
    while let Some(mut exception) = chain.pop() {
        exception.nested = nested.map(Box::new);
        nested = Some(exception);
    }
    nested.ok_or_else(|| DecodeError::invalid("empty exception"))
}

/// Server identity from the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version_major: u64,
    pub version_minor: u64,
    pub version_patch: u64,
    /// Revision of the server itself.
    pub revision: u64,
    pub timezone: Option<String>,
    pub display_name: Option<String>,
}

impl ServerInfo {
    /// Revision both sides speak.
    pub fn negotiated_revision(&self) -> u64 {
        self.revision.min(revision::CLIENT)
    }

    fn decode(de: &mut Deserializer) -> Result<ServerInfo, DecodeError> {
        let name = de.read_string()?;
        let version_major = de.read_var_uint()?;
        let version_minor = de.read_var_uint()?;
        let server_revision = de.read_var_uint()?;
        let revision = server_revision.min(revision::CLIENT);

        let timezone = match revision >= revision::SERVER_TIMEZONE {
            true => Some(de.read_string()?),
            false => None,
        };
        let display_name = match revision >= revision::SERVER_DISPLAY_NAME {
            true => Some(de.read_string()?),
            false => None,
        };
        Ok(ServerInfo {
            name,
            version_major,
            version_minor,
            // no patch field below revision 54401
            version_patch: server_revision,
            revision: server_revision,
            timezone,
            display_name,
        })
    }
}

/// Query progress, each packet carries the increment since the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub rows: u64,
    pub bytes: u64,
    pub total_rows: u64,
}

impl Progress {
    fn decode(de: &mut Deserializer, revision: u64) -> Result<Progress, DecodeError> {
        let mut progress = Progress {
            rows: de.read_var_uint()?,
            bytes: de.read_var_uint()?,
            ..Default::default()
        };
        if revision >= revision::TOTAL_ROWS_IN_PROGRESS {
            progress.total_rows = de.read_var_uint()?;
        }
        Ok(progress)
    }

    /// Add an increment.
    pub fn accumulate(&mut self, other: &Progress) {
        self.rows += other.rows;
        self.bytes += other.bytes;
        self.total_rows += other.total_rows;
    }
}

/// Statistics sent after the data of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileInfo {
    pub rows: u64,
    pub blocks: u64,
    pub bytes: u64,
    pub applied_limit: bool,
    pub rows_before_limit: u64,
    pub calculated_rows_before_limit: bool,
}

impl ProfileInfo {
    fn decode(de: &mut Deserializer) -> Result<ProfileInfo, DecodeError> {
        Ok(ProfileInfo {
            rows: de.read_var_uint()?,
            blocks: de.read_var_uint()?,
            bytes: de.read_var_uint()?,
            applied_limit: de.read_u8()? != 0,
            rows_before_limit: de.read_var_uint()?,
            calculated_rows_before_limit: de.read_u8()? != 0,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binary::Serializer;

    fn decode(raw: &[u8]) -> ServerPacket {
        let mut de = Deserializer::new(raw, false);
        let packet = ServerPacket::decode(&mut de, &TypeRegistry::new(), revision::CLIENT).unwrap();
        assert_eq!(de.consumed(), raw.len());
        packet
    }

    #[test]
    fn hello() {
        let mut ser = Serializer::new(None);
        ser.write_var_uint(ServerPacket::HELLO);
        ser.write_string("ClickHouse");
        ser.write_var_uint(23);
        ser.write_var_uint(8);
        ser.write_var_uint(54465);
        ser.write_string("UTC");
        ser.write_string("node-1");

        let ServerPacket::Hello(info) = decode(ser.output()) else {
            panic!("expected hello");
        };
        assert_eq!(info.name, "ClickHouse");
        assert_eq!(info.revision, 54465);
        // patch is not sent at the negotiated revision
        assert_eq!(info.version_patch, 54465);
        assert_eq!(info.negotiated_revision(), revision::CLIENT);
        assert_eq!(info.timezone.as_deref(), Some("UTC"));
        assert_eq!(info.display_name.as_deref(), Some("node-1"));
    }

    #[test]
    fn old_server_hello() {
        let mut ser = Serializer::new(None);
        ser.write_var_uint(ServerPacket::HELLO);
        ser.write_string("ClickHouse");
        ser.write_var_uint(1);
        ser.write_var_uint(1);
        ser.write_var_uint(54000);

        let ServerPacket::Hello(info) = decode(ser.output()) else {
            panic!("expected hello");
        };
        assert_eq!(info.timezone, None);
        assert_eq!(info.display_name, None);
    }

    #[test]
    fn nested_exception() {
        let mut ser = Serializer::new(None);
        ser.write_var_uint(ServerPacket::EXCEPTION);
        for (code, message, nested) in [(1, "outer", 1), (2, "inner", 0)] {
            ser.write_i32(code);
            ser.write_string("DB::Exception");
            ser.write_string(message);
            ser.write_string("");
            ser.write_u8(nested);
        }

        let ServerPacket::Exception(exception) = decode(ser.output()) else {
            panic!("expected exception");
        };
        assert_eq!(exception.code, 1);
        let nested = exception.nested.as_deref().unwrap();
        assert_eq!(nested.message, "inner");
        assert!(nested.nested.is_none());
    }

    #[test]
    fn progress_and_profile() {
        let mut ser = Serializer::new(None);
        ser.write_var_uint(ServerPacket::PROGRESS);
        ser.write_var_uint(10);
        ser.write_var_uint(80);
        ser.write_var_uint(100);
        let ServerPacket::Progress(progress) = decode(ser.output()) else {
            panic!("expected progress");
        };
        assert_eq!(progress, Progress { rows: 10, bytes: 80, total_rows: 100 });

        let mut ser = Serializer::new(None);
        ser.write_var_uint(ServerPacket::PROFILE_INFO);
        for v in [5u8, 1, 40, 1, 7, 0] {
            ser.write_u8(v);
        }
        let ServerPacket::ProfileInfo(profile) = decode(ser.output()) else {
            panic!("expected profile info");
        };
        assert!(profile.applied_limit);
        assert_eq!(profile.rows_before_limit, 7);
        assert!(!profile.calculated_rows_before_limit);
    }

    #[test]
    fn unknown_code() {
        let raw = [42u8];
        let mut de = Deserializer::new(&raw, false);
        let err = ServerPacket::decode(&mut de, &TypeRegistry::new(), revision::CLIENT).unwrap_err();
        assert!(matches!(err.kind(), crate::ErrorKind::Protocol(_)));
        assert_eq!(ServerPacket::packet_name(ServerPacket::END_OF_STREAM), "EndOfStream");
    }
}
