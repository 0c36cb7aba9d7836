//! Packets sent by the client.
use super::{Settings, revision};
use crate::{
    binary::{Mode, Serializer},
    block::Block,
    common::verbose,
    types::TypeError,
};

/// A packet sent by the client.
pub trait ClientPacket {
    /// Packet code.
    const PACKET: u64;

    const NAME: &'static str;

    /// Write the packet body, without the packet code.
    ///
    /// `revision` is the negotiated protocol revision, fields introduced in a
    /// later revision are omitted.
    fn encode(&self, ser: &mut Serializer, revision: u64) -> Result<(), TypeError>;

    /// Write packet code and body.
    fn write(&self, ser: &mut Serializer, revision: u64) -> Result<(), TypeError> {
        verbose!("Send: {}", Self::NAME);
        ser.write_var_uint(Self::PACKET);
        self.encode(ser, revision)
    }
}

/// First packet of a connection.
#[derive(Debug)]
pub struct Hello<'a> {
    pub client_name: &'a str,
    pub version_major: u64,
    pub version_minor: u64,
    pub revision: u64,
    pub database: &'a str,
    pub user: &'a str,
    pub password: &'a str,
}

impl ClientPacket for Hello<'_> {
    const PACKET: u64 = 0;
    const NAME: &'static str = "Hello";

    fn encode(&self, ser: &mut Serializer, _: u64) -> Result<(), TypeError> {
        ser.write_string(self.client_name);
        ser.write_var_uint(self.version_major);
        ser.write_var_uint(self.version_minor);
        ser.write_var_uint(self.revision);
        ser.write_string(self.database);
        ser.write_string(self.user);
        ser.write_string(self.password);
        Ok(())
    }
}

/// How far the server should process a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchColumns = 0,
    WithMergeableState = 1,
    Complete = 2,
}

/// Information about the client, sent with every query.
#[derive(Debug)]
pub struct ClientInfo<'a> {
    pub client_name: &'a str,
    pub client_hostname: &'a str,
    pub initial_address: &'a str,
}

impl ClientInfo<'_> {
    const INITIAL_QUERY: u64 = 1;
    const TCP_INTERFACE: u64 = 1;

    fn encode(&self, ser: &mut Serializer, revision: u64) {
        ser.write_var_uint(Self::INITIAL_QUERY);
        // initial user and initial query id
        ser.write_string("");
        ser.write_string("");
        ser.write_string(self.initial_address);

        ser.write_var_uint(Self::TCP_INTERFACE);
        // os user
        ser.write_string("");
        ser.write_string(self.client_hostname);
        ser.write_string(self.client_name);
        ser.write_var_uint(super::VERSION_MAJOR);
        ser.write_var_uint(super::VERSION_MINOR);
        ser.write_var_uint(revision::CLIENT);
        if revision >= revision::QUOTA_KEY_IN_CLIENT_INFO {
            ser.write_string("");
        }
    }
}

/// Execute a query.
///
/// Must be followed by an empty [`Data`], or by the insert blocks and then an empty [`Data`].
#[derive(Debug)]
pub struct Query<'a> {
    pub id: &'a str,
    pub client_info: ClientInfo<'a>,
    pub settings: &'a Settings,
    pub stage: Stage,
    pub compression: bool,
    pub query: &'a str,
}

impl ClientPacket for Query<'_> {
    const PACKET: u64 = 1;
    const NAME: &'static str = "Query";

    fn encode(&self, ser: &mut Serializer, revision: u64) -> Result<(), TypeError> {
        ser.write_string(self.id);
        if revision >= revision::CLIENT_INFO {
            self.client_info.encode(ser, revision);
        }
        self.settings.serialize(ser);
        ser.write_var_uint(self.stage as u64);
        ser.write_bool(self.compression);
        ser.write_string(self.query);
        Ok(())
    }
}

/// A block of data, the block is compressed when compression is enabled.
#[derive(Debug)]
pub struct Data<'a> {
    pub table: &'a str,
    /// `None` is an empty block.
    pub block: Option<&'a Block>,
}

impl Data<'_> {
    /// Empty block, marks the end of insert data.
    pub fn empty() -> Data<'static> {
        Data { table: "", block: None }
    }
}

impl ClientPacket for Data<'_> {
    const PACKET: u64 = 2;
    const NAME: &'static str = "Data";

    fn encode(&self, ser: &mut Serializer, revision: u64) -> Result<(), TypeError> {
        if revision >= revision::TEMPORARY_TABLES {
            ser.write_string(self.table);
        }
        ser.switch_mode(Mode::Compressed);
        let result = match self.block {
            Some(block) => block.serialize(ser, revision),
            None => Block::new().serialize(ser, revision),
        };
        ser.switch_mode(Mode::Direct);
        result
    }
}

/// Liveness check, answered by `Pong`.
#[derive(Debug)]
pub struct Ping;

impl ClientPacket for Ping {
    const PACKET: u64 = 4;
    const NAME: &'static str = "Ping";

    fn encode(&self, _: &mut Serializer, _: u64) -> Result<(), TypeError> {
        Ok(())
    }
}
