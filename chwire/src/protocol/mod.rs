//! ClickHouse native protocol packets.
//!
//! Every packet starts with a varint packet code. Client and server use separate
//! code spaces:
//!
//! | code | client  | server        |
//! | ---- | ------- | ------------- |
//! | 0    | Hello   | Hello         |
//! | 1    | Query   | Data          |
//! | 2    | Data    | Exception     |
//! | 3    | Cancel  | Progress      |
//! | 4    | Ping    | Pong          |
//! | 5    |         | EndOfStream   |
//! | 6    |         | ProfileInfo   |
//! | 7    |         | Totals        |
//! | 8    |         | Extremes      |
//!
//! Block bodies of `Data`, `Totals` and `Extremes` are compressed when the query
//! enabled compression, everything else is sent directly.
//!
//! <https://clickhouse.com/docs/en/native-protocol/basics>
mod client;
mod server;
mod settings;
mod error;

pub use client::{ClientInfo, ClientPacket, Data, Hello, Ping, Query, Stage};
pub use server::{ProfileInfo, Progress, ServerInfo, ServerPacket};
pub use settings::{SettingValue, Settings};
pub use error::{ProtocolError, ServerException};

/// Client name sent when none configured.
pub const CLIENT_NAME: &str = "chwire";

pub const VERSION_MAJOR: u64 = 1;

pub const VERSION_MINOR: u64 = 1;

/// Protocol revisions which introduced a packet field.
///
/// Both sides use the lower of their revisions after the handshake.
pub mod revision {
    /// Revision implemented by this client.
    pub const CLIENT: u64 = 54380;

    pub const TEMPORARY_TABLES: u64 = 50264;
    pub const TOTAL_ROWS_IN_PROGRESS: u64 = 51554;
    pub const BLOCK_INFO: u64 = 51903;
    pub const CLIENT_INFO: u64 = 54032;
    pub const SERVER_TIMEZONE: u64 = 54058;
    pub const QUOTA_KEY_IN_CLIENT_INFO: u64 = 54060;
    pub const SERVER_DISPLAY_NAME: u64 = 54372;
}
