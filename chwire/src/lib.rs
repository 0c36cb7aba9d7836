//! ClickHouse Native Protocol Client
//!
//! # Examples
//!
//! Single connection:
//!
//! ```no_run
//! use chwire::{Connection, Settings};
//!
//! # async fn app() -> chwire::Result<()> {
//! let mut conn = Connection::connect("clickhouse://default@localhost:9000/default").await?;
//!
//! let mut result = conn.query("SELECT number, toString(number) FROM system.numbers LIMIT 3", &Settings::new()).await?;
//! assert_eq!(result.sample().column_count(), 2);
//!
//! while let Some(block) = result.next_block().await? {
//!     for row in block.rows() {
//!         println!("{} {}", row[0], row[1]);
//!     }
//! }
//!
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Inserting rows:
//!
//! ```no_run
//! use chwire::{Connection, Value};
//!
//! # async fn app() -> chwire::Result<()> {
//! let mut conn = Connection::connect_env().await?;
//!
//! conn.execute("CREATE TABLE IF NOT EXISTS foo(id Int32, name Nullable(String)) ENGINE = Memory").await?;
//!
//! let rows = (0..14).map(|i| vec![Value::from(i), Value::from(Some(format!("foo-{i}")))]);
//! conn.insert_rows("INSERT INTO foo VALUES", rows).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Failover over multiple servers:
//!
//! ```no_run
//! use chwire::HostPool;
//! use std::time::Duration;
//!
//! # async fn app() -> chwire::Result<()> {
//! let pool = HostPool::parse("clickhouse://ch1:9000,ch2:9000,ch3:9000/default")?;
//! pool.spawn_sweeper(Duration::from_secs(30));
//!
//! let mut conn = pool.acquire().await?;
//! conn.execute("SELECT 1").await?;
//! # Ok(())
//! # }
//! ```

pub mod common;
mod net;

// Wire format
pub mod binary;
pub mod compress;

// Data
pub mod types;
mod value;
pub mod block;

// Protocol
pub mod protocol;
mod stream;
pub mod transport;

// Operation
pub mod connection;
pub mod query;
pub mod pool;

mod error;


pub use value::Value;
pub use block::{Block, BlockInfo, Column};
pub use types::{DataType, Decimal, TypeError, TypeRegistry};
pub use protocol::{Settings, SettingValue};

pub use connection::{Connection, Config};
pub use query::QueryResult;
pub use pool::HostPool;
pub use error::{Error, ErrorKind, Result, TimeoutError};
