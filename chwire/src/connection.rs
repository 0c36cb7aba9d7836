//! Single server connection.
use std::{
    io,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use crate::{
    Result,
    block::Block,
    common::verbose,
    error::{ErrorKind, TimeoutError},
    protocol::{
        ClientInfo, ClientPacket, Data, Hello, Ping, ProtocolError, Query, ServerInfo, ServerPacket,
        Settings, Stage, VERSION_MAJOR, VERSION_MINOR, revision,
    },
    query::QueryResult,
    stream::ChStream,
    transport::{Transport, TransportExt},
    types::TypeRegistry,
    value::Value,
};

mod config;

pub use config::{Config, ParseError};

const INITIAL_ADDRESS: &str = "0.0.0.0:0";

/// Where the connection is in the request/response sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Ready for a new request.
    Ready,
    /// Response of the previous query not yet read to `EndOfStream`.
    Reading,
    /// Server is waiting for insert data.
    Inserting,
    /// Transport or protocol failure, the connection cannot be used.
    Broken,
    Closed,
}

/// A single connection to ClickHouse.
///
/// One request is in flight at a time, each request must be read to the end before
/// the next one. A [`QueryResult`] dropped early is drained on the next request.
#[derive(Debug)]
pub struct Connection {
    stream: ChStream,
    config: Config,
    server: Option<ServerInfo>,
    pub(crate) state: State,
}

impl Connection {
    /// Connect and perform the handshake via url.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(Config::parse(url)?).await
    }

    /// Connect and perform the handshake.
    ///
    /// See [`Config::from_env`] for more details on env.
    pub async fn connect_env() -> Result<Self> {
        Self::connect_with(Config::from_env()).await
    }

    /// Connect and perform the handshake with config.
    pub async fn connect_with(config: Config) -> Result<Self> {
        Self::connect_with_registry(config, Arc::new(TypeRegistry::new())).await
    }

    /// Connect and perform the handshake, resolving column types with `registry`.
    pub async fn connect_with_registry(config: Config, registry: Arc<TypeRegistry>) -> Result<Self> {
        verbose!("Connect: {}", config.address());

        let stream = ChStream::connect(&config, registry).await?;
        let mut conn = Connection { stream, config, server: None, state: State::Ready };
        conn.send_hello().await?;
        conn.receive_hello().await?;
        Ok(conn)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Server identity, available after the handshake.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server.as_ref()
    }

    /// Negotiated protocol revision.
    pub fn revision(&self) -> u64 {
        self.stream.revision()
    }

    /// Returns `true` after [`close`][Connection::close], or after a transport or
    /// protocol failure.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed | State::Broken)
    }

    /// Send `Hello`, the first packet of a connection.
    pub async fn send_hello(&mut self) -> Result<()> {
        let hello = Hello {
            client_name: &self.config.client_name,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            revision: revision::CLIENT,
            database: &self.config.database,
            user: &self.config.user,
            password: &self.config.password,
        };
        self.stream.send(&hello)?;
        self.flush().await
    }

    /// Receive the server `Hello` and adopt the negotiated revision.
    pub async fn receive_hello(&mut self) -> Result<&ServerInfo> {
        match self.receive_response(self.config.query_timeout).await? {
            ServerPacket::Hello(info) => {
                self.stream.set_revision(info.negotiated_revision());
                Ok(self.server.insert(info))
            },
            packet => Err(self.unexpected(ServerPacket::HELLO, &packet)),
        }
    }

    /// Send `Query` followed by an empty `Data`, returns the query id.
    ///
    /// `settings` override the settings of [`Config`].
    pub async fn send_query(&mut self, query: &str, settings: &Settings) -> Result<String> {
        self.prepare().await?;

        let id = uuid::Uuid::new_v4().to_string();
        let settings = self.config.settings.merged(settings);
        let query = Query {
            id: &id,
            client_info: ClientInfo {
                client_name: &self.config.client_name,
                client_hostname: "",
                initial_address: INITIAL_ADDRESS,
            },
            settings: &settings,
            stage: Stage::Complete,
            compression: self.config.compression,
            query,
        };
        self.stream.send(&query)?;
        self.stream.send(&Data::empty())?;
        self.flush().await?;
        self.state = State::Reading;
        Ok(id)
    }

    /// Send a data block of an insert.
    pub async fn send_data(&mut self, block: &Block) -> Result<()> {
        self.stream.send(&Data { table: "", block: Some(block) })?;
        self.flush().await
    }

    /// Receive the next packet.
    ///
    /// A zero `timeout` waits indefinitely. `Exception` is returned as
    /// [`ErrorKind::Server`]. Any other error leaves the connection unusable.
    pub async fn receive_response(&mut self, timeout: Duration) -> Result<ServerPacket> {
        match with_timeout(timeout, self.stream.recv()).await {
            Ok(ServerPacket::Exception(exception)) => {
                self.state = State::Ready;
                Err(exception.into())
            },
            Ok(packet) => {
                if let ServerPacket::EndOfStream = packet {
                    self.state = State::Ready;
                }
                Ok(packet)
            },
            Err(err) => {
                self.state = State::Broken;
                Err(err)
            },
        }
    }

    /// Check that the server responds within `timeout`.
    ///
    /// Any failure, including an unexpected packet, returns `false`.
    pub async fn ping(&mut self, timeout: Duration) -> bool {
        if let Err(_err) = self.prepare().await {
            #[cfg(feature = "log")]
            log::debug!("ping: {_err}");
            return false;
        }
        if self.stream.send(&Ping).is_err() || self.flush().await.is_err() {
            return false;
        }

        loop {
            match self.receive_response(timeout).await {
                Ok(ServerPacket::Progress(_)) => continue,
                Ok(ServerPacket::Pong) => return true,
                Ok(packet) => {
                    let _err = self.unexpected(ServerPacket::PONG, &packet);
                    #[cfg(feature = "log")]
                    log::warn!("ping: {_err}");
                    return false;
                },
                Err(_err) => {
                    #[cfg(feature = "log")]
                    log::debug!("ping: {_err}");
                    return false;
                },
            }
        }
    }

    /// Execute a query and read the result blocks.
    ///
    /// Returns after the first block, which describes the columns of the result.
    pub async fn query(&mut self, query: &str, settings: &Settings) -> Result<QueryResult<'_>> {
        self.send_query(query, settings).await?;
        QueryResult::start(self).await
    }

    /// Execute a query, discarding any result.
    pub async fn execute(&mut self, query: &str) -> Result<()> {
        self.query(query, &Settings::new()).await?.finish().await
    }

    /// Insert a block into `table`.
    ///
    /// Columns are matched with the table columns by name, falling back to position,
    /// and values are converted into the table column types.
    pub async fn insert(&mut self, table: &str, block: &Block) -> Result<()> {
        let query = match block.column_count() {
            0 => format!("INSERT INTO {table} VALUES"),
            _ => {
                let columns = block
                    .columns()
                    .iter()
                    .map(|c| format!("`{}`", c.name().replace('\\', "\\\\").replace('`', "\\`")))
                    .collect::<Vec<_>>();
                format!("INSERT INTO {table} ({}) VALUES", columns.join(", "))
            },
        };

        self.send_query(&query, &Settings::new()).await?;
        let sample = self.receive_sample().await?;

        let result = match block.cast_to(&sample) {
            Ok(block) => self.send_data(&block).await,
            Err(err) => Err(err.into()),
        };
        let end = self.finish_insert().await;
        result.and(end)
    }

    /// Execute an `INSERT` query and send `rows` as its data.
    ///
    /// Each row has a value for every column of the insert, in order.
    pub async fn insert_rows<I>(&mut self, query: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        self.send_query(query, &Settings::new()).await?;
        let mut block = self.receive_sample().await?;

        block.init_write_buffer();
        let mut result: Result<()> = rows
            .into_iter()
            .try_for_each(|row| block.append_row(row))
            .map_err(Into::into);
        if result.is_ok() {
            result = self.send_data(&block).await;
        }
        let end = self.finish_insert().await;
        result.and(end)
    }

    /// Flush and close the connection.
    ///
    /// Calling `close` on a closed connection does nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        self.state = State::Closed;

        let result = std::future::poll_fn(|cx| self.stream.poll_shutdown(cx)).await;
        if let Err(_err) = &result {
            #[cfg(feature = "log")]
            log::error!("failed to close connection: {_err}");
        }
        Ok(result?)
    }

    /// Receive the block describing the insert columns.
    async fn receive_sample(&mut self) -> Result<Block> {
        loop {
            match self.receive_response(self.config.query_timeout).await? {
                ServerPacket::Data(block) => {
                    self.state = State::Inserting;
                    return Ok(block);
                },
                ServerPacket::Progress(_) | ServerPacket::ProfileInfo(_) => continue,
                packet => return Err(self.unexpected(ServerPacket::DATA, &packet)),
            }
        }
    }

    /// Send the empty block that ends the insert data, and read to the end of stream.
    async fn finish_insert(&mut self) -> Result<()> {
        if self.state != State::Inserting {
            return Ok(());
        }
        self.stream.send(&Data::empty())?;
        self.flush().await?;
        self.state = State::Reading;

        while self.state == State::Reading {
            match self.receive_response(self.config.query_timeout).await? {
                ServerPacket::EndOfStream
                | ServerPacket::Progress(_)
                | ServerPacket::ProfileInfo(_) => {},
                packet => return Err(self.unexpected_phase(&packet, "insert")),
            }
        }
        Ok(())
    }

    /// Bring the connection back to [`State::Ready`].
    async fn prepare(&mut self) -> Result<()> {
        match self.state {
            State::Ready => return Ok(()),
            State::Broken => {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection is broken").into());
            },
            State::Closed => {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "connection is closed").into());
            },
            State::Inserting => self.finish_insert().await?,
            State::Reading => {},
        }

        while self.state == State::Reading {
            match self.receive_response(self.config.query_timeout).await {
                Ok(_) => {},
                Err(err) if matches!(err.kind(), ErrorKind::Server(_)) => {
                    #[cfg(feature = "log")]
                    log::debug!("exception of abandoned query: {err}");
                },
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Err(err) = self.stream.flush().await {
            self.state = State::Broken;
            return Err(err.into());
        }
        Ok(())
    }

    pub(crate) fn query_timeout(&self) -> Duration {
        self.config.query_timeout
    }

    pub(crate) fn unexpected(&mut self, expect: u64, packet: &ServerPacket) -> crate::Error {
        self.state = State::Broken;
        ProtocolError::unexpected(expect, packet.code()).into()
    }

    pub(crate) fn unexpected_phase(&mut self, packet: &ServerPacket, phase: &'static str) -> crate::Error {
        self.state = State::Broken;
        ProtocolError::unexpected_phase(packet.code(), phase).into()
    }
}

impl Transport for Connection {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        self.stream.poll_flush(cx)
    }

    fn poll_recv(&mut self, cx: &mut Context) -> Poll<Result<ServerPacket>> {
        self.stream.poll_recv(cx)
    }

    fn send<P: ClientPacket>(&mut self, packet: &P) -> Result<()> {
        self.stream.send(packet)
    }
}

/// Await `future`, failing after `timeout` unless it is zero.
pub(crate) async fn with_timeout<F, T>(timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if timeout.is_zero() {
        return future.await;
    }
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutError { after: timeout }.into()),
    }
}
