//! In-process server speaking the server side of the native protocol.
#![allow(dead_code)]
use bytes::{Buf, BytesMut};
use chwire::{
    Block, Config, TypeRegistry,
    binary::{DecodeError, Deserializer, Mode, Serializer},
    compress::Method,
    protocol::{ServerPacket, revision},
};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

pub const REVISION: u64 = revision::CLIENT;

/// Client packet as seen by the server.
#[derive(Debug)]
pub enum Client {
    Hello { name: String, database: String, user: String, password: String },
    Query { id: String, query: String, compression: bool },
    Data(Block),
    Ping,
}

pub async fn listen() -> (TcpListener, u16) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A port nothing listens on.
pub async fn dead_port() -> u16 {
    let (listener, port) = listen().await;
    drop(listener);
    port
}

pub fn config(port: u16, compression: bool) -> Config {
    Config::new()
        .host("127.0.0.1")
        .port(port)
        .compression(compression)
        .connect_timeout(Duration::from_secs(2))
        .query_timeout(Duration::from_secs(5))
}

/// Accept connections forever, running `handler` for each.
pub fn serve<F, Fut>(listener: TcpListener, handler: F) -> tokio::task::JoinHandle<()>
where
    F: Fn(Peer) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(handler(Peer::new(socket)));
        }
    })
}

pub struct Peer {
    socket: TcpStream,
    buf: BytesMut,
    compression: bool,
    registry: TypeRegistry,
}

impl Peer {
    pub fn new(socket: TcpStream) -> Peer {
        Peer { socket, buf: BytesMut::new(), compression: false, registry: TypeRegistry::new() }
    }

    /// Read the client `Hello` and answer it.
    pub async fn handshake(&mut self) -> Client {
        let hello = self.recv().await.expect("client hello");
        assert!(matches!(hello, Client::Hello { .. }), "{hello:?}");

        let mut ser = Serializer::new(None);
        ser.write_var_uint(ServerPacket::HELLO);
        ser.write_string("MockHouse");
        ser.write_var_uint(24);
        ser.write_var_uint(3);
        ser.write_var_uint(REVISION);
        ser.write_string("UTC");
        ser.write_string("mock");
        self.write(&ser).await;
        hello
    }

    /// Read a `Query` and the empty `Data` after it, returns the query text.
    pub async fn recv_query(&mut self) -> String {
        let Some(Client::Query { query, compression, .. }) = self.recv().await else {
            panic!("expected query");
        };
        self.compression = compression;
        let Some(Client::Data(block)) = self.recv().await else {
            panic!("expected data after query");
        };
        assert_eq!(block.column_count(), 0);
        query
    }

    /// Read the next client packet, `None` on end of file.
    pub async fn recv(&mut self) -> Option<Client> {
        loop {
            if !self.buf.is_empty() {
                let (result, consumed) = {
                    let mut de = Deserializer::new(&self.buf, self.compression);
                    let result = decode(&mut de, &self.registry);
                    (result, de.consumed())
                };
                match result {
                    Ok(packet) => {
                        self.buf.advance(consumed);
                        return Some(packet);
                    },
                    Err(DecodeError::Incomplete { .. }) => {},
                    Err(err) => panic!("client packet: {err}"),
                }
            }
            if self.socket.read_buf(&mut self.buf).await.ok()? == 0 {
                return None;
            }
        }
    }

    fn serializer(&self) -> Serializer {
        Serializer::new(self.compression.then_some(Method::Lz4))
    }

    pub async fn write(&mut self, ser: &Serializer) {
        self.socket.write_all(ser.output()).await.unwrap();
    }

    pub async fn send_data(&mut self, block: &Block) {
        let mut ser = self.serializer();
        ser.write_var_uint(ServerPacket::DATA);
        ser.write_string("");
        ser.switch_mode(Mode::Compressed);
        block.serialize(&mut ser, REVISION).unwrap();
        ser.switch_mode(Mode::Direct);
        self.write(&ser).await;
    }

    pub async fn send_progress(&mut self, rows: u64, bytes: u64, total_rows: u64) {
        let mut ser = self.serializer();
        ser.write_var_uint(ServerPacket::PROGRESS);
        ser.write_var_uint(rows);
        ser.write_var_uint(bytes);
        ser.write_var_uint(total_rows);
        self.write(&ser).await;
    }

    pub async fn send_pong(&mut self) {
        let mut ser = self.serializer();
        ser.write_var_uint(ServerPacket::PONG);
        self.write(&ser).await;
    }

    pub async fn send_end_of_stream(&mut self) {
        let mut ser = self.serializer();
        ser.write_var_uint(ServerPacket::END_OF_STREAM);
        self.write(&ser).await;
    }

    pub async fn send_exception(&mut self, code: i32, message: &str) {
        let mut ser = self.serializer();
        ser.write_var_uint(ServerPacket::EXCEPTION);
        ser.write_i32(code);
        ser.write_string("DB::Exception");
        ser.write_string(message);
        ser.write_string("");
        ser.write_u8(0);
        self.write(&ser).await;
    }

    /// Answer pings until the client disconnects.
    pub async fn pong_loop(&mut self) {
        while let Some(packet) = self.recv().await {
            match packet {
                Client::Ping => self.send_pong().await,
                packet => panic!("unexpected {packet:?}"),
            }
        }
    }
}

fn decode(de: &mut Deserializer, registry: &TypeRegistry) -> Result<Client, DecodeError> {
    match de.read_var_uint()? {
        0 => {
            let name = de.read_string()?;
            let _major = de.read_var_uint()?;
            let _minor = de.read_var_uint()?;
            assert_eq!(de.read_var_uint()?, revision::CLIENT);
            Ok(Client::Hello {
                name,
                database: de.read_string()?,
                user: de.read_string()?,
                password: de.read_string()?,
            })
        },
        1 => {
            let id = de.read_string()?;
            // client info
            assert_eq!(de.read_var_uint()?, 1);
            for _ in 0..3 {
                de.read_string()?;
            }
            assert_eq!(de.read_var_uint()?, 1);
            for _ in 0..3 {
                de.read_string()?;
            }
            for _ in 0..3 {
                de.read_var_uint()?;
            }
            // quota key
            de.read_string()?;
            // settings, only unsigned values in these tests
            while !de.read_string()?.is_empty() {
                de.read_var_uint()?;
            }
            assert_eq!(de.read_var_uint()?, 2);
            let compression = de.read_var_uint()? == 1;
            let query = de.read_string()?;
            Ok(Client::Query { id, query, compression })
        },
        2 => {
            let _table = de.read_string()?;
            de.switch_mode(Mode::Compressed);
            let block = match Block::deserialize(de, registry, REVISION) {
                Ok(block) => block,
                Err(err) => {
                    if let chwire::ErrorKind::Decode(DecodeError::Incomplete { expect }) = err.kind() {
                        return Err(DecodeError::Incomplete { expect: *expect });
                    }
                    panic!("client block: {err}");
                },
            };
            de.switch_mode(Mode::Direct);
            Ok(Client::Data(block))
        },
        4 => Ok(Client::Ping),
        code => panic!("unknown client packet {code}"),
    }
}
