use bytes::{Buf, BytesMut};
use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::{
    Config, Result,
    binary::{Deserializer, Serializer},
    common::verbose,
    compress::Method,
    net::Socket,
    protocol::{ClientPacket, ServerPacket, revision},
    types::TypeRegistry,
};

const DEFAULT_BUF_CAPACITY: usize = 8 * 1024;

/// Most bytes requested from the socket in one read.
const MAX_READ_CHUNK: usize = 64 * 1024;

/// Buffered connection to the server.
///
/// Outgoing packets are accumulated in a [`Serializer`], incoming bytes are
/// buffered until a whole packet can be decoded.
#[derive(Debug)]
pub struct ChStream {
    socket: Socket,
    read_buf: BytesMut,
    /// Raw length the read buffer must reach before decoding is retried.
    want: usize,
    ser: Serializer,
    compression: bool,
    revision: u64,
    registry: Arc<TypeRegistry>,
}

impl ChStream {
    pub async fn connect(config: &Config, registry: Arc<TypeRegistry>) -> Result<Self> {
        let socket = Socket::connect_tcp(&config.host, config.port, config.connect_timeout).await?;
        let method = config.compression.then_some(Method::Lz4);

        Ok(Self {
            socket,
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            want: 0,
            ser: Serializer::new(method),
            compression: config.compression,
            revision: revision::CLIENT,
            registry,
        })
    }

    /// Negotiated protocol revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Buffer a packet.
    ///
    /// A packet that fails to encode leaves nothing in the buffer.
    pub fn send<P: ClientPacket>(&mut self, packet: &P) -> Result<()> {
        let len = self.ser.output().len();
        if let Err(err) = packet.write(&mut self.ser, self.revision) {
            self.ser.truncate(len);
            return Err(err.into());
        }
        Ok(())
    }

    /// Write every buffered packet to the socket.
    pub fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        let output = self.ser.output_mut();
        while !output.is_empty() {
            let n = ready!(Pin::new(&mut self.socket).poll_write(cx, &output[..]))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            output.advance(n);
        }
        Pin::new(&mut self.socket).poll_flush(cx)
    }

    /// Flush and shutdown the write half of the socket.
    pub fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        ready!(self.poll_flush(cx))?;
        Pin::new(&mut self.socket).poll_shutdown(cx)
    }

    pub fn poll_recv(&mut self, cx: &mut Context) -> Poll<Result<ServerPacket>> {
        if !self.ser.output().is_empty() {
            ready!(self.poll_flush(cx))?;
        }

        loop {
            if !self.read_buf.is_empty() && self.read_buf.len() >= self.want {
                let (result, consumed) = {
                    let mut de = Deserializer::new(&self.read_buf, self.compression);
                    let result = ServerPacket::decode(&mut de, &self.registry, self.revision);
                    (result, de.consumed())
                };

                match result {
                    Ok(packet) => {
                        self.read_buf.advance(consumed);
                        self.want = 0;
                        return Poll::Ready(Ok(packet));
                    },
                    Err(err) => match err.incomplete() {
                        Some(expect) => {
                            verbose!("Recv: need {expect} bytes, buffered {}", self.read_buf.len());
                            self.want = expect;
                        },
                        None => return Poll::Ready(Err(err)),
                    },
                }
            }

            let n = ready!(self.poll_fill(cx))?;
            if n == 0 {
                return Poll::Ready(Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()));
            }
        }
    }

    /// Append one socket read to the read buffer, zero means end of file.
    ///
    /// Reads up to the length the pending packet still misses, bounded by
    /// [`MAX_READ_CHUNK`].
    fn poll_fill(&mut self, cx: &mut Context) -> Poll<io::Result<usize>> {
        let filled = self.read_buf.len();
        let chunk = self
            .want
            .saturating_sub(filled)
            .clamp(DEFAULT_BUF_CAPACITY, MAX_READ_CHUNK);
        self.read_buf.resize(filled + chunk, 0);

        let mut buf = ReadBuf::new(&mut self.read_buf[filled..]);
        let result = Pin::new(&mut self.socket).poll_read(cx, &mut buf);
        let n = buf.filled().len();
        self.read_buf.truncate(filled + n);

        ready!(result)?;
        Poll::Ready(Ok(n))
    }
}
