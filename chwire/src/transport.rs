//! The [`Transport`] trait.
use std::{
    io,
    task::{Context, Poll},
};

use crate::{
    Result,
    protocol::{ClientPacket, ServerPacket},
    stream::ChStream,
};

/// A buffered stream which can send and receive packets.
pub trait Transport: Unpin {
    /// Poll to flush the underlying io.
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>>;

    /// Poll to receive a packet.
    ///
    /// Calling `poll_recv` will also [`poll_flush`][1] if there is buffered packet.
    ///
    /// [1]: Transport::poll_flush
    fn poll_recv(&mut self, cx: &mut Context) -> Poll<Result<ServerPacket>>;

    /// Send a packet to the server.
    ///
    /// Note that this send is buffered, caller must also call
    /// [`poll_flush`][1] or [`flush`][2] afterwards.
    ///
    /// [1]: Transport::poll_flush
    /// [2]: TransportExt::flush
    fn send<P: ClientPacket>(&mut self, packet: &P) -> Result<()>;
}

impl Transport for ChStream {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        ChStream::poll_flush(self, cx)
    }

    fn poll_recv(&mut self, cx: &mut Context) -> Poll<Result<ServerPacket>> {
        ChStream::poll_recv(self, cx)
    }

    fn send<P: ClientPacket>(&mut self, packet: &P) -> Result<()> {
        ChStream::send(self, packet)
    }
}

impl<T> Transport for &mut T where T: Transport {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        T::poll_flush(self, cx)
    }

    fn poll_recv(&mut self, cx: &mut Context) -> Poll<Result<ServerPacket>> {
        T::poll_recv(self, cx)
    }

    fn send<P: ClientPacket>(&mut self, packet: &P) -> Result<()> {
        T::send(self, packet)
    }
}

/// An extension trait to provide `Future` API for [`Transport`].
pub trait TransportExt: Transport {
    /// Flush the underlying io.
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> {
        std::future::poll_fn(|cx| self.poll_flush(cx))
    }

    /// Receive a server packet.
    fn recv(&mut self) -> impl Future<Output = Result<ServerPacket>> {
        std::future::poll_fn(|cx| self.poll_recv(cx))
    }
}

impl<T> TransportExt for T where T: Transport { }
