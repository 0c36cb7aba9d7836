//! Socket io.
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::TcpStream,
};

use crate::{Result, error::TimeoutError};

/// A tcp connection to the server.
pub struct Socket {
    stream: TcpStream,
}

impl Socket {
    /// Connect to `host:port`, a zero `timeout` waits indefinitely.
    pub async fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<Socket> {
        let connect = TcpStream::connect((host, port));
        let stream = if timeout.is_zero() {
            connect.await?
        } else {
            match tokio::time::timeout(timeout, connect).await {
                Ok(stream) => stream?,
                Err(_) => return Err(TimeoutError { after: timeout }.into()),
            }
        };
        stream.set_nodelay(true)?;
        Ok(Socket { stream })
    }
}

impl AsyncRead for Socket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for Socket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.stream.is_write_vectored()
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stream.peer_addr() {
            Ok(addr) => write!(f, "Socket({addr})"),
            Err(_) => f.write_str("Socket"),
        }
    }
}
