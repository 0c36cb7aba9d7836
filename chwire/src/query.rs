//! Query result streaming.
use futures_core::Stream;
use std::{
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::time::{Instant, Sleep};

use crate::{
    Connection, Result,
    block::Block,
    connection::State,
    error::TimeoutError,
    protocol::{ProfileInfo, Progress, ServerPacket},
};

/// Result of [`Connection::query`].
///
/// The server sends the column names and types first as an empty block, available
/// with [`sample`][QueryResult::sample], then the data blocks which are read with
/// [`next_block`][QueryResult::next_block] or as a [`Stream`].
///
/// Dropping `QueryResult` before the end leaves the rest of the response on the
/// connection, it is discarded before the next request.
#[derive(Debug)]
#[must_use = "query result must be read to the end"]
pub struct QueryResult<'c> {
    conn: &'c mut Connection,
    sample: Block,
    progress: Progress,
    profile: Option<ProfileInfo>,
    totals: Option<Block>,
    extremes: Option<Block>,
    finished: bool,
    sleep: Option<Pin<Box<Sleep>>>,
    armed: bool,
}

enum Event {
    Data(Block),
    End,
}

impl<'c> QueryResult<'c> {
    /// Read up to the sample block.
    pub(crate) async fn start(conn: &'c mut Connection) -> Result<QueryResult<'c>> {
        let mut result = QueryResult {
            conn,
            sample: Block::new(),
            progress: Progress::default(),
            profile: None,
            totals: None,
            extremes: None,
            finished: false,
            sleep: None,
            armed: false,
        };
        let event = std::future::poll_fn(|cx| result.poll_event(cx)).await?;
        if let Event::Data(sample) = event {
            result.sample = sample;
        }
        Ok(result)
    }

    /// Block without rows, describing the result columns.
    ///
    /// Empty if the query returns nothing.
    pub fn sample(&self) -> &Block {
        &self.sample
    }

    /// Progress accumulated so far.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Statistics, sent after the data blocks.
    pub fn profile(&self) -> Option<&ProfileInfo> {
        self.profile.as_ref()
    }

    /// Totals of `WITH TOTALS` queries, sent after the data blocks.
    pub fn totals(&self) -> Option<&Block> {
        self.totals.as_ref()
    }

    /// Extremes of queries with `extremes` setting enabled, sent after the data blocks.
    pub fn extremes(&self) -> Option<&Block> {
        self.extremes.as_ref()
    }

    /// Returns `true` once the end of the response was read.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read the next data block, blocks without rows are skipped.
    ///
    /// Returns `None` at the end of the response.
    pub async fn next_block(&mut self) -> Result<Option<Block>> {
        std::future::poll_fn(|cx| self.poll_next_block(cx)).await.transpose()
    }

    /// Read all remaining data blocks.
    pub async fn collect(mut self) -> Result<Vec<Block>> {
        let mut blocks = vec![];
        while let Some(block) = self.next_block().await? {
            blocks.push(block);
        }
        Ok(blocks)
    }

    /// Read and discard the rest of the response.
    pub async fn finish(mut self) -> Result<()> {
        while self.next_block().await?.is_some() { }
        Ok(())
    }

    pub fn poll_next_block(&mut self, cx: &mut Context) -> Poll<Option<Result<Block>>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }
            match ready!(self.poll_event(cx)) {
                Ok(Event::Data(block)) if block.is_empty() => continue,
                Ok(Event::Data(block)) => return Poll::Ready(Some(Ok(block))),
                Ok(Event::End) => return Poll::Ready(None),
                Err(err) => return Poll::Ready(Some(Err(err))),
            }
        }
    }

    /// Read packets until a data block or the end of response.
    fn poll_event(&mut self, cx: &mut Context) -> Poll<Result<Event>> {
        loop {
            let packet = match self.poll_packet(cx) {
                Poll::Ready(Ok(packet)) => packet,
                Poll::Ready(Err(err)) => {
                    self.finished = true;
                    self.conn.state = State::Broken;
                    return Poll::Ready(Err(err));
                },
                Poll::Pending => return Poll::Pending,
            };

            match packet {
                ServerPacket::Data(block) => return Poll::Ready(Ok(Event::Data(block))),
                ServerPacket::Progress(progress) => self.progress.accumulate(&progress),
                ServerPacket::ProfileInfo(profile) => self.profile = Some(profile),
                ServerPacket::Totals(block) => self.totals = Some(block),
                ServerPacket::Extremes(block) => self.extremes = Some(block),
                ServerPacket::EndOfStream => {
                    self.finished = true;
                    self.conn.state = State::Ready;
                    return Poll::Ready(Ok(Event::End));
                },
                ServerPacket::Exception(exception) => {
                    self.finished = true;
                    self.conn.state = State::Ready;
                    return Poll::Ready(Err(exception.into()));
                },
                packet @ (ServerPacket::Hello(_) | ServerPacket::Pong) => {
                    self.finished = true;
                    return Poll::Ready(Err(self.conn.unexpected_phase(&packet, "query")));
                },
            }
        }
    }

    /// Receive one packet, the timeout is armed again for every packet.
    fn poll_packet(&mut self, cx: &mut Context) -> Poll<Result<ServerPacket>> {
        use crate::transport::Transport;

        let timeout = self.conn.query_timeout();
        if !timeout.is_zero() && !self.armed {
            let deadline = Instant::now() + timeout;
            match &mut self.sleep {
                Some(sleep) => sleep.as_mut().reset(deadline),
                None => self.sleep = Some(Box::pin(tokio::time::sleep_until(deadline))),
            }
            self.armed = true;
        }

        if let Poll::Ready(result) = self.conn.poll_recv(cx) {
            self.armed = false;
            return Poll::Ready(result);
        }

        if let Some(sleep) = &mut self.sleep {
            if self.armed && sleep.as_mut().poll(cx).is_ready() {
                self.armed = false;
                return Poll::Ready(Err(TimeoutError { after: timeout }.into()));
            }
        }
        Poll::Pending
    }
}

impl Stream for QueryResult<'_> {
    type Item = Result<Block>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_next_block(cx)
    }
}
