//! Newline-delimited text connection over any async byte stream.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::{Connection, ConnectionId, TransportError};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Lines read ahead of the consumer. Once this many are waiting the reader
/// stops pulling from the socket, so a flooding peer is slowed down by the
/// transport instead of growing memory.
pub const MAX_PENDING_LINES: usize = 64;

/// A line-oriented connection.
///
/// The read half is drained by a background task into a bounded channel
/// (see [`MAX_PENDING_LINES`]), which turns "is there a line waiting?"
/// into a plain `try_recv`. The write half sits behind a mutex so whole
/// messages are written without interleaving.
pub struct LineConnection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    writer: Mutex<BoxedWriter>,
    inbound: mpsc::Receiver<io::Result<String>>,
    reader: JoinHandle<()>,
}

impl LineConnection {
    /// Wraps a stream. Must be called from within a Tokio runtime.
    pub fn new<S>(id: ConnectionId, stream: S, peer: Option<SocketAddr>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (tx, rx) = mpsc::channel(MAX_PENDING_LINES);

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim_end_matches('\r').to_string();
                        if tx.send(Ok(line)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
            }
            tracing::trace!(%id, "line reader finished");
        });

        Self {
            id,
            peer,
            writer: Mutex::new(Box::new(write_half)),
            inbound: rx,
            reader,
        }
    }

    /// The remote address, when the stream has one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Connection for LineConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv_line(&mut self) -> Result<Option<String>, Self::Error> {
        match self.inbound.recv().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(TransportError::ReceiveFailed(e)),
            None => Ok(None),
        }
    }

    fn try_recv_line(&mut self) -> Result<Option<String>, Self::Error> {
        use mpsc::error::TryRecvError;

        match self.inbound.try_recv() {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(TransportError::ReceiveFailed(e)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(
                TransportError::ConnectionClosed(format!("{} closed by peer", self.id)),
            ),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for LineConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
