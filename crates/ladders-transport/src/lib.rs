//! Transport abstraction layer for Ladders.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! how participants reach the host, plus [`LineConnection`], a
//! newline-delimited text connection over any async byte stream.
//!
//! # Feature Flags
//!
//! - `tcp` (default): plain TCP listener and dialer

mod error;
mod line;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
pub use line::{LineConnection, MAX_PENDING_LINES};
#[cfg(feature = "tcp")]
pub use tcp::{TcpLineTransport, dial};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// Stops handing out new connections.
    fn shutdown(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// A single participant connection that exchanges text lines.
///
/// Reads come in two flavors: [`recv_line`](Self::recv_line) waits for the
/// next line, [`try_recv_line`](Self::try_recv_line) never waits and is what
/// the host's polling loop uses so one silent client cannot stall the rest.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes raw bytes to the peer and flushes them.
    ///
    /// The caller is responsible for line terminators.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Waits for the next line from the peer, without its terminator.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv_line(
        &mut self,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Returns the next buffered line, if one is already available.
    ///
    /// `Ok(None)` means "nothing pending right now". A closed connection is
    /// reported as an error so the caller can apply its disconnect policy.
    fn try_recv_line(&mut self) -> Result<Option<String>, Self::Error>;

    /// Closes the write side of the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "ann");
        map.insert(ConnectionId::new(2), "bo");
        assert_eq!(map[&ConnectionId::new(1)], "ann");
    }
}
