//! Plain TCP transport: one listener on the host, one dialer per participant.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::{ConnectionId, LineConnection, Transport, TransportError};

/// A TCP [`Transport`] that produces [`LineConnection`]s.
///
/// Connection ids come from a counter owned by this transport, so two hosts
/// in the same process never share an id space.
pub struct TcpLineTransport {
    listener: TcpListener,
    next_id: u64,
}

impl TcpLineTransport {
    /// Binds a new listener to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            next_id: 1,
        })
    }

    /// Returns the address the listener is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpLineTransport {
    type Connection = LineConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "could not disable Nagle");
        }

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        tracing::debug!(%id, %addr, "accepted TCP connection");

        Ok(LineConnection::new(id, stream, Some(addr)))
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Dials out to a host, for the participant role.
pub async fn dial(addr: &str) -> Result<LineConnection, TransportError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(TransportError::ConnectFailed)?;
    let peer = stream.peer_addr().ok();
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(addr, error = %e, "could not disable Nagle");
    }
    tracing::debug!(addr, "connected to host");
    Ok(LineConnection::new(ConnectionId::new(0), stream, peer))
}
