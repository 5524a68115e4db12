//! Per-connection name handshake.
//!
//! A participant's first line is its display name. Each accepted
//! connection gets a short task running [`handshake`]; on success the
//! connection is handed to the table together with its cleaned-up name.

use std::time::Duration;

use ladders_protocol::ProtocolError;
use ladders_transport::{Connection, TransportError};

use crate::LaddersError;

/// A connection that has introduced itself.
pub(crate) struct Join<C> {
    pub(crate) name: String,
    pub(crate) conn: C,
}

/// Waits up to `timeout` for the name line.
///
/// On failure the connection is closed or dropped.
pub(crate) async fn handshake<C: Connection<Error = TransportError>>(
    mut conn: C,
    timeout: Duration,
) -> Result<Join<C>, LaddersError> {
    let conn_id = conn.id();

    let line = match tokio::time::timeout(timeout, conn.recv_line()).await {
        Ok(Ok(Some(line))) => line,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before sending a name".into(),
            )
            .into());
        }
        Ok(Err(e)) => {
            let _ = conn.close().await;
            return Err(e.into());
        }
        Err(_) => {
            tracing::info!(%conn_id, ?timeout, "no name received in time");
            let _ = conn.close().await;
            return Err(ProtocolError::InvalidMessage("name timed out".into()).into());
        }
    };

    let name = sanitize_name(&line);
    tracing::debug!(%conn_id, name = %name, "name received");
    Ok(Join { name, conn })
}

/// Trims the name and replaces characters the line format cannot carry.
///
/// Status lines start with a participant's name, so a name must not start
/// with the `fim:` tag that ends a state block; such names get a leading
/// `_`.
///
/// May return an empty string; the table substitutes
/// [`fallback_name`] once it knows the seat.
pub(crate) fn sanitize_name(raw: &str) -> String {
    let name: String = raw
        .trim()
        .chars()
        .map(|c| if c == ',' || c.is_control() { '_' } else { c })
        .collect();
    if name.starts_with(STATE_END_TAG) {
        format!("_{name}")
    } else {
        name
    }
}

const STATE_END_TAG: &str = "fim:";

/// Name for a participant that sent a blank one. Seats count from 1.
pub(crate) fn fallback_name(seat: usize) -> String {
    format!("Player {}", seat + 1)
}

#[cfg(test)]
mod tests {
    use ladders_transport::{ConnectionId, LineConnection};
    use tokio::io::{AsyncWriteExt, duplex};

    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Ann  "), "Ann");
        assert_eq!(sanitize_name("Ann,Bo"), "Ann_Bo");
        assert_eq!(sanitize_name("a\tb"), "a_b");
        assert_eq!(sanitize_name("   "), "");
        assert_eq!(sanitize_name("Zoë"), "Zoë");
    }

    #[test]
    fn test_sanitize_name_defuses_state_terminator() {
        assert_eq!(sanitize_name("fim:0"), "_fim:0");
        assert_eq!(sanitize_name("  fim:1 "), "_fim:1");
        assert_eq!(sanitize_name("Joe fim:0"), "Joe fim:0");
        assert_eq!(sanitize_name("fim"), "fim");
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(fallback_name(0), "Player 1");
        assert_eq!(fallback_name(3), "Player 4");
    }

    #[tokio::test]
    async fn test_handshake_reads_first_line() {
        let (local, mut remote) = duplex(256);
        let conn = LineConnection::new(ConnectionId::new(1), local, None);
        remote.write_all(b" Ann \nROLL\n").await.unwrap();

        let mut join = handshake(conn, Duration::from_secs(5)).await.unwrap();
        assert_eq!(join.name, "Ann");
        // Lines after the name stay queued for the table.
        assert_eq!(join.conn.recv_line().await.unwrap().as_deref(), Some("ROLL"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_times_out() {
        let (local, _remote) = duplex(256);
        let conn = LineConnection::new(ConnectionId::new(1), local, None);

        let result = handshake(conn, Duration::from_secs(5)).await;
        assert!(matches!(
            result,
            Err(LaddersError::Protocol(ProtocolError::InvalidMessage(_)))
        ));
    }

    #[tokio::test]
    async fn test_handshake_peer_gone() {
        let (local, remote) = duplex(256);
        let conn = LineConnection::new(ConnectionId::new(1), local, None);
        drop(remote);

        assert!(handshake(conn, Duration::from_secs(5)).await.is_err());
    }
}
