//! The ordered participant registry.
//!
//! Participants are never removed, only marked departed, so a seat index
//! handed out at registration stays valid for the life of the table and
//! lines up with the game state's per-seat vectors.

use std::fmt;
use std::time::Duration;

use ladders_transport::Connection;

use crate::SessionError;

/// Identifies a participant within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(u64);

impl ParticipantId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant-{}", self.0)
    }
}

/// One seat at the table.
pub struct Participant<C> {
    pub id: ParticipantId,
    pub name: String,
    conn: C,
    departed: bool,
}

impl<C: Connection> Participant<C> {
    pub fn is_departed(&self) -> bool {
        self.departed
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }
}

/// Participants in join order.
pub struct SessionRegistry<C> {
    participants: Vec<Participant<C>>,
    next_id: u64,
    send_timeout: Option<Duration>,
}

impl<C: Connection> Default for SessionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection> SessionRegistry<C> {
    /// A registry whose writes may wait indefinitely.
    pub fn new() -> Self {
        Self {
            participants: Vec::new(),
            next_id: 1,
            send_timeout: None,
        }
    }

    /// A registry that gives up on a participant whose write makes no
    /// progress within `limit`.
    pub fn with_send_timeout(limit: Duration) -> Self {
        Self {
            send_timeout: Some(limit),
            ..Self::new()
        }
    }

    /// Appends a participant and returns its id. Its seat index is the
    /// number of participants registered before it.
    pub fn register(&mut self, name: impl Into<String>, conn: C) -> ParticipantId {
        let id = ParticipantId(self.next_id);
        self.next_id += 1;
        let name = name.into();
        tracing::info!(
            %id,
            name = %name,
            seat = self.participants.len(),
            conn = %conn.id(),
            "participant registered"
        );
        self.participants.push(Participant {
            id,
            name,
            conn,
            departed: false,
        });
        id
    }

    /// Participants still connected.
    pub fn count(&self) -> usize {
        self.participants.iter().filter(|p| !p.departed).count()
    }

    /// Participants ever registered, departed ones included.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Display names in seat order.
    pub fn names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name.clone()).collect()
    }

    pub fn get(&self, seat: usize) -> Option<&Participant<C>> {
        self.participants.get(seat)
    }

    /// Seat index of `id`.
    pub fn seat_of(&self, id: ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant<C>> {
        self.participants.iter()
    }

    /// Writes `bytes` to every connected participant.
    ///
    /// A failed or timed-out write does not stop delivery to the others.
    /// Returns the ids whose write failed; the caller decides what to do
    /// with them.
    pub async fn broadcast(&self, bytes: &[u8]) -> Vec<ParticipantId> {
        let mut failed = Vec::new();
        for participant in self.participants.iter().filter(|p| !p.departed) {
            let sent = match self.send_timeout {
                Some(limit) => match tokio::time::timeout(limit, participant.conn.send(bytes)).await {
                    Ok(sent) => sent.map_err(|e| e.to_string()),
                    Err(_) => Err(format!("peer not reading, gave up after {limit:?}")),
                },
                None => participant.conn.send(bytes).await.map_err(|e| e.to_string()),
            };
            if let Err(error) = sent {
                tracing::warn!(id = %participant.id, error = %error, "broadcast write failed");
                failed.push(participant.id);
            }
        }
        failed
    }

    /// Reads at most one pending line from the participant at `seat`
    /// without waiting.
    ///
    /// Departed seats and unknown seats always read as empty.
    ///
    /// # Errors
    /// [`SessionError::ConnectionLost`] once the connection has closed and
    /// every buffered line has been read.
    pub fn poll(&mut self, seat: usize) -> Result<Option<String>, SessionError> {
        let Some(participant) = self.participants.get_mut(seat) else {
            return Ok(None);
        };
        if participant.departed {
            return Ok(None);
        }
        let id = participant.id;
        participant.conn.try_recv_line().map_err(|e| {
            tracing::debug!(%id, error = %e, "poll failed");
            SessionError::ConnectionLost(id)
        })
    }

    /// Marks a participant as gone and closes its connection. Returns its
    /// seat index. Departing twice is a no-op.
    pub async fn depart(&mut self, id: ParticipantId) -> Result<usize, SessionError> {
        let seat = self.seat_of(id).ok_or(SessionError::NotFound(id))?;
        let participant = &mut self.participants[seat];
        if !participant.departed {
            participant.departed = true;
            if let Err(e) = participant.conn.close().await {
                tracing::debug!(%id, error = %e, "close after departure failed");
            }
            tracing::info!(%id, name = %participant.name, "participant departed");
        }
        Ok(seat)
    }

    /// Closes every connection still open.
    pub async fn close_all(&self) {
        for participant in self.participants.iter().filter(|p| !p.departed) {
            if let Err(e) = participant.conn.close().await {
                tracing::debug!(id = %participant.id, error = %e, "close failed");
            }
        }
    }
}
