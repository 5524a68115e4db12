//! The participant side: dial the host, introduce yourself, follow along.
//!
//! [`ParticipantClient`] keeps a [`TableView`] in step with everything the
//! host broadcasts, so a presentation layer only has to draw the view and
//! call [`roll`](ParticipantClient::roll) or
//! [`vote`](ParticipantClient::vote).

use ladders_game::Board;
use ladders_protocol::{Cell, Command, Decoder, ServerMessage, StateSnapshot, WireFormat};
use ladders_transport::{Connection, LineConnection, dial};

use crate::LaddersError;

/// What a participant knows about the table.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    started: bool,
    board: Board,
    state: Option<StateSnapshot>,
}

impl TableView {
    /// Folds one host message into the view.
    pub fn apply(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Start => self.started = true,
            ServerMessage::Layout(layout) => self.board = Board::from_layout(layout.clone()),
            ServerMessage::State(state) => self.state = Some(state.clone()),
        }
    }

    /// `true` once the host sent `START`.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The board from the latest layout; empty before the first one.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The latest state snapshot.
    pub fn state(&self) -> Option<&StateSnapshot> {
        self.state.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.finished)
    }

    /// Seat of the first participant called `name`.
    pub fn seat_of(&self, name: &str) -> Option<usize> {
        self.state.as_ref()?.names.iter().position(|n| n == name)
    }

    /// Whether `name` holds the turn in the latest snapshot.
    pub fn is_turn_of(&self, name: &str) -> bool {
        match (&self.state, self.seat_of(name)) {
            (Some(state), Some(seat)) => state.current_turn == seat && !state.finished,
            _ => false,
        }
    }

    /// Where `name`'s piece stands.
    pub fn position_of(&self, name: &str) -> Option<Cell> {
        let seat = self.seat_of(name)?;
        self.state.as_ref()?.positions.get(seat).copied()
    }
}

/// A connection to a Ladders host.
pub struct ParticipantClient {
    name: String,
    conn: LineConnection,
    decoder: Box<dyn Decoder>,
    view: TableView,
}

impl ParticipantClient {
    /// Dials `addr` and sends `name` as the first line.
    pub async fn connect(addr: &str, name: &str, format: WireFormat) -> Result<Self, LaddersError> {
        let conn = dial(addr).await?;
        conn.send(format!("{name}\n").as_bytes()).await?;
        tracing::info!(addr, name, "joined host");
        Ok(Self {
            name: name.to_string(),
            conn,
            decoder: format.codec().decoder(),
            view: TableView::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    /// Waits for the next complete host message and applies it to the
    /// view. Returns `None` once the host hangs up.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, LaddersError> {
        while let Some(line) = self.conn.recv_line().await? {
            if let Some(msg) = self.decoder.feed(&line)? {
                self.view.apply(&msg);
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }

    /// Reads messages until one satisfies `pred`, returning it.
    pub async fn wait_for(
        &mut self,
        mut pred: impl FnMut(&ServerMessage) -> bool,
    ) -> Result<Option<ServerMessage>, LaddersError> {
        while let Some(msg) = self.next_message().await? {
            if pred(&msg) {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }

    /// Asks the host to roll. Ignored by the host unless it is our turn.
    pub async fn roll(&self) -> Result<(), LaddersError> {
        self.send(Command::Roll).await
    }

    /// Votes on playing again after a win.
    pub async fn vote(&self, again: bool) -> Result<(), LaddersError> {
        self.send(if again {
            Command::RestartYes
        } else {
            Command::RestartNo
        })
        .await
    }

    async fn send(&self, command: Command) -> Result<(), LaddersError> {
        tracing::debug!(name = %self.name, %command, "sending command");
        self.conn.send(&command.to_line()).await?;
        Ok(())
    }

    /// Closes the connection.
    pub async fn leave(self) -> Result<(), LaddersError> {
        self.conn.close().await?;
        Ok(())
    }
}
