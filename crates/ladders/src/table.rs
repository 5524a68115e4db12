//! The table task.
//!
//! One task owns the registry, the game, the restart ballot, the board
//! source and the die. Registration, the start sequence and the poll loop
//! all run here, so nothing that touches game state needs a lock and every
//! participant sees broadcasts in the same order.
//!
//! ```text
//! joins ──→ register ──(start)──→ START, delay, layout, state
//!                                      │
//!                                      ▼
//!                              tick: poll each seat once
//!                                      │
//!                        ROLL / RESTART_YES / RESTART_NO
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use ladders_game::{BoardSource, Dice, GameState};
use ladders_protocol::{Codec, Command, ServerMessage};
use ladders_session::{BallotOutcome, ParticipantId, RestartBallot, SessionError, SessionRegistry};
use ladders_tick::{TickConfig, TickScheduler};
use ladders_transport::Connection;
use tokio::sync::{Notify, mpsc, watch};

use crate::handler::{Join, fallback_name};
use crate::{DisconnectPolicy, LaddersError, ServerConfig};

pub(crate) struct Table<C> {
    registry: SessionRegistry<C>,
    game: Option<GameState>,
    ballot: RestartBallot,
    boards: Box<dyn BoardSource>,
    dice: Box<dyn Dice>,
    codec: Box<dyn Codec>,
    policy: DisconnectPolicy,
    start_delay: Duration,
    threshold: usize,
    auto_start: Option<usize>,
    tick: TickConfig,
    /// Connections found dead, waiting for the disconnect policy.
    lost: VecDeque<ParticipantId>,
    /// Dead seats kept under [`DisconnectPolicy::Tolerate`].
    tolerated: HashSet<ParticipantId>,
    ended: bool,
}

impl<C: Connection> Table<C> {
    pub(crate) fn new(
        config: &ServerConfig,
        boards: Box<dyn BoardSource>,
        dice: Box<dyn Dice>,
    ) -> Self {
        Self {
            registry: SessionRegistry::with_send_timeout(config.send_timeout()),
            game: None,
            ballot: RestartBallot::new(config.one_vote_per_round),
            boards,
            dice,
            codec: config.wire_format.codec(),
            policy: config.disconnect_policy,
            start_delay: config.start_delay(),
            threshold: config.start_threshold(),
            auto_start: config.auto_start,
            tick: config.tick_config(),
            lost: VecDeque::new(),
            tolerated: HashSet::new(),
            ended: false,
        }
    }

    /// Seats a participant. A blank name becomes `Player N`.
    pub(crate) fn register(&mut self, name: String, conn: C) -> ParticipantId {
        let name = if name.is_empty() {
            fallback_name(self.registry.len())
        } else {
            name
        };
        self.registry.register(name, conn)
    }

    /// Runs the table to completion: registration, then the game.
    ///
    /// `started` flips to `true` once registration closes, so the listener
    /// can turn latecomers away.
    pub(crate) async fn run(
        mut self,
        mut joins: mpsc::Receiver<Join<C>>,
        start: Arc<Notify>,
        started: watch::Sender<bool>,
    ) -> Result<(), LaddersError> {
        let mut requested = false;
        loop {
            tokio::select! {
                join = joins.recv() => {
                    let Some(join) = join else {
                        tracing::info!("listener stopped before the game started");
                        return Ok(());
                    };
                    self.register(join.name, join.conn);
                    let joined = self.registry.len();
                    if self.auto_start.is_some_and(|n| joined >= n) {
                        requested = true;
                    }
                }
                _ = start.notified() => {
                    requested = true;
                }
            }

            if requested {
                if self.registry.len() >= self.threshold {
                    break;
                }
                tracing::info!(
                    joined = self.registry.len(),
                    needed = self.threshold,
                    "start requested, waiting for more participants"
                );
            }
        }

        started.send_replace(true);
        // Handshakes still in flight lose their way in.
        drop(joins);

        let result = self.play().await;
        self.registry.close_all().await;
        result
    }

    async fn play(&mut self) -> Result<(), LaddersError> {
        self.start().await?;

        let mut ticks = TickScheduler::new(self.tick.clone());
        while !self.ended {
            ticks.wait_for_tick().await;
            self.poll_once().await?;
            ticks.record_tick_end();
        }
        tracing::info!("table closed");
        Ok(())
    }

    /// Announces the game, waits the start delay, then deals the board and
    /// the opening state.
    pub(crate) async fn start(&mut self) -> Result<(), LaddersError> {
        tracing::info!(participants = self.registry.len(), "starting game");
        self.broadcast(&ServerMessage::Start).await?;
        self.settle().await?;
        if self.ended {
            return Ok(());
        }

        tokio::time::sleep(self.start_delay).await;

        let board = self.boards.next_board();
        let layout = board.layout();
        let mut game = GameState::new(self.registry.names(), board)?;
        for seat in 0..self.registry.len() {
            if self.registry.get(seat).is_some_and(|p| p.is_departed()) {
                game.depart(seat)?;
            }
        }
        let snapshot = game.snapshot(0, game.opening_status(false));
        self.game = Some(game);

        self.broadcast(&ServerMessage::Layout(layout)).await?;
        self.broadcast(&ServerMessage::State(snapshot)).await?;
        self.settle().await
    }

    /// Reads at most one line from every seat, in seat order, and acts on
    /// it.
    pub(crate) async fn poll_once(&mut self) -> Result<(), LaddersError> {
        for seat in 0..self.registry.len() {
            let Some(id) = self.registry.get(seat).map(|p| p.id) else {
                continue;
            };
            if self.tolerated.contains(&id) {
                continue;
            }
            match self.registry.poll(seat) {
                Ok(Some(line)) => self.dispatch(seat, &line).await?,
                Ok(None) => {}
                Err(SessionError::ConnectionLost(id)) => self.note_lost(id),
                Err(e) => return Err(e.into()),
            }
        }
        self.settle().await
    }

    async fn dispatch(&mut self, seat: usize, line: &str) -> Result<(), LaddersError> {
        let Some(command) = Command::parse(line) else {
            tracing::debug!(seat, line, "unrecognized command ignored");
            return Ok(());
        };
        match command {
            Command::Roll => self.roll(seat).await,
            Command::RestartYes => self.vote(seat, true).await,
            Command::RestartNo => self.vote(seat, false).await,
        }
    }

    async fn roll(&mut self, seat: usize) -> Result<(), LaddersError> {
        let Some(game) = self.game.as_mut() else {
            return Ok(());
        };
        if game.is_finished() || game.current_turn() != seat {
            tracing::debug!(
                seat,
                turn = game.current_turn(),
                finished = game.is_finished(),
                "roll ignored"
            );
            return Ok(());
        }

        let die = self.dice.roll();
        let outcome = game.roll_and_move(die)?;
        if outcome.won {
            tracing::info!(seat, wins = game.wins()[seat], "game won");
        } else if !outcome.keeps_turn() {
            game.advance_turn();
        }

        let snapshot = game.snapshot(die, outcome.status);
        self.broadcast(&ServerMessage::State(snapshot)).await
    }

    async fn vote(&mut self, seat: usize, yes: bool) -> Result<(), LaddersError> {
        let Some(voter) = self.registry.get(seat).map(|p| p.id) else {
            return Ok(());
        };
        if !self.game.as_ref().is_some_and(GameState::is_finished) {
            tracing::debug!(%voter, "restart vote before the game finished ignored");
            return Ok(());
        }

        if !yes {
            self.ballot.cast_negative(voter);
            return Ok(());
        }
        match self.ballot.cast_affirmative(voter, self.registry.count()) {
            BallotOutcome::Quorum => self.restart().await,
            outcome => {
                tracing::debug!(%voter, ?outcome, "restart vote counted");
                Ok(())
            }
        }
    }

    /// Deals a fresh board and puts every piece back on the first cell.
    async fn restart(&mut self) -> Result<(), LaddersError> {
        let Some(game) = self.game.as_mut() else {
            return Ok(());
        };
        let board = self.boards.next_board();
        let layout = board.layout();
        game.set_board(board);
        game.reset();
        self.ballot.clear();
        let snapshot = game.snapshot(0, game.opening_status(true));

        tracing::info!("new game started");
        self.broadcast(&ServerMessage::Layout(layout)).await?;
        self.broadcast(&ServerMessage::State(snapshot)).await
    }

    /// Encodes once and writes to every live seat. Failed seats are queued
    /// for [`settle`](Self::settle).
    ///
    /// A message the codec refuses is logged and skipped; the next state
    /// snapshot carries the full picture anyway.
    async fn broadcast(&mut self, msg: &ServerMessage) -> Result<(), LaddersError> {
        let bytes = match self.codec.encode(msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "message could not be encoded, not sent");
                return Ok(());
            }
        };
        for id in self.registry.broadcast(&bytes).await {
            self.note_lost(id);
        }
        Ok(())
    }

    fn note_lost(&mut self, id: ParticipantId) {
        if !self.lost.contains(&id) {
            self.lost.push_back(id);
        }
    }

    /// Applies the disconnect policy to every queued dead connection.
    async fn settle(&mut self) -> Result<(), LaddersError> {
        while let Some(id) = self.lost.pop_front() {
            self.handle_departure(id).await?;
        }
        Ok(())
    }

    async fn handle_departure(&mut self, id: ParticipantId) -> Result<(), LaddersError> {
        let name = self
            .registry
            .seat_of(id)
            .and_then(|seat| self.registry.get(seat))
            .map(|p| p.name.clone())
            .unwrap_or_default();

        match self.policy {
            DisconnectPolicy::Tolerate => {
                if self.tolerated.insert(id) {
                    tracing::warn!(%id, name = %name, "connection lost, keeping the seat");
                }
                Ok(())
            }
            DisconnectPolicy::EndSession => {
                tracing::warn!(%id, name = %name, "connection lost, ending the session");
                self.ended = true;
                Err(LaddersError::SessionEnded(format!("{name} disconnected")))
            }
            DisconnectPolicy::DropAndContinue => {
                let seat = self.registry.depart(id).await?;
                if self.registry.count() == 0 {
                    tracing::info!("every participant has left");
                    self.ended = true;
                    return Ok(());
                }
                let Some(game) = self.game.as_mut() else {
                    return Ok(());
                };
                game.depart(seat)?;
                let finished = game.is_finished();
                let snapshot = game.snapshot(0, format!("{name} left the game."));
                self.broadcast(&ServerMessage::State(snapshot)).await?;

                // The seat no longer counts towards the restart quorum, and
                // neither do its votes.
                self.ballot.withdraw(id);
                if finished && self.ballot.recheck(self.registry.count()) == BallotOutcome::Quorum {
                    self.restart().await?;
                }
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn game_mut(&mut self) -> Option<&mut GameState> {
        self.game.as_mut()
    }
}
