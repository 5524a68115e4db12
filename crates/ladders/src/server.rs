//! `LaddersServer` builder and accept loop.
//!
//! The server ties the layers together: the TCP listener feeds named
//! connections to the table task, which runs the game.

use std::sync::Arc;
use std::time::Duration;

use ladders_game::{BoardGenerator, BoardSource, Dice, GeneratorConfig, RandomDice};
use ladders_protocol::WireFormat;
use ladders_tick::TickPolicy;
use ladders_transport::{Connection, TcpLineTransport, Transport, TransportError};
use tokio::sync::{Notify, mpsc, watch};

use crate::handler::{Join, handshake};
use crate::table::Table;
use crate::{DisconnectPolicy, LaddersError, ServerConfig};

/// Fires the start of the game from outside the server.
///
/// Cheap to clone. Starting twice, or before enough participants joined,
/// is harmless: the request is held until the table can act on it.
#[derive(Clone, Default)]
pub struct StartHandle {
    notify: Arc<Notify>,
}

impl StartHandle {
    pub fn start(&self) {
        self.notify.notify_one();
    }
}

/// Builder for configuring and starting a Ladders host.
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), ladders::LaddersError> {
/// use ladders::LaddersServer;
///
/// let server = LaddersServer::builder()
///     .bind("0.0.0.0:7070")
///     .auto_start(2)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct LaddersServerBuilder {
    config: ServerConfig,
    boards: Option<Box<dyn BoardSource>>,
    dice: Option<Box<dyn Dice>>,
}

impl LaddersServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            boards: None,
            dice: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.config.start_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn name_timeout(mut self, timeout: Duration) -> Self {
        self.config.name_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// How long a write to one participant may stall before the disconnect
    /// policy applies to it.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn tick_policy(mut self, policy: TickPolicy) -> Self {
        self.config.tick_policy = policy;
        self
    }

    pub fn min_players(mut self, n: usize) -> Self {
        self.config.min_players = n;
        self
    }

    /// Starts the game once `n` participants have joined.
    pub fn auto_start(mut self, n: usize) -> Self {
        self.config.auto_start = Some(n);
        self
    }

    pub fn disconnect_policy(mut self, policy: DisconnectPolicy) -> Self {
        self.config.disconnect_policy = policy;
        self
    }

    pub fn one_vote_per_round(mut self, enabled: bool) -> Self {
        self.config.one_vote_per_round = enabled;
        self
    }

    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.config.wire_format = format;
        self
    }

    pub fn generator(mut self, generator: GeneratorConfig) -> Self {
        self.config.generator = generator;
        self
    }

    /// Makes boards and dice reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Overrides where boards come from. Defaults to a [`BoardGenerator`].
    pub fn board_source(mut self, boards: impl BoardSource) -> Self {
        self.boards = Some(Box::new(boards));
        self
    }

    /// Overrides the die. Defaults to a [`RandomDice`].
    pub fn dice(mut self, dice: impl Dice) -> Self {
        self.dice = Some(Box::new(dice));
        self
    }

    /// Validates the configuration and binds the listener.
    pub async fn build(self) -> Result<LaddersServer, LaddersError> {
        self.config.validate()?;
        let transport = TcpLineTransport::bind(&self.config.bind_addr).await?;

        let seed = self.config.seed;
        let boards: Box<dyn BoardSource> = match (self.boards, seed) {
            (Some(boards), _) => boards,
            (None, Some(seed)) => Box::new(BoardGenerator::seeded(self.config.generator.clone(), seed)),
            (None, None) => Box::new(BoardGenerator::from_os_rng(self.config.generator.clone())),
        };
        let dice: Box<dyn Dice> = match (self.dice, seed) {
            (Some(dice), _) => dice,
            (None, Some(seed)) => Box::new(RandomDice::seeded(seed.wrapping_add(1))),
            (None, None) => Box::new(RandomDice::from_os_rng()),
        };

        Ok(LaddersServer {
            transport,
            config: self.config,
            boards,
            dice,
            start: StartHandle::default(),
        })
    }
}

impl Default for LaddersServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Hands every named connection to the table until the game starts, then
/// closes newcomers straight away.
async fn accept_loop<T>(
    mut transport: T,
    joins: mpsc::Sender<Join<T::Connection>>,
    started: watch::Receiver<bool>,
    name_timeout: Duration,
) where
    T: Transport,
    T::Connection: Connection<Error = TransportError>,
{
    loop {
        let conn = match transport.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                // Usually out of file descriptors; give the table a moment
                // to release some.
                tracing::error!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        if *started.borrow() {
            tracing::info!(conn_id = %conn.id(), "game already started, turning connection away");
            let _ = conn.close().await;
            continue;
        }

        let joins = joins.clone();
        tokio::spawn(async move {
            match handshake(conn, name_timeout).await {
                Ok(join) => {
                    if joins.send(join).await.is_err() {
                        tracing::debug!("registration closed during handshake");
                    }
                }
                Err(e) => tracing::debug!(error = %e, "handshake failed"),
            }
        });
    }
}

/// A bound Ladders host.
///
/// Call [`run()`](Self::run) to accept participants and play.
pub struct LaddersServer {
    transport: TcpLineTransport,
    config: ServerConfig,
    boards: Box<dyn BoardSource>,
    dice: Box<dyn Dice>,
    start: StartHandle,
}

impl LaddersServer {
    pub fn builder() -> LaddersServerBuilder {
        LaddersServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle that starts the game when fired.
    pub fn start_handle(&self) -> StartHandle {
        self.start.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts participants until the start, then plays until the table
    /// closes.
    ///
    /// Returns once every participant has left, or with
    /// [`LaddersError::SessionEnded`] under
    /// [`DisconnectPolicy::EndSession`].
    pub async fn run(self) -> Result<(), LaddersError> {
        let Self {
            transport,
            config,
            boards,
            dice,
            start,
        } = self;
        tracing::info!(
            addr = %config.bind_addr,
            format = ?config.wire_format,
            policy = %config.disconnect_policy,
            "Ladders host running"
        );

        let (join_tx, join_rx) = mpsc::channel(16);
        let (started_tx, started_rx) = watch::channel(false);
        let name_timeout = config.name_timeout();

        let accept = tokio::spawn(accept_loop(transport, join_tx, started_rx, name_timeout));

        let table = Table::new(&config, boards, dice);
        let result = table.run(join_rx, start.notify, started_tx).await;
        accept.abort();
        result
    }
}
