//! # Ladders
//!
//! An authoritative snakes-and-ladders host for local networks.
//!
//! One process hosts the table: it accepts TCP connections, takes each
//! participant's first line as a display name, and once the game starts
//! it owns the board, the die and every piece. Participants only ask
//! ("roll for me", "play again?") and render what the host broadcasts.
//!
//! The layers underneath are separate crates:
//!
//! ```text
//! ladders-transport  newline-framed TCP connections
//! ladders-protocol   commands, server messages, codecs
//! ladders-session    participant registry, restart ballot
//! ladders-game       board generation, movement rules, dice
//! ladders-tick       fixed-rate polling schedule
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ladders::prelude::*;
//!
//! # async fn demo() -> Result<(), LaddersError> {
//! let server = LaddersServer::builder()
//!     .bind("0.0.0.0:7070")
//!     .auto_start(2)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! And from another machine:
//!
//! ```rust,no_run
//! use ladders::prelude::*;
//!
//! # async fn demo() -> Result<(), LaddersError> {
//! let mut client = ParticipantClient::connect("192.168.0.10:7070", "Ann", WireFormat::Lines).await?;
//! while let Some(msg) = client.next_message().await? {
//!     if client.view().is_turn_of("Ann") {
//!         client.roll().await?;
//!     }
//! #   let _ = msg;
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
mod server;
mod table;

pub use client::{ParticipantClient, TableView};
pub use config::{ConfigError, DisconnectPolicy, ServerConfig};
pub use error::LaddersError;
pub use server::{LaddersServer, LaddersServerBuilder, StartHandle};

pub use ladders_game as game;
pub use ladders_protocol as protocol;
pub use ladders_session as session;
pub use ladders_tick as tick;
pub use ladders_transport as transport;

/// Everything needed to host or join a table.
pub mod prelude {
    pub use crate::{
        ConfigError, DisconnectPolicy, LaddersError, LaddersServer, LaddersServerBuilder,
        ParticipantClient, ServerConfig, StartHandle, TableView,
    };
    pub use ladders_game::{
        Board, BoardGenerator, BoardSource, Dice, FixedBoard, GeneratorConfig, RandomDice,
        ScriptedDice,
    };
    pub use ladders_protocol::{Command, Layout, ServerMessage, StateSnapshot, WireFormat};
}
