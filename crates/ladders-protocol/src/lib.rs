//! Wire protocol for Ladders.
//!
//! This crate defines the "language" the host and its participants speak:
//!
//! - **Types** ([`Command`], [`ServerMessage`], [`StateSnapshot`],
//!   [`Layout`]): what travels on the wire.
//! - **Codecs** ([`Codec`] and [`Decoder`] traits, [`LineCodec`],
//!   [`JsonCodec`]): how those messages become text and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (lines of text) and the game
//! table (participants and game state). It knows nothing about sockets or
//! turns; it only knows how messages are spelled.
//!
//! ```text
//! Transport (lines) → Protocol (ServerMessage / Command) → Table (game)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, Decoder, LineCodec, LineDecoder, WireFormat};
#[cfg(feature = "json")]
pub use codec::{JsonCodec, JsonDecoder};
pub use error::ProtocolError;
pub use types::{Cell, Command, FIRST_CELL, LAST_CELL, Layout, ServerMessage, StateSnapshot};
