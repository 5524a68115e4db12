//! Error types for the protocol layer.
//!
//! Each crate in Ladders defines its own error enum. A `ProtocolError`
//! always means a message could not be turned into text, or text could not
//! be turned back into a message. Networking problems live in
//! `TransportError`.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a message as JSON failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A JSON line could not be parsed into a message.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message cannot be represented on the line wire format.
    ///
    /// For example a display name containing the list separator, or a
    /// status line that would be mistaken for the `fim:` terminator.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A field was present but its value did not parse.
    #[error("malformed {field} field: {value:?}")]
    Malformed {
        /// The field tag, e.g. `posicoes`.
        field: &'static str,
        /// The raw text that failed to parse.
        value: String,
    },

    /// A line arrived that does not fit the message being assembled.
    #[error("unexpected line: {0:?}")]
    UnexpectedLine(String),
}
