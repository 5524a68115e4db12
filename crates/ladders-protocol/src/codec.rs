//! Codec traits and implementations for host → participant messages.
//!
//! A "codec" (coder/decoder) converts between [`ServerMessage`] values and
//! newline-terminated text. Encoding is stateless: one message in, one
//! chunk of bytes out. Decoding is not, because the default line format
//! spreads a single message over several lines. That is why decoding goes
//! through a separate [`Decoder`] object that the reader feeds one line at
//! a time.
//!
//! Two formats are provided:
//!
//! - [`LineCodec`]: the positional text format every existing client
//!   speaks. Field order is load-bearing and the multi-line status ends
//!   only when a line starting with `fim:` shows up.
//! - [`JsonCodec`]: one JSON object per line. No positional framing at
//!   all; behind the `json` feature (enabled by default).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Cell, Layout, ProtocolError, ServerMessage, StateSnapshot};

/// Turns server messages into wire bytes.
///
/// `Send + Sync + 'static` because the host keeps one codec for its whole
/// lifetime and uses it from inside a spawned Tokio task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message, including its final line terminator.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the message cannot be represented in
    /// this format.
    fn encode(&self, msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError>;

    /// Creates a fresh decoder for one incoming stream.
    fn decoder(&self) -> Box<dyn Decoder>;
}

/// Reassembles server messages from a stream of lines.
pub trait Decoder: Send {
    /// Feeds one line (without its terminator).
    ///
    /// Returns `Ok(Some(msg))` when the line completes a message and
    /// `Ok(None)` when more lines are needed. After an error the decoder
    /// is back in its idle state and ready for the next message.
    fn feed(&mut self, line: &str) -> Result<Option<ServerMessage>, ProtocolError>;
}

// ---------------------------------------------------------------------------
// WireFormat
// ---------------------------------------------------------------------------

/// Selects a codec by name, for configuration files and command lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// [`LineCodec`].
    #[default]
    Lines,
    /// [`JsonCodec`].
    #[cfg(feature = "json")]
    JsonLines,
}

impl WireFormat {
    /// Returns the codec for this format.
    pub fn codec(self) -> Box<dyn Codec> {
        match self {
            Self::Lines => Box::new(LineCodec),
            #[cfg(feature = "json")]
            Self::JsonLines => Box::new(JsonCodec),
        }
    }
}

impl FromStr for WireFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lines" => Ok(Self::Lines),
            #[cfg(feature = "json")]
            "json" | "json_lines" => Ok(Self::JsonLines),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown wire format {other:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

const START: &str = "START";
const SNAKES: &str = "COBRAS:";
const LADDERS: &str = "ESCADAS:";
const STATE: &str = "ESTADO";
const NAMES: &str = "vez:";
const TURN: &str = "indiceVez:";
const POSITIONS: &str = "posicoes:";
const WINS: &str = "vitorias:";
const DIE: &str = "dado:";
const STATUS: &str = "status:";
const END: &str = "fim:";

/// The positional line format.
///
/// ```text
/// START
/// COBRAS:17-7,54-34
/// ESCADAS:3-20,40-59
/// ESTADO
/// vez:Ann,Bo
/// indiceVez:1
/// posicoes:20,1
/// vitorias:0,0
/// dado:2
/// status:Ann rolled a 2.
/// Ann climbed a ladder! Goes up to cell 20.
/// fim:0
/// ```
///
/// A layout is two lines, so the decoder holds on to the snakes until the
/// ladders arrive and then yields a single [`ServerMessage::Layout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl Codec for LineCodec {
    fn encode(&self, msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
        let text = match msg {
            ServerMessage::Start => format!("{START}\n"),
            ServerMessage::Layout(layout) => encode_layout(layout),
            ServerMessage::State(state) => encode_state(state)?,
        };
        Ok(text.into_bytes())
    }

    fn decoder(&self) -> Box<dyn Decoder> {
        Box::new(LineDecoder::default())
    }
}

fn encode_pairs(pairs: &BTreeMap<Cell, Cell>) -> String {
    pairs
        .iter()
        .map(|(from, to)| format!("{from}-{to}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_list<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_layout(layout: &Layout) -> String {
    format!(
        "{SNAKES}{}\n{LADDERS}{}\n",
        encode_pairs(&layout.snakes),
        encode_pairs(&layout.ladders)
    )
}

fn encode_state(state: &StateSnapshot) -> Result<String, ProtocolError> {
    if let Some(name) = state.names.iter().find(|n| n.contains([',', '\n', '\r'])) {
        return Err(ProtocolError::InvalidMessage(format!(
            "name {name:?} contains a separator"
        )));
    }

    let mut out = String::new();
    // `write!` into a String cannot fail.
    let _ = writeln!(out, "{STATE}");
    let _ = writeln!(out, "{NAMES}{}", state.names.join(","));
    let _ = writeln!(out, "{TURN}{}", state.current_turn);
    let _ = writeln!(out, "{POSITIONS}{}", encode_list(&state.positions));
    let _ = writeln!(out, "{WINS}{}", encode_list(&state.wins));
    let _ = writeln!(out, "{DIE}{}", state.die);

    let mut lines = state.status.lines();
    let _ = writeln!(out, "{STATUS}{}", lines.next().unwrap_or(""));
    for line in lines {
        if line.starts_with(END) {
            return Err(ProtocolError::InvalidMessage(format!(
                "status line {line:?} would end the state block early"
            )));
        }
        let _ = writeln!(out, "{line}");
    }

    let _ = writeln!(out, "{END}{}", u8::from(state.finished));
    Ok(out)
}

// ---------------------------------------------------------------------------
// LineDecoder
// ---------------------------------------------------------------------------

/// Where the decoder is inside a state block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Stage {
    #[default]
    Idle,
    Names,
    Turn,
    Positions,
    Wins,
    Die,
    Status,
    StatusOrEnd,
}

#[derive(Debug, Default)]
struct PartialState {
    names: Vec<String>,
    current_turn: usize,
    positions: Vec<Cell>,
    wins: Vec<u32>,
    die: u8,
    status: String,
}

/// Stateful decoder for [`LineCodec`].
#[derive(Debug, Default)]
pub struct LineDecoder {
    stage: Stage,
    partial: PartialState,
    pending_snakes: Option<BTreeMap<Cell, Cell>>,
}

impl LineDecoder {
    fn idle_line(&mut self, line: &str) -> Result<Option<ServerMessage>, ProtocolError> {
        if line == START {
            return Ok(Some(ServerMessage::Start));
        }
        if let Some(rest) = line.strip_prefix(SNAKES) {
            self.pending_snakes = Some(parse_pairs("COBRAS", rest)?);
            return Ok(None);
        }
        if let Some(rest) = line.strip_prefix(LADDERS) {
            let ladders = parse_pairs("ESCADAS", rest)?;
            let snakes = self.pending_snakes.take().unwrap_or_default();
            return Ok(Some(ServerMessage::Layout(Layout { snakes, ladders })));
        }
        if line == STATE {
            self.partial = PartialState::default();
            self.stage = Stage::Names;
            return Ok(None);
        }
        Err(ProtocolError::UnexpectedLine(line.to_string()))
    }

    fn state_line(&mut self, line: &str) -> Result<Option<ServerMessage>, ProtocolError> {
        match self.stage {
            Stage::Idle => unreachable!("idle lines are handled by idle_line"),
            Stage::Names => {
                let value = field(line, NAMES)?;
                self.partial.names = if value.is_empty() {
                    Vec::new()
                } else {
                    value.split(',').map(str::to_string).collect()
                };
                self.stage = Stage::Turn;
            }
            Stage::Turn => {
                self.partial.current_turn = parse_value("indiceVez", field(line, TURN)?)?;
                self.stage = Stage::Positions;
            }
            Stage::Positions => {
                self.partial.positions = parse_list("posicoes", field(line, POSITIONS)?)?;
                self.stage = Stage::Wins;
            }
            Stage::Wins => {
                self.partial.wins = parse_list("vitorias", field(line, WINS)?)?;
                self.stage = Stage::Die;
            }
            Stage::Die => {
                self.partial.die = parse_value("dado", field(line, DIE)?)?;
                self.stage = Stage::Status;
            }
            Stage::Status => {
                self.partial.status = field(line, STATUS)?.to_string();
                self.stage = Stage::StatusOrEnd;
            }
            Stage::StatusOrEnd => {
                let Some(flag) = line.strip_prefix(END) else {
                    self.partial.status.push('\n');
                    self.partial.status.push_str(line);
                    return Ok(None);
                };
                let finished = match flag {
                    "1" => true,
                    "0" => false,
                    other => {
                        return Err(ProtocolError::Malformed {
                            field: "fim",
                            value: other.to_string(),
                        });
                    }
                };
                let partial = std::mem::take(&mut self.partial);
                self.stage = Stage::Idle;
                return Ok(Some(ServerMessage::State(StateSnapshot {
                    names: partial.names,
                    current_turn: partial.current_turn,
                    positions: partial.positions,
                    wins: partial.wins,
                    die: partial.die,
                    status: partial.status,
                    finished,
                })));
            }
        }
        Ok(None)
    }
}

impl Decoder for LineDecoder {
    fn feed(&mut self, line: &str) -> Result<Option<ServerMessage>, ProtocolError> {
        let result = if self.stage == Stage::Idle {
            self.idle_line(line)
        } else {
            self.state_line(line)
        };
        if result.is_err() {
            self.stage = Stage::Idle;
            self.partial = PartialState::default();
        }
        result
    }
}

fn field<'a>(line: &'a str, tag: &str) -> Result<&'a str, ProtocolError> {
    line.strip_prefix(tag)
        .ok_or_else(|| ProtocolError::UnexpectedLine(line.to_string()))
}

fn parse_value<T: FromStr>(field: &'static str, value: &str) -> Result<T, ProtocolError> {
    value.trim().parse().map_err(|_| ProtocolError::Malformed {
        field,
        value: value.to_string(),
    })
}

fn parse_list<T: FromStr>(field: &'static str, value: &str) -> Result<Vec<T>, ProtocolError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value.split(',').map(|item| parse_value(field, item)).collect()
}

fn parse_pairs(field: &'static str, value: &str) -> Result<BTreeMap<Cell, Cell>, ProtocolError> {
    let mut pairs = BTreeMap::new();
    for pair in value.split(',').filter(|p| !p.is_empty()) {
        let (from, to) = pair.split_once('-').ok_or_else(|| ProtocolError::Malformed {
            field,
            value: pair.to_string(),
        })?;
        pairs.insert(parse_value(field, from)?, parse_value(field, to)?);
    }
    Ok(pairs)
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that writes every message as a single JSON line.
///
/// The status text keeps its embedded newlines inside the JSON string, so
/// nothing depends on field order or on sentinel lines.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = serde_json::to_vec(msg).map_err(ProtocolError::Encode)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn decoder(&self) -> Box<dyn Decoder> {
        Box::new(JsonDecoder)
    }
}

/// Decoder for [`JsonCodec`]. Stateless: every line is a whole message.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

#[cfg(feature = "json")]
impl Decoder for JsonDecoder {
    fn feed(&mut self, line: &str) -> Result<Option<ServerMessage>, ProtocolError> {
        serde_json::from_str(line)
            .map(Some)
            .map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: &str) -> StateSnapshot {
        StateSnapshot {
            names: vec!["Ann".into(), "Bo".into()],
            current_turn: 1,
            positions: vec![20, 1],
            wins: vec![0, 2],
            die: 2,
            status: status.into(),
            finished: false,
        }
    }

    fn encode_text(msg: &ServerMessage) -> String {
        String::from_utf8(LineCodec.encode(msg).unwrap()).unwrap()
    }

    fn decode_all(text: &str) -> Vec<ServerMessage> {
        let mut decoder = LineCodec.decoder();
        text.lines()
            .filter_map(|line| decoder.feed(line).unwrap())
            .collect()
    }

    #[test]
    fn test_start_is_a_single_line() {
        assert_eq!(encode_text(&ServerMessage::Start), "START\n");
    }

    #[test]
    fn test_layout_lines_are_sorted_pairs() {
        let layout = Layout {
            snakes: BTreeMap::from([(54, 34), (17, 7)]),
            ladders: BTreeMap::from([(3, 20)]),
        };
        assert_eq!(
            encode_text(&ServerMessage::Layout(layout)),
            "COBRAS:17-7,54-34\nESCADAS:3-20\n"
        );
    }

    #[test]
    fn test_empty_layout_has_empty_lists() {
        let text = encode_text(&ServerMessage::Layout(Layout::default()));
        assert_eq!(text, "COBRAS:\nESCADAS:\n");
        assert_eq!(
            decode_all(&text),
            vec![ServerMessage::Layout(Layout::default())]
        );
    }

    #[test]
    fn test_state_block_field_order() {
        let text = encode_text(&ServerMessage::State(snapshot("Ann rolled a 2.")));
        assert_eq!(
            text,
            "ESTADO\nvez:Ann,Bo\nindiceVez:1\nposicoes:20,1\nvitorias:0,2\n\
             dado:2\nstatus:Ann rolled a 2.\nfim:0\n"
        );
    }

    #[test]
    fn test_multiline_status_uses_continuation_lines() {
        let status = "Ann rolled a 2.\nAnn climbed a ladder! Goes up to cell 20.";
        let text = encode_text(&ServerMessage::State(snapshot(status)));
        assert!(text.contains(
            "status:Ann rolled a 2.\nAnn climbed a ladder! Goes up to cell 20.\nfim:0\n"
        ));

        let decoded = decode_all(&text);
        assert_eq!(decoded, vec![ServerMessage::State(snapshot(status))]);
    }

    #[test]
    fn test_finished_flag_encodes_as_one() {
        let mut state = snapshot("Ann won the game!");
        state.finished = true;
        let text = encode_text(&ServerMessage::State(state));
        assert!(text.ends_with("fim:1\n"));
    }

    #[test]
    fn test_encode_rejects_comma_in_name() {
        let mut state = snapshot("x");
        state.names[0] = "Ann,Bo".into();
        assert!(matches!(
            LineCodec.encode(&ServerMessage::State(state)),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_encode_rejects_status_line_that_looks_like_terminator() {
        let state = snapshot("first\nfim:1");
        assert!(LineCodec.encode(&ServerMessage::State(state)).is_err());
    }

    #[test]
    fn test_decoder_pairs_snakes_with_following_ladders() {
        let mut decoder = LineDecoder::default();
        assert_eq!(decoder.feed("COBRAS:40-12").unwrap(), None);
        let msg = decoder.feed("ESCADAS:3-20,8-27").unwrap();
        assert_eq!(
            msg,
            Some(ServerMessage::Layout(Layout {
                snakes: BTreeMap::from([(40, 12)]),
                ladders: BTreeMap::from([(3, 20), (8, 27)]),
            }))
        );
    }

    #[test]
    fn test_decoder_rejects_out_of_order_field_and_recovers() {
        let mut decoder = LineDecoder::default();
        decoder.feed("ESTADO").unwrap();
        let err = decoder.feed("indiceVez:0").unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedLine(_)));

        // Back to idle: a fresh message decodes normally.
        assert_eq!(decoder.feed("START").unwrap(), Some(ServerMessage::Start));
    }

    #[test]
    fn test_decoder_reports_malformed_numbers() {
        let mut decoder = LineDecoder::default();
        for line in ["ESTADO", "vez:Ann", "indiceVez:0"] {
            decoder.feed(line).unwrap();
        }
        let err = decoder.feed("posicoes:1,x").unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Malformed { field: "posicoes", .. }
        ));
    }

    #[test]
    fn test_decoder_rejects_bad_pair() {
        let mut decoder = LineDecoder::default();
        assert!(matches!(
            decoder.feed("COBRAS:40"),
            Err(ProtocolError::Malformed { field: "COBRAS", .. })
        ));
    }

    #[test]
    fn test_decoder_rejects_unknown_line_when_idle() {
        let mut decoder = LineDecoder::default();
        assert!(matches!(
            decoder.feed("HELLO"),
            Err(ProtocolError::UnexpectedLine(_))
        ));
    }

    #[test]
    fn test_wire_format_from_str() {
        assert_eq!("lines".parse::<WireFormat>().unwrap(), WireFormat::Lines);
        assert!("xml".parse::<WireFormat>().is_err());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_keeps_status_newlines_in_one_line() {
        let status = "Bo rolled a 6.\nBo rolled a 6 and plays again!";
        let msg = ServerMessage::State(snapshot(status));
        let bytes = JsonCodec.encode(&msg).unwrap();

        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));

        let mut decoder = JsonCodec.decoder();
        assert_eq!(decoder.feed(text.trim_end()).unwrap(), Some(msg));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_layout_survives_integer_keys() {
        let msg = ServerMessage::Layout(Layout {
            snakes: BTreeMap::from([(99, 41)]),
            ladders: BTreeMap::from([(2, 38)]),
        });
        let bytes = JsonCodec.encode(&msg).unwrap();
        let line = std::str::from_utf8(&bytes).unwrap().trim_end();
        assert_eq!(JsonCodec.decoder().feed(line).unwrap(), Some(msg));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_decoder_rejects_garbage() {
        assert!(matches!(
            JsonDecoder.feed("{not json"),
            Err(ProtocolError::Decode(_))
        ));
    }
}
