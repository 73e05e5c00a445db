//! Protocol definitions shared by the pong server and its clients.
//!
//! Everything both sides must agree on byte-for-byte lives here: the game
//! field constants and the binary wire format. Every message on the wire, in
//! both directions, starts with a 5-byte header (type tag + big-endian `u32`
//! payload length) followed by exactly that many payload bytes. Payload
//! layouts are fixed, big-endian, unpadded and unversioned.
//!
//! Encoding produces the complete frame (header included); decoding consumes
//! the payload that follows a decoded header. Both directions are pure
//! functions over byte slices with no side effects.

use thiserror::Error;

/// Playing field width in game units.
pub const GAME_WIDTH: f32 = 800.0;
/// Playing field height in game units.
pub const GAME_HEIGHT: f32 = 600.0;
/// Paddle width; paddles sit flush against the left and right edges.
pub const PADDLE_WIDTH: f32 = 15.0;
/// Paddle height.
pub const PADDLE_HEIGHT: f32 = 100.0;
/// Ball edge length (the ball is square).
pub const BALL_SIZE: f32 = 10.0;
/// Ball displacement per simulation tick.
pub const BALL_SPEED: f32 = 5.0;
/// Paddle displacement per move command.
pub const PADDLE_SPEED: f32 = 8.0;
/// Simulation ticks per second.
pub const UPDATE_FREQUENCY: u32 = 60;

/// Wire header size: type tag (1 byte) + payload length (big-endian u32).
/// The length field excludes the header itself.
pub const HEADER_SIZE: usize = 5;

/// Game state snapshot, server to client, once per tick.
pub const MSG_GAME_STATE: u8 = 1;
/// Paddle movement command, client to server.
pub const MSG_PLAYER_MOVE: u8 = 2;
/// Player id assignment, server to client, once after accept.
pub const MSG_PLAYER_JOIN: u8 = 3;
/// Ready flag, client to server and relayed server to clients.
pub const MSG_PLAYER_READY: u8 = 4;

/// GameState payload size in bytes.
pub const GAME_STATE_LEN: usize = 21;
/// PlayerMove payload size in bytes.
pub const PLAYER_MOVE_LEN: usize = 2;
/// PlayerJoin payload size in bytes.
pub const PLAYER_JOIN_LEN: usize = 1;
/// PlayerReady payload size in bytes.
pub const PLAYER_READY_LEN: usize = 2;

/// Errors produced while decoding wire data.
///
/// Any of these is fatal to the connection that produced the bytes, never to
/// the server as a whole.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes were supplied than the header or payload requires.
    #[error("insufficient data: needed {needed} bytes, got {got}")]
    InsufficientData { needed: usize, got: usize },
    /// The header carried a type tag outside the message catalogue.
    #[error("unknown message type {0}")]
    UnknownMessageType(u8),
}

/// Decoded wire header: the message type tag and the payload length that
/// follows on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub msg_type: u8,
    pub length: u32,
}

/// Encodes a message header into its 5-byte wire form.
pub fn encode_header(msg_type: u8, length: u32) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0] = msg_type;
    header[1..HEADER_SIZE].copy_from_slice(&length.to_be_bytes());
    header
}

/// Decodes a message header from the first 5 bytes of `data`.
///
/// The type tag is not validated here; dispatch on it happens at the read
/// loop so that unknown tags can be reported per connection.
pub fn decode_header(data: &[u8]) -> Result<MessageHeader, ProtocolError> {
    check_len(data, HEADER_SIZE)?;
    Ok(MessageHeader {
        msg_type: data[0],
        length: u32::from_be_bytes([data[1], data[2], data[3], data[4]]),
    })
}

fn check_len(data: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if data.len() < needed {
        return Err(ProtocolError::InsufficientData {
            needed,
            got: data.len(),
        });
    }
    Ok(())
}

/// Builds a complete frame: header followed by the payload.
fn frame(msg_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.extend_from_slice(&encode_header(msg_type, payload.len() as u32));
    message.extend_from_slice(payload);
    message
}

// Callers check the payload length once up front; these helpers then read
// fixed-width fields at known offsets.
fn read_f32(data: &[u8], at: usize) -> f32 {
    f32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

/// Authoritative game snapshot, broadcast to both clients every tick.
///
/// Payload layout (21 bytes, big-endian):
/// - bytes 0-3: ball x (f32)
/// - bytes 4-7: ball y (f32)
/// - bytes 8-11: player 1 paddle y (f32)
/// - bytes 12-13: player 1 score (u16)
/// - bytes 14-17: player 2 paddle y (f32)
/// - bytes 18-19: player 2 score (u16)
/// - byte 20: 1 if the game is running, 0 otherwise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameState {
    pub ball_x: f32,
    pub ball_y: f32,
    pub player1_y: f32,
    pub player1_score: u16,
    pub player2_y: f32,
    pub player2_score: u16,
    pub is_running: u8,
}

impl GameState {
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(GAME_STATE_LEN);
        payload.extend_from_slice(&self.ball_x.to_be_bytes());
        payload.extend_from_slice(&self.ball_y.to_be_bytes());
        payload.extend_from_slice(&self.player1_y.to_be_bytes());
        payload.extend_from_slice(&self.player1_score.to_be_bytes());
        payload.extend_from_slice(&self.player2_y.to_be_bytes());
        payload.extend_from_slice(&self.player2_score.to_be_bytes());
        payload.push(self.is_running);
        frame(MSG_GAME_STATE, &payload)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len(payload, GAME_STATE_LEN)?;
        Ok(Self {
            ball_x: read_f32(payload, 0),
            ball_y: read_f32(payload, 4),
            player1_y: read_f32(payload, 8),
            player1_score: read_u16(payload, 12),
            player2_y: read_f32(payload, 14),
            player2_score: read_u16(payload, 18),
            is_running: payload[20],
        })
    }
}

/// Paddle movement command.
///
/// Payload layout (2 bytes): player id (u8), direction (i8; -1 up, 0 stop,
/// 1 down). The direction is accepted as-is; values outside that range are
/// not rejected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMove {
    pub player_id: u8,
    pub direction: i8,
}

impl PlayerMove {
    pub fn encode(&self) -> Vec<u8> {
        let payload = [self.player_id, self.direction as u8];
        frame(MSG_PLAYER_MOVE, &payload)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len(payload, PLAYER_MOVE_LEN)?;
        Ok(Self {
            player_id: payload[0],
            direction: payload[1] as i8,
        })
    }
}

/// Player id assignment, sent once to each client right after it connects.
///
/// Payload layout (1 byte): player id (u8; 1 or 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerJoin {
    pub player_id: u8,
}

impl PlayerJoin {
    pub fn encode(&self) -> Vec<u8> {
        frame(MSG_PLAYER_JOIN, &[self.player_id])
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len(payload, PLAYER_JOIN_LEN)?;
        Ok(Self {
            player_id: payload[0],
        })
    }
}

/// Ready flag, sent by a client and relayed verbatim to both clients.
///
/// Payload layout (2 bytes): player id (u8), ready (u8; 1 ready, 0 not).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerReady {
    pub player_id: u8,
    pub ready: u8,
}

impl PlayerReady {
    pub fn encode(&self) -> Vec<u8> {
        let payload = [self.player_id, self.ready];
        frame(MSG_PLAYER_READY, &payload)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len(payload, PLAYER_READY_LEN)?;
        Ok(Self {
            player_id: payload[0],
            ready: payload[1],
        })
    }
}
