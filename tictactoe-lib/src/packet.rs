use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::game::GameResult;

/// Every protocol message is exactly two bytes: a type tag and a payload.
pub const FRAME_LEN: usize = 2;

pub const CONN_TAG: u8 = 0xAA;
pub const DATA_TAG: u8 = 0xFF;
pub const ADMIN_TAG: u8 = 0xCC;

pub const DRAW_CODE: u8 = 11;
pub const O_WIN_CODE: u8 = 12;
pub const X_WIN_CODE: u8 = 13;
// Internal marker only; a frame carrying it is invalid.
const NO_RESULT_CODE: u8 = 14;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    #[error("unknown packet type tag {0:#04x}")]
    UnknownType(u8),
    #[error("invalid payload {payload} for packet type {tag:#04x}")]
    InvalidPayload { tag: u8, payload: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnMsg {
    UsernameRequest,
    Player1Indication,
    Player2Indication,
}

impl ConnMsg {
    fn code(self) -> u8 {
        match self {
            ConnMsg::UsernameRequest => 0,
            ConnMsg::Player1Indication => 5,
            ConnMsg::Player2Indication => 6,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ConnMsg::UsernameRequest),
            5 => Some(ConnMsg::Player1Indication),
            6 => Some(ConnMsg::Player2Indication),
            _ => None,
        }
    }
}

impl Display for ConnMsg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConnMsg::UsernameRequest => write!(f, "USERNAME_REQUEST"),
            ConnMsg::Player1Indication => write!(f, "PLAYER1_INDICATION"),
            ConnMsg::Player2Indication => write!(f, "PLAYER2_INDICATION"),
        }
    }
}

/// Operational queries; decoded for completeness, unexpected mid-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminMsg {
    GameCount,
    Reboot,
    ListGames,
    GameInfo,
    Start,
    Shutdown,
}

impl AdminMsg {
    fn code(self) -> u8 {
        match self {
            AdminMsg::GameCount => 1,
            AdminMsg::Reboot => 2,
            AdminMsg::ListGames => 3,
            AdminMsg::GameInfo => 4,
            AdminMsg::Start => 7,
            AdminMsg::Shutdown => 8,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(AdminMsg::GameCount),
            2 => Some(AdminMsg::Reboot),
            3 => Some(AdminMsg::ListGames),
            4 => Some(AdminMsg::GameInfo),
            7 => Some(AdminMsg::Start),
            8 => Some(AdminMsg::Shutdown),
            _ => None,
        }
    }
}

impl Display for AdminMsg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AdminMsg::GameCount => write!(f, "GAME_COUNT"),
            AdminMsg::Reboot => write!(f, "REBOOT"),
            AdminMsg::ListGames => write!(f, "LIST_GAMES"),
            AdminMsg::GameInfo => write!(f, "GAME_INFO"),
            AdminMsg::Start => write!(f, "START"),
            AdminMsg::Shutdown => write!(f, "SHUTDOWN"),
        }
    }
}

/// A move code from a client, or a terminal result from the server; the
/// two ranges never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMsg {
    Move(u8),
    Result(GameResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    Conn(ConnMsg),
    Data(DataMsg),
    Admin(AdminMsg),
}

impl Packet {
    /// Validates before any byte is produced; a malformed frame can never
    /// reach the wire through here.
    pub fn encode(self) -> Result<[u8; FRAME_LEN], PacketError> {
        let (tag, payload) = match self {
            Packet::Conn(msg) => (CONN_TAG, msg.code()),
            Packet::Data(DataMsg::Move(code)) => {
                if !(1..=9).contains(&code) {
                    return Err(PacketError::InvalidPayload {
                        tag: DATA_TAG,
                        payload: code,
                    });
                }
                (DATA_TAG, code)
            }
            Packet::Data(DataMsg::Result(result)) => (DATA_TAG, result_code(result)?),
            Packet::Admin(msg) => (ADMIN_TAG, msg.code()),
        };
        Ok([tag, payload])
    }

    pub fn decode(bytes: [u8; FRAME_LEN]) -> Result<Packet, PacketError> {
        let [tag, payload] = bytes;
        match tag {
            CONN_TAG => ConnMsg::from_code(payload)
                .map(Packet::Conn)
                .ok_or(PacketError::InvalidPayload { tag, payload }),
            DATA_TAG => data_from_code(payload)
                .map(Packet::Data)
                .ok_or(PacketError::InvalidPayload { tag, payload }),
            ADMIN_TAG => AdminMsg::from_code(payload)
                .map(Packet::Admin)
                .ok_or(PacketError::InvalidPayload { tag, payload }),
            other => Err(PacketError::UnknownType(other)),
        }
    }
}

fn result_code(result: GameResult) -> Result<u8, PacketError> {
    match result {
        GameResult::Draw => Ok(DRAW_CODE),
        GameResult::OWin => Ok(O_WIN_CODE),
        GameResult::XWin => Ok(X_WIN_CODE),
        GameResult::NoResult => Err(PacketError::InvalidPayload {
            tag: DATA_TAG,
            payload: NO_RESULT_CODE,
        }),
    }
}

fn data_from_code(code: u8) -> Option<DataMsg> {
    match code {
        1..=9 => Some(DataMsg::Move(code)),
        DRAW_CODE => Some(DataMsg::Result(GameResult::Draw)),
        O_WIN_CODE => Some(DataMsg::Result(GameResult::OWin)),
        X_WIN_CODE => Some(DataMsg::Result(GameResult::XWin)),
        _ => None,
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Conn(msg) => write!(f, "CONN::{msg}"),
            Packet::Data(DataMsg::Move(code)) => write!(f, "DATA::MOVE({code})"),
            Packet::Data(DataMsg::Result(result)) => write!(f, "DATA::{result}"),
            Packet::Admin(msg) => write!(f, "ADMIN::{msg}"),
        }
    }
}
