use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use tictactoe_lib::game::MoveError;
use tictactoe_lib::packet::{ConnMsg, DataMsg, Packet, PacketError};

use crate::connection::Connection;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("connection lost: {0}")]
    Connection(#[from] io::Error),
    #[error("protocol violation: {0}")]
    Protocol(#[from] PacketError),
    #[error("unexpected packet {0}")]
    UnexpectedPacket(Packet),
    #[error("illegal move: {0}")]
    Move(#[from] MoveError),
    #[error("no move within the deadline")]
    MoveTimeout,
}

/// One connected player. Created at accept, handed to the matchmaker once
/// the username exchange completes, then owned by a game until teardown.
pub struct PlayerSession {
    conn: Mutex<Connection>,
    name: OnceLock<String>,
    peer: SocketAddr,
    ready: AtomicBool,
    in_game: AtomicBool,
    closed: AtomicBool,
}

impl PlayerSession {
    pub fn new(conn: Connection) -> Self {
        PlayerSession {
            peer: conn.peer(),
            conn: Mutex::new(conn),
            name: OnceLock::new(),
            ready: AtomicBool::new(false),
            in_game: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn name(&self) -> &str {
        self.name.get().map(String::as_str).unwrap_or("?")
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn is_in_game(&self) -> bool {
        self.in_game.load(Ordering::SeqCst)
    }

    pub fn mark_in_game(&self) {
        self.in_game.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Asks the client for its username and reads the reply line. Only
    /// after this succeeds does the session become visible to pairing.
    pub async fn request_username(&self) -> Result<String, SessionError> {
        self.send_packet(Packet::Conn(ConnMsg::UsernameRequest))
            .await?;
        let name = self.conn.lock().await.read_line().await?;
        let _ = self.name.set(name.clone());
        self.ready.store(true, Ordering::SeqCst);
        Ok(name)
    }

    pub async fn send_packet(&self, packet: Packet) -> Result<(), SessionError> {
        let frame = packet.encode()?;
        debug!(peer = %self.peer, %packet, "sending packet");
        self.conn.lock().await.write_frame(frame).await?;
        Ok(())
    }

    /// Reads the next frame; anything but a move is a violation mid-game.
    pub async fn read_move(&self) -> Result<u8, SessionError> {
        let frame = self.conn.lock().await.read_frame().await?;
        match Packet::decode(frame)? {
            Packet::Data(DataMsg::Move(code)) => Ok(code),
            other => Err(SessionError::UnexpectedPacket(other)),
        }
    }

    /// Shuts the socket down once, no matter how many teardown paths race.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.conn.lock().await.shutdown().await {
            debug!(peer = %self.peer, error = %e, "socket shutdown failed");
        }
    }
}
