pub mod connection;
pub mod game;
pub mod matchmaker;
pub mod registry;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::connection::Connection;
use crate::registry::{GameRegistry, SessionRegistry};
use crate::session::PlayerSession;

pub const DEFAULT_PORT: u16 = 9000;
pub const MAX_PLAYERS: usize = 10_000;
pub const MOVE_TIMEOUT: Duration = Duration::from_secs(300);

/// State shared by the accept path, handshake tasks, matchmaker, and games.
pub struct ServerState {
    pub sessions: SessionRegistry,
    pub games: GameRegistry,
    pub matchmaker_wake: Notify,
}

impl ServerState {
    pub fn new() -> Self {
        ServerState {
            sessions: SessionRegistry::new(),
            games: GameRegistry::new(),
            matchmaker_wake: Notify::new(),
        }
    }

    /// Sessions waiting for a match plus two players per live game.
    pub fn live_players(&self) -> usize {
        self.sessions.len() + 2 * self.games.len()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds the listen socket and serves forever; the bind is the only fatal
/// failure.
pub async fn run(port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    serve(listener).await
}

pub async fn serve(listener: TcpListener) -> Result<()> {
    let state = Arc::new(ServerState::new());
    if let Ok(addr) = listener.local_addr() {
        info!(port = addr.port(), "server listening");
    }
    tokio::spawn(matchmaker::run(state.clone()));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };
        info!(%peer, "incoming connection");
        if state.live_players() >= MAX_PLAYERS {
            warn!(%peer, "player limit reached, dropping connection");
            continue;
        }
        let session = Arc::new(PlayerSession::new(Connection::new(stream, peer)));
        state.sessions.insert(session.clone());
        tokio::spawn(handshake(session, state.clone()));
    }
}

async fn handshake(session: Arc<PlayerSession>, state: Arc<ServerState>) {
    match session.request_username().await {
        Ok(name) => {
            info!(peer = %session.peer(), name = %name, "player ready");
            state.matchmaker_wake.notify_one();
        }
        Err(e) => {
            warn!(peer = %session.peer(), error = %e, "username exchange failed");
            state.sessions.remove(&session);
            session.close().await;
        }
    }
}
