use std::sync::Arc;

use tracing::{debug, info};

use crate::game::Game;
use crate::ServerState;

/// Pairs everyone waiting and sweeps finished games each time it is woken.
/// `Notify` stores one permit, so a wake that lands mid-pass is picked up
/// by the next `notified`.
pub async fn run(state: Arc<ServerState>) {
    info!("matchmaker started");
    loop {
        state.matchmaker_wake.notified().await;
        pair_ready_sessions(&state);
        reap_finished_games(&state);
    }
}

fn pair_ready_sessions(state: &Arc<ServerState>) {
    while let Some((player1, player2)) = state.sessions.take_two_ready() {
        let game = Game::new(player1, player2);
        state.games.insert(game.handle());
        debug!(
            game = game.id(),
            player1 = game.player1().name(),
            player2 = game.player2().name(),
            "players paired"
        );
        tokio::spawn(game.run(state.clone()));
    }
}

fn reap_finished_games(state: &ServerState) {
    for id in state.games.reap_finished() {
        debug!(game = %id, "game removed");
    }
}
