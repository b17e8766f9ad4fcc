use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nanoid::nanoid;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use tictactoe_lib::board::PlayerMark;
use tictactoe_lib::game::{GameResult, MoveError, TicTacToe};
use tictactoe_lib::packet::{ConnMsg, DataMsg, Packet};

use crate::registry::GameHandle;
use crate::session::{PlayerSession, SessionError};
use crate::{ServerState, MOVE_TIMEOUT};

/// One match between two paired players; the first session plays X and
/// moves first.
pub struct Game {
    id: String,
    player1: Arc<PlayerSession>,
    player2: Arc<PlayerSession>,
    state: TicTacToe,
    over: Arc<AtomicBool>,
    move_timeout: Duration,
}

impl Game {
    pub fn new(player1: Arc<PlayerSession>, player2: Arc<PlayerSession>) -> Self {
        Game {
            id: nanoid!(8),
            player1,
            player2,
            state: TicTacToe::default(),
            over: Arc::new(AtomicBool::new(false)),
            move_timeout: MOVE_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_move_timeout(
        player1: Arc<PlayerSession>,
        player2: Arc<PlayerSession>,
        move_timeout: Duration,
    ) -> Self {
        Game {
            move_timeout,
            ..Game::new(player1, player2)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&self) -> GameHandle {
        GameHandle::new(self.id.clone(), self.over.clone())
    }

    pub fn player1(&self) -> &Arc<PlayerSession> {
        &self.player1
    }

    pub fn player2(&self) -> &Arc<PlayerSession> {
        &self.player2
    }

    fn session_for(&self, mark: PlayerMark) -> &Arc<PlayerSession> {
        match mark {
            PlayerMark::X => &self.player1,
            PlayerMark::O => &self.player2,
        }
    }

    /// Plays the match, then closes both sockets however it ended and
    /// wakes the matchmaker sweep.
    pub async fn run(mut self, state: Arc<ServerState>) {
        match self.play_to_completion().await {
            Ok(result) => {
                info!(game = %self.id, %result, moves = self.state.move_count(), "game finished");
            }
            Err(e) => {
                warn!(game = %self.id, error = %e, "game torn down");
            }
        }
        self.player1.close().await;
        self.player2.close().await;
        self.over.store(true, Ordering::SeqCst);
        state.matchmaker_wake.notify_one();
    }

    async fn play_to_completion(&mut self) -> Result<GameResult, SessionError> {
        self.player1
            .send_packet(Packet::Conn(ConnMsg::Player1Indication))
            .await?;
        self.player2
            .send_packet(Packet::Conn(ConnMsg::Player2Indication))
            .await?;
        info!(
            game = %self.id,
            player1 = self.player1.name(),
            player2 = self.player2.name(),
            "game started"
        );

        loop {
            let mover = self.state.next_player();
            let code = self.await_move(mover).await?;
            let result = match self.state.play(mover, code) {
                Ok(result) => result,
                Err(MoveError::Occupied(point)) => {
                    debug!(game = %self.id, player = %mover, %point, "move on occupied cell ignored");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            debug!(game = %self.id, player = %mover, code, "move applied\n{}", self.state.board());
            if result.is_terminal() {
                self.send_result(result, mover).await?;
                return Ok(result);
            }
            self.session_for(mover.other())
                .send_packet(Packet::Data(DataMsg::Move(code)))
                .await?;
        }
    }

    async fn await_move(&self, mover: PlayerMark) -> Result<u8, SessionError> {
        let session = self.session_for(mover);
        match timeout(self.move_timeout, session.read_move()).await {
            Ok(read) => read,
            Err(_) => {
                warn!(game = %self.id, player = %mover, peer = %session.peer(), "move deadline expired");
                Err(SessionError::MoveTimeout)
            }
        }
    }

    /// The final move is never relayed; the opponent learns the outcome
    /// from the result frame, which it receives before the mover does.
    async fn send_result(&self, result: GameResult, mover: PlayerMark) -> Result<(), SessionError> {
        let packet = Packet::Data(DataMsg::Result(result));
        self.session_for(mover.other()).send_packet(packet).await?;
        self.session_for(mover).send_packet(packet).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;

    use crate::testutil::ready_session;

    use super::*;

    async fn read_frame(stream: &mut TcpStream) -> [u8; 2] {
        let mut frame = [0u8; 2];
        timeout(Duration::from_secs(5), stream.read_exact(&mut frame))
            .await
            .expect("timed out waiting for a frame")
            .unwrap();
        frame
    }

    async fn send_move(stream: &mut TcpStream, code: u8) {
        stream.write_all(&[0xFF, code]).await.unwrap();
    }

    async fn expect_eof(stream: &mut TcpStream) {
        let mut buf = [0u8; 1];
        let n = timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("timed out waiting for the socket to close")
            .unwrap();
        assert_eq!(n, 0);
    }

    /// Spawns a game over two loopback connections and consumes the role
    /// indication frames, leaving both clients at the start of play.
    async fn started_game(
        move_timeout: Duration,
    ) -> (JoinHandle<()>, TcpStream, TcpStream, GameHandle) {
        let (p1, mut c1) = ready_session("alice").await;
        let (p2, mut c2) = ready_session("bob").await;
        let game = Game::with_move_timeout(p1, p2, move_timeout);
        let handle = game.handle();
        let driver = tokio::spawn(game.run(Arc::new(ServerState::new())));
        assert_eq!(read_frame(&mut c1).await, [0xAA, 5]);
        assert_eq!(read_frame(&mut c2).await, [0xAA, 6]);
        (driver, c1, c2, handle)
    }

    #[tokio::test]
    async fn moves_are_relayed_and_x_win_ends_the_game() {
        let (driver, mut c1, mut c2, handle) = started_game(MOVE_TIMEOUT).await;
        assert!(!handle.is_over());

        send_move(&mut c1, 1).await;
        assert_eq!(read_frame(&mut c2).await, [0xFF, 1]);
        send_move(&mut c2, 4).await;
        assert_eq!(read_frame(&mut c1).await, [0xFF, 4]);
        send_move(&mut c1, 2).await;
        assert_eq!(read_frame(&mut c2).await, [0xFF, 2]);
        send_move(&mut c2, 5).await;
        assert_eq!(read_frame(&mut c1).await, [0xFF, 5]);

        // the winning move is not relayed, both players get the result
        send_move(&mut c1, 3).await;
        assert_eq!(read_frame(&mut c2).await, [0xFF, 13]);
        assert_eq!(read_frame(&mut c1).await, [0xFF, 13]);

        expect_eof(&mut c1).await;
        expect_eof(&mut c2).await;
        driver.await.unwrap();
        assert!(handle.is_over());
    }

    #[tokio::test]
    async fn full_board_without_a_line_is_a_draw() {
        let (driver, mut c1, mut c2, handle) = started_game(MOVE_TIMEOUT).await;

        for (mover, code) in [
            (1, 1),
            (2, 3),
            (1, 2),
            (2, 4),
            (1, 6),
            (2, 5),
            (1, 7),
            (2, 8),
        ] {
            let (from, to) = if mover == 1 {
                (&mut c1, &mut c2)
            } else {
                (&mut c2, &mut c1)
            };
            send_move(from, code).await;
            assert_eq!(read_frame(to).await, [0xFF, code]);
        }
        send_move(&mut c1, 9).await;
        assert_eq!(read_frame(&mut c2).await, [0xFF, 11]);
        assert_eq!(read_frame(&mut c1).await, [0xFF, 11]);

        expect_eof(&mut c1).await;
        expect_eof(&mut c2).await;
        driver.await.unwrap();
        assert!(handle.is_over());
    }

    #[tokio::test]
    async fn occupied_cell_is_ignored_and_the_game_continues() {
        let (driver, mut c1, mut c2, _handle) = started_game(MOVE_TIMEOUT).await;

        send_move(&mut c1, 5).await;
        assert_eq!(read_frame(&mut c2).await, [0xFF, 5]);

        // trying the taken center produces no frame; the retry is relayed
        send_move(&mut c2, 5).await;
        send_move(&mut c2, 1).await;
        assert_eq!(read_frame(&mut c1).await, [0xFF, 1]);

        drop(c1);
        drop(c2);
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn disconnect_tears_the_game_down() {
        let (driver, c1, mut c2, handle) = started_game(MOVE_TIMEOUT).await;

        drop(c1);
        expect_eof(&mut c2).await;
        driver.await.unwrap();
        assert!(handle.is_over());
    }

    #[tokio::test]
    async fn admin_frame_mid_game_tears_the_game_down() {
        let (driver, mut c1, mut c2, handle) = started_game(MOVE_TIMEOUT).await;

        c1.write_all(&[0xCC, 1]).await.unwrap();
        expect_eof(&mut c1).await;
        expect_eof(&mut c2).await;
        driver.await.unwrap();
        assert!(handle.is_over());
    }

    #[tokio::test]
    async fn result_frame_from_a_client_tears_the_game_down() {
        let (driver, mut c1, mut c2, handle) = started_game(MOVE_TIMEOUT).await;

        c1.write_all(&[0xFF, 12]).await.unwrap();
        expect_eof(&mut c1).await;
        expect_eof(&mut c2).await;
        driver.await.unwrap();
        assert!(handle.is_over());
    }

    #[tokio::test]
    async fn undecodable_frame_tears_the_game_down() {
        let (driver, mut c1, mut c2, handle) = started_game(MOVE_TIMEOUT).await;

        c1.write_all(&[0xBB, 5]).await.unwrap();
        expect_eof(&mut c1).await;
        expect_eof(&mut c2).await;
        driver.await.unwrap();
        assert!(handle.is_over());
    }

    #[tokio::test]
    async fn silent_player_forfeits_on_the_deadline() {
        let (driver, mut c1, mut c2, handle) = started_game(Duration::from_millis(50)).await;

        expect_eof(&mut c1).await;
        expect_eof(&mut c2).await;
        driver.await.unwrap();
        assert!(handle.is_over());
    }

    #[tokio::test]
    async fn early_move_waits_in_the_buffer_until_the_turn() {
        let (driver, mut c1, mut c2, _handle) = started_game(MOVE_TIMEOUT).await;

        // O moves before X has played; nothing is read until it is O's turn
        send_move(&mut c2, 5).await;
        send_move(&mut c1, 1).await;
        assert_eq!(read_frame(&mut c2).await, [0xFF, 1]);
        assert_eq!(read_frame(&mut c1).await, [0xFF, 5]);

        drop(c1);
        drop(c2);
        driver.await.unwrap();
    }
}
