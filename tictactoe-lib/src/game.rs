use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Board, BoardPoint, PlayerMark};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("move code {0} is outside 1-9")]
    OutOfRange(u8),
    #[error("cell {0} is already occupied")]
    Occupied(BoardPoint),
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerMark),
    #[error("game is already over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    NoResult,
    Draw,
    OWin,
    XWin,
}

impl GameResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameResult::NoResult)
    }
}

impl From<PlayerMark> for GameResult {
    fn from(mark: PlayerMark) -> Self {
        match mark {
            PlayerMark::X => GameResult::XWin,
            PlayerMark::O => GameResult::OWin,
        }
    }
}

impl Display for GameResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::NoResult => write!(f, "NO_RESULT"),
            GameResult::Draw => write!(f, "DRAW"),
            GameResult::OWin => write!(f, "O_WIN"),
            GameResult::XWin => write!(f, "X_WIN"),
        }
    }
}

/// Rules state for one match: the grid, whose turn it is, and the result
/// so far.
pub struct TicTacToe {
    board: Board,
    move_count: u8,
    next_player: PlayerMark,
    result: GameResult,
}

impl TicTacToe {
    pub const MAX_MOVES: u8 = 9;

    pub fn new() -> Self {
        TicTacToe {
            board: Board::new(),
            move_count: 0,
            next_player: PlayerMark::X,
            result: GameResult::NoResult,
        }
    }

    /// Applies one move for `player`. Rejections leave the board, the move
    /// count, and the turn untouched.
    pub fn play(&mut self, player: PlayerMark, code: u8) -> Result<GameResult, MoveError> {
        if self.result.is_terminal() {
            return Err(MoveError::GameOver);
        }
        if player != self.next_player {
            return Err(MoveError::NotYourTurn(player));
        }
        let point = BoardPoint::from_move_code(code).ok_or(MoveError::OutOfRange(code))?;
        self.board.place(point, player)?;
        self.move_count += 1;
        self.next_player = player.other();
        self.result = self.check_result();
        Ok(self.result)
    }

    /// Scans rows, then columns, then the two diagonals; the first complete
    /// line decides the game. A full board with no line is a draw, so a
    /// ninth move that completes a line still scores as a win.
    fn check_result(&self) -> GameResult {
        for row in 0..Board::SIDE {
            if let Some(mark) = self.line_owner([
                BoardPoint { row, col: 0 },
                BoardPoint { row, col: 1 },
                BoardPoint { row, col: 2 },
            ]) {
                return mark.into();
            }
        }
        for col in 0..Board::SIDE {
            if let Some(mark) = self.line_owner([
                BoardPoint { row: 0, col },
                BoardPoint { row: 1, col },
                BoardPoint { row: 2, col },
            ]) {
                return mark.into();
            }
        }
        if let Some(mark) = self.line_owner([
            BoardPoint { row: 0, col: 0 },
            BoardPoint { row: 1, col: 1 },
            BoardPoint { row: 2, col: 2 },
        ]) {
            return mark.into();
        }
        if let Some(mark) = self.line_owner([
            BoardPoint { row: 0, col: 2 },
            BoardPoint { row: 1, col: 1 },
            BoardPoint { row: 2, col: 0 },
        ]) {
            return mark.into();
        }
        if self.move_count == Self::MAX_MOVES {
            GameResult::Draw
        } else {
            GameResult::NoResult
        }
    }

    fn line_owner(&self, line: [BoardPoint; 3]) -> Option<PlayerMark> {
        let first = self.board[line[0]].mark()?;
        line[1..]
            .iter()
            .all(|point| self.board[point].mark() == Some(first))
            .then_some(first)
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn is_over(&self) -> bool {
        self.result.is_terminal()
    }

    pub fn move_count(&self) -> u8 {
        self.move_count
    }

    pub fn next_player(&self) -> PlayerMark {
        self.next_player
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}
