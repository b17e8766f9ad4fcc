use core::fmt;
use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Index, IndexMut},
    slice::Chunks,
};

use serde::{Deserialize, Serialize};

use crate::game::MoveError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    #[serde(rename = "e")]
    Empty,
    #[serde(rename = "x")]
    X,
    #[serde(rename = "o")]
    O,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn mark(&self) -> Option<PlayerMark> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(PlayerMark::X),
            Cell::O => Some(PlayerMark::O),
        }
    }
}

impl From<PlayerMark> for Cell {
    fn from(mark: PlayerMark) -> Self {
        match mark {
            PlayerMark::X => Cell::X,
            PlayerMark::O => Cell::O,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => write!(f, "-"),
            Cell::X => write!(f, "X"),
            Cell::O => write!(f, "O"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerMark {
    #[serde(rename = "x")]
    X,
    #[serde(rename = "o")]
    O,
}

impl PlayerMark {
    pub fn other(self) -> Self {
        match self {
            PlayerMark::X => PlayerMark::O,
            PlayerMark::O => PlayerMark::X,
        }
    }
}

impl Display for PlayerMark {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PlayerMark::X => write!(f, "X"),
            PlayerMark::O => write!(f, "O"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardPoint {
    pub row: usize,
    pub col: usize,
}

impl BoardPoint {
    /// Maps a 1-9 wire move code onto the grid, row-major from the top-left
    /// corner. Anything outside 1-9 is not a cell.
    pub fn from_move_code(code: u8) -> Option<Self> {
        if !(1..=9).contains(&code) {
            return None;
        }
        let index = usize::from(code - 1);
        Some(BoardPoint {
            row: index / Board::SIDE,
            col: index % Board::SIDE,
        })
    }
}

impl Display for BoardPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<&Board> for Vec<Vec<Cell>> {
    fn from(value: &Board) -> Self {
        value.rows_iter().map(|row| row.to_vec()).collect()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Cell; Board::SIDE * Board::SIDE],
}

impl Board {
    pub const SIDE: usize = 3;

    pub fn new() -> Self {
        Board {
            cells: [Cell::Empty; Board::SIDE * Board::SIDE],
        }
    }

    /// Cells only ever go from empty to a mark; a second mark on the same
    /// cell is rejected and nothing changes.
    pub fn place(&mut self, point: BoardPoint, mark: PlayerMark) -> Result<(), MoveError> {
        if !self[point].is_empty() {
            return Err(MoveError::Occupied(point));
        }
        self[point] = mark.into();
        Ok(())
    }

    pub fn rows_iter(&self) -> Chunks<'_, Cell> {
        self.cells.chunks(Self::SIDE)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<BoardPoint> for Board {
    type Output = Cell;

    fn index(&self, point: BoardPoint) -> &Self::Output {
        &self.cells[point.row * Self::SIDE + point.col]
    }
}

impl IndexMut<BoardPoint> for Board {
    fn index_mut(&mut self, point: BoardPoint) -> &mut Self::Output {
        &mut self.cells[point.row * Self::SIDE + point.col]
    }
}

impl Index<&BoardPoint> for Board {
    type Output = Cell;

    fn index(&self, point: &BoardPoint) -> &Self::Output {
        &self[*point]
    }
}

impl IndexMut<&BoardPoint> for Board {
    fn index_mut(&mut self, point: &BoardPoint) -> &mut Self::Output {
        &mut self[*point]
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rows = self
            .rows_iter()
            .map(|row| {
                row.iter()
                    .fold(String::new(), |acc, cell| acc + &format!("{cell}"))
            })
            .collect::<Vec<_>>()
            .join("\n");
        write!(f, "{rows}")
    }
}

impl Debug for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}
