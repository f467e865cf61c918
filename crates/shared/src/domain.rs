use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(RoverId);
id_newtype!(MineId);

/// Status the service reports for a rover that ran over a mine.
pub const ROVER_STATUS_ELIMINATED: &str = "ROVER STATUS: ELIMINATED";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unknown cell code {0}")]
    UnknownCellCode(u8),
    #[error("grid row {row} has {found} cells, expected {expected}")]
    RaggedGrid {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown direction {0}")]
    UnknownDirection(u8),
    #[error("command code must be a single non-whitespace character, got {0:?}")]
    InvalidCommandCode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CellCode {
    #[default]
    Empty,
    Mine,
    RoverPath,
}

impl TryFrom<u8> for CellCode {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Mine),
            2 => Ok(Self::RoverPath),
            other => Err(DomainError::UnknownCellCode(other)),
        }
    }
}

impl From<CellCode> for u8 {
    fn from(value: CellCode) -> Self {
        match value {
            CellCode::Empty => 0,
            CellCode::Mine => 1,
            CellCode::RoverPath => 2,
        }
    }
}

/// Rectangular matrix of cell codes, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<CellCode>>", into = "Vec<Vec<CellCode>>")]
pub struct Grid {
    rows: Vec<Vec<CellCode>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<CellCode>>) -> Result<Self, DomainError> {
        if let Some(first) = rows.first() {
            let expected = first.len();
            if let Some((row, found)) = rows
                .iter()
                .map(Vec::len)
                .enumerate()
                .find(|(_, len)| *len != expected)
            {
                return Err(DomainError::RaggedGrid {
                    row,
                    expected,
                    found,
                });
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<CellCode> {
        self.rows.get(row).and_then(|cells| cells.get(col)).copied()
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[CellCode]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

impl TryFrom<Vec<Vec<CellCode>>> for Grid {
    type Error = DomainError;

    fn try_from(rows: Vec<Vec<CellCode>>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<Grid> for Vec<Vec<CellCode>> {
    fn from(grid: Grid) -> Self {
        grid.rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mine {
    pub id: MineId,
    pub row: i64,
    pub col: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rover {
    pub id: RoverId,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_commands: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(i64, i64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl Rover {
    pub fn is_eliminated(&self) -> bool {
        self.status == ROVER_STATUS_ELIMINATED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::East => "East",
            Self::South => "South",
            Self::West => "West",
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::North),
            1 => Ok(Self::East),
            2 => Ok(Self::South),
            3 => Ok(Self::West),
            other => Err(DomainError::UnknownDirection(other)),
        }
    }
}

impl From<Direction> for u8 {
    fn from(value: Direction) -> Self {
        match value {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }
}

/// Single-character rover command as sent over the live session.
///
/// The service understands `L`, `R`, `M` and `D`; any other character is still
/// transmitted and answered by the service with an error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommandCode(char);

impl CommandCode {
    pub const LEFT: Self = Self('L');
    pub const RIGHT: Self = Self('R');
    pub const MOVE: Self = Self('M');
    /// Disarm. A mine report that answers this code is not a detonation.
    pub const DISARM: Self = Self('D');

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_whitespace() => Ok(Self(ch.to_ascii_uppercase())),
            _ => Err(DomainError::InvalidCommandCode(raw.to_string())),
        }
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CommandCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommandCode> for String {
    fn from(value: CommandCode) -> Self {
        value.0.to_string()
    }
}
