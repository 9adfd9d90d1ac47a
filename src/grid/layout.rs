//! # Grid Layouts
//!
//! Rectangular grids described by integer cell codes:
//! `0` path, `1` wall, `2` start, `3` goal, `4` cliff.
//! Row 0 is the top row and positions are `(row, col)`.

use std::fmt::{Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

pub type Position = (usize, usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Cell { Path, Wall, Start, Goal, Cliff }

impl Cell {
    pub fn from_code(code: u8) -> Option<Cell> {
        match code {
            0 => Some(Cell::Path),
            1 => Some(Cell::Wall),
            2 => Some(Cell::Start),
            3 => Some(Cell::Goal),
            4 => Some(Cell::Cliff),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Cell::Path => 0,
            Cell::Wall => 1,
            Cell::Start => 2,
            Cell::Goal => 3,
            Cell::Cliff => 4,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Path => '·',
            Cell::Wall => '█',
            Cell::Start => 'S',
            Cell::Goal => 'G',
            Cell::Cliff => '~',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    start: Position,
    goal: Position,
}

impl Layout {
    /// Build a layout from rows of cell codes
    pub fn from_codes<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, LayoutError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        if height == 0 || width == 0 {
            return Err(LayoutError::Empty);
        }
        let mut cells = Vec::with_capacity(width * height);
        for (row, codes) in rows.iter().enumerate() {
            let codes = codes.as_ref();
            if codes.len() != width {
                return Err(LayoutError::Ragged { row, expected: width, found: codes.len() });
            }
            for (col, &code) in codes.iter().enumerate() {
                let cell = Cell::from_code(code)
                    .ok_or_else(|| LayoutError::UnknownCell { row, col, code: code.to_string() })?;
                cells.push(cell);
            }
        }
        let find = |what: &'static str, target: Cell| -> Result<Position, LayoutError> {
            let found: Vec<usize> = cells.iter().enumerate().filter(|(_, c)| **c == target).map(|(i, _)| i).collect();
            match found.as_slice() {
                [i] => Ok((i / width, i % width)),
                _ => Err(LayoutError::Marker { what, count: found.len() }),
            }
        };
        let start = find("start", Cell::Start)?;
        let goal = find("goal", Cell::Goal)?;
        Ok(Self { width, height, cells, start, goal })
    }

    /// Parse one row per line. Codes are separated by whitespace or commas, or written
    /// back to back; blank lines and `#` comments are ignored.
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let mut rows: Vec<Vec<u8>> = vec![];
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let row_idx = rows.len();
            let tokens: Vec<&str> = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
                .collect();
            let symbols: Vec<String> = if tokens.len() == 1 {
                tokens[0].chars().map(String::from).collect()
            } else {
                tokens.iter().map(|t| t.to_string()).collect()
            };
            let mut row = Vec::with_capacity(symbols.len());
            for (col, symbol) in symbols.into_iter().enumerate() {
                match symbol.parse::<u8>() {
                    Ok(code) => row.push(code),
                    Err(_) => return Err(LayoutError::UnknownCell { row: row_idx, col, code: symbol }),
                }
            }
            rows.push(row);
        }
        Self::from_codes(&rows)
    }

    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let text = std::fs::read_to_string(path).map_err(|source| LayoutError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Look up one of the built-in layouts by name
    pub fn preset(name: &str) -> Result<Self, LayoutError> {
        let codes = presets::codes(name).ok_or_else(|| LayoutError::UnknownPreset(name.to_string()))?;
        Self::from_codes(codes)
    }

    #[inline] pub fn width(&self) -> usize { self.width }
    #[inline] pub fn height(&self) -> usize { self.height }
    #[inline] pub fn start(&self) -> Position { self.start }
    #[inline] pub fn goal(&self) -> Position { self.goal }

    pub fn get(&self, pos: Position) -> Option<Cell> {
        let (row, col) = pos;
        if row < self.height && col < self.width {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    /// Neighbour of `pos` after moving by `delta`, if it is still on the grid
    pub fn offset(&self, pos: Position, delta: (isize, isize)) -> Option<Position> {
        let row = pos.0.checked_add_signed(delta.0)?;
        let col = pos.1.checked_add_signed(delta.1)?;
        (row < self.height && col < self.width).then_some((row, col))
    }

    /// All positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |r| (0..self.width).map(move |c| (r, c)))
    }

    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.width).map(|row| row.iter().map(|c| c.code()).collect()).collect()
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(self.width) {
            let line: String = row.iter().map(|c| c.symbol()).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Built-in maze and cliff walk layouts
pub mod presets {
    pub const NAMES: [&str; 8] = [
        "maze1", "maze2", "maze3", "maze4", "cliffwalk1", "cliffwalk2", "cliffwalk3", "cliffwalk4",
    ];
    pub const DEFAULT_MAZE: &str = "maze2";
    pub const DEFAULT_CLIFFWALK: &str = "cliffwalk3";

    pub fn codes(name: &str) -> Option<&'static [&'static [u8]]> {
        match name {
            "maze1" => Some(MAZE1),
            "maze2" => Some(MAZE2),
            "maze3" => Some(MAZE3),
            "maze4" => Some(MAZE4),
            "cliffwalk1" => Some(CLIFFWALK1),
            "cliffwalk2" => Some(CLIFFWALK2),
            "cliffwalk3" => Some(CLIFFWALK3),
            "cliffwalk4" => Some(CLIFFWALK4),
            _ => None,
        }
    }

    /// Small 5x5 maze with a single corridor and a dead end
    pub const MAZE1: &[&[u8]] = &[
        &[2, 0, 1, 0, 0],
        &[1, 0, 1, 0, 1],
        &[0, 0, 0, 0, 0],
        &[0, 1, 1, 1, 0],
        &[0, 0, 0, 1, 3],
    ];

    pub const MAZE2: &[&[u8]] = &[
        &[2, 0, 0, 1, 0, 0, 0, 0],
        &[1, 1, 0, 1, 0, 1, 1, 0],
        &[0, 0, 0, 0, 0, 1, 0, 0],
        &[0, 1, 1, 1, 0, 1, 0, 1],
        &[0, 0, 0, 1, 0, 0, 0, 0],
        &[1, 1, 0, 1, 1, 1, 1, 0],
        &[0, 0, 0, 0, 0, 0, 1, 0],
        &[0, 1, 1, 1, 1, 0, 0, 3],
    ];

    /// 4x11 maze whose bottom row between start and goal is a cliff
    pub const MAZE3: &[&[u8]] = &[
        &[0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0],
        &[0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0],
        &[0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0],
        &[2, 4, 4, 4, 4, 4, 4, 4, 4, 4, 3],
    ];

    pub const MAZE4: &[&[u8]] = &[
        &[2, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
        &[1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 0],
        &[0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0],
        &[0, 1, 1, 1, 1, 0, 1, 0, 1, 1, 1],
        &[0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0],
        &[1, 1, 1, 0, 1, 1, 1, 1, 1, 0, 1],
        &[0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0],
        &[0, 1, 1, 1, 1, 1, 1, 0, 1, 1, 0],
        &[0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0],
        &[1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 3],
    ];

    pub const CLIFFWALK1: &[&[u8]] = &[
        &[2, 0, 4],
        &[4, 0, 0],
        &[0, 0, 3],
    ];

    /// The goal is partially enclosed by walls with a cliff column beside the start
    pub const CLIFFWALK2: &[&[u8]] = &[
        &[0, 0, 0, 0, 0],
        &[0, 4, 1, 1, 0],
        &[0, 4, 3, 1, 0],
        &[0, 4, 0, 1, 0],
        &[2, 4, 0, 0, 0],
    ];

    /// Sutton & Barto's 4x12 cliff walk
    pub const CLIFFWALK3: &[&[u8]] = &[
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        &[2, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 3],
    ];

    pub const CLIFFWALK4: &[&[u8]] = &[
        &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
        &[1, 0, 4, 0, 0, 0, 4, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 1],
        &[1, 0, 4, 0, 4, 4, 4, 0, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 0, 1],
        &[1, 0, 4, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        &[1, 0, 4, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 4, 0, 1],
        &[1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 1, 0, 4, 0, 1],
        &[1, 4, 4, 0, 1, 0, 4, 0, 4, 4, 4, 4, 4, 4, 4, 0, 1, 0, 4, 0, 1],
        &[1, 0, 4, 0, 1, 0, 4, 0, 1, 0, 0, 0, 0, 0, 4, 0, 0, 0, 4, 0, 1],
        &[1, 0, 4, 0, 1, 0, 4, 0, 1, 0, 1, 1, 1, 0, 4, 0, 1, 1, 4, 0, 1],
        &[1, 0, 4, 0, 1, 0, 4, 0, 1, 0, 4, 0, 1, 0, 4, 0, 1, 0, 0, 0, 1],
        &[1, 0, 0, 0, 1, 0, 4, 0, 1, 0, 4, 0, 1, 0, 4, 0, 1, 0, 4, 0, 1],
        &[1, 0, 4, 0, 1, 0, 4, 0, 0, 0, 0, 0, 1, 0, 4, 0, 1, 0, 4, 0, 1],
        &[1, 0, 4, 0, 1, 0, 4, 1, 1, 1, 1, 0, 1, 0, 4, 0, 1, 0, 4, 0, 1],
        &[1, 0, 4, 0, 1, 0, 4, 0, 0, 0, 0, 0, 1, 0, 4, 0, 1, 0, 4, 0, 1],
        &[1, 4, 4, 0, 1, 0, 4, 4, 4, 4, 4, 4, 4, 4, 4, 0, 1, 0, 4, 0, 1],
        &[1, 0, 0, 0, 1, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 4, 0, 1],
        &[1, 0, 4, 0, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 0, 4, 4, 1],
        &[1, 0, 4, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        &[1, 0, 4, 4, 4, 4, 4, 0, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 0, 1],
        &[1, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    ];
}
