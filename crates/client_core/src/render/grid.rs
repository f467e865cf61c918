//! Coordinate-labelled view of the minefield grid.
//!
//! The view has one header row and one header column, so the data cell for grid
//! position `(row, col)` lives at view position `(row + 1, col + 1)`.

use std::fmt;

use shared::domain::{CellCode, Grid};

/// Rows and columns taken by the coordinate headers.
pub const HEADER_OFFSET: usize = 1;

pub const MINE_GLYPH: &str = "💣";
pub const ROVER_GLYPH: &str = "🤖";
pub const DETONATION_GLYPH: &str = "💥";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoords {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    Mine,
    RoverPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataCell {
    pub coords: GridCoords,
    pub code: CellCode,
    pub class: Option<CellClass>,
    /// Set by a live detonation report; cleared by the next full render.
    pub detonated: bool,
}

impl DataCell {
    fn from_code(coords: GridCoords, code: CellCode) -> Self {
        let class = match code {
            CellCode::Mine => Some(CellClass::Mine),
            CellCode::RoverPath => Some(CellClass::RoverPath),
            CellCode::Empty => None,
        };
        Self {
            coords,
            code,
            class,
            detonated: false,
        }
    }

    pub fn glyph(&self) -> &'static str {
        if self.detonated {
            return DETONATION_GLYPH;
        }
        match self.class {
            Some(CellClass::Mine) => MINE_GLYPH,
            Some(CellClass::RoverPath) => ROVER_GLYPH,
            None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCell {
    Corner,
    ColumnHeader(usize),
    RowHeader(usize),
    Data(DataCell),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridView {
    rows: Vec<Vec<ViewCell>>,
}

impl GridView {
    pub fn render(grid: &Grid) -> Self {
        let mut rows = Vec::with_capacity(grid.rows() + HEADER_OFFSET);

        let mut header = Vec::with_capacity(grid.cols() + HEADER_OFFSET);
        header.push(ViewCell::Corner);
        header.extend((0..grid.cols()).map(ViewCell::ColumnHeader));
        rows.push(header);

        for (row, cells) in grid.iter_rows().enumerate() {
            let mut view_row = Vec::with_capacity(cells.len() + HEADER_OFFSET);
            view_row.push(ViewCell::RowHeader(row));
            view_row.extend(cells.iter().enumerate().map(|(col, code)| {
                ViewCell::Data(DataCell::from_code(GridCoords { row, col }, *code))
            }));
            rows.push(view_row);
        }

        Self { rows }
    }

    pub fn view_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn view_cols(&self, view_row: usize) -> Option<usize> {
        self.rows.get(view_row).map(Vec::len)
    }

    pub fn cell(&self, view_row: usize, view_col: usize) -> Option<&ViewCell> {
        self.rows.get(view_row).and_then(|cells| cells.get(view_col))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[ViewCell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Grid coordinates behind a view position; headers and the corner have none.
    pub fn click(&self, view_row: usize, view_col: usize) -> Option<GridCoords> {
        match self.cell(view_row, view_col)? {
            ViewCell::Data(cell) => Some(cell.coords),
            _ => None,
        }
    }

    /// Marks the data cell reported by a detonation event. `x` is the grid column and
    /// `y` the grid row. Returns false when the position is outside the current view.
    pub fn mark_mine_hit(&mut self, x: i64, y: i64) -> bool {
        let (Ok(col), Ok(row)) = (usize::try_from(x), usize::try_from(y)) else {
            return false;
        };
        let target = self
            .rows
            .get_mut(row + HEADER_OFFSET)
            .and_then(|cells| cells.get_mut(col + HEADER_OFFSET));
        match target {
            Some(ViewCell::Data(cell)) => {
                cell.detonated = true;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for GridView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cells in &self.rows {
            let line: Vec<String> = cells
                .iter()
                .map(|cell| match cell {
                    ViewCell::Corner => format!("{:>3}", ""),
                    ViewCell::ColumnHeader(col) => format!("{col:>3}"),
                    ViewCell::RowHeader(row) => format!("{row:>3}"),
                    ViewCell::Data(data) if data.glyph().is_empty() => format!("{:>3}", "·"),
                    // Emoji glyphs render two columns wide.
                    ViewCell::Data(data) => format!(" {}", data.glyph()),
                })
                .collect();
            writeln!(f, "{}", line.join(""))?;
        }
        Ok(())
    }
}
