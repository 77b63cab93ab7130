use serde::{Deserialize, Serialize};

/// A cell position in display space: `row` indexes the displayed row order,
/// `col` indexes the visible column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex {
    pub row: usize,
    pub col: usize,
}

impl CellIndex {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Type of selection for row/column headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionType {
    /// Standard cell selection (default)
    #[default]
    CellRange,
    /// Entire row(s) selected
    RowRange,
    /// Entire column(s) selected
    ColumnRange,
    /// All cells selected (corner click)
    All,
}

/// Arrow-key direction for moving or extending a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A rectangular selection.
///
/// `start <= end` component-wise at all times. `primary` is the anchor cell;
/// it is tracked separately from the corners so shift-extend can grow the
/// range away from it in any direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRange {
    pub selection_type: SelectionType,
    pub primary: CellIndex,
    pub start: CellIndex,
    pub end: CellIndex,
}

impl SelectionRange {
    /// Create a normalized cell range with `a` as the primary cell.
    pub fn cell_range(a: CellIndex, b: CellIndex) -> Self {
        Self::with_primary(a, a, b)
    }

    /// Create a normalized range anchored on `primary`.
    pub fn with_primary(primary: CellIndex, a: CellIndex, b: CellIndex) -> Self {
        let (start, end) = normalize(a, b);
        Self {
            selection_type: SelectionType::CellRange,
            primary,
            start,
            end,
        }
    }

    /// Create a row range selection spanning `columns` columns.
    pub fn row_range(start_row: usize, end_row: usize, columns: usize) -> Self {
        let mut range = Self::cell_range(
            CellIndex::new(start_row, 0),
            CellIndex::new(end_row, columns.saturating_sub(1)),
        );
        range.selection_type = SelectionType::RowRange;
        range
    }

    /// Create a column range selection spanning `rows` rows.
    pub fn column_range(start_col: usize, end_col: usize, rows: usize) -> Self {
        let mut range = Self::cell_range(
            CellIndex::new(0, start_col),
            CellIndex::new(rows.saturating_sub(1), end_col),
        );
        range.selection_type = SelectionType::ColumnRange;
        range
    }

    /// Create a select-all selection
    pub fn all(rows: usize, columns: usize) -> Self {
        let mut range = Self::cell_range(
            CellIndex::new(0, 0),
            CellIndex::new(rows.saturating_sub(1), columns.saturating_sub(1)),
        );
        range.selection_type = SelectionType::All;
        range
    }

    pub fn row_count(&self) -> usize {
        self.end.row - self.start.row + 1
    }

    pub fn column_count(&self) -> usize {
        self.end.col - self.start.col + 1
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.column_count()
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// Grow or shrink the range to `rows` x `columns`, keeping `start` fixed.
    #[must_use]
    pub fn resized(&self, rows: usize, columns: usize) -> Self {
        let end = CellIndex::new(
            self.start.row + rows.max(1) - 1,
            self.start.col + columns.max(1) - 1,
        );
        Self {
            selection_type: SelectionType::CellRange,
            primary: self.primary,
            start: self.start,
            end,
        }
    }

    /// Iterate cells row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        (self.start.row..=self.end.row)
            .flat_map(move |row| (self.start.col..=self.end.col).map(move |col| CellIndex::new(row, col)))
    }
}

/// Order two corners so the first is the top-left one.
pub fn normalize(a: CellIndex, b: CellIndex) -> (CellIndex, CellIndex) {
    (
        CellIndex::new(a.row.min(b.row), a.col.min(b.col)),
        CellIndex::new(a.row.max(b.row), a.col.max(b.col)),
    )
}

/// Step `cell` one position in `direction`, clamped to `rows` x `columns`.
pub fn step(cell: CellIndex, direction: Direction, rows: usize, columns: usize) -> CellIndex {
    let max_row = rows.saturating_sub(1);
    let max_col = columns.saturating_sub(1);
    match direction {
        Direction::Up => CellIndex::new(cell.row.saturating_sub(1), cell.col),
        Direction::Down => CellIndex::new((cell.row + 1).min(max_row), cell.col),
        Direction::Left => CellIndex::new(cell.row, cell.col.saturating_sub(1)),
        Direction::Right => CellIndex::new(cell.row, (cell.col + 1).min(max_col)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_is_symmetric() {
        let a = CellIndex::new(5, 1);
        let b = CellIndex::new(2, 4);
        let forward = SelectionRange::cell_range(a, b);
        let backward = SelectionRange::cell_range(b, a);
        assert_eq!(forward.start, backward.start);
        assert_eq!(forward.end, backward.end);
        assert_eq!(forward.start, CellIndex::new(2, 1));
        assert_eq!(forward.end, CellIndex::new(5, 4));
        assert_eq!(forward.row_count(), 4);
        assert_eq!(forward.column_count(), 4);
    }

    #[test]
    fn test_resized_keeps_start() {
        let range = SelectionRange::cell_range(CellIndex::new(3, 2), CellIndex::new(3, 2));
        let grown = range.resized(2, 2);
        assert_eq!(grown.start, CellIndex::new(3, 2));
        assert_eq!(grown.end, CellIndex::new(4, 3));
    }

    #[test]
    fn test_step_clamps() {
        let origin = CellIndex::new(0, 0);
        assert_eq!(step(origin, Direction::Up, 3, 3), origin);
        assert_eq!(
            step(CellIndex::new(2, 2), Direction::Right, 3, 3),
            CellIndex::new(2, 2)
        );
        assert_eq!(step(origin, Direction::Down, 3, 3), CellIndex::new(1, 0));
    }

    #[test]
    fn test_cells_row_major() {
        let range = SelectionRange::cell_range(CellIndex::new(0, 0), CellIndex::new(1, 1));
        let cells: Vec<_> = range.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellIndex::new(0, 0),
                CellIndex::new(0, 1),
                CellIndex::new(1, 0),
                CellIndex::new(1, 1)
            ]
        );
    }
}
