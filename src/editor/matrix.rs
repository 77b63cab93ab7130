//! Cell matrices over a selection range, with composable exclusion filters.

use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;

use crate::field::{is_blank, CellValue, DataType};
use crate::types::{CellIndex, ColumnId, GridData, RowId, SelectionRange};

/// Which cells to leave out of a matrix.
///
/// Excluded cells are skipped by paste, clear and fill instead of failing
/// the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExcludeFilter(u8);

impl ExcludeFilter {
    pub const NONE: Self = Self(0);
    /// Empty cells of required fields.
    pub const REQUIRED_EMPTY: Self = Self(1);
    /// Empty cells.
    pub const EMPTY: Self = Self(1 << 1);
    /// Cells of non-editable columns (or every cell when editing is off).
    pub const NON_EDITABLE: Self = Self(1 << 2);

    /// Build from raw bits; unknown bits are dropped.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ExcludeFilter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ExcludeFilter {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Result of a paste, clear, fill or copy over possibly excluded cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OperationSummary {
    /// Cells actually affected.
    pub count: usize,
    /// Cells targeted after exclusion filters.
    pub total: usize,
}

impl OperationSummary {
    pub fn is_partial(&self) -> bool {
        self.count < self.total
    }
}

/// A cell included in a matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixCell {
    pub cell: CellIndex,
    pub row: RowId,
    pub column: ColumnId,
    pub data_type: DataType,
    pub value: Option<CellValue>,
}

/// Row-major cells of a range; excluded positions are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellMatrix {
    pub range: SelectionRange,
    cells: Vec<Option<MatrixCell>>,
}

impl CellMatrix {
    pub fn row_count(&self) -> usize {
        self.range.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.range.column_count()
    }

    /// Cell at a position relative to the range start.
    pub fn get(&self, row: usize, col: usize) -> Option<&MatrixCell> {
        if col >= self.column_count() {
            return None;
        }
        self.cells
            .get(row * self.column_count() + col)
            .and_then(Option::as_ref)
    }

    /// Included cells, row-major.
    pub fn included(&self) -> impl Iterator<Item = &MatrixCell> {
        self.cells.iter().flatten()
    }

    pub fn included_count(&self) -> usize {
        self.included().count()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<MatrixCell>]> {
        self.cells.chunks(self.column_count().max(1))
    }
}

/// Collect the cells of `range` from `data`.
///
/// The range is clipped to the grid. `editable` is the grid-wide cell
/// editing toggle; with it off, [`ExcludeFilter::NON_EDITABLE`] excludes
/// every cell.
pub fn get_cells(
    data: &GridData,
    range: &SelectionRange,
    filter: ExcludeFilter,
    editable: bool,
) -> CellMatrix {
    let rows = data.display_row_count();
    let cols = data.visible_column_count();
    let range = if rows == 0 || cols == 0 {
        *range
    } else {
        let mut clipped = *range;
        clipped.end.row = clipped.end.row.min(rows - 1);
        clipped.end.col = clipped.end.col.min(cols - 1);
        clipped.start.row = clipped.start.row.min(clipped.end.row);
        clipped.start.col = clipped.start.col.min(clipped.end.col);
        clipped
    };

    let cells = range
        .cells()
        .map(|cell| {
            let column = data.column_at(cell.col)?;
            let row = data.row_at(cell.row)?;
            let value = row.get(&column.id);
            let blank = is_blank(value);
            if filter.contains(ExcludeFilter::EMPTY) && blank {
                return None;
            }
            if filter.contains(ExcludeFilter::REQUIRED_EMPTY) && blank && column.field.required {
                return None;
            }
            if filter.contains(ExcludeFilter::NON_EDITABLE) && !(editable && column.editable) {
                return None;
            }
            Some(MatrixCell {
                cell,
                row: row.id,
                column: column.id.clone(),
                data_type: column.field.data_type(),
                value: value.cloned(),
            })
        })
        .collect();
    CellMatrix { range, cells }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::types::{Column, Row};

    fn data() -> GridData {
        let mut locked = Column::new("locked", Field::text("Locked"));
        locked.editable = false;
        GridData::new(
            vec![
                Row::new(1).with("n", 1.0).with("locked", "x"),
                Row::new(2).with("locked", "y"),
                Row::new(3).with("n", 3.0),
            ],
            vec![
                Column::new("n", Field::number("N").required(true)),
                locked,
            ],
        )
    }

    fn range(a: (usize, usize), b: (usize, usize)) -> SelectionRange {
        SelectionRange::cell_range(CellIndex::new(a.0, a.1), CellIndex::new(b.0, b.1))
    }

    #[test]
    fn test_filters_compose() {
        let data = data();
        let all = get_cells(&data, &range((0, 0), (2, 1)), ExcludeFilter::NONE, true);
        assert_eq!(all.included_count(), 6);

        let empty = get_cells(&data, &range((0, 0), (2, 1)), ExcludeFilter::EMPTY, true);
        assert_eq!(empty.included_count(), 4);

        let filter = ExcludeFilter::REQUIRED_EMPTY | ExcludeFilter::NON_EDITABLE;
        let matrix = get_cells(&data, &range((0, 0), (2, 1)), filter, true);
        assert_eq!(matrix.included_count(), 2);
        assert!(matrix.get(1, 0).is_none());
        assert_eq!(matrix.get(2, 0).unwrap().row, RowId(3));
    }

    #[test]
    fn test_editing_disabled_excludes_everything() {
        let data = data();
        let matrix = get_cells(&data, &range((0, 0), (2, 1)), ExcludeFilter::NON_EDITABLE, false);
        assert_eq!(matrix.included_count(), 0);
    }

    #[test]
    fn test_range_clipped_to_grid() {
        let data = data();
        let matrix = get_cells(&data, &range((1, 0), (9, 9)), ExcludeFilter::NONE, true);
        assert_eq!(matrix.row_count(), 2);
        assert_eq!(matrix.column_count(), 2);
    }
}
