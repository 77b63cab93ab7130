//! Copy, cut, paste and clear over the active selection.

use super::clipboard::{ClipboardCell, ClipboardSnapshot};
use super::matrix::{get_cells, ExcludeFilter, OperationSummary};
use super::mutation::{apply_value, convert_for};
use super::{CellEditor, EditOutcome};
use crate::error::{GridError, Result};
use crate::types::{CellIndex, GridData, SelectionRange};

impl CellEditor {
    /// Copy the selection into the clipboard.
    ///
    /// Excluded cells are copied as blanks and not counted. Returns the
    /// text for the system clipboard, or `None` without a selection.
    pub fn copy(
        &mut self,
        data: &GridData,
        filter: ExcludeFilter,
    ) -> Option<(String, OperationSummary)> {
        let selection = self.selection?;
        let matrix = get_cells(data, &selection, filter, self.editable);
        let included = matrix.included_count();
        let rows = matrix
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(cell) => ClipboardCell {
                            text: data
                                .column_at(cell.cell.col)
                                .map(|c| c.field.to_display_string(cell.value.as_ref()))
                                .unwrap_or_default(),
                            raw: cell.value.clone(),
                            data_type: Some(cell.data_type),
                            source: Some((cell.row, cell.column.clone())),
                        },
                        None => ClipboardCell::default(),
                    })
                    .collect()
            })
            .collect();
        let text = self.clipboard.write(ClipboardSnapshot::from_rows(rows));
        Some((
            text,
            OperationSummary {
                count: included,
                total: included,
            },
        ))
    }

    /// Copy the selection, then clear the copied cells that may be edited.
    pub fn cut(
        &mut self,
        data: &mut GridData,
        filter: ExcludeFilter,
    ) -> Result<Option<(String, EditOutcome)>> {
        let Some((text, _)) = self.copy(data, filter) else {
            return Ok(None);
        };
        let outcome = self.clear(data, filter)?;
        Ok(Some((text, outcome)))
    }

    /// Paste text from the system clipboard into the selection.
    pub fn paste_text(
        &mut self,
        data: &mut GridData,
        text: &str,
        filter: ExcludeFilter,
    ) -> Result<EditOutcome> {
        let snapshot = self.clipboard.parse(text);
        self.paste(data, &snapshot, filter)
    }

    /// Paste a snapshot into the selection.
    ///
    /// When the selection and snapshot extents differ, the selection first
    /// grows to the larger of the two, anchored at its start, and the
    /// snapshot is tiled across it. A target reaching past the last visible
    /// column is rejected before anything is written.
    pub fn paste(
        &mut self,
        data: &mut GridData,
        snapshot: &ClipboardSnapshot,
        filter: ExcludeFilter,
    ) -> Result<EditOutcome> {
        let Some(selection) = self.selection else {
            return Ok(EditOutcome::default());
        };
        if snapshot.is_empty() || data.display_row_count() == 0 {
            return Ok(EditOutcome::default());
        }
        self.flush(data)?;

        let rows = selection.row_count().max(snapshot.row_count);
        let columns = selection.column_count().max(snapshot.column_count);
        let mut target = if rows == selection.row_count() && columns == selection.column_count() {
            selection
        } else {
            selection.resized(rows, columns)
        };
        if target.end.col >= data.visible_column_count() {
            tracing::warn!(
                start = target.start.col,
                columns,
                visible = data.visible_column_count(),
                "paste target runs past the last column"
            );
            return Err(GridError::NonSequentialRange);
        }
        target.end.row = target.end.row.min(data.display_row_count().saturating_sub(1));
        self.selection = Some(target);

        let matrix = get_cells(
            data,
            &target,
            filter | ExcludeFilter::NON_EDITABLE,
            self.editable,
        );
        let mut outcome = EditOutcome::default();
        outcome.summary.total = matrix.included_count();

        for cell in matrix.included() {
            // A stale selection below the last row clips the matrix above it.
            let (Some(row), Some(col)) = (
                cell.cell.row.checked_sub(target.start.row),
                cell.cell.col.checked_sub(target.start.col),
            ) else {
                continue;
            };
            let Some(source) = snapshot.tiled(row, col) else {
                continue;
            };
            let Some(column) = data.column_at(cell.cell.col) else {
                continue;
            };
            let converted =
                convert_for(&column.field, &source.text, source.raw.as_ref(), source.data_type);
            let Some(value) = converted.into_value() else {
                continue;
            };
            outcome.record(apply_value(data, cell.cell, value)?);
        }
        tracing::debug!(
            count = outcome.summary.count,
            total = outcome.summary.total,
            "paste applied"
        );
        Ok(outcome)
    }

    /// Clear the selection.
    ///
    /// Non-editable cells are always skipped; required cells reject the
    /// empty value and are left as they are.
    pub fn clear(&mut self, data: &mut GridData, filter: ExcludeFilter) -> Result<EditOutcome> {
        let Some(selection) = self.selection else {
            return Ok(EditOutcome::default());
        };
        self.flush(data)?;
        clear_range(data, &selection, filter, self.editable)
    }
}

fn clear_range(
    data: &mut GridData,
    range: &SelectionRange,
    filter: ExcludeFilter,
    editable: bool,
) -> Result<EditOutcome> {
    let matrix = get_cells(data, range, filter | ExcludeFilter::NON_EDITABLE, editable);
    let mut outcome = EditOutcome::default();
    outcome.summary.total = matrix.included_count();
    let cells: Vec<CellIndex> = matrix.included().map(|c| c.cell).collect();
    for cell in cells {
        outcome.record(apply_value(data, cell, None)?);
    }
    Ok(outcome)
}
