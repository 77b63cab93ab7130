//! User actions on columns, rows, groups and cells.
//!
//! Every action honors its feature toggle (a disabled toggle makes it a
//! no-op returning `false`), marks the stale part of the pipeline and queues
//! the matching outbound event.

use std::collections::HashSet;

use super::events::{
    ColumnCalculate, ColumnDirection, ColumnMove, ColumnResize, GridEvent, RowExpand, RowInsert,
    RowMove, RowPatch, RowSelect,
};
use super::GridView;
use crate::editor::{CellChange, CellMatrix, EditOutcome, ExcludeFilter, OperationSummary};
use crate::error::Result;
use crate::field::{CellValue, Field, SortDirection, ValidationErrors};
use crate::group::{CalculateOperator, GroupId};
use crate::types::{CellIndex, Column, ColumnId, Direction, RowId, SelectionRange};

impl GridView {
    fn column_mut(&mut self, id: &ColumnId) -> Option<&mut Column> {
        self.data.columns.iter_mut().find(|c| &c.id == id)
    }

    // ---- Columns ----

    /// Resize a column, clamped to the configured min/max width.
    pub fn resize_column(&mut self, id: &ColumnId, width: f32) -> bool {
        if !self.config.column.resizable {
            return false;
        }
        let width = self.config.column.clamp_width(width);
        let Some(column) = self.column_mut(id) else {
            return false;
        };
        if (column.width - width).abs() < f32::EPSILON {
            return false;
        }
        column.width = width;
        self.emit(GridEvent::ColumnResize(vec![ColumnResize {
            column: id.clone(),
            width,
        }]));
        self.mark_layout();
        true
    }

    /// Move a column to position `to` in the full column order.
    pub fn move_column(&mut self, id: &ColumnId, to: usize) -> bool {
        if !self.config.column.arrangeable {
            return false;
        }
        let Some(from) = self.data.find_column(id) else {
            return false;
        };
        let to = to.min(self.data.columns.len() - 1);
        if from == to {
            return false;
        }
        let column = self.data.columns.remove(from);
        self.data.columns.insert(to, column);
        self.data.refresh_column_order();
        self.editor.clamp_selection(&self.data);
        self.emit(GridEvent::ColumnMove(vec![ColumnMove {
            column: id.clone(),
            from,
            to,
        }]));
        self.mark_layout();
        true
    }

    /// Hide columns. Returns `false` when none changed.
    pub fn hide_columns(&mut self, ids: &[ColumnId]) -> bool {
        self.set_hidden(ids, true)
    }

    pub fn unhide_columns(&mut self, ids: &[ColumnId]) -> bool {
        self.set_hidden(ids, false)
    }

    fn set_hidden(&mut self, ids: &[ColumnId], hidden: bool) -> bool {
        if !self.config.column.hideable {
            return false;
        }
        let mut changed = Vec::new();
        for id in ids {
            if let Some(column) = self.column_mut(id) {
                if column.hidden != hidden {
                    column.hidden = hidden;
                    changed.push(id.clone());
                }
            }
        }
        if changed.is_empty() {
            return false;
        }
        if hidden {
            for id in &changed {
                self.editor.on_field_changed(id);
            }
        }
        self.data.refresh_column_order();
        self.editor.clamp_selection(&self.data);
        self.emit(if hidden {
            GridEvent::ColumnHide(changed)
        } else {
            GridEvent::ColumnUnhide(changed)
        });
        self.mark_layout();
        true
    }

    /// Pin the first `count` visible columns.
    pub fn freeze_columns(&mut self, count: usize) -> bool {
        if !self.config.column.freezable {
            return false;
        }
        let count = count.min(self.data.visible_column_count());
        if count == self.config.frozen_count {
            return false;
        }
        self.config.frozen_count = count;
        self.emit(GridEvent::ColumnFreeze(vec![count]));
        self.mark_layout();
        true
    }

    /// Set or clear a column's sort direction. A newly sorted column becomes
    /// the least significant sort key.
    pub fn sort_column(&mut self, id: &ColumnId, direction: Option<SortDirection>) -> bool {
        if !self.config.column.sortable {
            return false;
        }
        let Some(column) = self.column_mut(id) else {
            return false;
        };
        if column.sort == direction {
            return false;
        }
        column.sort = direction;
        update_keys(&mut self.sort_by, id, direction.is_some());
        self.emit(GridEvent::ColumnSort(vec![ColumnDirection {
            column: id.clone(),
            direction,
        }]));
        self.mark_pipeline();
        true
    }

    /// Group by a column (innermost level when newly added) or stop
    /// grouping by it.
    pub fn group_column(&mut self, id: &ColumnId, direction: Option<SortDirection>) -> bool {
        if !self.config.column.groupable {
            return false;
        }
        let Some(column) = self.column_mut(id) else {
            return false;
        };
        if column.group_sort == direction {
            return false;
        }
        column.group_sort = direction;
        update_keys(&mut self.group_by, id, direction.is_some());
        self.emit(GridEvent::ColumnGroup(vec![ColumnDirection {
            column: id.clone(),
            direction,
        }]));
        self.mark_pipeline();
        true
    }

    /// Set or clear a column's aggregate. Operators that do not apply to
    /// the column's data type are refused.
    pub fn calculate_column(&mut self, id: &ColumnId, operator: Option<CalculateOperator>) -> bool {
        if !self.config.column.calculable {
            return false;
        }
        let Some(column) = self.column_mut(id) else {
            return false;
        };
        if let Some(op) = operator {
            if !op.supports(column.field.data_type()) {
                tracing::debug!(column = %id, ?op, "operator does not apply to column type");
                return false;
            }
        }
        if column.calculate == operator {
            return false;
        }
        column.calculate = operator;
        self.emit(GridEvent::ColumnCalculate(vec![ColumnCalculate {
            column: id.clone(),
            operator,
        }]));
        self.recalculate();
        true
    }

    /// Swap a column's field. A pending edit on the column is dropped and
    /// stored values are coerced into the new type.
    pub fn set_field(&mut self, id: &ColumnId, field: Field) -> bool {
        if self.data.find_column(id).is_none() {
            return false;
        }
        self.editor.on_field_changed(id);
        if let Some(column) = self.column_mut(id) {
            if column
                .calculate
                .is_some_and(|op| !op.supports(field.data_type()))
            {
                column.calculate = None;
            }
            column.field = field;
        }
        self.data.coerce_values();
        self.mark_pipeline();
        true
    }

    /// Select whole columns between two visible positions.
    pub fn select_columns(&mut self, start: usize, end: usize) -> Result<Option<SelectionRange>> {
        self.prepare();
        let range = SelectionRange::column_range(start, end, self.data.display_row_count());
        let Some(range) = self.install_range(range)? else {
            return Ok(None);
        };
        let ids: Vec<ColumnId> = (range.start.col..=range.end.col)
            .filter_map(|col| self.data.column_at(col).map(|c| c.id.clone()))
            .collect();
        self.emit(GridEvent::ColumnSelect(ids));
        self.emit(GridEvent::CellSelect(vec![range]));
        Ok(Some(range))
    }

    // ---- Rows ----

    /// Ask the host for a new row at display position `index`.
    pub fn add_row(&mut self, index: usize) -> bool {
        if !self.config.row.creatable {
            return false;
        }
        let index = index.min(self.data.display_row_count());
        self.emit(GridEvent::RowAdd(vec![RowInsert { index }]));
        true
    }

    /// Ask the host to delete rows. Only known, deletable rows are
    /// requested; the host answers with [`remove_rows`](Self::remove_rows).
    pub fn delete_rows(&mut self, ids: &[RowId]) -> Vec<RowId> {
        if !self.config.row.deletable {
            return Vec::new();
        }
        let deletable: Vec<RowId> = ids
            .iter()
            .copied()
            .filter(|id| self.data.row(*id).is_some_and(|r| r.deletable))
            .collect();
        if !deletable.is_empty() {
            self.emit(GridEvent::RowDelete(deletable.clone()));
        }
        deletable
    }

    /// Drop rows the host removed.
    pub fn remove_rows(&mut self, ids: &[RowId]) -> usize {
        let gone: HashSet<RowId> = ids.iter().copied().collect();
        let before = self.data.rows.len();
        self.data.rows.retain(|r| !gone.contains(&r.id));
        let removed = before - self.data.rows.len();
        if removed > 0 {
            self.data.reset_row_order();
            self.editor.on_rows_removed(&self.data, ids);
            self.mark_pipeline();
        }
        removed
    }

    /// Move a row to display position `to`. Only possible while the grid is
    /// neither sorted nor grouped, where display order is storage order.
    pub fn move_row(&mut self, id: RowId, to: usize) -> bool {
        if !self.config.row.arrangeable || !self.sort_by.is_empty() || !self.group_by.is_empty() {
            return false;
        }
        self.prepare();
        let Some(from) = self.data.find_row(id) else {
            return false;
        };
        let to = to.min(self.data.rows.len() - 1);
        if from == to {
            return false;
        }
        let row = self.data.rows.remove(from);
        self.data.rows.insert(to, row);
        self.data.reset_row_order();
        self.emit(GridEvent::RowMove(vec![RowMove { row: id, from, to }]));
        self.mark_pipeline();
        true
    }

    /// Set the selection flag on rows. Returns how many changed.
    pub fn select_rows(&mut self, ids: &[RowId], selected: bool) -> usize {
        if !self.config.row.selectable {
            return 0;
        }
        let wanted: HashSet<RowId> = ids.iter().copied().collect();
        let mut changed = Vec::new();
        for row in &mut self.data.rows {
            if wanted.contains(&row.id) && row.selected != selected {
                row.selected = selected;
                changed.push(RowSelect {
                    row: row.id,
                    selected,
                });
            }
        }
        let count = changed.len();
        if count > 0 {
            self.emit(GridEvent::RowSelect(changed));
        }
        count
    }

    /// Select whole rows between two display positions.
    pub fn select_row_range(&mut self, start: usize, end: usize) -> Result<Option<SelectionRange>> {
        self.prepare();
        let range = SelectionRange::row_range(start, end, self.data.visible_column_count());
        let selected = self.install_range(range)?;
        if let Some(range) = selected {
            self.emit(GridEvent::CellSelect(vec![range]));
        }
        Ok(selected)
    }

    pub fn select_all(&mut self) -> Result<Option<SelectionRange>> {
        self.prepare();
        let range = SelectionRange::all(
            self.data.display_row_count(),
            self.data.visible_column_count(),
        );
        let selected = self.install_range(range)?;
        if let Some(range) = selected {
            self.emit(GridEvent::CellSelect(vec![range]));
        }
        Ok(selected)
    }

    /// Request a row's detail view.
    pub fn expand_row(&mut self, id: RowId, expanded: bool) -> bool {
        if !self.config.row.expandable || self.data.row(id).is_none() {
            return false;
        }
        self.emit(GridEvent::RowExpand(vec![RowExpand { row: id, expanded }]));
        true
    }

    // ---- Groups ----

    pub fn toggle_group(&mut self, id: GroupId) -> bool {
        let Some(collapsed) = self.tree.get(id).map(|g| g.collapsed) else {
            return false;
        };
        self.set_group_collapsed(id, !collapsed)
    }

    pub fn set_group_collapsed(&mut self, id: GroupId, collapsed: bool) -> bool {
        if !self.tree.set_collapsed(id, collapsed) {
            return false;
        }
        self.mark_layout();
        true
    }

    pub fn collapse_all(&mut self) {
        self.tree.set_all_collapsed(true);
        self.mark_layout();
    }

    pub fn expand_all(&mut self) {
        self.tree.set_all_collapsed(false);
        self.mark_layout();
    }

    // ---- Cells ----

    fn install_range(&mut self, range: SelectionRange) -> Result<Option<SelectionRange>> {
        let outcome = self.editor.select_range(&mut self.data, range)?;
        Ok(outcome.map(|o| {
            if let Some(change) = o.flushed {
                self.record(vec![change], GridEvent::CellEdit);
            }
            o.range
        }))
    }

    /// Select the cells between two corners. With `extend` the current
    /// anchor is kept.
    pub fn select_cells(
        &mut self,
        start: CellIndex,
        end: CellIndex,
        extend: bool,
    ) -> Result<Option<SelectionRange>> {
        self.prepare();
        let outcome = self.editor.select_cells(&mut self.data, start, end, extend)?;
        Ok(outcome.map(|o| self.selected(o)))
    }

    pub fn move_selection(&mut self, direction: Direction) -> Result<Option<SelectionRange>> {
        self.prepare();
        let outcome = self.editor.move_selection(&mut self.data, direction)?;
        Ok(outcome.map(|o| self.selected(o)))
    }

    pub fn extend_selection(&mut self, direction: Direction) -> Result<Option<SelectionRange>> {
        self.prepare();
        let outcome = self.editor.extend_selection(&mut self.data, direction)?;
        Ok(outcome.map(|o| self.selected(o)))
    }

    fn selected(&mut self, outcome: crate::editor::SelectOutcome) -> SelectionRange {
        if let Some(change) = outcome.flushed {
            self.record(vec![change], GridEvent::CellEdit);
        }
        self.emit(GridEvent::CellSelect(vec![outcome.range]));
        outcome.range
    }

    pub fn selection(&self) -> Option<&SelectionRange> {
        self.editor.selection()
    }

    pub fn get_cells(&mut self, start: CellIndex, end: CellIndex, filter: ExcludeFilter) -> CellMatrix {
        self.prepare();
        self.editor.get_cells(&self.data, start, end, filter)
    }

    /// Copy the selection; returns the text for the system clipboard.
    pub fn copy(&mut self, filter: ExcludeFilter) -> Option<(String, OperationSummary)> {
        self.prepare();
        self.editor.copy(&self.data, filter)
    }

    pub fn cut(&mut self, filter: ExcludeFilter) -> Result<Option<(String, OperationSummary)>> {
        self.prepare();
        let Some((text, outcome)) = self.editor.cut(&mut self.data, filter)? else {
            return Ok(None);
        };
        Ok(Some((text, self.finish(outcome, GridEvent::CellClear))))
    }

    pub fn paste_text(&mut self, text: &str, filter: ExcludeFilter) -> Result<OperationSummary> {
        self.prepare();
        let outcome = self
            .editor
            .paste_text(&mut self.data, text, filter)
            .inspect_err(|e| {
                if e.is_structural() {
                    tracing::warn!(error = %e, "paste aborted");
                }
            })?;
        Ok(self.finish(outcome, GridEvent::CellPaste))
    }

    pub fn fill(
        &mut self,
        source: &SelectionRange,
        target: &SelectionRange,
        reverse: bool,
        filter: ExcludeFilter,
    ) -> Result<OperationSummary> {
        self.prepare();
        let outcome = self
            .editor
            .fill(&mut self.data, source, target, reverse, filter)?;
        Ok(self.finish(outcome, GridEvent::CellFill))
    }

    pub fn clear(&mut self, filter: ExcludeFilter) -> Result<OperationSummary> {
        self.prepare();
        let outcome = self.editor.clear(&mut self.data, filter)?;
        Ok(self.finish(outcome, GridEvent::CellClear))
    }

    /// Enter edit mode on a cell. `Ok(false)` for read-only cells.
    pub fn begin_edit(&mut self, cell: CellIndex) -> Result<bool> {
        self.prepare();
        self.editor.begin_edit(&self.data, cell)
    }

    pub fn input(&mut self, text: &str) -> Result<Option<ValidationErrors>> {
        self.editor.input(&self.data, text)
    }

    pub fn input_value(&mut self, value: Option<CellValue>) -> Result<Option<ValidationErrors>> {
        self.editor.input_value(&self.data, value)
    }

    /// Validate and commit the pending edit. Returns whether the value
    /// changed.
    pub fn commit_edit(&mut self) -> Result<bool> {
        let Some(change) = self.editor.commit_edit(&mut self.data)? else {
            return Ok(false);
        };
        self.record(vec![change], GridEvent::CellEdit);
        Ok(true)
    }

    pub fn cancel_edit(&mut self) -> Result<()> {
        self.editor.cancel_edit()
    }

    /// Value to render at a display position, including an uncommitted edit.
    pub fn display_value(&self, cell: CellIndex) -> Option<&CellValue> {
        self.editor.display_value(&self.data, cell)
    }

    fn finish(&mut self, outcome: EditOutcome, event: fn(Vec<RowPatch>) -> GridEvent) -> OperationSummary {
        if outcome.summary.is_partial() {
            tracing::debug!(
                count = outcome.summary.count,
                total = outcome.summary.total,
                "operation skipped some cells"
            );
        }
        self.record(outcome.changes, event);
        outcome.summary
    }

    /// Queue changes as per-row patches and refresh whatever depends on the
    /// touched columns.
    fn record(&mut self, changes: Vec<CellChange>, event: fn(Vec<RowPatch>) -> GridEvent) {
        if changes.is_empty() {
            return;
        }
        let mut reorder = false;
        let mut recalc = false;
        let mut patches: Vec<RowPatch> = Vec::new();
        for change in changes {
            reorder |= self.sort_by.contains(&change.column) || self.group_by.contains(&change.column);
            recalc |= self
                .data
                .column(&change.column)
                .is_some_and(|c| c.calculate.is_some());
            let mut patch = RowPatch::new(change.row);
            patch.values.insert(change.column, change.new);
            match patches.iter_mut().find(|p| p.row == patch.row) {
                Some(existing) => existing.merge(patch),
                None => patches.push(patch),
            }
        }
        self.emit(event(patches));
        if reorder {
            self.mark_pipeline();
        } else if recalc {
            self.recalculate();
        }
    }

    fn recalculate(&mut self) {
        if !self.dirty.pipeline {
            self.tree.calculate(&self.data);
        }
    }

    /// Validation errors of the pending edit, for an inline message.
    pub fn pending_errors(&self) -> Option<&ValidationErrors> {
        self.editor.pending().and_then(|e| e.errors.as_ref())
    }
}

/// Add or remove `id` from an ordered key list, keeping existing positions.
fn update_keys(keys: &mut Vec<ColumnId>, id: &ColumnId, active: bool) {
    let present = keys.iter().position(|k| k == id);
    match (present, active) {
        (None, true) => keys.push(id.clone()),
        (Some(i), false) => {
            keys.remove(i);
        }
        _ => {}
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::types::Row;

    fn view() -> GridView {
        let columns = vec![
            Column::new("name", Field::text("Name")),
            Column::new("qty", Field::number("Qty")),
            Column::new("kind", Field::text("Kind")),
        ];
        let rows = (1..=6)
            .map(|i| {
                Row::new(i)
                    .with("name", format!("r{i}"))
                    .with("qty", i as f64)
                    .with("kind", if i % 2 == 0 { "even" } else { "odd" })
            })
            .collect();
        let mut view =
            GridView::with_data(GridConfig::default(), columns, rows, 600.0, 400.0).unwrap();
        view.update();
        view
    }

    fn id(s: &str) -> ColumnId {
        ColumnId::from(s)
    }

    #[test]
    fn test_resize_clamps_and_emits() {
        let mut view = view();
        assert!(view.resize_column(&id("name"), 10_000.0));
        assert_eq!(view.data().column(&id("name")).unwrap().width, 500.0);
        let events = view.flush_events();
        assert_eq!(
            events,
            vec![GridEvent::ColumnResize(vec![ColumnResize {
                column: id("name"),
                width: 500.0
            }])]
        );
    }

    #[test]
    fn test_disabled_toggle_is_noop() {
        let mut config = GridConfig::default();
        config.column.sortable = false;
        let mut view = view();
        view.set_config(config).unwrap();
        assert!(!view.sort_column(&id("qty"), Some(SortDirection::Desc)));
        assert!(view.flush_events().is_empty());
    }

    #[test]
    fn test_hide_column_shrinks_visible_order() {
        let mut view = view();
        assert!(view.hide_columns(&[id("qty")]));
        view.update();
        assert_eq!(view.data().visible_column_count(), 2);
        assert_eq!(view.data().column_at(1).unwrap().id, id("kind"));
        assert!(view.unhide_columns(&[id("qty")]));
        assert_eq!(view.data().visible_column_count(), 3);
    }

    #[test]
    fn test_calculate_refuses_unsupported_operator() {
        let mut view = view();
        assert!(!view.calculate_column(&id("name"), Some(CalculateOperator::Sum)));
        assert!(view.calculate_column(&id("qty"), Some(CalculateOperator::Sum)));
        view.update();
        let root = view.tree().root().unwrap();
        assert!(root.aggregates.contains_key(&id("qty")));
    }

    #[test]
    fn test_edit_commit_emits_row_patch() {
        let mut view = view();
        assert!(view.begin_edit(CellIndex::new(0, 1)).unwrap());
        view.input("42").unwrap();
        assert!(view.commit_edit().unwrap());
        let events = view.flush_events();
        let GridEvent::CellEdit(patches) = &events[0] else {
            panic!("expected a cell edit, got {events:?}");
        };
        assert_eq!(patches[0].row, RowId(1));
        assert_eq!(
            patches[0].values.get(&id("qty")),
            Some(&Some(CellValue::Number(42.0)))
        );
    }

    #[test]
    fn test_edit_on_sort_column_resorts() {
        let mut view = view();
        view.sort_column(&id("qty"), Some(SortDirection::Asc));
        view.update();
        view.begin_edit(CellIndex::new(0, 1)).unwrap();
        view.input("100").unwrap();
        view.commit_edit().unwrap();
        view.update();
        assert_eq!(view.data().row_at(5).unwrap().id, RowId(1));
    }

    #[test]
    fn test_move_row_requires_unsorted() {
        let mut view = view();
        assert!(view.move_row(RowId(1), 3));
        view.update();
        assert_eq!(view.data().row_at(3).unwrap().id, RowId(1));
        view.sort_column(&id("qty"), Some(SortDirection::Asc));
        assert!(!view.move_row(RowId(1), 0));
    }

    #[test]
    fn test_delete_then_remove_rows() {
        let mut view = view();
        let requested = view.delete_rows(&[RowId(2), RowId(99)]);
        assert_eq!(requested, vec![RowId(2)]);
        assert_eq!(view.remove_rows(&requested), 1);
        view.update();
        assert_eq!(view.data().display_row_count(), 5);
    }

    #[test]
    fn test_group_collapse_shrinks_content() {
        let mut view = view();
        view.group_column(&id("kind"), Some(SortDirection::Asc));
        view.update();
        let expanded = view.scroll().content_size().1;
        // Header, three rows and spacing per group.
        assert_eq!(expanded, 2.0 * (40.0 + 3.0 * 32.0 + 20.0));
        view.collapse_all();
        view.update();
        // A collapsed group is only its header.
        assert_eq!(view.scroll().content_size().1, 2.0 * 40.0);

        view.expand_all();
        view.update();
        assert_eq!(view.scroll().content_size().1, expanded);
    }

    #[test]
    fn test_paste_emits_patches_per_row() {
        let mut view = view();
        view.select_cells(CellIndex::new(0, 1), CellIndex::new(0, 1), false)
            .unwrap();
        let summary = view.paste_text("7\tx\n8\ty", ExcludeFilter::NONE).unwrap();
        assert_eq!(summary, OperationSummary { count: 4, total: 4 });
        let events = view.flush_events();
        let patches = events
            .iter()
            .find_map(|e| match e {
                GridEvent::CellPaste(p) => Some(p),
                _ => None,
            })
            .unwrap();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].values.len(), 2);
    }
}
