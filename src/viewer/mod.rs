//! Main GridView struct - the primary entry point for the grid core.
//!
//! This module provides the `GridView` struct that handles:
//! - Holding rows, columns and configuration
//! - Running the sort/group/aggregate pipeline when its inputs change
//! - Coordinating layout, viewport culling and view recycling
//! - Handling user interactions (scroll, pointer, selection, editing)
//! - Queueing outbound events
//!
//! Work is dirty-flagged: mutations only mark what went stale, and
//! [`GridView::update`] recomputes it once per frame. The browser wrapper
//! lives in `bindings` and is only compiled for wasm32.

mod actions;
#[cfg(target_arch = "wasm32")]
pub mod bindings;
pub mod events;
pub mod frame;
pub mod scroll;
mod window;

use std::collections::{HashMap, HashSet};

use crate::config::GridConfig;
use crate::editor::CellEditor;
use crate::error::Result;
use crate::group::{sort_by, GroupLevel, GroupTree, SortKey};
use crate::layout::{layout_rows, ColumnLayout, GroupMetrics, GroupedRows, Viewport};
use crate::render::{HandleFactory, RecycleDiff, Recycler};
use crate::types::{Column, ColumnId, GridData, Row, RowId};

pub use events::{
    ColumnCalculate, ColumnDirection, ColumnMove, ColumnResize, EventQueue, GridEvent, RowExpand,
    RowInsert, RowMove, RowPatch, RowSelect,
};
pub use frame::{FrameRequester, FrameScheduler};
pub use scroll::{Axis, ScrollChange, ScrollController, ScrollState, Thumb};
pub use window::{HitTarget, ViewportWindow};


/// What went stale since the last update.
#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    /// Sort order, grouping or aggregates.
    pipeline: bool,
    /// Rectangles and content size.
    layout: bool,
}

/// Virtual-scroll grid core.
#[derive(Debug)]
pub struct GridView {
    pub(crate) data: GridData,
    pub(crate) config: GridConfig,
    pub(crate) tree: GroupTree,
    /// Present while at least one grouping column is active.
    pub(crate) grouped: Option<GroupedRows>,
    pub(crate) columns: ColumnLayout,
    /// Display position of every displayed row.
    pub(crate) display_index: HashMap<RowId, usize>,
    pub(crate) scroll: ScrollController,
    pub(crate) editor: CellEditor,
    pub(crate) events: EventQueue,
    /// Sort columns, most significant first.
    sort_by: Vec<ColumnId>,
    /// Grouping columns, outermost first.
    group_by: Vec<ColumnId>,
    /// Host clock (ms) used to time-stamp queued events.
    now: f64,
    dirty: Dirty,
    /// Last culled window, dropped by anything that moves or re-lays items.
    window: Option<ViewportWindow>,
    /// Windows culled so far.
    window_builds: u64,
}

impl GridView {
    pub fn new(config: GridConfig, width: f32, height: f32) -> Result<Self> {
        config.validate()?;
        let scroll = ScrollController::new(Viewport::new(width, height), config.platform);
        Ok(Self {
            data: GridData::default(),
            tree: GroupTree::build(&[], &[], &[]),
            grouped: None,
            columns: ColumnLayout::default(),
            display_index: HashMap::new(),
            scroll,
            editor: CellEditor::new(&config.cell),
            events: EventQueue::new(config.events.clone()),
            sort_by: Vec::new(),
            group_by: Vec::new(),
            now: 0.0,
            dirty: Dirty {
                pipeline: true,
                layout: true,
            },
            window: None,
            window_builds: 0,
            config,
        })
    }

    /// Build a view over a data set in one go.
    pub fn with_data(
        config: GridConfig,
        columns: Vec<Column>,
        rows: Vec<Row>,
        width: f32,
        height: f32,
    ) -> Result<Self> {
        let mut view = Self::new(config, width, height)?;
        view.set_columns(columns);
        view.set_rows(rows);
        Ok(view)
    }

    pub fn data(&self) -> &GridData {
        &self.data
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn editor(&self) -> &CellEditor {
        &self.editor
    }

    pub fn scroll(&self) -> &ScrollController {
        &self.scroll
    }

    pub fn viewport(&self) -> &Viewport {
        self.scroll.viewport()
    }

    pub fn column_layout(&self) -> &ColumnLayout {
        &self.columns
    }

    pub fn grouped_rows(&self) -> Option<&GroupedRows> {
        self.grouped.as_ref()
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped.is_some()
    }

    pub fn sort_columns(&self) -> &[ColumnId] {
        &self.sort_by
    }

    pub fn group_columns(&self) -> &[ColumnId] {
        &self.group_by
    }

    pub fn row_height(&self) -> f32 {
        self.config.row_height()
    }

    /// Advance the host clock used for event batching.
    pub fn set_time(&mut self, now: f64) {
        self.now = now;
    }

    pub fn needs_update(&self) -> bool {
        self.dirty.pipeline || self.dirty.layout || self.window.is_none()
    }

    // ---- Inbound data ----

    pub fn set_config(&mut self, config: GridConfig) -> Result<()> {
        config.validate()?;
        self.editor.set_config(&config.cell);
        self.events.set_config(config.events.clone());
        self.config = config;
        self.mark_layout();
        Ok(())
    }

    /// Replace every column. Sort and grouping columns are taken from the
    /// columns' own directions, in column order.
    pub fn set_columns(&mut self, columns: Vec<Column>) {
        self.data.columns = columns
            .into_iter()
            .map(|mut c| {
                c.width = self.config.column.clamp_width(c.width);
                c
            })
            .collect();
        self.data.refresh_column_order();
        self.data.coerce_values();
        self.sort_by = self
            .data
            .columns
            .iter()
            .filter(|c| c.sort.is_some())
            .map(|c| c.id.clone())
            .collect();
        self.group_by = self
            .data
            .columns
            .iter()
            .filter(|c| c.group_sort.is_some())
            .map(|c| c.id.clone())
            .collect();
        self.editor.clamp_selection(&self.data);
        self.mark_pipeline();
    }

    /// Replace every row.
    pub fn set_rows(&mut self, rows: Vec<Row>) {
        let kept: HashSet<RowId> = rows.iter().map(|r| r.id).collect();
        let removed: Vec<RowId> = self
            .data
            .rows
            .iter()
            .map(|r| r.id)
            .filter(|id| !kept.contains(id))
            .collect();
        self.data.rows = rows;
        self.data.coerce_values();
        self.data.reset_row_order();
        self.editor.on_rows_removed(&self.data, &removed);
        self.mark_pipeline();
    }

    /// Stream more rows in.
    ///
    /// In stream mode an unsorted, ungrouped grid extends its layout in
    /// place; anything else goes through the full pipeline.
    pub fn append_rows(&mut self, rows: Vec<Row>) {
        if rows.is_empty() {
            return;
        }
        let incremental = self.config.stream_mode
            && self.sort_by.is_empty()
            && self.group_by.is_empty()
            && !self.dirty.pipeline;
        let added = self.data.append_rows(rows);
        if incremental {
            let first_display = self.display_index.len();
            for (offset, storage) in added.clone().enumerate() {
                if let Some(row) = self.data.rows.get(storage) {
                    self.display_index.insert(row.id, first_display + offset);
                }
            }
            if let Some(root) = self.tree.get_mut(GroupTree::ROOT) {
                root.rows.extend(added.clone());
            }
            self.tree.calculate(&self.data);
            tracing::debug!(rows = added.len(), "rows streamed in");
            self.mark_layout();
        } else {
            self.mark_pipeline();
        }
    }

    // ---- Pipeline ----

    pub(crate) fn mark_pipeline(&mut self) {
        self.dirty.pipeline = true;
        self.dirty.layout = true;
        self.window = None;
    }

    pub(crate) fn mark_layout(&mut self) {
        self.dirty.layout = true;
        self.window = None;
    }

    /// Bring the display order up to date. Operations addressing cells by
    /// display position call this first.
    pub(crate) fn prepare(&mut self) {
        if self.dirty.pipeline {
            self.run_pipeline();
        }
    }

    fn run_pipeline(&mut self) {
        let mut order: Vec<usize> = (0..self.data.rows.len()).collect();
        let keys: Vec<SortKey> = self
            .sort_by
            .iter()
            .filter_map(|id| Some(SortKey::new(id.clone(), self.data.column(id)?.sort?)))
            .collect();
        if !keys.is_empty() {
            sort_by(&self.data.rows, &mut order, &keys);
        }

        let collapsed = self.tree.collapsed_paths();
        let levels: Vec<GroupLevel<'_>> = self
            .group_by
            .iter()
            .filter_map(|id| {
                let column = self.data.column(id)?;
                Some(GroupLevel {
                    column,
                    direction: column.group_sort?,
                })
            })
            .collect();
        let grouped = !levels.is_empty();
        let mut tree = GroupTree::build(&self.data.rows, &order, &levels);
        tree.restore_collapsed(&collapsed);
        tree.calculate(&self.data);

        let display = if grouped { tree.flatten_rows() } else { order };
        self.display_index = display
            .iter()
            .enumerate()
            .filter_map(|(pos, &i)| Some((self.data.rows.get(i)?.id, pos)))
            .collect();
        self.data.set_row_order(display);
        self.tree = tree;
        self.grouped = grouped.then(GroupedRows::default);
        self.editor.clamp_selection(&self.data);
        self.dirty.pipeline = false;
        self.dirty.layout = true;
        tracing::debug!(
            rows = self.data.display_row_count(),
            sort_keys = keys.len(),
            groups = self.tree.len(),
            "pipeline refreshed"
        );
    }

    fn run_layout(&mut self) {
        let widths: Vec<f32> = self.data.visible_columns().map(|c| c.width).collect();
        self.columns = ColumnLayout::compute(&widths, self.config.frozen_count, self.config.side_spacing);
        let width = self.columns.total_width();
        let height = if self.grouped.is_some() {
            let metrics = GroupMetrics {
                row_height: self.row_height(),
                header_height: self.config.group.header_height,
                spacing: self.config.group.spacing,
                indent: self.config.group.indent,
                extra_height: 0.0,
                left: 0.0,
                width,
            };
            let grouped = GroupedRows::compute(&mut self.tree, &metrics);
            let height = grouped.total_height;
            self.grouped = Some(grouped);
            height
        } else {
            layout_rows(self.data.display_row_count(), self.row_height())
        };
        if let Some(change) = self.scroll.set_content_size(width, height) {
            tracing::trace!(x = change.x, y = change.y, "scroll re-clamped after layout");
        }
        self.dirty.layout = false;
        tracing::debug!(width, height, columns = self.columns.len(), "layout computed");
    }

    /// Recompute whatever is stale and return the current window.
    ///
    /// A clean view returns the cached window without culling.
    pub fn update(&mut self) -> &ViewportWindow {
        self.prepare();
        if self.dirty.layout {
            self.run_layout();
            self.window = None;
        }
        let current = match self.window.take() {
            Some(cached) => cached,
            None => self.cull(),
        };
        self.window.insert(current)
    }

    fn cull(&mut self) -> ViewportWindow {
        self.window_builds += 1;
        self.build_window()
    }

    /// How many times the window has been culled.
    pub fn window_builds(&self) -> u64 {
        self.window_builds
    }

    /// Update and push the window through a recycler.
    pub fn render_into<F: HandleFactory>(&mut self, recycler: &mut Recycler<F>) -> RecycleDiff {
        let views = self.update().views.clone();
        recycler.apply(views)
    }

    // ---- Scrolling ----

    fn scrolled(&mut self, change: Option<ScrollChange>) -> Option<ScrollChange> {
        if change.is_some() {
            self.window = None;
        }
        change
    }

    pub fn resize(&mut self, width: f32, height: f32) -> Option<ScrollChange> {
        let change = self.scroll.resize(width, height);
        self.window = None;
        change
    }

    pub fn scroll_by(&mut self, dx: f32, dy: f32) -> Option<ScrollChange> {
        let change = self.scroll.scroll_by(dx, dy);
        self.scrolled(change)
    }

    pub fn scroll_to(&mut self, x: f32, y: f32) -> Option<ScrollChange> {
        let change = self.scroll.scroll_to(x, y);
        self.scrolled(change)
    }

    pub fn wheel(&mut self, delta_x: f32, delta_y: f32, shift: bool) -> Option<ScrollChange> {
        let change = self.scroll.wheel(delta_x, delta_y, shift);
        self.scrolled(change)
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.scroll.pointer_down(x, y, self.now);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> Option<ScrollChange> {
        let change = self.scroll.pointer_move(x, y, self.now);
        self.scrolled(change)
    }

    pub fn pointer_up(&mut self, touch: bool) {
        self.scroll.pointer_up(self.now, touch);
    }

    /// Start or steer auto-scroll from a drag position in screen space.
    pub fn auto_scroll(&mut self, x: f32, y: f32) {
        self.scroll.auto_scroll(x, y);
    }

    pub fn stop_auto_scroll(&mut self) {
        self.scroll.stop_auto_scroll();
    }

    pub fn thumb(&self, axis: Axis) -> Option<Thumb> {
        self.scroll.thumb(axis)
    }

    pub fn thumb_down(&mut self, axis: Axis, pointer: f32) {
        self.scroll.thumb_down(axis, pointer);
    }

    /// Per-frame hook: advances momentum and auto-scroll.
    pub fn tick(&mut self) -> Option<ScrollChange> {
        let change = self.scroll.tick();
        self.scrolled(change)
    }

    /// Whether another frame is needed even without new input.
    pub fn is_animating(&self) -> bool {
        self.scroll.is_animating()
    }

    // ---- Events ----

    pub(crate) fn emit(&mut self, event: GridEvent) {
        self.events.push(event, self.now);
    }

    /// Timer hook: events whose throttle window closed at `now`.
    pub fn poll_events(&mut self, now: f64) -> Vec<GridEvent> {
        self.now = now;
        self.events.poll(now)
    }

    /// Drain every queued event.
    pub fn flush_events(&mut self) -> Vec<GridEvent> {
        self.events.flush()
    }

    /// When the host should next call [`poll_events`](Self::poll_events).
    pub fn event_deadline(&self) -> Option<f64> {
        self.events.deadline()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::field::{CellValue, Field, SortDirection};
    use crate::render::{PoolKey, ViewKey};
    use crate::types::CellIndex;

    fn view(rows: usize) -> GridView {
        let columns = vec![
            Column::new("name", Field::text("Name")).with_width(200.0),
            Column::new("qty", Field::number("Qty")).with_width(100.0),
            Column::new("done", Field::checkbox("Done")).with_width(100.0),
        ];
        let rows = (0..rows as u64)
            .map(|i| {
                Row::new(i)
                    .with("name", format!("item {i}"))
                    .with("qty", (i % 7) as f64)
                    .with("done", i % 2 == 0)
            })
            .collect();
        GridView::with_data(GridConfig::default(), columns, rows, 400.0, 320.0).unwrap()
    }

    #[test]
    fn test_update_culls_to_viewport() {
        let mut view = view(1000);
        let window = view.update();
        // 320 px / 32 px rows = 10 rows, plus 4 rows of overscan below.
        assert_eq!(window.rows, (0..14).collect::<Vec<_>>());
        assert_eq!(window.columns.iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        let cells = window
            .views
            .iter()
            .filter(|v| matches!(v.class, PoolKey::Cell(_)))
            .count();
        assert_eq!(cells, 14 * 3);
    }

    #[test]
    fn test_scroll_moves_window() {
        let mut view = view(1000);
        view.update();
        assert!(view.scroll_by(0.0, 3200.0).is_some());
        let window = view.update();
        assert_eq!(window.rows.first(), Some(&96));
        assert_eq!(window.rows.last(), Some(&113));
        assert!(view.scroll_by(0.0, 0.0).is_none());
    }

    #[test]
    fn test_scroll_is_clamped_to_content() {
        let mut view = view(20);
        view.update();
        let change = view.scroll_to(0.0, 10_000.0).unwrap();
        // 20 rows * 32 px - 320 px viewport.
        assert_eq!(change.y, 320.0);
    }

    #[test]
    fn test_window_reused_when_unchanged() {
        let mut view = view(100);
        let first = view.update().clone();
        assert_eq!(view.window_builds(), 1);
        assert!(!view.needs_update());
        assert_eq!(*view.update(), first);
        view.update();
        assert_eq!(view.window_builds(), 1);

        // A zero scroll or a selection leaves the window alone.
        assert!(view.scroll_by(0.0, 0.0).is_none());
        view.select_cells(CellIndex::new(1, 1), CellIndex::new(1, 1), false)
            .unwrap();
        view.update();
        assert_eq!(view.window_builds(), 1);

        view.scroll_by(0.0, 64.0);
        view.update();
        view.update();
        assert_eq!(view.window_builds(), 2);

        assert!(view.resize_column(&ColumnId::from("qty"), 150.0));
        view.update();
        assert_eq!(view.window_builds(), 3);
    }

    #[test]
    fn test_sort_reorders_display() {
        let mut view = view(10);
        view.sort_column(&ColumnId::from("qty"), Some(SortDirection::Desc));
        view.update();
        let first = view.data().row_at(0).unwrap();
        assert_eq!(first.get(&ColumnId::from("qty")), Some(&CellValue::Number(6.0)));
    }

    #[test]
    fn test_group_by_boolean() {
        let mut view = view(6);
        assert!(view.group_column(&ColumnId::from("done"), Some(SortDirection::Asc)));
        let window = view.update().clone();
        let root = view.tree().root().unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.rows.len(), 6);
        assert!(window
            .views
            .iter()
            .any(|v| matches!(v.key, ViewKey::Group { .. })));
    }

    #[test]
    fn test_hit_test_cell() {
        let mut view = view(100);
        view.update();
        assert_eq!(view.hit_test(250.0, 70.0), HitTarget::Cell { row: 2, col: 1 });
        view.scroll_by(0.0, 64.0);
        view.update();
        assert_eq!(view.hit_test(250.0, 70.0), HitTarget::Cell { row: 4, col: 1 });
        assert_eq!(view.hit_test(450.0, 70.0), HitTarget::Empty);
    }

    #[test]
    fn test_stream_append_extends_layout() {
        let config = GridConfig {
            stream_mode: true,
            ..GridConfig::default()
        };
        let mut view = GridView::with_data(
            config,
            vec![Column::new("qty", Field::number("Qty"))],
            vec![Row::new(1).with("qty", 1.0)],
            400.0,
            320.0,
        )
        .unwrap();
        view.update();
        view.append_rows(vec![Row::new(2).with("qty", 2.0), Row::new(3).with("qty", 3.0)]);
        view.update();
        assert_eq!(view.data().display_row_count(), 3);
        assert_eq!(view.scroll().content_size().1, 96.0);
        assert_eq!(view.tree().root().unwrap().rows.len(), 3);
    }
}
