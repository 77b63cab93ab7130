//! Pre-computed layout data for the grid.
//!
//! Column, row and group rectangles are computed once when sizes, counts or
//! grouping change, enabling O(log n) lookups for culling and hit testing.
//! Nothing here runs per frame; callers flag the layout dirty and the next
//! frame recomputes.

use std::collections::HashMap;
use std::ops::Range;

use serde::Serialize;

use crate::group::{GroupId, GroupTree};

/// Rectangle in content-space pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Whether the rectangle overlaps `[start, end)` horizontally.
    pub fn overlaps_x(&self, start: f32, end: f32) -> bool {
        self.left < end && self.right() > start
    }

    /// Whether the rectangle overlaps `[start, end)` vertically.
    pub fn overlaps_y(&self, start: f32, end: f32) -> bool {
        self.top < end && self.bottom() > start
    }

    /// Whether the rectangle spans `[start, end]` vertically on both edges.
    pub fn covers_y(&self, start: f32, end: f32) -> bool {
        self.top <= start && self.bottom() >= end
    }
}

/// Column rectangles: a frozen prefix followed by the scrollable suffix.
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    /// Rectangles in visible-column order (height is unused and left at 0).
    pub rects: Vec<Rect>,
    /// Number of leading frozen columns.
    pub frozen: usize,
    /// Padding before the first column.
    pub start_offset: f32,
    total_width: f32,
}

impl ColumnLayout {
    /// Lay out columns left to right starting at `start_offset`; the total
    /// width includes `start_offset` and a trailing pad of the same size.
    pub fn compute(widths: &[f32], frozen: usize, start_offset: f32) -> Self {
        let mut rects = Vec::with_capacity(widths.len());
        let right = layout_columns(widths, start_offset, &mut rects);
        Self {
            rects,
            frozen: frozen.min(widths.len()),
            start_offset,
            total_width: right + start_offset,
        }
    }

    pub fn total_width(&self) -> f32 {
        self.total_width
    }

    /// Right edge of the frozen prefix (the start offset when nothing is
    /// frozen).
    pub fn frozen_width(&self) -> f32 {
        match self.frozen {
            0 => self.start_offset,
            n => self
                .rects
                .get(n - 1)
                .map_or(self.start_offset, Rect::right),
        }
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rect(&self, col: usize) -> Option<Rect> {
        self.rects.get(col).copied()
    }

    /// Find column at x position (binary search)
    pub fn col_at_x(&self, x: f32) -> Option<usize> {
        let idx = self.rects.partition_point(|r| r.right() <= x);
        self.rects
            .get(idx)
            .filter(|r| r.left <= x)
            .map(|_| idx)
    }
}

/// Annotate column rectangles from widths, returning the right edge of the
/// last column.
pub fn layout_columns(widths: &[f32], start_offset: f32, out: &mut Vec<Rect>) -> f32 {
    out.clear();
    let mut x = start_offset;
    for &w in widths {
        let w = w.max(0.0);
        out.push(Rect::new(x, 0.0, w, 0.0));
        x += w;
    }
    x
}

/// Rectangle of the `index`-th row in an ungrouped list.
#[allow(clippy::cast_precision_loss)]
pub fn row_rect(index: usize, row_height: f32, start_offset: f32, width: f32) -> Rect {
    Rect::new(0.0, start_offset + index as f32 * row_height, width, row_height)
}

/// Total height of `count` ungrouped rows.
#[allow(clippy::cast_precision_loss)]
pub fn layout_rows(count: usize, row_height: f32) -> f32 {
    count as f32 * row_height
}

/// Group geometry parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMetrics {
    pub row_height: f32,
    pub header_height: f32,
    pub spacing: f32,
    pub indent: f32,
    /// Extra height appended to every expanded leaf (e.g. a "new row" line).
    pub extra_height: f32,
    pub left: f32,
    pub width: f32,
}

/// One row placed inside a leaf group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RowSlot {
    /// Storage index of the row.
    pub row: usize,
    /// Leaf group that owns the row.
    pub group: GroupId,
    pub rect: Rect,
}

/// Row placement for a grouped grid.
#[derive(Debug, Clone, Default)]
pub struct GroupedRows {
    /// Placed rows, in display order. Rows of collapsed groups are absent.
    pub slots: Vec<RowSlot>,
    /// Slot range of every expanded leaf group.
    pub leaf_slots: HashMap<GroupId, Range<usize>>,
    pub total_height: f32,
}

impl GroupedRows {
    /// Lay out the whole tree, writing every group's rectangle into the tree.
    pub fn compute(tree: &mut GroupTree, metrics: &GroupMetrics) -> Self {
        let mut out = Self::default();
        out.total_height = layout_group(tree, GroupTree::ROOT, 0.0, metrics, &mut out);
        tracing::trace!(
            slots = out.slots.len(),
            height = out.total_height,
            "grouped layout computed"
        );
        out
    }

    /// Slot whose rectangle contains `y`.
    pub fn slot_at_y(&self, y: f32) -> Option<usize> {
        let idx = self.slots.partition_point(|s| s.rect.bottom() <= y);
        self.slots
            .get(idx)
            .filter(|s| s.rect.top <= y)
            .map(|_| idx)
    }
}

/// Lay out `id` at `top` and return its height.
///
/// Leaves place their rows; inner groups place their children and sum them.
/// Every non-root group adds one header and one trailing spacing unit; the
/// root adds neither. A collapsed group is exactly one header tall.
pub fn layout_group(
    tree: &mut GroupTree,
    id: GroupId,
    top: f32,
    metrics: &GroupMetrics,
    out: &mut GroupedRows,
) -> f32 {
    let Some(group) = tree.get(id) else {
        return 0.0;
    };
    let is_root = id == GroupTree::ROOT;
    let depth = group.depth;
    let collapsed = group.collapsed && !is_root;
    let children = group.children.clone();
    let rows = if children.is_empty() && !collapsed {
        group.rows.clone()
    } else {
        Vec::new()
    };

    #[allow(clippy::cast_precision_loss)]
    let inset = metrics.indent * depth.saturating_sub(1) as f32;
    let left = metrics.left + inset;
    let width = (metrics.width - 2.0 * inset).max(0.0);
    let (header, spacing) = if is_root {
        (0.0, 0.0)
    } else {
        (metrics.header_height, metrics.spacing)
    };

    let height = if collapsed {
        header
    } else if children.is_empty() {
        let content_top = top + header;
        let first = out.slots.len();
        for (i, row) in rows.into_iter().enumerate() {
            let mut rect = row_rect(i, metrics.row_height, content_top, width);
            rect.left = left;
            out.slots.push(RowSlot { row, group: id, rect });
        }
        out.leaf_slots.insert(id, first..out.slots.len());
        let content = layout_rows(out.slots.len() - first, metrics.row_height) + metrics.extra_height;
        header + content + spacing
    } else {
        let mut cursor = top + header;
        for child in children {
            cursor += layout_group(tree, child, cursor, metrics, out);
        }
        cursor - top + spacing
    };

    if let Some(group) = tree.get_mut(id) {
        group.rect = Some(Rect::new(left, top, width, height));
    }
    height
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::field::{Field, SortDirection};
    use crate::group::GroupLevel;
    use crate::types::{Column, Row};

    fn metrics() -> GroupMetrics {
        GroupMetrics {
            row_height: 32.0,
            header_height: 40.0,
            spacing: 20.0,
            indent: 0.0,
            extra_height: 0.0,
            left: 0.0,
            width: 500.0,
        }
    }

    fn tree(count: u64) -> GroupTree {
        let rows: Vec<Row> = (0..count).map(|i| Row::new(i).with("flag", i % 2 == 0)).collect();
        let column = Column::new("flag", Field::checkbox("Flag"));
        let order: Vec<usize> = (0..rows.len()).collect();
        GroupTree::build(
            &rows,
            &order,
            &[GroupLevel {
                column: &column,
                direction: SortDirection::Asc,
            }],
        )
    }

    #[test]
    fn test_column_layout_adjacent() {
        let layout = ColumnLayout::compute(&[100.0, 150.0, 80.0], 1, 10.0);
        assert_eq!(layout.total_width(), 10.0 + 330.0 + 10.0);
        assert_eq!(layout.frozen_width(), 110.0);
        for pair in layout.rects.windows(2) {
            assert_eq!(pair[0].right(), pair[1].left);
        }
        assert_eq!(layout.col_at_x(5.0), None);
        assert_eq!(layout.col_at_x(10.0), Some(0));
        assert_eq!(layout.col_at_x(110.0), Some(1));
        assert_eq!(layout.col_at_x(339.0), Some(2));
        assert_eq!(layout.col_at_x(340.0), None);
    }

    #[test]
    fn test_grouped_heights() {
        let mut tree = tree(6);
        let layout = GroupedRows::compute(&mut tree, &metrics());
        // two groups of three rows: header + 3 rows + spacing each
        let group_height = 40.0 + 3.0 * 32.0 + 20.0;
        assert_eq!(layout.total_height, 2.0 * group_height);
        assert_eq!(layout.slots.len(), 6);

        let children = tree.children(GroupTree::ROOT).to_vec();
        let a = tree.get(children[0]).unwrap().rect.unwrap();
        let b = tree.get(children[1]).unwrap().rect.unwrap();
        assert_eq!(a.top + a.height, b.top);
        assert_eq!(layout.slots[0].rect.top, 40.0);
        for pair in layout.slots[..3].windows(2) {
            assert_eq!(pair[0].rect.bottom(), pair[1].rect.top);
        }
    }

    #[test]
    fn test_collapsed_group_is_header_only() {
        let mut tree = tree(10);
        let first = tree.children(GroupTree::ROOT)[0];
        tree.set_collapsed(first, true);
        let layout = GroupedRows::compute(&mut tree, &metrics());
        assert_eq!(tree.get(first).unwrap().rect.unwrap().height, 40.0);
        assert_eq!(layout.slots.len(), 5);
        assert!(!layout.leaf_slots.contains_key(&first));
        assert_eq!(layout.total_height, 40.0 + (40.0 + 5.0 * 32.0 + 20.0));
    }

    #[test]
    fn test_slot_at_y() {
        let mut tree = tree(4);
        let layout = GroupedRows::compute(&mut tree, &metrics());
        assert_eq!(layout.slot_at_y(0.0), None); // header of first group
        assert_eq!(layout.slot_at_y(41.0), Some(0));
        assert_eq!(layout.slot_at_y(40.0 + 32.0), Some(1));
    }
}
