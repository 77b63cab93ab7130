//! Viewport culling.
//!
//! Every query runs over rectangles that are already laid out and sorted
//! along the queried axis, so each one is a pair of binary searches plus
//! the items it returns.

use std::ops::Range;

use serde::Serialize;

use super::grid_layout::{ColumnLayout, GroupedRows, Rect};
use super::viewport::Viewport;
use crate::group::{GroupId, GroupTree};

/// Index range of the `items` whose `[lo, hi)` extent intersects
/// `[start, end)`. Items must be sorted and non-overlapping.
pub fn find_inside_viewport<T>(
    items: &[T],
    start: f32,
    end: f32,
    lo: impl Fn(&T) -> f32,
    hi: impl Fn(&T) -> f32,
) -> Range<usize> {
    let first = items.partition_point(|item| hi(item) <= start);
    let last = items.partition_point(|item| lo(item) < end);
    first..last.max(first)
}

/// Visible columns, split into the pinned prefix and the scrolled window.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ColumnWindow {
    pub frozen: Range<usize>,
    pub scrollable: Range<usize>,
}

impl ColumnWindow {
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.frozen.clone().chain(self.scrollable.clone())
    }

    pub fn len(&self) -> usize {
        self.frozen.len() + self.scrollable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Columns intersecting the viewport. Frozen columns are always included.
pub fn cull_columns(layout: &ColumnLayout, viewport: &Viewport) -> ColumnWindow {
    let frozen = layout.frozen.min(layout.len());
    let (start, end) = viewport.visible_x(layout.frozen_width());
    let tail = layout.rects.get(frozen..).unwrap_or(&[]);
    let found = find_inside_viewport(tail, start, end, |r| r.left, Rect::right);
    ColumnWindow {
        frozen: 0..frozen,
        scrollable: found.start + frozen..found.end + frozen,
    }
}

/// Ungrouped rows intersecting `[start, end)`, padded by `overscan` rows on
/// both sides. Pure index arithmetic on the fixed row height.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn cull_rows(
    count: usize,
    row_height: f32,
    start: f32,
    end: f32,
    overscan: usize,
) -> Range<usize> {
    if count == 0 || row_height <= 0.0 || end <= start {
        return 0..0;
    }
    let first = (start.max(0.0) / row_height).floor() as usize;
    let last = (end.max(0.0) / row_height).ceil() as usize;
    let first = first.saturating_sub(overscan).min(count);
    let last = last.saturating_add(overscan).min(count);
    first..last.max(first)
}

/// A group returned by the culler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupHit {
    pub group: GroupId,
    /// The group spans the whole viewport; only leaves are reported this way.
    pub covering: bool,
}

/// Visible part of a grouped grid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GroupWindow {
    /// Visible groups in display order, parents before children.
    pub groups: Vec<GroupHit>,
    /// Range into [`GroupedRows::slots`].
    pub rows: Range<usize>,
}

/// Groups and row slots intersecting `[start, end)`.
///
/// A group that partially overlaps the range is returned (its header may be
/// on screen) and, when expanded, searched for visible children. A group
/// covering the whole range is only returned if it is a leaf; inner covering
/// groups are descended into instead.
pub fn cull_groups(
    tree: &GroupTree,
    rows: &GroupedRows,
    start: f32,
    end: f32,
    overscan: usize,
) -> GroupWindow {
    let mut groups = Vec::new();
    if end > start {
        visit(tree, GroupTree::ROOT, start, end, &mut groups);
    }
    let found = find_inside_viewport(&rows.slots, start, end, |s| s.rect.top, |s| s.rect.bottom());
    let rows = if found.is_empty() {
        found
    } else {
        found.start.saturating_sub(overscan)..found.end.saturating_add(overscan).min(rows.slots.len())
    };
    GroupWindow { groups, rows }
}

fn visit(tree: &GroupTree, id: GroupId, start: f32, end: f32, out: &mut Vec<GroupHit>) {
    let children = tree.children(id);
    let rect_of = |g: &GroupId| tree.get(*g).and_then(|g| g.rect).unwrap_or_default();
    let found = find_inside_viewport(
        children,
        start,
        end,
        |g| rect_of(g).top,
        |g| rect_of(g).bottom(),
    );
    for child in children.get(found).unwrap_or(&[]) {
        let Some(group) = tree.get(*child) else {
            continue;
        };
        let rect = group.rect.unwrap_or_default();
        if rect.covers_y(start, end) {
            if group.is_leaf() {
                out.push(GroupHit {
                    group: *child,
                    covering: true,
                });
            } else if !group.collapsed {
                visit(tree, *child, start, end, out);
            }
            continue;
        }
        out.push(GroupHit {
            group: *child,
            covering: false,
        });
        if !group.collapsed {
            visit(tree, *child, start, end, out);
        }
    }
}

/// Innermost group whose header contains `y`.
pub fn group_header_at(tree: &GroupTree, y: f32, header_height: f32) -> Option<GroupId> {
    let mut id = GroupTree::ROOT;
    loop {
        let children = tree.children(id);
        let rect_of = |g: &GroupId| tree.get(*g).and_then(|g| g.rect).unwrap_or_default();
        let idx = children.partition_point(|g| rect_of(g).bottom() <= y);
        let child = *children.get(idx)?;
        let rect = rect_of(&child);
        if rect.top > y {
            return None;
        }
        if y < rect.top + header_height {
            return Some(child);
        }
        if tree.get(child).is_some_and(|g| g.collapsed) {
            return None;
        }
        id = child;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
mod tests {
    use super::*;
    use crate::field::{Field, SortDirection};
    use crate::group::GroupLevel;
    use crate::layout::GroupMetrics;
    use crate::types::{Column, Row};

    fn metrics() -> GroupMetrics {
        GroupMetrics {
            row_height: 32.0,
            header_height: 40.0,
            spacing: 20.0,
            indent: 0.0,
            extra_height: 0.0,
            left: 0.0,
            width: 400.0,
        }
    }

    fn grouped(count: u64, buckets: u64) -> (GroupTree, GroupedRows) {
        let rows: Vec<Row> = (0..count)
            .map(|i| Row::new(i).with("bucket", (i % buckets) as f64))
            .collect();
        let column = Column::new("bucket", Field::number("Bucket"));
        let order: Vec<usize> = (0..rows.len()).collect();
        let mut tree = GroupTree::build(
            &rows,
            &order,
            &[GroupLevel {
                column: &column,
                direction: SortDirection::Asc,
            }],
        );
        let layout = GroupedRows::compute(&mut tree, &metrics());
        (tree, layout)
    }

    #[test]
    fn test_find_inside_viewport() {
        let rects: Vec<Rect> = (0..10)
            .map(|i| Rect::new(0.0, i as f32 * 10.0, 10.0, 10.0))
            .collect();
        let found = find_inside_viewport(&rects, 15.0, 35.0, |r| r.top, Rect::bottom);
        assert_eq!(found, 1..4);
        let all = find_inside_viewport(&rects, -100.0, 1_000.0, |r| r.top, Rect::bottom);
        assert_eq!(all, 0..10);
        let none = find_inside_viewport(&rects, 200.0, 300.0, |r| r.top, Rect::bottom);
        assert!(none.is_empty());
    }

    #[test]
    fn test_cull_rows_with_overscan() {
        assert_eq!(cull_rows(1_000, 32.0, 320.0, 640.0, 0), 10..20);
        assert_eq!(cull_rows(1_000, 32.0, 320.0, 640.0, 4), 6..24);
        assert_eq!(cull_rows(15, 32.0, 320.0, 640.0, 4), 6..15);
        assert_eq!(cull_rows(0, 32.0, 0.0, 640.0, 4), 0..0);
    }

    #[test]
    fn test_cull_columns_keeps_frozen() {
        let layout = ColumnLayout::compute(&[100.0; 20], 2, 0.0);
        let mut viewport = Viewport::new(500.0, 300.0);
        viewport.scroll_x = 1_000.0;
        let window = cull_columns(&layout, &viewport);
        assert_eq!(window.frozen, 0..2);
        // scrollable window covers content x in [1200, 1500)
        assert_eq!(window.scrollable, 12..15);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![0, 1, 12, 13, 14]);
    }

    #[test]
    fn test_cull_groups_subset_of_full() {
        let (tree, layout) = grouped(200, 5);
        let full = cull_groups(&tree, &layout, 0.0, layout.total_height, 0);
        assert_eq!(full.rows, 0..layout.slots.len());
        assert_eq!(full.groups.len(), 5);

        let part = cull_groups(&tree, &layout, 500.0, 900.0, 0);
        assert!(!part.rows.is_empty());
        assert!(part.rows.start >= full.rows.start && part.rows.end <= full.rows.end);
        for hit in &part.groups {
            assert!(full.groups.iter().any(|g| g.group == hit.group));
        }
    }

    #[test]
    fn test_covering_leaf_is_reported() {
        let (tree, layout) = grouped(100, 2);
        let first = tree.children(GroupTree::ROOT)[0];
        let rect = tree.get(first).unwrap().rect.unwrap();
        let window = cull_groups(&tree, &layout, rect.top + 100.0, rect.top + 300.0, 0);
        assert_eq!(
            window.groups,
            vec![GroupHit {
                group: first,
                covering: true
            }]
        );
    }

    #[test]
    fn test_group_header_hit() {
        let (tree, _) = grouped(10, 2);
        let children = tree.children(GroupTree::ROOT).to_vec();
        assert_eq!(group_header_at(&tree, 10.0, 40.0), Some(children[0]));
        assert_eq!(group_header_at(&tree, 60.0, 40.0), None);
        let second = tree.get(children[1]).unwrap().rect.unwrap();
        assert_eq!(
            group_header_at(&tree, second.top + 1.0, 40.0),
            Some(children[1])
        );
    }
}
