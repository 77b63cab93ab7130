//! The live window: which items are on screen and where.

use serde::Serialize;

use super::GridView;
use crate::group::{GroupId, GroupTree};
use crate::layout::{cull_columns, cull_groups, cull_rows, group_header_at, row_rect, ColumnWindow, GroupHit, Rect};
use crate::render::{PoolKey, ViewContext, ViewKey};
use crate::types::CellIndex;

/// Result of one culling pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportWindow {
    pub columns: ColumnWindow,
    /// Displayed rows on screen, as display positions.
    pub rows: Vec<usize>,
    pub groups: Vec<GroupHit>,
    /// One context per live item: column headers, rows, group headers and
    /// cells, in that order.
    pub views: Vec<ViewContext>,
}

/// What lies under a screen point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HitTarget {
    Cell { row: usize, col: usize },
    GroupHeader { group: GroupId },
    /// Inside the content but past the last row or column.
    Empty,
}

struct PlacedRow {
    display: usize,
    rect: Rect,
}

impl GridView {
    pub(crate) fn build_window(&self) -> ViewportWindow {
        let viewport = self.scroll.viewport();
        let (start, end) = viewport.visible_y();
        let columns = cull_columns(&self.columns, viewport);
        let width = self.columns.total_width();

        let (placed, groups) = match &self.grouped {
            Some(grouped) => {
                let window = cull_groups(&self.tree, grouped, start, end, self.config.overscan);
                let placed = grouped
                    .slots
                    .get(window.rows.clone())
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(|slot| {
                        let id = self.data.rows.get(slot.row)?.id;
                        Some(PlacedRow {
                            display: self.display_index.get(&id).copied()?,
                            rect: slot.rect,
                        })
                    })
                    .collect::<Vec<_>>();
                (placed, window.groups)
            }
            None => {
                let range = cull_rows(
                    self.data.display_row_count(),
                    self.row_height(),
                    start,
                    end,
                    self.config.overscan,
                );
                let placed = range
                    .map(|display| PlacedRow {
                        display,
                        rect: row_rect(display, self.row_height(), 0.0, width),
                    })
                    .collect();
                (placed, Vec::new())
            }
        };

        let mut views = Vec::with_capacity((placed.len() + 1) * (columns.len() + 1) + groups.len());
        for col in columns.iter() {
            let (Some(column), Some(rect)) = (self.data.column_at(col), self.columns.rect(col)) else {
                continue;
            };
            let (screen_x, _) = viewport.to_screen(rect.left, 0.0, col < self.columns.frozen);
            views.push(ViewContext {
                key: ViewKey::Column {
                    column: column.id.clone(),
                },
                class: PoolKey::Column,
                index: col,
                rect,
                screen_x,
                screen_y: 0.0,
            });
        }
        for row in &placed {
            let Some(data_row) = self.data.row_at(row.display) else {
                continue;
            };
            let (screen_x, screen_y) = viewport.to_screen(row.rect.left, row.rect.top, false);
            views.push(ViewContext {
                key: ViewKey::Row { row: data_row.id },
                class: PoolKey::Row,
                index: row.display,
                rect: row.rect,
                screen_x,
                screen_y,
            });
        }
        for hit in &groups {
            let Some(rect) = self.tree.get(hit.group).and_then(|g| g.rect) else {
                continue;
            };
            let (screen_x, screen_y) = viewport.to_screen(rect.left, rect.top, false);
            views.push(ViewContext {
                key: ViewKey::Group { group: hit.group },
                class: PoolKey::Group,
                index: hit.group.0,
                rect,
                screen_x,
                screen_y,
            });
        }
        for row in &placed {
            let Some(data_row) = self.data.row_at(row.display) else {
                continue;
            };
            for col in columns.iter() {
                let (Some(column), Some(col_rect)) = (self.data.column_at(col), self.columns.rect(col))
                else {
                    continue;
                };
                let rect = Rect::new(col_rect.left, row.rect.top, col_rect.width, row.rect.height);
                let (screen_x, screen_y) =
                    viewport.to_screen(rect.left, rect.top, col < self.columns.frozen);
                views.push(ViewContext {
                    key: ViewKey::Cell {
                        row: data_row.id,
                        column: column.id.clone(),
                    },
                    class: PoolKey::Cell(column.field.data_type()),
                    index: row.display,
                    rect,
                    screen_x,
                    screen_y,
                });
            }
        }

        let window = ViewportWindow {
            columns,
            rows: placed.iter().map(|r| r.display).collect(),
            groups,
            views,
        };
        tracing::trace!(
            rows = window.rows.len(),
            columns = window.columns.len(),
            groups = window.groups.len(),
            views = window.views.len(),
            "viewport culled"
        );
        window
    }

    /// What is under a screen point.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn hit_test(&self, screen_x: f32, screen_y: f32) -> HitTarget {
        let viewport = self.scroll.viewport();
        let (x, y) = viewport.to_content(screen_x, screen_y, self.columns.frozen_width());

        if let Some(grouped) = &self.grouped {
            if let Some(group) = group_header_at(&self.tree, y, self.config.group.header_height) {
                return HitTarget::GroupHeader { group };
            }
            let Some(col) = self.columns.col_at_x(x) else {
                return HitTarget::Empty;
            };
            return grouped
                .slot_at_y(y)
                .and_then(|slot| grouped.slots.get(slot))
                .and_then(|slot| self.data.rows.get(slot.row))
                .and_then(|row| self.display_index.get(&row.id))
                .map_or(HitTarget::Empty, |&row| HitTarget::Cell { row, col });
        }

        let Some(col) = self.columns.col_at_x(x) else {
            return HitTarget::Empty;
        };
        let height = self.row_height();
        if y < 0.0 || height <= 0.0 {
            return HitTarget::Empty;
        }
        let row = (y / height).floor() as usize;
        if row < self.data.display_row_count() {
            HitTarget::Cell { row, col }
        } else {
            HitTarget::Empty
        }
    }

    /// Content rectangle of a displayed cell, if it is laid out (rows of
    /// collapsed groups are not).
    pub fn cell_rect(&self, cell: CellIndex) -> Option<Rect> {
        let col = self.columns.rect(cell.col)?;
        let row = match &self.grouped {
            Some(grouped) => {
                let id = self.data.row_at(cell.row)?.id;
                let storage = self.data.find_row(id)?;
                grouped.slots.iter().find(|s| s.row == storage)?.rect
            }
            None if cell.row < self.data.display_row_count() => {
                row_rect(cell.row, self.row_height(), 0.0, self.columns.total_width())
            }
            None => return None,
        };
        Some(Rect::new(col.left, row.top, col.width, row.height))
    }

    /// The group tree, root first.
    pub fn tree(&self) -> &GroupTree {
        &self.tree
    }
}
