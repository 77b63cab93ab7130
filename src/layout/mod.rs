//! Layout engine for computing cell positions and viewport management.
//!
//! This module handles:
//! - Pre-computing column, row and group rectangles from sizes and nesting
//! - Managing viewport state (scroll position, visible size)
//! - Binary search culling of the items inside the viewport

mod cull;
mod grid_layout;
mod viewport;

pub use cull::{
    cull_columns, cull_groups, cull_rows, find_inside_viewport, group_header_at, ColumnWindow,
    GroupHit, GroupWindow,
};
pub use grid_layout::{
    layout_columns, layout_group, layout_rows, row_rect, ColumnLayout, GroupMetrics, GroupedRows,
    Rect, RowSlot,
};
pub use viewport::Viewport;
