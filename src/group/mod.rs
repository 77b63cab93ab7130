//! Grouping, sorting and aggregation pipeline.
//!
//! Rows are first sorted by the sort columns, then partitioned into a
//! [`GroupTree`] by the grouping columns, then every group's aggregates are
//! computed from its own rows.

mod calculate;
mod sort;
mod tree;

pub use calculate::{calculate_by, CalculateOperator, CalculatedValue, INFINITY_GLYPH};
pub use sort::{compare_rows, sort_by, SortKey};
pub use tree::{Group, GroupId, GroupLevel, GroupTree};
