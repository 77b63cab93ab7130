//! Multi-key row sorting.

use std::cmp::Ordering;

use crate::field::{compare_values, SortDirection};
use crate::types::{ColumnId, Row};

/// One sort key: a column and its direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: ColumnId,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column: impl Into<ColumnId>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

/// Compare two rows by a cascade of sort keys; the first key that tells the
/// rows apart decides.
pub fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = key
            .direction
            .apply(compare_values(a.get(&key.column), b.get(&key.column)));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Stable-sort `order` (indexes into `rows`) by `keys`. Rows that compare
/// equal on every key keep their relative order.
pub fn sort_by(rows: &[Row], order: &mut [usize], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    order.sort_by(|&a, &b| match (rows.get(a), rows.get(b)) {
        (Some(ra), Some(rb)) => compare_rows(ra, rb, keys),
        _ => a.cmp(&b),
    });
}
