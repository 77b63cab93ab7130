use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ColumnId;
use crate::field::CellValue;

/// Stable row identity supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A data row. Owned by the host; the grid only reorders and filters
/// references to rows, it never drops one on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,
    #[serde(default)]
    pub data: HashMap<ColumnId, CellValue>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_true")]
    pub deletable: bool,
}

fn default_true() -> bool {
    true
}

impl Row {
    pub fn new(id: u64) -> Self {
        Self {
            id: RowId(id),
            data: HashMap::new(),
            selected: false,
            deletable: true,
        }
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<ColumnId>, value: impl Into<CellValue>) -> Self {
        self.data.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &ColumnId) -> Option<&CellValue> {
        self.data.get(column)
    }

    /// Replace a value, returning the previous one. `None` clears the cell.
    pub fn set(&mut self, column: &ColumnId, value: Option<CellValue>) -> Option<CellValue> {
        match value {
            Some(v) => self.data.insert(column.clone(), v),
            None => self.data.remove(column),
        }
    }
}
