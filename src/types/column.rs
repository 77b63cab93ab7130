use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{Field, SortDirection};
use crate::group::CalculateOperator;

/// Stable column identity; also the key into [`Row::data`](super::Row).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub String);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ColumnId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Default column width in pixels when none is given.
pub const DEFAULT_COLUMN_WIDTH: f32 = 180.0;

fn default_width() -> f32 {
    DEFAULT_COLUMN_WIDTH
}

fn default_true() -> bool {
    true
}

/// A grid column bound to a [`Field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    #[serde(default = "default_width")]
    pub width: f32,
    pub field: Field,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_sort: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculate: Option<CalculateOperator>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_true")]
    pub editable: bool,
}

impl Column {
    pub fn new(id: impl Into<ColumnId>, field: Field) -> Self {
        Self {
            id: id.into(),
            width: DEFAULT_COLUMN_WIDTH,
            field,
            sort: None,
            group_sort: None,
            calculate: None,
            hidden: false,
            editable: true,
        }
    }

    #[must_use]
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }
}
