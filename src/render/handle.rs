//! Render handle contract.
//!
//! A render handle is an opaque view owned by the host (a DOM subtree, a
//! native widget, a test double). The engine only binds it to an item,
//! detaches it, and destroys it; drawing is the host's business.

use serde::Serialize;

use crate::error::Result;
use crate::field::DataType;
use crate::group::GroupId;
use crate::layout::Rect;
use crate::types::{ColumnId, RowId};

/// Identity of a live item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViewKey {
    Cell { row: RowId, column: ColumnId },
    Row { row: RowId },
    Column { column: ColumnId },
    Group { group: GroupId },
}

/// Pool class: handles are only reused within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "dataType", rename_all = "camelCase")]
pub enum PoolKey {
    /// One class per field data type, since each needs a different widget.
    Cell(DataType),
    Row,
    Column,
    Group,
}

/// Everything a handle needs to render one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewContext {
    pub key: ViewKey,
    pub class: PoolKey,
    /// Flat display index (row position, visible column position, or
    /// pre-order group position).
    pub index: usize,
    /// Content-space rectangle.
    pub rect: Rect,
    /// Screen-space origin after scroll and frozen-column adjustment.
    pub screen_x: f32,
    pub screen_y: f32,
}

/// A detachable view.
pub trait RenderHandle {
    /// Point the handle at a new item. Only called on attached handles
    /// freshly taken from the factory or the pool, or to update in place.
    fn bind(&mut self, context: &ViewContext);

    /// Detach from the visible surface before going to the pool.
    fn detach(&mut self) {}

    /// Release external resources. The handle is gone afterwards.
    fn destroy(self);
}

/// Creates handles when the pool for a class is empty.
pub trait HandleFactory {
    type Handle: RenderHandle;

    /// Create a handle for `context`. Fails with
    /// [`GridError::UnsupportedDataType`](crate::GridError::UnsupportedDataType)
    /// when no view exists for the class.
    fn create(&mut self, context: &ViewContext) -> Result<Self::Handle>;
}
