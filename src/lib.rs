//! vgrid - virtual-scrolling data grid core
//!
//! Everything a large spreadsheet-style grid needs short of drawing pixels:
//! - Typed fields with parsing, formatting, validation and comparison
//! - Column and row layout, with frozen columns and nested group sections
//! - Viewport culling and view recycling for 100k+ rows
//! - Scrolling with momentum, edge auto-scroll and scrollbar thumbs
//! - Selection, clipboard (TSV), paste and fill-series over cell matrices
//! - Multi-column sort, grouping and per-group aggregates
//! - Throttled, merged change events
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { VGrid } from 'vgrid';
//! await init();
//! const grid = new VGrid({ row: { size: 'M' } }, el.clientWidth, el.clientHeight);
//! grid.set_render_host(host);
//! grid.set_columns(columns);
//! grid.set_rows(rows);
//! grid.set_event_callback((name, payload) => console.log(name, payload));
//! el.addEventListener('wheel', (e) => grid.on_wheel(e.deltaX, e.deltaY, e.shiftKey));
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod field;
pub mod group;
pub mod layout;
pub mod render;
pub mod types;
pub mod viewer;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub use config::GridConfig;
pub use error::{GridError, Result};
pub use field::{CellValue, DataType, Field, SortDirection};
pub use group::{CalculateOperator, GroupId, GroupTree};
pub use viewer::{GridEvent, GridView, HitTarget, ViewportWindow};

pub use types::*;

#[cfg(target_arch = "wasm32")]
pub use viewer::bindings::VGrid;

/// Get the library version
#[must_use]
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
