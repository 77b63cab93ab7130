//! Data model shared by every grid component.

mod column;
mod grid;
mod row;
mod selection;

pub use column::*;
pub use grid::*;
pub use row::*;
pub use selection::*;
