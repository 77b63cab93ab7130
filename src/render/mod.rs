//! View recycling for virtual scrolling.
//!
//! This module provides:
//! - The render handle contract implemented by the host's view system
//! - Bounded per-class pools of detached handles
//! - The recycler that diffs culled items against live handles

pub mod handle;
pub mod pool;
pub mod recycler;

pub use handle::{HandleFactory, PoolKey, RenderHandle, ViewContext, ViewKey};
pub use pool::ViewPool;
pub use recycler::{RecycleDiff, Recycler, RecyclerStats};
