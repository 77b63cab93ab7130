//! View recycling.
//!
//! The recycler owns every live handle, keyed by item identity. Each frame
//! the viewer hands it the culled item list; the recycler diffs it against
//! the live set, moves handles of departed items into the pool, and binds
//! arriving items to pooled handles before creating new ones.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::handle::{HandleFactory, RenderHandle, ViewContext, ViewKey};
use super::pool::ViewPool;

struct Live<H> {
    handle: H,
    context: ViewContext,
}

/// Running totals, mostly for tests and debugging overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecyclerStats {
    pub created: usize,
    pub reused: usize,
    pub destroyed: usize,
    pub failed: usize,
}

/// Outcome of one [`Recycler::apply`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecycleDiff {
    pub added: usize,
    pub removed: usize,
    pub moved: usize,
}

impl RecycleDiff {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.moved == 0
    }
}

pub struct Recycler<F: HandleFactory> {
    factory: F,
    pool: ViewPool<F::Handle>,
    live: HashMap<ViewKey, Live<F::Handle>>,
    stats: RecyclerStats,
}

impl<F: HandleFactory> Recycler<F> {
    pub fn new(factory: F, pool_capacity: usize) -> Self {
        Self {
            factory,
            pool: ViewPool::new(pool_capacity),
            live: HashMap::new(),
            stats: RecyclerStats::default(),
        }
    }

    /// Bring the live set in line with `visible`.
    ///
    /// Removals run first so their handles are available to this frame's
    /// additions. Items present before and after are rebound in place when
    /// their context changed, without touching the pool, unless their class
    /// changed; then the old handle is released to its own class.
    pub fn apply(&mut self, visible: Vec<ViewContext>) -> RecycleDiff {
        let mut diff = RecycleDiff::default();
        let wanted: HashSet<&ViewKey> = visible.iter().map(|c| &c.key).collect();

        let departed: Vec<ViewKey> = self
            .live
            .keys()
            .filter(|k| !wanted.contains(k))
            .cloned()
            .collect();
        for key in departed {
            if let Some(Live {
                mut handle,
                context,
            }) = self.live.remove(&key)
            {
                handle.detach();
                if !self.pool.release(context.class, handle) {
                    self.stats.destroyed += 1;
                }
                diff.removed += 1;
            }
        }

        for context in visible {
            if let Some(live) = self.live.get_mut(&context.key) {
                if live.context.class == context.class {
                    if live.context != context {
                        live.handle.bind(&context);
                        live.context = context;
                        diff.moved += 1;
                    }
                    continue;
                }
            }
            // Same item, new class: its handle goes back to its own pool.
            if let Some(Live {
                mut handle,
                context: old,
            }) = self.live.remove(&context.key)
            {
                handle.detach();
                if !self.pool.release(old.class, handle) {
                    self.stats.destroyed += 1;
                }
                diff.removed += 1;
            }
            let handle = match self.pool.acquire(context.class) {
                Some(handle) => {
                    self.stats.reused += 1;
                    Some(handle)
                }
                None => match self.factory.create(&context) {
                    Ok(handle) => {
                        self.stats.created += 1;
                        Some(handle)
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, key = ?context.key, "view creation failed");
                        self.stats.failed += 1;
                        None
                    }
                },
            };
            if let Some(mut handle) = handle {
                handle.bind(&context);
                self.live.insert(context.key.clone(), Live { handle, context });
                diff.added += 1;
            }
        }

        if !diff.is_empty() {
            tracing::trace!(
                added = diff.added,
                removed = diff.removed,
                moved = diff.moved,
                live = self.live.len(),
                pooled = self.pool.len(),
                "recycled views"
            );
        }
        diff
    }

    /// Detach every live handle into the pool (e.g. before a full rebuild).
    pub fn release_all(&mut self) -> usize {
        let count = self.live.len();
        for (_, Live { mut handle, context }) in self.live.drain() {
            handle.detach();
            if !self.pool.release(context.class, handle) {
                self.stats.destroyed += 1;
            }
        }
        count
    }

    /// Destroy everything, live and pooled.
    pub fn clear(&mut self) {
        for (_, live) in self.live.drain() {
            live.handle.destroy();
            self.stats.destroyed += 1;
        }
        self.stats.destroyed += self.pool.clear();
        tracing::debug!(destroyed = self.stats.destroyed, "recycler cleared");
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }

    pub fn stats(&self) -> RecyclerStats {
        self.stats
    }

    pub fn context(&self, key: &ViewKey) -> Option<&ViewContext> {
        self.live.get(key).map(|l| &l.context)
    }

    pub fn handle(&self, key: &ViewKey) -> Option<&F::Handle> {
        self.live.get(key).map(|l| &l.handle)
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use crate::error::{GridError, Result};
    use crate::field::DataType;
    use crate::layout::Rect;
    use crate::render::PoolKey;
    use crate::types::RowId;

    #[derive(Debug)]
    struct TestHandle {
        serial: usize,
        class: PoolKey,
        bound: Option<ViewKey>,
        binds: usize,
    }

    impl RenderHandle for TestHandle {
        fn bind(&mut self, context: &ViewContext) {
            assert_eq!(self.class, context.class, "handle bound across classes");
            self.bound = Some(context.key.clone());
            self.binds += 1;
        }

        fn detach(&mut self) {
            self.bound = None;
        }

        fn destroy(self) {}
    }

    #[derive(Default)]
    struct TestFactory {
        next: usize,
    }

    impl HandleFactory for TestFactory {
        type Handle = TestHandle;

        fn create(&mut self, context: &ViewContext) -> Result<TestHandle> {
            if context.class == PoolKey::Cell(DataType::Date) {
                return Err(GridError::UnsupportedDataType("date".into()));
            }
            self.next += 1;
            Ok(TestHandle {
                serial: self.next,
                class: context.class,
                bound: None,
                binds: 0,
            })
        }
    }

    fn rows(range: std::ops::Range<u64>) -> Vec<ViewContext> {
        range
            .map(|i| ViewContext {
                key: ViewKey::Row { row: RowId(i) },
                class: PoolKey::Row,
                index: i as usize,
                rect: Rect::new(0.0, i as f32 * 32.0, 100.0, 32.0),
                screen_x: 0.0,
                screen_y: i as f32 * 32.0,
            })
            .collect()
    }

    #[test]
    fn test_scrolling_reuses_handles() {
        let mut recycler = Recycler::new(TestFactory::default(), 40);
        let diff = recycler.apply(rows(0..20));
        assert_eq!(diff.added, 20);
        assert_eq!(recycler.stats().created, 20);

        let diff = recycler.apply(rows(5..25));
        assert_eq!(diff.removed, 5);
        assert_eq!(diff.added, 5);
        assert_eq!(recycler.stats().created, 20);
        assert_eq!(recycler.stats().reused, 5);
        assert_eq!(recycler.live_count(), 20);
        assert_eq!(recycler.pooled_count(), 0);
    }

    #[test]
    fn test_moved_items_rebind_in_place() {
        let mut recycler = Recycler::new(TestFactory::default(), 40);
        recycler.apply(rows(0..3));
        let key = ViewKey::Row { row: RowId(1) };
        let serial = recycler.handle(&key).unwrap().serial;

        let mut shifted = rows(0..3);
        for context in &mut shifted {
            context.screen_y -= 10.0;
        }
        let diff = recycler.apply(shifted);
        assert_eq!(diff.moved, 3);
        assert_eq!(diff.added + diff.removed, 0);
        let handle = recycler.handle(&key).unwrap();
        assert_eq!(handle.serial, serial);
        assert_eq!(handle.binds, 2);
        assert_eq!(handle.bound, Some(key));
    }

    #[test]
    fn test_live_plus_pool_bounded() {
        let capacity = 8;
        let mut recycler = Recycler::new(TestFactory::default(), capacity);
        recycler.apply(rows(0..50));
        recycler.apply(rows(0..10));
        assert_eq!(recycler.live_count(), 10);
        assert_eq!(recycler.pooled_count(), capacity);
        assert_eq!(recycler.stats().destroyed, 50 - 10 - capacity);

        for start in 0..30 {
            recycler.apply(rows(start..start + 10));
            assert!(recycler.live_count() + recycler.pooled_count() <= 10 + capacity);
        }
        assert_eq!(recycler.stats().created, 50);
    }

    #[test]
    fn test_factory_failure_skips_item() {
        let mut recycler = Recycler::new(TestFactory::default(), 4);
        let mut items = rows(0..2);
        items[1].class = PoolKey::Cell(DataType::Date);
        let diff = recycler.apply(items);
        assert_eq!(diff.added, 1);
        assert_eq!(recycler.stats().failed, 1);
    }

    #[test]
    fn test_class_change_swaps_handle() {
        let mut recycler = Recycler::new(TestFactory::default(), 4);
        let mut items = rows(0..2);
        for item in &mut items {
            item.class = PoolKey::Cell(DataType::Text);
        }
        recycler.apply(items.clone());
        let key = items[0].key.clone();
        let text_serial = recycler.handle(&key).unwrap().serial;

        items[0].class = PoolKey::Cell(DataType::Number);
        let diff = recycler.apply(items.clone());
        assert_eq!(diff.removed, 1);
        assert_eq!(diff.added, 1);
        let handle = recycler.handle(&key).unwrap();
        assert_eq!(handle.class, PoolKey::Cell(DataType::Number));
        assert_ne!(handle.serial, text_serial);
        assert_eq!(recycler.pool.pooled(PoolKey::Cell(DataType::Text)), 1);
        assert_eq!(recycler.pool.pooled(PoolKey::Cell(DataType::Number)), 0);

        // The pooled text handle serves the next text item.
        items[0].class = PoolKey::Cell(DataType::Text);
        recycler.apply(items);
        assert_eq!(recycler.handle(&key).unwrap().serial, text_serial);
    }
}
