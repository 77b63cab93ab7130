//! Bounded LIFO pools of detached render handles.

use std::collections::HashMap;

use super::handle::{PoolKey, RenderHandle};

/// Per-class stacks of detached handles with a fixed capacity.
///
/// Releasing into a full stack destroys the handle immediately. A capacity
/// of 0 disables pooling entirely.
pub struct ViewPool<H: RenderHandle> {
    stacks: HashMap<PoolKey, Vec<H>>,
    capacity: usize,
}

impl<H: RenderHandle> ViewPool<H> {
    pub fn new(capacity: usize) -> Self {
        Self {
            stacks: HashMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take the most recently released handle of `class`.
    pub fn acquire(&mut self, class: PoolKey) -> Option<H> {
        self.stacks.get_mut(&class).and_then(Vec::pop)
    }

    /// Return a detached handle. Returns false when the pool was full and
    /// the handle was destroyed instead.
    pub fn release(&mut self, class: PoolKey, handle: H) -> bool {
        let stack = self.stacks.entry(class).or_default();
        if stack.len() < self.capacity {
            stack.push(handle);
            true
        } else {
            handle.destroy();
            false
        }
    }

    /// Number of pooled handles of `class`.
    pub fn pooled(&self, class: PoolKey) -> usize {
        self.stacks.get(&class).map_or(0, Vec::len)
    }

    /// Number of pooled handles across all classes.
    pub fn len(&self) -> usize {
        self.stacks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy every pooled handle, returning how many were destroyed.
    pub fn clear(&mut self) -> usize {
        let mut destroyed = 0;
        for (_, stack) in self.stacks.drain() {
            for handle in stack {
                handle.destroy();
                destroyed += 1;
            }
        }
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::field::DataType;
    use crate::render::ViewContext;

    struct Counted(Rc<Cell<usize>>);

    impl RenderHandle for Counted {
        fn bind(&mut self, _context: &ViewContext) {}

        fn destroy(self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_lifo_per_class() {
        let destroyed = Rc::new(Cell::new(0));
        let mut pool = ViewPool::new(4);
        pool.release(PoolKey::Row, Counted(destroyed.clone()));
        pool.release(PoolKey::Cell(DataType::Text), Counted(destroyed.clone()));
        assert_eq!(pool.pooled(PoolKey::Row), 1);
        assert!(pool.acquire(PoolKey::Cell(DataType::Number)).is_none());
        assert!(pool.acquire(PoolKey::Cell(DataType::Text)).is_some());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_over_capacity_destroys_immediately() {
        let destroyed = Rc::new(Cell::new(0));
        let mut pool = ViewPool::new(2);
        for _ in 0..5 {
            pool.release(PoolKey::Group, Counted(destroyed.clone()));
        }
        assert_eq!(pool.pooled(PoolKey::Group), 2);
        assert_eq!(destroyed.get(), 3);
        assert_eq!(pool.clear(), 2);
        assert_eq!(destroyed.get(), 5);
    }
}
