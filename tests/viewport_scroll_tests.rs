//! Viewport, scroll and recycling tests
//!
//! Drives `GridView` the way a host frame loop would: feed input, advance
//! the clock, tick, update, and push the window through a recycler.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_precision_loss
)]

use vgrid::config::EventConfig;
use vgrid::render::{HandleFactory, PoolKey, RenderHandle, Recycler, ViewContext, ViewKey};
use vgrid::viewer::ScrollState;
use vgrid::{Column, ColumnId, Field, GridConfig, GridEvent, GridView, HitTarget, Row};

// ============================================================================
// Helpers
// ============================================================================

/// Five 200 px columns and `rows` 32 px rows in a 400x320 viewport.
fn grid(rows: u64, config: GridConfig) -> GridView {
    let columns = (0..5)
        .map(|c| {
            let field = if c % 2 == 0 {
                Field::text(format!("Text {c}"))
            } else {
                Field::number(format!("Number {c}"))
            };
            Column::new(format!("c{c}"), field).with_width(200.0)
        })
        .collect();
    let rows = (0..rows)
        .map(|i| {
            Row::new(i)
                .with("c0", format!("row {i}"))
                .with("c1", i as f64)
        })
        .collect();
    let mut view = GridView::with_data(config, columns, rows, 400.0, 320.0).unwrap();
    view.update();
    view
}

struct CountingHandle;

impl RenderHandle for CountingHandle {
    fn bind(&mut self, _context: &ViewContext) {}

    fn destroy(self) {}
}

#[derive(Default)]
struct CountingFactory {
    created: usize,
}

impl HandleFactory for CountingFactory {
    type Handle = CountingHandle;

    fn create(&mut self, _context: &ViewContext) -> vgrid::Result<CountingHandle> {
        self.created += 1;
        Ok(CountingHandle)
    }
}

/// Remembers the class it was created for and refuses any other.
struct TypedHandle {
    class: PoolKey,
}

impl RenderHandle for TypedHandle {
    fn bind(&mut self, context: &ViewContext) {
        assert_eq!(self.class, context.class, "handle bound across classes");
    }

    fn destroy(self) {}
}

struct TypedFactory;

impl HandleFactory for TypedFactory {
    type Handle = TypedHandle;

    fn create(&mut self, context: &ViewContext) -> vgrid::Result<TypedHandle> {
        Ok(TypedHandle {
            class: context.class,
        })
    }
}

// ============================================================================
// Scrolling
// ============================================================================

#[test]
fn test_wheel_scrolls_and_clamps() {
    let mut view = grid(100, GridConfig::default());
    let change = view.wheel(0.0, 500.0, false).unwrap();
    assert_eq!(change.y, 500.0);

    // 100 rows * 32 px - 320 px viewport
    let change = view.wheel(0.0, 1e6, false).unwrap();
    assert_eq!(change.y, 2880.0);
    assert!(view.wheel(0.0, 10.0, false).is_none());
    assert!(view.wheel(0.0, 0.0, false).is_none());
}

#[test]
fn test_shift_wheel_scrolls_horizontally() {
    let mut view = grid(100, GridConfig::default());
    let change = view.wheel(0.0, 120.0, true).unwrap();
    assert_eq!(change.x, 120.0);
    assert_eq!(change.y, 0.0);
}

#[test]
fn test_scroll_refreshes_window() {
    let mut view = grid(1_000, GridConfig::default());
    let before = view.update().rows.clone();
    view.scroll_to(0.0, 640.0);
    assert!(view.needs_update());
    let after = view.update().rows.clone();

    assert_ne!(before, after);
    // Visible rows 20..30 padded by four rows of overscan.
    assert_eq!(after.first(), Some(&16));
    assert_eq!(after.last(), Some(&33));
}

#[test]
fn test_touch_fling_decays_to_rest() {
    let mut view = grid(1_000, GridConfig::default());
    view.set_time(0.0);
    view.pointer_down(100.0, 300.0);
    view.set_time(16.0);
    view.pointer_move(100.0, 200.0);
    view.set_time(32.0);
    view.pointer_move(100.0, 100.0);
    assert_eq!(view.scroll().scroll_y(), 200.0);

    view.pointer_up(true);
    assert_eq!(view.scroll().state(), ScrollState::Momentum);

    let mut frames = 0;
    let mut last = view.scroll().scroll_y();
    while view.is_animating() && frames < 1_000 {
        view.tick();
        let y = view.scroll().scroll_y();
        assert!(y >= last, "momentum reversed at frame {frames}");
        last = y;
        frames += 1;
    }
    assert!(!view.is_animating());
    assert!(last > 200.0);
    assert!(frames < 1_000);
}

#[test]
fn test_mouse_drag_has_no_momentum() {
    let mut view = grid(1_000, GridConfig::default());
    view.set_time(0.0);
    view.pointer_down(100.0, 300.0);
    view.set_time(16.0);
    view.pointer_move(100.0, 100.0);
    view.pointer_up(false);
    assert_eq!(view.scroll().state(), ScrollState::Idle);
    assert!(view.tick().is_none());
}

// ============================================================================
// Hit testing and frozen columns
// ============================================================================

#[test]
fn test_hit_test_after_scroll() {
    let mut view = grid(100, GridConfig::default());
    view.scroll_to(0.0, 320.0);
    view.update();
    assert_eq!(view.hit_test(10.0, 5.0), HitTarget::Cell { row: 10, col: 0 });
    assert_eq!(view.hit_test(210.0, 40.0), HitTarget::Cell { row: 11, col: 1 });
}

#[test]
fn test_frozen_column_stays_put() {
    let mut view = grid(100, GridConfig::default());
    assert!(view.freeze_columns(1));
    view.update();
    view.scroll_to(150.0, 0.0);
    let window = view.update().clone();

    assert_eq!(window.columns.frozen, 0..1);
    let frozen_header = window
        .views
        .iter()
        .find(|v| v.key == ViewKey::Column { column: ColumnId::from("c0") })
        .unwrap();
    assert_eq!(frozen_header.screen_x, 0.0);

    assert_eq!(view.hit_test(50.0, 5.0), HitTarget::Cell { row: 0, col: 0 });
    // Past the frozen column, content x = 250 + 150.
    assert_eq!(view.hit_test(250.0, 5.0), HitTarget::Cell { row: 0, col: 2 });
}

#[test]
fn test_cells_use_field_pool_class() {
    let mut view = grid(10, GridConfig::default());
    let window = view.update();
    let classes: Vec<PoolKey> = window
        .views
        .iter()
        .filter(|v| matches!(v.key, ViewKey::Cell { .. }))
        .map(|v| v.class)
        .collect();
    assert!(classes.contains(&PoolKey::Cell(vgrid::DataType::Text)));
    assert!(classes.contains(&PoolKey::Cell(vgrid::DataType::Number)));
}

// ============================================================================
// Recycling
// ============================================================================

#[test]
fn test_recycler_reaches_steady_state() {
    let mut view = grid(5_000, GridConfig::default());
    let capacity = view.config().pool_capacity;
    let mut recycler = Recycler::new(CountingFactory::default(), capacity);

    let mut largest = 0;
    let mut warm = None;
    for frame in 0..200 {
        view.scroll_by(0.0, 37.0);
        view.render_into(&mut recycler);
        let visible = view.update().views.len();
        largest = largest.max(visible);

        assert_eq!(recycler.live_count(), visible);
        // Four classes in play: rows, columns, text cells, number cells.
        assert!(recycler.live_count() + recycler.pooled_count() <= largest + 4 * capacity);
        if frame == 5 {
            warm = Some(recycler.factory().created);
        }
    }
    assert_eq!(Some(recycler.factory().created), warm);
    assert!(recycler.stats().reused > 0);
}

#[test]
fn test_field_type_change_swaps_cell_handles() {
    let mut view = grid(20, GridConfig::default());
    let mut recycler = Recycler::new(TypedFactory, 40);
    view.render_into(&mut recycler);

    assert!(view.set_field(&ColumnId::from("c0"), Field::number("Now a number")));
    view.render_into(&mut recycler);

    let key = ViewKey::Cell {
        row: vgrid::RowId(0),
        column: ColumnId::from("c0"),
    };
    let handle = recycler.handle(&key).unwrap();
    assert_eq!(handle.class, PoolKey::Cell(vgrid::DataType::Number));
}

#[test]
fn test_recycler_clear_destroys_everything() {
    let mut view = grid(100, GridConfig::default());
    let mut recycler = Recycler::new(CountingFactory::default(), 8);
    view.render_into(&mut recycler);
    let live = recycler.live_count();
    assert!(live > 0);

    recycler.clear();
    assert_eq!(recycler.live_count(), 0);
    assert_eq!(recycler.pooled_count(), 0);
    assert_eq!(recycler.stats().destroyed, live);
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_events_wait_for_throttle_window() {
    let mut view = grid(10, GridConfig::default());
    view.flush_events();
    view.set_time(1_000.0);
    assert!(view.resize_column(&ColumnId::from("c1"), 260.0));
    view.set_time(1_100.0);
    assert!(view.resize_column(&ColumnId::from("c1"), 280.0));

    assert_eq!(view.event_deadline(), Some(1_250.0));
    assert!(view.poll_events(1_200.0).is_empty());
    let events = view.poll_events(1_250.0);
    assert_eq!(events.len(), 1);
    let GridEvent::ColumnResize(resizes) = &events[0] else {
        panic!("expected resize batch, got {events:?}");
    };
    assert_eq!(resizes.len(), 1);
    assert_eq!(resizes[0].width, 280.0);
    assert_eq!(view.event_deadline(), None);
}

#[test]
fn test_manual_flush_mode() {
    let config = GridConfig {
        events: EventConfig {
            auto_flush: false,
            ..EventConfig::default()
        },
        ..GridConfig::default()
    };
    let mut view = grid(10, config);
    view.flush_events();
    view.hide_columns(&[ColumnId::from("c4")]);

    assert_eq!(view.event_deadline(), None);
    assert!(view.poll_events(1e9).is_empty());
    let events = view.flush_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "columnHide");
}

#[test]
fn test_no_event_for_zero_scroll() {
    let mut view = grid(10, GridConfig::default());
    view.flush_events();
    assert!(view.scroll_by(0.0, 0.0).is_none());
    assert!(view.flush_events().is_empty());
}
