//! Browser bindings for [`GridView`].
//!
//! `VGrid` owns the grid behind `Rc<RefCell<_>>` so the animation-frame and
//! flush-timer closures can reach it. Views are created by a host object
//! passed to [`VGrid::set_render_host`]:
//!
//! ```javascript
//! grid.set_render_host({
//!   create(ctx) { return document.createElement('div'); },
//!   bind(view, ctx) { view.style.transform = `translate(${ctx.screenX}px, ${ctx.screenY}px)`; },
//!   detach(view) { view.remove(); },
//!   destroy(view) {},
//! });
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Function, Reflect};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::frame::{AnimationFrames, FrameScheduler};
use super::{GridEvent, GridView};
use crate::config::GridConfig;
use crate::editor::ExcludeFilter;
use crate::error::GridError;
use crate::field::SortDirection;
use crate::group::{CalculateOperator, GroupId};
use crate::render::{HandleFactory, RenderHandle, Recycler, ViewContext};
use crate::types::{CellIndex, Column, ColumnId, Direction, Row, RowId, SelectionRange};

fn now_ms() -> f64 {
    if let Some(window) = web_sys::window() {
        if let Some(perf) = window.performance() {
            return perf.now();
        }
    }
    js_sys::Date::now()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

// ============================================================================
// Render host
// ============================================================================

struct HostCallbacks {
    create: Function,
    bind: Function,
    detach: Option<Function>,
    destroy: Option<Function>,
}

impl HostCallbacks {
    fn from_object(host: &JsValue) -> Result<Self, JsValue> {
        let method = |name: &str| -> Option<Function> {
            Reflect::get(host, &JsValue::from_str(name))
                .ok()
                .and_then(|f| f.dyn_into::<Function>().ok())
        };
        Ok(Self {
            create: method("create")
                .ok_or_else(|| JsValue::from_str("render host needs a create(ctx) method"))?,
            bind: method("bind")
                .ok_or_else(|| JsValue::from_str("render host needs a bind(view, ctx) method"))?,
            detach: method("detach"),
            destroy: method("destroy"),
        })
    }
}

/// A host-created view.
pub struct JsHandle {
    view: JsValue,
    host: Rc<HostCallbacks>,
}

impl RenderHandle for JsHandle {
    fn bind(&mut self, context: &ViewContext) {
        if let Ok(ctx) = serde_wasm_bindgen::to_value(context) {
            let _ = self.host.bind.call2(&JsValue::NULL, &self.view, &ctx);
        }
    }

    fn detach(&mut self) {
        if let Some(detach) = &self.host.detach {
            let _ = detach.call1(&JsValue::NULL, &self.view);
        }
    }

    fn destroy(self) {
        if let Some(destroy) = &self.host.destroy {
            let _ = destroy.call1(&JsValue::NULL, &self.view);
        }
    }
}

pub struct JsHandleFactory {
    host: Rc<HostCallbacks>,
}

impl HandleFactory for JsHandleFactory {
    type Handle = JsHandle;

    fn create(&mut self, context: &ViewContext) -> crate::error::Result<JsHandle> {
        let unsupported = || GridError::UnsupportedDataType(format!("{:?}", context.class));
        let ctx = serde_wasm_bindgen::to_value(context).map_err(|_| unsupported())?;
        let view = self
            .host
            .create
            .call1(&JsValue::NULL, &ctx)
            .map_err(|_| unsupported())?;
        if view.is_undefined() || view.is_null() {
            return Err(unsupported());
        }
        Ok(JsHandle {
            view,
            host: Rc::clone(&self.host),
        })
    }
}

// ============================================================================
// Shared state
// ============================================================================

struct SharedState {
    view: GridView,
    recycler: Option<Recycler<JsHandleFactory>>,
    scheduler: Option<FrameScheduler<AnimationFrames>>,
    render_callback: Option<Function>,
    event_callback: Option<Function>,
    flush_timer: Option<i32>,
    flush_closure: Option<Closure<dyn FnMut()>>,
}

impl SharedState {
    fn invalidate(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.invalidate();
        }
    }

    fn reschedule(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.reschedule();
        }
    }

    /// Arm the flush timer for the oldest queued event.
    #[allow(clippy::cast_possible_truncation)]
    fn arm_flush_timer(&mut self) {
        if self.flush_timer.is_some() {
            return;
        }
        let (Some(deadline), Some(closure), Some(window)) = (
            self.view.event_deadline(),
            self.flush_closure.as_ref(),
            web_sys::window(),
        ) else {
            return;
        };
        let delay = (deadline - now_ms()).max(0.0).ceil() as i32;
        self.flush_timer = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay,
            )
            .ok();
    }
}

fn dispatch(callback: Option<Function>, events: Vec<GridEvent>) {
    let Some(callback) = callback else {
        return;
    };
    for event in events {
        let payload = match serde_wasm_bindgen::to_value(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, event = event.name(), "event not serializable");
                continue;
            }
        };
        let _ = callback.call2(&JsValue::NULL, &JsValue::from_str(event.name()), &payload);
    }
}

fn invoke_render_callback(callback: Option<Function>) {
    if let Some(callback) = callback {
        let _ = callback.call0(&JsValue::NULL);
    }
}

fn run_frame(state: &Rc<RefCell<SharedState>>) {
    let (render, events, callback) = {
        let mut guard = state.borrow_mut();
        let s = &mut *guard;
        let dirty = s.scheduler.as_mut().map_or(true, FrameScheduler::begin_frame);
        let now = now_ms();
        s.view.set_time(now);
        let moved = s.view.tick().is_some();
        let mut rendered = false;
        if dirty || moved || s.view.needs_update() {
            match s.recycler.as_mut() {
                Some(recycler) => {
                    let diff = s.view.render_into(recycler);
                    rendered = !diff.is_empty() || moved || dirty;
                }
                None => {
                    s.view.update();
                    rendered = true;
                }
            }
        }
        if s.view.is_animating() {
            if let Some(scheduler) = s.scheduler.as_mut() {
                scheduler.keep_alive();
            }
        }
        let events = s.view.poll_events(now);
        s.arm_flush_timer();
        (
            rendered.then(|| s.render_callback.clone()).flatten(),
            events,
            s.event_callback.clone(),
        )
    };
    invoke_render_callback(render);
    dispatch(callback, events);
}

fn run_flush_timer(state: &Rc<RefCell<SharedState>>) {
    let (events, callback) = {
        let mut s = state.borrow_mut();
        s.flush_timer = None;
        let events = s.view.poll_events(now_ms());
        s.arm_flush_timer();
        (events, s.event_callback.clone())
    };
    dispatch(callback, events);
}

// ============================================================================
// WASM32 Implementation
// ============================================================================

/// The grid exported to JavaScript.
#[wasm_bindgen]
pub struct VGrid {
    state: Rc<RefCell<SharedState>>,
}

impl VGrid {
    /// Run `f` against the grid, then schedule a frame and flush timer.
    fn with<T>(&self, f: impl FnOnce(&mut GridView) -> T) -> T {
        let mut s = self.state.borrow_mut();
        s.view.set_time(now_ms());
        let out = f(&mut s.view);
        s.invalidate();
        s.arm_flush_timer();
        out
    }

    /// Like [`with`](Self::with) for high-frequency input: an unrun frame
    /// request is replaced.
    fn with_input<T>(&self, f: impl FnOnce(&mut GridView) -> T) -> T {
        let mut s = self.state.borrow_mut();
        s.view.set_time(now_ms());
        let out = f(&mut s.view);
        s.reschedule();
        s.arm_flush_timer();
        out
    }
}

#[wasm_bindgen]
impl VGrid {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, width: f32, height: f32) -> Result<VGrid, JsValue> {
        console_error_panic_hook::set_once();

        let config: GridConfig = if config.is_undefined() || config.is_null() {
            GridConfig::default()
        } else {
            from_js(config)?
        };
        let view = GridView::new(config, width, height)?;
        let state = Rc::new(RefCell::new(SharedState {
            view,
            recycler: None,
            scheduler: None,
            render_callback: None,
            event_callback: None,
            flush_timer: None,
            flush_closure: None,
        }));

        let weak: Weak<RefCell<SharedState>> = Rc::downgrade(&state);
        let frame = Closure::wrap(Box::new(move |_timestamp: f64| {
            if let Some(state) = weak.upgrade() {
                run_frame(&state);
            }
        }) as Box<dyn FnMut(f64)>);
        let weak: Weak<RefCell<SharedState>> = Rc::downgrade(&state);
        let flush = Closure::wrap(Box::new(move || {
            if let Some(state) = weak.upgrade() {
                run_flush_timer(&state);
            }
        }) as Box<dyn FnMut()>);
        {
            let mut s = state.borrow_mut();
            s.scheduler = Some(FrameScheduler::new(AnimationFrames::new(frame)));
            s.flush_closure = Some(flush);
            s.invalidate();
        }
        Ok(VGrid { state })
    }

    /// Install the view factory. Existing views are released.
    pub fn set_render_host(&mut self, host: JsValue) -> Result<(), JsValue> {
        let callbacks = Rc::new(HostCallbacks::from_object(&host)?);
        let mut s = self.state.borrow_mut();
        if let Some(mut old) = s.recycler.take() {
            old.clear();
        }
        let capacity = s.view.config().pool_capacity;
        s.recycler = Some(Recycler::new(
            JsHandleFactory { host: callbacks },
            capacity,
        ));
        s.invalidate();
        Ok(())
    }

    /// Called after every frame that changed the live views.
    pub fn set_render_callback(&mut self, callback: Option<Function>) {
        self.state.borrow_mut().render_callback = callback;
    }

    /// Called as `callback(name, payload)` for every flushed event.
    pub fn set_event_callback(&mut self, callback: Option<Function>) {
        self.state.borrow_mut().event_callback = callback;
    }

    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: GridConfig = from_js(config)?;
        self.with(|v| v.set_config(config))?;
        Ok(())
    }

    pub fn set_columns(&mut self, columns: JsValue) -> Result<(), JsValue> {
        let columns: Vec<Column> = from_js(columns)?;
        self.with(|v| v.set_columns(columns));
        Ok(())
    }

    pub fn set_rows(&mut self, rows: JsValue) -> Result<(), JsValue> {
        let rows: Vec<Row> = from_js(rows)?;
        self.with(|v| v.set_rows(rows));
        Ok(())
    }

    pub fn append_rows(&mut self, rows: JsValue) -> Result<(), JsValue> {
        let rows: Vec<Row> = from_js(rows)?;
        self.with(|v| v.append_rows(rows));
        Ok(())
    }

    pub fn remove_rows(&mut self, ids: Vec<u64>) -> usize {
        let ids: Vec<RowId> = ids.into_iter().map(RowId).collect();
        self.with(|v| v.remove_rows(&ids))
    }

    /// Current window (columns, rows, groups, views) as a JS object.
    pub fn window(&mut self) -> Result<JsValue, JsValue> {
        let mut s = self.state.borrow_mut();
        to_js(s.view.update())
    }

    pub fn content_width(&self) -> f32 {
        self.state.borrow().view.scroll().content_size().0
    }

    pub fn content_height(&self) -> f32 {
        self.state.borrow().view.scroll().content_size().1
    }

    // ---- Scrolling ----

    pub fn resize(&mut self, width: f32, height: f32) {
        self.with(|v| v.resize(width, height));
    }

    pub fn on_wheel(&mut self, delta_x: f32, delta_y: f32, shift: bool) -> bool {
        self.with_input(|v| v.wheel(delta_x, delta_y, shift).is_some())
    }

    pub fn on_pointer_down(&mut self, x: f32, y: f32) {
        self.with_input(|v| v.pointer_down(x, y));
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) -> bool {
        self.with_input(|v| v.pointer_move(x, y).is_some())
    }

    pub fn on_pointer_up(&mut self, touch: bool) {
        self.with(|v| {
            v.pointer_up(touch);
            v.stop_auto_scroll();
        });
    }

    pub fn auto_scroll(&mut self, x: f32, y: f32) {
        self.with(|v| v.auto_scroll(x, y));
    }

    pub fn scroll_to(&mut self, x: f32, y: f32) {
        self.with(|v| v.scroll_to(x, y));
    }

    pub fn scroll_x(&self) -> f32 {
        self.state.borrow().view.scroll().scroll_x()
    }

    pub fn scroll_y(&self) -> f32 {
        self.state.borrow().view.scroll().scroll_y()
    }

    pub fn hit_test(&self, x: f32, y: f32) -> Result<JsValue, JsValue> {
        let s = self.state.borrow();
        to_js(&s.view.hit_test(x, y))
    }

    // ---- Selection and editing ----

    pub fn select_cells(
        &mut self,
        start_row: usize,
        start_col: usize,
        end_row: usize,
        end_col: usize,
        extend: bool,
    ) -> Result<JsValue, JsValue> {
        let range = self.with(|v| {
            v.select_cells(
                CellIndex::new(start_row, start_col),
                CellIndex::new(end_row, end_col),
                extend,
            )
        })?;
        to_js(&range)
    }

    /// `direction` is one of `up`, `down`, `left`, `right`.
    pub fn move_selection(&mut self, direction: &str, extend: bool) -> Result<JsValue, JsValue> {
        let direction: Direction = from_js(JsValue::from_str(direction))?;
        let range = self.with(|v| {
            if extend {
                v.extend_selection(direction)
            } else {
                v.move_selection(direction)
            }
        })?;
        to_js(&range)
    }

    pub fn select_all(&mut self) -> Result<JsValue, JsValue> {
        let range = self.with(GridView::select_all)?;
        to_js(&range)
    }

    /// Copy the selection to the system clipboard and return the summary.
    pub fn copy(&mut self, filter: u8) -> Result<JsValue, JsValue> {
        let copied = self.with(|v| v.copy(ExcludeFilter::from_bits(filter)));
        if let Some((text, _)) = &copied {
            write_system_clipboard(text);
        }
        to_js(&copied.map(|(_, summary)| summary))
    }

    pub fn cut(&mut self, filter: u8) -> Result<JsValue, JsValue> {
        let cut = self.with(|v| v.cut(ExcludeFilter::from_bits(filter)))?;
        if let Some((text, _)) = &cut {
            write_system_clipboard(text);
        }
        to_js(&cut.map(|(_, summary)| summary))
    }

    pub fn paste(&mut self, text: &str, filter: u8) -> Result<JsValue, JsValue> {
        let summary = self.with(|v| v.paste_text(text, ExcludeFilter::from_bits(filter)))?;
        to_js(&summary)
    }

    pub fn clear(&mut self, filter: u8) -> Result<JsValue, JsValue> {
        let summary = self.with(|v| v.clear(ExcludeFilter::from_bits(filter)))?;
        to_js(&summary)
    }

    /// Fill from the current selection to the cells between two corners.
    pub fn fill(
        &mut self,
        end_row: usize,
        end_col: usize,
        reverse: bool,
        filter: u8,
    ) -> Result<JsValue, JsValue> {
        let summary = self.with(|v| {
            let Some(source) = v.selection().copied() else {
                return Ok(None);
            };
            let target = SelectionRange::cell_range(
                if reverse { source.start } else { source.end },
                CellIndex::new(end_row, end_col),
            );
            v.fill(&source, &target, reverse, ExcludeFilter::from_bits(filter))
                .map(Some)
        })?;
        to_js(&summary)
    }

    pub fn begin_edit(&mut self, row: usize, col: usize) -> Result<bool, JsValue> {
        Ok(self.with(|v| v.begin_edit(CellIndex::new(row, col)))?)
    }

    /// Returns validation errors for the typed text, or `null`.
    pub fn input(&mut self, text: &str) -> Result<JsValue, JsValue> {
        let errors = self.with(|v| v.input(text))?;
        to_js(&errors)
    }

    /// Value to draw in a cell, including an uncommitted edit.
    pub fn display_value(&self, row: usize, col: usize) -> Result<JsValue, JsValue> {
        let s = self.state.borrow();
        to_js(&s.view.display_value(CellIndex::new(row, col)))
    }

    pub fn commit_edit(&mut self) -> Result<bool, JsValue> {
        Ok(self.with(GridView::commit_edit)?)
    }

    pub fn cancel_edit(&mut self) -> Result<(), JsValue> {
        Ok(self.with(GridView::cancel_edit)?)
    }

    // ---- Columns, rows, groups ----

    pub fn resize_column(&mut self, column: &str, width: f32) -> bool {
        self.with(|v| v.resize_column(&ColumnId::from(column), width))
    }

    pub fn move_column(&mut self, column: &str, to: usize) -> bool {
        self.with(|v| v.move_column(&ColumnId::from(column), to))
    }

    pub fn hide_column(&mut self, column: &str, hidden: bool) -> bool {
        let ids = [ColumnId::from(column)];
        self.with(|v| {
            if hidden {
                v.hide_columns(&ids)
            } else {
                v.unhide_columns(&ids)
            }
        })
    }

    pub fn freeze_columns(&mut self, count: usize) -> bool {
        self.with(|v| v.freeze_columns(count))
    }

    /// `direction` is `asc`, `desc`, or `null` to clear.
    pub fn sort_column(&mut self, column: &str, direction: JsValue) -> Result<bool, JsValue> {
        let direction: Option<SortDirection> = from_js(direction)?;
        Ok(self.with(|v| v.sort_column(&ColumnId::from(column), direction)))
    }

    pub fn group_column(&mut self, column: &str, direction: JsValue) -> Result<bool, JsValue> {
        let direction: Option<SortDirection> = from_js(direction)?;
        Ok(self.with(|v| v.group_column(&ColumnId::from(column), direction)))
    }

    pub fn calculate_column(&mut self, column: &str, operator: JsValue) -> Result<bool, JsValue> {
        let operator: Option<CalculateOperator> = from_js(operator)?;
        Ok(self.with(|v| v.calculate_column(&ColumnId::from(column), operator)))
    }

    pub fn select_columns(&mut self, start: usize, end: usize) -> Result<JsValue, JsValue> {
        let range = self.with(|v| v.select_columns(start, end))?;
        to_js(&range)
    }

    pub fn add_row(&mut self, index: usize) -> bool {
        self.with(|v| v.add_row(index))
    }

    pub fn delete_rows(&mut self, ids: Vec<u64>) -> Vec<u64> {
        let ids: Vec<RowId> = ids.into_iter().map(RowId).collect();
        self.with(|v| v.delete_rows(&ids))
            .into_iter()
            .map(|id| id.0)
            .collect()
    }

    pub fn move_row(&mut self, id: u64, to: usize) -> bool {
        self.with(|v| v.move_row(RowId(id), to))
    }

    pub fn select_rows(&mut self, ids: Vec<u64>, selected: bool) -> usize {
        let ids: Vec<RowId> = ids.into_iter().map(RowId).collect();
        self.with(|v| v.select_rows(&ids, selected))
    }

    pub fn expand_row(&mut self, id: u64, expanded: bool) -> bool {
        self.with(|v| v.expand_row(RowId(id), expanded))
    }

    pub fn toggle_group(&mut self, group: usize) -> bool {
        self.with(|v| v.toggle_group(GroupId(group)))
    }

    pub fn collapse_all(&mut self) {
        self.with(GridView::collapse_all);
    }

    pub fn expand_all(&mut self) {
        self.with(GridView::expand_all);
    }

    /// Deliver every queued event now.
    pub fn flush_events(&mut self) {
        let (events, callback) = {
            let mut s = self.state.borrow_mut();
            if let (Some(timer), Some(window)) = (s.flush_timer.take(), web_sys::window()) {
                window.clear_timeout_with_handle(timer);
            }
            (s.view.flush_events(), s.event_callback.clone())
        };
        dispatch(callback, events);
    }
}

impl Drop for VGrid {
    fn drop(&mut self) {
        if let Ok(mut s) = self.state.try_borrow_mut() {
            if let Some(scheduler) = s.scheduler.as_mut() {
                scheduler.cancel();
            }
            if let (Some(timer), Some(window)) = (s.flush_timer.take(), web_sys::window()) {
                window.clear_timeout_with_handle(timer);
            }
            if let Some(recycler) = s.recycler.as_mut() {
                recycler.clear();
            }
        }
    }
}

fn write_system_clipboard(text: &str) {
    if let Some(window) = web_sys::window() {
        let clipboard = window.navigator().clipboard();
        let _ = clipboard.write_text(text);
    }
}
