//! Outbound event batching.
//!
//! Actions are queued as typed events; consecutive events of the same kind
//! share one payload array. Cell edits are coalesced per row so repeated
//! edits to a row within one window reach the host as a single patch with
//! the latest values, but never across a paste, clear, fill or row change
//! queued after them, so replaying the batches in order ends in the grid's
//! state. The queue flushes on the throttle timer (auto-flush)
//! or on an explicit [`EventQueue::flush`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::EventConfig;
use crate::field::{CellValue, SortDirection};
use crate::group::CalculateOperator;
use crate::types::{ColumnId, RowId, SelectionRange};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowInsert {
    /// Display position of the new row.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowMove {
    pub row: RowId,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSelect {
    pub row: RowId,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowExpand {
    pub row: RowId,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCalculate {
    pub column: ColumnId,
    pub operator: Option<CalculateOperator>,
}

/// Sort or group-sort change on a column; `None` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDirection {
    pub column: ColumnId,
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMove {
    pub column: ColumnId,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnResize {
    pub column: ColumnId,
    pub width: f32,
}

/// Merged cell changes for one row. Later values win.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPatch {
    pub row: RowId,
    pub values: BTreeMap<ColumnId, Option<CellValue>>,
}

impl RowPatch {
    pub fn new(row: RowId) -> Self {
        Self {
            row,
            values: BTreeMap::new(),
        }
    }

    pub fn merge(&mut self, other: RowPatch) {
        self.values.extend(other.values);
    }
}

/// One outbound notification with its batched payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum GridEvent {
    RowAdd(Vec<RowInsert>),
    RowDelete(Vec<RowId>),
    RowExpand(Vec<RowExpand>),
    RowMove(Vec<RowMove>),
    RowSelect(Vec<RowSelect>),
    ColumnCalculate(Vec<ColumnCalculate>),
    ColumnGroup(Vec<ColumnDirection>),
    ColumnSort(Vec<ColumnDirection>),
    ColumnHide(Vec<ColumnId>),
    ColumnUnhide(Vec<ColumnId>),
    ColumnMove(Vec<ColumnMove>),
    ColumnResize(Vec<ColumnResize>),
    /// New frozen column count.
    ColumnFreeze(Vec<usize>),
    ColumnSelect(Vec<ColumnId>),
    CellEdit(Vec<RowPatch>),
    CellPaste(Vec<RowPatch>),
    CellClear(Vec<RowPatch>),
    CellFill(Vec<RowPatch>),
    CellSelect(Vec<SelectionRange>),
}

impl GridEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RowAdd(_) => "rowAdd",
            Self::RowDelete(_) => "rowDelete",
            Self::RowExpand(_) => "rowExpand",
            Self::RowMove(_) => "rowMove",
            Self::RowSelect(_) => "rowSelect",
            Self::ColumnCalculate(_) => "columnCalculate",
            Self::ColumnGroup(_) => "columnGroup",
            Self::ColumnSort(_) => "columnSort",
            Self::ColumnHide(_) => "columnHide",
            Self::ColumnUnhide(_) => "columnUnhide",
            Self::ColumnMove(_) => "columnMove",
            Self::ColumnResize(_) => "columnResize",
            Self::ColumnFreeze(_) => "columnFreeze",
            Self::ColumnSelect(_) => "columnSelect",
            Self::CellEdit(_) => "cellEdit",
            Self::CellPaste(_) => "cellPaste",
            Self::CellClear(_) => "cellClear",
            Self::CellFill(_) => "cellFill",
            Self::CellSelect(_) => "cellSelect",
        }
    }

    /// Whether replaying this event changes cell values or row membership.
    /// Cell edits never move across such an event.
    fn changes_data(&self) -> bool {
        matches!(
            self,
            Self::RowAdd(_)
                | Self::RowDelete(_)
                | Self::RowMove(_)
                | Self::CellEdit(_)
                | Self::CellPaste(_)
                | Self::CellClear(_)
                | Self::CellFill(_)
        )
    }

    /// Append `other`'s payload when both are the same kind; otherwise hand
    /// `other` back.
    fn absorb(&mut self, other: GridEvent) -> Option<GridEvent> {
        match (self, other) {
            (Self::RowAdd(a), Self::RowAdd(b)) => a.extend(b),
            (Self::RowDelete(a), Self::RowDelete(b)) => a.extend(b),
            (Self::RowExpand(a), Self::RowExpand(b)) => a.extend(b),
            (Self::RowMove(a), Self::RowMove(b)) => a.extend(b),
            (Self::RowSelect(a), Self::RowSelect(b)) => a.extend(b),
            (Self::ColumnCalculate(a), Self::ColumnCalculate(b)) => a.extend(b),
            (Self::ColumnGroup(a), Self::ColumnGroup(b)) => a.extend(b),
            (Self::ColumnSort(a), Self::ColumnSort(b)) => a.extend(b),
            (Self::ColumnHide(a), Self::ColumnHide(b)) => a.extend(b),
            (Self::ColumnUnhide(a), Self::ColumnUnhide(b)) => a.extend(b),
            (Self::ColumnMove(a), Self::ColumnMove(b)) => a.extend(b),
            (Self::ColumnResize(a), Self::ColumnResize(b)) => merge_resizes(a, b),
            (Self::ColumnFreeze(a), Self::ColumnFreeze(b)) => *a = b,
            (Self::ColumnSelect(a), Self::ColumnSelect(b)) => a.extend(b),
            (Self::CellEdit(a), Self::CellEdit(b))
            | (Self::CellPaste(a), Self::CellPaste(b))
            | (Self::CellClear(a), Self::CellClear(b))
            | (Self::CellFill(a), Self::CellFill(b)) => merge_patches(a, b),
            (Self::CellSelect(a), Self::CellSelect(b)) => *a = b,
            (_, other) => return Some(other),
        }
        None
    }
}

/// A drag-resize emits many widths; only the last per column matters.
fn merge_resizes(into: &mut Vec<ColumnResize>, from: Vec<ColumnResize>) {
    for resize in from {
        match into.iter_mut().find(|r| r.column == resize.column) {
            Some(existing) => existing.width = resize.width,
            None => into.push(resize),
        }
    }
}

fn merge_patches(into: &mut Vec<RowPatch>, from: Vec<RowPatch>) {
    for patch in from {
        match into.iter_mut().find(|p| p.row == patch.row) {
            Some(existing) => existing.merge(patch),
            None => into.push(patch),
        }
    }
}

/// Coalescing outbound queue.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    config: EventConfig,
    pending: Vec<GridEvent>,
    /// Timestamp (ms) of the oldest unflushed event.
    since: Option<f64>,
}

impl EventQueue {
    pub fn new(config: EventConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            since: None,
        }
    }

    pub fn set_config(&mut self, config: EventConfig) {
        self.config = config;
    }

    /// Queue an event observed at `now` (ms). Cell edits merge into the
    /// latest queued edit batch unless a data-changing event was queued after
    /// it; other kinds merge only with the latest event.
    pub fn push(&mut self, event: GridEvent, now: f64) {
        self.since.get_or_insert(now);
        let event = match event {
            GridEvent::CellEdit(patches) => {
                let target = self
                    .pending
                    .iter_mut()
                    .rev()
                    .find(|e| matches!(e, GridEvent::CellEdit(_)) || e.changes_data());
                match target {
                    Some(GridEvent::CellEdit(existing)) => {
                        merge_patches(existing, patches);
                        return;
                    }
                    _ => GridEvent::CellEdit(patches),
                }
            }
            other => other,
        };
        let leftover = match self.pending.last_mut() {
            Some(last) => last.absorb(event),
            None => Some(event),
        };
        if let Some(event) = leftover {
            self.pending.push(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// When the throttle window of the oldest pending event closes, or
    /// `None` if nothing is pending or auto-flush is off.
    pub fn deadline(&self) -> Option<f64> {
        if !self.config.auto_flush {
            return None;
        }
        self.since.map(|t| t + self.config.throttle_ms)
    }

    /// Timer hook: flushes if auto-flush is on and the window has elapsed.
    pub fn poll(&mut self, now: f64) -> Vec<GridEvent> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.flush(),
            _ => Vec::new(),
        }
    }

    /// Drain everything queued, in order.
    pub fn flush(&mut self) -> Vec<GridEvent> {
        self.since = None;
        let events = std::mem::take(&mut self.pending);
        if !events.is_empty() {
            tracing::debug!(
                batches = events.len(),
                kinds = ?events.iter().map(GridEvent::name).collect::<Vec<_>>(),
                "flushing grid events"
            );
        }
        events
    }
}
