//! The single pending-edit slot.
//!
//! At most one cell is being edited at a time. A new edit can only be
//! acquired after the current one was resolved by flush or revert.

use serde::Serialize;

use crate::error::{GridError, Result};
use crate::field::{CellValue, ValidationErrors};
use crate::types::{ColumnId, RowId};

/// An in-flight modification to one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEdit {
    pub row: RowId,
    pub column: ColumnId,
    /// Value before the edit started; restored on revert.
    pub original: Option<CellValue>,
    /// Value typed so far.
    pub value: Option<CellValue>,
    /// Errors of the last validation, kept until corrected.
    pub errors: Option<ValidationErrors>,
}

impl PendingEdit {
    pub fn new(row: RowId, column: ColumnId, original: Option<CellValue>) -> Self {
        Self {
            row,
            column,
            value: original.clone(),
            original,
            errors: None,
        }
    }

    pub fn is_for(&self, row: RowId, column: &ColumnId) -> bool {
        self.row == row && &self.column == column
    }
}

#[derive(Debug, Clone, Default)]
pub struct PendingSlot {
    slot: Option<PendingEdit>,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupy the slot. Re-acquiring the cell already held is a no-op.
    pub fn acquire(&mut self, edit: PendingEdit) -> Result<()> {
        match &self.slot {
            Some(current) if current.is_for(edit.row, &edit.column) => Ok(()),
            Some(_) => Err(GridError::EditInProgress),
            None => {
                self.slot = Some(edit);
                Ok(())
            }
        }
    }

    pub fn get(&self) -> Option<&PendingEdit> {
        self.slot.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut PendingEdit> {
        self.slot.as_mut()
    }

    /// Release the slot, handing back the edit for commit or revert.
    pub fn release(&mut self) -> Result<PendingEdit> {
        self.slot.take().ok_or(GridError::NoPendingEdit)
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot() {
        let mut slot = PendingSlot::new();
        slot.acquire(PendingEdit::new(RowId(1), "a".into(), None)).unwrap();
        slot.acquire(PendingEdit::new(RowId(1), "a".into(), None)).unwrap();
        let err = slot
            .acquire(PendingEdit::new(RowId(2), "a".into(), None))
            .unwrap_err();
        assert!(matches!(err, GridError::EditInProgress));

        let edit = slot.release().unwrap();
        assert_eq!(edit.row, RowId(1));
        assert!(matches!(slot.release(), Err(GridError::NoPendingEdit)));
        slot.acquire(PendingEdit::new(RowId(2), "a".into(), None)).unwrap();
    }
}
