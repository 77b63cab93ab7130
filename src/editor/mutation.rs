//! Cell value mutations.
//!
//! Applies user edits, pastes and fills to the in-memory rows. Every write
//! goes through the target column's field: text is parsed with
//! `parse_from_text`, raw values of the same type are reused only when the
//! field accepts them.

use serde::Serialize;

use crate::error::Result;
use crate::field::{CellValue, DataType, Field};
use crate::types::{CellIndex, ColumnId, GridData, RowId};

/// A value as it will be written into a target field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Converted {
    Value(CellValue),
    /// Blank text: the cell is cleared.
    Clear,
    /// The text does not mean anything for the target field.
    Invalid,
}

impl Converted {
    pub(crate) fn into_value(self) -> Option<Option<CellValue>> {
        match self {
            Self::Value(v) => Some(Some(v)),
            Self::Clear => Some(None),
            Self::Invalid => None,
        }
    }
}

/// Convert a copied value for `target`.
///
/// A raw value whose source type matches the target is reused if the
/// target validates it; anything else goes through the target's
/// `parse_from_text` on the display text.
pub(crate) fn convert_for(
    target: &Field,
    text: &str,
    raw: Option<&CellValue>,
    source_type: Option<DataType>,
) -> Converted {
    if let (Some(raw), Some(source_type)) = (raw, source_type) {
        if source_type == target.data_type() && target.validate(Some(raw)).is_none() {
            return Converted::Value(raw.clone());
        }
    }
    if text.trim().is_empty() {
        return Converted::Clear;
    }
    target
        .parse_from_text(text)
        .map_or(Converted::Invalid, Converted::Value)
}

/// Interpret text typed into a cell editor.
///
/// Unparseable text is kept as text so validation can report it against
/// the field instead of silently dropping the input.
pub(crate) fn typed_value(field: &Field, text: &str) -> Option<CellValue> {
    if text.trim().is_empty() {
        return None;
    }
    Some(
        field
            .parse_from_text(text)
            .unwrap_or_else(|| CellValue::Text(text.to_string())),
    )
}

/// One cell whose value changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellChange {
    pub row: RowId,
    pub column: ColumnId,
    pub old: Option<CellValue>,
    pub new: Option<CellValue>,
}

/// Outcome of writing one cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Write {
    /// The field rejected the value; nothing was written.
    Rejected,
    /// The cell already held an equal value.
    Unchanged,
    Changed(CellChange),
}

impl Write {
    /// Whether the cell counts as affected in an operation summary.
    pub(crate) fn is_applied(&self) -> bool {
        !matches!(self, Self::Rejected)
    }

    pub(crate) fn into_change(self) -> Option<CellChange> {
        match self {
            Self::Changed(change) => Some(change),
            Self::Rejected | Self::Unchanged => None,
        }
    }
}

/// Validate and write `value` at a display position.
pub(crate) fn apply_value(
    data: &mut GridData,
    cell: CellIndex,
    value: Option<CellValue>,
) -> Result<Write> {
    let (Some(column), Some(row)) = (data.column_at(cell.col), data.row_at(cell.row)) else {
        return Ok(Write::Rejected);
    };
    if column.field.validate(value.as_ref()).is_some() {
        return Ok(Write::Rejected);
    }
    if column
        .field
        .compare_equals(row.get(&column.id), value.as_ref())
    {
        return Ok(Write::Unchanged);
    }
    let column_id = column.id.clone();
    let row_id = row.id;
    let old = data.set_value(cell, value.clone())?;
    Ok(Write::Changed(CellChange {
        row: row_id,
        column: column_id,
        old,
        new: value,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Column, Row};

    #[test]
    fn test_same_type_reuses_raw() {
        let target = Field::number("N");
        let raw = CellValue::Number(1234.5);
        let converted = convert_for(&target, "1,234.5 units", Some(&raw), Some(DataType::Number));
        assert_eq!(converted, Converted::Value(raw));
    }

    #[test]
    fn test_cross_type_parses_text() {
        let target = Field::number("N");
        let raw = CellValue::Text("42".into());
        assert_eq!(
            convert_for(&target, "42", Some(&raw), Some(DataType::Text)),
            Converted::Value(CellValue::Number(42.0))
        );
        assert_eq!(convert_for(&target, "abc", None, None), Converted::Invalid);
        assert_eq!(convert_for(&target, "  ", None, None), Converted::Clear);
    }

    #[test]
    fn test_apply_value_validates_first() {
        let mut data = GridData::new(
            vec![Row::new(1).with("n", 1.0)],
            vec![Column::new("n", Field::number("N").required(true))],
        );
        let cell = CellIndex::new(0, 0);
        assert_eq!(apply_value(&mut data, cell, None).unwrap(), Write::Rejected);
        assert_eq!(
            apply_value(&mut data, cell, Some(1.0.into())).unwrap(),
            Write::Unchanged
        );

        let change = apply_value(&mut data, cell, Some(2.0.into()))
            .unwrap()
            .into_change()
            .unwrap();
        assert_eq!(change.old, Some(CellValue::Number(1.0)));
        assert_eq!(data.value_at(cell), Some(&CellValue::Number(2.0)));
    }
}
