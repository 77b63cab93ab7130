//! Raw cell values.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A raw value stored in a row under a column id.
///
/// Missing values are modelled as `Option<CellValue>::None` by callers; an
/// empty string or empty list is treated as empty everywhere emptiness
/// matters (required checks, sorting, count-empty aggregates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Boolean(bool),
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
    List(Vec<String>),
}

impl CellValue {
    /// Whether this value counts as blank.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::Boolean(_) | Self::Date(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// `true` when the optional value is missing or blank.
pub fn is_blank(value: Option<&CellValue>) -> bool {
    value.map_or(true, CellValue::is_empty)
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        Self::Date(d)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blankness() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&CellValue::from("  "))));
        assert!(is_blank(Some(&CellValue::List(vec![]))));
        assert!(!is_blank(Some(&CellValue::from(0.0))));
        assert!(!is_blank(Some(&CellValue::from(false))));
    }

    #[test]
    fn test_untagged_json() {
        let values: Vec<CellValue> =
            serde_json::from_str(r#"[true, 3.5, "abc", ["a", "b"]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                CellValue::Boolean(true),
                CellValue::Number(3.5),
                CellValue::Text("abc".into()),
                CellValue::List(vec!["a".into(), "b".into()]),
            ]
        );
    }
}
