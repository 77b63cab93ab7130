//! Value ordering shared by row sorting and group ordering.

use std::cmp::Ordering;

use super::value::{is_blank, CellValue};

/// Sort direction for a column or a group level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Compare two optional values in ascending order.
///
/// Blank values (missing, empty string, empty list) sort before everything
/// else. Lists compare element-wise; on a shared prefix the shorter list
/// comes first. Values of different kinds fall back to a fixed kind rank so
/// the comparator stays total.
pub fn compare_values(a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
    match (is_blank(a), is_blank(b)) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    let (Some(a), Some(b)) = (a, b) else {
        return Ordering::Equal;
    };
    compare_present(a, b)
}

fn compare_present(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.total_cmp(y),
        (CellValue::Boolean(x), CellValue::Boolean(y)) => x.cmp(y),
        (CellValue::Date(x), CellValue::Date(y)) => x.cmp(y),
        (CellValue::Text(x), CellValue::Text(y)) => compare_text(x, y),
        (CellValue::List(x), CellValue::List(y)) => compare_lists(x, y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    let folded = a.to_lowercase().cmp(&b.to_lowercase());
    folded.then_with(|| a.cmp(b))
}

fn compare_lists(a: &[String], b: &[String]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = compare_text(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn kind_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Boolean(_) => 0,
        CellValue::Number(_) => 1,
        CellValue::Date(_) => 2,
        CellValue::Text(_) => 3,
        CellValue::List(_) => 4,
    }
}
