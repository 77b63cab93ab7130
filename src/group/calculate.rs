//! Column aggregates ("calculate by").

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::field::{format_number, is_blank, CellValue, DataType, Field};

/// Glyph shown for infinite or undefined results.
pub const INFINITY_GLYPH: &str = "∞";

/// Aggregate operator attached to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculateOperator {
    CountEmpty,
    CountFilled,
    CountUnique,
    PercentEmpty,
    PercentFilled,
    PercentUnique,
    Sum,
    Average,
    Median,
    Min,
    Max,
    Range,
}

impl CalculateOperator {
    /// Whether the operator produces a result for a field type.
    pub fn supports(self, data_type: DataType) -> bool {
        match self {
            Self::CountEmpty
            | Self::CountFilled
            | Self::CountUnique
            | Self::PercentEmpty
            | Self::PercentFilled
            | Self::PercentUnique => true,
            Self::Sum | Self::Average | Self::Median => data_type == DataType::Number,
            Self::Min | Self::Max | Self::Range => {
                matches!(data_type, DataType::Number | DataType::Date)
            }
        }
    }
}

/// Result of an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CalculatedValue {
    Count(usize),
    /// Percentage in `0..=100`, unrounded.
    Percent(f64),
    Number(f64),
    Date(NaiveDateTime),
    /// Length of a date range in days.
    Days(f64),
}

impl CalculatedValue {
    /// Host-facing text: percentages rounded, non-finite results as `∞`.
    pub fn display(&self) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::Percent(p) if p.is_finite() => format!("{}%", format_number(p.round())),
            Self::Number(n) | Self::Days(n) if n.is_finite() => {
                format_number((n * 100.0).round() / 100.0)
            }
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Percent(_) | Self::Number(_) | Self::Days(_) => INFINITY_GLYPH.to_string(),
        }
    }
}

impl fmt::Display for CalculatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Compute `operator` over `values` of a column bound to `field`.
///
/// Returns `None` when the operator does not apply to the field's type.
pub fn calculate_by(
    values: &[Option<&CellValue>],
    operator: CalculateOperator,
    field: &Field,
) -> Option<CalculatedValue> {
    if !operator.supports(field.data_type()) {
        return None;
    }
    let total = values.len();
    let filled: Vec<&CellValue> = values
        .iter()
        .copied()
        .filter(|v| !is_blank(*v))
        .flatten()
        .collect();
    let empty = total - filled.len();

    let result = match operator {
        CalculateOperator::CountEmpty => CalculatedValue::Count(empty),
        CalculateOperator::CountFilled => CalculatedValue::Count(filled.len()),
        CalculateOperator::CountUnique => CalculatedValue::Count(count_unique(&filled, field)),
        CalculateOperator::PercentEmpty => CalculatedValue::Percent(percent(empty, total)),
        CalculateOperator::PercentFilled => {
            CalculatedValue::Percent(percent(filled.len(), total))
        }
        CalculateOperator::PercentUnique => {
            CalculatedValue::Percent(percent(count_unique(&filled, field), total))
        }
        CalculateOperator::Sum
        | CalculateOperator::Average
        | CalculateOperator::Median => {
            let numbers: Vec<f64> = filled.iter().filter_map(|v| v.as_number()).collect();
            CalculatedValue::Number(numeric(operator, numbers))
        }
        CalculateOperator::Min | CalculateOperator::Max | CalculateOperator::Range => {
            if field.is_date() {
                return date_extent(operator, &filled);
            }
            let numbers: Vec<f64> = filled.iter().filter_map(|v| v.as_number()).collect();
            CalculatedValue::Number(numeric(operator, numbers))
        }
    };
    Some(result)
}

fn count_unique(filled: &[&CellValue], field: &Field) -> usize {
    filled
        .iter()
        .map(|v| field.group_key(Some(v)))
        .collect::<HashSet<_>>()
        .len()
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, total: usize) -> f64 {
    part as f64 / total as f64 * 100.0
}

#[allow(clippy::cast_precision_loss)]
fn numeric(operator: CalculateOperator, mut numbers: Vec<f64>) -> f64 {
    let count = numbers.len() as f64;
    let sum: f64 = numbers.iter().sum();
    match operator {
        CalculateOperator::Sum => sum,
        CalculateOperator::Average => sum / count,
        CalculateOperator::Median => {
            numbers.sort_by(f64::total_cmp);
            let mid = numbers.len() / 2;
            if numbers.is_empty() {
                f64::NAN
            } else if numbers.len() % 2 == 0 {
                let lo = numbers.get(mid - 1).copied().unwrap_or(f64::NAN);
                let hi = numbers.get(mid).copied().unwrap_or(f64::NAN);
                (lo + hi) / 2.0
            } else {
                numbers.get(mid).copied().unwrap_or(f64::NAN)
            }
        }
        CalculateOperator::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        CalculateOperator::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        CalculateOperator::Range => {
            let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
            let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            max - min
        }
        _ => f64::NAN,
    }
}

#[allow(clippy::cast_precision_loss)]
fn date_extent(operator: CalculateOperator, filled: &[&CellValue]) -> Option<CalculatedValue> {
    let dates: Vec<NaiveDateTime> = filled.iter().filter_map(|v| v.as_date()).collect();
    let min = dates.iter().min().copied();
    let max = dates.iter().max().copied();
    match operator {
        CalculateOperator::Min => Some(min.map_or(
            CalculatedValue::Number(f64::INFINITY),
            CalculatedValue::Date,
        )),
        CalculateOperator::Max => Some(max.map_or(
            CalculatedValue::Number(f64::NEG_INFINITY),
            CalculatedValue::Date,
        )),
        CalculateOperator::Range => {
            let days = match (min, max) {
                (Some(min), Some(max)) => (max - min).num_seconds() as f64 / 86_400.0,
                _ => f64::NAN,
            };
            Some(CalculatedValue::Days(days))
        }
        _ => None,
    }
}
