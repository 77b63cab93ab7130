//! Fill-handle series.
//!
//! Filling walks the source range once per column (or row, for horizontal
//! fills) and builds a [`FillSeries`] describing how values continue:
//!
//! - numbers with two or more points follow a least-squares line,
//! - dates advance by the average step between first and last source date,
//! - everything else, and single points, repeat the edge value.
//!
//! Targets are addressed by their distance `p >= 1` from the source edge
//! they extend. Reverse fills (upward or leftward) count away from the
//! source's first cell instead of its last.

use chrono::{Duration, NaiveDateTime};

use crate::field::CellValue;

/// How a single source track continues into the target.
#[derive(Debug, Clone, PartialEq)]
pub enum FillSeries {
    /// `y = intercept + slope * x`, with source points at `x = 1..=n`.
    Linear { intercept: f64, slope: f64, len: usize },
    /// Dates stepping by `step` per cell.
    Dates {
        values: Vec<NaiveDateTime>,
        step: Duration,
    },
    /// Repeat one value.
    Repeat(Option<CellValue>),
}

impl FillSeries {
    /// Describe a source track, first cell first.
    pub fn from_values(values: &[Option<CellValue>], reverse: bool) -> Self {
        let edge = if reverse { values.first() } else { values.last() };
        let repeat = Self::Repeat(edge.cloned().flatten());
        if values.len() < 2 {
            return repeat;
        }

        let numbers: Option<Vec<f64>> = values
            .iter()
            .map(|v| v.as_ref().and_then(CellValue::as_number))
            .collect();
        if let Some(numbers) = numbers {
            return least_squares(&numbers).unwrap_or(repeat);
        }

        let dates: Option<Vec<NaiveDateTime>> = values
            .iter()
            .map(|v| v.as_ref().and_then(CellValue::as_date))
            .collect();
        if let Some(dates) = dates {
            if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
                let steps = i32::try_from(dates.len() - 1).unwrap_or(i32::MAX);
                let step = (*last - *first) / steps;
                return Self::Dates {
                    values: dates,
                    step,
                };
            }
        }
        repeat
    }

    /// Value `p` cells beyond the source edge (`p >= 1`).
    pub fn value_at(&self, p: usize, reverse: bool) -> Option<CellValue> {
        match self {
            Self::Linear {
                intercept,
                slope,
                len,
            } => {
                let x = if reverse {
                    1.0 - p as f64
                } else {
                    (*len + p) as f64
                };
                Some(CellValue::Number(round_noise(intercept + slope * x)))
            }
            Self::Dates { values, step } => {
                let n = values.len();
                if n == 0 || p == 0 {
                    return None;
                }
                let page = i32::try_from(p.div_ceil(n)).ok()?;
                let cycle = i32::try_from(n).ok()?;
                let offset = (p - 1) % n;
                let (idx, shift) = if reverse {
                    (n - 1 - offset, -(*step * cycle * page))
                } else {
                    (offset, *step * cycle * page)
                };
                values
                    .get(idx)
                    .and_then(|d| d.checked_add_signed(shift))
                    .map(CellValue::Date)
            }
            Self::Repeat(value) => value.clone(),
        }
    }
}

fn least_squares(ys: &[f64]) -> Option<FillSeries> {
    let n = ys.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let x = (i + 1) as f64;
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
    }
    let denom = n * sxx - sx * sx;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let slope = (n * sxy - sx * sy) / denom;
    let intercept = (sy - slope * sx) / n;
    Some(FillSeries::Linear {
        intercept,
        slope,
        len: ys.len(),
    })
}

/// Trim binary noise so `1, 2, 3` continues as `4` rather than
/// `4.000000000000001`.
fn round_noise(value: f64) -> f64 {
    let rounded = (value * 1e9).round() / 1e9;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}
