//! Field type system.
//!
//! A [`Field`] binds a column to one of a closed set of data types. Every
//! variant answers the same four questions the grid asks of a value:
//! - is it valid (`validate`)
//! - are two values the same (`compare_equals`)
//! - how does it read on screen and on the clipboard (`to_display_string`)
//! - what value does a piece of pasted text mean (`parse_from_text`)
//!
//! Sorting, grouping and aggregation never look inside a variant's
//! parameters; they only need [`DataType`] and the shared comparator in
//! [`compare`].

pub mod compare;
mod validation;
mod value;

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use compare::{compare_values, SortDirection};
pub use validation::{ValidationError, ValidationErrors};
pub use value::{is_blank, CellValue};

use crate::error::GridError;

/// Date formats accepted when parsing text, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Date-time formats accepted when parsing text, tried in order.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

/// Tolerance used when comparing numbers for equality.
const NUMBER_EPSILON: f64 = 1e-9;

/// Type tag of a field. Used as the cell-factory key and for aggregate
/// applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Text,
    Number,
    Checkbox,
    Dropdown,
    Date,
}

impl DataType {
    pub const ALL: [DataType; 5] = [
        DataType::Text,
        DataType::Number,
        DataType::Checkbox,
        DataType::Dropdown,
        DataType::Date,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Dropdown => "dropdown",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GridError::UnsupportedDataType(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextParams {
    /// Regular expression the whole value must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<TextPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// A text pattern, compiled on first use and kept for later checks.
///
/// Serializes as its source string. An invalid source compiles to `None`
/// and fails every value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TextPattern {
    source: String,
    #[serde(skip)]
    compiled: OnceLock<Option<Regex>>,
}

impl TextPattern {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Anchored regex for the whole value, `None` if the source is invalid.
    pub fn regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| match Regex::new(&format!("^(?:{})$", self.source)) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::debug!(pattern = %self.source, %err, "invalid text pattern");
                    None
                }
            })
            .as_ref()
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl From<String> for TextPattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl From<&str> for TextPattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<TextPattern> for String {
    fn from(pattern: TextPattern) -> Self {
        pattern.source
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NumberParams {
    pub allow_negative: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Fixed number of decimals used for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<usize>,
}

impl Default for NumberParams {
    fn default() -> Self {
        Self {
            allow_negative: true,
            min: None,
            max: None,
            decimals: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

impl DropdownOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DropdownParams {
    pub options: Vec<DropdownOption>,
    pub multiple: bool,
}

impl DropdownParams {
    fn option_by_value(&self, value: &str) -> Option<&DropdownOption> {
        self.options.iter().find(|o| o.value == value)
    }

    fn option_by_text(&self, text: &str) -> Option<&DropdownOption> {
        let text = text.trim();
        self.options.iter().find(|o| {
            o.label.eq_ignore_ascii_case(text) || o.value.eq_ignore_ascii_case(text)
        })
    }

    fn label_of<'a>(&'a self, value: &'a str) -> &'a str {
        self.option_by_value(value)
            .map_or(value, |o| o.label.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateParams {
    pub include_time: bool,
}

/// Type-specific part of a field, tagged by `data` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data", rename_all = "camelCase")]
pub enum FieldKind {
    Text(TextParams),
    Number(NumberParams),
    Checkbox,
    Dropdown(DropdownParams),
    Date(DateParams),
}

/// A column's value contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            required: false,
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text(TextParams::default()))
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number(NumberParams::default()))
    }

    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Checkbox)
    }

    pub fn dropdown(name: impl Into<String>, options: Vec<DropdownOption>, multiple: bool) -> Self {
        Self::new(name, FieldKind::Dropdown(DropdownParams { options, multiple }))
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date(DateParams::default()))
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn data_type(&self) -> DataType {
        match self.kind {
            FieldKind::Text(_) => DataType::Text,
            FieldKind::Number(_) => DataType::Number,
            FieldKind::Checkbox => DataType::Checkbox,
            FieldKind::Dropdown(_) => DataType::Dropdown,
            FieldKind::Date(_) => DataType::Date,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, FieldKind::Number(_))
    }

    pub fn is_date(&self) -> bool {
        matches!(self.kind, FieldKind::Date(_))
    }

    /// Check a value against this field. `None` means the value is accepted.
    pub fn validate(&self, value: Option<&CellValue>) -> Option<ValidationErrors> {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                return self
                    .required
                    .then(|| ValidationErrors::single(ValidationError::Required));
            }
        };

        let mut errors = ValidationErrors::new();
        match (&self.kind, value) {
            (FieldKind::Text(params), CellValue::Text(s)) => {
                if let Some(pattern) = &params.pattern {
                    match pattern.regex() {
                        Some(re) if !re.is_match(s) => errors.push(ValidationError::Pattern),
                        Some(_) => {}
                        None => errors.push(ValidationError::Other("invalid pattern".into())),
                    }
                }
                if params.max_length.is_some_and(|max| s.chars().count() > max) {
                    errors.push(ValidationError::Max);
                }
            }
            (FieldKind::Number(params), CellValue::Number(n)) => {
                if !n.is_finite() {
                    errors.push(ValidationError::Other("not a number".into()));
                }
                if !params.allow_negative && *n < 0.0 {
                    errors.push(ValidationError::Min);
                }
                if params.min.is_some_and(|min| *n < min) {
                    errors.push(ValidationError::Min);
                }
                if params.max.is_some_and(|max| *n > max) {
                    errors.push(ValidationError::Max);
                }
            }
            (FieldKind::Checkbox, CellValue::Boolean(_)) | (FieldKind::Date(_), CellValue::Date(_)) => {}
            (FieldKind::Dropdown(params), CellValue::Text(s)) if !params.multiple => {
                if params.option_by_value(s).is_none() {
                    errors.push(ValidationError::Other("unknown option".into()));
                }
            }
            (FieldKind::Dropdown(params), CellValue::List(items)) if params.multiple => {
                if items.iter().any(|s| params.option_by_value(s).is_none()) {
                    errors.push(ValidationError::Other("unknown option".into()));
                }
            }
            _ => errors.push(ValidationError::Other(format!(
                "expected a {} value",
                self.data_type()
            ))),
        }
        errors.into_option()
    }

    /// Whether two values are the same for this field.
    pub fn compare_equals(&self, a: Option<&CellValue>, b: Option<&CellValue>) -> bool {
        if is_blank(a) || is_blank(b) {
            return is_blank(a) && is_blank(b);
        }
        match (a, b) {
            (Some(CellValue::Number(x)), Some(CellValue::Number(y))) => {
                (x - y).abs() < NUMBER_EPSILON
            }
            (Some(CellValue::Date(x)), Some(CellValue::Date(y))) => match self.kind {
                FieldKind::Date(DateParams { include_time: false }) => x.date() == y.date(),
                _ => x == y,
            },
            (Some(CellValue::List(x)), Some(CellValue::List(y))) => {
                let mut x = x.clone();
                let mut y = y.clone();
                x.sort();
                y.sort();
                x == y
            }
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Text shown in the cell and written to the clipboard.
    pub fn to_display_string(&self, value: Option<&CellValue>) -> String {
        let Some(value) = value else {
            return String::new();
        };
        match (&self.kind, value) {
            (FieldKind::Number(params), CellValue::Number(n)) => match params.decimals {
                Some(decimals) => format!("{n:.decimals$}"),
                None => format_number(*n),
            },
            (FieldKind::Date(params), CellValue::Date(d)) => {
                if params.include_time {
                    d.format("%Y-%m-%d %H:%M").to_string()
                } else {
                    d.format("%Y-%m-%d").to_string()
                }
            }
            (FieldKind::Dropdown(params), CellValue::Text(s)) => params.label_of(s).to_string(),
            (FieldKind::Dropdown(params), CellValue::List(items)) => items
                .iter()
                .map(|s| params.label_of(s))
                .collect::<Vec<_>>()
                .join(", "),
            (_, CellValue::Text(s)) => s.clone(),
            (_, CellValue::Number(n)) => format_number(*n),
            (_, CellValue::Boolean(b)) => b.to_string(),
            (_, CellValue::Date(d)) => d.format("%Y-%m-%d").to_string(),
            (_, CellValue::List(items)) => items.join(", "),
        }
    }

    /// Interpret pasted or typed text as a value of this field.
    ///
    /// Blank text is not a value: callers clear the cell instead. Returns
    /// `None` when the text cannot be read as this field's type.
    pub fn parse_from_text(&self, text: &str) -> Option<CellValue> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match &self.kind {
            FieldKind::Text(_) => Some(CellValue::Text(text.to_string())),
            FieldKind::Number(_) => parse_number(text).map(CellValue::Number),
            FieldKind::Checkbox => parse_checkbox(text).map(CellValue::Boolean),
            FieldKind::Date(_) => parse_date(text).map(CellValue::Date),
            FieldKind::Dropdown(params) if params.multiple => {
                let mut values = Vec::new();
                for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let option = params.option_by_text(part)?;
                    if !values.contains(&option.value) {
                        values.push(option.value.clone());
                    }
                }
                Some(CellValue::List(values))
            }
            FieldKind::Dropdown(params) => params
                .option_by_text(text)
                .map(|o| CellValue::Text(o.value.clone())),
        }
    }

    /// Bring a raw value of a neighbouring type into this field's shape
    /// where that is lossless enough (e.g. ISO date text into a date
    /// column). Values that cannot be coerced are returned untouched and left
    /// for `validate` to reject.
    pub fn coerce(&self, value: CellValue) -> CellValue {
        let coerced = match (&self.kind, &value) {
            (FieldKind::Text(_), CellValue::Text(_))
            | (FieldKind::Number(_), CellValue::Number(_))
            | (FieldKind::Checkbox, CellValue::Boolean(_))
            | (FieldKind::Date(_), CellValue::Date(_)) => None,
            (FieldKind::Text(_), other) => Some(CellValue::Text(self.to_display_string(Some(other)))),
            (FieldKind::Dropdown(params), CellValue::Text(s)) if params.multiple => {
                Some(CellValue::List(vec![s.clone()]))
            }
            (FieldKind::Dropdown(params), CellValue::List(items)) if !params.multiple => {
                items.first().cloned().map(CellValue::Text)
            }
            (FieldKind::Dropdown(_), _) => None,
            (_, CellValue::Text(s)) => self.parse_from_text(s),
            _ => None,
        };
        coerced.unwrap_or(value)
    }

    /// Normalized grouping key: values that should land in the same group
    /// produce the same key.
    pub fn group_key(&self, value: Option<&CellValue>) -> String {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return String::new();
        };
        match value {
            CellValue::Text(s) => s.trim().to_lowercase(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Date(d) => match self.kind {
                FieldKind::Date(DateParams { include_time: true }) => d.to_string(),
                _ => d.date().to_string(),
            },
            CellValue::List(items) => {
                let mut items = items.clone();
                items.sort();
                items.join("\u{1f}")
            }
        }
    }

    /// Serialize for the host: `{ data, name, required, ...params }`.
    pub fn to_json(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Plain number formatting without a trailing `.0` on integers.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}' | '_'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_checkbox(text: &str) -> Option<bool> {
    match text.to_lowercase().as_str() {
        "true" | "yes" | "1" | "x" | "✓" | "checked" => Some(true),
        "false" | "no" | "0" | "unchecked" => Some(false),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
