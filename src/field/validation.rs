//! Validation error kinds reported by fields.

use std::fmt;

use serde::Serialize;

/// A single reason a value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum ValidationError {
    Required,
    Pattern,
    Min,
    Max,
    Other(String),
}

impl ValidationError {
    /// Stable key used by the host to pick a tooltip message.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Pattern => "pattern",
            Self::Min => "min",
            Self::Max => "max",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(msg) => write!(f, "{msg}"),
            other => write!(f, "{}", other.key()),
        }
    }
}

/// Non-empty collection of validation failures for one value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(error: ValidationError) -> Self {
        Self(vec![error])
    }

    pub fn push(&mut self, error: ValidationError) {
        if !self.0.contains(&error) {
            self.0.push(error);
        }
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `None` when nothing was pushed, so validators can end with
    /// `errors.into_option()`.
    pub fn into_option(self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}
