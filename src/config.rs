//! Grid configuration.
//!
//! Recognized options arrive from the host as JSON (camelCase keys). Every
//! field has a default so partial objects are accepted.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Row height presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RowSize {
    #[default]
    S,
    M,
    L,
    XL,
}

impl RowSize {
    /// Fixed row height in device-independent pixels.
    pub fn height(self) -> f32 {
        match self {
            Self::S => 32.0,
            Self::M => 56.0,
            Self::L => 92.0,
            Self::XL => 128.0,
        }
    }
}

/// Host platform, used for the wheel shift-modifier axis swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    /// macOS already swaps axes for shift+wheel at the OS level.
    Mac,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnConfig {
    pub min_width: f32,
    pub max_width: f32,
    pub default_width: f32,
    pub arrangeable: bool,
    pub calculable: bool,
    pub creatable: bool,
    pub deletable: bool,
    pub freezable: bool,
    pub groupable: bool,
    pub hideable: bool,
    pub resizable: bool,
    pub sortable: bool,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            min_width: 100.0,
            max_width: 500.0,
            default_width: 180.0,
            arrangeable: true,
            calculable: true,
            creatable: true,
            deletable: true,
            freezable: true,
            groupable: true,
            hideable: true,
            resizable: true,
            sortable: true,
        }
    }
}

impl ColumnConfig {
    /// Clamp a requested width to the configured bounds.
    pub fn clamp_width(&self, width: f32) -> f32 {
        width.clamp(self.min_width, self.max_width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RowConfig {
    pub size: RowSize,
    pub arrangeable: bool,
    pub creatable: bool,
    pub deletable: bool,
    pub expandable: bool,
    pub selectable: bool,
}

impl Default for RowConfig {
    fn default() -> Self {
        Self {
            size: RowSize::S,
            arrangeable: true,
            creatable: true,
            deletable: true,
            expandable: true,
            selectable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellConfig {
    pub editable: bool,
    pub fillable: bool,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            editable: true,
            fillable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventConfig {
    /// Flush coalesced events on a timer instead of waiting for an explicit
    /// flush.
    pub auto_flush: bool,
    pub throttle_ms: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            auto_flush: true,
            throttle_ms: 250.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupConfig {
    pub header_height: f32,
    pub spacing: f32,
    pub indent: f32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            header_height: 40.0,
            spacing: 20.0,
            indent: 0.0,
        }
    }
}

/// Complete grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    pub row: RowConfig,
    pub column: ColumnConfig,
    pub cell: CellConfig,
    pub group: GroupConfig,
    pub events: EventConfig,
    /// Horizontal padding before the first and after the last column.
    pub side_spacing: f32,
    /// Rows arrive incrementally; appends extend the layout in place.
    pub stream_mode: bool,
    /// Extra rows kept live above and below the viewport.
    pub overscan: usize,
    /// Maximum detached views kept per pool class.
    pub pool_capacity: usize,
    /// Number of leading visible columns pinned during horizontal scroll.
    pub frozen_count: usize,
    pub platform: Platform,
}

/// Default cap for each view pool class.
pub const DEFAULT_POOL_CAPACITY: usize = 40;

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row: RowConfig::default(),
            column: ColumnConfig::default(),
            cell: CellConfig::default(),
            group: GroupConfig::default(),
            events: EventConfig::default(),
            side_spacing: 0.0,
            stream_mode: false,
            overscan: 4,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            frozen_count: 0,
            platform: Platform::Other,
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.column.min_width > self.column.max_width {
            return Err(GridError::Config(format!(
                "column minWidth {} exceeds maxWidth {}",
                self.column.min_width, self.column.max_width
            )));
        }
        if self.pool_capacity == 0 {
            return Err(GridError::Config("poolCapacity must be positive".into()));
        }
        if self.group.header_height < 0.0 || self.group.spacing < 0.0 {
            return Err(GridError::Config("group sizes must be non-negative".into()));
        }
        Ok(())
    }

    pub fn row_height(&self) -> f32 {
        self.row.size.height()
    }
}
