use super::ConfigError;
use crate::channels::ChannelKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How one output channel of the model is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputLayout {
    /// Header lines discarded before the column-name line. `None` drains
    /// the channel and discards the payload.
    #[serde(default)]
    pub skip_lines: Option<usize>,
    /// Index column used when the table has no day-of-year column.
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub kind: ChannelKind,
    /// Free-text report parsed outside the generic table loop.
    #[serde(default)]
    pub report: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseRule {
    Discard,
    Table {
        skip_lines: usize,
        index: Option<String>,
    },
    Report,
}

impl OutputLayout {
    pub fn table(skip_lines: usize) -> Self {
        Self {
            skip_lines: Some(skip_lines),
            index: None,
            kind: ChannelKind::Pipe,
            report: false,
        }
    }

    pub fn indexed_by(skip_lines: usize, index: &str) -> Self {
        Self {
            index: Some(index.to_string()),
            ..Self::table(skip_lines)
        }
    }

    pub fn discard() -> Self {
        Self {
            skip_lines: None,
            index: None,
            kind: ChannelKind::Pipe,
            report: false,
        }
    }

    pub fn report() -> Self {
        Self {
            report: true,
            ..Self::discard()
        }
    }

    pub fn rule(&self) -> ParseRule {
        if self.report {
            return ParseRule::Report;
        }
        match self.skip_lines {
            Some(skip_lines) => ParseRule::Table {
                skip_lines,
                index: self.index.clone(),
            },
            None => ParseRule::Discard,
        }
    }
}

/// Output channel name -> layout, for one crop.
pub type CropLayout = BTreeMap<String, OutputLayout>;

pub const PLANT_GROWTH_CHANNEL: &str = "PlantGro.OUT";
pub const OVERVIEW_CHANNEL: &str = "OVERVIEW.OUT";

pub fn builtin_layouts() -> BTreeMap<String, CropLayout> {
    let mut layouts = BTreeMap::new();
    layouts.insert("maize".to_string(), maize_layout());
    layouts
}

fn maize_layout() -> CropLayout {
    BTreeMap::from([
        ("ET.OUT".to_string(), OutputLayout::table(4)),
        (
            "Evaluate.OUT".to_string(),
            OutputLayout::indexed_by(1, "@RUN"),
        ),
        ("Mulch.OUT".to_string(), OutputLayout::table(2)),
        (PLANT_GROWTH_CHANNEL.to_string(), OutputLayout::table(4)),
        ("PlantN.OUT".to_string(), OutputLayout::table(3)),
        ("RunList.OUT".to_string(), OutputLayout::discard()),
        ("SoilTemp.OUT".to_string(), OutputLayout::table(7)),
        ("SoilWatBal.OUT".to_string(), OutputLayout::discard()),
        ("SoilWat.OUT".to_string(), OutputLayout::table(5)),
        ("Summary.OUT".to_string(), OutputLayout::discard()),
        ("Weather.OUT".to_string(), OutputLayout::table(3)),
        (OVERVIEW_CHANNEL.to_string(), OutputLayout::report()),
    ])
}

pub fn validate_layout(crop: &str, layout: &CropLayout) -> Result<(), ConfigError> {
    if layout.is_empty() {
        return Err(ConfigError::Layout {
            crop: crop.to_string(),
            reason: "at least one output channel is required".to_string(),
        });
    }
    let mut reports = 0;
    for (channel, entry) in layout {
        if channel.trim().is_empty() || channel.contains('/') {
            return Err(ConfigError::Layout {
                crop: crop.to_string(),
                reason: format!("channel name `{channel}` must be a bare file name"),
            });
        }
        if entry.report {
            reports += 1;
            if entry.skip_lines.is_some() {
                return Err(ConfigError::Layout {
                    crop: crop.to_string(),
                    reason: format!("report channel `{channel}` cannot set skip_lines"),
                });
            }
        }
    }
    if reports > 1 {
        return Err(ConfigError::Layout {
            crop: crop.to_string(),
            reason: "at most one report channel is allowed".to_string(),
        });
    }
    Ok(())
}
