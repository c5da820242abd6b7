pub mod overview;
pub mod table;

pub use overview::{parse_overview, GrowthStage, OverviewReport};
pub use table::{parse_table, IndexKind, ResultTable, Value};

use crate::config::PLANT_GROWTH_CHANNEL;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything one run produced. Channels the model did not write are absent
/// from `tables`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    pub tables: BTreeMap<String, ResultTable>,
    pub overview: Option<OverviewReport>,
    pub exit_code: Option<i32>,
}

impl RunResult {
    /// Looks a table up by channel name, with or without its extension.
    pub fn table(&self, name: &str) -> Option<&ResultTable> {
        self.tables.get(name).or_else(|| {
            self.tables
                .iter()
                .find(|(channel, _)| channel.split('.').next() == Some(name))
                .map(|(_, table)| table)
        })
    }

    pub fn plant_growth(&self) -> Option<&ResultTable> {
        self.tables.get(PLANT_GROWTH_CHANNEL)
    }

    pub fn overview_text(&self) -> Option<&str> {
        self.overview.as_ref().map(|report| report.text.as_str())
    }

    pub fn crop_info(&self) -> Option<&str> {
        self.overview
            .as_ref()
            .and_then(|report| report.crop_info.as_deref())
    }

    pub fn growth_stages(&self) -> &[GrowthStage] {
        self.overview
            .as_ref()
            .map(|report| report.growth_stages.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_resolve_by_stem() {
        let table = parse_table("PlantGro.OUT", "@YEAR DOY\n1982 56\n", 0, None).expect("parse");
        let mut result = RunResult::default();
        result.tables.insert("PlantGro.OUT".to_string(), table);

        assert!(result.table("PlantGro").is_some());
        assert!(result.plant_growth().is_some());
        assert!(result.table("Weather").is_none());
        assert!(result.growth_stages().is_empty());
    }
}
