use super::table::ResultTable;
use serde::Serialize;

pub const GROWTH_STAGE_SECTION: &str = "SIMULATED CROP AND SOIL STATUS AT MAIN DEVELOPMENT STAGES";
pub const GROWTH_STAGE_COLUMN: &str = "GSTD";

const CROP_INFO_LINE: usize = 11;
// The date and day-count columns are printed without a separator.
const MERGED_COLUMN_OFFSET: usize = 12;
const SECTION_HEADER_LINES: usize = 7;
const STAGE_NAME_FIELD: usize = 2;
const STAGE_CODE_FIELD: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthStage {
    pub name: String,
    pub code: String,
    /// First and last growth-table index carrying this stage code.
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Free-text overview report plus the data mined from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewReport {
    pub text: String,
    pub crop_info: Option<String>,
    pub growth_stages: Vec<GrowthStage>,
}

/// Decodes the raw report permissively and extracts the development-stage
/// table, cross-referenced against the growth table when one was produced.
pub fn parse_overview(raw: &[u8], plant_growth: Option<&ResultTable>) -> OverviewReport {
    let text = String::from_utf8_lossy(raw).into_owned();
    let crop_info = text
        .lines()
        .nth(CROP_INFO_LINE)
        .map(|line| line.trim_end().to_string());
    let growth_stages = text
        .split('*')
        .find(|section| section.contains(GROWTH_STAGE_SECTION))
        .map(|section| growth_stages(section, plant_growth))
        .unwrap_or_default();

    OverviewReport {
        text,
        crop_info,
        growth_stages,
    }
}

fn growth_stages(section: &str, plant_growth: Option<&ResultTable>) -> Vec<GrowthStage> {
    section
        .split('\n')
        .skip(SECTION_HEADER_LINES)
        .filter_map(|line| {
            let spaced = split_merged_column(line);
            let fields: Vec<&str> = split_wide(spaced.trim_start());
            let name = fields.get(STAGE_NAME_FIELD)?;
            let code = fields.get(STAGE_CODE_FIELD)?;
            let (start, end) = stage_span(code, plant_growth);
            Some(GrowthStage {
                name: name.trim().to_string(),
                code: code.trim().to_string(),
                start,
                end,
            })
        })
        .collect()
}

fn split_merged_column(line: &str) -> String {
    match line.char_indices().nth(MERGED_COLUMN_OFFSET) {
        Some((offset, _)) => format!("{} {}", &line[..offset], &line[offset..]),
        None => format!("{line} "),
    }
}

/// Splits on runs of two or more whitespace characters.
fn split_wide(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut run_start = None;
    let mut run_len = 0;
    for (offset, ch) in line.char_indices() {
        if ch.is_whitespace() {
            if run_start.is_none() {
                run_start = Some(offset);
            }
            run_len += 1;
            continue;
        }
        if let Some(run) = run_start.take() {
            if run_len >= 2 {
                fields.push(&line[start..run]);
                start = offset;
            }
        }
        run_len = 0;
    }
    let tail = match run_start {
        Some(run) if run_len >= 2 => &line[start..run],
        _ => &line[start..],
    };
    if !tail.is_empty() {
        fields.push(tail);
    }
    fields
}

fn stage_span(code: &str, plant_growth: Option<&ResultTable>) -> (Option<i64>, Option<i64>) {
    let (Some(table), Ok(code)) = (plant_growth, code.trim().parse::<f64>()) else {
        return (None, None);
    };
    let Some(stages) = table.column(GROWTH_STAGE_COLUMN) else {
        return (None, None);
    };
    let mut matching = stages
        .zip(table.index())
        .filter(|(value, _)| value.as_f64() == Some(code))
        .map(|(_, index)| *index);
    let start = matching.next();
    let end = matching.last().or(start);
    (start, end)
}
