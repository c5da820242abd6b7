use crate::error::SimulationError;
use serde::Serialize;

pub const DAY_OF_YEAR_COLUMN: &str = "DOY";
pub const YEAR_COLUMNS: [&str; 2] = ["@YEAR", "YEAR"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Value {
    fn parse(token: &str) -> Self {
        if let Ok(value) = token.parse::<i64>() {
            return Self::Int(value);
        }
        if let Ok(value) = token.parse::<f64>() {
            return Self::Float(value);
        }
        Self::Text(token.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) | Self::Missing => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Year and zero-padded day of year concatenated, e.g. `1982056`.
    YearDay,
    Column(String),
    RowNumber,
}

/// One parsed output channel. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    index: Vec<i64>,
    index_kind: IndexKind,
}

impl ResultTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn index_kind(&self) -> &IndexKind {
        &self.index_kind
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let position = self.column_position(name)?;
        Some(self.rows.iter().map(move |row| &row[position]))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let position = self.column_position(column)?;
        self.rows.get(row).map(|values| &values[position])
    }
}

/// Parses a whitespace-delimited table after discarding `skip_lines` raw
/// lines. The first non-blank line left is the header. Later sections
/// (lines from a `*` banner up to the repeated `@` header) are skipped.
pub fn parse_table(
    channel: &str,
    payload: &str,
    skip_lines: usize,
    index_column: Option<&str>,
) -> Result<ResultTable, SimulationError> {
    let malformed = |reason: String| SimulationError::MalformedOutput {
        channel: channel.to_string(),
        reason,
    };

    let mut lines = payload
        .lines()
        .skip(skip_lines)
        .map(str::trim)
        .filter(|line| !line.is_empty());
    let Some(header) = lines.next() else {
        return Err(SimulationError::EmptyResult {
            channel: channel.to_string(),
        });
    };
    let columns: Vec<String> = header.split_whitespace().map(str::to_string).collect();

    let mut rows = Vec::new();
    let mut in_banner = false;
    for line in lines {
        if line.starts_with('*') {
            in_banner = true;
            continue;
        }
        if in_banner {
            if line.starts_with('@') {
                in_banner = false;
                if !same_header(line, &columns) {
                    return Err(malformed(format!("section header changed to `{line}`")));
                }
            }
            continue;
        }
        if line.starts_with('!') || (line.starts_with('@') && same_header(line, &columns)) {
            continue;
        }

        let mut row: Vec<Value> = line.split_whitespace().map(Value::parse).collect();
        if row.len() > columns.len() {
            return Err(malformed(format!(
                "row {} has {} fields for {} columns",
                rows.len() + 1,
                row.len(),
                columns.len()
            )));
        }
        row.resize(columns.len(), Value::Missing);
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(SimulationError::EmptyResult {
            channel: channel.to_string(),
        });
    }

    let (index, index_kind) = build_index(&columns, &rows, index_column).map_err(malformed)?;
    Ok(ResultTable {
        name: channel.to_string(),
        columns,
        rows,
        index,
        index_kind,
    })
}

fn same_header(line: &str, columns: &[String]) -> bool {
    line.split_whitespace().eq(columns.iter().map(String::as_str))
}

fn build_index(
    columns: &[String],
    rows: &[Vec<Value>],
    index_column: Option<&str>,
) -> Result<(Vec<i64>, IndexKind), String> {
    let position = |name: &str| columns.iter().position(|column| column == name);

    if let Some(doy) = position(DAY_OF_YEAR_COLUMN) {
        let year = YEAR_COLUMNS
            .iter()
            .find_map(|name| position(name))
            .ok_or_else(|| "day-of-year column without a year column".to_string())?;
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| match (row[year].as_i64(), row[doy].as_i64()) {
                (Some(year), Some(doy)) => format!("{year}{doy:0>3}")
                    .parse::<i64>()
                    .map_err(|err| format!("row {}: {err}", i + 1)),
                _ => Err(format!("row {} has no integer year/day of year", i + 1)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok((index, IndexKind::YearDay));
    }

    if let Some(name) = index_column {
        let column = position(name).ok_or_else(|| format!("index column `{name}` is absent"))?;
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row[column]
                    .as_i64()
                    .ok_or_else(|| format!("row {} has a non-integer `{name}`", i + 1))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok((index, IndexKind::Column(name.to_string())));
    }

    Ok(((1..=rows.len() as i64).collect(), IndexKind::RowNumber))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANT_GROWTH: &str = "\
$GROWTH ASPECTS OUTPUT FILE
*DSSAT Cropping System Model
!IDETG

@YEAR DOY   DAS   DAP   LAID  GSTD
 1982  56     0     0   0.00     0
 1982  57     1     1   0.01     0
 1982  60     4     4   0.05     1
";

    #[test]
    fn year_and_day_of_year_form_a_sortable_index() {
        let table = parse_table("PlantGro.OUT", PLANT_GROWTH, 4, None).expect("parse");

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.columns()[0], "@YEAR");
        assert_eq!(table.index(), &[1982056, 1982057, 1982060]);
        assert_eq!(table.index_kind(), &IndexKind::YearDay);
        assert_eq!(table.value(2, "LAID"), Some(&Value::Float(0.05)));
    }

    #[test]
    fn repeated_sections_are_folded_into_one_table() {
        let payload = format!(
            "{PLANT_GROWTH}\n*RUN   2\n MODEL : MZCER047\n@YEAR DOY   DAS   DAP   LAID  GSTD\n 1983  56     0     0   0.00     0\n"
        );
        let table = parse_table("PlantGro.OUT", &payload, 4, None).expect("parse");

        assert_eq!(table.row_count(), 4);
        assert_eq!(table.index()[3], 1983056);
    }

    #[test]
    fn alternate_index_column_is_used_without_day_of_year() {
        let payload = "@RUN FLAG   HWAM\n   1 ok    5000\n   2 ok\n";
        let table = parse_table("Evaluate.OUT", payload, 0, Some("@RUN")).expect("parse");

        assert_eq!(table.index(), &[1, 2]);
        assert_eq!(table.value(1, "HWAM"), Some(&Value::Missing));
    }

    #[test]
    fn header_only_payload_is_empty_result() {
        let err = parse_table("ET.OUT", "skip\n@YEAR DOY ETAA\n\n", 1, None).expect_err("empty");
        assert!(matches!(err, SimulationError::EmptyResult { channel } if channel == "ET.OUT"));
    }

    #[test]
    fn extra_fields_are_malformed() {
        let err = parse_table("ET.OUT", "A B\n1 2 3\n", 0, None).expect_err("malformed");
        assert!(matches!(err, SimulationError::MalformedOutput { .. }));
    }
}
