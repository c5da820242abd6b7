use dabbler::results::{parse_overview, parse_table, IndexKind, RunResult, Value};
use dabbler::SimulationError;

fn growth_rows(rows: usize, separator: &str) -> String {
    let mut text = String::from("@YEAR DOY DAS GSTD\n");
    for i in 0..rows {
        let fields = [
            "1982".to_string(),
            format!("{}", 100 + i),
            i.to_string(),
            (i / 4).to_string(),
        ];
        text.push_str(separator);
        text.push_str(&fields.join(separator));
        text.push('\n');
    }
    text
}

#[test]
fn row_count_ignores_whitespace_width() {
    for separator in [" ", "   ", "\t", " \t  "] {
        let table = parse_table("PlantGro.OUT", &growth_rows(12, separator), 0, None)
            .expect("parse");
        assert_eq!(table.row_count(), 12, "separator {separator:?}");
        assert_eq!(table.index()[11], 1_982_111);
    }
}

#[test]
fn skip_count_discards_preamble_including_blank_lines() {
    let payload = format!(
        "$SOIL TEMPERATURE\n\n*DSSAT Cropping System Model\n\n*RUN 1\n MODEL : MZCER047\n EXPERIMENT : DFLT8201MZ\n{}",
        growth_rows(3, " ")
    );
    let table = parse_table("SoilTemp.OUT", &payload, 7, None).expect("parse");
    assert_eq!(table.columns(), &["@YEAR", "DOY", "DAS", "GSTD"]);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.index_kind(), &IndexKind::YearDay);
}

#[test]
fn changed_header_in_a_later_section_is_malformed() {
    let payload = format!(
        "{}*RUN 2\n@YEAR DOY DAS LAID\n1983 1 0 0.0\n",
        growth_rows(2, " ")
    );
    let err = parse_table("PlantGro.OUT", &payload, 0, None).expect_err("header changed");
    assert!(matches!(err, SimulationError::MalformedOutput { ref channel, .. } if channel == "PlantGro.OUT"));
}

#[test]
fn year_column_without_at_sign_is_accepted() {
    let table = parse_table("Weather.OUT", "YEAR DOY SRAA\n1982 5 10.5\n", 0, None).expect("parse");
    assert_eq!(table.index(), &[1_982_005]);
    assert_eq!(table.value(0, "SRAA"), Some(&Value::Float(10.5)));
}

#[test]
fn day_of_year_without_year_is_malformed() {
    let err = parse_table("ET.OUT", "DOY ETAA\n5 1.0\n", 0, None).expect_err("no year");
    assert!(matches!(err, SimulationError::MalformedOutput { .. }));
}

#[test]
fn tables_without_day_of_year_fall_back_to_row_numbers() {
    let table = parse_table("Evaluate.OUT", "@RUN HWAM\n1 5000\n2 5100\n", 0, None).expect("parse");
    assert_eq!(table.index(), &[1, 2]);
    assert_eq!(table.index_kind(), &IndexKind::RowNumber);
}

#[test]
fn overview_without_stage_section_keeps_text() {
    let report = parse_overview(b"line 0\nline 1\n", None);
    assert_eq!(report.text, "line 0\nline 1\n");
    assert!(report.crop_info.is_none());
    assert!(report.growth_stages.is_empty());
}

#[test]
fn run_result_serializes_tables_and_values() {
    let table = parse_table("PlantGro.OUT", &growth_rows(2, " "), 0, None).expect("parse");
    let mut result = RunResult {
        exit_code: Some(0),
        ..RunResult::default()
    };
    result.tables.insert("PlantGro.OUT".to_string(), table);

    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json["exit_code"], 0);
    assert_eq!(json["tables"]["PlantGro.OUT"]["rows"][1][1], 101);
    assert_eq!(json["tables"]["PlantGro.OUT"]["index_kind"], "year_day");
    assert!(json["overview"].is_null());
}
