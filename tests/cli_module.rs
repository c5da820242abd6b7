use dabbler::cli::{parse_cli_verb, run_cli, CliVerb};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::tempdir;

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

const DESCRIPTOR_YAML: &str = "\
crop: Maize
model: MZIXM
cultivar: PC0003
plant_date: 1982-02-25
harvest_date: 1982-06-25
simulation_start: 1982-01-01
latitude: 29.638
longitude: -28.3689
weather_station_code: UFGA
soil_code: IBMZ910014
";

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[test]
fn verbs_parse() {
    assert_eq!(parse_cli_verb("run"), CliVerb::Run);
    assert_eq!(parse_cli_verb("check"), CliVerb::Check);
    assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
    assert_eq!(parse_cli_verb("start"), CliVerb::Unknown);
}

#[test]
fn run_command_summarizes_tables_from_a_yaml_descriptor() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("bin");
    let runs = dir.path().join("runs");
    fs::create_dir(&bin).expect("bin");
    fs::create_dir(&runs).expect("runs");
    write_script(
        &bin.join("dscsm047"),
        "#!/bin/sh\nprintf '@YEAR DOY LAID\\n1982 56 0.0\\n1982 57 0.1\\n' > PlantGro.OUT\n",
    );

    let config = dir.path().join("dabbler.yaml");
    fs::write(
        &config,
        format!(
            "install_dir: {}\nrun_root: {}\nlayouts:\n  maize:\n    PlantGro.OUT:\n      skip_lines: 0\n",
            bin.display(),
            runs.display()
        ),
    )
    .expect("config");
    let descriptor = dir.path().join("run.yaml");
    fs::write(&descriptor, DESCRIPTOR_YAML).expect("descriptor");

    let check = run_cli(args(&["check", "--config", &config.display().to_string()]))
        .expect("check");
    assert_eq!(check, format!("executable={}", bin.join("dscsm047").display()));

    let summary = run_cli(args(&[
        "run",
        "--config",
        &config.display().to_string(),
        "--descriptor",
        &descriptor.display().to_string(),
    ]))
    .expect("run");
    assert!(summary.contains("exit_code=0"));
    assert!(summary.contains("table=PlantGro.OUT rows=2 columns=3 index=1982056..1982057"));

    let json = run_cli(args(&[
        "run",
        "--config",
        &config.display().to_string(),
        "--descriptor",
        &descriptor.display().to_string(),
        "--json",
    ]))
    .expect("run json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("json");
    assert_eq!(value["tables"]["PlantGro.OUT"]["index"][1], 1_982_057);
    assert_eq!(fs::read_dir(&runs).expect("runs").count(), 0);
}

#[test]
fn run_without_config_reports_the_missing_flag() {
    let err = run_cli(args(&["run", "--descriptor", "run.yaml"])).expect_err("no config");
    assert!(err.contains("--config"));
}
