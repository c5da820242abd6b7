use chrono::NaiveDate;
use dabbler::channels::ChannelKind;
use dabbler::config::{CropLayout, OutputLayout};
use dabbler::descriptor::{
    IrrigationPolicy, SiteMetadata, SoilLayer, SoilProfile, SoilSurface, WeatherRow, WeatherTable,
};
use dabbler::format::FormatError;
use dabbler::results::IndexKind;
use dabbler::{RunDescriptor, RunMode, Settings, SimulationError, Simulator};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

fn maize_descriptor() -> RunDescriptor {
    RunDescriptor {
        crop: "Maize".to_string(),
        model: "MZIXM".to_string(),
        cultivar: "PC0003".to_string(),
        plant_date: date(1982, 2, 25),
        harvest_date: date(1982, 6, 25),
        simulation_start: date(1982, 1, 1),
        plant_end: None,
        harvest_end: None,
        latitude: 29.638,
        longitude: -28.3689,
        weather_data: None,
        weather_station_code: Some("UFGA".to_string()),
        soil_data: None,
        soil_code: Some("IBMZ910014".to_string()),
        site: SiteMetadata::default(),
        experiment_id: "DFLT".to_string(),
        location_name: "Gainesville".to_string(),
        forecast: None,
        irrigation: IrrigationPolicy::Automatic,
    }
}

fn plant_growth_fixture() -> String {
    let mut text = String::from(
        "$GROWTH ASPECTS OUTPUT FILE\n\n*DSSAT Cropping System Model Ver. 4.7\n\n",
    );
    text.push_str("@YEAR DOY   DAS   DAP   GSTD   LAID\n");
    for i in 0..20 {
        let stage = match i {
            0..=4 => 0,
            5..=11 => 1,
            _ => 2,
        };
        text.push_str(&format!(
            " 1982 {:>3} {:>5} {:>5} {:>6} {:>6.2}\n",
            56 + i,
            i,
            i,
            stage,
            f64::from(i) * 0.05
        ));
    }
    text
}

fn overview_fixture() -> String {
    let mut text = String::new();
    for i in 0..11 {
        text.push_str(&format!("overview header {i}\n"));
    }
    text.push_str(" CROP: Maize            CULTIVAR: PC0003\n");
    text.push_str("*SIMULATED CROP AND SOIL STATUS AT MAIN DEVELOPMENT STAGES\n");
    for i in 0..6 {
        text.push_str(&format!(" stage preamble {i}\n"));
    }
    text.push_str(
        " 25 FEB 1982   0  Sowing                0  0.00   0   0   0   0   0  0.00  0.00  0\n",
    );
    text.push_str(
        " 02 MAR 1982   5  Emergence             0  0.00   0   0   0   0   0  0.00  0.00  1\n",
    );
    text.push_str(
        " 09 MAR 1982  12  End Juveni            0  0.00   0   0   0   0   0  0.00  0.00  2\n",
    );
    text.push_str("*MAIN GROWTH AND DEVELOPMENT VARIABLES\n");
    text
}

/// A scratch installation: a mock model, its fixtures, a run root and a
/// directory the mock copies its inputs into.
struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new(model_body: &str) -> Self {
        let dir = tempdir().expect("tempdir");
        for sub in ["bin", "runs", "fixtures", "seen"] {
            fs::create_dir(dir.path().join(sub)).expect("subdir");
        }
        fs::write(
            dir.path().join("fixtures/PlantGro.OUT"),
            plant_growth_fixture(),
        )
        .expect("plantgro fixture");
        fs::write(dir.path().join("fixtures/OVERVIEW.OUT"), overview_fixture())
            .expect("overview fixture");

        let harness = Self { dir };
        let body = model_body
            .replace("{fixtures}", &harness.path("fixtures").display().to_string())
            .replace("{seen}", &harness.path("seen").display().to_string());
        write_script(&harness.path("bin/dscsm047"), &format!("#!/bin/sh\n{body}"));
        harness
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn settings(&self, layout: CropLayout) -> Settings {
        let mut settings = Settings::new(self.path("bin"));
        settings.run_root = Some(self.path("runs"));
        settings.read_timeout_ms = 2_000;
        settings.exit_grace_ms = 2_000;
        settings.layouts.insert("maize".to_string(), layout);
        settings
    }

    fn run_dirs(&self) -> usize {
        fs::read_dir(self.path("runs")).expect("runs").count()
    }
}

fn growth_layout() -> CropLayout {
    CropLayout::from([
        ("PlantGro.OUT".to_string(), OutputLayout::table(4)),
        ("Summary.OUT".to_string(), OutputLayout::discard()),
        ("OVERVIEW.OUT".to_string(), OutputLayout::report()),
    ])
}

const FULL_MODEL: &str = "\
echo \"$1 $2\" > {seen}/args.txt
cp \"$2\" {seen}/experiment.txt
cat {fixtures}/PlantGro.OUT > PlantGro.OUT
echo 'summary' > Summary.OUT
cat {fixtures}/OVERVIEW.OUT > OVERVIEW.OUT
";

#[test]
fn maize_run_returns_growth_table_and_stages_then_cleans_up() {
    let harness = Harness::new(FULL_MODEL);
    let simulator = Simulator::new(harness.settings(growth_layout())).expect("simulator");
    assert_eq!(simulator.executable(), harness.path("bin/dscsm047"));

    let result = simulator.run(&maize_descriptor()).expect("run");

    let growth = result.table("PlantGro").expect("plant growth");
    assert_eq!(growth.row_count(), 20);
    assert_eq!(growth.index_kind(), &IndexKind::YearDay);
    assert_eq!(growth.index()[0], 1_982_056);
    assert!(growth.index().windows(2).all(|pair| pair[0] < pair[1]));
    assert!(result.table("Summary.OUT").is_none());
    assert_eq!(result.exit_code, Some(0));

    assert_eq!(
        result.crop_info(),
        Some(" CROP: Maize            CULTIVAR: PC0003")
    );
    let stages = result.growth_stages();
    assert_eq!(stages.len(), 3);
    assert_eq!(stages[1].name, "Emergence");
    assert_eq!(stages[1].start, Some(1_982_061));
    assert_eq!(stages[1].end, Some(1_982_067));
    assert_eq!(stages[2].name, "End Juveni");
    assert_eq!(stages[2].end, Some(1_982_075));

    let args = fs::read_to_string(harness.path("seen/args.txt")).expect("args");
    assert_eq!(args, "A PIPE0001.EXP\n");
    let experiment = fs::read_to_string(harness.path("seen/experiment.txt")).expect("exp");
    assert!(experiment.contains("UFGA"));
    assert!(experiment.contains("IBMZ910014"));
    assert_eq!(harness.run_dirs(), 0);
}

#[test]
fn inline_weather_and_soil_are_written_under_generated_codes() {
    let harness = Harness::new(
        "cp PIPE*.WTH {seen}/weather.txt\ncp SOIL.SOL {seen}/soil.txt\ncp \"$2\" {seen}/experiment.txt\n",
    );
    let info = OutputLayout {
        kind: ChannelKind::File,
        ..OutputLayout::discard()
    };
    let layout = CropLayout::from([("INFO.OUT".to_string(), info)]);
    let simulator = Simulator::new(harness.settings(layout)).expect("simulator");

    let mut descriptor = maize_descriptor();
    descriptor.weather_station_code = None;
    descriptor.weather_data = Some(WeatherTable::new(
        (1..=3)
            .map(|day| WeatherRow {
                date: date(1982, 1, day),
                srad: 10.0,
                tmax: 25.0,
                tmin: 12.0,
                rain: 0.0,
                dewp: None,
                wind: None,
                par: None,
                evap: None,
                rhum: None,
            })
            .collect(),
    ));
    descriptor.soil_code = None;
    descriptor.soil_data = Some(SoilProfile {
        family: "SCL".to_string(),
        surface: SoilSurface::default(),
        layers: vec![SoilLayer {
            depth: 30,
            master_horizon: "A".to_string(),
            lower_limit: 0.12,
            drained_upper_limit: 0.25,
            saturation: 0.4,
            root_growth_factor: 1.0,
            saturated_conductivity: 2.5,
            bulk_density: 1.4,
            organic_carbon: 1.1,
            clay: 20.0,
            silt: 30.0,
            coarse_fraction: None,
            total_nitrogen: 0.1,
            ph_water: 6.5,
            ph_buffer: None,
            cation_exchange: 12.0,
            sorption_coefficient: None,
        }],
    });

    let result = simulator.run(&descriptor).expect("run");
    assert!(result.tables.is_empty());

    let weather = fs::read_to_string(harness.path("seen/weather.txt")).expect("weather");
    assert!(weather.starts_with("*WEATHER DATA : Gainesville"));
    assert!(weather.contains("82001"));
    let soil = fs::read_to_string(harness.path("seen/soil.txt")).expect("soil");
    let profile_id = soil
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .expect("profile id")
        .trim_start_matches('*')
        .to_string();
    assert!(profile_id.starts_with("DB"));
    assert_eq!(profile_id.len(), 10);

    let experiment = fs::read_to_string(harness.path("seen/experiment.txt")).expect("exp");
    assert!(experiment.contains(&profile_id));
    assert!(experiment.contains("PIPE"));
    assert_eq!(harness.run_dirs(), 0);
}

#[test]
fn batch_mode_streams_the_control_file_through_a_pipe() {
    let harness = Harness::new("echo \"$1 $2\" > {seen}/args.txt\ncat \"$2\" > {seen}/batch.txt\n");
    let layout = CropLayout::from([("INFO.OUT".to_string(), OutputLayout::discard())]);
    let mut settings = harness.settings(layout);
    settings.read_timeout_ms = 300;
    let simulator = Simulator::new(settings).expect("simulator");

    // INFO.OUT is a pipe nobody writes, so the run times out on it after
    // the batch file was consumed.
    let err = simulator
        .run_with_mode(&maize_descriptor(), RunMode::Batch)
        .expect_err("INFO.OUT never written");
    assert!(err.is_timeout());
    assert_eq!(err.channel(), Some("INFO.OUT"));

    let args = fs::read_to_string(harness.path("seen/args.txt")).expect("args");
    assert!(args.starts_with("B BTCH"));
    assert!(args.trim_end().ends_with(".v47"));
    let batch = fs::read_to_string(harness.path("seen/batch.txt")).expect("batch");
    assert!(batch.starts_with("$BATCH(MAIZE)\n"));
    assert!(batch.contains("PIPE0001.EXP"));
    assert_eq!(harness.run_dirs(), 0);
}

#[test]
fn unread_batch_pipe_is_released_at_teardown() {
    let harness = Harness::new("cat {fixtures}/PlantGro.OUT > PlantGro.OUT\n");
    let layout = CropLayout::from([("PlantGro.OUT".to_string(), OutputLayout::table(4))]);
    let simulator = Simulator::new(harness.settings(layout)).expect("simulator");

    let result = simulator
        .run_with_mode(&maize_descriptor(), RunMode::Batch)
        .expect("stranded writer is not a failure");
    assert_eq!(result.plant_growth().map(|table| table.row_count()), Some(20));
    assert_eq!(harness.run_dirs(), 0);
}

#[test]
fn timeout_on_one_channel_still_removes_the_run_directory() {
    let harness = Harness::new("cat {fixtures}/PlantGro.OUT > PlantGro.OUT\n");
    let layout = CropLayout::from([
        ("PlantGro.OUT".to_string(), OutputLayout::table(4)),
        ("ET.OUT".to_string(), OutputLayout::table(4)),
    ]);
    let mut settings = harness.settings(layout);
    settings.read_timeout_ms = 250;
    let simulator = Simulator::new(settings).expect("simulator");

    let err = simulator.run(&maize_descriptor()).expect_err("ET.OUT times out");
    assert!(matches!(
        err,
        SimulationError::SimulationTimeout { ref channel, timeout_ms: 250 } if channel == "ET.OUT"
    ));
    assert_eq!(harness.run_dirs(), 0);
}

#[test]
fn unresolved_soil_fails_before_any_directory_or_launch() {
    let harness = Harness::new(FULL_MODEL);
    let simulator = Simulator::new(harness.settings(growth_layout())).expect("simulator");
    let mut descriptor = maize_descriptor();
    descriptor.soil_code = None;

    let err = simulator.run(&descriptor).expect_err("no soil");
    assert!(matches!(
        err,
        SimulationError::Format(FormatError::MissingResolution { what: "soil" })
    ));
    assert_eq!(harness.run_dirs(), 0);
    assert!(!harness.path("seen/args.txt").exists());
}

#[test]
fn missing_or_ambiguous_executable_is_rejected_at_construction() {
    let dir = tempdir().expect("tempdir");
    let err = Simulator::new(Settings::new(dir.path())).expect_err("no binary");
    assert!(matches!(err, SimulationError::ExecutableNotFound { .. }));

    for sub in ["a", "b"] {
        fs::create_dir(dir.path().join(sub)).expect("subdir");
        write_script(&dir.path().join(sub).join("dscsm047"), "#!/bin/sh\n");
    }
    let mut settings = Settings::new(dir.path());
    settings.recursive_search = true;
    let err = Simulator::new(settings).expect_err("two binaries");
    assert!(matches!(
        err,
        SimulationError::AmbiguousExecutable { count: 2, .. }
    ));
}

#[test]
fn forecast_mode_without_parameters_is_rejected() {
    let harness = Harness::new(FULL_MODEL);
    let simulator = Simulator::new(harness.settings(growth_layout())).expect("simulator");
    let err = simulator
        .run_with_mode(&maize_descriptor(), RunMode::Forecast)
        .expect_err("no forecast params");
    assert!(matches!(
        err,
        SimulationError::Format(FormatError::InvalidForecast(_))
    ));
    assert_eq!(harness.run_dirs(), 0);
}
