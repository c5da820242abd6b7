use crate::descriptor::RunDescriptor;
use crate::process::RunMode;
use crate::results::RunResult;
use crate::simulator::Simulator;
use crate::Settings;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Check,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "check" => CliVerb::Check,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn help_text() -> String {
    [
        "Usage: dabbler <command> [options]",
        "",
        "Commands:",
        "  run --config <settings.yaml> --descriptor <run.yaml> [--mode all|batch] [--json]",
        "                                       Run one simulation and summarize its outputs",
        "  check --config <settings.yaml>       Validate settings and locate the model executable",
        "  help                                 Show this help",
    ]
    .join("\n")
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RunArgs {
    config: Option<PathBuf>,
    descriptor: Option<PathBuf>,
    mode: Option<RunMode>,
    json: bool,
}

fn parse_run_args(args: &[String]) -> Result<RunArgs, String> {
    let mut parsed = RunArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("`{flag}` requires a value"))
        };
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--descriptor" => parsed.descriptor = Some(PathBuf::from(value("--descriptor")?)),
            "--mode" => {
                parsed.mode = Some(match value("--mode")?.as_str() {
                    "all" => RunMode::All,
                    "batch" => RunMode::Batch,
                    other => {
                        return Err(format!(
                            "unknown mode `{other}`; expected `all` or `batch`"
                        ))
                    }
                })
            }
            "--json" => parsed.json = true,
            other => return Err(format!("unexpected argument `{other}`")),
        }
    }
    Ok(parsed)
}

fn load_simulator(config: Option<PathBuf>) -> Result<Simulator, String> {
    let path = config.ok_or_else(|| "`--config <settings.yaml>` is required".to_string())?;
    let settings = Settings::from_path(&path).map_err(|err| err.to_string())?;
    Simulator::new(settings).map_err(|err| err.to_string())
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Run => cmd_run(&args[1..]),
        CliVerb::Check => cmd_check(&args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}

fn cmd_check(args: &[String]) -> Result<String, String> {
    let parsed = parse_run_args(args)?;
    let simulator = load_simulator(parsed.config)?;
    Ok(format!("executable={}", simulator.executable().display()))
}

fn cmd_run(args: &[String]) -> Result<String, String> {
    let parsed = parse_run_args(args)?;
    let descriptor_path = parsed
        .descriptor
        .ok_or_else(|| "`--descriptor <run.yaml>` is required".to_string())?;
    let simulator = load_simulator(parsed.config)?;
    let descriptor =
        RunDescriptor::from_yaml_path(&descriptor_path).map_err(|err| err.to_string())?;

    let mode = parsed.mode.unwrap_or(simulator.settings().default_mode);
    let result = simulator
        .run_with_mode(&descriptor, mode)
        .map_err(|err| err.to_string())?;

    if parsed.json {
        return serde_json::to_string_pretty(&result).map_err(|err| err.to_string());
    }
    Ok(summarize(&result))
}

fn summarize(result: &RunResult) -> String {
    let mut lines = Vec::new();
    if let Some(code) = result.exit_code {
        lines.push(format!("exit_code={code}"));
    }
    for (name, table) in &result.tables {
        let span = match (table.index().first(), table.index().last()) {
            (Some(first), Some(last)) => format!(" index={first}..{last}"),
            _ => String::new(),
        };
        lines.push(format!(
            "table={name} rows={} columns={}{span}",
            table.row_count(),
            table.columns().len()
        ));
    }
    if let Some(crop) = result.crop_info() {
        lines.push(format!("crop_info={crop}"));
    }
    for stage in result.growth_stages() {
        let bound = |value: Option<i64>| value.map_or("-".to_string(), |v| v.to_string());
        lines.push(format!(
            "stage={} code={} start={} end={}",
            stage.name,
            stage.code,
            bound(stage.start),
            bound(stage.end)
        ));
    }
    lines.join("\n")
}
