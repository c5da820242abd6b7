use crate::channels::spec::{BATCH_CHANNEL, EXPERIMENT_CHANNEL, SOIL_CHANNEL, WEATHER_CHANNEL};
use crate::channels::{Channel, ChannelKind, ChannelSpec, RunArtifacts, RunIdentity};
use crate::config::{CropLayout, Settings, PLANT_GROWTH_CHANNEL};
use crate::coordinator::{ReadCoordinator, ReadOutcome, ReadRequest, WriteCoordinator};
use crate::descriptor::RunDescriptor;
use crate::error::SimulationError;
use crate::format::{render_inputs, FormatError, GeneratedCodes, RenderedInputs};
use crate::lifecycle::LifecycleManager;
use crate::logging::RunLog;
use crate::process::{launch, locate_executable, wait_with_grace, LaunchRequest, RunMode};
use crate::results::{parse_overview, RunResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs simulations against one installed model executable, resolved once
/// at construction.
#[derive(Debug, Clone)]
pub struct Simulator {
    settings: Settings,
    executable: PathBuf,
    log: RunLog,
}

impl Simulator {
    pub fn new(settings: Settings) -> Result<Self, SimulationError> {
        settings.validate()?;
        let executable = locate_executable(
            &settings.install_dir,
            &settings.executable_name,
            settings.recursive_search,
        )?;
        let log = RunLog::new(settings.log_path.clone());
        Ok(Self {
            settings,
            executable,
            log,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn run(&self, descriptor: &RunDescriptor) -> Result<RunResult, SimulationError> {
        self.run_with_mode(descriptor, self.settings.default_mode)
    }

    /// Runs one simulation. Descriptors with forecast parameters always run
    /// in forecast mode.
    pub fn run_with_mode(
        &self,
        descriptor: &RunDescriptor,
        mode: RunMode,
    ) -> Result<RunResult, SimulationError> {
        descriptor.validate()?;
        let mode = match (&descriptor.forecast, mode) {
            (Some(_), _) => RunMode::Forecast,
            (None, RunMode::Forecast) => {
                return Err(FormatError::InvalidForecast(
                    "forecast mode needs forecast parameters".to_string(),
                )
                .into())
            }
            (None, mode) => mode,
        };
        let layout = self.settings.layout_for(&descriptor.crop)?;
        let template = self.settings.experiment_template(&descriptor.crop)?;
        let run_root = self.settings.resolve_run_root()?;

        let mut lifecycle = LifecycleManager::new(&run_root, self.log.clone());
        let inputs = render_for(descriptor, &template, lifecycle.identity(), mode)?;
        let plan = RunPlan {
            descriptor,
            template: &template,
            layout: &layout,
            mode,
        };

        self.log.info(
            "run.started",
            &format!(
                "crop={} mode={} run_root={}",
                descriptor.crop_key(),
                mode.as_str(),
                run_root.display()
            ),
        );

        let mut writes = None;
        let outcome = self.execute(&mut lifecycle, &plan, inputs, &mut writes);

        lifecycle.teardown();
        let write_reports = writes
            .map(WriteCoordinator::join_all)
            .unwrap_or_default();

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                self.log.error("run.failed", &err.to_string());
                return Err(err);
            }
        };
        for report in write_reports {
            report.into_result()?;
        }
        self.log.info(
            "run.completed",
            &format!(
                "tables={} growth_stages={}",
                result.tables.len(),
                result.growth_stages().len()
            ),
        );
        Ok(result)
    }

    fn execute(
        &self,
        lifecycle: &mut LifecycleManager,
        plan: &RunPlan<'_>,
        mut inputs: RenderedInputs,
        writes: &mut Option<WriteCoordinator>,
    ) -> Result<RunResult, SimulationError> {
        let rendered_for = lifecycle.identity();
        lifecycle.create_directory()?;
        if lifecycle.identity() != rendered_for {
            // a stale directory forced a new identity, and with it new codes
            inputs = render_for(
                plan.descriptor,
                plan.template,
                lifecycle.identity(),
                plan.mode,
            )?;
        }
        let (layout, mode) = (plan.layout, plan.mode);

        let artifacts = lifecycle.identity().artifacts();
        let specs = channel_specs(
            &inputs,
            layout,
            &artifacts,
            self.settings.weather_dir.as_deref(),
        );
        let channels = lifecycle.declare_channels(&specs)?;

        let payloads = input_payloads(&channels, &inputs);
        let coordinator = writes.insert(WriteCoordinator::dispatch(payloads, &self.log)?);
        coordinator.join_regular_files()?;
        lifecycle.activate()?;

        let batch_file = artifacts.batch_file();
        let input_file = if mode.uses_batch_file() {
            batch_file.as_str()
        } else {
            artifacts.experiment_file()
        };
        let request = LaunchRequest {
            executable: &self.executable,
            working_dir: lifecycle.dir(),
            mode,
            input_file,
            suppress_stdout: self.settings.suppress_stdout,
        };
        let child = launch(&request)?;
        self.log.info(
            "process.launched",
            &format!("pid={} command={}", child.id(), request.command_form()),
        );
        lifecycle.attach_child(child);

        let (pipes, files): (Vec<ReadRequest>, Vec<ReadRequest>) = channels
            .iter()
            .filter_map(|channel| {
                layout.get(channel.name()).map(|output| ReadRequest {
                    channel: channel.clone(),
                    rule: output.rule(),
                })
            })
            .partition(|request| request.channel.kind() == ChannelKind::Pipe);

        let reader = ReadCoordinator::new(self.settings.read_timeout(), &self.log);
        let mut report = reader.drain(pipes);
        let exit_code = self.await_exit(lifecycle);
        report.merge(reader.drain(files));

        let mut tables = BTreeMap::new();
        let mut raw_report = None;
        for (channel, outcome) in report.into_outcomes()? {
            match outcome {
                ReadOutcome::Table(table) => {
                    tables.insert(channel, table);
                }
                ReadOutcome::Report(raw) => raw_report = Some(raw),
                ReadOutcome::Discarded | ReadOutcome::Absent => {}
            }
        }
        let overview =
            raw_report.map(|raw| parse_overview(&raw, tables.get(PLANT_GROWTH_CHANNEL)));

        Ok(RunResult {
            tables,
            overview,
            exit_code,
        })
    }

    fn await_exit(&self, lifecycle: &mut LifecycleManager) -> Option<i32> {
        let child = lifecycle.child_mut()?;
        match wait_with_grace(child, self.settings.exit_grace()) {
            Ok(Some(status)) => {
                self.log
                    .info("process.exited", &format!("status={status}"));
                status.code()
            }
            Ok(None) => {
                self.log.warn(
                    "process.exited",
                    &format!(
                        "still running after {}ms; teardown will kill it",
                        self.settings.exit_grace_ms
                    ),
                );
                None
            }
            Err(err) => {
                self.log
                    .warn("process.exited", &format!("wait failed: {err}"));
                None
            }
        }
    }
}

struct RunPlan<'a> {
    descriptor: &'a RunDescriptor,
    template: &'a str,
    layout: &'a CropLayout,
    mode: RunMode,
}

fn render_for(
    descriptor: &RunDescriptor,
    template: &str,
    identity: RunIdentity,
    mode: RunMode,
) -> Result<RenderedInputs, SimulationError> {
    let artifacts = identity.artifacts();
    let generated = GeneratedCodes {
        weather_code: artifacts.weather_code(),
        soil_profile_id: artifacts.soil_profile_id(),
    };
    let batch_target = mode
        .uses_batch_file()
        .then(|| artifacts.experiment_file());
    Ok(render_inputs(descriptor, template, &generated, batch_target)?)
}

/// The experiment, weather and soil inputs are rewound by the model and so
/// are regular files; the batch control is read once through a pipe.
fn channel_specs(
    inputs: &RenderedInputs,
    layout: &CropLayout,
    artifacts: &RunArtifacts,
    weather_dir: Option<&Path>,
) -> Vec<ChannelSpec> {
    let mut specs = vec![ChannelSpec::input(
        EXPERIMENT_CHANNEL,
        artifacts.experiment_file(),
        ChannelKind::File,
    )];
    if inputs.weather.is_some() {
        let spec = ChannelSpec::input(
            WEATHER_CHANNEL,
            &artifacts.weather_file(),
            ChannelKind::File,
        );
        specs.push(match weather_dir {
            Some(dir) => spec.located_in(dir.to_path_buf()),
            None => spec,
        });
    }
    if inputs.soil.is_some() {
        specs.push(ChannelSpec::input(
            SOIL_CHANNEL,
            artifacts.soil_file(),
            ChannelKind::File,
        ));
    }
    if inputs.batch.is_some() {
        specs.push(ChannelSpec::input(
            BATCH_CHANNEL,
            &artifacts.batch_file(),
            ChannelKind::Pipe,
        ));
    }
    for (name, output) in layout {
        specs.push(ChannelSpec::output(name, output.kind));
    }
    specs
}

fn input_payloads(
    channels: &[Arc<Channel>],
    inputs: &RenderedInputs,
) -> Vec<(Arc<Channel>, String)> {
    channels
        .iter()
        .filter_map(|channel| {
            let payload = match channel.name() {
                EXPERIMENT_CHANNEL => Some(&inputs.experiment),
                WEATHER_CHANNEL => inputs.weather.as_ref(),
                SOIL_CHANNEL => inputs.soil.as_ref(),
                BATCH_CHANNEL => inputs.batch.as_ref(),
                _ => None,
            }?;
            Some((channel.clone(), payload.clone()))
        })
        .collect()
}
