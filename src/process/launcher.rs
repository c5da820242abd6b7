use super::RunMode;
use crate::error::SimulationError;
use std::io;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub executable: &'a Path,
    pub working_dir: &'a Path,
    pub mode: RunMode,
    pub input_file: &'a str,
    pub suppress_stdout: bool,
}

impl LaunchRequest<'_> {
    pub fn command_form(&self) -> String {
        format!(
            "{} {} {}",
            self.executable.display(),
            self.mode.flag(),
            self.input_file
        )
    }
}

/// Starts the model inside the run directory. The caller owns the returned
/// child and must eventually reap or terminate it.
pub fn launch(request: &LaunchRequest<'_>) -> Result<Child, SimulationError> {
    let failed = |reason: String| SimulationError::LaunchFailed {
        working_dir: request.working_dir.display().to_string(),
        reason,
    };
    if !request.working_dir.is_dir() {
        return Err(failed("working directory no longer exists".to_string()));
    }

    let mut command = Command::new(request.executable);
    command
        .current_dir(request.working_dir)
        .arg(request.mode.flag())
        .arg(request.input_file)
        .stdin(Stdio::null());
    if request.suppress_stdout {
        command.stdout(Stdio::null());
    }

    match command.spawn() {
        Ok(child) => Ok(child),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if !request.working_dir.is_dir() {
                Err(failed("working directory no longer exists".to_string()))
            } else {
                Err(failed(format!(
                    "executable {} disappeared",
                    request.executable.display()
                )))
            }
        }
        Err(err) => Err(failed(err.to_string())),
    }
}

/// Waits up to `grace` for the child to exit on its own.
pub fn wait_with_grace(child: &mut Child, grace: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        match child.try_wait()? {
            Some(status) => return Ok(Some(status)),
            None if start.elapsed() >= grace => return Ok(None),
            None => thread::sleep(Duration::from_millis(10)),
        }
    }
}

/// Kills and reaps the child. An already exited child is not an error.
pub fn terminate(child: &mut Child) -> Option<ExitStatus> {
    let _ = child.kill();
    child.wait().ok()
}
