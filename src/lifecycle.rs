pub mod registry;
pub mod signals;

use crate::channels::{Channel, ChannelSet, ChannelSpec, RunIdentity};
use crate::error::{io_error, SimulationError};
use crate::logging::RunLog;
use crate::process::launcher;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const MAX_DIR_ATTEMPTS: usize = 16;

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    DirectoryCreated,
    ChannelsCreated,
    Active,
    TearingDown,
    Removed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::DirectoryCreated => "directory-created",
            Self::ChannelsCreated => "channels-created",
            Self::Active => "active",
            Self::TearingDown => "tearing-down",
            Self::Removed => "removed",
        }
    }
}

fn next_identity() -> RunIdentity {
    RunIdentity {
        pid: std::process::id(),
        seq: RUN_SEQ.fetch_add(1, Ordering::SeqCst),
    }
}

/// Owns the working directory, channels and child process of one run and
/// removes all of them on teardown, on drop, or on a termination signal.
#[derive(Debug)]
pub struct LifecycleManager {
    run_root: PathBuf,
    identity: RunIdentity,
    state: LifecycleState,
    channels: ChannelSet,
    child: Option<Child>,
    log: RunLog,
}

impl LifecycleManager {
    pub fn new(run_root: &Path, log: RunLog) -> Self {
        let identity = next_identity();
        Self {
            run_root: run_root.to_path_buf(),
            identity,
            state: LifecycleState::Uninitialized,
            channels: ChannelSet::new(&run_root.join(identity.dir_name())),
            child: None,
            log,
        }
    }

    pub fn identity(&self) -> RunIdentity {
        self.identity
    }

    pub fn dir(&self) -> &Path {
        self.channels.dir()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn child_mut(&mut self) -> Option<&mut Child> {
        self.child.as_mut()
    }

    fn transition(
        &mut self,
        expected: LifecycleState,
        next: LifecycleState,
    ) -> Result<(), SimulationError> {
        if self.state != expected {
            return Err(SimulationError::InvalidTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Creates a fresh working directory and registers it for cleanup on
    /// termination signals.
    pub fn create_directory(&mut self) -> Result<&Path, SimulationError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(SimulationError::InvalidTransition {
                from: self.state.as_str(),
                to: LifecycleState::DirectoryCreated.as_str(),
            });
        }
        signals::install_termination_handler(&self.log);

        let mut attempts = 0;
        loop {
            let dir = self.run_root.join(self.identity.dir_name());
            match fs::create_dir(&dir) {
                Ok(()) => {
                    self.channels = ChannelSet::new(&dir);
                    break;
                }
                Err(err)
                    if err.kind() == io::ErrorKind::AlreadyExists
                        && attempts < MAX_DIR_ATTEMPTS =>
                {
                    attempts += 1;
                    self.identity = next_identity();
                }
                Err(err) => return Err(io_error(&dir, err)),
            }
        }

        registry::register(self.identity, self.dir().to_path_buf());
        self.state = LifecycleState::DirectoryCreated;
        self.log.debug(
            "run.directory",
            &format!("dir={}", self.dir().display()),
        );
        Ok(self.dir())
    }

    pub fn declare_channels(
        &mut self,
        specs: &[ChannelSpec],
    ) -> Result<Vec<Arc<Channel>>, SimulationError> {
        self.transition(
            LifecycleState::DirectoryCreated,
            LifecycleState::ChannelsCreated,
        )?;
        let mut declared = Vec::with_capacity(specs.len());
        for spec in specs {
            let result = self.channels.declare(spec);
            if let Ok(channel) = &result {
                if !channel.path().starts_with(self.dir()) {
                    registry::track_paths(self.identity, vec![channel.path().to_path_buf()]);
                }
            }
            declared.push(result?);
        }
        self.log.info(
            "channels.created",
            &format!(
                "dir={} channels={}",
                self.dir().display(),
                self.channels
                    .iter()
                    .map(|channel| channel.name())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        );
        Ok(declared)
    }

    pub fn activate(&mut self) -> Result<(), SimulationError> {
        self.transition(LifecycleState::ChannelsCreated, LifecycleState::Active)
    }

    pub fn attach_child(&mut self, child: Child) {
        registry::set_child(self.identity, Some(child.id()));
        self.child = Some(child);
    }

    /// Kills the child, deletes every channel and removes the working
    /// directory. Never fails and is safe to call any number of times.
    pub fn teardown(&mut self) {
        if self.state == LifecycleState::Removed {
            return;
        }
        let previous = self.state;
        self.state = LifecycleState::TearingDown;

        self.channels.release_pending_writers(&self.log);
        if let Some(mut child) = self.child.take() {
            launcher::terminate(&mut child);
        }
        registry::set_child(self.identity, None);
        self.channels.remove_all(&self.log);

        if previous != LifecycleState::Uninitialized {
            sweep_dir(self.dir());
            match fs::remove_dir(self.dir()) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => self.log.warn(
                    "teardown.directory",
                    &format!("dir={} error={err}", self.dir().display()),
                ),
            }
        }
        registry::unregister(self.identity);
        self.state = LifecycleState::Removed;
        self.log.info(
            "teardown.completed",
            &format!("dir={} from={}", self.dir().display(), previous.as_str()),
        );
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Removes every non-directory entry of `dir`, including the files the
/// model writes on its own.
pub(crate) fn sweep_dir(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let is_dir = entry
            .file_type()
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if !is_dir {
            let _ = fs::remove_file(entry.path());
        }
    }
}
