use super::fifo;
use super::spec::{ChannelKind, ChannelSpec, Direction};
use crate::error::{io_error, SimulationError};
use crate::logging::RunLog;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Created,
    OpenPending,
    Completed,
    Removed,
}

impl ChannelState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::OpenPending => 1,
            Self::Completed => 2,
            Self::Removed => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::OpenPending,
            2 => Self::Completed,
            _ => Self::Removed,
        }
    }
}

/// One filesystem object exchanged with the model. Shared between the set
/// that owns its path and the worker that services it.
#[derive(Debug)]
pub struct Channel {
    name: String,
    path: PathBuf,
    direction: Direction,
    kind: ChannelKind,
    state: AtomicU8,
    released: AtomicBool,
}

impl Channel {
    fn new(spec: &ChannelSpec, path: PathBuf) -> Self {
        Self {
            name: spec.name.clone(),
            path,
            direction: spec.direction,
            kind: spec.kind,
            state: AtomicU8::new(ChannelState::Created.as_u8()),
            released: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn mark(&self, state: ChannelState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Set once teardown has released a pending writer.
    pub fn was_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Every channel of one run. Paths are tracked as soon as they exist on
/// disk, so a partially declared set still removes everything it made.
#[derive(Debug)]
pub struct ChannelSet {
    dir: PathBuf,
    channels: Vec<Arc<Channel>>,
}

impl ChannelSet {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            channels: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn declare(&mut self, spec: &ChannelSpec) -> Result<Arc<Channel>, SimulationError> {
        let parent = spec.location.as_deref().unwrap_or(&self.dir);
        let path = parent.join(&spec.file_name);
        match (spec.direction, spec.kind) {
            (_, ChannelKind::Pipe) => {
                fifo::make_fifo(&path).map_err(|source| io_error(&path, source))?;
            }
            (Direction::Input, ChannelKind::File) => {
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .map_err(|source| io_error(&path, source))?;
            }
            // created by the model
            (Direction::Output, ChannelKind::File) => {}
        }
        let channel = Arc::new(Channel::new(spec, path));
        self.channels.push(channel.clone());
        Ok(channel)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Channel>> {
        self.channels.iter().find(|channel| channel.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Channel>> {
        self.channels.iter()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Arc<Channel>> {
        self.iter()
            .filter(|channel| channel.direction() == Direction::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Arc<Channel>> {
        self.iter()
            .filter(|channel| channel.direction() == Direction::Output)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Paths that live outside the run directory.
    pub fn external_paths(&self) -> Vec<PathBuf> {
        self.iter()
            .map(|channel| channel.path().to_path_buf())
            .filter(|path| !path.starts_with(&self.dir))
            .collect()
    }

    /// Releases every input-pipe writer still waiting for the model. A
    /// released writer stops waiting for a reader, and a write failing from
    /// here on is reported as released rather than failed.
    pub fn release_pending_writers(&self, log: &RunLog) {
        let pending = self.inputs().filter(|channel| {
            channel.kind() == ChannelKind::Pipe && channel.state() == ChannelState::OpenPending
        });
        for channel in pending {
            channel.released.store(true, Ordering::SeqCst);
            log.debug(
                "write.released",
                &format!("channel={} path={}", channel.name(), channel.path().display()),
            );
        }
    }

    /// Deletes every channel object. Safe to call repeatedly.
    pub fn remove_all(&self, log: &RunLog) {
        for channel in &self.channels {
            if channel.state() == ChannelState::Removed {
                continue;
            }
            match fs::remove_file(channel.path()) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => log.warn(
                    "teardown.channel",
                    &format!("path={} error={err}", channel.path().display()),
                ),
            }
            channel.mark(ChannelState::Removed);
        }
    }
}
