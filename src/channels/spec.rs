use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const EXPERIMENT_CHANNEL: &str = "EXP";
pub const WEATHER_CHANNEL: &str = "WTH";
pub const SOIL_CHANNEL: &str = "SOL";
pub const BATCH_CHANNEL: &str = "BATCH";

pub const EXPERIMENT_FILE: &str = "PIPE0001.EXP";
pub const SOIL_FILE: &str = "SOIL.SOL";
pub const RUN_DIR_PREFIX: &str = "DSSAT_IO_";

/// Backing object of a channel. Inputs the model rewinds must be files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[default]
    Pipe,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Written by us, read by the model.
    Input,
    /// Written by the model, read by us.
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub name: String,
    pub file_name: String,
    pub direction: Direction,
    pub kind: ChannelKind,
    /// Directory outside the run directory the channel lives in.
    pub location: Option<PathBuf>,
}

impl ChannelSpec {
    pub fn input(name: &str, file_name: &str, kind: ChannelKind) -> Self {
        Self {
            name: name.to_string(),
            file_name: file_name.to_string(),
            direction: Direction::Input,
            kind,
            location: None,
        }
    }

    pub fn output(file_name: &str, kind: ChannelKind) -> Self {
        Self {
            name: file_name.to_string(),
            file_name: file_name.to_string(),
            direction: Direction::Output,
            kind,
            location: None,
        }
    }

    pub fn located_in(mut self, dir: PathBuf) -> Self {
        self.location = Some(dir);
        self
    }
}

/// Identity of one run: owning process plus a per-process sequence number,
/// so concurrent runs in one process never share a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunIdentity {
    pub pid: u32,
    pub seq: u64,
}

impl RunIdentity {
    pub fn dir_name(&self) -> String {
        format!("{RUN_DIR_PREFIX}{}_{}", self.pid, self.seq)
    }

    /// Four-digit suffix embedded in generated file names.
    pub fn suffix(&self) -> u16 {
        ((u64::from(self.pid) % 10_000 + self.seq) % 10_000) as u16
    }

    pub fn artifacts(&self) -> RunArtifacts {
        RunArtifacts {
            suffix: self.suffix(),
            profile_number: (u64::from(self.pid) * 1_000 + self.seq) % 100_000_000,
        }
    }
}

/// File names and generated codes for one run's input artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunArtifacts {
    suffix: u16,
    profile_number: u64,
}

impl RunArtifacts {
    pub fn experiment_file(&self) -> &'static str {
        EXPERIMENT_FILE
    }

    pub fn weather_code(&self) -> String {
        format!("PIPE{:04}", self.suffix)
    }

    pub fn weather_file(&self) -> String {
        format!("{}.WTH", self.weather_code())
    }

    pub fn soil_file(&self) -> &'static str {
        SOIL_FILE
    }

    pub fn soil_profile_id(&self) -> String {
        format!("DB{:08}", self.profile_number)
    }

    pub fn batch_file(&self) -> String {
        format!("BTCH{:04}.v47", self.suffix)
    }
}
