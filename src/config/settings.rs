use super::layouts::{builtin_layouts, validate_layout, CropLayout};
use super::ConfigError;
use crate::format::template::builtin_template;
use crate::process::RunMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_EXECUTABLE_NAME: &str = "dscsm047";
pub const READ_TIMEOUT_ENV: &str = "DABBLER_READ_TIMEOUT_MS";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub install_dir: PathBuf,
    #[serde(default = "default_executable_name")]
    pub executable_name: String,
    #[serde(default)]
    pub recursive_search: bool,
    #[serde(default)]
    pub run_root: Option<PathBuf>,
    #[serde(default)]
    pub weather_dir: Option<PathBuf>,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_exit_grace_ms")]
    pub exit_grace_ms: u64,
    #[serde(default = "default_true")]
    pub suppress_stdout: bool,
    #[serde(default)]
    pub default_mode: RunMode,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub experiment_templates: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub layouts: BTreeMap<String, CropLayout>,
}

fn default_executable_name() -> String {
    DEFAULT_EXECUTABLE_NAME.to_string()
}

fn default_read_timeout_ms() -> u64 {
    3000
}

fn default_exit_grace_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            executable_name: default_executable_name(),
            recursive_search: false,
            run_root: None,
            weather_dir: None,
            read_timeout_ms: default_read_timeout_ms(),
            exit_grace_ms: default_exit_grace_ms(),
            suppress_stdout: true,
            default_mode: RunMode::default(),
            log_path: None,
            experiment_templates: BTreeMap::new(),
            layouts: BTreeMap::new(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings: Settings =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        settings.layouts = settings
            .layouts
            .into_iter()
            .map(|(crop, layout)| (crop.to_ascii_lowercase(), layout))
            .collect();
        settings.experiment_templates = settings
            .experiment_templates
            .into_iter()
            .map(|(crop, template)| (crop.to_ascii_lowercase(), template))
            .collect();
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.install_dir.as_os_str().is_empty() {
            return Err(ConfigError::Settings(
                "install_dir must be non-empty".to_string(),
            ));
        }
        if self.executable_name.trim().is_empty() || self.executable_name.contains('/') {
            return Err(ConfigError::Settings(
                "executable_name must be a bare file name".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Settings(
                "read_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.exit_grace_ms == 0 {
            return Err(ConfigError::Settings(
                "exit_grace_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_mode == RunMode::Forecast {
            return Err(ConfigError::Settings(
                "default_mode must be `all` or `batch`; forecast runs are selected per descriptor"
                    .to_string(),
            ));
        }
        for (crop, layout) in &self.layouts {
            validate_layout(crop, layout)?;
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        if let Some(milliseconds) = std::env::var(READ_TIMEOUT_ENV)
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|value| *value > 0)
        {
            return Duration::from_millis(milliseconds);
        }
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }

    pub fn resolve_run_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.run_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().map_err(ConfigError::CurrentDirUnavailable),
        }
    }

    pub fn layout_for(&self, crop: &str) -> Result<CropLayout, ConfigError> {
        let crop = crop.trim().to_ascii_lowercase();
        if let Some(layout) = self.layouts.get(&crop) {
            return Ok(layout.clone());
        }
        builtin_layouts()
            .remove(&crop)
            .ok_or(ConfigError::UnsupportedCrop(crop))
    }

    pub fn experiment_template(&self, crop: &str) -> Result<String, ConfigError> {
        let crop = crop.trim().to_ascii_lowercase();
        if let Some(path) = self.experiment_templates.get(&crop) {
            return fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
        builtin_template(&crop)
            .map(str::to_string)
            .ok_or(ConfigError::MissingTemplate(crop))
    }
}
