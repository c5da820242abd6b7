pub mod install;
pub mod launcher;

pub use install::locate_executable;
pub use launcher::{launch, terminate, wait_with_grace, LaunchRequest};

use serde::{Deserialize, Serialize};

/// Execution mode passed to the model as its first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Every treatment of the experiment file.
    #[default]
    All,
    /// Treatments selected by the batch control file.
    Batch,
    /// Seasonal forecast driven by the batch control file.
    Forecast,
}

impl RunMode {
    pub fn flag(self) -> &'static str {
        match self {
            Self::All => "A",
            Self::Batch => "B",
            Self::Forecast => "Y",
        }
    }

    pub fn uses_batch_file(self) -> bool {
        !matches!(self, Self::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Batch => "batch",
            Self::Forecast => "forecast",
        }
    }
}
