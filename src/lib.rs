pub mod channels;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod logging;
pub mod process;
pub mod results;
pub mod simulator;

pub use config::Settings;
pub use descriptor::RunDescriptor;
pub use error::SimulationError;
pub use process::RunMode;
pub use results::{GrowthStage, ResultTable, RunResult, Value};
pub use simulator::Simulator;
