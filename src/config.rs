pub mod error;
pub mod layouts;
pub mod settings;

pub use error::ConfigError;
pub use layouts::{
    builtin_layouts, CropLayout, OutputLayout, ParseRule, OVERVIEW_CHANNEL, PLANT_GROWTH_CHANNEL,
};
pub use settings::{Settings, DEFAULT_EXECUTABLE_NAME, READ_TIMEOUT_ENV};
