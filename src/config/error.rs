#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
    #[error("output layout for crop `{crop}` is invalid: {reason}")]
    Layout { crop: String, reason: String },
    #[error("crop `{0}` has no output layout configured")]
    UnsupportedCrop(String),
    #[error("crop `{0}` has no experiment template")]
    MissingTemplate(String),
    #[error("failed to resolve current directory for run root: {0}")]
    CurrentDirUnavailable(#[source] std::io::Error),
}
