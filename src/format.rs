pub mod batch;
pub mod dates;
pub mod experiment;
pub mod soil;
pub mod table;
pub mod template;
pub mod weather;

pub use batch::render_batch;
pub use experiment::render_experiment;
pub use soil::render_soil;
pub use weather::render_weather;

use crate::descriptor::{RunDescriptor, SoilSource, WeatherSource};

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{what} is unresolved: supply either inline data or a code")]
    MissingResolution { what: &'static str },
    #[error("{what} is given both inline and as a code")]
    ConflictingSources { what: &'static str },
    #[error("required field `{field}` is missing")]
    MissingField { field: &'static str },
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("invalid forecast: {0}")]
    InvalidForecast(String),
    #[error("template error: {0}")]
    Template(String),
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
}

/// Codes assigned by the run for inline weather and soil data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCodes {
    pub weather_code: String,
    pub soil_profile_id: String,
}

/// Every payload one run delivers to the model. `weather` and `soil` are
/// present only when the descriptor carries inline data.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedInputs {
    pub experiment: String,
    pub weather: Option<String>,
    pub soil: Option<String>,
    pub batch: Option<String>,
    pub weather_code: String,
    pub soil_code: String,
}

/// Resolves codes and renders the input payloads for `descriptor`.
/// `batch_target` names the experiment file the batch control points at;
/// no batch payload is rendered without one.
pub fn render_inputs(
    descriptor: &RunDescriptor,
    template: &str,
    generated: &GeneratedCodes,
    batch_target: Option<&str>,
) -> Result<RenderedInputs, FormatError> {
    let (weather_code, weather) = match descriptor.weather_source()? {
        WeatherSource::Station(code) => (code.to_string(), None),
        WeatherSource::Inline(table) => {
            let rendered = render_weather(
                &generated.weather_code,
                &descriptor.location_name,
                descriptor.latitude,
                descriptor.longitude,
                &descriptor.site,
                table,
            )?;
            (generated.weather_code.clone(), Some(rendered))
        }
    };
    let (soil_code, soil) = match descriptor.soil_source()? {
        SoilSource::Code(code) => (code.to_string(), None),
        SoilSource::Inline(profile) => {
            let rendered = render_soil(
                &generated.soil_profile_id,
                descriptor.latitude,
                descriptor.longitude,
                profile,
            )?;
            (generated.soil_profile_id.clone(), Some(rendered))
        }
    };

    let experiment = render_experiment(
        template,
        descriptor,
        Some(&weather_code),
        Some(&soil_code),
    )?;
    let batch = batch_target
        .map(|target| render_batch(&descriptor.crop, target))
        .transpose()?;

    Ok(RenderedInputs {
        experiment,
        weather,
        soil,
        batch,
        weather_code,
        soil_code,
    })
}
