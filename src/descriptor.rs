use crate::format::FormatError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_EXPERIMENT_ID: &str = "DFLT";
pub const DEFAULT_LOCATION_NAME: &str = "DFLT";

/// One simulation request. Consumed once by a run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunDescriptor {
    pub crop: String,
    pub model: String,
    pub cultivar: String,
    pub plant_date: NaiveDate,
    pub harvest_date: NaiveDate,
    pub simulation_start: NaiveDate,
    #[serde(default)]
    pub plant_end: Option<NaiveDate>,
    #[serde(default)]
    pub harvest_end: Option<NaiveDate>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub weather_data: Option<WeatherTable>,
    #[serde(default)]
    pub weather_station_code: Option<String>,
    #[serde(default)]
    pub soil_data: Option<SoilProfile>,
    #[serde(default)]
    pub soil_code: Option<String>,
    #[serde(default)]
    pub site: SiteMetadata,
    #[serde(default = "default_experiment_id")]
    pub experiment_id: String,
    #[serde(default = "default_location_name")]
    pub location_name: String,
    #[serde(default)]
    pub forecast: Option<ForecastParams>,
    #[serde(default)]
    pub irrigation: IrrigationPolicy,
}

fn default_experiment_id() -> String {
    DEFAULT_EXPERIMENT_ID.to_string()
}

fn default_location_name() -> String {
    DEFAULT_LOCATION_NAME.to_string()
}

/// Optional environmental metadata for the weather header. Absent values
/// render as the missing-value sentinel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SiteMetadata {
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub average_temperature: Option<f64>,
    #[serde(default)]
    pub temperature_amplitude: Option<f64>,
    #[serde(default)]
    pub weather_reference_height: Option<f64>,
    #[serde(default)]
    pub wind_reference_height: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ForecastParams {
    pub start: NaiveDate,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationPolicy {
    Reported,
    #[default]
    None,
    Automatic,
}

impl IrrigationPolicy {
    pub fn code(self) -> char {
        match self {
            Self::Reported => 'R',
            Self::None => 'N',
            Self::Automatic => 'A',
        }
    }
}

/// Daily weather rows. Optional columns that are absent for a row render as
/// the missing-value sentinel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct WeatherTable {
    pub rows: Vec<WeatherRow>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WeatherRow {
    pub date: NaiveDate,
    pub srad: f64,
    pub tmax: f64,
    pub tmin: f64,
    pub rain: f64,
    #[serde(default)]
    pub dewp: Option<f64>,
    #[serde(default)]
    pub wind: Option<f64>,
    #[serde(default)]
    pub par: Option<f64>,
    #[serde(default)]
    pub evap: Option<f64>,
    #[serde(default)]
    pub rhum: Option<f64>,
}

impl WeatherTable {
    pub fn new(rows: Vec<WeatherRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn mean_temperature(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        let total: f64 = self
            .rows
            .iter()
            .map(|row| (row.tmax + row.tmin) / 2.0)
            .sum();
        Some(total / self.rows.len() as f64)
    }
}

/// A soil profile for one site: a matched reference-family code, a surface
/// property row, and one entry per depth horizon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SoilProfile {
    pub family: String,
    #[serde(default)]
    pub surface: SoilSurface,
    pub layers: Vec<SoilLayer>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SoilSurface {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub albedo: Option<f64>,
    #[serde(default)]
    pub evaporation_limit: Option<f64>,
    #[serde(default)]
    pub drainage_rate: Option<f64>,
    #[serde(default)]
    pub runoff_curve: Option<f64>,
    #[serde(default = "default_factor")]
    pub mineralization_factor: f64,
    #[serde(default = "default_factor")]
    pub photosynthesis_factor: f64,
}

fn default_factor() -> f64 {
    1.0
}

impl Default for SoilSurface {
    fn default() -> Self {
        Self {
            color: None,
            albedo: None,
            evaporation_limit: None,
            drainage_rate: None,
            runoff_curve: None,
            mineralization_factor: default_factor(),
            photosynthesis_factor: default_factor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SoilLayer {
    pub depth: u32,
    pub master_horizon: String,
    pub lower_limit: f64,
    pub drained_upper_limit: f64,
    pub saturation: f64,
    pub root_growth_factor: f64,
    pub saturated_conductivity: f64,
    pub bulk_density: f64,
    pub organic_carbon: f64,
    pub clay: f64,
    pub silt: f64,
    #[serde(default)]
    pub coarse_fraction: Option<f64>,
    pub total_nitrogen: f64,
    pub ph_water: f64,
    #[serde(default)]
    pub ph_buffer: Option<f64>,
    pub cation_exchange: f64,
    #[serde(default)]
    pub sorption_coefficient: Option<f64>,
}

impl SoilProfile {
    pub fn max_depth(&self) -> Option<u32> {
        self.layers.iter().map(|layer| layer.depth).max()
    }
}

/// Where the weather for a run comes from once resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeatherSource<'a> {
    Station(&'a str),
    Inline(&'a WeatherTable),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoilSource<'a> {
    Code(&'a str),
    Inline(&'a SoilProfile),
}

impl RunDescriptor {
    pub fn from_yaml_path(path: &Path) -> Result<Self, FormatError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FormatError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| FormatError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn crop_key(&self) -> String {
        self.crop.trim().to_ascii_lowercase()
    }

    pub fn plant_window_end(&self) -> NaiveDate {
        self.plant_end.unwrap_or(self.plant_date)
    }

    pub fn harvest_window_end(&self) -> NaiveDate {
        self.harvest_end.unwrap_or(self.harvest_date)
    }

    pub fn weather_source(&self) -> Result<WeatherSource<'_>, FormatError> {
        let code = non_blank(self.weather_station_code.as_deref());
        match (code, &self.weather_data) {
            (Some(_), Some(_)) => Err(FormatError::ConflictingSources { what: "weather" }),
            (Some(code), None) => Ok(WeatherSource::Station(code)),
            (None, Some(table)) => Ok(WeatherSource::Inline(table)),
            (None, None) => Err(FormatError::MissingResolution { what: "weather" }),
        }
    }

    pub fn soil_source(&self) -> Result<SoilSource<'_>, FormatError> {
        let code = non_blank(self.soil_code.as_deref());
        match (code, &self.soil_data) {
            (Some(_), Some(_)) => Err(FormatError::ConflictingSources { what: "soil" }),
            (Some(code), None) => Ok(SoilSource::Code(code)),
            (None, Some(profile)) => Ok(SoilSource::Inline(profile)),
            (None, None) => Err(FormatError::MissingResolution { what: "soil" }),
        }
    }

    /// Checks everything that must hold before any channel is created.
    pub fn validate(&self) -> Result<(), FormatError> {
        required("crop", &self.crop)?;
        required("model", &self.model)?;
        required("cultivar", &self.cultivar)?;
        if self.experiment_id.len() != 4
            || !self
                .experiment_id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric())
        {
            return Err(FormatError::InvalidField {
                field: "experiment_id",
                reason: "must be exactly 4 ASCII letters or digits".to_string(),
            });
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(FormatError::InvalidField {
                field: "latitude",
                reason: format!("{} is outside [-90, 90]", self.latitude),
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(FormatError::InvalidField {
                field: "longitude",
                reason: format!("{} is outside [-180, 180]", self.longitude),
            });
        }
        if self.plant_window_end() < self.plant_date {
            return Err(FormatError::InvalidField {
                field: "plant_end",
                reason: "must not precede plant_date".to_string(),
            });
        }
        if self.harvest_window_end() < self.harvest_date {
            return Err(FormatError::InvalidField {
                field: "harvest_end",
                reason: "must not precede harvest_date".to_string(),
            });
        }
        if let Some(forecast) = &self.forecast {
            if forecast.years == 0 {
                return Err(FormatError::InvalidForecast(
                    "number of historical years must be at least 1".to_string(),
                ));
            }
            if forecast.start < self.simulation_start {
                return Err(FormatError::InvalidForecast(
                    "forecast start must not precede the simulation start".to_string(),
                ));
            }
        }
        if let WeatherSource::Inline(table) = self.weather_source()? {
            if table.is_empty() {
                return Err(FormatError::MissingField {
                    field: "weather_data rows",
                });
            }
        }
        if let SoilSource::Inline(profile) = self.soil_source()? {
            required("soil_data.family", &profile.family)?;
            if profile.layers.is_empty() {
                return Err(FormatError::MissingField {
                    field: "soil_data layers",
                });
            }
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn required(field: &'static str, value: &str) -> Result<(), FormatError> {
    if value.trim().is_empty() {
        return Err(FormatError::MissingField { field });
    }
    Ok(())
}
