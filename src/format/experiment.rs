use super::dates::{yydoy, yyyydoy};
use super::table::MISSING_TOKEN;
use super::template::render_placeholders;
use super::FormatError;
use crate::descriptor::RunDescriptor;
use chrono::Datelike;

const WEATHER_CODE_WIDTH: usize = 8;
const SOIL_CODE_WIDTH: usize = 10;
const CULTIVAR_WIDTH: usize = 6;

/// Fills the experiment template for `descriptor`. Both codes must already be
/// resolved; an absent code is a hard error.
pub fn render_experiment(
    template: &str,
    descriptor: &RunDescriptor,
    weather_code: Option<&str>,
    soil_code: Option<&str>,
) -> Result<String, FormatError> {
    let weather_code = weather_code
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or(FormatError::MissingResolution { what: "weather" })?;
    let soil_code = soil_code
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or(FormatError::MissingResolution { what: "soil" })?;

    let weather_code = fit("weather_station_code", weather_code, WEATHER_CODE_WIDTH)?;
    let soil_code = fit("soil_code", soil_code, SOIL_CODE_WIDTH)?;
    let cultivar = fit("cultivar", descriptor.cultivar.trim(), CULTIVAR_WIDTH)?;

    let (forecast_date, years) = match &descriptor.forecast {
        Some(forecast) => (yyyydoy(forecast.start), forecast.years),
        None => (MISSING_TOKEN.to_string(), 1),
    };
    let experiment_code = format!(
        "{}{:02}01",
        descriptor.experiment_id,
        descriptor.simulation_start.year().rem_euclid(100)
    );

    render_placeholders(template, |token| {
        let value = match token {
            "ID" => descriptor.experiment_id.clone(),
            "EXP_CODE" => experiment_code.clone(),
            "FLD_ID" => format!("{}0001", descriptor.experiment_id),
            "LOC" => descriptor.location_name.trim().to_string(),
            "CULT" => cultivar.clone(),
            "MDL" => descriptor.model.trim().to_string(),
            "WST" => weather_code.clone(),
            "SOIL_IDN" => soil_code.clone(),
            "XCRD" => format!("{:>15.5}", descriptor.longitude),
            "YCRD" => format!("{:>15.5}", descriptor.latitude),
            "SDT" => yydoy(descriptor.simulation_start),
            "PLF" => yydoy(descriptor.plant_date),
            "PLL" => yydoy(descriptor.plant_window_end()),
            "HDT" => yydoy(descriptor.harvest_date),
            "HVF" => yydoy(descriptor.harvest_date),
            "HVL" => yydoy(descriptor.harvest_window_end()),
            "IRR" => descriptor.irrigation.code().to_string(),
            "NYERS" => format!("{years:>5}"),
            "FODAT" => format!("{forecast_date:>7}"),
            other => {
                return Err(FormatError::Template(format!(
                    "unknown placeholder `{other}`"
                )))
            }
        };
        Ok(value)
    })
}

fn fit(field: &'static str, value: &str, width: usize) -> Result<String, FormatError> {
    if value.len() > width {
        return Err(FormatError::InvalidField {
            field,
            reason: format!("`{value}` is longer than {width} characters"),
        });
    }
    Ok(format!("{value:<width$}"))
}
