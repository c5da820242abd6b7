use super::dates::yydoy;
use super::table::{fixed, render_columns, substitute_sentinel, truncated, Align, Column};
use super::FormatError;
use crate::descriptor::{SiteMetadata, WeatherTable};

pub const WEATHER_COLUMNS: [&str; 10] = [
    "@DATE", "SRAD", "TMAX", "TMIN", "RAIN", "DEWP", "WIND", "PAR", "EVAP", "RHUM",
];

/// Renders a weather file: fixed-width station header followed by one row
/// per day. Absent values render as `-99`.
pub fn render_weather(
    station_code: &str,
    location: &str,
    latitude: f64,
    longitude: f64,
    site: &SiteMetadata,
    table: &WeatherTable,
) -> Result<String, FormatError> {
    if table.is_empty() {
        return Err(FormatError::MissingField {
            field: "weather_data rows",
        });
    }
    for pair in table.rows.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(FormatError::InvalidField {
                field: "weather_data",
                reason: format!(
                    "dates must be strictly increasing ({} follows {})",
                    pair[1].date, pair[0].date
                ),
            });
        }
    }

    let insi: String = station_code.trim().chars().take(4).collect();
    let average_temperature = site.average_temperature.or_else(|| table.mean_temperature());

    let mut out = String::new();
    out.push_str(&format!("*WEATHER DATA : {}\n\n", location.trim()));
    out.push_str("@ INSI      LAT     LONG  ELEV   TAV   AMP REFHT WNDHT\n");
    out.push_str(&format!(
        "  {insi}   {lat:.3}  {long:.3}    {elev}  {tav}  {amp}  {refht}  {wndht}\n",
        lat = latitude,
        long = longitude,
        elev = fixed(site.elevation, 0),
        tav = fixed(average_temperature, 1),
        amp = fixed(site.temperature_amplitude, 0),
        refht = fixed(site.weather_reference_height, 2),
        wndht = fixed(site.wind_reference_height, 2),
    ));

    let mut columns: Vec<Column> = WEATHER_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name, if i == 0 { Align::Left } else { Align::Right }))
        .collect();
    for row in &table.rows {
        let cells = [
            yydoy(row.date),
            fixed(Some(row.srad), 1),
            fixed(Some(row.tmax), 1),
            fixed(Some(row.tmin), 1),
            fixed(Some(row.rain), 1),
            fixed(row.dewp, 1),
            truncated(row.wind),
            fixed(row.par, 1),
            fixed(row.evap, 1),
            fixed(row.rhum, 1),
        ];
        for (column, cell) in columns.iter_mut().zip(cells) {
            column.push(cell);
        }
    }

    let body = render_columns(&columns)
        .into_iter()
        .map(|line| line.trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(&body);
    out.push('\n');

    Ok(substitute_sentinel(&out))
}
