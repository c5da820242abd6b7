use super::table::{fixed, render_columns, substitute_sentinel, text, Align, Column};
use super::FormatError;
use crate::descriptor::{SoilLayer, SoilProfile};

type LayerValue = fn(&SoilLayer) -> Option<f64>;

/// Depth-table columns with their decimal precision.
const LAYER_COLUMNS: [(&str, usize, LayerValue); 15] = [
    ("SLLL", 3, |l| Some(l.lower_limit)),
    ("SDUL", 3, |l| Some(l.drained_upper_limit)),
    ("SSAT", 3, |l| Some(l.saturation)),
    ("SRGF", 2, |l| Some(l.root_growth_factor)),
    ("SSKS", 2, |l| Some(l.saturated_conductivity)),
    ("SBDM", 2, |l| Some(l.bulk_density)),
    ("SLOC", 2, |l| Some(l.organic_carbon)),
    ("SLCL", 2, |l| Some(l.clay)),
    ("SLSI", 2, |l| Some(l.silt)),
    ("SLCF", 1, |l| l.coarse_fraction),
    ("SLNI", 2, |l| Some(l.total_nitrogen)),
    ("SLHW", 2, |l| Some(l.ph_water)),
    ("SLHB", 1, |l| l.ph_buffer),
    ("SCEC", 1, |l| Some(l.cation_exchange)),
    ("SADC", 1, |l| l.sorption_coefficient),
];

/// Renders one soil profile block for a `.SOL` file.
pub fn render_soil(
    profile_id: &str,
    latitude: f64,
    longitude: f64,
    profile: &SoilProfile,
) -> Result<String, FormatError> {
    let depth = profile.max_depth().ok_or(FormatError::MissingField {
        field: "soil_data layers",
    })?;
    for pair in profile.layers.windows(2) {
        if pair[1].depth <= pair[0].depth {
            return Err(FormatError::InvalidField {
                field: "soil_data layers",
                reason: format!(
                    "depths must be strictly increasing ({} follows {})",
                    pair[1].depth, pair[0].depth
                ),
            });
        }
    }
    let family = profile.family.trim();
    if family.is_empty() {
        return Err(FormatError::MissingField {
            field: "soil_data.family",
        });
    }

    let mut out = String::new();
    out.push_str(&format!(
        "*{profile_id}    XXX   XXXXXXXX   {depth}    ISRIC soilgrids + HC27\n"
    ));
    out.push_str("@SITE        COUNTRY          LAT     LONG SCS Family\n");
    out.push_str(&format!(
        "-99              XX       {latitude:.3} {longitude:.3}     {family}\n"
    ));

    for line in prefixed(render_columns(&surface_columns(profile))) {
        out.push_str(&line);
        out.push('\n');
    }
    for line in prefixed(render_columns(&layer_columns(&profile.layers))) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');

    Ok(substitute_sentinel(&out))
}

fn surface_columns(profile: &SoilProfile) -> Vec<Column> {
    let surface = &profile.surface;
    let cells = [
        ("SCOM", text(surface.color.as_deref())),
        ("SALB", fixed(surface.albedo, 2)),
        ("SLU1", fixed(surface.evaporation_limit, 1)),
        ("SLDR", fixed(surface.drainage_rate, 2)),
        ("SLRO", fixed(surface.runoff_curve, 1)),
        ("SLNF", fixed(Some(surface.mineralization_factor), 2)),
        ("SLPF", fixed(Some(surface.photosynthesis_factor), 2)),
        ("SMHB", text(None)),
        ("SMPX", text(None)),
        ("SMKE", text(None)),
    ];
    cells
        .into_iter()
        .map(|(header, cell)| {
            let mut column = Column::new(header, Align::Right);
            column.push(cell);
            column
        })
        .collect()
}

fn layer_columns(layers: &[SoilLayer]) -> Vec<Column> {
    let mut depth = Column::new("SLB", Align::Right);
    let mut horizon = Column::new("SLMH", Align::Left);
    let mut values: Vec<Column> = LAYER_COLUMNS
        .iter()
        .map(|(header, _, _)| Column::new(header, Align::Right))
        .collect();

    for layer in layers {
        depth.push(layer.depth.to_string());
        horizon.push(text(Some(&layer.master_horizon)));
        for (column, (_, decimals, value)) in values.iter_mut().zip(LAYER_COLUMNS.iter()) {
            column.push(fixed(value(layer), *decimals));
        }
    }

    let mut columns = vec![depth, horizon];
    columns.extend(values);
    columns
}

fn prefixed(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().enumerate().map(|(i, line)| {
        if i == 0 {
            format!("@ {line}")
        } else {
            format!("  {line}")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SoilSurface;

    fn layer(depth: u32, horizon: &str) -> SoilLayer {
        SoilLayer {
            depth,
            master_horizon: horizon.to_string(),
            lower_limit: 0.1234,
            drained_upper_limit: 0.25,
            saturation: 0.4,
            root_growth_factor: 1.0,
            saturated_conductivity: 1.234,
            bulk_density: 1.4,
            organic_carbon: 0.5,
            clay: 20.0,
            silt: 30.0,
            coarse_fraction: None,
            total_nitrogen: 0.05,
            ph_water: 6.5,
            ph_buffer: None,
            cation_exchange: 12.0,
            sorption_coefficient: None,
        }
    }

    fn profile() -> SoilProfile {
        SoilProfile {
            family: "HC_GEN0011".to_string(),
            surface: SoilSurface::default(),
            layers: vec![layer(5, "A"), layer(15, "A"), layer(30, "AB")],
        }
    }

    #[test]
    fn header_names_profile_family_and_depth() {
        let rendered = render_soil("DB00001234", 42.98, -95.18, &profile()).expect("render");
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(
            lines[0],
            "*DB00001234    XXX   XXXXXXXX   30    ISRIC soilgrids + HC27"
        );
        assert_eq!(lines[2], "-99              XX       42.980 -95.180     HC_GEN0011");
        let surface: Vec<&str> = lines[3].split_whitespace().collect();
        assert_eq!(&surface[..4], &["@", "SCOM", "SALB", "SLU1"]);
        assert_eq!(lines[4].split_whitespace().nth(5), Some("1.00"));
        assert!(lines[5].starts_with("@ SLB SLMH  SLLL  SDUL"));
        assert!(rendered.ends_with("\n\n"));
    }

    #[test]
    fn layer_rows_round_per_column_and_use_short_sentinel() {
        let rendered = render_soil("DB00001234", 42.98, -95.18, &profile()).expect("render");
        let row = rendered.lines().nth(6).expect("first layer");
        let tokens: Vec<&str> = row.split_whitespace().collect();

        assert_eq!(tokens[0], "5");
        assert_eq!(tokens[1], "A");
        assert_eq!(tokens[2], "0.123");
        assert_eq!(tokens[6], "1.23");
        assert_eq!(tokens[11], "-99");
        assert_eq!(tokens[14], "-99");
        assert!(!rendered.contains("-99.0"));
    }

    #[test]
    fn shallower_layer_after_deeper_is_rejected() {
        let mut soil = profile();
        soil.layers.swap(0, 2);
        assert!(render_soil("DB00001234", 0.0, 0.0, &soil).is_err());
    }
}
