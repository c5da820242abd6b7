use super::FormatError;

const FILE_COLUMN_WIDTH: usize = 98;

/// Renders the batch control file that points the model at one experiment
/// file, treatment 1, single replicate.
pub fn render_batch(crop: &str, experiment_file: &str) -> Result<String, FormatError> {
    let crop = crop.trim();
    if crop.is_empty() {
        return Err(FormatError::MissingField { field: "crop" });
    }
    let experiment_file = experiment_file.trim();
    if experiment_file.is_empty() || experiment_file.len() >= FILE_COLUMN_WIDTH {
        return Err(FormatError::InvalidField {
            field: "experiment_file",
            reason: format!(
                "`{experiment_file}` must be 1..{FILE_COLUMN_WIDTH} characters"
            ),
        });
    }

    let mut out = format!("$BATCH({})\n", crop.to_ascii_uppercase());
    out.push_str(&format!(
        "{:<94}TRTNO     RP     SQ     OP     CO\n",
        "@FILEX"
    ));
    out.push_str(&format!(
        "{experiment_file:<FILE_COLUMN_WIDTH$}1      1      0      0      0\n"
    ));
    Ok(out)
}
