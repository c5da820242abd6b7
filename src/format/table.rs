pub const MISSING_VALUE: f64 = -99.0;
pub const MISSING_TOKEN: &str = "-99";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// One column of a fixed-width text table. Width is the widest of the header
/// and every cell.
#[derive(Debug, Clone)]
pub struct Column {
    header: String,
    align: Align,
    cells: Vec<String>,
}

impl Column {
    pub fn new(header: &str, align: Align) -> Self {
        Self {
            header: header.to_string(),
            align,
            cells: Vec::new(),
        }
    }

    pub fn push(&mut self, cell: String) {
        self.cells.push(cell);
    }

    fn width(&self) -> usize {
        self.cells
            .iter()
            .map(String::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    fn pad(&self, text: &str, width: usize) -> String {
        match self.align {
            Align::Left => format!("{text:<width$}"),
            Align::Right => format!("{text:>width$}"),
        }
    }
}

/// Renders the header line followed by one line per row, columns separated
/// by a single space. Trailing whitespace is trimmed from every line.
pub fn render_columns(columns: &[Column]) -> Vec<String> {
    let widths: Vec<usize> = columns.iter().map(Column::width).collect();
    let rows = columns.iter().map(|c| c.cells.len()).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(rows + 1);
    let header = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| column.pad(&column.header, *width))
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(header.trim_end().to_string());

    for row in 0..rows {
        let line = columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| {
                let cell = column.cells.get(row).map(String::as_str).unwrap_or("");
                column.pad(cell, *width)
            })
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(line.trim_end().to_string());
    }
    lines
}

/// Rounds to `decimals` places, substituting the sentinel for absent values.
pub fn fixed(value: Option<f64>, decimals: usize) -> String {
    let value = value.filter(|v| v.is_finite()).unwrap_or(MISSING_VALUE);
    let scale = 10f64.powi(decimals as i32);
    // adding 0.0 folds a rounded -0.0 into 0.0
    let rounded = (value * scale).round() / scale + 0.0;
    format!("{rounded:.decimals$}")
}

/// Rounds to one decimal place, then truncates toward zero.
pub fn truncated(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(value) => {
            let rounded = (value * 10.0).round() / 10.0;
            format!("{}", rounded.trunc() as i64)
        }
        None => MISSING_TOKEN.to_string(),
    }
}

pub fn text(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value.to_string(),
        None => MISSING_TOKEN.to_string(),
    }
}

/// Rewrites every whitespace-delimited `-99.0`, `-99.00`, ... token as `-99`
/// right-aligned in the same span, so columns stay aligned.
pub fn substitute_sentinel(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut token = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            flush_token(&mut out, &mut token);
            out.push(ch);
        } else {
            token.push(ch);
        }
    }
    flush_token(&mut out, &mut token);
    out
}

fn flush_token(out: &mut String, token: &mut String) {
    if is_decimal_sentinel(token) {
        let width = token.len();
        out.push_str(&format!("{MISSING_TOKEN:>width$}"));
    } else {
        out.push_str(token);
    }
    token.clear();
}

fn is_decimal_sentinel(token: &str) -> bool {
    token
        .strip_prefix("-99.")
        .map(|zeros| !zeros.is_empty() && zeros.chars().all(|ch| ch == '0'))
        .unwrap_or(false)
}
