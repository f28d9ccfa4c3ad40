//! CSV rendering for monitoring exports.

/// Quote a field when it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render a header and rows, one record per line.
pub fn render<S: AsRef<str>>(header: &[&str], rows: &[Vec<S>]) -> String {
    let mut out = String::new();
    if !header.is_empty() {
        out.push_str(
            &header
                .iter()
                .map(|h| escape_field(h))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
    }
    for row in rows {
        out.push_str(
            &row.iter()
                .map(|field| escape_field(field.as_ref()))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
    }
    out
}
