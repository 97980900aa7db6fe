use crate::usi::is_spectrum_usi;
use serde_json::Value;

pub const LIBRARY_SPECTRUM_URL: &str = "https://gnps.ucsd.edu/ProteoSAFe/gnpslibraryspectrum.jsp?SpectrumID=";
pub const SPECTRUM_VIEWER_URL: &str = "https://metabolomics-usi.gnps2.org/dashinterface/?usi1=";
pub const FILE_DASHBOARD_URL: &str = "https://dashboard.gnps2.org/?usi=";
pub const DATASET_URL: &str = "https://massive.ucsd.edu/ProteoSAFe/dataset.jsp?accession=";

/// Display form of a cell. Known identifiers become links to the matching viewer.
pub fn render_cell(value: &Value, input_usi: Option<&str>) -> String {
    let s = display_text(value);
    match cell_link(&s, input_usi) {
        Some((href, label)) => format!("<a href=\"{}\" target=\"_blank\">{}</a>", attr_escape(&href), html_escape(&label)),
        None => html_escape(&s),
    }
}

/// Link target and label for values with a known identifier prefix.
pub fn cell_link(s: &str, input_usi: Option<&str>) -> Option<(String, String)> {
    if s.starts_with("CCMSLIB") {
        Some((format!("{}{}", LIBRARY_SPECTRUM_URL, s), s.to_string()))
    } else if s.starts_with("mzspec:") {
        if !is_spectrum_usi(s) { return Some((format!("{}{}", FILE_DASHBOARD_URL, s), "Open file".to_string())); }
        match input_usi.filter(|u| !u.is_empty()) {
            Some(u) => Some((format!("{}{}&usi2={}", SPECTRUM_VIEWER_URL, u, s), s.to_string())),
            None => Some((format!("{}{}", SPECTRUM_VIEWER_URL, s), s.to_string())),
        }
    } else if s.starts_with("MSV0") {
        Some((format!("{}{}", DATASET_URL, s), s.to_string()))
    } else {
        None
    }
}

/// Whole floats print without a fraction, as the page script would show them.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        v => v.to_string(),
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn attr_escape(s: &str) -> String {
    html_escape(s).replace('"', "&quot;")
}
