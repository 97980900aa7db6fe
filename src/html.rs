use crate::cell::html_escape;
use crate::report::Report;
use crate::template::Assets;
use crate::visibility::{toggle_button, PARAMS, TOGGLE_SCRIPT};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme { Dark, Light }

const BASE_CSS: &str = "body{margin:0;background:var(--bg);color:var(--fg);font-family:Segoe UI,system-ui,-apple-system,Arial,sans-serif} .container{max-width:1200px;margin:0 auto;padding:24px} .header{display:flex;align-items:center;justify-content:space-between;gap:12px;margin-bottom:16px} .title{font-size:20px;font-weight:600;letter-spacing:.2px} .sub{color:var(--muted);font-size:13px} .card{background:var(--card);border:1px solid var(--border);border-radius:10px;padding:14px} .section{margin-top:18px} .section h3{margin:0 0 10px 0;font-size:16px;font-weight:600} .pill{display:inline-flex;align-items:center;gap:6px;padding:4px 10px;margin:2px;border-radius:999px;background:var(--chip);color:var(--fg);border:1px solid var(--border);font-size:12px;cursor:pointer} .code{font-family:Consolas,monospace;white-space:pre-wrap;font-size:12px} table.display tbody tr.highlight td{background:var(--chip)} table.display tbody tr.selected td{background:var(--accent);color:#ffffff} a{color:var(--accent)} .footer{margin-top:24px;color:var(--muted);font-size:12px}";

fn theme_vars(theme: Theme) -> &'static str {
    match theme {
        Theme::Dark => ":root{--bg:#0a0e13;--fg:#ffffff;--muted:#c0c4cc;--card:#0d131a;--border:#243041;--accent:#3b82f6;--chip:#0f172a}",
        Theme::Light => ":root{--bg:#f7fafc;--fg:#111827;--muted:#6b7280;--card:#ffffff;--border:#e5e7eb;--accent:#2563eb;--chip:#eef2f7}",
    }
}

pub fn render_html(rep: &Report, theme: Theme, assets: &Assets) -> String {
    let mut s = String::new();
    s.push_str(&format!("<html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>{}</title>", html_escape(&rep.title)));
    s.push_str(&assets.head());
    s.push_str(&format!("<style>{} {}</style>", theme_vars(theme), BASE_CSS));
    s.push_str(&assets.scripts());
    s.push_str("</head><body><div class=\"container\">");
    s.push_str(&format!("<div class=\"header\"><div class=\"title\">{}</div>", html_escape(&rep.title)));
    s.push_str(&format!("<div class=\"sub\">{}</div></div>", rep.generated.format("%Y-%m-%d %H:%M")));
    if !rep.input_label.is_empty() || rep.usi.is_some() {
        s.push_str("<div class=\"card\">");
        if !rep.input_label.is_empty() { s.push_str(&format!("<div><span class=\"sub\">Input</span> {}</div>", html_escape(&rep.input_label))); }
        if let Some(u) = rep.usi.as_ref() { s.push_str(&format!("<div><span class=\"sub\">USI</span> {}</div>", crate::cell::render_cell(&serde_json::Value::String(u.clone()), None))); }
        s.push_str("</div>");
    }
    s.push_str(&render_tables(rep));
    s.push_str("<div class=\"footer\">Generated by masst-tables</div></div></body></html>");
    s
}

/// Toggle buttons, the parameter block and every table section.
pub fn render_tables(rep: &Report) -> String {
    let sections = rep.sections();
    let mut s = String::new();
    s.push_str(TOGGLE_SCRIPT);
    s.push_str("<div class=\"section\">");
    if !rep.params.is_empty() { s.push_str(&toggle_button(PARAMS, "Parameters")); }
    for sec in &sections { s.push_str(&toggle_button(sec.container, sec.heading)); }
    s.push_str("</div>");
    if !rep.params.is_empty() {
        s.push_str(&format!("<div id=\"{}\" class=\"card code\" {}>{}</div>", PARAMS, rep.visibility.style_attr(PARAMS), html_escape(&rep.params)));
    }
    for sec in &sections {
        s.push_str(&format!("<div class=\"section\"><h3>{} <span class=\"sub\">{} rows</span></h3>", html_escape(sec.heading), sec.table.data().len()));
        s.push_str(&format!("<div id=\"{}\" {}>", sec.container, rep.visibility.style_attr(sec.container)));
        match sec.table.render(rep.input_usi()) {
            Some(t) => s.push_str(&t),
            None => s.push_str("<div class=\"sub\">No entries</div>"),
        }
        s.push_str("</div></div>");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn page_contains_every_table() {
        let html = render_html(&fixtures::report(), Theme::Light, &Assets::default());
        for id in ["libTable", "dataTable", "datasetTable"] { assert!(html.contains(&format!("id=\"{}\"", id))); }
        assert!(html.contains("<title>MASST Results</title>"));
        assert!(html.contains("--bg:#f7fafc"));
    }

    #[test]
    fn scripts_load_before_tables() {
        let html = render_html(&fixtures::report(), Theme::Dark, &Assets::default());
        let jq = html.find("jquery-3.6.0.min.js").unwrap();
        let init = html.find("$(document).ready").unwrap();
        assert!(jq < init);
    }

    #[test]
    fn params_start_hidden() {
        let html = render_tables(&fixtures::report());
        assert!(html.contains("<div id=\"paramsDiv\" class=\"card code\" style=\"display:none\">precursor_mz_tol=0.05</div>"));
        assert!(html.contains("<div id=\"match_table\" style=\"display:block\">"));
        assert!(html.contains("toggleDisplay('paramsDiv')"));
    }

    #[test]
    fn dataset_rows_mirror_against_input_usi() {
        let html = render_tables(&fixtures::report());
        assert!(html.contains("usi1=mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00000001556&amp;usi2=mzspec:MSV000012345:file.mzML:scan:5"));
        assert!(html.contains("dataset.jsp?accession=MSV000012345"));
        assert!(html.contains(">Open file</a>"));
    }

    #[test]
    fn empty_library_shows_placeholder() {
        let mut rep = fixtures::report();
        rep.library.clear();
        let html = render_tables(&rep);
        assert!(!html.contains("id=\"libTable\""));
        assert!(html.contains("No entries"));
    }
}
