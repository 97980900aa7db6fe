use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::path::Path;

pub const TREE_PLACEHOLDER: &str = "PLACEHOLDER_JSON_DATA";
pub const LIBRARY_PLACEHOLDER: &str = "LIBRARY_JSON_DATA_PLACEHOLDER";
pub const INPUT_LABEL_PLACEHOLDER: &str = "INPUT_LABEL_PLACEHOLDER";
pub const USI_LABEL_PLACEHOLDER: &str = "USI_LABEL_PLACEHOLDER";
pub const PARAMS_PLACEHOLDER: &str = "PARAMS_PLACEHOLDER";
pub const TABLES_PLACEHOLDER: &str = "TABLES_PLACEHOLDER";

pub const JQUERY_CDN: &str = "https://code.jquery.com/jquery-3.6.0.min.js";
pub const DATATABLES_JS_CDN: &str = "https://cdn.datatables.net/1.11.5/js/jquery.dataTables.min.js";
pub const DATATABLES_CSS_CDN: &str = "https://cdn.datatables.net/1.11.5/css/jquery.dataTables.min.css";

/// A value naming a readable file stands for the file's contents.
pub fn resolve_value(value: &str) -> String {
    if value.is_empty() { return String::new(); }
    let p = Path::new(value);
    if p.is_file() {
        match std::fs::read_to_string(p) {
            Ok(s) => return s,
            Err(e) => log::warn!("Failed to read {}: {}, using it as a literal", p.to_string_lossy(), e),
        }
    }
    value.to_string()
}

/// Replaces the first occurrence of each placeholder, in the given order.
pub fn fill_placeholders(text: &str, replacements: &[(&str, String)]) -> String {
    let mut out = text.to_string();
    for (placeholder, value) in replacements {
        if !out.contains(placeholder) { log::debug!("Template has no {}", placeholder); continue; }
        out = out.replacen(placeholder, value, 1);
    }
    out
}

/// Reads a template, swaps its library tags for `assets` and fills the placeholders.
pub fn fill_template_file(path: &Path, assets: &Assets, replacements: &[(&str, String)]) -> Result<String> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read template {}", path.to_string_lossy()))?;
    let text = assets.inline_into(&text)?;
    Ok(fill_placeholders(&text, replacements))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AssetKind { Jquery, DataTablesJs, DataTablesCss }

fn asset_kind(name: &str) -> Option<AssetKind> {
    let name = name.to_lowercase();
    if name.starts_with("jquery.datatables") && name.ends_with(".js") { Some(AssetKind::DataTablesJs) }
    else if name.starts_with("jquery.datatables") && name.ends_with(".css") { Some(AssetKind::DataTablesCss) }
    else if name.starts_with("jquery") && name.ends_with(".js") { Some(AssetKind::Jquery) }
    else { None }
}

/// File name of a URL or path, without query or fragment.
fn url_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// jQuery and DataTables either inlined from a local directory or linked from their CDNs.
#[derive(Clone, Debug, Default)]
pub struct Assets {
    pub jquery: Option<String>,
    pub datatables_js: Option<String>,
    pub datatables_css: Option<String>,
}

impl Assets {
    pub fn load(dir: &Path) -> Result<Assets> {
        let mut a = Assets::default();
        let entries = std::fs::read_dir(dir).with_context(|| format!("failed to list assets in {}", dir.to_string_lossy()))?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(kind) = asset_kind(&name) else { continue };
            let slot = match kind {
                AssetKind::Jquery => &mut a.jquery,
                AssetKind::DataTablesJs => &mut a.datatables_js,
                AssetKind::DataTablesCss => &mut a.datatables_css,
            };
            if slot.is_some() { log::debug!("Ignoring extra asset {}", name); continue; }
            match std::fs::read_to_string(entry.path()) {
                Ok(s) => { log::info!("Inlining {}", entry.path().to_string_lossy()); *slot = Some(s); }
                Err(e) => log::warn!("Failed to read asset {}: {}", entry.path().to_string_lossy(), e),
            }
        }
        Ok(a)
    }

    fn get(&self, kind: AssetKind) -> Option<&String> {
        match kind {
            AssetKind::Jquery => self.jquery.as_ref(),
            AssetKind::DataTablesJs => self.datatables_js.as_ref(),
            AssetKind::DataTablesCss => self.datatables_css.as_ref(),
        }
    }

    /// Replaces `<script src>` and `<link href>` tags that load a loaded asset with its inline content.
    /// Tags for anything else stay as written.
    pub fn inline_into(&self, html: &str) -> Result<String> {
        let script_re = Regex::new(r#"(?is)<script\b[^>]*?\bsrc\s*=\s*["']([^"']+)["'][^>]*>\s*</script>"#)?;
        let link_re = Regex::new(r#"(?is)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["'][^>]*>"#)?;
        let out = script_re.replace_all(html, |caps: &Captures| {
            match asset_kind(url_file_name(&caps[1])).filter(|k| *k != AssetKind::DataTablesCss).and_then(|k| self.get(k)) {
                Some(js) => { log::debug!("Inlined script {}", &caps[1]); format!("<script>{}</script>", js) }
                None => caps[0].to_string(),
            }
        });
        let out = link_re.replace_all(&out, |caps: &Captures| {
            match asset_kind(url_file_name(&caps[1])).filter(|k| *k == AssetKind::DataTablesCss).and_then(|k| self.get(k)) {
                Some(css) => { log::debug!("Inlined stylesheet {}", &caps[1]); format!("<style>{}</style>", css) }
                None => caps[0].to_string(),
            }
        });
        Ok(out.into_owned())
    }

    pub fn head(&self) -> String {
        match &self.datatables_css {
            Some(css) => format!("<style>{}</style>", css),
            None => format!("<link rel=\"stylesheet\" href=\"{}\">", DATATABLES_CSS_CDN),
        }
    }

    /// jQuery first, the table plugin depends on it.
    pub fn scripts(&self) -> String {
        let mut s = String::new();
        for (inline, cdn) in [(&self.jquery, JQUERY_CDN), (&self.datatables_js, DATATABLES_JS_CDN)] {
            match inline {
                Some(js) => s.push_str(&format!("<script>{}</script>", js)),
                None => s.push_str(&format!("<script src=\"{}\"></script>", cdn)),
            }
        }
        s
    }
}
