use anyhow::{bail, Result};
use std::path::Path;

/// MassIVE accession and file USI of a spectrum USI.
///
/// `mzspec:MSV000012345:file.mzML:scan:5` becomes
/// `("MSV000012345", "mzspec:MSV000012345:file.mzML")`.
pub fn split_usi(usi: &str) -> (String, String) {
    let massive = usi.split(':').nth(1).unwrap_or_default().to_string();
    let file = usi.split(":scan:").next().unwrap_or(usi).to_string();
    (massive, file)
}

pub fn ensure_simple_file_usi(usi: &str) -> String {
    let head = match usi.rfind(":scan") { Some(i) => &usi[..i], None => usi };
    let elements: Vec<&str> = head.split(':').collect();
    let dataset = elements.get(1).copied().unwrap_or_default();
    let file = elements.last().copied().unwrap_or_default();
    format!("mzspec:{}:{}", dataset, file)
}

pub fn create_simple_file_usi(filename: &str, dataset: &str) -> Result<String> {
    let stem = Path::new(filename).file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    if stem.is_empty() { bail!("Filename is empty"); }
    if dataset.is_empty() { bail!("Dataset is empty"); }
    Ok(format!("mzspec:{}:{}", dataset, stem))
}

pub fn is_spectrum_usi(usi: &str) -> bool {
    usi.contains(":scan:") || usi.contains("accession:CCMSLIB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_scan_usi() {
        let (massive, file) = split_usi("mzspec:MSV000012345:file.mzML:scan:5");
        assert_eq!(massive, "MSV000012345");
        assert_eq!(file, "mzspec:MSV000012345:file.mzML");
    }

    #[test]
    fn split_file_usi_without_scan() {
        let (massive, file) = split_usi("mzspec:MSV000082493:sub/a.mzXML");
        assert_eq!(massive, "MSV000082493");
        assert_eq!(file, "mzspec:MSV000082493:sub/a.mzXML");
    }

    #[test]
    fn split_garbage_keeps_input() {
        let (massive, file) = split_usi("nothing");
        assert_eq!(massive, "");
        assert_eq!(file, "nothing");
    }

    #[test]
    fn simple_file_usi_drops_scan() {
        assert_eq!(ensure_simple_file_usi("mzspec:MSV000012345:f1:scan:77"), "mzspec:MSV000012345:f1");
        assert_eq!(ensure_simple_file_usi("mzspec:MSV000012345:f1"), "mzspec:MSV000012345:f1");
    }

    #[test]
    fn create_file_usi_uses_stem() {
        assert_eq!(create_simple_file_usi("data/run_01.mzML", "MSV000012345").unwrap(), "mzspec:MSV000012345:run_01");
        assert!(create_simple_file_usi("", "MSV000012345").is_err());
        assert!(create_simple_file_usi("a.mzML", "").is_err());
    }

    #[test]
    fn spectrum_usi_detection() {
        assert!(is_spectrum_usi("mzspec:MSV1:f:scan:3"));
        assert!(is_spectrum_usi("mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00000001556"));
        assert!(!is_spectrum_usi("mzspec:MSV1:f"));
    }
}
