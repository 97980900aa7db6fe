use crate::cell::{cell_link, display_text};
use crate::report::Report;
use crate::table::TableBuilder;

pub fn render_markdown(rep: &Report) -> String {
    let mut s = String::new();
    s.push_str(&format!("# {}\n\n", rep.title));
    if !rep.input_label.is_empty() { s.push_str(&format!("Input: {}\n\n", rep.input_label)); }
    if let Some(u) = rep.usi.as_ref() { s.push_str(&format!("USI: {}\n\n", u)); }
    s.push_str(&format!("Generated: {}\n\n", rep.generated.format("%Y-%m-%d %H:%M")));
    if !rep.params.is_empty() {
        s.push_str("## Parameters\n```\n");
        s.push_str(rep.params.trim_end());
        s.push_str("\n```\n\n");
    }
    for sec in rep.sections() {
        s.push_str(&format!("## {}\n", sec.heading));
        if sec.table.data().is_empty() { s.push_str("None\n\n"); continue; }
        s.push_str(&markdown_table(&sec.table, rep.input_usi()));
        s.push('\n');
    }
    s
}

/// Pipe table in display order; sorting is left to the reader.
pub fn markdown_table(t: &TableBuilder, input_usi: Option<&str>) -> String {
    let cols = t.columns();
    if cols.is_empty() { return String::new(); }
    let mut s = String::new();
    s.push_str(&format!("| {} |\n", cols.iter().map(|c| escape_pipe(c)).collect::<Vec<_>>().join(" | ")));
    s.push_str(&format!("|{}\n", " --- |".repeat(cols.len())));
    for row in t.data() {
        let cells: Vec<String> = cols.iter().map(|c| {
            let text = row.get(c).map(display_text).unwrap_or_default();
            match cell_link(&text, input_usi) {
                Some((href, label)) => format!("[{}]({})", escape_pipe(&label), href),
                None => escape_pipe(&text),
            }
        }).collect();
        s.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    s
}

fn escape_pipe(s: &str) -> String { s.replace('|', "\\|").replace('\n', " ") }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn headings_for_every_section() {
        let md = render_markdown(&fixtures::report());
        assert!(md.starts_with("# MASST Results\n"));
        for h in ["## Library Matches", "## Matches", "## Datasets", "## Parameters"] { assert!(md.contains(h)); }
    }

    #[test]
    fn table_respects_exclusions_and_links() {
        let rep = fixtures::report();
        let secs = rep.sections();
        let md = markdown_table(&secs[0].table, rep.input_usi());
        let mut lines = md.lines();
        assert_eq!(lines.next().unwrap(), "| USI | GNPSLibraryAccession | Cosine |");
        assert_eq!(lines.next().unwrap(), "| --- | --- | --- |");
        let row = lines.next().unwrap();
        assert!(row.contains("[CCMSLIB00000001556](https://gnps.ucsd.edu/ProteoSAFe/gnpslibraryspectrum.jsp?SpectrumID=CCMSLIB00000001556)"));
        assert!(row.ends_with("| 0.99 |"));
    }

    #[test]
    fn pipes_are_escaped() {
        let t = TableBuilder::new("t").datum(crate::rows::parse_rows(r#"[{"Name":"a|b"}]"#));
        assert!(markdown_table(&t, None).contains("| a\\|b |"));
    }

    #[test]
    fn empty_sections_say_none() {
        let mut rep = fixtures::report();
        rep.library.clear();
        assert!(render_markdown(&rep).contains("## Library Matches\nNone\n"));
    }
}
