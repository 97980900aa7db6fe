use crate::cell::{attr_escape, html_escape, render_cell};
use crate::rows::Row;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection { Asc, Desc }

impl SortDirection {
    pub fn as_str(self) -> &'static str { match self { SortDirection::Asc => "asc", SortDirection::Desc => "desc" } }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableEvent { Highlight, Select }

type Listener = Box<dyn Fn(&Row, bool)>;

pub const LENGTH_MENU: [u32; 5] = [2, 4, 10, 20, 50];
pub const PAGE_LENGTH: u32 = 4;

/// Builder for one interactive table. The body is rendered here, paging and
/// sorting are left to DataTables in the browser.
pub struct TableBuilder {
    id: String,
    data: Vec<Row>,
    sort_by: Option<(String, SortDirection)>,
    filter_cols: Vec<String>,
    highlighted: BTreeSet<usize>,
    selected: BTreeSet<usize>,
    listeners: Vec<(TableEvent, Listener)>,
}

impl TableBuilder {
    pub fn new(id: &str) -> Self {
        TableBuilder { id: id.to_string(), data: Vec::new(), sort_by: None, filter_cols: Vec::new(), highlighted: BTreeSet::new(), selected: BTreeSet::new(), listeners: Vec::new() }
    }

    pub fn datum(mut self, data: Vec<Row>) -> Self {
        self.data = data;
        self.highlighted.clear();
        self.selected.clear();
        self
    }

    pub fn sort_by(mut self, column: &str, ascending: bool) -> Self {
        self.sort_by = Some((column.to_string(), if ascending { SortDirection::Asc } else { SortDirection::Desc }));
        self
    }

    pub fn filter_cols<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.filter_cols = cols.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn data(&self) -> &[Row] { &self.data }
    pub fn sort_spec(&self) -> Option<(&str, SortDirection)> { self.sort_by.as_ref().map(|(c, d)| (c.as_str(), *d)) }
    pub fn filtered(&self) -> &[String] { &self.filter_cols }

    /// Keys of the first row minus the excluded columns.
    pub fn columns(&self) -> Vec<String> {
        match self.data.first() {
            Some(first) => first.keys().filter(|k| !self.filter_cols.contains(k)).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Sort column as an index into the rendered columns.
    pub fn order(&self) -> Option<(usize, SortDirection)> {
        let (col, dir) = self.sort_by.as_ref()?;
        match self.columns().iter().position(|c| c == col) {
            Some(i) => Some((i, *dir)),
            None => { log::warn!("Table {}: sort column {} is not displayed, keeping row order", self.id, col); None }
        }
    }

    pub fn on<F: Fn(&Row, bool) + 'static>(&mut self, kind: TableEvent, listener: F) -> &mut Self {
        self.listeners.push((kind, Box::new(listener)));
        self
    }

    /// Sets or, with `None`, toggles the highlight of a row and notifies listeners.
    pub fn highlight(&mut self, row: usize, on: Option<bool>) -> Option<bool> {
        self.mark(TableEvent::Highlight, row, on)
    }

    pub fn select(&mut self, row: usize, on: Option<bool>) -> Option<bool> {
        self.mark(TableEvent::Select, row, on)
    }

    pub fn is_highlighted(&self, row: usize) -> bool { self.highlighted.contains(&row) }
    pub fn is_selected(&self, row: usize) -> bool { self.selected.contains(&row) }

    fn mark(&mut self, kind: TableEvent, row: usize, on: Option<bool>) -> Option<bool> {
        if row >= self.data.len() { log::debug!("Table {}: no row {}", self.id, row); return None; }
        let set = match kind { TableEvent::Highlight => &mut self.highlighted, TableEvent::Select => &mut self.selected };
        let state = on.unwrap_or(!set.contains(&row));
        if state { set.insert(row); } else { set.remove(&row); }
        let data = &self.data[row];
        for (k, l) in &self.listeners { if *k == kind { l(data, state); } }
        Some(state)
    }

    pub fn init_options(&self) -> Value {
        let mut opts = json!({
            "dom": "Blfrtip",
            "bLengthChange": true,
            "bDeferRender": true,
            "lengthMenu": LENGTH_MENU,
            "pageLength": PAGE_LENGTH,
        });
        if let Some((idx, dir)) = self.order() && let Some(map) = opts.as_object_mut() {
            map.insert("order".to_string(), json!([[idx, dir.as_str()]]));
        }
        opts
    }

    /// Table markup plus the DataTables init script. Nothing is rendered without data.
    pub fn render(&self, input_usi: Option<&str>) -> Option<String> {
        if self.data.is_empty() { log::debug!("Table {}: no data, skipping", self.id); return None; }
        let cols = self.columns();
        let mut s = String::new();
        s.push_str(&format!("<table class=\"display compact\" width=\"100%\" id=\"{}\" style=\"visibility:hidden\"><thead><tr>", attr_escape(&self.id)));
        for c in &cols { s.push_str(&format!("<td>{}</td>", html_escape(c))); }
        s.push_str("</tr></thead><tbody>");
        for (i, row) in self.data.iter().enumerate() {
            let mut classes = Vec::new();
            if self.is_highlighted(i) { classes.push("highlight"); }
            if self.is_selected(i) { classes.push("selected"); }
            if classes.is_empty() { s.push_str(&format!("<tr data-row=\"{}\">", i)); } else { s.push_str(&format!("<tr data-row=\"{}\" class=\"{}\">", i, classes.join(" "))); }
            for c in &cols {
                let v = row.get(c).unwrap_or(&Value::Null);
                s.push_str(&format!("<td>{}</td>", render_cell(v, input_usi)));
            }
            s.push_str("</tr>");
        }
        s.push_str("</tbody></table>");
        s.push_str(&self.init_script());
        Some(s)
    }

    fn init_script(&self) -> String {
        let id = Value::String(self.id.clone());
        format!(
            "<script>$(document).ready(function(){{var sel='#'+{id};var dt=$(sel).DataTable({opts});$(sel).css('visibility','visible');\
$(sel+' tbody').on('mouseover','tr',function(){{$(this).addClass('highlight');$(sel).trigger('highlight',[dt.row(this).data(),true]);}})\
.on('mouseleave','tr',function(){{$(this).removeClass('highlight');$(sel).trigger('highlight',[dt.row(this).data(),false]);}})\
.on('click','tr',function(){{var on=!$(this).hasClass('selected');$(this).toggleClass('selected',on);$(sel).trigger('select',[dt.row(this).data(),on]);}});}});</script>",
            id = id,
            opts = self.init_options()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rows() -> Vec<Row> {
        crate::rows::parse_rows(r#"[
            {"USI":"mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00000001556","GNPSLibraryAccession":"CCMSLIB00000001556","Cosine":0.99,"Dataset":"d","Status":"ok","CompoundName":"caffeic acid"},
            {"USI":"mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00000001557","GNPSLibraryAccession":"CCMSLIB00000001557","Cosine":0.81,"Dataset":"d","Status":"ok","CompoundName":"ferulic acid"}
        ]"#)
    }

    #[test]
    fn excluded_columns_are_removed_in_order() {
        let t = TableBuilder::new("libTable").datum(rows()).filter_cols(&["Dataset", "Status"]);
        assert_eq!(t.columns(), vec!["USI", "GNPSLibraryAccession", "Cosine", "CompoundName"]);
        let t = t.filter_cols::<&str>(&[]);
        assert_eq!(t.columns().len(), 6);
    }

    #[test]
    fn unknown_excluded_column_is_harmless() {
        let t = TableBuilder::new("t").datum(rows()).filter_cols(&["Nope"]);
        assert_eq!(t.columns().len(), 6);
    }

    #[test]
    fn header_matches_columns() {
        let html = TableBuilder::new("libTable").datum(rows()).filter_cols(&["Dataset", "Status"]).render(None).unwrap();
        assert!(html.contains("<thead><tr><td>USI</td><td>GNPSLibraryAccession</td><td>Cosine</td><td>CompoundName</td></tr></thead>"));
        assert!(!html.contains("<td>Dataset</td>"));
        assert!(html.contains("id=\"libTable\""));
    }

    #[test]
    fn sort_column_becomes_index() {
        let t = TableBuilder::new("t").datum(rows()).filter_cols(&["USI"]).sort_by("Cosine", false);
        assert_eq!(t.order(), Some((1, SortDirection::Desc)));
        assert_eq!(t.init_options()["order"], json!([[1, "desc"]]));
        assert_eq!(t.sort_spec(), Some(("Cosine", SortDirection::Desc)));
    }

    #[test]
    fn hidden_sort_column_gives_no_order() {
        let t = TableBuilder::new("t").datum(rows()).filter_cols(&["Cosine"]).sort_by("Cosine", true);
        assert_eq!(t.order(), None);
        assert!(t.init_options().get("order").is_none());
    }

    #[test]
    fn widget_options() {
        let o = TableBuilder::new("t").datum(rows()).init_options();
        assert_eq!(o["dom"], "Blfrtip");
        assert_eq!(o["pageLength"], 4);
        assert_eq!(o["lengthMenu"], json!([2, 4, 10, 20, 50]));
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert!(TableBuilder::new("t").render(None).is_none());
        assert!(TableBuilder::new("t").columns().is_empty());
    }

    #[test]
    fn body_cells_use_link_renderer() {
        let html = TableBuilder::new("t").datum(rows()).render(Some("mzspec:MSV1:f:scan:1")).unwrap();
        assert!(html.contains("gnpslibraryspectrum.jsp?SpectrumID=CCMSLIB00000001556"));
        assert!(html.contains("usi2=mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00000001557"));
        assert_eq!(html.matches("<tr data-row=").count(), 2);
        assert!(html.contains("$(document).ready"));
    }

    #[test]
    fn row_events_reach_page_listeners() {
        let html = TableBuilder::new("libTable").datum(rows()).render(None).unwrap();
        assert!(html.contains("var dt=$(sel).DataTable("));
        assert!(html.contains("$(sel).trigger('highlight',[dt.row(this).data(),true]);"));
        assert!(html.contains("$(sel).trigger('highlight',[dt.row(this).data(),false]);"));
        assert!(html.contains("$(sel).trigger('select',[dt.row(this).data(),on]);"));
    }

    #[test]
    fn ragged_rows_render_blank_cells() {
        let data = crate::rows::parse_rows(r#"[{"a":1,"b":2},{"a":3}]"#);
        let html = TableBuilder::new("t").datum(data).render(None).unwrap();
        assert!(html.contains("<tr data-row=\"1\"><td>3</td><td></td></tr>"));
    }

    #[test]
    fn highlight_and_select_broadcast() {
        let seen: Rc<RefCell<Vec<(String, bool)>>> = Rc::new(RefCell::new(Vec::new()));
        let mut t = TableBuilder::new("t").datum(rows());
        let a = seen.clone();
        let b = seen.clone();
        t.on(TableEvent::Highlight, move |r, on| a.borrow_mut().push((format!("h:{}", r["CompoundName"].as_str().unwrap_or_default()), on)))
            .on(TableEvent::Select, move |r, on| b.borrow_mut().push((format!("s:{}", r["Cosine"]), on)));
        assert_eq!(t.highlight(0, Some(true)), Some(true));
        assert_eq!(t.highlight(0, None), Some(false));
        assert_eq!(t.select(1, None), Some(true));
        assert_eq!(t.select(5, None), None);
        assert!(t.is_selected(1));
        assert!(!t.is_highlighted(0));
        assert_eq!(*seen.borrow(), vec![("h:caffeic acid".to_string(), true), ("h:caffeic acid".to_string(), false), ("s:0.81".to_string(), true)]);
        let html = t.render(None).unwrap();
        assert!(html.contains("<tr data-row=\"1\" class=\"selected\">"));
    }

    #[test]
    fn every_listener_hears_the_event() {
        let count = Rc::new(RefCell::new(0));
        let mut t = TableBuilder::new("t").datum(rows());
        for _ in 0..3 {
            let c = count.clone();
            t.on(TableEvent::Select, move |_, _| *c.borrow_mut() += 1);
        }
        t.select(0, Some(true));
        assert_eq!(*count.borrow(), 3);
    }
}
