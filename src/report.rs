use crate::rows::{Row, RowKind};
use crate::table::TableBuilder;
use crate::visibility::{self, Visibility};
use chrono::{DateTime, Local};
use serde::Serialize;

/// One table of the page and the container that holds it.
pub struct Section {
    pub container: &'static str,
    pub heading: &'static str,
    pub table: TableBuilder,
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub title: String,
    pub input_label: String,
    pub usi: Option<String>,
    pub params: String,
    pub generated: DateTime<Local>,
    pub row_kind: RowKind,
    pub library: Vec<Row>,
    pub matches: Vec<Row>,
    pub datasets: Option<Vec<Row>>,
    #[serde(skip)]
    pub layout: Layout,
    #[serde(skip)]
    pub visibility: Visibility,
}

#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub library_exclude: Vec<String>,
    pub match_exclude: Vec<String>,
    pub dataset_exclude: Vec<String>,
    pub sort_by: String,
    pub match_sort_by: String,
    pub ascending: bool,
}

impl Report {
    pub fn sections(&self) -> Vec<Section> {
        let l = &self.layout;
        let mut out = vec![
            Section { container: visibility::LIBRARY_TABLE, heading: "Library Matches", table: TableBuilder::new("libTable").datum(self.library.clone()).sort_by(&l.sort_by, l.ascending).filter_cols(&l.library_exclude) },
            Section { container: visibility::MATCH_TABLE, heading: "Matches", table: self.match_table().sort_by(&l.match_sort_by, l.ascending) },
        ];
        if let Some(d) = self.datasets.as_ref() {
            out.push(Section { container: visibility::DATASET_TABLE, heading: "Datasets", table: TableBuilder::new("datasetTable").datum(d.clone()).sort_by(&l.sort_by, l.ascending).filter_cols(&l.dataset_exclude) });
        }
        out
    }

    pub fn match_table(&self) -> TableBuilder {
        TableBuilder::new("dataTable").datum(self.matches.clone()).filter_cols(&self.layout.match_exclude)
    }

    pub fn input_usi(&self) -> Option<&str> { self.usi.as_deref() }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SortDirection;

    #[test]
    fn sections_in_page_order() {
        let rep = fixtures::report();
        let secs = rep.sections();
        assert_eq!(secs.iter().map(|s| s.container).collect::<Vec<_>>(), vec!["library_table", "match_table", "dataset_table"]);
        assert_eq!(secs.iter().map(|s| s.table.id().to_string()).collect::<Vec<_>>(), vec!["libTable", "dataTable", "datasetTable"]);
    }

    #[test]
    fn library_section_drops_bookkeeping_columns() {
        let secs = fixtures::report().sections();
        assert_eq!(secs[0].table.columns(), vec!["USI", "GNPSLibraryAccession", "Cosine"]);
        assert_eq!(secs[0].table.order(), Some((2, SortDirection::Desc)));
    }

    #[test]
    fn match_section_sorts_by_count() {
        let secs = fixtures::report().sections();
        assert_eq!(secs[1].table.order(), Some((3, SortDirection::Desc)));
        assert_eq!(secs[2].table.data().len(), 2);
    }

    #[test]
    fn no_dataset_section_without_datasets() {
        let mut rep = fixtures::report();
        rep.datasets = None;
        assert_eq!(rep.sections().len(), 2);
    }
}
