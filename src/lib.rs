//! Interactive result tables for MASST reports.
//!
//! The annotated result tree is flattened into row records, which are rendered
//! as HTML tables driven by DataTables, or exported as CSV, TSV, JSON and Markdown.

pub mod tree;
pub mod usi;
pub mod rows;
pub mod cell;
pub mod table;
pub mod visibility;
pub mod template;
pub mod report;
pub mod html;
pub mod markdown;

pub use report::{Layout, Report, Section};
pub use rows::{Row, RowKind};
pub use table::TableBuilder;
