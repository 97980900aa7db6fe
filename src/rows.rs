use crate::tree::{has_match_count, has_matches, or_empty, text, visit_all, Node};
use crate::usi::split_usi;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat record: column name to display value, in column order.
pub type Row = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind { Summary, Microbiome, Matches }

pub fn flatten(root: &Node, kind: RowKind) -> Vec<Row> {
    match kind {
        RowKind::Summary => summary_rows(root),
        RowKind::Microbiome => microbiome_rows(root),
        RowKind::Matches => match_rows(root),
    }
}

fn is_matched(node: &Node) -> bool { has_matches(node) || has_match_count(node) }

fn node_head(node: &Node) -> Row {
    let mut row = Row::new();
    row.insert("Name".to_string(), or_empty(&node.name));
    row.insert("NCBI".to_string(), or_empty(&node.ncbi));
    row.insert("Rank".to_string(), or_empty(&node.rank));
    row
}

fn push_counts(row: &mut Row, node: &Node) {
    row.insert("Matches".to_string(), or_empty(&node.matched_size));
    row.insert("Samples".to_string(), or_empty(&node.group_size));
    row.insert("Fraction".to_string(), Value::String(format_fraction(&node.occurrence_fraction, &text(&node.name))));
}

/// One row per matched node.
pub fn summary_rows(root: &Node) -> Vec<Row> {
    let mut out = Vec::new();
    visit_all(root, &mut |node: &Node| {
        if !is_matched(node) { return; }
        let mut row = node_head(node);
        push_counts(&mut row, node);
        out.push(row);
    });
    out
}

/// Summary rows with the intervention and community columns of microbiome trees.
pub fn microbiome_rows(root: &Node) -> Vec<Row> {
    let mut out = Vec::new();
    visit_all(root, &mut |node: &Node| {
        if !is_matched(node) { return; }
        let mut row = node_head(node);
        row.insert("Interventions".to_string(), or_empty(&node.interventions));
        row.insert("Community_composition".to_string(), or_empty(&node.community_composition));
        push_counts(&mut row, node);
        out.push(row);
    });
    out
}

/// One row per match, with the USI split into dataset and file.
pub fn match_rows(root: &Node) -> Vec<Row> {
    let mut out = Vec::new();
    visit_all(root, &mut |node: &Node| {
        if !has_matches(node) { return; }
        for m in &node.matches {
            let mut row = node_head(node);
            for (k, v) in m { row.insert(k.clone(), v.clone()); }
            let usi = match m.get("USI") { Some(Value::String(s)) => s.clone(), Some(Value::Null) | None => String::new(), Some(v) => v.to_string() };
            let (massive, file) = split_usi(&usi);
            row.insert("MassIVE".to_string(), Value::String(massive));
            row.insert("File".to_string(), Value::String(file));
            out.push(row);
        }
    });
    out
}

/// Four decimals; absent counts as zero, unparseable values render empty.
pub fn format_fraction(v: &Option<Value>, node: &str) -> String {
    let x = match v {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_leading_number(s),
        Some(_) => None,
    };
    match x {
        Some(x) if x.is_finite() => fixed4(x),
        _ => { log::debug!("Unparseable occurrence_fraction for {}: {:?}", node, v); String::new() }
    }
}

/// Longest numeric prefix, so `"0.25 (approx)"` reads as 0.25.
fn parse_leading_number(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let n = t.find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))).unwrap_or(t.len());
    (1..=n).rev().find_map(|end| t[..end].parse::<f64>().ok())
}

/// Four decimals with exact ties rounded away from zero (`{:.4}` would round them to even).
fn fixed4(x: f64) -> String {
    let exact = format!("{:.60}", x.abs());
    let tie = exact.split_once('.').is_some_and(|(_, d)| d.as_bytes().get(4) == Some(&b'5') && d[5..].bytes().all(|b| b == b'0'));
    if !tie { return format!("{:.4}", x); }
    let up = ((x.abs() * 1e4).floor() + 1.0) / 1e4;
    format!("{}{:.4}", if x < 0.0 { "-" } else { "" }, up)
}

/// Library match records as produced by the search export; anything else yields no rows.
pub fn parse_rows(text: &str) -> Vec<Row> {
    let t = text.trim();
    if t.is_empty() { return Vec::new(); }
    match serde_json::from_str::<Vec<Row>>(t) {
        Ok(rows) => rows,
        Err(e) => { log::warn!("Library data is not a JSON array of records: {}", e); Vec::new() }
    }
}
