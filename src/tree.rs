use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub type Match = Map<String, Value>;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(rename = "NCBI", default, skip_serializing_if = "Option::is_none")]
    pub ncbi: Option<Value>,
    #[serde(rename = "Rank", default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Value>,
    #[serde(rename = "Interventions", default, skip_serializing_if = "Option::is_none")]
    pub interventions: Option<Value>,
    #[serde(rename = "Community_composition", default, skip_serializing_if = "Option::is_none")]
    pub community_composition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_fraction: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub matches: Vec<Match>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches_json: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<Node>,
    // collapsed subtrees of the interactive tree view
    #[serde(rename = "_children", default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub hidden_children: Vec<Node>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

pub fn parse_tree(text: &str) -> Result<Node> {
    let mut root: Node = serde_json::from_str(text).context("tree is not a valid node object")?;
    expand_matches_json(&mut root);
    Ok(root)
}

pub fn load_tree(path: &Path) -> Result<Node> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read tree {}", path.to_string_lossy()))?;
    parse_tree(&text).with_context(|| format!("failed to parse tree {}", path.to_string_lossy()))
}

/// Nodes written by the tree generator carry their matches as an embedded JSON string.
fn expand_matches_json(node: &mut Node) {
    if node.matches.is_empty() && let Some(raw) = node.matches_json.as_deref() {
        match serde_json::from_str::<Vec<Match>>(raw) {
            Ok(m) => node.matches = m,
            Err(e) => log::debug!("Ignoring matches_json of {}: {}", text(&node.name), e),
        }
    }
    for c in node.children.iter_mut().chain(node.hidden_children.iter_mut()) { expand_matches_json(c); }
}

/// Pre-order walk over visible and collapsed children.
pub fn visit_all<'a, F: FnMut(&'a Node)>(node: &'a Node, f: &mut F) {
    f(node);
    for c in node.children.iter().chain(node.hidden_children.iter()) { visit_all(c, f); }
}

pub fn has_matches(node: &Node) -> bool { !node.matches.is_empty() }

pub fn has_match_count(node: &Node) -> bool { node.matched_size.as_ref().is_some_and(truthy) }

pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Field value or empty string when absent.
pub fn or_empty(v: &Option<Value>) -> Value {
    match v { Some(Value::Null) | None => Value::String(String::new()), Some(x) => x.clone() }
}

pub fn text(v: &Option<Value>) -> String {
    match v { Some(Value::String(s)) => s.clone(), Some(Value::Null) | None => String::new(), Some(x) => x.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r#"{
        "name": "root", "NCBI": 1, "matched_size": 3, "group_size": 10,
        "children": [
            {"name": "Bacteria", "NCBI": "2", "Rank": "superkingdom", "matched_size": 2,
             "matches": [{"USI": "mzspec:MSV000012345:a.mzML:scan:5", "Cosine": 0.9}],
             "children": null},
            {"name": "Fungi", "matched_size": 0,
             "_children": [{"name": "Yeast", "matched_size": "1",
                            "matches_json": "[{\"USI\":\"mzspec:MSV000054321:y.mzML:scan:1\",\"Cosine\":0.8,\"Matching Peaks\":6}]"}]}
        ]
    }"#;

    #[test]
    fn parses_mixed_value_types() {
        let root = parse_tree(TREE).unwrap();
        assert_eq!(text(&root.ncbi), "1");
        assert_eq!(text(&root.children[0].ncbi), "2");
        assert!(root.children[0].children.is_empty());
        assert_eq!(root.children[0].matches.len(), 1);
    }

    #[test]
    fn expands_embedded_matches() {
        let root = parse_tree(TREE).unwrap();
        let yeast = &root.children[1].hidden_children[0];
        assert_eq!(yeast.matches.len(), 1);
        assert_eq!(yeast.matches[0]["Matching Peaks"], 6);
    }

    #[test]
    fn broken_embedded_matches_are_ignored() {
        let root = parse_tree(r#"{"name":"x","matches_json":"not json"}"#).unwrap();
        assert!(root.matches.is_empty());
    }

    #[test]
    fn visits_collapsed_children_in_preorder() {
        let root = parse_tree(TREE).unwrap();
        let mut names = Vec::new();
        visit_all(&root, &mut |n: &Node| names.push(text(&n.name)));
        assert_eq!(names, vec!["root", "Bacteria", "Fungi", "Yeast"]);
    }

    #[test]
    fn match_predicates() {
        let root = parse_tree(TREE).unwrap();
        assert!(!has_matches(&root));
        assert!(has_match_count(&root));
        assert!(has_matches(&root.children[0]));
        assert!(!has_match_count(&root.children[1]));
        assert!(has_match_count(&root.children[1].hidden_children[0]));
    }

    #[test]
    fn unknown_fields_survive() {
        let root = parse_tree(r#"{"name":"x","masst_type":"microbe"}"#).unwrap();
        assert_eq!(root.extra["masst_type"], "microbe");
    }

    #[test]
    fn rejects_non_object() {
        assert!(parse_tree("42").is_err());
    }
}
