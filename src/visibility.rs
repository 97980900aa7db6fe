use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LIBRARY_TABLE: &str = "library_table";
pub const MATCH_TABLE: &str = "match_table";
pub const DATASET_TABLE: &str = "dataset_table";
pub const PARAMS: &str = "paramsDiv";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    #[default]
    Block,
    None,
}

impl DisplayState {
    pub fn css(self) -> &'static str { match self { DisplayState::Block => "block", DisplayState::None => "none" } }
    pub fn flipped(self) -> Self { match self { DisplayState::Block => DisplayState::None, DisplayState::None => DisplayState::Block } }
}

/// Shown/hidden state per container id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Visibility {
    containers: BTreeMap<String, DisplayState>,
}

impl Visibility {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, id: &str, d: DisplayState) -> Self {
        self.containers.insert(id.to_string(), d);
        self
    }

    pub fn display(&self, id: &str) -> DisplayState { self.containers.get(id).copied().unwrap_or_default() }

    pub fn is_shown(&self, id: &str) -> bool { self.display(id) == DisplayState::Block }

    pub fn toggle(&mut self, id: &str) -> DisplayState {
        let d = self.display(id).flipped();
        self.containers.insert(id.to_string(), d);
        log::trace!("Container {} is now {}", id, d.css());
        d
    }

    pub fn style_attr(&self, id: &str) -> String { format!("style=\"display:{}\"", self.display(id).css()) }
}

/// The one client-side toggle every button calls.
pub const TOGGLE_SCRIPT: &str = "<script>function toggleDisplay(id){var div=document.getElementById(id);if(!div){return;}div.style.display=(div.style.display==='none')?'block':'none';}</script>";

pub fn toggle_button(id: &str, label: &str) -> String {
    format!("<button class=\"pill\" onclick=\"toggleDisplay('{}')\">{}</button>", crate::cell::attr_escape(id), crate::cell::html_escape(label))
}
