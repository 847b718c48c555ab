//! Islands
//!
//! An island is a component subtree the server marks for independent
//! hydration. Its markup is delimited by a pair of comments,
//! `<!-- start_<marker> -->` and `<!-- end_<marker> -->`, and its children
//! (if any) by `start_<slot>`/`end_<slot>` comments inside it.
//!
//! The props of every island go into an [`IslandManifest`], serialized as
//! JSON next to the markup, so the client can rebuild the component node.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::vdom::PropValue;

/// Element id of the `<script>` tag carrying the manifest.
pub const MANIFEST_SCRIPT_ID: &str = "tessera-islands";

/// One island found during a server render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Island {
    pub marker: String,
    pub source_path: String,
    #[serde(default)]
    pub props: IndexMap<String, PropValue>,
    /// Id of the children slot, if the island received children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
}

/// All islands of one page, by marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IslandManifest {
    islands: IndexMap<String, Island>,
}

impl IslandManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `island.marker`.
    pub fn insert(&mut self, island: Island) {
        self.islands.insert(island.marker.clone(), island);
    }

    pub fn get(&self, marker: &str) -> Option<&Island> {
        self.islands.get(marker)
    }

    pub fn len(&self) -> usize {
        self.islands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Island> {
        self.islands.values()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The manifest as a `<script type="application/json">` tag.
    pub fn script_tag(&self) -> Result<String> {
        // Keep markup out of the script body; `<` only occurs inside strings.
        let json = self.to_json()?.replace('<', "\\u003c");
        Ok(format!(
            r#"<script type="application/json" id="{MANIFEST_SCRIPT_ID}">{json}</script>"#
        ))
    }
}

pub(crate) fn start_comment(id: &str) -> String {
    format!("<!-- start_{id} -->")
}

pub(crate) fn end_comment(id: &str) -> String {
    format!("<!-- end_{id} -->")
}
