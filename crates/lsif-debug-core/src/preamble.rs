//! The two records every linked dump starts with.

use serde_json::Value;
use url::Url;

use crate::element::{Element, Vertex, LABEL_METADATA, LABEL_SOURCE};

/// LSIF protocol version advertised by the synthesized `metaData` vertex.
pub const LSIF_VERSION: &str = "0.6.0-next.1";

pub fn metadata_preamble() -> Element {
    let mut vertex = Vertex::new(None, LABEL_METADATA);
    vertex
        .extra
        .insert("version".to_string(), Value::from(LSIF_VERSION));
    Element::Vertex(vertex)
}

/// `source` vertex pointing viewers at the local checkout.
pub fn source_preamble(workspace_root: &Url) -> Element {
    let mut vertex = Vertex::new(None, LABEL_SOURCE);
    vertex
        .extra
        .insert("workspaceRoot".to_string(), Value::from(workspace_root.as_str()));
    Element::Vertex(vertex)
}
