//! Typed LSIF graph elements.
//!
//! One line of an `.lsif` dump is one [`Element`]: a vertex or an edge,
//! discriminated by the JSON `type` field. Only the fields the engine reasons
//! about are typed; everything else (including derived `flattened*` fields)
//! lives in an ordered side-map so a parse/serialize cycle is lossless.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LsifError, Result};

pub type Id = u64;

pub const LABEL_METADATA: &str = "metaData";
pub const LABEL_SOURCE: &str = "source";
pub const LABEL_PROJECT: &str = "project";
pub const LABEL_DOCUMENT: &str = "document";
pub const LABEL_RANGE: &str = "range";
pub const LABEL_RESULT_SET: &str = "resultSet";
pub const LABEL_DEFINITION_RESULT: &str = "definitionResult";
pub const LABEL_REFERENCE_RESULT: &str = "referenceResult";
pub const LABEL_EVENT: &str = "$event";

pub const EDGE_CONTAINS: &str = "contains";
pub const EDGE_ITEM: &str = "item";
pub const EDGE_NEXT: &str = "next";
pub const EDGE_MONIKER: &str = "moniker";
pub const EDGE_DEFINITION: &str = "textDocument/definition";
pub const EDGE_REFERENCES: &str = "textDocument/references";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// One end of an edge: a single vertex (`outV`/`inV`) or a fan-out
/// (`outVs`/`inVs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexRefs {
    Single(Id),
    Many(Vec<Id>),
}

impl VertexRefs {
    pub fn ids(&self) -> &[Id] {
        match self {
            VertexRefs::Single(id) => std::slice::from_ref(id),
            VertexRefs::Many(ids) => ids,
        }
    }

    pub fn offset(&mut self, by: Id) -> Result<()> {
        match self {
            VertexRefs::Single(id) => *id = offset_id(*id, by)?,
            VertexRefs::Many(ids) => {
                for id in ids.iter_mut() {
                    *id = offset_id(*id, by)?;
                }
            }
        }
        Ok(())
    }

    fn from_pair(single: Option<Id>, many: Option<Vec<Id>>, name: &str) -> std::result::Result<Self, String> {
        match (single, many) {
            (Some(id), None) => Ok(VertexRefs::Single(id)),
            (None, Some(ids)) => Ok(VertexRefs::Many(ids)),
            (Some(_), Some(_)) => Err(format!("edge has both `{name}V` and `{name}Vs`")),
            (None, None) => Err(format!("edge has neither `{name}V` nor `{name}Vs`")),
        }
    }

    fn into_pair(self) -> (Option<Id>, Option<Vec<Id>>) {
        match self {
            VertexRefs::Single(id) => (Some(id), None),
            VertexRefs::Many(ids) => (None, Some(ids)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Vertex(Vertex),
    Edge(Edge),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVertex")]
pub struct Vertex {
    /// Absent only on synthesized preamble vertices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawVertex {
    id: Option<Id>,
    label: String,
    uri: Option<String>,
    resource: Option<String>,
    contents: Option<String>,
    start: Option<Position>,
    end: Option<Position>,
    identifier: Option<String>,
    name: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawVertex> for Vertex {
    type Error = String;

    fn try_from(raw: RawVertex) -> std::result::Result<Self, Self::Error> {
        if raw.id.is_none() && !is_preamble_label(&raw.label) {
            return Err(format!("`{}` vertex has no id", raw.label));
        }
        Ok(Vertex {
            id: raw.id,
            label: raw.label,
            uri: raw.uri,
            resource: raw.resource,
            contents: raw.contents,
            start: raw.start,
            end: raw.end,
            identifier: raw.identifier,
            name: raw.name,
            extra: raw.extra,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEdge", into = "RawEdge")]
pub struct Edge {
    pub id: Option<Id>,
    pub label: String,
    pub out_v: VertexRefs,
    pub in_v: VertexRefs,
    /// Owning document of cross-document `item` edges.
    pub shard: Option<Id>,
    pub document: Option<Id>,
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct RawEdge {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Id>,
    label: String,
    #[serde(rename = "outV", skip_serializing_if = "Option::is_none")]
    out_v: Option<Id>,
    #[serde(rename = "outVs", skip_serializing_if = "Option::is_none")]
    out_vs: Option<Vec<Id>>,
    #[serde(rename = "inV", skip_serializing_if = "Option::is_none")]
    in_v: Option<Id>,
    #[serde(rename = "inVs", skip_serializing_if = "Option::is_none")]
    in_vs: Option<Vec<Id>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shard: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<Id>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawEdge> for Edge {
    type Error = String;

    fn try_from(raw: RawEdge) -> std::result::Result<Self, Self::Error> {
        Ok(Edge {
            id: raw.id,
            out_v: VertexRefs::from_pair(raw.out_v, raw.out_vs, "out")?,
            in_v: VertexRefs::from_pair(raw.in_v, raw.in_vs, "in")?,
            label: raw.label,
            shard: raw.shard,
            document: raw.document,
            extra: raw.extra,
        })
    }
}

impl From<Edge> for RawEdge {
    fn from(edge: Edge) -> Self {
        let (out_v, out_vs) = edge.out_v.into_pair();
        let (in_v, in_vs) = edge.in_v.into_pair();
        RawEdge {
            id: edge.id,
            label: edge.label,
            out_v,
            out_vs,
            in_v,
            in_vs,
            shard: edge.shard,
            document: edge.document,
            extra: edge.extra,
        }
    }
}

/// `id + by`, or [`LsifError::IdOverflow`].
pub fn offset_id(id: Id, by: Id) -> Result<Id> {
    id.checked_add(by)
        .ok_or(LsifError::IdOverflow { id, offset: by })
}

pub fn is_preamble_label(label: &str) -> bool {
    label == LABEL_METADATA || label == LABEL_SOURCE
}

// ============================================================================
// Lifecycle events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Begin,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    Document,
    Project,
}

/// `$event` vertex marking the begin/end of a document or project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub scope: EventScope,
    pub data: Id,
}

impl Vertex {
    pub fn new(id: Option<Id>, label: impl Into<String>) -> Self {
        Vertex {
            id,
            label: label.into(),
            uri: None,
            resource: None,
            contents: None,
            start: None,
            end: None,
            identifier: None,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn lifecycle_event(&self) -> Option<LifecycleEvent> {
        if self.label != LABEL_EVENT {
            return None;
        }
        let kind = match self.extra.get("kind").and_then(Value::as_str)? {
            "begin" => EventKind::Begin,
            "end" => EventKind::End,
            _ => return None,
        };
        let scope = match self.extra.get("scope").and_then(Value::as_str)? {
            "document" => EventScope::Document,
            "project" => EventScope::Project,
            _ => return None,
        };
        let data = self.event_data()?;
        Some(LifecycleEvent { kind, scope, data })
    }

    /// The id an `$event` vertex points at, if this is one.
    pub fn event_data(&self) -> Option<Id> {
        if self.label != LABEL_EVENT {
            return None;
        }
        self.extra.get("data").and_then(Value::as_u64)
    }

    pub fn set_event_data(&mut self, id: Id) {
        self.extra.insert("data".to_string(), Value::from(id));
    }
}

// ============================================================================
// Element accessors
// ============================================================================

impl Element {
    pub fn id(&self) -> Option<Id> {
        match self {
            Element::Vertex(v) => v.id,
            Element::Edge(e) => e.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Element::Vertex(v) => &v.label,
            Element::Edge(e) => &e.label,
        }
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Element::Vertex(v) => Some(v),
            Element::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Element::Edge(e) => Some(e),
            Element::Vertex(_) => None,
        }
    }

    pub fn extra(&self) -> &Map<String, Value> {
        match self {
            Element::Vertex(v) => &v.extra,
            Element::Edge(e) => &e.extra,
        }
    }

    /// Attach (or overwrite in place) a derived field.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let extra = match self {
            Element::Vertex(v) => &mut v.extra,
            Element::Edge(e) => &mut e.extra,
        };
        extra.insert(key.into(), value.into());
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse one record. `line` is 1-based and only used for error reporting.
///
/// A known producer defect leaves a single raw control character inside
/// otherwise valid JSON; that character is removed and the parse retried once.
pub fn parse_element(text: &str, line: usize) -> Result<Element> {
    let err = match serde_json::from_str::<Element>(text) {
        Ok(element) => return Ok(element),
        Err(err) => err,
    };

    if let Some(repaired) = strip_stray_control_char(text) {
        tracing::debug!(line, "retrying record without stray control character");
        return serde_json::from_str::<Element>(&repaired).map_err(|e| LsifError::MalformedRecord {
            line,
            message: e.to_string(),
        });
    }

    Err(LsifError::MalformedRecord {
        line,
        message: err.to_string(),
    })
}

/// Parse a whole dump, skipping blank lines.
pub fn parse_records(text: &str) -> Result<Vec<Element>> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| parse_element(l, i + 1))
        .collect()
}

fn strip_stray_control_char(text: &str) -> Option<String> {
    let pos = text.find(|c: char| c <= '\u{1f}' && !matches!(c, '\t' | '\n' | '\r'))?;
    let mut repaired = text.to_string();
    repaired.remove(pos);
    Some(repaired)
}
