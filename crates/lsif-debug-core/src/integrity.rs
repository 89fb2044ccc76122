//! Referential integrity over a record stream.
//!
//! Records must arrive in dependency order: every id is declared once, and
//! every reference points at an id that was already declared. The checker is
//! a single left-to-right pass over the same sequence the graph was built from.

use std::collections::HashSet;

use serde_json::Value;

use crate::element::{Element, Id, VertexRefs, LABEL_EVENT};
use crate::error::{LsifError, Result};

pub const ID_PLACEHOLDER: &str = "ID";
pub const OUT_V_PLACEHOLDER: &str = "OUTV";
pub const IN_V_PLACEHOLDER: &str = "INV";
pub const SHARD_PLACEHOLDER: &str = "SHARD";
pub const DOCUMENT_PLACEHOLDER: &str = "DOCUMENT";
pub const EVENT_DATA_PLACEHOLDER: &str = "DATA";

#[derive(Debug, Default)]
pub struct IntegrityChecker {
    seen: HashSet<Id>,
    record: usize,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the next record in stream order.
    pub fn check(&mut self, element: &Element) -> Result<()> {
        self.record += 1;

        if let Some(id) = element.id() {
            if !self.seen.insert(id) {
                return Err(LsifError::DuplicateId {
                    id,
                    record: self.record,
                });
            }
        }

        match element {
            Element::Vertex(vertex) => {
                if let Some(data) = vertex.event_data() {
                    self.require(data, "data")?;
                }
            }
            Element::Edge(edge) => {
                let out_field = match edge.out_v {
                    VertexRefs::Single(_) => "outV",
                    VertexRefs::Many(_) => "outVs",
                };
                for &id in edge.out_v.ids() {
                    self.require(id, out_field)?;
                }
                let in_field = match edge.in_v {
                    VertexRefs::Single(_) => "inV",
                    VertexRefs::Many(_) => "inVs",
                };
                for &id in edge.in_v.ids() {
                    self.require(id, in_field)?;
                }
                if let Some(shard) = edge.shard {
                    self.require(shard, "shard")?;
                }
                if let Some(document) = edge.document {
                    self.require(document, "document")?;
                }
            }
        }

        Ok(())
    }

    pub fn check_all<'a>(&mut self, elements: impl IntoIterator<Item = &'a Element>) -> Result<()> {
        elements.into_iter().try_for_each(|e| self.check(e))
    }

    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    fn require(&self, id: Id, field: &'static str) -> Result<()> {
        if self.seen.contains(&id) {
            Ok(())
        } else {
            Err(LsifError::UnknownId {
                id,
                field,
                record: self.record,
            })
        }
    }
}

/// Replace identifier values in a serialized record with opaque placeholders.
///
/// Presence is preserved, and fan-out cardinality survives as
/// `"inVs count: N"`, so structurally identical dumps with different id
/// assignments serialize identically.
pub fn strip_identifiers(record: &mut Value) {
    let Some(object) = record.as_object_mut() else {
        return;
    };

    let is_event = object.get("label").and_then(Value::as_str) == Some(LABEL_EVENT);

    for (field, placeholder) in [
        ("id", ID_PLACEHOLDER),
        ("outV", OUT_V_PLACEHOLDER),
        ("inV", IN_V_PLACEHOLDER),
        ("shard", SHARD_PLACEHOLDER),
        ("document", DOCUMENT_PLACEHOLDER),
    ] {
        if let Some(value) = object.get_mut(field) {
            *value = Value::from(placeholder);
        }
    }

    for field in ["inVs", "outVs"] {
        if let Some(value) = object.get_mut(field) {
            if let Some(count) = value.as_array().map(Vec::len) {
                *value = Value::from(format!("{field} count: {count}"));
            }
        }
    }

    if is_event {
        if let Some(value) = object.get_mut("data") {
            *value = Value::from(EVENT_DATA_PLACEHOLDER);
        }
    }
}
