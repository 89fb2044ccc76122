//! In-memory LSIF graph with bidirectional adjacency.
//!
//! Built once from an ordered record sequence and read-only afterwards:
//! - `by_id`: id → element (vertices, and edges that carry an id)
//! - `edges_by_source`: `outV`/`outVs` id → edges leaving it
//! - `edges_by_target`: `inV`/`inVs` id → edges arriving at it
//!
//! Adjacency stores positions into `elements`, in record order, so every
//! traversal is deterministic. Missing keys read as "no edges".

use std::collections::HashMap;

use crate::element::{parse_element, Edge, Element, Id, Vertex};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    elements: Vec<Element>,
    by_id: HashMap<Id, usize>,
    edges_by_source: HashMap<Id, Vec<usize>>,
    edges_by_target: HashMap<Id, Vec<usize>>,
}

impl Graph {
    /// Parse raw lines (blank lines skipped) and index them.
    pub fn from_lines<'a, I>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut elements = Vec::new();
        for (i, line) in lines.into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            elements.push(parse_element(line, i + 1)?);
        }
        Ok(Self::from_elements(elements))
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_lines(text.lines())
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        let mut graph = Graph {
            elements: Vec::with_capacity(elements.len()),
            ..Default::default()
        };
        for element in elements {
            graph.push(element);
        }
        tracing::debug!(
            elements = graph.elements.len(),
            ids = graph.by_id.len(),
            "indexed graph"
        );
        graph
    }

    fn push(&mut self, element: Element) {
        let index = self.elements.len();

        // First declaration wins; duplicates are the integrity checker's concern.
        if let Some(id) = element.id() {
            self.by_id.entry(id).or_insert(index);
        }

        if let Element::Edge(edge) = &element {
            for &source in edge.out_v.ids() {
                register(&mut self.edges_by_source, source, index);
            }
            for &target in edge.in_v.ids() {
                register(&mut self.edges_by_target, target, index);
            }
        }

        self.elements.push(element);
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: Id) -> Option<&Element> {
        self.by_id.get(&id).map(|&i| &self.elements[i])
    }

    pub fn vertex(&self, id: Id) -> Option<&Vertex> {
        self.element(id).and_then(Element::as_vertex)
    }

    /// Vertex with `id`, only if it carries `label`.
    pub fn vertex_labeled(&self, id: Id, label: &str) -> Option<&Vertex> {
        self.vertex(id).filter(|v| v.label == label)
    }

    pub fn edges_from(&self, id: Id) -> impl Iterator<Item = &Edge> + '_ {
        self.edges_in(&self.edges_by_source, id)
    }

    pub fn edges_to(&self, id: Id) -> impl Iterator<Item = &Edge> + '_ {
        self.edges_in(&self.edges_by_target, id)
    }

    fn edges_in<'g>(
        &'g self,
        index: &'g HashMap<Id, Vec<usize>>,
        id: Id,
    ) -> impl Iterator<Item = &'g Edge> + 'g {
        index
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|&i| self.elements[i].as_edge())
    }

    /// Largest id declared by any element.
    pub fn max_id(&self) -> Option<Id> {
        self.by_id.keys().copied().max()
    }
}

fn register(index: &mut HashMap<Id, Vec<usize>>, key: Id, element: usize) {
    let edges = index.entry(key).or_default();
    // A fan-out listing the same vertex twice still registers the edge once.
    if edges.last() != Some(&element) {
        edges.push(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"id":1,"type":"vertex","label":"document","uri":"file:///a/b.cs"}
{"id":2,"type":"vertex","label":"range","start":{"line":0,"character":0},"end":{"line":0,"character":3}}
{"id":3,"type":"vertex","label":"range","start":{"line":1,"character":0},"end":{"line":1,"character":3}}

{"id":4,"type":"edge","label":"contains","outV":1,"inVs":[2,3,3]}
{"id":5,"type":"vertex","label":"resultSet"}
{"id":6,"type":"edge","label":"next","outV":2,"inV":5}
"#;

    #[test]
    fn test_indexes_vertices_and_edges() {
        let graph = Graph::from_text(SAMPLE).unwrap();

        assert_eq!(graph.len(), 6);
        assert_eq!(graph.vertex(1).unwrap().uri.as_deref(), Some("file:///a/b.cs"));
        assert!(graph.vertex(4).is_none(), "edge ids resolve to elements, not vertices");
        assert_eq!(graph.element(4).unwrap().label(), "contains");
        assert_eq!(graph.max_id(), Some(6));
    }

    #[test]
    fn test_fan_out_registers_once_per_target() {
        let graph = Graph::from_text(SAMPLE).unwrap();

        assert_eq!(graph.edges_from(1).count(), 1);
        assert_eq!(graph.edges_to(2).count(), 1);
        assert_eq!(graph.edges_to(3).count(), 1);
        assert_eq!(graph.edges_to(5).next().unwrap().label, "next");
    }

    #[test]
    fn test_absent_keys_yield_no_edges() {
        let graph = Graph::from_text(SAMPLE).unwrap();

        assert_eq!(graph.edges_from(999).count(), 0);
        assert_eq!(graph.edges_to(1).count(), 0);
    }

    #[test]
    fn test_malformed_line_reports_its_line_number() {
        let err = Graph::from_lines(["{\"id\":1,\"type\":\"vertex\",\"label\":\"document\"}", "", "{oops"])
            .unwrap_err();
        assert!(matches!(err, crate::LsifError::MalformedRecord { line: 3, .. }));
    }
}
