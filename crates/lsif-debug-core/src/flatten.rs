//! Flattening: make an LSIF dump legible line by line.
//!
//! Each record of interest gets derived, human-readable fields computed by
//! short traversals (1–3 hops) over the already-built [`Graph`]:
//!
//! - `range` → `flattenedUri` (owning document) plus the active document/project context
//! - `definitionResult` / `referenceResult` → `flattenedResults`
//! - `resultSet` → `flattenedOrigins`, `flattenedResults-<request>`, `monikers`
//! - `item` edge → `flattenedTargetUris`, `flattenedRequests` plus active context
//!
//! Topology is never changed. Every derived list is sorted, so output is
//! stable across runs and can be diffed. After enrichment, ids can be
//! replaced by placeholders and the serialized lines sorted.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::element::{
    Edge, Element, EventKind, EventScope, Id, LifecycleEvent, Position, Vertex, EDGE_CONTAINS,
    EDGE_DEFINITION, EDGE_ITEM, EDGE_MONIKER, EDGE_NEXT, EDGE_REFERENCES, LABEL_DEFINITION_RESULT,
    LABEL_RANGE, LABEL_REFERENCE_RESULT, LABEL_RESULT_SET,
};
use crate::error::Result;
use crate::graph::Graph;
use crate::integrity::{strip_identifiers, IntegrityChecker};

/// Stand-in URI for ranges whose owning document cannot be found.
pub const UNRESOLVED_DOCUMENT_URI: &str = "file:///failed-to-find-document-node.txt";

pub const FIELD_URI: &str = "flattenedUri";
pub const FIELD_ACTIVE_DOCUMENTS: &str = "flattenedActiveDocuments";
pub const FIELD_ACTIVE_PROJECTS: &str = "flattenedActiveProjects";
pub const FIELD_RESULTS: &str = "flattenedResults";
pub const FIELD_ORIGINS: &str = "flattenedOrigins";
pub const FIELD_MONIKERS: &str = "monikers";
pub const FIELD_TARGET_URIS: &str = "flattenedTargetUris";
pub const FIELD_REQUESTS: &str = "flattenedRequests";

#[derive(Debug, Clone, Default)]
pub struct FlattenOptions {
    /// Pretty-print each record instead of one compact line.
    pub format_output: bool,
    /// Replace identifiers with placeholders after enrichment.
    pub strip_ids: bool,
    /// Sort serialized records lexicographically.
    pub sort_output: bool,
    /// Warn about ranges that fall back to [`UNRESOLVED_DOCUMENT_URI`].
    pub report_unresolved_documents: bool,
}

#[derive(Debug, Clone)]
pub struct FlattenOutput {
    pub lines: Vec<String>,
    /// Documents begun but never ended by an `$event`.
    pub remaining_active_documents: usize,
    pub remaining_active_projects: usize,
    pub diagnostics: Diagnostics,
}

/// Check, enrich and serialize every record of `graph`, in record order.
pub fn flatten(graph: &Graph, options: &FlattenOptions) -> Result<FlattenOutput> {
    let mut checker = IntegrityChecker::new();
    let mut flattener = Flattener::new(graph, options.report_unresolved_documents);
    let mut lines = Vec::with_capacity(graph.len());

    for element in graph.elements() {
        checker.check(element)?;

        let enriched = flattener.enrich(element);
        let mut value = enriched.to_value()?;
        if options.strip_ids {
            strip_identifiers(&mut value);
        }
        lines.push(render(&value, options.format_output)?);
    }

    if options.sort_output {
        lines.sort();
    }

    let Flattener {
        active, diagnostics, ..
    } = flattener;

    tracing::info!(
        records = lines.len(),
        remaining_documents = active.documents.len(),
        remaining_projects = active.projects.len(),
        "flattened graph"
    );

    Ok(FlattenOutput {
        lines,
        remaining_active_documents: active.documents.len(),
        remaining_active_projects: active.projects.len(),
        diagnostics,
    })
}

/// Parse, index and flatten a whole dump.
pub fn flatten_text(text: &str, options: &FlattenOptions) -> Result<FlattenOutput> {
    let graph = Graph::from_text(text)?;
    flatten(&graph, options)
}

fn render(value: &Value, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

// ============================================================================
// Per-pass context
// ============================================================================

/// Documents and projects currently between `$event` begin/end.
#[derive(Debug, Default)]
struct ActiveContext {
    documents: BTreeSet<Id>,
    projects: BTreeSet<Id>,
}

impl ActiveContext {
    fn apply(&mut self, event: LifecycleEvent) {
        let set = match event.scope {
            EventScope::Document => &mut self.documents,
            EventScope::Project => &mut self.projects,
        };
        match event.kind {
            EventKind::Begin => {
                set.insert(event.data);
            }
            EventKind::End => {
                set.remove(&event.data);
            }
        }
    }

    fn documents(&self, graph: &Graph) -> String {
        join_labels(&self.documents, |id| graph.vertex(id)?.uri.as_deref())
    }

    fn projects(&self, graph: &Graph) -> String {
        join_labels(&self.projects, |id| graph.vertex(id)?.name.as_deref())
    }
}

fn join_labels<'g>(ids: &BTreeSet<Id>, label: impl Fn(Id) -> Option<&'g str>) -> String {
    ids.iter()
        .filter_map(|&id| label(id))
        .collect::<Vec<_>>()
        .join(";")
}

// ============================================================================
// Range locations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct RangeLocation<'g> {
    uri: &'g str,
    start: Position,
    end: Position,
}

impl RangeLocation<'_> {
    fn sort_key(&self) -> (String, u32, u32, u32, u32) {
        (
            document_path(self.uri),
            self.start.line,
            self.start.character,
            self.end.line,
            self.end.character,
        )
    }

    fn render(&self) -> String {
        format!(
            "{}: ({}, {}) to ({}, {})",
            self.uri, self.start.line, self.start.character, self.end.line, self.end.character
        )
    }
}

/// Path component of a document URI, used as the primary sort key.
///
/// `file:` URIs are decoded to the local path so percent escapes do not
/// change the order; other schemes sort by their raw URL path.
fn document_path(uri: &str) -> String {
    let Ok(url) = url::Url::parse(uri) else {
        return uri.to_string();
    };
    if url.scheme() == "file" {
        if let Ok(path) = url.to_file_path() {
            return path.to_string_lossy().replace('\\', "/");
        }
    }
    url.path().to_string()
}

fn sorted_renders(mut locations: Vec<RangeLocation<'_>>) -> Vec<String> {
    locations.sort_by_cached_key(RangeLocation::sort_key);
    locations.iter().map(RangeLocation::render).collect()
}

/// URI of the document that `contains` this range.
fn owning_document<'g>(graph: &'g Graph, range: &Vertex) -> Option<&'g str> {
    if range.label != LABEL_RANGE {
        return None;
    }
    graph
        .edges_to(range.id?)
        .filter(|edge| edge.label == EDGE_CONTAINS)
        .flat_map(|edge| edge.out_v.ids())
        .find_map(|&doc| graph.vertex(doc)?.uri.as_deref())
}

fn locate<'g>(graph: &'g Graph, range: &'g Vertex) -> RangeLocation<'g> {
    RangeLocation {
        uri: owning_document(graph, range).unwrap_or(UNRESOLVED_DOCUMENT_URI),
        start: range.start.unwrap_or_default(),
        end: range.end.unwrap_or_default(),
    }
}

fn range_targets<'g>(graph: &'g Graph, edge: &Edge) -> Vec<&'g Vertex> {
    edge.in_v
        .ids()
        .iter()
        .filter_map(|&id| graph.vertex_labeled(id, LABEL_RANGE))
        .collect()
}

/// Ranges reachable from a definition/reference result through `item` edges.
fn result_ranges(graph: &Graph, result: Id) -> Vec<RangeLocation<'_>> {
    graph
        .edges_from(result)
        .filter(|edge| edge.label == EDGE_ITEM)
        .flat_map(|edge| range_targets(graph, edge))
        .map(|range| locate(graph, range))
        .collect()
}

// ============================================================================
// Enrichment
// ============================================================================

struct Flattener<'g> {
    graph: &'g Graph,
    active: ActiveContext,
    report_unresolved: bool,
    diagnostics: Diagnostics,
}

impl<'g> Flattener<'g> {
    fn new(graph: &'g Graph, report_unresolved: bool) -> Self {
        Self {
            graph,
            active: ActiveContext::default(),
            report_unresolved,
            diagnostics: Diagnostics::new(),
        }
    }

    fn enrich(&mut self, element: &Element) -> Element {
        let mut out = element.clone();
        match element {
            Element::Vertex(vertex) => match vertex.label.as_str() {
                LABEL_RANGE => self.enrich_range(vertex, &mut out),
                LABEL_DEFINITION_RESULT | LABEL_REFERENCE_RESULT => {
                    if let Some(id) = vertex.id {
                        let results = sorted_renders(result_ranges(self.graph, id));
                        out.set_extra(FIELD_RESULTS, results);
                    }
                }
                LABEL_RESULT_SET => self.enrich_result_set(vertex, &mut out),
                _ => {
                    if let Some(event) = vertex.lifecycle_event() {
                        self.active.apply(event);
                    }
                }
            },
            Element::Edge(edge) if edge.label == EDGE_ITEM => self.enrich_item_edge(edge, &mut out),
            Element::Edge(_) => {}
        }
        out
    }

    fn enrich_range(&mut self, range: &Vertex, out: &mut Element) {
        let uri = match owning_document(self.graph, range) {
            Some(uri) => uri,
            None => {
                if self.report_unresolved {
                    self.diagnostics.warn(format!(
                        "range {} has no containing document; using {UNRESOLVED_DOCUMENT_URI}",
                        range.id.map(|id| id.to_string()).unwrap_or_default()
                    ));
                }
                UNRESOLVED_DOCUMENT_URI
            }
        };
        out.set_extra(FIELD_URI, uri);
        self.attach_active_context(out);
    }

    fn enrich_result_set(&self, result_set: &Vertex, out: &mut Element) {
        let Some(id) = result_set.id else {
            return;
        };
        let graph = self.graph;

        let origins: Vec<_> = graph
            .edges_to(id)
            .filter(|edge| edge.label == EDGE_NEXT)
            .flat_map(|edge| edge.out_v.ids())
            .filter_map(|&origin| graph.vertex_labeled(origin, LABEL_RANGE))
            .map(|range| locate(graph, range))
            .collect();
        out.set_extra(FIELD_ORIGINS, sorted_renders(origins));

        // Keyed by request label so definitions and references stay apart.
        let mut results: BTreeMap<&str, Vec<RangeLocation<'_>>> = BTreeMap::new();
        let mut monikers = Vec::new();

        for edge in graph.edges_from(id) {
            match edge.label.as_str() {
                EDGE_DEFINITION | EDGE_REFERENCES => {
                    let bucket = results.entry(edge.label.as_str()).or_default();
                    for &result in edge.in_v.ids() {
                        bucket.extend(result_ranges(graph, result));
                    }
                }
                EDGE_MONIKER => monikers.extend(
                    edge.in_v
                        .ids()
                        .iter()
                        .filter_map(|&m| graph.vertex(m)?.identifier.clone()),
                ),
                _ => {}
            }
        }

        for (label, locations) in results {
            out.set_extra(format!("{FIELD_RESULTS}-{label}"), sorted_renders(locations));
        }

        monikers.sort();
        out.set_extra(FIELD_MONIKERS, monikers);
    }

    fn enrich_item_edge(&self, edge: &Edge, out: &mut Element) {
        let graph = self.graph;

        let targets: Vec<_> = range_targets(graph, edge)
            .into_iter()
            .map(|range| locate(graph, range))
            .collect();
        out.set_extra(FIELD_TARGET_URIS, sorted_renders(targets).join(";"));

        // result ← request edge ← resultSet ← next ← origin range
        let mut requests = Vec::new();
        for &result in edge.out_v.ids() {
            for request in graph.edges_to(result) {
                for &result_set in request.out_v.ids() {
                    for origin in graph
                        .edges_to(result_set)
                        .flat_map(|next| next.out_v.ids())
                        .filter_map(|&o| graph.vertex_labeled(o, LABEL_RANGE))
                    {
                        requests.push(format!(
                            "({} in {})",
                            request.label,
                            locate(graph, origin).render()
                        ));
                    }
                }
            }
        }
        requests.sort();
        out.set_extra(FIELD_REQUESTS, requests.join(";"));

        self.attach_active_context(out);
    }

    fn attach_active_context(&self, out: &mut Element) {
        out.set_extra(FIELD_ACTIVE_DOCUMENTS, self.active.documents(self.graph));
        out.set_extra(FIELD_ACTIVE_PROJECTS, self.active.projects(self.graph));
    }
}
