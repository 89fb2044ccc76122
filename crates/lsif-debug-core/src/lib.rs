//! LSIF debugging engine
//!
//! Works on newline-delimited LSIF dumps (one vertex or edge per line):
//! - `graph`: typed records indexed by id, source and target
//! - `integrity`: duplicate-id and dangling-reference detection, id stripping
//! - `flatten`: derived, human-readable fields for diffing and review
//! - `link`: merging shards into one id space bound to a local checkout
//!
//! Structural defects surface as [`LsifError`]; recoverable per-record issues
//! are collected into [`Diagnostics`] and returned to the caller.

pub mod diagnostics;
pub mod element;
pub mod error;
pub mod files;
pub mod flatten;
pub mod graph;
pub mod integrity;
pub mod link;
pub mod preamble;
pub mod staging;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use element::{
    parse_element, parse_records, Edge, Element, EventKind, EventScope, Id, LifecycleEvent,
    Position, Vertex, VertexRefs,
};
pub use error::{LsifError, Result};
pub use files::{
    linked_output_path, normalized_output_path, resolve_lsif_files, write_lines, LsifFileKind,
};
pub use flatten::{flatten, flatten_text, FlattenOptions, FlattenOutput, UNRESOLVED_DOCUMENT_URI};
pub use graph::Graph;
pub use integrity::{strip_identifiers, IntegrityChecker};
pub use link::{link_shards, offset_ids, LinkOptions, LinkOutput, Linker, Shard, ShardSummary};
pub use preamble::{metadata_preamble, source_preamble, LSIF_VERSION};
pub use staging::{SourceIndex, StagingRoot};
