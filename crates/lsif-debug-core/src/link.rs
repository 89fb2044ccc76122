//! Linking: merge independently produced shards into one dump bound to a
//! local source checkout.
//!
//! Shards are processed strictly in the given order. Every identifier in shard
//! `k` is shifted by one past the largest identifier of the shards before it,
//! which keeps id spaces disjoint without looking ahead. `project`/`document`
//! paths are rewritten from the CI path space into the checkout (see
//! [`crate::staging`]) and document text is embedded as base64.
//!
//! Failures are shard-local: a shard that cannot be parsed or validated is
//! reported and skipped, and the remaining shards still link.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use url::Url;

use crate::diagnostics::Diagnostics;
use crate::element::{
    is_preamble_label, offset_id, parse_records, Element, Id, Vertex, LABEL_DOCUMENT,
    LABEL_PROJECT,
};
use crate::error::{LsifError, Result};
use crate::integrity::IntegrityChecker;
use crate::preamble::{metadata_preamble, source_preamble};
use crate::staging::{SourceIndex, StagingRoot};

#[derive(Debug, Clone)]
pub struct LinkOptions {
    /// Embed local file contents into `document` vertices lacking `contents`.
    pub embed_contents: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            embed_contents: true,
        }
    }
}

/// One independently generated dump.
#[derive(Debug, Clone)]
pub struct Shard {
    pub name: String,
    pub text: String,
}

impl Shard {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LsifError::io(path, e))?;
        Ok(Self::new(path.display().to_string(), text))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSummary {
    pub name: String,
    pub records: usize,
    pub id_offset: Id,
    /// Largest identifier after offsetting.
    pub max_id: Option<Id>,
    pub linked_paths: usize,
    pub embedded_documents: usize,
}

#[derive(Debug, Clone)]
pub struct LinkOutput {
    /// `[metaData, source, shard 1.., shard 2.., ...]`
    pub records: Vec<Element>,
    pub shards: Vec<ShardSummary>,
    pub failed_shards: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl LinkOutput {
    pub fn succeeded(&self) -> bool {
        self.failed_shards.is_empty()
    }

    pub fn to_lines(&self) -> Result<Vec<String>> {
        self.records
            .iter()
            .map(|r| Ok(serde_json::to_string(r)?))
            .collect()
    }
}

pub struct Linker {
    source: SourceIndex,
    workspace_root: Url,
    options: LinkOptions,
}

impl Linker {
    pub fn new(source_root: &Path, options: LinkOptions) -> Result<Self> {
        let source = SourceIndex::build(source_root)?;
        let workspace_root =
            Url::from_directory_path(source.root()).map_err(|()| LsifError::InvalidPath {
                path: source.root().to_path_buf(),
                message: "cannot express source root as a file URI".to_string(),
            })?;
        Ok(Self {
            source,
            workspace_root,
            options,
        })
    }

    pub fn workspace_root(&self) -> &Url {
        &self.workspace_root
    }

    pub fn link(&self, shards: &[Shard]) -> LinkOutput {
        let mut records = vec![metadata_preamble(), source_preamble(&self.workspace_root)];
        let mut summaries = Vec::new();
        let mut failed_shards = Vec::new();
        let mut diagnostics = Diagnostics::new();
        let mut id_offset: Id = 0;

        for shard in shards {
            match self.link_shard(shard, id_offset, &mut diagnostics) {
                Ok((linked, summary, next_offset)) => {
                    tracing::info!(
                        shard = %summary.name,
                        records = summary.records,
                        id_offset = summary.id_offset,
                        max_id = ?summary.max_id,
                        "linked shard"
                    );
                    id_offset = next_offset;
                    records.extend(linked);
                    summaries.push(summary);
                }
                Err(err) => {
                    diagnostics.error(format!("failed to link shard '{}', skipping: {err}", shard.name));
                    failed_shards.push(shard.name.clone());
                }
            }
        }

        LinkOutput {
            records,
            shards: summaries,
            failed_shards,
            diagnostics,
        }
    }

    fn link_shard(
        &self,
        shard: &Shard,
        id_offset: Id,
        diagnostics: &mut Diagnostics,
    ) -> Result<(Vec<Element>, ShardSummary, Id)> {
        let elements = parse_records(&shard.text)?;
        IntegrityChecker::new().check_all(&elements)?;

        // Warnings only reach the caller once the whole shard succeeded.
        let mut shard_diagnostics = Diagnostics::new();
        let mut staging: Option<StagingRoot> = None;
        let mut summary = ShardSummary {
            name: shard.name.clone(),
            records: 0,
            id_offset,
            max_id: None,
            linked_paths: 0,
            embedded_documents: 0,
        };
        let mut linked = Vec::with_capacity(elements.len());

        for mut element in elements {
            offset_ids(&mut element, id_offset)?;
            if let Some(id) = element.id() {
                summary.max_id = Some(summary.max_id.map_or(id, |max| max.max(id)));
            }

            if let Element::Vertex(vertex) = &mut element {
                if is_preamble_label(&vertex.label) {
                    shard_diagnostics.warn(format!(
                        "dropping `{}` vertex from shard '{}'; the linked output carries its own",
                        vertex.label, shard.name
                    ));
                    continue;
                }
                match vertex.label.as_str() {
                    LABEL_PROJECT => self.link_project(vertex, &mut staging, &mut summary, &mut shard_diagnostics),
                    LABEL_DOCUMENT => self.link_document(vertex, &mut staging, &mut summary, &mut shard_diagnostics),
                    _ => {}
                }
            }

            linked.push(element);
        }

        // The next shard starts one past our largest id, which must still fit.
        let next_offset = match summary.max_id {
            Some(max_id) => offset_id(max_id, 1)?,
            None => id_offset,
        };

        summary.records = linked.len();
        diagnostics.extend(shard_diagnostics);
        Ok((linked, summary, next_offset))
    }

    fn link_project(
        &self,
        vertex: &mut Vertex,
        staging: &mut Option<StagingRoot>,
        summary: &mut ShardSummary,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(resource) = vertex.resource.as_deref() else {
            return;
        };
        if let Some(linked) = self.link_uri(resource, staging, diagnostics) {
            tracing::debug!(relative = %linked.relative, "linked project");
            vertex.resource = Some(linked.uri.to_string());
            summary.linked_paths += 1;
        }
    }

    fn link_document(
        &self,
        vertex: &mut Vertex,
        staging: &mut Option<StagingRoot>,
        summary: &mut ShardSummary,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(uri) = vertex.uri.as_deref() else {
            return;
        };
        let Some(linked) = self.link_uri(uri, staging, diagnostics) else {
            return;
        };
        tracing::debug!(relative = %linked.relative, "linked document");
        vertex.uri = Some(linked.uri.to_string());
        summary.linked_paths += 1;

        if !self.options.embed_contents || vertex.contents.is_some() {
            return;
        }
        match fs::read(&linked.local) {
            Ok(bytes) => {
                vertex.contents = Some(BASE64.encode(bytes));
                summary.embedded_documents += 1;
            }
            Err(err) => diagnostics.warn(format!(
                "could not embed contents of '{}' from '{}': {err}; document text will be unavailable",
                linked.relative,
                linked.local.display()
            )),
        }
    }

    /// Map a CI `file:` URI to the equivalent URI under the source root.
    fn link_uri(
        &self,
        uri: &str,
        staging: &mut Option<StagingRoot>,
        diagnostics: &mut Diagnostics,
    ) -> Option<LinkedPath> {
        let ci_path = match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => path.to_string_lossy().replace('\\', "/"),
                Err(()) => {
                    diagnostics.warn(format!("cannot read '{uri}' as a local path; left unlinked"));
                    return None;
                }
            },
            _ => {
                diagnostics.warn(format!("'{uri}' is not a file URI; left unlinked"));
                return None;
            }
        };

        let cached = staging.as_ref().and_then(|root| root.relative_path(&ci_path));
        let relative = match cached {
            Some(relative) => relative.to_string(),
            None => {
                let Some(root) = self.source.resolve(&ci_path) else {
                    diagnostics.warn(format!(
                        "could not link '{ci_path}' to source directory '{}'",
                        self.source.root().display()
                    ));
                    return None;
                };
                let Some(relative) = root.relative_path(&ci_path) else {
                    diagnostics.warn(format!(
                        "'{ci_path}' resolves to the source root itself, not a file under it; left unlinked"
                    ));
                    return None;
                };
                let relative = relative.to_string();
                tracing::debug!(prefix = %root.prefix, source_part = %root.source_part, "resolved staging root");
                *staging = Some(root);
                relative
            }
        };

        let local = self.source.root().join(&relative);
        match Url::from_file_path(&local) {
            Ok(uri) => Some(LinkedPath {
                uri,
                local,
                relative,
            }),
            Err(()) => {
                diagnostics.warn(format!("cannot express '{}' as a file URI", local.display()));
                None
            }
        }
    }
}

struct LinkedPath {
    uri: Url,
    local: PathBuf,
    relative: String,
}

/// Shift every identifier and identifier reference of `element` by `by`.
///
/// Fails with [`LsifError::IdOverflow`] instead of wrapping; `element` may be
/// partially shifted at that point and should be discarded.
pub fn offset_ids(element: &mut Element, by: Id) -> Result<()> {
    if by == 0 {
        return Ok(());
    }
    match element {
        Element::Vertex(vertex) => {
            if let Some(id) = vertex.id.as_mut() {
                *id = offset_id(*id, by)?;
            }
            if let Some(data) = vertex.event_data() {
                vertex.set_event_data(offset_id(data, by)?);
            }
        }
        Element::Edge(edge) => {
            for field in [&mut edge.id, &mut edge.shard, &mut edge.document] {
                if let Some(id) = field.as_mut() {
                    *id = offset_id(*id, by)?;
                }
            }
            edge.out_v.offset(by)?;
            edge.in_v.offset(by)?;
        }
    }
    Ok(())
}

/// Link `shards` against `source_root` in one call.
pub fn link_shards(shards: &[Shard], source_root: &Path, options: LinkOptions) -> Result<LinkOutput> {
    Ok(Linker::new(source_root, options)?.link(shards))
}
