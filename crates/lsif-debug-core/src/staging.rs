//! Correlating CI build paths with a local source checkout.
//!
//! A dump produced on CI refers to files as e.g. `/d/1/2/Foo/Bar/Baz/file.cs`
//! while the checkout lives at `/Users/me/Repos/Foo/Bar/`. We find a local file
//! with the same name, take the longest path suffix it shares with the CI path,
//! and split the CI path into:
//!
//! ```text
//! /d/1/2/   Foo/Bar/      Baz/file.cs
//! prefix    source_part   repo-relative path
//! ```
//!
//! `prefix` is what CI prepended; `source_part` is the stretch of the CI path
//! that corresponds to the local source root itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{LsifError, Result};

const SKIPPED_DIRS: &[&str] = &[".git", ".vs", "node_modules"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRoot {
    /// CI-only prefix. Empty when the dump was generated inside the checkout.
    pub prefix: String,
    pub source_part: String,
}

impl StagingRoot {
    /// Repo-relative path of `ci_path`, if it lives under this root.
    pub fn relative_path<'a>(&self, ci_path: &'a str) -> Option<&'a str> {
        let relative = ci_path
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.source_part.as_str())?
            .trim_start_matches('/');
        (!relative.is_empty()).then_some(relative)
    }
}

/// File-name index of a local source checkout, built once per link run.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    root: PathBuf,
    /// `root` with `/` separators and a trailing `/`.
    root_text: String,
    files_by_name: HashMap<String, Vec<String>>,
}

impl SourceIndex {
    pub fn build(root: &Path) -> Result<Self> {
        let root = root.canonicalize().map_err(|e| LsifError::io(root, e))?;
        if !root.is_dir() {
            return Err(LsifError::InvalidPath {
                path: root,
                message: "source root is not a directory".to_string(),
            });
        }
        let root_text = directory_text(&root);

        let mut files_by_name: HashMap<String, Vec<String>> = HashMap::new();
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && SKIPPED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref()))
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable source entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            files_by_name
                .entry(name)
                .or_default()
                .push(normalize_separators(&entry.path().to_string_lossy()));
        }

        tracing::debug!(
            root = %root.display(),
            names = files_by_name.len(),
            "indexed source tree"
        );

        Ok(Self {
            root,
            root_text,
            files_by_name,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Split `ci_path` into a [`StagingRoot`] and a repo-relative remainder.
    ///
    /// Among local files named like the CI file, the one sharing the longest
    /// suffix with `ci_path` wins; the shared suffix must cover the whole
    /// repo-relative part of the local file. Ties go to sorted walk order.
    pub fn resolve(&self, ci_path: &str) -> Option<StagingRoot> {
        let ci_path = normalize_separators(ci_path);

        if ci_path.starts_with(&self.root_text) {
            return Some(StagingRoot {
                prefix: String::new(),
                source_part: self.root_text.clone(),
            });
        }

        let file_name = ci_path.rsplit('/').next().filter(|n| !n.is_empty())?;
        let ci_segments: Vec<&str> = ci_path.split('/').collect();

        let mut best: Option<(usize, usize)> = None;
        for local in self.files_by_name.get(file_name)? {
            let Some(relative) = local.strip_prefix(&self.root_text) else {
                continue;
            };
            let relative_len = relative.split('/').count();
            let shared = shared_suffix_len(&ci_segments, &local.split('/').collect::<Vec<_>>());
            if shared < relative_len {
                continue;
            }
            if best.map_or(true, |(best_shared, _)| shared > best_shared) {
                best = Some((shared, relative_len));
            }
        }

        let (shared, relative_len) = best?;
        let n = ci_segments.len();
        let prefix = format!("{}/", ci_segments[..n - shared].join("/"));
        let source_part = if shared > relative_len {
            format!("{}/", ci_segments[n - shared..n - relative_len].join("/"))
        } else {
            String::new()
        };

        Some(StagingRoot {
            prefix,
            source_part,
        })
    }
}

/// Number of trailing path segments `a` and `b` have in common, never
/// counting the leading root segment.
fn shared_suffix_len(a: &[&str], b: &[&str]) -> usize {
    let limit = a.len().min(b.len()).saturating_sub(1);
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take(limit)
        .take_while(|(x, y)| x == y)
        .count()
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn directory_text(path: &Path) -> String {
    let mut text = normalize_separators(&path.to_string_lossy());
    if !text.ends_with('/') {
        text.push('/');
    }
    text
}
