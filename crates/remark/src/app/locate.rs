//! Note discovery and random selection.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder, WalkState};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::model::NoteRecord;
use crate::infra::config::Notes;

/// Predicate deciding which walked files are eligible notes.
#[derive(Debug, Clone)]
pub struct NoteFilter {
    extensions: BTreeSet<String>,
    include_hidden: bool,
    ignore: Option<GlobSet>,
}

impl Default for NoteFilter {
    fn default() -> Self {
        Self::with_extensions(["md"])
    }
}

impl NoteFilter {
    /// Accept files whose extension is one of `extensions` (compared case-sensitively).
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| {
                    let ext: String = ext.into();
                    ext.trim_start_matches('.').to_owned()
                })
                .filter(|ext| !ext.is_empty())
                .collect(),
            include_hidden: true,
            ignore: None,
        }
    }

    pub fn from_config(notes: &Notes) -> Result<Self> {
        let filter = Self::with_extensions(notes.extensions.iter().cloned())
            .include_hidden(notes.include_hidden);
        filter.with_ignore_globs(&notes.ignore)
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Exclude root-relative paths matching any of `patterns`.
    pub fn with_ignore_globs(mut self, patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            self.ignore = None;
            return Ok(self);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(
                Glob::new(pattern).with_context(|| format!("invalid ignore glob '{pattern}'"))?,
            );
        }
        self.ignore = Some(builder.build().context("failed to build ignore matcher")?);
        Ok(self)
    }

    /// Whether `path` carries one of the recognised note extensions.
    pub fn has_note_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(ext))
    }

    fn is_ignored(&self, rel: &Path) -> bool {
        self.ignore.as_ref().is_some_and(|set| set.is_match(rel))
    }

    fn accepts(&self, rel: &Path) -> bool {
        self.has_note_extension(rel) && !self.is_ignored(rel)
    }
}

/// Walks a study folder and hands back one eligible note at random.
#[derive(Debug, Clone, Default)]
pub struct NoteLocator {
    filter: NoteFilter,
}

impl NoteLocator {
    pub fn new(filter: NoteFilter) -> Self {
        Self { filter }
    }

    /// Every eligible note path under `root`, sorted.
    ///
    /// A missing or unreadable root yields an empty list. Symlinks are not followed.
    pub fn candidates(&self, root: &Path) -> Vec<PathBuf> {
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "note root is not a readable directory");
            return Vec::new();
        }

        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .hidden(!self.filter.include_hidden)
            .follow_links(false);

        let found = Mutex::new(Vec::new());
        let filter = Arc::new(self.filter.clone());
        let root_owned = Arc::new(root.to_path_buf());

        builder.build_parallel().run(|| {
            let found = &found;
            let filter = Arc::clone(&filter);
            let root = Arc::clone(&root_owned);
            Box::new(move |result| match result {
                Ok(entry) => {
                    if let Some(path) = eligible_path(&entry, &root, &filter)
                        && let Ok(mut guard) = found.lock()
                    {
                        guard.push(path);
                    }
                    WalkState::Continue
                }
                Err(err) => {
                    tracing::warn!(error = %err, "note walk error");
                    WalkState::Continue
                }
            })
        });

        let mut found = found.into_inner().unwrap_or_default();
        found.sort();
        found
    }

    /// Pick one note uniformly at random and load it.
    ///
    /// Returns `None` when there is no eligible file or the picked file is not readable UTF-8.
    pub fn locate_random_note(&self, root: &Path) -> Option<NoteRecord> {
        self.locate_random_note_with(root, &mut rand::thread_rng())
    }

    pub fn locate_random_note_with<R: Rng + ?Sized>(
        &self,
        root: &Path,
        rng: &mut R,
    ) -> Option<NoteRecord> {
        let candidates = self.candidates(root);
        tracing::debug!(root = %root.display(), count = candidates.len(), "collected notes");
        let picked = candidates.choose(rng)?;
        load_note(picked)
    }
}

fn eligible_path(entry: &DirEntry, root: &Path, filter: &NoteFilter) -> Option<PathBuf> {
    if entry.depth() == 0 {
        return None;
    }
    // Symlinks report their own file type here since links are not followed.
    if !entry.file_type().is_some_and(|ft| ft.is_file()) {
        return None;
    }
    let path = entry.path();
    let rel = path.strip_prefix(root).unwrap_or(path);
    filter.accepts(rel).then(|| path.to_path_buf())
}

fn load_note(path: &Path) -> Option<NoteRecord> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read picked note");
            return None;
        }
    };
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    Some(NoteRecord {
        file_name,
        content,
        source_path: path.to_path_buf(),
    })
}
