//! Disambiguating heading keys that collide across the source files of one batch.
//!
//! Two passes over files in enumeration order (callers sort by file name):
//!
//! 1. every top-level key found in more than one file is renamed `"{key}({rank})"` in each of
//!    those files, rank counting the files containing it from 1 and skipping any suffixed key
//!    that already exists in the batch;
//! 2. nested keys are grouped under the *renamed* top-level keys and suffixed the same way.
//!
//! Running the pass again on its own output changes nothing.

use crate::artifact;
use crate::error::Result;
use crate::section::{SectionEntry, SourceFile};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Keys rewritten by one disambiguation pass.
pub struct DedupReport {
    /// `(file, old, new)` for each renamed top-level key.
    pub level1: Vec<(String, String, String)>,
    /// `(file, old, new)` for each renamed nested key.
    pub level2: Vec<(String, String, String)>,
}

impl DedupReport {
    #[must_use]
    /// Whether any key was renamed.
    pub fn is_empty(&self) -> bool {
        self.level1.is_empty() && self.level2.is_empty()
    }

    /// Names of the files that had at least one key renamed.
    fn touched(&self) -> impl Iterator<Item = &str> {
        self.level1
            .iter()
            .chain(&self.level2)
            .map(|(file, _, _)| file.as_str())
    }
}

/// Rename colliding keys in place. `files` must already be in rank order.
pub fn disambiguate(files: &mut [SourceFile]) -> DedupReport {
    let mut report = DedupReport::default();

    // Pass 1: top-level keys across files.
    let mut owners: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (i, file) in files.iter().enumerate() {
        for key in file.index.sections.keys() {
            owners.entry(key.clone()).or_default().push(i);
        }
    }
    let mut level1_renames: Vec<HashMap<String, String>> = vec![HashMap::new(); files.len()];
    for (i, key, new_key) in rank_renames(&owners) {
        level1_renames[i].insert(key, new_key);
    }

    // Pass 2: nested keys grouped by the renamed top-level key.
    let mut nested: IndexMap<String, IndexMap<String, Vec<usize>>> = IndexMap::new();
    for (i, file) in files.iter().enumerate() {
        for (key, section) in &file.index.sections {
            let renamed = level1_renames[i].get(key).unwrap_or(key);
            let group = nested.entry(renamed.clone()).or_default();
            for sub_key in section.subsections.keys() {
                group.entry(sub_key.clone()).or_default().push(i);
            }
        }
    }
    let mut level2_renames: Vec<HashMap<(String, String), String>> =
        vec![HashMap::new(); files.len()];
    for (parent, group) in &nested {
        for (i, sub_key, new_key) in rank_renames(group) {
            level2_renames[i].insert((parent.clone(), sub_key), new_key);
        }
    }

    for (i, file) in files.iter_mut().enumerate() {
        if level1_renames[i].is_empty() && level2_renames[i].is_empty() {
            continue;
        }
        let name = file.file_name();
        let sections = std::mem::take(&mut file.index.sections);
        file.index.sections = sections
            .into_iter()
            .map(|(key, section)| {
                let new_key = match level1_renames[i].get(&key) {
                    Some(new_key) => {
                        report.level1.push((name.clone(), key, new_key.clone()));
                        new_key.clone()
                    }
                    None => key,
                };
                let section = rename_subsections(section, &new_key, &level2_renames[i], |old, new| {
                    report.level2.push((name.clone(), old, new));
                });
                (new_key, section)
            })
            .collect();
    }
    report
}

/// `(file, key, new key)` for every key held by more than one file.
///
/// Ranks count up from 1 in file order but skip any `"{key}({k})"` that is already a key of the
/// batch (the indexer suffixes repeated headings the same way), so a rename never lands on an
/// existing entry.
fn rank_renames(owners: &IndexMap<String, Vec<usize>>) -> Vec<(usize, String, String)> {
    let mut taken: HashSet<String> = owners
        .iter()
        .filter(|(_, ids)| ids.len() == 1)
        .map(|(key, _)| key.clone())
        .collect();
    let mut renames = Vec::new();
    for (key, file_ids) in owners.iter().filter(|(_, ids)| ids.len() > 1) {
        let mut rank = 0;
        for &i in file_ids {
            let new_key = loop {
                rank += 1;
                let candidate = format!("{key}({rank})");
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };
            taken.insert(new_key.clone());
            renames.push((i, key.clone(), new_key));
        }
    }
    renames
}

fn rename_subsections(
    mut section: SectionEntry,
    parent: &str,
    renames: &HashMap<(String, String), String>,
    mut on_rename: impl FnMut(String, String),
) -> SectionEntry {
    if renames.is_empty() {
        return section;
    }
    section.subsections = std::mem::take(&mut section.subsections)
        .into_iter()
        .map(|(key, sub)| {
            match renames.get(&(parent.to_string(), key.clone())) {
                Some(new_key) => {
                    on_rename(key, new_key.clone());
                    (new_key.clone(), sub)
                }
                None => (key, sub),
            }
        })
        .collect();
    section
}

/// Load every source file in `dir` (sorted by name), disambiguate, and persist changed files.
///
/// Files that cannot be loaded are logged and left out of the batch.
///
/// # Errors
///
/// Returns an error if the folder cannot be listed or a renamed file cannot be written.
pub fn disambiguate_dir(dir: &Path) -> Result<DedupReport> {
    let mut files = load_source_files(dir)?;
    let report = disambiguate(&mut files);
    let touched: Vec<&str> = report.touched().collect();
    for file in files.iter().filter(|f| touched.contains(&f.file_name().as_str())) {
        file.save()?;
        info!(path = %file.path.display(), "renamed colliding headings");
    }
    Ok(report)
}

/// Load every `*.json` source file in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns an error if the folder cannot be listed. Unreadable files are skipped with a warning.
pub fn load_source_files(dir: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for path in artifact::files_with_extension(dir, "json")? {
        match SourceFile::load(&path) {
            Ok(file) => files.push(file),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable source file"),
        }
    }
    Ok(files)
}

#[cfg(test)]
#[path = "tests/dedup.rs"]
mod tests;
