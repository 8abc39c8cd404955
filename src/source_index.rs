//! Cross-document lookup from heading text to its line range and owning source file.
//!
//! The index is built once per batch from already-disambiguated source files and never mutated
//! afterwards. Entries borrow from the [`SourceFile`]s they were built from, so the files must
//! outlive the index.
//!
//! Lookup tries, in order: the exact heading string, then the bare name, then the title with
//! full-width annotations such as `（续）` removed. The two fallbacks only answer when exactly
//! one entry carries that name.

use crate::section::{Heading, SourceFile};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
/// A resolved heading: where its text lives and what is known about it.
pub struct IndexEntry<'a> {
    /// Heading key as stored in the source file.
    pub heading: &'a str,
    /// First line (1-based, inclusive).
    pub start_line: usize,
    /// Last line (inclusive).
    pub end_line: usize,
    /// Summary if the summary stage filled one in.
    pub summary: Option<&'a str>,
    /// File the heading belongs to.
    pub source: &'a SourceFile,
}

/// Immutable heading lookup over one batch of source files.
#[derive(Debug, Default)]
pub struct SourceIndex<'a> {
    by_heading: HashMap<&'a str, IndexEntry<'a>>,
    by_name: HashMap<String, Option<IndexEntry<'a>>>,
    by_main_title: HashMap<String, Option<IndexEntry<'a>>>,
}

impl<'a> SourceIndex<'a> {
    #[must_use]
    /// Index every level-2 entry and every level-3 entry under it, in file order.
    ///
    /// A heading key seen twice resolves to the later one.
    pub fn build(files: &'a [SourceFile]) -> Self {
        let mut index = Self::default();
        for file in files {
            for (key, section) in &file.index.sections {
                index.insert(IndexEntry {
                    heading: key,
                    start_line: section.start_line,
                    end_line: section.end_line,
                    summary: section.summary.as_deref(),
                    source: file,
                });
                for (sub_key, sub) in &section.subsections {
                    index.insert(IndexEntry {
                        heading: sub_key,
                        start_line: sub.start_line,
                        end_line: sub.end_line,
                        summary: sub.summary.as_deref(),
                        source: file,
                    });
                }
            }
        }
        index
    }

    fn insert(&mut self, entry: IndexEntry<'a>) {
        if let Some(previous) = self.by_heading.insert(entry.heading, entry) {
            debug!(
                heading = entry.heading,
                previous = %previous.source.path.display(),
                current = %entry.source.path.display(),
                "heading key collision, later entry wins"
            );
        }
        let name = Heading::parse(entry.heading).name;
        record_unique(&mut self.by_main_title, main_title(&name), entry);
        record_unique(&mut self.by_name, name, entry);
    }

    #[must_use]
    /// Resolve a heading string.
    pub fn lookup(&self, heading: &str) -> Option<&IndexEntry<'a>> {
        let heading = heading.trim();
        if let Some(entry) = self.by_heading.get(heading) {
            return Some(entry);
        }
        let name = Heading::parse(heading).name;
        if let Some(Some(entry)) = self.by_name.get(&name) {
            return Some(entry);
        }
        match self.by_main_title.get(&main_title(&name)) {
            Some(Some(entry)) => Some(entry),
            _ => None,
        }
    }

    #[must_use]
    /// Number of distinct exact heading keys.
    pub fn len(&self) -> usize {
        self.by_heading.len()
    }

    #[must_use]
    /// Whether no heading was indexed.
    pub fn is_empty(&self) -> bool {
        self.by_heading.is_empty()
    }
}

/// Remember `entry` under `key`, or mark the key ambiguous if a different heading has it.
fn record_unique<'a>(
    map: &mut HashMap<String, Option<IndexEntry<'a>>>,
    key: String,
    entry: IndexEntry<'a>,
) {
    if key.is_empty() {
        return;
    }
    map.entry(key)
        .and_modify(|slot| {
            let same = slot.is_some_and(|existing| {
                existing.heading == entry.heading && std::ptr::eq(existing.source, entry.source)
            });
            if !same {
                *slot = None;
            }
        })
        .or_insert(Some(entry));
}

/// Title text with full-width parenthesised annotations removed.
fn main_title(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0usize;
    for c in name.chars() {
        match c {
            '（' => depth += 1,
            '）' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
#[path = "tests/source_index.rs"]
mod tests;
