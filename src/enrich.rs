//! Attaching source locations to the provenance of a proposed outline.
//!
//! Every provenance string is resolved through the [`SourceIndex`]. A string that cannot be
//! resolved still produces a [`SourceInfo`], with every field but the name set to null, so the
//! enriched tree always has one record per provenance entry.

use crate::outline::{NewHeading, Outline};
use crate::section::HeadingLevel;
use crate::source_index::SourceIndex;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Where one provenance entry's text lives.
pub struct SourceInfo {
    /// Provenance string as written in the outline.
    pub source_name: String,
    /// First line (1-based, inclusive) in `source_txt`.
    pub start_line: Option<usize>,
    /// Last line (inclusive) in `source_txt`.
    pub end_line: Option<usize>,
    /// Summary of the original heading, when one was computed.
    pub summary: Option<String>,
    /// Absolute path of the module text file.
    pub source_txt: Option<PathBuf>,
}

impl SourceInfo {
    #[must_use]
    /// All-null record for a provenance string with no match.
    pub fn unresolved(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            start_line: None,
            end_line: None,
            summary: None,
            source_txt: None,
        }
    }

    #[must_use]
    /// Whether the record names a readable span.
    pub fn is_resolved(&self) -> bool {
        self.start_line.is_some() && self.end_line.is_some() && self.source_txt.is_some()
    }
}

#[must_use]
/// Look up one provenance string.
pub fn resolve(source_name: &str, index: &SourceIndex<'_>) -> SourceInfo {
    match index.lookup(source_name) {
        Some(entry) => SourceInfo {
            source_name: source_name.to_string(),
            start_line: Some(entry.start_line),
            end_line: Some(entry.end_line),
            summary: entry.summary.map(str::to_string),
            source_txt: entry.source.source_txt().map(std::path::Path::to_path_buf),
        },
        None => {
            warn!(source = source_name, "provenance heading not found in source index");
            SourceInfo::unresolved(source_name)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// An outline heading with its provenance resolved.
pub struct EnrichedHeading {
    /// Title without number or provenance.
    pub title: String,
    /// Level in the new outline.
    pub level: HeadingLevel,
    #[serde(rename = "source", default)]
    /// Provenance strings as parsed.
    pub provenance: Vec<String>,
    #[serde(default)]
    /// One record per provenance entry, in the same order.
    pub source_info: Vec<SourceInfo>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    /// Enriched level-3 children.
    pub sub_sections: IndexMap<String, EnrichedHeading>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Body lines carried over from the outline.
    pub content: Vec<String>,
}

impl EnrichedHeading {
    fn from_heading(heading: &NewHeading, index: &SourceIndex<'_>) -> Self {
        Self {
            title: heading.title.clone(),
            level: heading.level,
            provenance: heading.provenance.clone(),
            source_info: heading.provenance.iter().map(|s| resolve(s, index)).collect(),
            sub_sections: heading
                .sub_sections
                .iter()
                .map(|(key, child)| (key.clone(), Self::from_heading(child, index)))
                .collect(),
            content: heading.content.clone(),
        }
    }

    /// Resolved records only.
    pub fn resolved(&self) -> impl Iterator<Item = &SourceInfo> {
        self.source_info.iter().filter(|info| info.is_resolved())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// The proposed outline with every provenance entry resolved.
pub struct EnrichedOutline {
    /// Level-2 headings keyed by index string.
    pub sections: IndexMap<String, EnrichedHeading>,
}

#[must_use]
/// Resolve every heading's provenance against `index`.
pub fn enrich(outline: &Outline, index: &SourceIndex<'_>) -> EnrichedOutline {
    EnrichedOutline {
        sections: outline
            .sections
            .iter()
            .map(|(key, heading)| (key.clone(), EnrichedHeading::from_heading(heading, index)))
            .collect(),
    }
}

impl EnrichedOutline {
    #[must_use]
    /// Headings to recompose, in outline order.
    ///
    /// A level-2 heading none of whose children carries provenance is recomposed as a whole.
    /// Otherwise each child that carries provenance is recomposed and the level-2 heading
    /// itself is not.
    pub fn recomposition_targets(&self) -> Vec<(&str, &EnrichedHeading)> {
        let mut targets = Vec::new();
        for (key, section) in &self.sections {
            if section.sub_sections.values().all(|c| c.source_info.is_empty()) {
                targets.push((key.as_str(), section));
                continue;
            }
            for (sub_key, child) in &section.sub_sections {
                if child.source_info.is_empty() {
                    debug!(heading = sub_key, "no provenance, not recomposed");
                } else {
                    targets.push((sub_key.as_str(), child));
                }
            }
        }
        targets
    }

    #[must_use]
    /// Number of provenance records that did not resolve.
    pub fn unresolved_count(&self) -> usize {
        fn count(heading: &EnrichedHeading) -> usize {
            heading.source_info.iter().filter(|i| !i.is_resolved()).count()
                + heading.sub_sections.values().map(count).sum::<usize>()
        }
        self.sections.values().map(count).sum()
    }

    #[must_use]
    /// Distinct module text files the recomposition targets read from, in first-use order.
    pub fn source_texts(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = Vec::new();
        for (_, heading) in self.recomposition_targets() {
            for path in heading.resolved().filter_map(|i| i.source_txt.as_deref()) {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }
}

#[cfg(test)]
#[path = "tests/enrich.rs"]
mod tests;
