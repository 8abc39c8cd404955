//! Heading and title-index representation for numbered proposal documents.
//!
//! A heading is a numbered title line such as `3.1 智能设计`: the count of dot-separated numeric
//! components gives its level, the text after the number is its bare name. Within one module's
//! text file, level-2 and level-3 headings are recorded as a title index: an ordered map from
//! heading text to a 1-based inclusive line range, with level-3 entries nested under their
//! level-2 parent. The title index is also the on-disk artifact every later stage reads.

use crate::artifact;
use crate::error::Result;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Numeric prefix, optional separator, then the bare name.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)*)(?:[.、)）]\s*|\s+)(\S.*?)\s*$").expect("static pattern")
});

/// Key of the synthetic level-2 node that adopts level-3 headings seen before any level-2 one.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
/// Structural depth of a numbered heading. Serialises as its depth.
pub enum HeadingLevel {
    /// Chapter, numbered `N`.
    Level1,
    /// Section, numbered `N.M`.
    Level2,
    /// Subsection, numbered `N.M.K`.
    Level3,
}

impl HeadingLevel {
    #[must_use]
    /// Level for a number with `components` dot-separated parts, if it is one we track.
    pub fn from_components(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Level1),
            2 => Some(Self::Level2),
            3 => Some(Self::Level3),
            _ => None,
        }
    }

    #[must_use]
    /// Numeric depth (1, 2 or 3).
    pub fn depth(self) -> u8 {
        match self {
            Self::Level1 => 1,
            Self::Level2 => 2,
            Self::Level3 => 3,
        }
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.depth()
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = String;

    fn try_from(depth: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_components(usize::from(depth)).ok_or_else(|| format!("no heading level {depth}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A title string split into its numeric prefix and bare name.
pub struct Heading {
    /// Full heading text as it appeared (trimmed).
    pub text: String,
    /// Numeric prefix such as `3.1`, absent for unnumbered titles.
    pub number: Option<String>,
    /// Title text after the numeric prefix.
    pub name: String,
}

impl Heading {
    #[must_use]
    /// Split a heading line. Unnumbered text keeps its whole trimmed form as the bare name.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match HEADING.captures(trimmed) {
            Some(caps) => Self {
                text: trimmed.to_string(),
                number: Some(caps[1].to_string()),
                name: caps[2].to_string(),
            },
            None => Self {
                text: trimmed.to_string(),
                number: None,
                name: trimmed.to_string(),
            },
        }
    }

    #[must_use]
    /// Level derived from the number of numeric components; `None` when unnumbered or deeper
    /// than three.
    pub fn level(&self) -> Option<HeadingLevel> {
        self.number
            .as_deref()
            .and_then(|n| HeadingLevel::from_components(n.split('.').count()))
    }

    #[must_use]
    /// Bare name, the text after the numeric prefix.
    pub fn bare_name(&self) -> &str {
        &self.name
    }

    #[must_use]
    /// First numeric component, e.g. `3` for `3.1 智能设计`.
    pub fn chapter(&self) -> Option<&str> {
        self.number.as_deref().and_then(|n| n.split('.').next())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
/// A level-3 heading's line range within its module text file.
pub struct SubsectionEntry {
    /// First line (1-based, the heading line itself).
    pub start_line: usize,
    /// Last line (inclusive).
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Summary filled in by the summary stage.
    pub summary: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
/// A level-2 heading's line range and its nested level-3 headings.
pub struct SectionEntry {
    /// First line (1-based, the heading line itself).
    pub start_line: usize,
    /// Last line (inclusive).
    pub end_line: usize,
    #[serde(default)]
    /// Level-3 headings in document order.
    pub subsections: IndexMap<String, SubsectionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Summary filled in by the summary stage.
    pub summary: Option<String>,
}

impl SectionEntry {
    #[must_use]
    /// Whether the stored range can be read back from a file.
    pub fn has_valid_range(&self) -> bool {
        self.start_line > 0 && self.end_line >= self.start_line
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Title index of one module text file, in the per-document artifact format.
///
/// Serialises as the heading map with one extra `source_txt` key holding the absolute path of
/// the text file the ranges refer to.
pub struct TitleIndex {
    #[serde(flatten)]
    /// Level-2 headings in document order.
    pub sections: IndexMap<String, SectionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Absolute path of the indexed text file.
    pub source_txt: Option<PathBuf>,
}

impl TitleIndex {
    #[must_use]
    /// Total number of level-2 and level-3 entries.
    pub fn node_count(&self) -> usize {
        self.sections
            .values()
            .map(|s| 1 + s.subsections.len())
            .sum()
    }
}

#[derive(Clone, Debug)]
/// A title index loaded from disk together with the artifact path it came from.
///
/// Owns its entries; every lookup handed out by the source index borrows from here.
pub struct SourceFile {
    /// Path of the JSON artifact.
    pub path: PathBuf,
    /// Loaded heading entries and text path.
    pub index: TitleIndex,
}

impl SourceFile {
    /// Load one title-index artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a title index.
    pub fn load(path: &Path) -> Result<Self> {
        let index = artifact::read_json(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            index,
        })
    }

    /// Write the (possibly renamed) entries back to the artifact path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        artifact::write_json(&self.path, &self.index)
    }

    #[must_use]
    /// File name used for rank ordering and log messages.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    #[must_use]
    /// Text file the ranges refer to.
    pub fn source_txt(&self) -> Option<&Path> {
        self.index.source_txt.as_deref()
    }
}

#[cfg(test)]
#[path = "tests/section.rs"]
mod tests;
