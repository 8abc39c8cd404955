//! Building the title index of one module's text.
//!
//! A single forward pass over the lines. Opening a heading closes the one before it at the same
//! or a deeper level, setting its `end_line` to the line before; end of file closes whatever is
//! still open. Level-3 headings met before any level-2 heading are filed under a synthetic
//! [`UNCATEGORIZED`] section starting at line 1. Level-1 lines are treated as body text.

use crate::artifact;
use crate::error::{Error, Result};
use crate::formats::numbered::NumberedFormat;
use crate::formats::HeadingFormat;
use crate::section::{HeadingLevel, SectionEntry, SubsectionEntry, TitleIndex, UNCATEGORIZED};
use indexmap::IndexMap;
use std::path::Path;
use tracing::debug;

/// Indexes level-2 and level-3 headings using a pluggable classifier.
pub struct TitleIndexer<F: HeadingFormat = NumberedFormat> {
    format: F,
}

impl Default for TitleIndexer<NumberedFormat> {
    fn default() -> Self {
        Self::new(NumberedFormat)
    }
}

impl<F: HeadingFormat> TitleIndexer<F> {
    #[must_use]
    /// Indexer using `format` to recognise headings.
    pub fn new(format: F) -> Self {
        Self { format }
    }

    #[must_use]
    /// Index `lines`; line numbers in the result are 1-based.
    pub fn index_lines<S: AsRef<str>>(&self, lines: &[S]) -> TitleIndex {
        let mut builder = Builder::default();
        for (idx, line) in lines.iter().enumerate() {
            let line_num = idx + 1;
            let text = line.as_ref().trim();
            match self.format.classify(text) {
                Some(HeadingLevel::Level3) => builder.open_subsection(text, line_num),
                Some(HeadingLevel::Level2) => builder.open_section(text, line_num),
                Some(HeadingLevel::Level1) | None => {}
            }
        }
        builder.finish(lines.len())
    }

    /// Index a module text file and record its absolute path as `source_txt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its path cannot be resolved.
    pub fn index_file(&self, txt: &Path) -> Result<TitleIndex> {
        let text = artifact::read_text(txt)?;
        let lines: Vec<&str> = text.lines().collect();
        let mut index = self.index_lines(&lines);
        index.source_txt = Some(std::path::absolute(txt).map_err(|e| Error::io(txt, e))?);
        debug!(path = %txt.display(), nodes = index.node_count(), "indexed titles");
        Ok(index)
    }
}

/// Open-node bookkeeping for the forward pass.
#[derive(Default)]
struct Builder {
    sections: IndexMap<String, SectionEntry>,
    open_section: Option<String>,
    open_subsection: Option<String>,
}

impl Builder {
    fn open_subsection(&mut self, text: &str, line_num: usize) {
        self.close_subsection(line_num - 1);
        let parent = match &self.open_section {
            Some(key) => key.clone(),
            None => {
                self.sections
                    .entry(UNCATEGORIZED.to_string())
                    .or_insert_with(|| SectionEntry {
                        start_line: 1,
                        ..SectionEntry::default()
                    });
                self.open_section = Some(UNCATEGORIZED.to_string());
                UNCATEGORIZED.to_string()
            }
        };
        if let Some(section) = self.sections.get_mut(&parent) {
            let key = unique_key(text, |k| section.subsections.contains_key(k));
            section.subsections.insert(
                key.clone(),
                SubsectionEntry {
                    start_line: line_num,
                    ..SubsectionEntry::default()
                },
            );
            self.open_subsection = Some(key);
        }
    }

    fn open_section(&mut self, text: &str, line_num: usize) {
        self.close_subsection(line_num - 1);
        self.close_section(line_num - 1);
        let key = unique_key(text, |k| self.sections.contains_key(k));
        self.sections.insert(
            key.clone(),
            SectionEntry {
                start_line: line_num,
                ..SectionEntry::default()
            },
        );
        self.open_section = Some(key);
    }

    fn close_subsection(&mut self, end_line: usize) {
        let (Some(section), Some(sub)) = (&self.open_section, self.open_subsection.take()) else {
            return;
        };
        if let Some(entry) = self
            .sections
            .get_mut(section)
            .and_then(|s| s.subsections.get_mut(&sub))
        {
            entry.end_line = end_line;
        }
    }

    fn close_section(&mut self, end_line: usize) {
        if let Some(section) = self.open_section.take() {
            if let Some(entry) = self.sections.get_mut(&section) {
                entry.end_line = end_line;
            }
        }
    }

    fn finish(mut self, total_lines: usize) -> TitleIndex {
        self.close_subsection(total_lines);
        self.close_section(total_lines);
        TitleIndex {
            sections: self.sections,
            source_txt: None,
        }
    }
}

/// `text`, or `text(k)` for the k-th repeat of a heading already present.
fn unique_key(text: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(text) {
        return text.to_string();
    }
    (2..)
        .map(|k| format!("{text}({k})"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| text.to_string())
}

#[cfg(test)]
#[path = "tests/title_index.rs"]
mod tests;
