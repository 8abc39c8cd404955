//! Splitting a flattened document into level-1 modules.
//!
//! Each configured module title is matched by suffix containment (see
//! [`ModuleTitleFormat`](crate::formats::module_title::ModuleTitleFormat)). The text strictly
//! between one matched heading line and the next becomes that module's content. A document in
//! which nothing matches, or a run with no configured titles, yields one catch-all module.
//!
//! Before a module is written out it goes through heading repair: if none of its lines looks like
//! a level-2 heading, a synthetic `"{n}.1 {name}"` line is prepended so the title indexer always
//! finds at least one section.

use crate::artifact;
use crate::error::Result;
use crate::formats::module_title::ModuleTitleFormat;
use crate::section::Heading;
use indexmap::map::Entry;
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Name of the module holding a whole document when no title matches.
pub const CATCH_ALL: &str = "全文";

static LEVEL2_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\d+").expect("static pattern"));

#[derive(Clone, Debug, PartialEq, Eq)]
/// One level-1 heading and the verbatim text that belongs to it.
pub struct Module {
    /// Numbered module title, e.g. `1. 研究背景`.
    pub heading: Heading,
    /// Trimmed text between this heading's line and the next matched one.
    pub content: String,
}

impl Module {
    #[must_use]
    /// Module whose heading is the catch-all title.
    pub fn catch_all(text: &str) -> Self {
        Self {
            heading: Heading::parse(CATCH_ALL),
            content: text.trim().to_string(),
        }
    }

    #[must_use]
    /// File name for the module text, `"{n}_{name}.txt"` or `"{name}.txt"` when unnumbered.
    pub fn file_name(&self) -> String {
        let stem = match self.heading.number.as_deref() {
            Some(n) => format!("{n}_{}", self.heading.bare_name()),
            None => self.heading.bare_name().to_string(),
        };
        artifact::sanitize_file_name(&format!("{stem}.txt"))
    }

    #[must_use]
    /// Content after heading repair.
    pub fn repaired_content(&self) -> String {
        repair_headings(&self.content, &self.heading)
    }
}

/// Splits document text by an ordered list of module titles.
#[derive(Clone, Debug)]
pub struct Segmenter {
    format: ModuleTitleFormat,
}

impl Segmenter {
    /// Build a segmenter for the configured titles.
    ///
    /// # Errors
    ///
    /// Returns an error if a title cannot be turned into a pattern.
    pub fn new<S: AsRef<str>>(titles: &[S]) -> Result<Self> {
        Ok(Self {
            format: ModuleTitleFormat::new(titles)?,
        })
    }

    #[must_use]
    /// Numbered titles this segmenter looks for.
    pub fn titles(&self) -> &[Heading] {
        self.format.titles()
    }

    #[must_use]
    /// Split `text` into modules in the order their headings occur.
    ///
    /// Empty text yields no modules. A title matched more than once keeps the position of its
    /// first match; the later contents are appended to it.
    pub fn split(&self, text: &str) -> Vec<Module> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if self.format.titles().is_empty() {
            return vec![Module::catch_all(text)];
        }

        let lines: Vec<&str> = text.lines().collect();
        let positions: Vec<(usize, usize)> = lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| self.format.match_title(line).map(|t| (idx, t)))
            .collect();

        if positions.is_empty() {
            debug!("no module title matched, using catch-all");
            return vec![Module::catch_all(text)];
        }

        let mut modules: IndexMap<usize, Module> = IndexMap::new();
        for (i, &(start, title_idx)) in positions.iter().enumerate() {
            let end = positions.get(i + 1).map_or(lines.len(), |&(next, _)| next);
            let content = lines[start + 1..end].join("\n").trim().to_string();
            match modules.entry(title_idx) {
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    debug!(title = %existing.heading.text, "module title matched again, joining");
                    if !content.is_empty() {
                        if !existing.content.is_empty() {
                            existing.content.push('\n');
                        }
                        existing.content.push_str(&content);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(Module {
                        heading: self.format.titles()[title_idx].clone(),
                        content,
                    });
                }
            }
        }
        modules.into_values().collect()
    }
}

#[must_use]
/// Prepend `"{n}.1 {name}"` when no line of `content` looks like a level-2 heading.
///
/// Unnumbered headings (the catch-all) use chapter `1`.
pub fn repair_headings(content: &str, heading: &Heading) -> String {
    if content.lines().any(|line| LEVEL2_LINE.is_match(line)) {
        return content.to_string();
    }
    let chapter = heading.chapter().unwrap_or("1");
    format!("{chapter}.1 {}\n{content}", heading.bare_name())
}

/// Write repaired modules into `dir`, one text file each.
///
/// # Errors
///
/// Returns an error if the directory or a file cannot be written.
pub fn write_modules(modules: &[Module], dir: &Path) -> Result<Vec<PathBuf>> {
    artifact::ensure_dir(dir)?;
    let mut written = Vec::with_capacity(modules.len());
    for module in modules {
        let path = dir.join(module.file_name());
        artifact::write_text(&path, &module.repaired_content())?;
        debug!(path = %path.display(), "wrote module");
        written.push(path);
    }
    Ok(written)
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Outcome of checking one project folder for its module files.
pub struct ModuleCheck {
    /// Number of configured titles.
    pub expected: usize,
    /// Number of module text files present.
    pub found: usize,
    /// Bare names with no file whose name contains them.
    pub missing: Vec<String>,
}

impl ModuleCheck {
    #[must_use]
    /// Every title has a file and the counts agree.
    pub fn is_complete(&self) -> bool {
        self.expected == self.found && self.missing.is_empty()
    }
}

/// Check that `dir` holds one module text file per configured title.
///
/// # Errors
///
/// Returns an error if the folder cannot be listed.
pub fn check_modules(dir: &Path, titles: &[Heading]) -> Result<ModuleCheck> {
    let names: Vec<String> = artifact::files_with_extension(dir, "txt")?
        .iter()
        .map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
        .collect();
    let missing: Vec<String> = titles
        .iter()
        .map(Heading::bare_name)
        .filter(|name| !names.iter().any(|f| f.contains(name)))
        .map(str::to_string)
        .collect();
    let check = ModuleCheck {
        expected: titles.len(),
        found: names.len(),
        missing,
    };
    if !check.is_complete() {
        warn!(
            dir = %dir.display(),
            expected = check.expected,
            found = check.found,
            missing = ?check.missing,
            "module files incomplete"
        );
    }
    Ok(check)
}

#[cfg(test)]
#[path = "tests/segment.rs"]
mod tests;
