//! Suffix-containment matching of configured level-1 module titles.
//!
//! Source documents number their chapters inconsistently and often carry stray markup in front
//! of a heading, so a line counts as a module heading when it *ends* with a configured title's
//! bare name, whatever precedes it on the same line.

use crate::error::Result;
use crate::formats::HeadingFormat;
use crate::section::{Heading, HeadingLevel};
use regex::RegexSet;

/// Matches lines ending in one of an ordered list of module titles.
#[derive(Clone, Debug)]
pub struct ModuleTitleFormat {
    titles: Vec<Heading>,
    patterns: RegexSet,
}

impl ModuleTitleFormat {
    /// Build the matcher. Titles are auto-numbered `"{i}. {title}"` when the first one carries
    /// no number of its own.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern cannot be compiled.
    pub fn new<S: AsRef<str>>(titles: &[S]) -> Result<Self> {
        let titles = number_titles(titles);
        let patterns = RegexSet::new(titles.iter().map(|t| {
            format!(r"^(?:.*){}\s*$", regex::escape(t.bare_name()))
        }))?;
        Ok(Self { titles, patterns })
    }

    #[must_use]
    /// Numbered titles in configured order.
    pub fn titles(&self) -> &[Heading] {
        &self.titles
    }

    #[must_use]
    /// Index of the first title (in configured order) that `line` ends with.
    pub fn match_title(&self, line: &str) -> Option<usize> {
        self.patterns.matches(line).iter().next()
    }
}

impl HeadingFormat for ModuleTitleFormat {
    fn classify(&self, line: &str) -> Option<HeadingLevel> {
        self.match_title(line).map(|_| HeadingLevel::Level1)
    }
}

/// Number every title `"{i}. {title}"` unless the first one is already numbered.
/// Blank titles would match every line and are dropped first.
fn number_titles<S: AsRef<str>>(titles: &[S]) -> Vec<Heading> {
    let titles: Vec<&str> = titles
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect();
    let first_numbered = titles
        .first()
        .is_some_and(|t| Heading::parse(t).number.is_some());
    titles
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if first_numbered {
                Heading::parse(t)
            } else {
                Heading::parse(&format!("{}. {t}", i + 1))
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../tests/module_title.rs"]
mod tests;
