//! Exact-prefix classification of numbered headings (`N.`, `N.M`, `N.M.K`).

use crate::formats::HeadingFormat;
use crate::section::{Heading, HeadingLevel};

/// Classifies a line by the numeric prefix at its start.
///
/// The number of dot-separated components decides the level. Lines without a numeric prefix,
/// or with more than three components, are body text.
#[derive(Clone, Copy, Debug, Default)]
pub struct NumberedFormat;

impl HeadingFormat for NumberedFormat {
    fn classify(&self, line: &str) -> Option<HeadingLevel> {
        Heading::parse(line).level()
    }
}

#[cfg(test)]
#[path = "../tests/numbered.rs"]
mod tests;
