//! Heading classifiers for flattened document text.
//!
//! This module defines the `HeadingFormat` trait which abstracts over the strategy used to
//! decide whether a line is a heading and at which level. The title indexer only ever asks
//! `classify`, so exact-prefix numbering and permissive suffix matching can be swapped and
//! tested on their own.

pub mod module_title;
pub mod numbered;

use crate::section::HeadingLevel;

/// Decides whether a single line of text is a heading.
pub trait HeadingFormat {
    /// Heading level of `line`, or `None` for body text.
    fn classify(&self, line: &str) -> Option<HeadingLevel>;
}
