//! Regenerating section text from the original spans named by an enriched outline.
//!
//! For each recomposition target the resolved spans are read from their module text files,
//! joined with newlines in provenance order, and sent with the heading title to the generation
//! service. The reply is kept verbatim. The texts of one module are joined with blank lines, and
//! the modules of a run are assembled into one document in the order of their numeric prefix.

use crate::artifact;
use crate::enrich::{EnrichedHeading, EnrichedOutline};
use crate::error::Result;
use crate::generator::{Generator, TaskKind};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

/// Module folder names, `"{n}_{name}"`.
static MODULE_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)_(.+)$").expect("static pattern"));

/// Lines `start..=end` (1-based) of a text file, clamped to the file's length.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_span(path: &Path, start: usize, end: usize) -> Result<String> {
    let text = artifact::read_text(path)?;
    let start = start.max(1);
    if end < start {
        return Ok(String::new());
    }
    Ok(text
        .lines()
        .skip(start - 1)
        .take(end - start + 1)
        .collect::<Vec<_>>()
        .join("\n"))
}

#[must_use]
/// Request asking for the spans to be fused into one section under `title`.
pub fn merge_prompt(title: &str, source_text: &str) -> String {
    format!(
        "请根据以下标题和相关原文内容，重新组合成一段符合标题的文本，文本要有多级标题，\
         请尽量保留原文内容和保持原文表述风格。\n\n\
         标题：'{title}'\n\n\
         原文内容：\n'{source_text}'\n\n\n\
         请将上述内容融合，不要添加任何额外的内容或解释，且按照markdown格式输出"
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Generated text for one outline heading.
pub struct MergedSection {
    /// Index key of the heading (`"1"` or `"1.2"`).
    pub key: String,
    /// Heading title.
    pub title: String,
    /// Reply of the generation service, verbatim.
    pub text: String,
}

/// Drives the merging requests for one enriched outline.
pub struct Recomposer<'g, G: Generator + ?Sized> {
    generator: &'g G,
}

impl<'g, G: Generator + ?Sized> Recomposer<'g, G> {
    #[must_use]
    /// Recomposer sending its requests to `generator`.
    pub fn new(generator: &'g G) -> Self {
        Self { generator }
    }

    /// Recompose every target of `outline` in outline order.
    ///
    /// # Errors
    ///
    /// Returns the first generation failure; sections recomposed before it are discarded.
    pub fn recompose(&self, outline: &EnrichedOutline) -> Result<Vec<MergedSection>> {
        let mut sections = Vec::new();
        for (key, heading) in outline.recomposition_targets() {
            if let Some(section) = self.recompose_heading(key, heading)? {
                sections.push(section);
            }
        }
        Ok(sections)
    }

    /// Recompose one heading, or `None` when none of its spans can be read.
    ///
    /// # Errors
    ///
    /// Returns an error if the generation request fails.
    pub fn recompose_heading(
        &self,
        key: &str,
        heading: &EnrichedHeading,
    ) -> Result<Option<MergedSection>> {
        let mut spans = Vec::new();
        for info in &heading.source_info {
            let (Some(start), Some(end), Some(txt)) =
                (info.start_line, info.end_line, info.source_txt.as_deref())
            else {
                warn!(heading = key, source = %info.source_name, "unresolved provenance, no text");
                continue;
            };
            match read_span(txt, start, end) {
                Ok(span) if span.trim().is_empty() => {
                    warn!(heading = key, source = %info.source_name, start, end, "empty span");
                }
                Ok(span) => spans.push(span),
                Err(e) => warn!(heading = key, error = %e, "skipping unreadable span"),
            }
        }
        if spans.is_empty() {
            info!(heading = key, title = %heading.title, "no resolved source text, skipping");
            return Ok(None);
        }

        let prompt = merge_prompt(&heading.title, &spans.join("\n"));
        let text = self.generator.generate(&prompt, TaskKind::Merging)?;
        info!(heading = key, title = %heading.title, chars = text.chars().count(), "recomposed");
        Ok(Some(MergedSection {
            key: key.to_string(),
            title: heading.title.clone(),
            text,
        }))
    }
}

#[must_use]
/// Texts of one module in outline order, separated by blank lines.
pub fn render(sections: &[MergedSection]) -> String {
    sections
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Collect the `merged.txt` of every module folder under `merging_dir` as `(title, text)` pairs.
///
/// Folders named `"{n}_{name}"` come first in numeric order, titled `"#{n} {name}"`; other
/// folders follow in name order, titled `"#{name}"`. Folders without `merged.txt` are left out.
///
/// # Errors
///
/// Returns an error if the folder cannot be listed or a `merged.txt` cannot be read.
pub fn assemble(merging_dir: &Path) -> Result<Vec<(String, String)>> {
    let mut numbered = Vec::new();
    let mut unnumbered = Vec::new();
    for dir in artifact::subdirectories(merging_dir)? {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let merged = dir.join("merged.txt");
        if !merged.is_file() {
            warn!(dir = %dir.display(), "no merged text, left out of assembly");
            continue;
        }
        let text = artifact::read_text(&merged)?;
        match MODULE_DIR
            .captures(&name)
            .and_then(|caps| Some((caps[1].parse::<u64>().ok()?, caps[2].to_string())))
        {
            Some((n, title)) => numbered.push((n, format!("#{n} {title}"), text)),
            None => unnumbered.push((format!("#{name}"), text)),
        }
    }
    numbered.sort_by_key(|(n, _, _)| *n);
    Ok(numbered
        .into_iter()
        .map(|(_, title, text)| (title, text))
        .chain(unnumbered)
        .collect())
}

#[must_use]
/// Assembled document text: each title line followed by its text.
pub fn render_assembly(parts: &[(String, String)]) -> String {
    let mut out = String::new();
    for (title, text) in parts {
        out.push_str(title);
        out.push('\n');
        out.push_str(text);
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "tests/recompose.rs"]
mod tests;
