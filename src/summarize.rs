//! Per-section summaries written into title-index artifacts.
//!
//! A level-2 entry without subsections gets a plain summary request. One with subsections gets a
//! structured request whose reply carries a section summary followed by one summary per level-3
//! heading; the reply is parsed back onto the entry and its subsections. Entries whose range is
//! invalid or whose text is empty get an empty summary without a request.

use crate::artifact;
use crate::error::Result;
use crate::generator::{Generator, TaskKind};
use crate::section::{Heading, SectionEntry, TitleIndex};
use indexmap::IndexMap;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

const SECTION_MARKER: &str = "二级标题摘要";
const SUBSECTION_MARKER: &str = "三级标题摘要";

/// `3.1.2 标题：summary` (summary may continue on later lines).
static SUBSECTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+\.\d+\.\d+\s*[^：:\n]+?)\s*[：:]\s*(.*)$").expect("static pattern")
});

static SECTION_TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\d+\s+\S").expect("static pattern"));

#[must_use]
/// Request for a section without level-3 headings.
pub fn simple_prompt(title: &str, content: &str) -> String {
    format!(
        "我将给你一段文本，文本内容来自二级标题“{title}”对应的章节。\n\
         请根据文本内容生成该二级标题的摘要，长度约150-200字。\n\
         请确保摘要内容准确且涵盖文本核心要点。\n\n\
         以下是文本内容：\n{content}"
    )
}

#[must_use]
/// Structured request for a section with level-3 headings.
pub fn structured_prompt(title: &str, content: &str) -> String {
    format!(
        "我将给你一段文本，文本中二级标题用“X.Y”编号格式，如“3.1”，三级标题用“X.Y.Z”编号格式，\
         如“3.1.1”表示层级关系。\n\
         请根据编号区分层级，提取：\n\
         1. 二级标题（{title}）整体摘要，约150-200字；\n\
         2. 每个三级标题对应的摘要，约100字。\n\n\
         请按如下格式输出：\n\n\
         {SECTION_MARKER}：\n<二级标题编号和标题>\n<摘要内容>\n\n\
         {SUBSECTION_MARKER}：\n<三级标题编号和标题>：\n<摘要内容>\n\n\
         <三级标题编号和标题>：\n<摘要内容>\n\n...\n\n\
         以下是文本内容：\n{content}"
    )
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Parsed reply to a structured summary request.
pub struct SummaryReply {
    /// Summary of the level-2 section.
    pub section: String,
    /// Summaries keyed by level-3 heading as the reply wrote it.
    pub subsections: IndexMap<String, String>,
}

impl SummaryReply {
    #[must_use]
    /// Summary for subsection `key`: by exact heading, else by heading number.
    pub fn subsection(&self, key: &str) -> Option<&str> {
        if let Some(summary) = self.subsections.get(key) {
            return Some(summary);
        }
        let number = Heading::parse(key).number?;
        self.subsections
            .iter()
            .find(|(title, _)| Heading::parse(title).number.as_deref() == Some(number.as_str()))
            .map(|(_, summary)| summary.as_str())
    }
}

#[must_use]
/// Split a structured reply into the section summary and the per-subsection summaries.
///
/// Missing markers leave the corresponding parts empty; a reply without the section marker is
/// taken whole as the section summary.
pub fn parse_summary_reply(reply: &str) -> SummaryReply {
    let (section_part, subsection_part) = match reply.find(SUBSECTION_MARKER) {
        Some(pos) => (&reply[..pos], Some(&reply[pos + SUBSECTION_MARKER.len()..])),
        None => (reply, None),
    };
    let section_part = match section_part.find(SECTION_MARKER) {
        Some(pos) => &section_part[pos + SECTION_MARKER.len()..],
        None => section_part,
    };
    let section_part = strip_colon(section_part);
    let mut section_lines: Vec<&str> = section_part.trim().lines().collect();
    if section_lines.len() > 1 && SECTION_TITLE_LINE.is_match(section_lines[0]) {
        section_lines.remove(0);
    }

    let mut subsections: IndexMap<String, String> = IndexMap::new();
    if let Some(part) = subsection_part {
        let mut current: Option<String> = None;
        for line in strip_colon(part).lines() {
            if let Some(caps) = SUBSECTION_LINE.captures(line) {
                let title = caps[1].trim().to_string();
                subsections.insert(title.clone(), caps[2].trim().to_string());
                current = Some(title);
            } else if let Some(summary) = current.as_ref().and_then(|t| subsections.get_mut(t)) {
                let line = line.trim();
                if !line.is_empty() {
                    if !summary.is_empty() {
                        summary.push('\n');
                    }
                    summary.push_str(line);
                }
            }
        }
    }

    SummaryReply {
        section: section_lines.join("\n").trim().to_string(),
        subsections,
    }
}

fn strip_colon(text: &str) -> &str {
    text.trim_start_matches([':', '：'])
}

#[must_use]
/// Strip label noise from a summary.
///
/// A first line that echoes `heading` or ends in a colon is dropped when more lines follow,
/// then a leading `摘要：`/`摘要` is removed.
pub fn clean_summary(text: &str, heading: &str) -> String {
    let text = text.trim();
    let text = match text.split_once('\n') {
        Some((first, rest)) if is_label(first.trim(), heading) => rest.trim_start(),
        _ => text,
    };
    text.strip_prefix("摘要：")
        .or_else(|| text.strip_prefix("摘要"))
        .unwrap_or(text)
        .trim()
        .to_string()
}

fn is_label(line: &str, heading: &str) -> bool {
    let heading = heading.trim();
    line.ends_with(':')
        || line.ends_with('：')
        || (!heading.is_empty() && line.contains(heading))
        || (!line.is_empty() && heading.contains(line))
}

/// Fill in the summaries of every entry of `index` from the module text `lines`.
///
/// Returns the number of generation requests made.
///
/// # Errors
///
/// Returns an error if a generation request fails.
pub fn summarize_index<G, S>(index: &mut TitleIndex, lines: &[S], generator: &G) -> Result<usize>
where
    G: Generator + ?Sized,
    S: AsRef<str>,
{
    let mut requests = 0;
    for (key, section) in &mut index.sections {
        if !section.has_valid_range() {
            warn!(heading = %key, start = section.start_line, end = section.end_line, "invalid line range");
            clear_summaries(section);
            continue;
        }
        let content = span(lines, section.start_line, section.end_line);
        if content.is_empty() {
            debug!(heading = %key, "empty section text");
            clear_summaries(section);
            continue;
        }

        requests += 1;
        if section.subsections.is_empty() {
            let reply = generator.generate(&simple_prompt(key, &content), TaskKind::Summarization)?;
            section.summary = Some(clean_summary(&reply, key));
        } else {
            let reply =
                generator.generate(&structured_prompt(key, &content), TaskKind::Summarization)?;
            let parsed = parse_summary_reply(&reply);
            section.summary = Some(clean_summary(&parsed.section, key));
            for (sub_key, sub) in &mut section.subsections {
                let summary = parsed.subsection(sub_key).unwrap_or_default();
                sub.summary = Some(clean_summary(summary, sub_key));
            }
        }
    }
    Ok(requests)
}

/// Load a title-index artifact, summarise it against its `source_txt`, and return the result.
///
/// # Errors
///
/// Returns an error if the artifact cannot be read or a generation request fails.
pub fn summarize_file<G: Generator + ?Sized>(path: &Path, generator: &G) -> Result<TitleIndex> {
    let index: TitleIndex = artifact::read_json(path)?;
    summarize_title_index(index, generator)
}

/// Summarise an already loaded title index against its `source_txt`.
///
/// An index without a readable `source_txt` is returned unchanged with a warning.
///
/// # Errors
///
/// Returns an error if a generation request fails.
pub fn summarize_title_index<G: Generator + ?Sized>(
    mut index: TitleIndex,
    generator: &G,
) -> Result<TitleIndex> {
    let Some(txt) = index.source_txt.clone() else {
        warn!("title index has no source_txt, not summarised");
        return Ok(index);
    };
    let text = match artifact::read_text(&txt) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %txt.display(), error = %e, "module text unreadable, not summarised");
            return Ok(index);
        }
    };
    let lines: Vec<&str> = text.lines().collect();
    let requests = summarize_index(&mut index, &lines, generator)?;
    info!(path = %txt.display(), requests, "summarised");
    Ok(index)
}

fn clear_summaries(section: &mut SectionEntry) {
    section.summary = Some(String::new());
    for sub in section.subsections.values_mut() {
        sub.summary = Some(String::new());
    }
}

/// Trimmed text of lines `start..=end` (1-based), clamped.
fn span<S: AsRef<str>>(lines: &[S], start: usize, end: usize) -> String {
    let from = start.saturating_sub(1).min(lines.len());
    let to = end.min(lines.len());
    if from >= to {
        return String::new();
    }
    lines[from..to]
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
#[path = "tests/summarize.rs"]
mod tests;
