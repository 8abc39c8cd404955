//! Parsing the restructuring service's proposed outline.
//!
//! The reply is free text in which headings look like
//!
//! ```text
//! ## 1. 智能制造平台（由"3.1 智能设计"、"3.2 智能制造"组合）
//! ### 1.1 设计协同（由"3.1.1 协同设计"组合）
//! - 关键点
//! ```
//!
//! Markdown markers are stripped before matching. A level-2 line is `N. title`, a level-3 line is
//! `N.M title`, each with an optional `（由…组合）` parenthetical whose quoted substrings are the
//! provenance. Every other non-blank line is body text of the level-3 heading opened last, and is
//! dropped when none is open.

use crate::section::{HeadingLevel, SourceFile};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

static LEVEL2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.\s+([^(（]+)(?:[（(]由(.+?)组合[)）])?").expect("static pattern")
});

static LEVEL3: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+\.\d+)\s+([^(（]+)(?:[（(]由(.+?)组合[)）])?").expect("static pattern")
});

/// Straight or curly double-quoted titles.
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|“([^”]+)”"#).expect("static pattern"));

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// One heading of the proposed outline.
pub struct NewHeading {
    /// Title without number or provenance.
    pub title: String,
    /// `Level2` at the top of the outline, `Level3` beneath one.
    pub level: HeadingLevel,
    #[serde(rename = "source", default)]
    /// Original heading texts this heading claims to be built from, in order.
    pub provenance: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    /// Level-3 children keyed by their index string (`"1.1"`).
    pub sub_sections: IndexMap<String, NewHeading>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Body lines collected under a level-3 heading.
    pub content: Vec<String>,
}

impl NewHeading {
    fn new(title: &str, level: HeadingLevel, provenance: Vec<String>) -> Self {
        Self {
            title: title.trim().trim_end_matches('*').trim().to_string(),
            level,
            provenance,
            sub_sections: IndexMap::new(),
            content: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// Proposed outline: level-2 headings keyed by their index string (`"1"`).
pub struct Outline {
    /// Level-2 headings in reply order.
    pub sections: IndexMap<String, NewHeading>,
}

impl Outline {
    #[must_use]
    /// Whether the reply contained no recognisable heading.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[must_use]
/// Parse a restructuring reply. Never fails; unrecognised text is dropped.
pub fn parse_outline(text: &str) -> Outline {
    let mut outline = Outline::default();
    let mut open_section: Option<String> = None;
    let mut open_subsection: Option<String> = None;

    for raw in text.lines() {
        let line = strip_markup(raw);
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = LEVEL2.captures(line) {
            let key = unique_index(&caps[1], |k| outline.sections.contains_key(k));
            let heading = NewHeading::new(
                &caps[2],
                HeadingLevel::Level2,
                provenance(caps.get(3).map(|m| m.as_str())),
            );
            outline.sections.insert(key.clone(), heading);
            open_section = Some(key);
            open_subsection = None;
            continue;
        }

        if let Some(caps) = LEVEL3.captures(line) {
            let Some(parent) = open_section.as_ref().and_then(|k| outline.sections.get_mut(k)) else {
                debug!(line, "level-3 heading before any level-2 heading, dropped");
                continue;
            };
            let key = unique_index(&caps[1], |k| parent.sub_sections.contains_key(k));
            let heading = NewHeading::new(
                &caps[2],
                HeadingLevel::Level3,
                provenance(caps.get(3).map(|m| m.as_str())),
            );
            parent.sub_sections.insert(key.clone(), heading);
            open_subsection = Some(key);
            continue;
        }

        if let (Some(section), Some(sub)) = (&open_section, &open_subsection) {
            if let Some(node) = outline
                .sections
                .get_mut(section)
                .and_then(|s| s.sub_sections.get_mut(sub))
            {
                node.content.push(line.to_string());
            }
        }
    }
    outline
}

/// Trimmed line with leading markdown heading and list markers removed.
fn strip_markup(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c == '#' || c == '-' || c == '*' || c.is_whitespace())
}

/// Quoted titles inside a `由…组合` parenthetical.
fn provenance(parenthetical: Option<&str>) -> Vec<String> {
    let Some(text) = parenthetical else {
        return Vec::new();
    };
    QUOTED
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `index`, or `index(k)` for the k-th heading reusing an index already present.
fn unique_index(index: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(index) {
        return index.to_string();
    }
    (2..)
        .map(|k| format!("{index}({k})"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| index.to_string())
}

#[must_use]
/// Render the headings of one batch of source files, with their summaries, as the listing the
/// restructuring prompt is built around.
///
/// Level-2 entries become `##<heading>：'<summary>'`, level-3 entries `###<heading>：'<summary>'`.
/// Files contribute in the given order; files without headings contribute nothing.
pub fn render_source_headings(files: &[SourceFile]) -> String {
    let mut blocks = Vec::new();
    for file in files {
        let mut lines = Vec::new();
        for (key, section) in &file.index.sections {
            lines.push(format!("##{key}：'{}'", section.summary.as_deref().unwrap_or_default()));
            for (sub_key, sub) in &section.subsections {
                lines.push(format!("###{sub_key}：'{}'", sub.summary.as_deref().unwrap_or_default()));
            }
        }
        if !lines.is_empty() {
            blocks.push(lines.join("\n"));
        }
    }
    blocks.join("\n")
}

#[must_use]
/// Instruction asking the service for a new outline with `（由"…"组合）` provenance on every
/// heading, wrapped around the rendered source headings.
pub fn restructure_prompt(listing: &str) -> String {
    format!(
        "以下是来自不同文档、相同一级标题下的多个二级和三级标题及其摘要信息。\n\
         请基于这些信息，重新组合形成一个新的大纲，包含新的二级标题和三级标题。\n\
         要求：\n\
         1. 设计新的二级标题和三级标题。\n\
         2. 明确指出每个新的二级标题和三级标题由哪些原有的二级或三级标题组合而来。\n\
         3. 不要重复使用原有的二级和三级标题，每个标题只能用一次。\n\
         4. 请以清晰的层级结构和合适的格式输出，方便阅读。\n\n\
         提取内容：\n\"{listing}\"\n\n\
         请严格按照以下格式和结构输出：\n\
         1. 用 Markdown 标题表示层级：二级标题用 ##，三级标题用 ###。\n\
         2. 在每个标题后用括号标注由\"标题1\"、\"标题2\"组合而来，标注需完整且不重复，\
         例如：4. 智能制造支撑技术（由\"3.5 智能物流与仓储优化\"、\"3.6 能源管理与优化\"组合）。\n\
         3. 三级标题后面用无序列表列出对应关键点，列表项每行以\"- \"开头。\n\
         4. 输出层级清晰，编号规范。\n\n\
         请开始重新组合。"
    )
}

#[cfg(test)]
#[path = "tests/outline.rs"]
mod tests;
