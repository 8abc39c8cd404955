use super::{clean_summary, parse_summary_reply, summarize_file, summarize_index};
use crate::artifact;
use crate::error::Result;
use crate::generator::TaskKind;
use crate::title_index::TitleIndexer;
use std::cell::Cell;
use std::fs;
use tempfile::TempDir;

const STRUCTURED_REPLY: &str = "二级标题摘要：\n3.1 智能设计\n本节介绍智能设计的总体思路。\n\n\
三级标题摘要：\n3.1.1 协同设计：\n多专业协同完成设计。\n\n3.1.2 仿真验证：\n通过仿真验证方案。\n";

#[test]
fn test_parse_structured_reply() {
    let reply = parse_summary_reply(STRUCTURED_REPLY);
    assert_eq!(reply.section, "本节介绍智能设计的总体思路。");
    assert_eq!(reply.subsections.len(), 2);
    assert_eq!(reply.subsection("3.1.1 协同设计"), Some("多专业协同完成设计。"));
    assert_eq!(reply.subsection("3.1.2 仿真验证"), Some("通过仿真验证方案。"));
}

#[test]
fn test_subsection_lookup_falls_back_to_number() {
    let reply = parse_summary_reply(STRUCTURED_REPLY);
    assert_eq!(reply.subsection("3.1.2 仿真与验证"), Some("通过仿真验证方案。"));
    assert_eq!(reply.subsection("3.1.9 其他"), None);
}

#[test]
fn test_reply_without_markers_is_section_summary() {
    let reply = parse_summary_reply("只有一段概括。");
    assert_eq!(reply.section, "只有一段概括。");
    assert!(reply.subsections.is_empty());
}

#[test]
fn test_clean_summary_drops_label_lines() {
    assert_eq!(clean_summary("3.1 智能设计\n正文摘要", "3.1 智能设计"), "正文摘要");
    assert_eq!(clean_summary("以下是摘要：\n正文摘要", "3.1 智能设计"), "正文摘要");
    assert_eq!(clean_summary("摘要：正文摘要", "3.1 智能设计"), "正文摘要");
    assert_eq!(clean_summary("摘要正文摘要", "x"), "正文摘要");
    assert_eq!(clean_summary("第一行\n第二行", "3.1 智能设计"), "第一行\n第二行");
    assert_eq!(clean_summary("  单行  ", "3.1 智能设计"), "单行");
}

#[test]
fn test_summarize_index_fills_entries() {
    let lines = [
        "3.1 智能设计",
        "设计正文",
        "3.1.1 协同设计",
        "协同正文",
        "3.1.2 仿真验证",
        "仿真正文",
        "3.2 智能制造",
        "制造正文",
    ];
    let indexer: TitleIndexer = TitleIndexer::default();
    let mut index = indexer.index_lines(&lines);
    let generator = |prompt: &str, task: TaskKind| -> Result<String> {
        assert_eq!(task, TaskKind::Summarization);
        if prompt.contains("三级标题") {
            assert!(prompt.contains("协同正文"));
            Ok(STRUCTURED_REPLY.to_string())
        } else {
            assert!(prompt.contains("制造正文"));
            Ok("3.2 智能制造\n摘要：制造部分概述。".to_string())
        }
    };

    let requests = summarize_index(&mut index, &lines, &generator).unwrap();
    assert_eq!(requests, 2);

    let design = &index.sections["3.1 智能设计"];
    assert_eq!(design.summary.as_deref(), Some("本节介绍智能设计的总体思路。"));
    assert_eq!(
        design.subsections["3.1.1 协同设计"].summary.as_deref(),
        Some("多专业协同完成设计。")
    );
    let manufacturing = &index.sections["3.2 智能制造"];
    assert_eq!(manufacturing.summary.as_deref(), Some("制造部分概述。"));
}

#[test]
fn test_invalid_or_empty_sections_get_empty_summary_without_request() {
    let lines = ["3.1 空节"];
    let indexer: TitleIndexer = TitleIndexer::default();
    let mut index = indexer.index_lines(&lines);
    index.sections["3.1 空节"].end_line = 0;
    let calls = Cell::new(0);
    let generator = |_: &str, _: TaskKind| -> Result<String> {
        calls.set(calls.get() + 1);
        Ok(String::new())
    };

    let requests = summarize_index(&mut index, &lines, &generator).unwrap();
    assert_eq!(requests, 0);
    assert_eq!(calls.get(), 0);
    assert_eq!(index.sections["3.1 空节"].summary.as_deref(), Some(""));
}

#[test]
fn test_summarize_file_reads_source_text() {
    let dir = TempDir::new().unwrap();
    let txt = dir.path().join("3_研究内容.txt");
    fs::write(&txt, "3.2 智能制造\n制造正文\n").unwrap();
    let json = dir.path().join("3_研究内容.json");
    let indexer: TitleIndexer = TitleIndexer::default();
    artifact::write_json(&json, &indexer.index_file(&txt).unwrap()).unwrap();

    let generator = |_: &str, _: TaskKind| -> Result<String> { Ok("概述".to_string()) };
    let index = summarize_file(&json, &generator).unwrap();
    assert_eq!(index.sections["3.2 智能制造"].summary.as_deref(), Some("概述"));
    assert!(index.source_txt.is_some());
}
