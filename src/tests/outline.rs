use super::{parse_outline, render_source_headings, restructure_prompt, Outline};
use crate::section::{HeadingLevel, SectionEntry, SourceFile, SubsectionEntry, TitleIndex};
use std::path::PathBuf;

const REPLY: &str = r#"好的，以下是重新组合后的大纲：

## 1. 智能制造平台（由"3.1 智能设计"、"3.2 智能制造"组合）
### 1.1 设计协同（由"3.1.1 协同设计"组合）
- 多专业协同
- 版本管理
### 1.2 生产调度（由"3.2.1 排产优化"、"3.2.2 车间调度"组合）
- 动态排产
## 2. 数据底座（由“4.1 数据采集”组合）
### 2.1 采集接口
- 协议适配
"#;

#[test]
fn test_parses_headings_provenance_and_content() {
    let outline = parse_outline(REPLY);
    let keys: Vec<&str> = outline.sections.keys().map(String::as_str).collect();
    assert_eq!(keys, ["1", "2"]);

    let platform = &outline.sections["1"];
    assert_eq!(platform.title, "智能制造平台");
    assert_eq!(platform.level, HeadingLevel::Level2);
    assert_eq!(platform.provenance, ["3.1 智能设计", "3.2 智能制造"]);
    assert!(platform.content.is_empty());

    let design = &platform.sub_sections["1.1"];
    assert_eq!(design.title, "设计协同");
    assert_eq!(design.level, HeadingLevel::Level3);
    assert_eq!(design.provenance, ["3.1.1 协同设计"]);
    assert_eq!(design.content, ["多专业协同", "版本管理"]);

    let scheduling = &platform.sub_sections["1.2"];
    assert_eq!(scheduling.provenance, ["3.2.1 排产优化", "3.2.2 车间调度"]);
    assert_eq!(scheduling.content, ["动态排产"]);
}

#[test]
fn test_curly_quotes_and_missing_parenthetical() {
    let outline = parse_outline(REPLY);
    let data = &outline.sections["2"];
    assert_eq!(data.provenance, ["4.1 数据采集"]);

    let interface = &data.sub_sections["2.1"];
    assert_eq!(interface.title, "采集接口");
    assert!(interface.provenance.is_empty());
    assert_eq!(interface.content, ["协议适配"]);
}

#[test]
fn test_level3_before_level2_and_stray_lines_are_dropped() {
    let outline = parse_outline("前言说明\n### 1.1 孤立标题\n- 孤立内容\n## 1. 正式章节\n正文行\n");
    assert_eq!(outline.sections.len(), 1);
    let section = &outline.sections["1"];
    assert!(section.sub_sections.is_empty());
    assert!(section.content.is_empty());
}

#[test]
fn test_ascii_parentheses_and_repeated_indices() {
    let outline =
        parse_outline("1. 甲(由\"A\"组合)\n1.1 乙\n1.1 丙\n1. 丁\n");
    let keys: Vec<&str> = outline.sections.keys().map(String::as_str).collect();
    assert_eq!(keys, ["1", "1(2)"]);
    assert_eq!(outline.sections["1"].provenance, ["A"]);
    let subs: Vec<&str> = outline.sections["1"]
        .sub_sections
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(subs, ["1.1", "1.1(2)"]);
    assert_eq!(outline.sections["1(2)"].title, "丁");
}

#[test]
fn test_empty_reply_gives_empty_outline() {
    assert!(parse_outline("").is_empty());
    assert!(parse_outline("没有任何标题").is_empty());
}

#[test]
fn test_outline_json_shape() {
    let outline = parse_outline(REPLY);
    let value = serde_json::to_value(&outline).unwrap();
    assert_eq!(value["1"]["title"], "智能制造平台");
    assert_eq!(value["1"]["level"], 2);
    assert_eq!(value["1"]["source"][0], "3.1 智能设计");
    assert_eq!(value["1"]["sub_sections"]["1.1"]["content"][1], "版本管理");

    let back: Outline = serde_json::from_value(value).unwrap();
    assert_eq!(back, outline);
}

#[test]
fn test_render_source_headings() {
    let mut index = TitleIndex::default();
    let mut section = SectionEntry {
        start_line: 1,
        end_line: 9,
        summary: Some("设计摘要".to_string()),
        ..SectionEntry::default()
    };
    section.subsections.insert(
        "3.1.1 协同设计".to_string(),
        SubsectionEntry {
            start_line: 2,
            end_line: 9,
            summary: Some("协同摘要".to_string()),
        },
    );
    index.sections.insert("3.1 智能设计(1)".to_string(), section);
    index.sections.insert("3.2 制造".to_string(), SectionEntry::default());
    let files = vec![
        SourceFile {
            path: PathBuf::from("a.json"),
            index,
        },
        SourceFile {
            path: PathBuf::from("empty.json"),
            index: TitleIndex::default(),
        },
    ];

    let listing = render_source_headings(&files);
    assert_eq!(
        listing,
        "##3.1 智能设计(1)：'设计摘要'\n###3.1.1 协同设计：'协同摘要'\n##3.2 制造：''"
    );
    let prompt = restructure_prompt(&listing);
    assert!(prompt.contains(&listing));
    assert!(prompt.contains("组合"));
}
