use super::{Heading, HeadingLevel, SectionEntry, SourceFile, SubsectionEntry, TitleIndex};
use indexmap::IndexMap;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_heading_levels_from_numbering() {
    assert_eq!(Heading::parse("1. 研究背景").level(), Some(HeadingLevel::Level1));
    assert_eq!(Heading::parse("3.1 智能设计").level(), Some(HeadingLevel::Level2));
    assert_eq!(Heading::parse("3.1.2 方法").level(), Some(HeadingLevel::Level3));
    assert_eq!(Heading::parse("3.1.2.4 细节").level(), None);
    assert_eq!(Heading::parse("项目概述").level(), None);
}

#[test]
fn test_heading_bare_name_and_chapter() {
    let heading = Heading::parse("  3.1 智能设计  ");
    assert_eq!(heading.text, "3.1 智能设计");
    assert_eq!(heading.number.as_deref(), Some("3.1"));
    assert_eq!(heading.bare_name(), "智能设计");
    assert_eq!(heading.chapter(), Some("3"));

    let heading = Heading::parse("2、研究目的");
    assert_eq!(heading.number.as_deref(), Some("2"));
    assert_eq!(heading.bare_name(), "研究目的");
}

#[test]
fn test_unnumbered_heading_keeps_text_as_name() {
    let heading = Heading::parse("全文");
    assert_eq!(heading.number, None);
    assert_eq!(heading.bare_name(), "全文");
    assert_eq!(heading.chapter(), None);
}

#[test]
fn test_number_glued_to_text_is_not_a_heading() {
    assert_eq!(Heading::parse("2024年项目启动").number, None);
}

#[test]
fn test_title_index_json_shape() {
    let mut subsections = IndexMap::new();
    subsections.insert(
        "1.1.1 方法".to_string(),
        SubsectionEntry {
            start_line: 2,
            end_line: 3,
            summary: None,
        },
    );
    let mut sections = IndexMap::new();
    sections.insert(
        "1.1 背景".to_string(),
        SectionEntry {
            start_line: 1,
            end_line: 3,
            subsections,
            summary: None,
        },
    );
    let index = TitleIndex {
        sections,
        source_txt: Some(PathBuf::from("/tmp/1_研究背景.txt")),
    };

    let value = serde_json::to_value(&index).unwrap();
    assert_eq!(value["source_txt"], "/tmp/1_研究背景.txt");
    assert_eq!(value["1.1 背景"]["start_line"], 1);
    assert_eq!(value["1.1 背景"]["subsections"]["1.1.1 方法"]["end_line"], 3);
    assert!(value["1.1 背景"].get("summary").is_none());

    let back: TitleIndex = serde_json::from_value(value).unwrap();
    assert_eq!(back, index);
    assert_eq!(back.node_count(), 2);
}

#[test]
fn test_heading_level_serialises_as_depth() {
    assert_eq!(serde_json::to_string(&HeadingLevel::Level3).unwrap(), "3");
    let level: HeadingLevel = serde_json::from_str("2").unwrap();
    assert_eq!(level, HeadingLevel::Level2);
    assert!(serde_json::from_str::<HeadingLevel>("7").is_err());
}

#[test]
fn test_source_file_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doc.json");
    let mut index = TitleIndex::default();
    index.sections.insert(
        "2.1 目标".to_string(),
        SectionEntry {
            start_line: 1,
            end_line: 4,
            summary: Some("目标摘要".to_string()),
            ..SectionEntry::default()
        },
    );
    let file = SourceFile {
        path: path.clone(),
        index,
    };
    file.save().unwrap();

    let loaded = SourceFile::load(&path).unwrap();
    assert_eq!(loaded.file_name(), "doc.json");
    assert_eq!(loaded.index, file.index);
    assert_eq!(loaded.source_txt(), None);
}

#[test]
fn test_section_range_validity() {
    let valid = SectionEntry {
        start_line: 3,
        end_line: 3,
        ..SectionEntry::default()
    };
    let inverted = SectionEntry {
        start_line: 5,
        end_line: 4,
        ..SectionEntry::default()
    };
    assert!(valid.has_valid_range());
    assert!(!inverted.has_valid_range());
    assert!(!SectionEntry::default().has_valid_range());
}
