use super::{check_modules, repair_headings, write_modules, Module, Segmenter, CATCH_ALL};
use crate::section::Heading;
use std::fs;
use tempfile::TempDir;

fn pairs(modules: &[Module]) -> Vec<(String, String)> {
    modules
        .iter()
        .map(|m| (m.heading.text.clone(), m.content.clone()))
        .collect()
}

#[test]
fn test_split_by_titles() {
    let segmenter = Segmenter::new(&["研究背景", "研究目的"]).unwrap();
    let text = ["杂项", "1. 研究背景", "内容A", "2. 研究目的", "内容B"].join("\n");
    assert_eq!(
        pairs(&segmenter.split(&text)),
        [
            ("1. 研究背景".to_string(), "内容A".to_string()),
            ("2. 研究目的".to_string(), "内容B".to_string()),
        ]
    );
}

#[test]
fn test_empty_title_list_gives_catch_all() {
    let segmenter = Segmenter::new::<&str>(&[]).unwrap();
    let text = "\n  第一段\n第二段  \n";
    let modules = segmenter.split(text);
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].heading.text, CATCH_ALL);
    assert_eq!(modules[0].content, "第一段\n第二段");
}

#[test]
fn test_no_match_gives_catch_all() {
    let segmenter = Segmenter::new(&["研究背景"]).unwrap();
    let modules = segmenter.split("标题\n正文");
    assert_eq!(pairs(&modules), [(CATCH_ALL.to_string(), "标题\n正文".to_string())]);
}

#[test]
fn test_empty_text_gives_no_modules() {
    let segmenter = Segmenter::new(&["研究背景"]).unwrap();
    assert!(segmenter.split("").is_empty());
    assert!(segmenter.split(" \n\n ").is_empty());
}

#[test]
fn test_order_follows_text_not_configuration() {
    let segmenter = Segmenter::new(&["研究背景", "研究目的"]).unwrap();
    let text = "二、研究目的\n目的正文\n一、研究背景\n背景正文";
    let modules = segmenter.split(text);
    assert_eq!(
        pairs(&modules),
        [
            ("2. 研究目的".to_string(), "目的正文".to_string()),
            ("1. 研究背景".to_string(), "背景正文".to_string()),
        ]
    );
}

#[test]
fn test_repeated_title_is_joined_at_first_position() {
    let segmenter = Segmenter::new(&["研究背景", "研究目的"]).unwrap();
    let text = "研究背景\nA\n研究目的\nB\n研究背景\nC";
    let modules = segmenter.split(text);
    assert_eq!(
        pairs(&modules),
        [
            ("1. 研究背景".to_string(), "A\nC".to_string()),
            ("2. 研究目的".to_string(), "B".to_string()),
        ]
    );
}

#[test]
fn test_partition_reconstructs_text_after_first_heading() {
    let segmenter = Segmenter::new(&["研究背景", "研究目的", "研究内容"]).unwrap();
    let lines = [
        "1. 研究背景",
        "1.1 现状",
        "国内外研究现状。",
        "1.2 问题",
        "存在的问题。",
        "2. 研究目的",
        "2.1 目标",
        "总体目标。",
        "3. 研究内容",
        "3.1 智能设计",
        "设计方法。",
    ];
    let modules = segmenter.split(&lines.join("\n"));

    let rebuilt: Vec<String> = modules
        .iter()
        .flat_map(|m| m.content.lines().map(str::to_string).collect::<Vec<_>>())
        .collect();
    let expected: Vec<String> = lines
        .iter()
        .filter(|line| segmenter.format.match_title(line).is_none())
        .map(|line| (*line).to_string())
        .collect();
    assert_eq!(rebuilt, expected);
}

#[test]
fn test_repair_inserts_section_heading_when_missing() {
    let heading = Heading::parse("2. 研究目的");
    assert_eq!(
        repair_headings("只有正文。", &heading),
        "2.1 研究目的\n只有正文。"
    );
    assert_eq!(
        repair_headings("2.1 目标\n正文", &heading),
        "2.1 目标\n正文"
    );
}

#[test]
fn test_repair_numbers_catch_all_as_chapter_one() {
    let module = Module::catch_all("正文");
    assert_eq!(module.repaired_content(), "1.1 全文\n正文");
    assert_eq!(module.file_name(), "全文.txt");
}

#[test]
fn test_write_modules_and_check() {
    let dir = TempDir::new().unwrap();
    let segmenter = Segmenter::new(&["研究背景", "研究目的"]).unwrap();
    let modules = segmenter.split("1. 研究背景\n背景\n2. 研究目的\n2.1 目标\n目标正文");
    let written = write_modules(&modules, dir.path()).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["1_研究背景.txt", "2_研究目的.txt"]);
    assert_eq!(
        fs::read_to_string(dir.path().join("1_研究背景.txt")).unwrap(),
        "1.1 研究背景\n背景"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("2_研究目的.txt")).unwrap(),
        "2.1 目标\n目标正文"
    );

    let check = check_modules(dir.path(), segmenter.titles()).unwrap();
    assert!(check.is_complete());
}

#[test]
fn test_check_reports_missing_modules() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("1_研究背景.txt"), "1.1 研究背景\n正文").unwrap();
    let segmenter = Segmenter::new(&["研究背景", "研究目的"]).unwrap();

    let check = check_modules(dir.path(), segmenter.titles()).unwrap();
    assert!(!check.is_complete());
    assert_eq!(check.expected, 2);
    assert_eq!(check.found, 1);
    assert_eq!(check.missing, ["研究目的"]);
}
