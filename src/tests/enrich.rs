use super::{enrich, resolve, EnrichedOutline, SourceInfo};
use crate::outline::parse_outline;
use crate::section::{SectionEntry, SourceFile, SubsectionEntry, TitleIndex};
use crate::source_index::SourceIndex;
use std::path::PathBuf;

fn files() -> Vec<SourceFile> {
    let mut index = TitleIndex {
        source_txt: Some(PathBuf::from("/data/a/3_研究内容.txt")),
        ..TitleIndex::default()
    };
    let mut section = SectionEntry {
        start_line: 1,
        end_line: 12,
        summary: Some("制造摘要".to_string()),
        ..SectionEntry::default()
    };
    section.subsections.insert(
        "3.2.1 排产优化".to_string(),
        SubsectionEntry {
            start_line: 5,
            end_line: 12,
            summary: None,
        },
    );
    index.sections.insert("3.2 智能制造".to_string(), section);
    vec![SourceFile {
        path: PathBuf::from("/data/a.json"),
        index,
    }]
}

#[test]
fn test_unresolved_provenance_gives_null_record() {
    let files = files();
    let index = SourceIndex::build(&files);
    let info = resolve("3.1 智能设计", &index);
    assert_eq!(info, SourceInfo::unresolved("3.1 智能设计"));

    let value = serde_json::to_value(&info).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "source_name": "3.1 智能设计",
            "start_line": null,
            "end_line": null,
            "summary": null,
            "source_txt": null
        })
    );
}

#[test]
fn test_resolved_provenance_carries_location() {
    let files = files();
    let index = SourceIndex::build(&files);
    let info = resolve("3.2 智能制造", &index);
    assert!(info.is_resolved());
    assert_eq!(info.start_line, Some(1));
    assert_eq!(info.end_line, Some(12));
    assert_eq!(info.summary.as_deref(), Some("制造摘要"));
    assert_eq!(info.source_txt, Some(PathBuf::from("/data/a/3_研究内容.txt")));
}

#[test]
fn test_every_provenance_entry_gets_a_record() {
    let files = files();
    let index = SourceIndex::build(&files);
    let outline = parse_outline(
        "## 1. 制造（由\"3.2 智能制造\"、\"3.1 智能设计\"组合）\n\
         ### 1.1 排产（由\"3.2.1 排产优化\"、\"9.9 不存在\"组合）\n",
    );
    let enriched = enrich(&outline, &index);

    let section = &enriched.sections["1"];
    assert_eq!(section.source_info.len(), 2);
    assert!(section.source_info[0].is_resolved());
    assert_eq!(section.source_info[1], SourceInfo::unresolved("3.1 智能设计"));

    let child = &section.sub_sections["1.1"];
    assert_eq!(child.source_info[0].start_line, Some(5));
    assert!(!child.source_info[1].is_resolved());
    assert_eq!(child.resolved().count(), 1);
    assert_eq!(enriched.unresolved_count(), 2);
}

#[test]
fn test_level2_is_target_when_children_lack_provenance() {
    let files = files();
    let index = SourceIndex::build(&files);
    let outline = parse_outline(
        "## 1. 制造（由\"3.2 智能制造\"组合）\n### 1.1 子节一\n- 要点\n### 1.2 子节二\n",
    );
    let enriched = enrich(&outline, &index);
    let targets: Vec<&str> = enriched
        .recomposition_targets()
        .iter()
        .map(|(key, _)| *key)
        .collect();
    assert_eq!(targets, ["1"]);
}

#[test]
fn test_children_are_targets_when_any_has_provenance() {
    let files = files();
    let index = SourceIndex::build(&files);
    let outline = parse_outline(
        "## 1. 制造（由\"3.2 智能制造\"组合）\n\
         ### 1.1 排产（由\"3.2.1 排产优化\"组合）\n\
         ### 1.2 无来源\n\
         ## 2. 独立章节（由\"3.2 智能制造\"组合）\n",
    );
    let enriched = enrich(&outline, &index);
    let targets: Vec<&str> = enriched
        .recomposition_targets()
        .iter()
        .map(|(key, _)| *key)
        .collect();
    assert_eq!(targets, ["1.1", "2"]);
}

#[test]
fn test_enriched_json_shape() {
    let files = files();
    let index = SourceIndex::build(&files);
    let outline = parse_outline("## 1. 制造（由\"3.2 智能制造\"组合）\n");
    let enriched = enrich(&outline, &index);

    let value = serde_json::to_value(&enriched).unwrap();
    assert_eq!(value["1"]["source"][0], "3.2 智能制造");
    assert_eq!(value["1"]["source_info"][0]["start_line"], 1);
    assert_eq!(value["1"]["source_info"][0]["source_txt"], "/data/a/3_研究内容.txt");

    let back: EnrichedOutline = serde_json::from_value(value).unwrap();
    assert_eq!(back, enriched);
}

#[test]
fn test_source_texts_are_distinct_and_ordered() {
    let files = files();
    let index = SourceIndex::build(&files);
    let outline = parse_outline(
        "## 1. 制造（由\"3.2 智能制造\"、\"3.2.1 排产优化\"、\"9.9 不存在\"组合）\n",
    );
    let enriched = enrich(&outline, &index);
    assert_eq!(
        enriched.source_texts(),
        [std::path::Path::new("/data/a/3_研究内容.txt")]
    );
}
