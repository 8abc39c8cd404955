use super::ModuleTitleFormat;
use crate::formats::HeadingFormat;
use crate::section::HeadingLevel;

#[test]
fn test_unnumbered_titles_are_auto_numbered() {
    let format = ModuleTitleFormat::new(&["研究背景", "研究目的"]).unwrap();
    let texts: Vec<&str> = format.titles().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["1. 研究背景", "2. 研究目的"]);
}

#[test]
fn test_numbered_titles_are_kept() {
    let format = ModuleTitleFormat::new(&["3. 研究内容", "5. 实施方案"]).unwrap();
    let texts: Vec<&str> = format.titles().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["3. 研究内容", "5. 实施方案"]);
}

#[test]
fn test_matches_by_suffix_with_leading_noise() {
    let format = ModuleTitleFormat::new(&["研究背景", "研究目的"]).unwrap();
    assert_eq!(format.match_title("一、研究背景"), Some(0));
    assert_eq!(format.match_title("**第二章 研究目的  "), Some(1));
    assert_eq!(format.match_title("研究背景与意义"), None);
    assert_eq!(format.classify("1 研究背景"), Some(HeadingLevel::Level1));
    assert_eq!(format.classify("正文"), None);
}

#[test]
fn test_first_configured_title_wins() {
    let format = ModuleTitleFormat::new(&["内容", "研究内容"]).unwrap();
    assert_eq!(format.match_title("3. 研究内容"), Some(0));
}

#[test]
fn test_blank_titles_are_dropped() {
    let format = ModuleTitleFormat::new(&["", "  ", "研究背景"]).unwrap();
    assert_eq!(format.titles().len(), 1);
    assert_eq!(format.titles()[0].text, "1. 研究背景");
    assert_eq!(format.match_title("任意一行"), None);
}

#[test]
fn test_titles_with_regex_metacharacters() {
    let format = ModuleTitleFormat::new(&["预算(万元)"]).unwrap();
    assert_eq!(format.match_title("六、预算(万元)"), Some(0));
    assert_eq!(format.match_title("预算万元"), None);
}
