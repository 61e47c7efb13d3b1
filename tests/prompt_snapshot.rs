use ruby_translator::TargetLanguages;
use ruby_translator::translations::{TOOL_NAME, render_system_prompt};

#[test]
fn system_prompt_snapshot() {
    let targets = TargetLanguages::parse_list("en,jp").unwrap();
    let prompt = render_system_prompt(&targets, TOOL_NAME).unwrap();
    insta::assert_snapshot!(prompt);
}

#[test]
fn system_prompt_lists_only_requested_rules() {
    let targets = TargetLanguages::parse_list("zh,vi").unwrap();
    let prompt = render_system_prompt(&targets, TOOL_NAME).unwrap();
    assert!(prompt.contains("Traditional Chinese (zh), Vietnamese (vi)"));
    assert!(prompt.contains("Wasei-Kango"));
    assert!(!prompt.contains("furigana"));
    assert!(!prompt.contains("Myanmar (mm):"));
}
