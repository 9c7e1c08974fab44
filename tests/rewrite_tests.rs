use starfish_gateway::models::entry::{Entry, FILE_TYPE};
use starfish_gateway::models::rule::{RewriteConfig, RewriteRule};
use starfish_gateway::rewrite::context::TemplateContext;
use starfish_gateway::rewrite::format::format_size;
use starfish_gateway::rewrite::functions::FunctionTable;
use starfish_gateway::rewrite::{RewriteEngine, RuleOutcome, Template, TemplateError};

fn document() -> Entry {
    Entry {
        filename: "document.pdf".to_string(),
        parent_path: "/projects/reports".to_string(),
        entry_type: FILE_TYPE,
        size: 1048576,
        modify_time_unix: 1705316400,
        create_time_unix: 1704067200,
        volume: "vol1".to_string(),
        tags_explicit_str: "project-a,important".to_string(),
        tags_inherited_str: "important,archive".to_string(),
        ..Default::default()
    }
}

fn rule(bucket: &str, pattern: &str, template: &str, priority: i64) -> RewriteRule {
    RewriteRule {
        bucket: bucket.to_string(),
        pattern: pattern.to_string(),
        template: template.to_string(),
        priority,
    }
}

fn engine(rules: Vec<RewriteRule>) -> RewriteEngine {
    RewriteEngine::new(&RewriteConfig { rules })
}

fn render(source: &str, entry: &Entry) -> Result<String, TemplateError> {
    let functions = FunctionTable::standard();
    let template = Template::parse(source, &functions)?;
    let original_key = entry.natural_key();
    template.execute(&TemplateContext::new(entry, &original_key), &functions)
}

// ==================== Engine Tests ====================

#[test]
fn test_date_and_filename_example() {
    let engine = engine(vec![rule(
        "*",
        "^(.*)$",
        r#"{{ modifyTime "%Y/%m/%d" }}/{{ .Filename }}"#,
        100,
    )]);
    let entry = document();
    let key = engine.rewrite(&entry, &entry.natural_key(), "any-bucket");
    assert_eq!(key, "2024/01/15/document.pdf");
}

#[test]
fn test_highest_priority_matching_rule_wins() {
    let engine = engine(vec![
        rule("*", ".*", "wildcard/{{ .Filename }}", 100),
        rule("Archive", ".*", r#"{{ modifyTime "%m/%d/%Y" }}/{{ .Filename }}"#, 200),
        rule("Tagged-Data", ".*", r#"{{ join .TagsExplicit "/" }}/{{ .Filename }}"#, 300),
    ]);
    let entry = document();
    let original = entry.natural_key();

    assert_eq!(engine.rewrite(&entry, &original, "Archive"), "01/15/2024/document.pdf");
    assert_eq!(
        engine.rewrite(&entry, &original, "Tagged-Data"),
        "project-a/important/document.pdf"
    );
    assert_eq!(engine.rewrite(&entry, &original, "Other"), "wildcard/document.pdf");
}

#[test]
fn test_rule_order_in_document_does_not_matter() {
    let low_first = engine(vec![
        rule("*", ".*", "low", 1),
        rule("*", ".*", "high", 5),
    ]);
    let high_first = engine(vec![
        rule("*", ".*", "high", 5),
        rule("*", ".*", "low", 1),
    ]);
    let entry = document();
    assert_eq!(low_first.rewrite(&entry, "k", "b"), "high");
    assert_eq!(high_first.rewrite(&entry, "k", "b"), "high");
}

#[test]
fn test_equal_priority_keeps_document_order() {
    let engine = engine(vec![
        rule("*", ".*", "first", 10),
        rule("*", ".*", "second", 10),
    ]);
    assert_eq!(engine.rewrite(&document(), "k", "b"), "first");
}

#[test]
fn test_no_matching_rule_keeps_original_key() {
    let engine = engine(vec![rule("*", r"\.csv$", "tables/{{ .Filename }}", 10)]);
    let entry = document();
    assert_eq!(
        engine.evaluate(&entry, "projects/reports/document.pdf", "b"),
        RuleOutcome::NoMatch
    );
    assert_eq!(
        engine.rewrite(&entry, "projects/reports/document.pdf", "b"),
        "projects/reports/document.pdf"
    );
}

#[test]
fn test_bucket_scoped_rule_ignores_other_buckets() {
    let engine = engine(vec![rule("Archive", ".*", "archived/{{ .Filename }}", 10)]);
    let entry = document();
    assert_eq!(engine.rewrite(&entry, "orig", "Archive"), "archived/document.pdf");
    assert_eq!(engine.rewrite(&entry, "orig", "Current"), "orig");
}

#[test]
fn test_broken_rules_are_skipped() {
    let engine = engine(vec![
        rule("*", "([unclosed", "bad-pattern", 300),
        rule("*", ".*", "{{ .Filename", 200),
        rule("*", ".*", "{{ noSuchFunction .Filename }}", 150),
        rule("*", ".*", "{{ .NoSuchField }}", 120),
        rule("*", ".*", "good/{{ .Filename }}", 100),
    ]);
    assert_eq!(engine.rule_count(), 5);
    assert_eq!(engine.rewrite(&document(), "orig", "b"), "good/document.pdf");
}

#[test]
fn test_failing_rule_falls_back_to_original_key() {
    let engine = engine(vec![rule("*", ".*", "{{ .Missing }}/{{ .Filename }}", 10)]);
    assert_eq!(engine.rewrite(&document(), "orig/key.pdf", "b"), "orig/key.pdf");
}

#[test]
fn test_leading_slash_and_whitespace_are_stripped() {
    let engine = engine(vec![rule("*", ".*", "  /{{ .ParentPath }}/{{ .Filename }} ", 10)]);
    // ParentPath already starts with '/', so only one separator is removed
    assert_eq!(
        engine.rewrite(&document(), "orig", "b"),
        "/projects/reports/document.pdf"
    );

    let engine = self::engine(vec![rule("*", ".*", "/{{ .Filename }}", 10)]);
    assert_eq!(engine.rewrite(&document(), "orig", "b"), "document.pdf");
}

#[test]
fn test_rewrite_is_deterministic() {
    let engine = engine(vec![rule(
        "*",
        ".*",
        r#"{{ upper .Extension }}/{{ sizeFormatted "auto" }}/{{ .Filename }}"#,
        10,
    )]);
    let entry = document();
    let first = engine.rewrite(&entry, "orig", "b");
    for _ in 0..10 {
        assert_eq!(engine.rewrite(&entry, "orig", "b"), first);
    }
    assert_eq!(first, ".PDF/1MB/document.pdf");
}

#[test]
fn test_empty_rule_set_is_identity() {
    let engine = RewriteEngine::default();
    assert_eq!(engine.rule_count(), 0);
    assert_eq!(engine.rewrite(&document(), "a/b.txt", "b"), "a/b.txt");
}

// ==================== Template Tests ====================

#[test]
fn test_fields_and_computed_fields() {
    let entry = document();
    assert_eq!(render("{{ .Entry.Filename }}", &entry).unwrap(), "document.pdf");
    assert_eq!(render("{{ .FilenameWithoutExt }}", &entry).unwrap(), "document");
    assert_eq!(render("{{ .ModifyTimeFormatted }}", &entry).unwrap(), "2024/01/15");
    assert_eq!(render("{{ .CreateTimeFormatted }}", &entry).unwrap(), "2024/01/01");
    assert_eq!(render("{{ .AccessTimeFormatted }}", &entry).unwrap(), "");
    assert_eq!(render("{{ .SizeFormatted }}", &entry).unwrap(), "1MB");
    assert_eq!(render("{{ .ParentDir }}", &entry).unwrap(), "/projects");
    assert_eq!(
        render("{{ .OriginalKey }}", &entry).unwrap(),
        "projects/reports/document.pdf"
    );
    assert_eq!(
        render(r#"{{ join .AllTags "," }}"#, &entry).unwrap(),
        "project-a,important,archive"
    );
}

#[test]
fn test_pipelines_pass_value_as_last_argument() {
    let entry = document();
    assert_eq!(render("{{ .Filename | upper }}", &entry).unwrap(), "DOCUMENT.PDF");
    assert_eq!(
        render(r#"{{ trimSuffix .Filename ".pdf" | upper }}"#, &entry).unwrap(),
        "DOCUMENT"
    );
}

#[test]
fn test_nested_calls_and_lists() {
    let entry = document();
    assert_eq!(
        render(r#"{{ join (split .TagsExplicitStr ",") "/" }}"#, &entry).unwrap(),
        "project-a/important"
    );
    assert_eq!(render("{{ first .TagsExplicit }}", &entry).unwrap(), "project-a");
    assert_eq!(render("{{ last .TagsInherited }}", &entry).unwrap(), "archive");
    assert_eq!(render("{{ index .TagsExplicit 1 }}", &entry).unwrap(), "important");
    assert_eq!(render("{{ length .TagsExplicit }}", &entry).unwrap(), "2");
}

#[test]
fn test_index_out_of_range_is_empty() {
    let entry = document();
    assert_eq!(render("{{ index .TagsExplicit 5 }}", &entry).unwrap(), "");
    assert_eq!(render("{{ index .TagsExplicit -1 }}", &entry).unwrap(), "");

    let engine = engine(vec![rule("*", ".*", "{{ index .TagsExplicit 5 }}/{{ .Filename }}", 10)]);
    assert_eq!(engine.rewrite(&entry, "orig", "b"), "document.pdf");
}

#[test]
fn test_default_takes_value_then_fallback() {
    let entry = document();
    assert_eq!(
        render(r#"{{ default .Filename "fallback" }}"#, &entry).unwrap(),
        "document.pdf"
    );
    assert_eq!(render(r#"{{ default .Mode "fallback" }}"#, &entry).unwrap(), "fallback");
    assert_eq!(
        render(r#"{{ default .TagsExplicitStr "untagged" }}"#, &entry).unwrap(),
        "project-a,important"
    );
}

#[test]
fn test_parent_dir_rewrites_one_level_up() {
    let engine = engine(vec![rule("*", ".*", "{{ .ParentDir }}/{{ .Filename }}", 10)]);
    assert_eq!(engine.rewrite(&document(), "orig", "b"), "projects/document.pdf");
}

#[test]
fn test_string_and_path_functions() {
    let entry = document();
    assert_eq!(
        render(r#"{{ replace .Filename "o" "0" 1 }}"#, &entry).unwrap(),
        "d0cument.pdf"
    );
    assert_eq!(
        render(r#"{{ replace .Filename "o" "0" -1 }}"#, &entry).unwrap(),
        "d0cument.pdf"
    );
    assert_eq!(
        render(r#"{{ replaceAll .ParentPath "/" "_" }}"#, &entry).unwrap(),
        "_projects_reports"
    );
    assert_eq!(render(r#"{{ trimLeft .ParentPath "/" }}"#, &entry).unwrap(), "projects/reports");
    assert_eq!(render("{{ base .ParentPath }}", &entry).unwrap(), "reports");
    assert_eq!(render("{{ dir .ParentPath }}", &entry).unwrap(), "/projects");
    assert_eq!(
        render(r#"{{ joinPath .Volume .ParentPath .Filename }}"#, &entry).unwrap(),
        "vol1/projects/reports/document.pdf"
    );
    assert_eq!(render(r#"{{ title "hello big world" }}"#, &entry).unwrap(), "Hello Big World");
}

#[test]
fn test_logic_and_arithmetic() {
    let entry = document();
    assert_eq!(
        render(r#"{{ ternary "big" "small" (eq .SizeString "1048576") }}"#, &entry).unwrap(),
        "big"
    );
    assert_eq!(render(r#"{{ ne .Size 0 }}"#, &entry).unwrap(), "true");
    assert_eq!(render("{{ div .Size 1024 }}", &entry).unwrap(), "1024");
    assert_eq!(render("{{ div .Size 0 }}", &entry).unwrap(), "0");
    assert_eq!(render("{{ add 2 (mul 3 4) }}", &entry).unwrap(), "14");
    assert_eq!(render(r#"{{ toInt "not a number" }}"#, &entry).unwrap(), "0");
}

#[test]
fn test_time_functions() {
    let entry = document();
    assert_eq!(
        render(r#"{{ formatUnix .ModifyTimeUnix "%Y-%m-%d" }}"#, &entry).unwrap(),
        "2024-01-15"
    );
    assert_eq!(render(r#"{{ createTime "%Y" }}"#, &entry).unwrap(), "2024");
    assert_eq!(render(r#"{{ accessTime "%Y" }}"#, &entry).unwrap(), "");
}

#[test]
fn test_parse_errors() {
    let functions = FunctionTable::standard();
    for source in [
        "{{ .Filename",
        "{{ exec \"rm -rf /\" }}",
        "{{ \"unterminated }}",
        "{{ (upper .Filename }}",
        "{{ .Filename .Size }}",
        "{{ upper lower }}",
    ] {
        assert!(
            matches!(Template::parse(source, &functions), Err(TemplateError::Parse(_))),
            "{source} should not parse"
        );
    }
}

#[test]
fn test_execution_errors() {
    let entry = document();
    assert!(matches!(render("{{ .Missing }}", &entry), Err(TemplateError::Exec(_))));
    assert!(matches!(render("{{ upper }}", &entry), Err(TemplateError::Exec(_))));
    assert!(matches!(
        render(r#"{{ modifyTime "%Q" }}"#, &entry),
        Err(TemplateError::Exec(_))
    ));
}

#[test]
fn test_custom_function_table() {
    let functions = FunctionTable::builder()
        .register("shout", |_, args| {
            let text = args
                .first()
                .map(|v| v.to_string())
                .unwrap_or_default();
            Ok(starfish_gateway::rewrite::Value::Str(format!("{text}!")))
        })
        .build();
    assert_eq!(functions.len(), 1);
    assert!(!functions.contains("upper"));

    let config = RewriteConfig {
        rules: vec![
            rule("*", ".*", "{{ upper .Filename }}", 20),
            rule("*", ".*", "{{ shout .Filename }}", 10),
        ],
    };
    let engine = RewriteEngine::with_functions(&config, functions);
    assert_eq!(engine.rewrite(&document(), "orig", "b"), "document.pdf!");
}

// ==================== Size Formatting Tests ====================

#[test]
fn test_format_size() {
    assert_eq!(format_size(1048576, "mb"), "1");
    assert_eq!(format_size(1024, "auto"), "1KB");
    assert_eq!(format_size(512, "auto"), "512B");
    assert_eq!(format_size(3 * 1024 * 1024 * 1024, "auto"), "3GB");
    assert_eq!(format_size(1536, "KB"), "1");
    assert_eq!(format_size(999, "bytes"), "999");
    assert_eq!(format_size(999, "parsecs"), "999");
}
