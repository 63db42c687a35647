//! Link validation across whole engine runs.

use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use quire_core::{EngineOptions, File, OutputStream, PluginEntry, RunOutcome, run};
use quire_parser::MarkdownProcessor;
use quire_validate_links::ValidateLinks;
use serde_json::{Value, json};
use tempfile::TempDir;

fn tree(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (path, contents) in files {
        let path = temp.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    temp
}

async fn validate(temp: &TempDir, files: &[&str], options: Value) -> RunOutcome {
    run(EngineOptions {
        cwd: Some(temp.path().to_path_buf()),
        files: files.iter().map(|file| (*file).into()).collect(),
        extensions: vec!["md".to_string()],
        plugins: vec![PluginEntry::plugin(Arc::new(ValidateLinks), Some(options))],
        processor: Some(Arc::new(MarkdownProcessor::new())),
        stream_out: Some(OutputStream::capture()),
        stream_error: Some(OutputStream::capture()),
        ..Default::default()
    })
    .await
    .unwrap()
}

fn reasons(file: &File) -> Vec<&str> {
    let mut reasons: Vec<_> = file.messages.iter().map(|m| m.reason.as_str()).collect();
    reasons.sort();
    reasons
}

#[tokio::test]
async fn test_existing_heading_in_linked_file() {
    let temp = tree(&[("a.md", "[b](b.md#intro)\n"), ("b.md", "# Intro\n")]);

    let outcome = validate(&temp, &["a.md"], json!({ "repository": false })).await;

    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.files.len(), 1);
    assert!(outcome.files[0].messages.is_empty());
}

#[tokio::test]
async fn test_missing_heading_with_suggestion() {
    let temp = tree(&[("a.md", "[b](b.md#intro)\n"), ("b.md", "# Intros\n")]);

    let outcome = validate(&temp, &["a.md", "b.md"], json!({ "repository": false })).await;

    assert_eq!(outcome.code, 0);
    let a = &outcome.files[0];
    assert_eq!(
        reasons(a),
        vec!["Cannot find heading for `#intro` in `b.md`; did you mean `intros`"]
    );
    let message = &a.messages[0];
    assert_eq!(message.rule_id.as_deref(), Some("missing-heading-in-file"));
    assert_eq!(message.place.unwrap().start().line, 1);
    assert!(outcome.files[1].messages.is_empty());
}

#[tokio::test]
async fn test_missing_heading_without_close_match() {
    let temp = tree(&[("a.md", "[b](b.md#intro)\n"), ("b.md", "# Other\n")]);

    let outcome = validate(&temp, &["a.md"], json!({ "repository": false })).await;

    assert_eq!(
        reasons(&outcome.files[0]),
        vec!["Cannot find heading for `#intro` in `b.md`"]
    );
}

#[tokio::test]
async fn test_folder_links_use_the_readme() {
    let temp = tree(&[
        ("a.md", "[d](docs#guide) [e](./docs#nope) [f](docs)\n"),
        ("docs/readme.md", "# Guide\n"),
    ]);

    let outcome = validate(&temp, &["a.md"], json!({ "repository": false })).await;

    assert_eq!(
        reasons(&outcome.files[0]),
        vec!["Cannot find heading for `#nope` in `docs`"]
    );
    assert_eq!(
        outcome.origins,
        vec![temp.path().join("a.md"), temp.path().join("docs/readme.md")]
    );
}

#[tokio::test]
async fn test_missing_file_with_hash() {
    let temp = tree(&[("a.md", "[m](missing.md#x)\n")]);

    let outcome = validate(&temp, &["a.md"], json!({ "repository": false })).await;

    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.files.len(), 1);
    assert_eq!(
        reasons(&outcome.files[0]),
        vec![
            "Cannot find file `missing.md`",
            "Cannot find heading for `#x` in `missing.md`",
        ]
    );
}

#[tokio::test]
async fn test_links_to_the_hosted_repository() {
    let temp = tree(&[
        (
            "a.md",
            "[x](https://github.com/quire/docs/blob/main/b.md#intro)\n\
             [y](/b.md#L3)\n\
             [z](https://github.com/quire/docs/blob/main/changelog.md)\n\
             [w](https://github.com/someone/else/blob/main/nope.md)\n",
        ),
        ("b.md", "# Intro\n"),
    ]);

    let outcome = validate(
        &temp,
        &["a.md"],
        json!({ "repository": "https://github.com/quire/docs" }),
    )
    .await;

    assert_eq!(
        reasons(&outcome.files[0]),
        vec!["Cannot find file `changelog.md`"]
    );
}

#[tokio::test]
async fn test_warnings_fail_frail_runs() {
    let temp = tree(&[("a.md", "[x](#nowhere)\n")]);
    let stream_error = OutputStream::capture();

    let outcome = run(EngineOptions {
        cwd: Some(temp.path().to_path_buf()),
        files: vec!["a.md".into()],
        plugins: vec![PluginEntry::plugin(
            Arc::new(ValidateLinks),
            Some(json!({ "repository": false })),
        )],
        processor: Some(Arc::new(MarkdownProcessor::new())),
        stream_out: Some(OutputStream::capture()),
        stream_error: Some(stream_error.clone()),
        frail: true,
        ..Default::default()
    })
    .await
    .unwrap();

    assert_eq!(outcome.code, 1);
    let report = stream_error.contents().unwrap();
    assert!(report.contains("Cannot find heading for `#nowhere`"), "{report}");
    assert!(report.contains("quire-validate-links"), "{report}");
    assert!(report.ends_with("⚠ 1 warning\n"), "{report}");
}

#[tokio::test]
async fn test_invalid_options_fail_the_file() {
    let temp = tree(&[("a.md", "# A\n")]);

    let outcome = validate(&temp, &["a.md"], json!({ "skipPathPatterns": ["("] })).await;

    assert_eq!(outcome.code, 1);
    let message = &outcome.files[0].messages[0];
    assert_eq!(message.reason, "Cannot process file");
    assert!(
        message
            .cause
            .as_deref()
            .unwrap()
            .starts_with("Cannot compile skip path pattern `(`")
    );
}
