use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use policyfinder::ErrorKind;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("policies.json")
}

/// Run the binary in an empty directory with no POLICYFINDER_* variables
fn run(args: &[&str]) -> Output {
    let workdir = tempfile::tempdir().expect("create temp dir");
    Command::new(env!("CARGO_BIN_EXE_policyfinder"))
        .args(args)
        .current_dir(workdir.path())
        .env_remove("POLICYFINDER_DATA")
        .env_remove("POLICYFINDER_URL")
        .env_remove("POLICYFINDER_API_KEY")
        .env_remove("POLICYFINDER_TABLE")
        .env_remove("POLICYFINDER_PAGE_SIZE")
        .env_remove("POLICYFINDER_SETTLE_MS")
        .env_remove("RUST_LOG")
        .output()
        .expect("run policyfinder")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn ids(view: &serde_json::Value) -> Vec<u64> {
    view["visible_policies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect()
}

#[test]
fn categories_lists_filters() {
    let output = run(&["categories"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    insta::assert_snapshot!(stdout.trim(), @r###"
    All
    Financial
    Social
    Legal
    "###);
}

#[test]
fn error_kinds_serialize_as_snake_case() {
    let kinds = vec![
        ErrorKind::FetchFailure,
        ErrorKind::RefinementFailure,
        ErrorKind::EmptyResult,
    ];
    insta::assert_json_snapshot!(kinds, @r###"
    [
      "fetch_failure",
      "refinement_failure",
      "empty_result"
    ]
    "###);
}

#[test]
fn browse_ranks_by_interest_across_pages() {
    let data = fixture_path();
    let output = run(&[
        "browse",
        "--data",
        data.to_str().unwrap(),
        "--interest",
        "Education",
        "--pages",
        "2",
        "--settle-ms",
        "0",
        "--json",
    ]);
    let view = stdout_json(&output);

    assert_eq!(ids(&view), vec![2, 5, 7, 1, 3, 4, 6, 8]);
    assert_eq!(view["has_more"], false);
    assert_eq!(view["page_count"], 2);
    assert_eq!(view["interests"], serde_json::json!(["Education"]));
}

#[test]
fn browse_text_output_with_search_and_save() {
    let data = fixture_path();
    let output = run(&[
        "browse",
        "--data",
        data.to_str().unwrap(),
        "--query",
        "health",
        "--save",
        "1",
        "--detail",
        "1",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Showing 1 of 1 policies"));
    assert!(stdout.contains("★ ❤ [1] Healthcare Grant (Social)"));
    assert!(stdout.contains("Eligibility: Households under 25k"));
    assert!(stdout.contains("Saved:       yes"));
}

#[test]
fn browse_reports_empty_result_without_failing() {
    let data = fixture_path();
    let output = run(&[
        "browse",
        "--data",
        data.to_str().unwrap(),
        "--category",
        "legal",
        "--query",
        "tractor",
        "--json",
    ]);
    let view = stdout_json(&output);
    assert_eq!(view["total_filtered_count"], 0);
    assert_eq!(view["error"]["kind"], "empty_result");
}

#[test]
fn match_filters_by_profession() {
    let data = fixture_path();
    let output = run(&[
        "match",
        "--data",
        data.to_str().unwrap(),
        "--profession",
        "farmer",
        "--age",
        "40",
        "--json",
    ]);
    let view = stdout_json(&output);
    assert_eq!(ids(&view), vec![4]);
}

#[test]
fn match_rejects_unknown_profession() {
    let data = fixture_path();
    let output = run(&[
        "match",
        "--data",
        data.to_str().unwrap(),
        "--profession",
        "astronaut",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown profession"));
}

#[test]
fn config_file_supplies_source_and_page_size() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("policyfinder.yml");
    fs::write(
        &config,
        format!(
            "data: {}\npage_size: 3\nsettle_ms: 0\n",
            fixture_path().display()
        ),
    )
    .unwrap();

    let output = run(&["browse", "--config", config.to_str().unwrap(), "--sort", "latest", "--json"]);
    let view = stdout_json(&output);
    assert_eq!(ids(&view), vec![8, 7, 6]);
    assert_eq!(view["has_more"], true);
}

#[test]
fn missing_source_is_reported() {
    let output = run(&["browse"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No policy source configured"));
}

#[test]
fn unreadable_data_fails_the_command() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("broken.json");
    fs::write(&data, "[{\"id\": ").unwrap();

    let output = run(&["browse", "--data", data.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not load policies"));
}
