//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

const PAGE_URL: &str = "https://blog.example.com/posts/cli";

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("pagemark")
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

#[test]
fn test_cli_file_input() {
    cmd()
        .arg(get_fixture_path("article.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("# Shipping a Rust CLI"))
        .stdout(predicate::str::contains("source: \"file://"));
}

#[test]
fn test_cli_stdin_input() {
    let html = std::fs::read_to_string(get_fixture_path("article.html")).unwrap();
    cmd()
        .args(["--url", PAGE_URL, "-"])
        .write_stdin(html)
        .assert()
        .success()
        .stdout(predicate::str::contains("[cargo guide](https://blog.example.com/guides/cargo)"));
}

#[test]
fn test_cli_stdin_without_url_fails() {
    cmd()
        .arg("-")
        .write_stdin("<p>orphan</p>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TotalFailure"));
}

#[test]
fn test_cli_markdown_structure() {
    cmd()
        .args(["--url", PAGE_URL, "--no-frontmatter", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Shipping a Rust CLI\n\n"))
        .stdout(predicate::str::contains(
            "```\npagemark/\n├── Cargo.toml\n├── crates/\n│   ├── core/\n│   └── cli/\n└── tests/\n```",
        ))
        .stdout(predicate::str::contains(
            "1. Build the release binary\n   - strip symbols\n   - enable LTO\n2. Write the changelog",
        ))
        .stdout(predicate::str::contains("```toml\n[profile.release]\nlto = true\nstrip = true\n```"))
        .stdout(predicate::str::contains("```\ncargo build --release\n   Compiling pagemark v0.3.0\n```"))
        .stdout(predicate::str::contains("> Measure before you optimize."))
        .stdout(predicate::str::contains("| linux  | 4.1 MB |"))
        .stdout(predicate::str::contains("Home").not())
        .stdout(predicate::str::contains("Copyright").not())
        .stdout(predicate::str::contains("analytics").not());
}

#[test]
fn test_cli_injection_only_matches_agent() {
    let with_agent = cmd()
        .args(["--url", PAGE_URL, "--no-frontmatter", &get_fixture_path("article.html")])
        .output()
        .unwrap();
    let without_agent = cmd()
        .args(["--url", PAGE_URL, "--no-frontmatter", "--no-agent", &get_fixture_path("article.html")])
        .output()
        .unwrap();

    assert!(with_agent.status.success());
    assert!(without_agent.status.success());
    assert_eq!(with_agent.stdout, without_agent.stdout);
}

#[test]
fn test_cli_yaml_frontmatter() {
    cmd()
        .args(["--url", PAGE_URL, "--tag", "rust", "--tag", "release", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("---\ntitle: \"Shipping a Rust CLI\"\n"))
        .stdout(predicate::str::contains("source: \"https://blog.example.com/posts/cli\""))
        .stdout(predicate::str::contains("captured: "))
        .stdout(predicate::str::contains("tags:\n  - \"rust\"\n  - \"release\"\n---\n\n# Shipping"));
}

#[test]
fn test_cli_toml_frontmatter() {
    cmd()
        .args(["--frontmatter-style", "toml", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("+++\n"))
        .stdout(predicate::str::contains("tags = [\"clipping\"]"));
}

#[test]
fn test_cli_title_override() {
    cmd()
        .args(["--title", "My notes", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("title: \"My notes\""));
}

#[test]
fn test_cli_json_format() {
    let output = cmd()
        .args(["-f", "json", "--url", PAGE_URL, &get_fixture_path("article.html")])
        .output()
        .unwrap();
    assert!(output.status.success());

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["ok"], true);
    assert!(response["markdown"].as_str().unwrap().starts_with("# Shipping a Rust CLI"));
    assert!(response["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_cli_json_failure() {
    let output = cmd().args(["-f", "json", "-"]).write_stdin("<p>x</p>").output().unwrap();
    assert!(!output.status.success());

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["ok"], false);
    assert_eq!(response["errorKind"], "TotalFailure");
}

#[test]
fn test_cli_tree_diagram() {
    cmd()
        .args(["--no-frontmatter", &get_fixture_path("tree_diagram.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("```\nsrc/\n├── main.rs\n└── lib.rs\n```"))
        .stdout(predicate::str::contains("Files in `src/` hold the code."));
}

#[test]
fn test_cli_empty_page_degrades() {
    cmd()
        .args(["--url", PAGE_URL, "--no-frontmatter", &get_fixture_path("empty.html")])
        .assert()
        .success()
        .stdout(predicate::str::diff("# Nothing here\n\n<https://blog.example.com/posts/cli>\n"))
        .stderr(predicate::str::contains("Captured title and URL only"));
}

#[test]
fn test_cli_restricted_page_degrades() {
    cmd()
        .args(["--url", "chrome://newtab", "--no-frontmatter", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::diff("# Shipping a Rust CLI\n\n<chrome://newtab>\n"));
}

#[test]
fn test_cli_bullet_marker() {
    cmd()
        .args(["--bullet", "*", "--no-frontmatter", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("   * strip symbols"));
}

#[test]
fn test_cli_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output.md");

    cmd()
        .args(["-o", output.to_str().unwrap()])
        .arg(get_fixture_path("article.html"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Output written to"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("# Shipping a Rust CLI"));
}

#[test]
fn test_cli_invalid_file() {
    cmd().arg("nonexistent.html").assert().failure();
}

#[test]
fn test_cli_invalid_format() {
    cmd().args(["-f", "pdf", &get_fixture_path("article.html")]).assert().failure();
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["-v", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("Pagemark"));
}
