use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn folio() -> Command {
    let mut cmd = Command::cargo_bin("folio").unwrap();
    cmd.env_remove("FOLIO_LOG").env_remove("RUST_LOG");
    cmd
}

fn config_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const VALID: &str = r#"{ "personal": { "name": "Jane", "title": "Architect", "email": "jane@example.com" } }"#;

#[test]
fn check_accepts_valid_file() {
    let file = config_file(".json", VALID);
    folio()
        .arg("check")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn check_reports_every_violation() {
    let file = config_file(
        ".json",
        r#"{ "personal": { "name": "", "email": "not-an-email" }, "theme": { "radius": 99 } }"#,
    );
    folio()
        .arg("check")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("personal.email: must be a valid email address"))
        .stderr(predicate::str::contains("personal.name"))
        .stderr(predicate::str::contains("theme.radius"))
        .stderr(predicate::str::contains("3 error(s)"));
}

#[test]
fn check_reads_toml() {
    let file = config_file(
        ".toml",
        "[personal]\nname = \"Jane\"\nemail = \"jane@example.com\"\n",
    );
    folio().arg("check").arg(file.path()).assert().success();
}

#[test]
fn check_missing_file_fails() {
    folio()
        .args(["check", "/definitely/not/here.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unavailable"));
}

#[test]
fn render_prints_resolved_document() {
    let file = config_file(".json", VALID);
    folio()
        .args(["render", "--no-env"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""title": "Jane | Portfolio""#))
        .stdout(predicate::str::contains("Architect portfolio of Jane"));
}

#[test]
fn render_single_path() {
    let file = config_file(".json", VALID);
    folio()
        .args(["render", "--no-env", "--path", "seo.title"])
        .arg(file.path())
        .assert()
        .success()
        .stdout("\"Jane | Portfolio\"\n");
}

#[test]
fn render_applies_env_overrides() {
    let file = config_file(".json", VALID);
    folio()
        .env("FOLIO__THEME__MODE", "dark")
        .args(["render", "--path", "theme.mode"])
        .arg(file.path())
        .assert()
        .success()
        .stdout("\"dark\"\n");
}

#[test]
fn render_without_schema_skips_defaults() {
    let file = config_file(".json", r#"{ "greeting": "Hi {{name}}", "name": "Jane" }"#);
    folio()
        .args(["render", "--no-env", "--no-schema"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""greeting": "Hi Jane""#))
        .stdout(predicate::str::contains("theme").not());
}

#[test]
fn lint_flags_unclosed_placeholder() {
    folio()
        .args(["lint", "Hello {{personal.name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn lint_lists_variables() {
    folio()
        .args(["lint", "{{personal.name|uppercase}} - {{site.title}}"])
        .assert()
        .success()
        .stdout(predicate::str::contains("variables: personal.name, site.title"));
}

#[test]
fn lint_rejects_unknown_pattern() {
    folio()
        .args(["lint", "x", "--pattern", "angle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown pattern"));
}

#[test]
fn preview_uses_set_values() {
    folio()
        .args([
            "preview",
            "{{personal.name|uppercase}} ({{years}})",
            "--set",
            "personal.name=Jane",
            "--set",
            "years=12",
        ])
        .assert()
        .success()
        .stdout("JANE (12)\n");
}

#[test]
fn preview_reads_config_file() {
    let file = config_file(".json", VALID);
    folio()
        .args(["preview", "${personal.title}", "--pattern", "dollar", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout("Architect\n");
}

#[test]
fn preview_rejects_malformed_assignment() {
    folio()
        .args(["preview", "x", "--set", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PATH=VALUE"));
}
