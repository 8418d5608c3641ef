//! Integration tests for the annotrace CLI.
//!
//! Each test runs the binary in its own temp directory with an empty global
//! config, so settings on the machine running the tests do not leak in.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const HOME: &str = include_str!("fixtures/home.json");
const HOME_RENDER: &str = include_str!("fixtures/home.render.json");
const BROKEN_RENDER: &str = include_str!("fixtures/broken.render.json");
const CONTENT_MODEL: &str = include_str!("fixtures/content-model.toml");

/// A temp project with the fixtures written into it.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child("global.toml").write_str("").unwrap();
    dir.child("home.json").write_str(HOME).unwrap();
    dir.child("home.render.json").write_str(HOME_RENDER).unwrap();
    dir.child("broken.render.json").write_str(BROKEN_RENDER).unwrap();
    dir.child("content-model.toml").write_str(CONTENT_MODEL).unwrap();
    dir
}

/// Get a command for running annotrace inside `dir`.
fn annotrace(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("annotrace").unwrap();
    cmd.env("ANNOTRACE_CONFIG", dir.child("global.toml").path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .arg("--cwd")
        .arg(dir.path());
    cmd
}

mod validate {
    use super::*;

    #[test]
    fn clean_page_passes() {
        let dir = project();
        annotrace(&dir)
            .args(["validate", "--document", "home.json", "--render", "home.render.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("PASS: no violations"));
    }

    #[test]
    fn broken_page_reports_every_violation() {
        let dir = project();
        annotrace(&dir)
            .args(["validate", "--document", "home.json", "--render", "broken.render.json"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("FAIL: 3 violation(s)"))
            .stdout(predicate::str::contains("[out-of-bounds] home: "))
            .stdout(predicate::str::contains(
                "index 2 is out of range for sections.0.items (length 2)",
            ))
            .stdout(predicate::str::contains("[naming]"))
            .stdout(predicate::str::contains("actual:   Item_Name"))
            .stdout(predicate::str::contains("[path-resolution]"));
    }

    #[test]
    fn json_report() {
        let dir = project();
        let output = annotrace(&dir)
            .args([
                "--json",
                "validate",
                "--document",
                "home.json",
                "--render",
                "broken.render.json",
            ])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["passed"], false);
        assert_eq!(report["counts"]["out-of-bounds"], 1);
        assert_eq!(report["violations"].as_array().unwrap().len(), 3);

        let oob = report["violations"]
            .as_array()
            .unwrap()
            .iter()
            .find(|v| v["kind"] == "out-of-bounds")
            .unwrap();
        assert_eq!(oob["expected"], "index < 2");
        assert_eq!(oob["location"]["scope"], "render-node");
        assert_eq!(oob["location"]["page"], "home");
        assert!(oob["id"].as_str().unwrap().starts_with("out-of-bounds:"));
    }

    #[test]
    fn ids_are_stable_across_runs() {
        let dir = project();
        let run = || {
            let output = annotrace(&dir)
                .args([
                    "--json",
                    "validate",
                    "--document",
                    "home.json",
                    "--render",
                    "broken.render.json",
                ])
                .output()
                .unwrap();
            let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
            report["violations"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v["id"].as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn configured_pages() {
        let dir = project();
        dir.child("annotrace.toml")
            .write_str(
                r#"
[[pages]]
name = "landing"
document = "home.json"
render = "broken.render.json"
"#,
            )
            .unwrap();

        annotrace(&dir)
            .arg("validate")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[out-of-bounds] landing: "));
    }

    #[test]
    fn configured_marker_attributes() {
        let dir = project();
        dir.child("annotrace.toml")
            .write_str("[markers]\nfield_attribute = \"data-path\"\n")
            .unwrap();
        dir.child("custom.render.json")
            .write_str(&HOME_RENDER.replace("data-sb-field-path", "data-path"))
            .unwrap();

        annotrace(&dir)
            .args(["validate", "--document", "home.json", "--render", "custom.render.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("PASS"));
    }

    #[test]
    fn quiet_pass_prints_nothing() {
        let dir = project();
        annotrace(&dir)
            .args(["-q", "validate", "--document", "home.json", "--render", "home.render.json"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn debug_traces_go_to_stderr() {
        let dir = project();
        annotrace(&dir)
            .args([
                "--debug",
                "validate",
                "--document",
                "home.json",
                "--render",
                "home.render.json",
            ])
            .assert()
            .success()
            .stderr(predicate::str::contains("[debug] page home: 2 sections"));
    }

    #[test]
    fn no_pages_is_fatal() {
        let dir = project();
        annotrace(&dir)
            .arg("validate")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("error: No pages to validate"));
    }

    #[test]
    fn unpaired_render_is_fatal() {
        let dir = project();
        annotrace(&dir)
            .args(["validate", "--document", "home.json"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("matching --render"));
    }

    #[test]
    fn missing_document_is_fatal() {
        let dir = project();
        annotrace(&dir)
            .args(["validate", "--document", "nope.json", "--render", "home.render.json"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Failed to load content document"));
    }

    #[test]
    fn unparseable_document_shows_preview() {
        let dir = project();
        dir.child("bad.json")
            .write_str("{\n  \"sections\": [ { \"_type\": \"categoriesSection\" ]\n}")
            .unwrap();
        annotrace(&dir)
            .args(["validate", "--document", "bad.json", "--render", "home.render.json"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("bad.json"))
            .stderr(predicate::str::contains("categoriesSection"));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let dir = project();
        dir.child("global.toml")
            .write_str("[output]\nformat = \"yaml\"\n")
            .unwrap();
        annotrace(&dir)
            .args(["validate", "--document", "home.json", "--render", "home.render.json"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Failed to load config"));
    }
}

mod check {
    use super::*;

    #[test]
    fn reports_model_and_nested_gaps() {
        let dir = project();
        annotrace(&dir)
            .args([
                "check",
                "--declarations",
                "content-model.toml",
                "--document",
                "home.json",
                "--render",
                "home.render.json",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("FAIL: 2 violation(s)"))
            .stdout(predicate::str::contains("[model-gap] type productCard"))
            .stdout(predicate::str::contains("expected: ctaLabel"))
            .stdout(predicate::str::contains("[nested-coverage] type flashSaleSection"))
            .stdout(predicate::str::contains("expected: items.image"));
    }

    #[test]
    fn does_not_repeat_render_violations() {
        let dir = project();
        annotrace(&dir)
            .args([
                "check",
                "--declarations",
                "content-model.toml",
                "--document",
                "home.json",
                "--render",
                "broken.render.json",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[out-of-bounds]").not())
            .stdout(predicate::str::contains("[naming] type categoriesSection"));
    }

    #[test]
    fn declarations_from_config() {
        let dir = project();
        dir.child("annotrace.toml")
            .write_str("declarations = \"content-model.toml\"\n")
            .unwrap();
        annotrace(&dir)
            .arg("check")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[model-gap]"));
    }

    #[test]
    fn missing_declarations_is_fatal() {
        let dir = project();
        annotrace(&dir)
            .arg("check")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("No declarations file"));
    }

    #[test]
    fn unknown_bundle_is_fatal() {
        let dir = project();
        dir.child("bad-model.toml")
            .write_str("[types.faq.schema]\nincludes = [\"missing\"]\n")
            .unwrap();
        annotrace(&dir)
            .args(["check", "--declarations", "bad-model.toml"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("missing"));
    }
}

mod resolve {
    use super::*;

    #[test]
    fn prints_absolute_paths() {
        let dir = project();
        annotrace(&dir)
            .args(["resolve", "--document", "home.json", "--render", "home.render.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(".heading -> sections.0.heading"))
            .stdout(predicate::str::contains(".name -> sections.0.items.1.name"))
            .stdout(predicate::str::contains(".price -> sections.1.items.0.price"));
    }

    #[test]
    fn flags_missing_targets() {
        let dir = project();
        annotrace(&dir)
            .args(["resolve", "--document", "home.json", "--render", "broken.render.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sections.0.items.2  (not found)"));
    }
}

mod get {
    use super::*;

    #[test]
    fn prints_string_values_bare() {
        let dir = project();
        annotrace(&dir)
            .args(["get", "--document", "home.json", "sections.0.items.1.name"])
            .assert()
            .success()
            .stdout("Fashion\n");
    }

    #[test]
    fn prints_records_as_json() {
        let dir = project();
        annotrace(&dir)
            .args(["get", "--document", "home.json", "sections.1.items.0.image"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"_id\": \"image-watch\""));
    }

    #[test]
    fn missing_path_exits_one() {
        let dir = project();
        annotrace(&dir)
            .args(["get", "--document", "home.json", "sections.0.items.5.name"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("sections.0.items is shorter than that index"));
    }

    #[test]
    fn unparseable_path_is_fatal() {
        let dir = project();
        annotrace(&dir)
            .args(["get", "--document", "home.json", "sections..0"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Invalid path 'sections..0'"));
    }

    #[test]
    fn relative_path_is_fatal() {
        let dir = project();
        annotrace(&dir)
            .args(["get", "--document", "home.json", ".heading"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("is relative"));
    }
}

#[test]
fn completion_script() {
    let dir = project();
    annotrace(&dir)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("annotrace"));
}

#[test]
fn help_lists_commands() {
    let dir = project();
    annotrace(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("completion"));
}
