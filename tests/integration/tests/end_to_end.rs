//! End-to-end tests of the rspectral binary
//!
//! Runs the built binary with the fixture bundle of `rspectral_core`.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("Failed to find workspace root")
        .to_path_buf()
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/project")
}

fn bundle() -> PathBuf {
    workspace_root().join("crates/rspectral_core/tests/fixtures/bundle.js")
}

fn rspectral_cmd() -> Command {
    Command::new(workspace_root().join("target/debug/rspectral"))
}

mod project_config {
    use super::*;

    fn project() -> assert_fs::TempDir {
        let dir = assert_fs::TempDir::new().unwrap();
        dir.copy_from(fixtures_dir(), &["*.yaml", ".spectral.yaml"])
            .unwrap();
        dir.child(".rspectral.json")
            .write_str(
                &serde_json::json!({
                    "documents": ["./petstore.yaml"],
                    "ruleset": "./.spectral.yaml",
                    "dist": bundle(),
                    "timeoutMs": 30000
                })
                .to_string(),
            )
            .unwrap();
        dir
    }

    #[test]
    fn discovers_config_in_current_directory() {
        let dir = project();

        rspectral_cmd()
            .current_dir(dir.path())
            .arg("lint")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("petstore.yaml:"))
            .stdout(predicate::str::contains("error tag-description"))
            .stdout(predicate::str::contains("(tags.0)"))
            .stdout(predicate::str::contains("warning info-contact"));
    }

    #[test]
    fn explicit_config_is_used_from_elsewhere() {
        let dir = project();
        let elsewhere = assert_fs::TempDir::new().unwrap();

        rspectral_cmd()
            .current_dir(elsewhere.path())
            .arg("--config")
            .arg(dir.child(".rspectral.json").path())
            .arg("lint")
            .arg("--cwd")
            .arg(dir.path())
            .arg("--format")
            .arg("json")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("\"code\": \"tag-description\""));
    }

    #[test]
    fn command_line_documents_override_config() {
        let dir = project();
        dir.child("clean.yaml")
            .write_str("openapi: 3.0.3\ninfo:\n  title: Clean\n  contact:\n    name: Ops\n")
            .unwrap();

        rspectral_cmd()
            .current_dir(dir.path())
            .args(["lint", "./clean.yaml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 0 problems"));
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        dir.child(".rspectral.json")
            .write_str(r#"{ "timeoutMs": 0 }"#)
            .unwrap();

        rspectral_cmd()
            .current_dir(dir.path())
            .args(["lint", "./openapi.yaml"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("timeoutMs must be greater"));
    }
}

mod driver_script {
    use super::*;

    #[test]
    fn custom_script_output_is_used() {
        let dir = assert_fs::TempDir::new().unwrap();
        let script = dir.child("script.js");
        script
            .write_str(
                r#"require('./dist/built.js');
Promise.resolve(JSON.stringify([{ code: 'custom', path: [], message: 'from script',
    severity: 2, range: { start: { line: 0, character: 0 }, end: { line: 0, character: 0 } } }]));"#,
            )
            .unwrap();

        rspectral_cmd()
            .arg("lint")
            .arg("--dist")
            .arg(bundle())
            .arg("--script")
            .arg(script.path())
            .arg("--cwd")
            .arg(fixtures_dir())
            .arg("./petstore.yaml")
            .assert()
            .success()
            .stdout(predicate::str::contains("<ruleset>:"))
            .stdout(predicate::str::contains("1:1 info custom from script ()"));
    }

    #[test]
    fn endless_bundle_times_out() {
        let dir = assert_fs::TempDir::new().unwrap();
        let dist = dir.child("spin.js");
        dist.write_str(
            "exports.lint = new Promise(function () { (function spin() { Promise.resolve().then(spin); })(); });",
        )
        .unwrap();

        rspectral_cmd()
            .arg("lint")
            .arg("--dist")
            .arg(dist.path())
            .args(["--timeout", "1", "./petstore.yaml"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("timed out"));
    }
}
