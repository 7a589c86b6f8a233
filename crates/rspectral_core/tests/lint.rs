//! End-to-end lint runs against the fixture bundle.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rspectral_core::{
    CancellationToken, LintError, LintOption, MemoryFs, Output, Severity, default_before_module,
    lint, with_after_module, with_before_module, with_cancellation, with_dist, with_fs,
    with_script, with_timeout, with_working_directory,
};

const BUNDLE: &[u8] = include_bytes!("fixtures/bundle.js");
const TESTDATA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/testdata");

const SPIN_BUNDLE: &str = r#"
exports.lint = new Promise(function () {
    (function spin() { Promise.resolve().then(spin); })();
});
exports.formatOutput = function () { return '[]'; };
"#;

fn lint_testdata(documents: &[&str], extra: Vec<LintOption>) -> Result<Output, LintError> {
    let mut options = vec![with_dist(BUNDLE), with_working_directory(TESTDATA)];
    options.extend(extra);
    lint(documents, "./.spectral.yaml", options)
}

#[test]
fn test_valid_document_has_no_violations() {
    let output = lint_testdata(&["./openapi.yaml"], vec![]).unwrap();
    assert_eq!(output, Vec::new());
}

#[test]
fn test_missing_contact_is_reported() {
    let output = lint_testdata(&["./openapi-without-contact.yaml"], vec![]).unwrap();

    let source = format!("{TESTDATA}/openapi-without-contact.yaml");
    let codes: Vec<_> = output.iter().map(|v| v.code.as_str()).collect();
    assert_eq!(codes, vec!["info-contact", "tag-description"]);

    let contact = &output[0];
    assert_eq!(contact.source, source);
    assert_eq!(contact.path, vec!["info"]);
    assert_eq!(contact.severity, Severity::Error);
    assert_eq!(contact.range.start.line, 1);

    let tag = &output[1];
    assert_eq!(tag.path, vec!["tags", "1"]);
    assert_eq!(tag.severity, Severity::Warning);
    assert!(rspectral_core::has_errors(&output));
}

#[test]
fn test_missing_document_rejects() {
    let err = lint_testdata(&["./missing.yaml"], vec![]).unwrap_err();
    match err {
        LintError::PromiseRejected(reason) => {
            assert!(reason.contains("ENOENT"), "{reason}");
            assert!(reason.contains("missing.yaml"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_documents_from_virtual_fs() {
    let fs = MemoryFs::new()
        .with_file(
            "testdata/.spectral.yaml",
            include_str!("fixtures/testdata/.spectral.yaml"),
        )
        .unwrap()
        .with_file(
            "testdata/openapi.yaml",
            include_str!("fixtures/testdata/openapi-without-contact.yaml"),
        )
        .unwrap();

    let output = lint(
        &["./testdata/openapi.yaml"],
        "./testdata/.spectral.yaml",
        [
            with_dist(BUNDLE),
            with_working_directory("/virtual/project"),
            with_fs(fs),
        ],
    )
    .unwrap();

    assert_eq!(output.len(), 2);
    assert_eq!(output[0].source, "/virtual/project/testdata/openapi.yaml");
}

#[test]
fn test_virtual_fs_falls_back_to_disk() {
    let fs = MemoryFs::new()
        .with_file("unrelated.yaml", "openapi: 3.0.3\n")
        .unwrap();

    let output = lint_testdata(&["./openapi.yaml"], vec![with_fs(fs)]).unwrap();
    assert!(output.is_empty());
}

#[test]
fn test_failing_option_skips_the_run() {
    let calls = Rc::new(RefCell::new(0));
    let seen = Rc::clone(&calls);

    let err = lint_testdata(
        &["./openapi.yaml"],
        vec![
            LintOption::new(|_| Err(LintError::config("bad option"))),
            with_after_module(move |_name, _ctx, _registry, _require| {
                *seen.borrow_mut() += 1;
                Ok(())
            }),
        ],
    )
    .unwrap_err();

    assert!(matches!(err, LintError::Config(ref m) if m == "bad option"));
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn test_after_hook_sees_every_module() {
    let names = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&names);

    lint_testdata(
        &["./openapi.yaml"],
        vec![with_after_module(move |name, _ctx, _registry, _require| {
            seen.borrow_mut().push(name.to_string());
            Ok(())
        })],
    )
    .unwrap();

    let names = names.borrow();
    assert_eq!(names.len(), rspectral_core::enables().len());
    assert_eq!(names.first().map(String::as_str), Some("util"));
    assert_eq!(names.last().map(String::as_str), Some("events"));
}

#[test]
fn test_before_hook_failure_is_reported() {
    let fallback = default_before_module(TESTDATA, None);
    let err = lint_testdata(
        &["./openapi.yaml"],
        vec![with_before_module(move |enable, ctx, registry, require| {
            if enable.name == "buffer" {
                return Err("buffer disabled".into());
            }
            fallback(enable, ctx, registry, require)
        })],
    )
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to run BeforeModule hook for 'buffer': buffer disabled"
    );
}

#[test]
fn test_bundle_exception_shows_source_line() {
    let err = lint_testdata(
        &["./openapi.yaml"],
        vec![with_dist(
            b"exports.lint = Promise.resolve();\nthrow new Error('broken bundle');\n".as_slice(),
        )],
    )
    .unwrap_err();

    let LintError::Evaluate(err) = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(err.exception(), "Error: broken bundle");
    assert_eq!(err.source_line(), Some("throw new Error('broken bundle');"));
    assert!(err.to_string().contains("\n...\n"));
}

#[test]
fn test_unresolvable_require_names_module() {
    let err = lint_testdata(
        &["./openapi.yaml"],
        vec![with_dist(b"require('left-pad');".as_slice())],
    )
    .unwrap_err();

    let LintError::Evaluate(err) = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(err.unresolved_module(), Some("left-pad"));
    assert!(err.to_string().contains("failed to import 'left-pad'"));
}

#[test]
fn test_non_string_result_is_rejected() {
    let err = lint_testdata(&["./openapi.yaml"], vec![with_script("require('./dist/built.js'); 42")])
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "invalid value type of lint result 'number': unknown return"
    );
}

#[test]
fn test_invalid_output_fails_to_decode() {
    let err = lint_testdata(&["./openapi.yaml"], vec![with_script("'not json'")]).unwrap_err();
    assert!(matches!(err, LintError::Decode(_)));
}

#[test]
fn test_promise_that_never_settles_stalls() {
    let err = lint_testdata(
        &["./openapi.yaml"],
        vec![with_dist(
            b"exports.lint = new Promise(function () {}); exports.formatOutput = String;".as_slice(),
        )],
    )
    .unwrap_err();

    assert!(matches!(err, LintError::Stalled));
}

#[test]
fn test_endless_jobs_time_out() {
    let timeout = Duration::from_millis(200);
    let err = lint_testdata(
        &["./openapi.yaml"],
        vec![with_dist(SPIN_BUNDLE.as_bytes()), with_timeout(timeout)],
    )
    .unwrap_err();

    assert!(matches!(err, LintError::Timeout(t) if t == timeout));
}

#[test]
fn test_busy_bundle_is_interrupted() {
    let err = lint_testdata(
        &["./openapi.yaml"],
        vec![
            with_dist(b"while (true) {}".as_slice()),
            with_timeout(Duration::from_millis(200)),
        ],
    )
    .unwrap_err();

    assert!(matches!(err, LintError::Timeout(_)), "{err}");
}

#[test]
fn test_cancellation_stops_the_run() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        canceller.cancel();
    });

    let err = lint_testdata(
        &["./openapi.yaml"],
        vec![with_dist(SPIN_BUNDLE.as_bytes()), with_cancellation(token)],
    )
    .unwrap_err();

    handle.join().unwrap();
    assert!(matches!(err, LintError::Cancelled));
}
