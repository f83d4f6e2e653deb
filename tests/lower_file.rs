//! Lowering methods read from disk.

use std::io::Write;

use sprig::{PipelineError, lower_file};
use sprig_rationalize::{RationalizeErrorKind, TargetConfig};
use tempfile::NamedTempFile;

fn method_file(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(source.as_bytes()).expect("write method");
    file
}

#[test]
fn lowers_a_method_file() {
    let file = method_file(
        r#"; one store, one discarded call
(method
  (local V0 int)
  (block BB0
    (stmt 0x0 (assign (lcl_var V0) (add:int (lcl_var V0) (cns_int:int 1))))
    (stmt 0x8 (call:int "Tick"))))
"#,
    );
    let lowered = lower_file(file.path(), &TargetConfig::new(8)).expect("lower");
    insta::assert_snapshot!(lowered.lir, @r#"
    BB0:
      il_offset.void 0x0
      t0 = lcl_var.int V0
      t1 = cns_int.int 1
      t2 = add.int t0 t1
      store_lcl_var.int V0 t2 !def
      il_offset.void 0x8
      t3 = call.int "Tick" !unused
    "#);
    assert_eq!(lowered.stats.blocks, 1);
    assert_eq!(lowered.stats.statements, 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = lower_file(&dir.path().join("absent.hir"), &TargetConfig::new(8)).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
}

#[test]
fn syntax_errors_report_an_offset() {
    let file = method_file("(method (block BB0 (stmt (frobnicate:int))))");
    let err = lower_file(file.path(), &TargetConfig::new(8)).unwrap_err();
    let PipelineError::Parse(parse) = &err else {
        panic!("expected a parse error, got {err}");
    };
    assert!(parse.message.contains("unknown operator `frobnicate`"));
    assert_eq!(parse.offset, 25);
}

#[test]
fn unsupported_shapes_are_internal_errors() {
    let file = method_file(
        "(method
           (local V0 int)
           (block BB0 (stmt (return (qmark:int (lcl_var V0) (colon:int (lcl_var V0) (cns_int:int 2)))))))",
    );
    let err = lower_file(file.path(), &TargetConfig::new(8)).unwrap_err();
    let PipelineError::Rationalize(inner) = &err else {
        panic!("expected a rationalize error, got {err}");
    };
    assert!(matches!(inner.kind(), RationalizeErrorKind::UnexpectedQmark(_)));
    assert!(err.to_string().starts_with("internal compiler error: "));
}
