//! End-to-end tests for the `llirc` binary with a variety of inputs and emission options.

use std::io::Write;
use std::process::{Command, Output, Stdio};

macro_rules! assembly_test_suite {
    ($name:ident, $directory:expr, [$($arg:expr),*]) => {
        #[test]
        fn $name() {
            insta::with_settings!({
                description => format!("assembly test suite for {}", stringify!($name)),
                snapshot_path => concat!(env!("CARGO_MANIFEST_DIR"), "/tests/snapshots/", stringify!($name)),
            }, {
                insta::glob!(concat!($directory, "/*.ll"), |path| {
                    let mut cmd = llirc();
                    $(cmd.arg($arg);)*
                    let relative = path.strip_prefix(env!("CARGO_MANIFEST_DIR"))
                        .expect("failed to build relative path from Cargo.toml");
                    insta_cmd::assert_cmd_snapshot!(cmd.arg(relative));
                });
            })
        }
    }
}

assembly_test_suite!(check, "data/ir", []);
assembly_test_suite!(ir, "data/ir", ["--emit-ir"]);

fn llirc() -> Command {
    Command::new(insta_cmd::get_cargo_bin("llirc"))
}

fn data(name: &str) -> String {
    format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn run(cmd: &mut Command) -> (Output, String, String) {
    let output = cmd.output().expect("failed to run llirc");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    (output, stdout, stderr)
}

#[test]
fn test_emit_ir_for_queried_function() {
    let (output, stdout, stderr) = run(llirc()
        .arg("--emit-ir")
        .arg("--emit-query")
        .arg("ir.fn.add")
        .arg(data("ir/add.ll")));
    assert!(output.status.success(), "{}", stderr);
    insta::assert_snapshot!(stdout, @r"
    define @add(Value('a', i32), Value('b', i32)) -> i32 {
      block 'entry' preds [] {
        BinOp('add', Value('sum', i32), Value('a', i32), Value('b', i32), nsw=True)
        Ret('ret', None, Value('sum', i32))
      }
    }
    ");
}

#[test]
fn test_emit_ir_for_whole_module() {
    let (output, stdout, stderr) = run(llirc().arg("--emit-ir").arg(data("factorial.ll")));
    assert!(output.status.success(), "{}", stderr);
    assert!(stdout.starts_with("module {\n  define @factorial_req(Value('%0', i32)) -> i32 {\n"));
    assert!(stdout.contains("    block '%13' preds ['%7', '%6'] {\n"));
    assert!(stdout.contains(
        "      Br('br', None, Value('%5', i1), Value('%7', label), Value('%6', label))\n"
    ));
}

#[test]
fn test_emit_ir_is_deterministic() {
    let (_, first, _) = run(llirc().arg("--emit-ir").arg(data("factorial.ll")));
    let (_, second, _) = run(llirc().arg("--emit-ir").arg(data("factorial.ll")));
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_emit_records() {
    let (output, stdout, stderr) = run(llirc().arg("--emit-records").arg(data("ir/add.ll")));
    assert!(output.status.success(), "{}", stderr);
    assert!(stdout.contains("opcode_name: \"add\""));
    assert!(stdout.contains("opcode_name: \"ret\""));
}

#[test]
fn test_reads_from_stdin() {
    let mut child = llirc()
        .arg("--emit-ir")
        .arg("--emit-query")
        .arg("ir.fn.twice")
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn llirc");
    let source = std::fs::read_to_string(data("ir/add.ll")).expect("failed to read test data");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(source.as_bytes())
        .expect("failed to write to stdin");
    let output = child.wait_with_output().expect("failed to wait for llirc");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.starts_with("define @twice(Value('a', i32)) -> i32 {\n"));
    assert!(stdout.contains("Call('call', Value('r', i32), Value('add', i32 (i32, i32)), [Value('a', i32), Value('a', i32)]"));
}

#[test]
fn test_missing_terminator_fails() {
    let (output, _, stderr) = run(llirc().arg(data("invalid/missing_terminator.ll")));
    assert!(!output.status.success());
    assert!(stderr.contains("block entry in @f does not end with a terminator"));
}

#[test]
fn test_invalid_query_fails() {
    let (output, _, stderr) = run(llirc()
        .arg("--emit-ir")
        .arg("--emit-query")
        .arg("ir.block.entry")
        .arg(data("ir/add.ll")));
    assert!(!output.status.success());
    assert!(stderr.contains("failed to parse emit query 'ir.block.entry'"));
}

#[test]
fn test_unknown_function_query_fails() {
    let (output, _, stderr) = run(llirc()
        .arg("--emit-ir")
        .arg("--emit-query")
        .arg("ir.fn.missing")
        .arg(data("ir/add.ll")));
    assert!(!output.status.success());
    assert!(stderr.contains("emit query names function @missing"));
}

#[test]
fn test_missing_input_file_fails() {
    let (output, _, _) = run(llirc().arg(data("does_not_exist.ll")));
    assert!(!output.status.success());
}
