// This file is part of marsh, a modular POSIX shell.
// Copyright (C) 2025 The marsh developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! End-to-end tests driving the `marsh` binary.

use std::path::Path;
use std::process::{Command, Output};

fn run_in(dir: &Path, script: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_marsh"))
        .arg("-c")
        .arg(script)
        .current_dir(dir)
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .output()
        .expect("cannot run the shell")
}

fn run(script: &str) -> Output {
    let dir = tempfile::tempdir().expect("cannot create temporary directory");
    run_in(dir.path(), script)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn command_overlay_assignments_do_not_persist() {
    let output = run("A=1 B=2 printf '%s-%s\\n' \"$A\" \"$B\"; echo \"<$A><$B>\"");
    assert_eq!(stdout(&output), "1-2\n<><>\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn redirection_writes_file_and_restores_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "echo foo > x; cat x; echo after");
    assert_eq!(stdout(&output), "foo\nafter\n");
    let content = std::fs::read_to_string(dir.path().join("x")).unwrap();
    assert_eq!(content, "foo\n");
}

#[test]
fn and_or_lists() {
    let output = run("false && echo a || echo b");
    assert_eq!(stdout(&output), "b\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn for_loop_runs_body_per_word() {
    let output = run("for i in a b c; do printf %s \"$i\"; done; echo \" $i\"");
    assert_eq!(stdout(&output), "abc c\n");
}

#[test]
fn function_return_status() {
    let output = run("f() { return 7; }; f; echo $?");
    assert_eq!(stdout(&output), "7\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn pipeline_connects_processes() {
    let output = run("printf 'x\\ny\\nz\\n' | wc -l");
    assert_eq!(stdout(&output).trim(), "3");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn errexit_aborts_the_script() {
    let output = run("set -e; false; echo never");
    assert_eq!(stdout(&output), "");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn here_doc_with_quoted_delimiter_is_verbatim() {
    let output = run("cat <<'END'\n$HOME\nEND\n");
    assert_eq!(stdout(&output), "$HOME\n");
}

#[test]
fn here_doc_with_unquoted_delimiter_expands() {
    let output = run("v=inside; cat <<END\nvalue: $v\nEND\n");
    assert_eq!(stdout(&output), "value: inside\n");
}

#[test]
fn command_substitution_strips_trailing_newlines() {
    let output = run("x=$(echo hello); printf '<%s>' \"$x\"");
    assert_eq!(stdout(&output), "<hello>");
}

#[test]
fn command_substitution_sets_exit_status_of_assignment() {
    let output = run("x=$(false); echo $?");
    assert_eq!(stdout(&output), "1\n");
}

#[test]
fn backquote_command_substitution() {
    let output = run("echo `echo nested`");
    assert_eq!(stdout(&output), "nested\n");
}

#[test]
fn subshell_does_not_leak_variables() {
    let output = run("x=outer; (x=inner; echo $x); echo $x");
    assert_eq!(stdout(&output), "inner\nouter\n");
}

#[test]
fn exit_status_propagates_from_exit_builtin() {
    let output = run("exit 42");
    assert_eq!(output.status.code(), Some(42));
}

#[test]
fn exit_status_of_unknown_command_is_127() {
    let output = run("definitely_no_such_command_xyz 2>/dev/null; echo $?");
    assert_eq!(stdout(&output), "127\n");
}

#[test]
fn glob_expands_against_the_file_system() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.rs"), "").unwrap();
    std::fs::write(dir.path().join("b.rs"), "").unwrap();
    std::fs::write(dir.path().join("c.txt"), "").unwrap();
    let output = run_in(dir.path(), "echo *.rs");
    assert_eq!(stdout(&output), "a.rs b.rs\n");
}

#[test]
fn unmatched_glob_survives_literally() {
    let output = run("echo *.nothing_matches_this");
    assert_eq!(stdout(&output), "*.nothing_matches_this\n");
}

#[test]
fn field_splitting_respects_ifs() {
    let output = run("IFS=:; v='a:b:c'; for x in $v; do printf '[%s]' \"$x\"; done; echo");
    assert_eq!(stdout(&output), "[a][b][c]\n");
}

#[test]
fn nounset_rejects_unset_variables() {
    let output = run("set -u; echo $not_set_at_all");
    assert_ne!(output.status.code(), Some(0));

    let output = run("set -u; echo ${not_set:-fallback}");
    assert_eq!(stdout(&output), "fallback\n");
}

#[test]
fn pipefail_selects_rightmost_failure() {
    let output = run("set -o pipefail; false | true; echo $?");
    assert_eq!(stdout(&output), "1\n");

    let output = run("false | true; echo $?");
    assert_eq!(stdout(&output), "0\n");
}

#[test]
fn noclobber_prevents_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("precious"), "keep\n").unwrap();
    let output = run_in(
        dir.path(),
        "set -C; echo new > precious 2>/dev/null; echo $?; cat precious",
    );
    let text = stdout(&output);
    assert!(text.ends_with("keep\n"), "{text:?}");
    assert!(!text.starts_with("0"), "{text:?}");

    let output = run_in(dir.path(), "set -C; echo new >| precious; cat precious");
    assert_eq!(stdout(&output), "new\n");
}

#[test]
fn background_command_reports_pid_and_waits() {
    let output = run("true & wait $!; echo $?");
    assert_eq!(stdout(&output), "0\n");
}

#[test]
fn while_loop_with_break_and_continue() {
    let output = run(
        "i=0; while true; do i=$((i + 1)); \
         if [ $i -eq 2 ]; then continue; fi; \
         if [ $i -ge 4 ]; then break; fi; \
         printf %s $i; done; echo",
    );
    assert_eq!(stdout(&output), "13\n");
}

#[test]
fn case_matches_patterns() {
    let output = run("case hello.rs in *.c) echo c;; *.rs) echo rust;; *) echo other;; esac");
    assert_eq!(stdout(&output), "rust\n");
}

#[test]
fn arithmetic_expansion() {
    let output = run("x=6; echo $((x * 7)) $((1 << 4)) $((10 % 3))");
    assert_eq!(stdout(&output), "42 16 1\n");
}

#[test]
fn signal_termination_maps_to_128_plus_signal() {
    let output = run("kill -9 $$");
    // Killed by SIGKILL: the wrapping shell reports 128 + 9
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(output.status.signal(), Some(9));
    }
    let output = run("sh -c 'kill -9 $$'; echo $?");
    assert_eq!(stdout(&output), "137\n");
}

#[test]
fn trap_runs_on_exit() {
    let output = run("trap 'echo bye' EXIT; echo main");
    assert_eq!(stdout(&output), "main\nbye\n");
}

#[test]
fn dot_script_runs_in_current_environment() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("lib.sh"), "sourced=yes\n").unwrap();
    let output = run_in(dir.path(), ". ./lib.sh; echo $sourced");
    assert_eq!(stdout(&output), "yes\n");
}

#[test]
fn eval_builds_and_runs_commands() {
    let output = run("cmd='echo built'; eval \"$cmd\"");
    assert_eq!(stdout(&output), "built\n");
}

#[test]
fn positional_parameters_and_shift() {
    let output = Command::new(env!("CARGO_BIN_EXE_marsh"))
        .args(["-c", "echo $# $1 $2; shift; echo $# $1", "name", "a", "b"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "2 a b\n1 b\n");
}

#[test]
fn exec_replaces_the_shell() {
    let output = run("exec echo replaced; echo unreached");
    assert_eq!(stdout(&output), "replaced\n");
}

#[test]
fn exec_without_command_makes_redirections_permanent() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "exec > kept; echo to-file");
    assert_eq!(stdout(&output), "");
    let content = std::fs::read_to_string(dir.path().join("kept")).unwrap();
    assert_eq!(content, "to-file\n");
}

#[test]
fn fd_duplication_and_close() {
    let output = run("echo to-stderr >&2 2>/dev/null");
    assert_eq!(stdout(&output), "");

    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "{ echo out; echo err >&2; } > f 2>&1; cat f");
    assert_eq!(stdout(&output), "out\nerr\n");
}

#[test]
fn redirection_order_2_to_1_before_1_to_file() {
    // 2>&1 captures the original stdout because the whole list is
    // pre-saved before any redirection is applied
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), "{ echo out; echo err >&2; } 2>&1 > f");
    assert_eq!(stdout(&output), "err\n");
    let content = std::fs::read_to_string(dir.path().join("f")).unwrap();
    assert_eq!(content, "out\n");
}

#[test]
fn quoted_at_preserves_arguments() {
    let output = Command::new(env!("CARGO_BIN_EXE_marsh"))
        .args(["-c", "for a in \"$@\"; do printf '[%s]' \"$a\"; done; echo", "n", "one two", "three"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "[one two][three]\n");
}

#[test]
fn syntax_error_exits_2() {
    let output = run("if true; then");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn xtrace_prints_expanded_commands() {
    let output = run("set -x; v=world; echo hello $v");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("+ echo hello world"), "{stderr:?}");
}
