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

//! Implementation of simple command semantics.
//!
//! # Outline
//!
//! The execution starts with the expansion of the command words. Next, the
//! [command search](crate::command_search) finds an execution
//! [target](crate::command_search::Target) named by the first field. The
//! target type defines how the command is executed:
//!
//! - A **special built-in** runs in the current environment. Its prefix
//!   assignments persist in the invoking scope, and its redirections and
//!   assignment errors interrupt a non-interactive shell.
//! - A **function** runs its body in a new regular variable context whose
//!   positional parameters are the remaining fields. Prefix assignments go
//!   to a volatile context that is discarded when the call returns.
//! - A **mandatory built-in** runs in the current environment with its
//!   prefix assignments in a volatile, exported context.
//! - An **external utility** runs in a forked subshell. The assignments are
//!   exported in the overlay so they appear in the utility's environment.
//!   If `execve` fails with `ENOEXEC`, the file is re-run as a `/bin/sh`
//!   script.
//!
//! With no command word, assignments persist in the current environment
//! and redirections are performed in a subshell. The exit status is that of
//! the last command substitution, or zero.
//!
//! In every case the redirections and the variable overlay are undone when
//! the command finishes; only a special built-in's assignments (and
//! `exec`'s redirections) survive.

use crate::assign::perform_assignments;
use crate::command_search::search;
use crate::command_search::Target::{Builtin, External, Function};
use crate::expansion::expand_words;
use crate::redir::RedirGuard;
use crate::xtrace::{print as print_xtrace, trace_fields, XTrace};
use crate::Command;
use crate::Handle;
use marsh_env::builtin;
use marsh_env::io::print_error;
use marsh_env::semantics::{Divert, ExitStatus, Field, Result};
use marsh_env::stack::Frame;
use marsh_env::system::Errno;
use marsh_env::variable::{ContextType, Scope, LAST_ARG};
use marsh_env::Env;
use marsh_syntax::parser::is_reserved_word;
use marsh_syntax::syntax;
use marsh_syntax::syntax::{Assign, Redir};
use std::ffi::CStr;
use std::ffi::CString;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

impl Command for syntax::SimpleCommand {
    fn execute(&self, env: &mut Env) -> Result {
        let (fields, exit_status) = match expand_words(env, &self.words) {
            Ok(result) => result,
            Err(error) => return error.handle(env),
        };

        let last_argument = fields.last().map(|field| field.value.clone());

        if let Some(name) = fields.first() {
            // A reserved word in command position is a syntax error, not a
            // command
            if is_reserved_word(&name.value) {
                print_error(env, &format!("`{}` is a reserved word", name.value));
                env.exit_status = ExitStatus::ERROR;
                return env.apply_errexit();
            }

            match search(env, &name.value) {
                Some(Builtin(builtin)) => {
                    execute_builtin(env, builtin, &self.assigns, fields, &self.redirs)
                }
                Some(Function(function)) => {
                    execute_function(env, function, &self.assigns, fields, &self.redirs)
                }
                Some(External { path }) => {
                    execute_external_utility(env, path, &self.assigns, fields, &self.redirs)
                }
                None => {
                    let path = CString::default();
                    execute_external_utility(env, path, &self.assigns, fields, &self.redirs)
                }
            }
        } else {
            let exit_status = exit_status.unwrap_or_default();
            execute_absent_target(env, &self.assigns, &self.redirs, exit_status)
        }?;

        if let Some(last_argument) = last_argument {
            let _ = env
                .variables
                .get_or_new(LAST_ARG, Scope::Global)
                .assign(last_argument);
        }

        env.apply_errexit()
    }
}

fn execute_absent_target(
    env: &mut Env,
    assigns: &[Assign],
    redirs: &[Redir],
    exit_status: ExitStatus,
) -> Result {
    // Perform redirections in a subshell so their effect does not persist
    let redir_exit_status = if redirs.is_empty() {
        exit_status
    } else {
        let redirs = redirs.to_vec();
        let subshell_result = env.run_in_subshell(move |env| {
            let env = &mut RedirGuard::new(env);
            let redir_exit_status = match env.perform_redirs(&redirs) {
                Ok(exit_status) => exit_status,
                Err(error) => {
                    error.handle(env)?;
                    return Break(Divert::Exit(None));
                }
            };
            env.exit_status = redir_exit_status.unwrap_or(exit_status);
            Continue(())
        });
        match subshell_result {
            Ok(exit_status) => exit_status,
            Err(errno) => {
                print_error(
                    env,
                    &format!("cannot start subshell to perform redirection: {errno}"),
                );
                return Break(Divert::Interrupt(Some(ExitStatus::ERROR)));
            }
        }
    };

    match perform_assignments(env, assigns, Scope::Global, false) {
        Ok(assignment_exit_status) => {
            env.exit_status = assignment_exit_status.unwrap_or(redir_exit_status);
            Continue(())
        }
        Err(error) => error.handle(env),
    }
}

fn execute_builtin(
    env: &mut Env,
    builtin: builtin::Builtin,
    assigns: &[Assign],
    mut fields: Vec<Field>,
    redirs: &[Redir],
) -> Result {
    use builtin::Type::*;
    let name = fields.remove(0);
    let is_special = builtin.r#type == Special;

    let mut xtrace = XTrace::from_options(&env.options);
    if let Some(xtrace) = &mut xtrace {
        xtrace.trace_word(&name.value);
        trace_fields(Some(xtrace), &fields);
    }

    let env = &mut env.push_frame(Frame::Builtin { name, is_special });
    let env = &mut RedirGuard::new(env);
    if let Err(error) = env.perform_redirs(redirs) {
        error.handle(env)?;
        return match builtin.r#type {
            Special => Break(Divert::Interrupt(None)),
            Mandatory => Continue(()),
        };
    }

    let result = match builtin.r#type {
        Special => {
            match perform_assignments(env, assigns, Scope::Global, false) {
                Ok(_) => (),
                Err(error) => return error.handle(env),
            }
            print_xtrace(env, xtrace);
            let result = (builtin.execute)(env, fields);
            if result.should_retain_redirs() {
                env.preserve_redirs();
            }
            result
        }
        Mandatory => {
            let mut env = env.push_context(ContextType::Volatile);
            match perform_assignments(&mut env, assigns, Scope::Volatile, true) {
                Ok(_) => (),
                Err(error) => return error.handle(&mut env),
            }
            print_xtrace(&mut env, xtrace);
            (builtin.execute)(&mut env, fields)
        }
    };

    env.exit_status = result.exit_status();
    result.divert()
}

fn execute_function(
    env: &mut Env,
    function: Rc<marsh_env::function::Function>,
    assigns: &[Assign],
    fields: Vec<Field>,
    redirs: &[Redir],
) -> Result {
    let mut xtrace = XTrace::from_options(&env.options);
    trace_fields(xtrace.as_mut(), &fields);

    let env = &mut RedirGuard::new(env);
    if let Err(error) = env.perform_redirs(redirs) {
        return error.handle(env);
    }

    let mut outer = env.push_context(ContextType::Volatile);
    match perform_assignments(&mut outer, assigns, Scope::Volatile, true) {
        Ok(_) => (),
        Err(error) => return error.handle(&mut outer),
    }
    print_xtrace(&mut outer, xtrace);

    let mut inner = outer.push_context(ContextType::Regular);
    inner.variables.positional_params_mut().values =
        fields.into_iter().skip(1).map(|field| field.value).collect();

    let result = function.body.execute(&mut inner);
    match result {
        Break(Divert::Return(exit_status)) => {
            if let Some(exit_status) = exit_status {
                inner.exit_status = exit_status;
            }
            Continue(())
        }
        other => other,
    }
}

fn execute_external_utility(
    env: &mut Env,
    path: CString,
    assigns: &[Assign],
    fields: Vec<Field>,
    redirs: &[Redir],
) -> Result {
    let name = fields[0].clone();

    let mut xtrace = XTrace::from_options(&env.options);
    trace_fields(xtrace.as_mut(), &fields);

    let env = &mut RedirGuard::new(env);
    if let Err(error) = env.perform_redirs(redirs) {
        return error.handle(env);
    }

    let mut env = env.push_context(ContextType::Volatile);
    match perform_assignments(&mut env, assigns, Scope::Volatile, true) {
        Ok(_) => (),
        Err(error) => return error.handle(&mut env),
    }
    print_xtrace(&mut env, xtrace);

    if path.to_bytes().is_empty() {
        print_error(&mut env, &format!("{}: command not found", name.value));
        env.exit_status = ExitStatus::NOT_FOUND;
        return Continue(());
    }

    let args = to_c_strings(fields);
    let envs = env.variables.env_c_strings();
    let subshell_result = env.start_subshell(move |env| {
        let error_name = path.to_string_lossy().into_owned();
        let errno = match env.system.execve(&path, &args, &envs) {
            Ok(infallible) => match infallible {},
            Err(errno) => errno,
        };
        env.exit_status = match errno {
            Errno::ENOEXEC => {
                fall_back_on_sh(env, path.clone(), args, envs);
                ExitStatus::NOEXEC
            }
            Errno::ENOENT | Errno::ENOTDIR => ExitStatus::NOT_FOUND,
            _ => ExitStatus::NOEXEC,
        };
        print_error(env, &format!("cannot execute `{error_name}`: {errno}"));
        Continue(())
    });

    match subshell_result {
        Ok(pid) => match env.wait_for_subshell(pid) {
            Ok(exit_status) => env.exit_status = exit_status,
            Err(errno) => {
                print_error(
                    &mut env,
                    &format!("cannot await utility `{}`: {errno}", name.value),
                );
                env.exit_status = ExitStatus::NOEXEC;
            }
        },
        Err(errno) => {
            print_error(
                &mut env,
                &format!("cannot execute utility `{}`: {errno}", name.value),
            );
            env.exit_status = ExitStatus::NOEXEC;
        }
    }

    Continue(())
}

/// Converts fields to C strings, dropping any that contain a nul byte.
fn to_c_strings(fields: Vec<Field>) -> Vec<CString> {
    fields
        .into_iter()
        .filter_map(|field| CString::new(field.value).ok())
        .collect()
}

/// Re-runs the script with `/bin/sh` after an `ENOEXEC` failure.
fn fall_back_on_sh(env: &mut Env, mut script_path: CString, mut args: Vec<CString>, envs: Vec<CString>) {
    // Prevent the path from being taken for an option
    if script_path.as_bytes().starts_with(b"-") {
        let mut bytes = script_path.into_bytes();
        bytes.splice(0..0, "./".bytes());
        script_path = CString::new(bytes).unwrap_or_default();
    }

    args.insert(1, script_path);

    // Some shells change their behavior depending on args[0].
    // We set it to "sh" for the maximum portability.
    if let Ok(sh) = CString::new("sh") {
        if args.is_empty() {
            args.push(sh);
        } else {
            args[0] = sh;
        }
    }

    let sh_path = CStr::from_bytes_with_nul(b"/bin/sh\0").unwrap();
    let _ = env.system.execve(sh_path, &args, &envs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{echo_builtin, return_builtin, stub_env};
    use marsh_env::option::{self, State};

    #[test]
    fn simple_command_performs_assignment_with_absent_target() {
        let (mut env, _state) = stub_env();
        let command: syntax::SimpleCommand = "a=b".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
        assert_eq!(env.variables.get_scalar("a"), Some("b"));
    }

    #[test]
    fn assignment_after_command_does_not_persist() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        let command: syntax::SimpleCommand = "a=1 echo".parse().unwrap();
        command.execute(&mut env);
        assert_eq!(env.variables.get("a"), None);
    }

    #[test]
    fn special_builtin_assignment_persists() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        let command: syntax::SimpleCommand = "a=1 return -n 0".parse().unwrap();
        command.execute(&mut env);
        assert_eq!(env.variables.get_scalar("a"), Some("1"));
    }

    #[test]
    fn simple_command_handles_assignment_error_with_absent_target() {
        let (mut env, state) = stub_env();
        let mut variable = env.variables.get_or_new("a", Scope::Global);
        variable.assign("").unwrap();
        variable.make_read_only();

        let command: syntax::SimpleCommand = "a=b".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Break(Divert::Interrupt(Some(ExitStatus::FAILURE))));
        assert_ne!(state.borrow().stderr(), "");
    }

    #[test]
    fn simple_command_returns_exit_status_from_builtin_without_divert() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        let command: syntax::SimpleCommand = "return -n 93".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus(93));
    }

    #[test]
    fn simple_command_returns_exit_status_from_builtin_with_divert() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        let command: syntax::SimpleCommand = "return 37".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Break(Divert::Return(Some(ExitStatus(37)))));
    }

    #[test]
    fn simple_command_applies_redirections_to_builtin() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        let command: syntax::SimpleCommand = "echo hello >file".parse().unwrap();
        command.execute(&mut env);
        assert_eq!(state.borrow().file_content("file").unwrap(), b"hello\n");
        // Standard output is restored afterwards
        assert_eq!(state.borrow().stdout(), "");
    }

    #[test]
    fn simple_command_skips_running_builtin_on_redirection_error() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        let command: syntax::SimpleCommand = "echo X <no/such/file >out".parse().unwrap();

        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::FAILURE);
        assert_eq!(state.borrow().file_content("out"), None);
        assert_eq!(state.borrow().stdout(), "");
    }

    #[test]
    fn special_builtin_interrupts_on_redirection_error() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        let command: syntax::SimpleCommand = "return <no/such/file".parse().unwrap();

        let result = command.execute(&mut env);
        assert_eq!(result, Break(Divert::Interrupt(Some(ExitStatus::FAILURE))));
    }

    #[test]
    fn command_not_found_exits_127() {
        let (mut env, state) = stub_env();
        let command: syntax::SimpleCommand = "no_such_command".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::NOT_FOUND);
        assert!(state.borrow().stderr().contains("command not found"));
    }

    #[test]
    fn reserved_word_in_command_position_is_an_error() {
        let (mut env, state) = stub_env();
        env.variables
            .get_or_new("w", Scope::Global)
            .assign("then")
            .unwrap();
        let command: syntax::SimpleCommand = "$w".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::ERROR);
        assert!(state.borrow().stderr().contains("reserved word"));
    }

    #[test]
    fn function_call_with_return() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        let definition: syntax::Command = "f() { return 7; }".parse().unwrap();
        definition.execute(&mut env);

        let command: syntax::SimpleCommand = "f".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus(7));
    }

    #[test]
    fn function_receives_positional_parameters() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        let definition: syntax::Command = r#"f() { echo $# "$1" "$2"; }"#.parse().unwrap();
        definition.execute(&mut env);

        let command: syntax::SimpleCommand = "f one two".parse().unwrap();
        command.execute(&mut env);
        assert_eq!(state.borrow().stdout(), "2 one two\n");
    }

    #[test]
    fn positional_parameters_restored_after_function_call() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.variables.positional_params_mut().values = vec!["outer".to_string()];
        let definition: syntax::Command = "f() { echo in; }".parse().unwrap();
        definition.execute(&mut env);

        let command: syntax::SimpleCommand = "f inner args".parse().unwrap();
        command.execute(&mut env);
        assert_eq!(env.variables.positional_params().values, ["outer"]);
    }

    #[test]
    fn last_argument_variable_is_updated() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        let command: syntax::SimpleCommand = "echo one two".parse().unwrap();
        command.execute(&mut env);
        assert_eq!(env.variables.get_scalar("_"), Some("two"));
    }

    #[test]
    fn errexit_on_failing_builtin() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        env.options.set(option::ErrExit, State::On);
        let command: syntax::SimpleCommand = "return -n 1".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Break(Divert::Exit(None)));
        assert_eq!(env.exit_status, ExitStatus(1));
    }

    #[test]
    fn empty_expansion_is_no_op_with_status_zero() {
        let (mut env, _state) = stub_env();
        env.exit_status = ExitStatus(42);
        let command: syntax::SimpleCommand = "$unset".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
    }

    #[test]
    fn variables_are_exported_to_external_commands() {
        // Verified here only at the level of the environment vector
        let (mut env, _state) = stub_env();
        env.variables
            .get_or_new("local", Scope::Global)
            .assign("1")
            .unwrap();
        let mut exported = env.variables.get_or_new("exported", Scope::Global);
        exported.assign("2").unwrap();
        exported.export(true);

        let envs = env.variables.env_c_strings();
        assert_eq!(envs, [CString::new("exported=2").unwrap()]);
    }
}
