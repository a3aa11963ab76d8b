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

//! Exec built-in.
//!
//! Without operands, `exec` makes the redirections applied to it permanent
//! in the current shell environment. With operands, the named utility
//! replaces the shell process without creating a child; the shell's traps
//! are restored to their original dispositions first.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{Divert, ExitStatus, Field};
use marsh_env::Env;
use marsh_semantics::command_search::search_path;
use std::ffi::CString;
use std::ops::ControlFlow::Break;

/// Entry point of the exec built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let Some(name) = args.first() else {
        let mut result = Result::SUCCESS;
        result.retain_redirs();
        return result;
    };

    let path = if name.value.contains('/') {
        CString::new(name.value.clone()).ok()
    } else {
        search_path(env, &name.value)
    };
    let Some(path) = path else {
        let result = report_error(
            env,
            "exec",
            &format!("{}: command not found", name.value),
            ExitStatus::NOT_FOUND,
        );
        return exec_failure(env, result.exit_status());
    };

    let c_args: Vec<CString> = args
        .iter()
        .filter_map(|field| CString::new(field.value.clone()).ok())
        .collect();
    let envs = env.variables.env_c_strings();

    env.traps.restore_origin_dispositions(&mut env.system);
    let errno = match env.system.execve(&path, &c_args, &envs) {
        Ok(infallible) => match infallible {},
        Err(errno) => errno,
    };

    let exit_status = match errno {
        marsh_env::system::Errno::ENOENT | marsh_env::system::Errno::ENOTDIR => {
            ExitStatus::NOT_FOUND
        }
        _ => ExitStatus::NOEXEC,
    };
    let result = report_error(
        env,
        "exec",
        &format!("cannot execute `{}`: {errno}", name.value),
        exit_status,
    );
    exec_failure(env, result.exit_status())
}

/// A failed `exec` exits a non-interactive shell.
fn exec_failure(env: &Env, exit_status: ExitStatus) -> Result {
    if env.is_interactive() {
        Result::new(exit_status)
    } else {
        Result::with_exit_status_and_divert(exit_status, Break(Divert::Exit(Some(exit_status))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn without_operands_retains_redirections() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert!(result.should_retain_redirs());
    }

    #[test]
    fn unknown_command_exits_non_interactive_shell() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["no_such_cmd"]));
        assert_eq!(result.exit_status(), ExitStatus::NOT_FOUND);
        assert_eq!(
            result.divert(),
            Break(Divert::Exit(Some(ExitStatus::NOT_FOUND)))
        );
    }

    #[test]
    fn exec_failure_in_interactive_shell_continues() {
        use marsh_env::option::{Interactive, State};
        let (mut env, _state) = builtin_env();
        env.options.set(Interactive, State::On);
        let result = main(&mut env, Field::fields(["no_such_cmd"]));
        assert_eq!(result.exit_status(), ExitStatus::NOT_FOUND);
        assert_eq!(result.divert(), std::ops::ControlFlow::Continue(()));
    }
}
