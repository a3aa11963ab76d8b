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

//! Eval built-in.

use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::Env;
use marsh_semantics::runner::read_eval_loop;
use std::ops::ControlFlow::{Break, Continue};

/// Entry point of the eval built-in.
///
/// The arguments are joined with spaces and executed as a shell program in
/// the current environment. Diverts from the evaluated program (such as
/// `return`) propagate to the caller of `eval`.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let program = args
        .iter()
        .map(|field| &field.value[..])
        .collect::<Vec<_>>()
        .join(" ");
    if program.trim().is_empty() {
        return Result::SUCCESS;
    }

    match read_eval_loop(env, &program) {
        Continue(()) => Result::new(env.exit_status),
        Break(divert) => Result::with_exit_status_and_divert(
            divert.exit_status().unwrap_or(env.exit_status),
            Break(divert),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;
    use marsh_env::semantics::Divert;

    #[test]
    fn evaluates_joined_arguments() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["echo", "a", "b"]));
        assert_eq!(state.borrow().stdout(), "a b\n");
    }

    #[test]
    fn empty_arguments_succeed() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
    }

    #[test]
    fn exit_status_comes_from_evaluated_program() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["false"]));
        // The result of the builtin carries the evaluated status
        let result = main(&mut env, Field::fields(["false"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }

    #[test]
    fn syntax_error_diverts() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["if", "true"]));
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
        assert_eq!(
            result.divert(),
            Break(Divert::Interrupt(Some(ExitStatus::ERROR)))
        );
    }

    #[test]
    fn variables_assigned_in_eval_persist() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["x=42"]));
        assert_eq!(env.variables.get_scalar("x"), Some("42"));
    }
}
