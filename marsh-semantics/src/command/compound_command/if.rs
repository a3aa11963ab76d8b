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

//! Execution of the if conditional construct

use super::evaluate_condition;
use crate::command::Command;
use marsh_env::semantics::{ExitStatus, Result};
use marsh_env::Env;
use marsh_syntax::syntax::{ElifThen, List};
use std::ops::ControlFlow::Continue;

/// Executes the if conditional construct.
pub fn execute(
    env: &mut Env,
    condition: &List,
    body: &List,
    elifs: &[ElifThen],
    r#else: &Option<List>,
) -> Result {
    if evaluate_condition(env, condition)? {
        return body.execute(env);
    }

    for elif in elifs {
        if evaluate_condition(env, &elif.condition)? {
            return elif.body.execute(env);
        }
    }

    if let Some(r#else) = r#else {
        r#else.execute(env)
    } else {
        env.exit_status = ExitStatus::SUCCESS;
        Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{echo_builtin, return_builtin, stub_env};
    use marsh_syntax::syntax::CompoundCommand;

    #[test]
    fn then_branch_on_success() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        let command: CompoundCommand =
            "if return -n 0; then echo yes; else echo no; fi".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(state.borrow().stdout(), "yes\n");
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
    }

    #[test]
    fn else_branch_on_failure() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        let command: CompoundCommand =
            "if return -n 1; then echo yes; else echo no; fi".parse().unwrap();
        command.execute(&mut env);
        assert_eq!(state.borrow().stdout(), "no\n");
    }

    #[test]
    fn elif_branches_are_tried_in_order() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        let command: CompoundCommand =
            "if return -n 1; then echo a; elif return -n 1; then echo b; \
             elif return -n 0; then echo c; else echo d; fi"
                .parse()
                .unwrap();
        command.execute(&mut env);
        assert_eq!(state.borrow().stdout(), "c\n");
    }

    #[test]
    fn no_branch_taken_yields_success() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        let command: CompoundCommand = "if return -n 9; then return -n 9; fi".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
    }

    #[test]
    fn condition_does_not_trigger_errexit() {
        use marsh_env::option::{ErrExit, State};
        let (mut env, _state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        env.options.set(ErrExit, State::On);
        let command: CompoundCommand = "if return -n 1; then echo y; fi".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
    }
}
