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

//! Execution of the while and until loops

use super::evaluate_condition;
use crate::command::Command;
use marsh_env::semantics::{Divert, ExitStatus, Result};
use marsh_env::stack::Frame;
use marsh_env::Env;
use marsh_syntax::syntax::List;
use std::ops::ControlFlow::{Break, Continue};

/// Executes the while loop.
pub fn execute_while(env: &mut Env, condition: &List, body: &List) -> Result {
    execute_loop(env, condition, body, true)
}

/// Executes the until loop.
pub fn execute_until(env: &mut Env, condition: &List, body: &List) -> Result {
    execute_loop(env, condition, body, false)
}

fn execute_loop(env: &mut Env, condition: &List, body: &List, while_loop: bool) -> Result {
    let env = &mut env.push_frame(Frame::Loop);
    let mut exit_status = ExitStatus::SUCCESS;
    loop {
        if evaluate_condition(env, condition)? != while_loop {
            break;
        }
        match body.execute(env) {
            Continue(()) => exit_status = env.exit_status,
            Break(Divert::Break { count: 0 }) => break,
            Break(Divert::Break { count }) => return Break(Divert::Break { count: count - 1 }),
            Break(Divert::Continue { count: 0 }) => {
                exit_status = env.exit_status;
                continue;
            }
            Break(Divert::Continue { count }) => {
                return Break(Divert::Continue { count: count - 1 })
            }
            other => return other,
        }
    }
    env.exit_status = exit_status;
    Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{break_builtin, continue_builtin, echo_builtin, return_builtin, stub_env};
    use marsh_syntax::syntax::CompoundCommand;

    #[test]
    fn while_loop_runs_until_condition_fails() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("test3", crate::tests::countdown_builtin());
        let command: CompoundCommand = "while test3; do echo tick; done".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(state.borrow().stdout(), "tick\ntick\ntick\n");
    }

    #[test]
    fn while_loop_with_false_condition_runs_zero_times() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        env.exit_status = ExitStatus(13);
        let command: CompoundCommand = "while return -n 1; do echo x; done".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
        assert_eq!(state.borrow().stdout(), "");
    }

    #[test]
    fn until_loop_runs_while_condition_fails() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("test3", crate::tests::countdown_builtin());
        let command: CompoundCommand = "until ! test3; do echo tock; done".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(state.borrow().stdout(), "tock\ntock\ntock\n");
    }

    #[test]
    fn break_terminates_the_loop() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("break", break_builtin());
        env.builtins.insert("return", return_builtin());
        let command: CompoundCommand =
            "while return -n 0; do echo once; break; echo unreached; done"
                .parse()
                .unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(state.borrow().stdout(), "once\n");
    }

    #[test]
    fn continue_skips_rest_of_body() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("break", break_builtin());
        env.builtins.insert("continue", continue_builtin());
        env.builtins.insert("test3", crate::tests::countdown_builtin());
        let command: CompoundCommand =
            "while test3; do echo seen; continue; echo unreached; done"
                .parse()
                .unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(state.borrow().stdout(), "seen\nseen\nseen\n");
    }

    #[test]
    fn multi_level_break_propagates() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("break", break_builtin());
        env.builtins.insert("return", return_builtin());
        let command: CompoundCommand =
            "while return -n 0; do while return -n 0; do break 2; done; echo unreached; done"
                .parse()
                .unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(state.borrow().stdout(), "");
    }

    #[test]
    fn loop_variable_remains_after_loop() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("test3", crate::tests::countdown_builtin());
        let command: CompoundCommand = "while test3; do x=in; done".parse().unwrap();
        command.execute(&mut env);
        assert_eq!(env.variables.get_scalar("x"), Some("in"));
    }
}
