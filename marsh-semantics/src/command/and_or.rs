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

//! Implementation of the and-or list semantics.

use super::Command;
use marsh_env::semantics::Result;
use marsh_env::stack::Frame;
use marsh_env::Env;
use marsh_syntax::syntax::AndOr::{AndThen, OrElse};
use marsh_syntax::syntax::{AndOr, AndOrList, Pipeline};
use std::ops::ControlFlow::Continue;

/// Executes the and-or list.
///
/// The `&&` operator first executes the left-hand-side pipeline, and if and
/// only if the exit status is zero, executes the right-hand-side. The `||`
/// operator works similarly but runs the right-hand-side if and only if the
/// left-hand-side exit status is non-zero. The operators are
/// left-associative and have equal precedence.
///
/// The exit status of the and-or list is that of the last executed
/// pipeline. [`Frame::Condition`] is on the stack while every pipeline but
/// the last executes, so a failing left-hand side does not trigger
/// `errexit`.
impl Command for AndOrList {
    fn execute(&self, env: &mut Env) -> Result {
        if self.rest.is_empty() {
            return self.first.execute(env);
        }

        // Execute all pipelines but the last in a condition context
        {
            let mut env = env.push_frame(Frame::Condition);
            self.first.execute(&mut env)?;
            for (and_or, pipeline) in &self.rest[..self.rest.len() - 1] {
                execute_conditional_pipeline(&mut env, *and_or, pipeline)?;
            }
        }

        let (and_or, pipeline) = self.rest.last().unwrap();
        execute_conditional_pipeline(env, *and_or, pipeline)
    }
}

fn execute_conditional_pipeline(env: &mut Env, and_or: AndOr, pipeline: &Pipeline) -> Result {
    let success = env.exit_status.is_successful();
    let run = match and_or {
        AndThen => success,
        OrElse => !success,
    };
    if run {
        pipeline.execute(env)
    } else {
        Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{echo_builtin, return_builtin, stub_env};
    use marsh_env::option::{ErrExit, State};
    use marsh_env::semantics::{Divert, ExitStatus};
    use std::ops::ControlFlow::Break;

    #[test]
    fn true_and_true() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        let list: AndOrList = "echo one && echo two".parse().unwrap();

        let result = list.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
        assert_eq!(state.borrow().stdout(), "one\ntwo\n");
    }

    #[test]
    fn false_and_skips_right() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        let list: AndOrList = "return -n 1 && echo skipped".parse().unwrap();

        let result = list.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus(1));
        assert_eq!(state.borrow().stdout(), "");
    }

    #[test]
    fn false_or_runs_right() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        let list: AndOrList = "return -n 1 || echo b".parse().unwrap();

        let result = list.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
        assert_eq!(state.borrow().stdout(), "b\n");
    }

    #[test]
    fn false_and_then_or() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        let list: AndOrList = "return -n 1 && echo a || echo b".parse().unwrap();

        let result = list.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
        assert_eq!(state.borrow().stdout(), "b\n");
    }

    #[test]
    fn errexit_does_not_apply_to_left_hand_side() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());
        env.options.set(ErrExit, State::On);
        let list: AndOrList = "return -n 1 || echo rescued".parse().unwrap();

        let result = list.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
    }

    #[test]
    fn errexit_applies_to_last_pipeline() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        env.options.set(ErrExit, State::On);
        let list: AndOrList = "return -n 0 && return -n 5".parse().unwrap();

        let result = list.execute(&mut env);
        assert_eq!(result, Break(Divert::Exit(None)));
        assert_eq!(env.exit_status, ExitStatus(5));
    }
}
