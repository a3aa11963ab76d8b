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

//! Implementation of the compound command semantics.

use super::Command;
use crate::redir::RedirGuard;
use crate::Handle;
use marsh_env::semantics::{ExitStatus, Result};
use marsh_env::stack::Frame;
use marsh_env::Env;
use marsh_syntax::syntax;
use std::ops::ControlFlow::Continue;

mod case;
mod r#if;
mod for_loop;
mod subshell;
mod while_loop;

/// Executes the condition of an if/while/until command.
fn evaluate_condition(env: &mut Env, condition: &syntax::List) -> Result<bool> {
    let mut env = env.push_frame(Frame::Condition);
    condition.execute(&mut env)?;
    Continue(env.exit_status.is_successful())
}

/// Executes the compound command.
///
/// The redirections are performed, if any, before executing the command
/// body, and undone afterwards. A redirection error aborts the command with
/// a non-zero exit status, subject to the `errexit` option.
impl Command for syntax::FullCompoundCommand {
    fn execute(&self, env: &mut Env) -> Result {
        let mut env = RedirGuard::new(env);
        match env.perform_redirs(&self.redirs) {
            Ok(_) => self.command.execute(&mut env),
            Err(error) => {
                error.handle(&mut env)?;
                env.apply_errexit()
            }
        }
    }
}

/// Executes the compound command.
///
/// # Grouping
///
/// A grouping is executed by running the contained list in the current
/// environment.
///
/// # Subshell
///
/// A subshell runs the contained list in a forked child; changes to
/// variables, the working directory, or file descriptors do not propagate
/// to the caller.
///
/// # For loop
///
/// The word list (or the positional parameters, if no `in` clause) is
/// expanded, and the body runs once per field with the variable assigned.
///
/// # While and until loops
///
/// The condition runs, and while its exit status is zero (non-zero for
/// `until`), the body runs. The final exit status is that of the last body
/// execution, or zero if the body never ran.
///
/// # If conditional construct
///
/// The first condition with a zero exit status selects its body; otherwise
/// the `else` body runs, if any. With no branch taken, the status is zero.
///
/// # Case conditional construct
///
/// The subject word is expanded without splitting, each pattern is
/// expanded and matched in order of appearance, and the body of the first
/// matching pattern runs.
impl Command for syntax::CompoundCommand {
    fn execute(&self, env: &mut Env) -> Result {
        use syntax::CompoundCommand::*;
        match self {
            Grouping(list) => list.execute(env),
            Subshell(list) => subshell::execute(env, list),
            For { name, values, body } => for_loop::execute(env, name, values, body),
            While { condition, body } => while_loop::execute_while(env, condition, body),
            Until { condition, body } => while_loop::execute_until(env, condition, body),
            If {
                condition,
                body,
                elifs,
                r#else,
            } => r#if::execute(env, condition, body, elifs, r#else),
            Case { subject, items } => case::execute(env, subject, items),
        }
    }
}
