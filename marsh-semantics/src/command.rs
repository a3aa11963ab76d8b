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

//! Command execution

mod and_or;
mod compound_command;
mod function_definition;
mod item;
mod pipeline;
pub mod simple_command;

use crate::trap::run_traps_for_caught_signals;
use marsh_env::semantics::Result;
use marsh_env::Env;
use marsh_syntax::syntax;
use std::ops::ControlFlow::{Break, Continue};

/// Syntactic construct that can be executed.
pub trait Command {
    /// Executes this command.
    ///
    /// Implementations of this method are expected to update
    /// `env.exit_status` reflecting the result of the command execution.
    fn execute(&self, env: &mut Env) -> Result;
}

/// Executes the command.
///
/// After executing the command body, this function runs the trap actions
/// for any signals caught during the execution.
impl Command for syntax::Command {
    fn execute(&self, env: &mut Env) -> Result {
        let main_result = match self {
            syntax::Command::Simple(command) => command.execute(env),
            syntax::Command::Compound(command) => command.execute(env),
            syntax::Command::Function(definition) => definition.execute(env),
        };

        let trap_result = run_traps_for_caught_signals(env);

        match (main_result, trap_result) {
            (_, Continue(())) => main_result,
            (Continue(()), _) => trap_result,
            (Break(main_divert), Break(trap_divert)) => Break(main_divert.max(trap_divert)),
        }
    }
}

/// Executes the list.
///
/// The list is executed by executing each item in sequence. If any item
/// results in a [`Divert`](marsh_env::semantics::Divert), the remaining
/// items are not executed.
impl Command for syntax::List {
    fn execute(&self, env: &mut Env) -> Result {
        for item in &self.0 {
            item.execute(env)?;
        }
        Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{return_builtin, stub_env};
    use marsh_env::semantics::{Divert, ExitStatus};

    #[test]
    fn list_execute_no_divert() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        let list: syntax::List = "return -n 1; return -n 2; return -n 4".parse().unwrap();
        let result = list.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus(4));
    }

    #[test]
    fn list_execute_divert() {
        let (mut env, _state) = stub_env();
        env.builtins.insert("return", return_builtin());
        let list: syntax::List = "return -n 1; return 2; return -n 4".parse().unwrap();
        let result = list.execute(&mut env);
        assert_eq!(
            result,
            Break(Divert::Return(Some(ExitStatus(2))))
        );
    }
}
