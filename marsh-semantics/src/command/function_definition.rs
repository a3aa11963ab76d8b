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

//! Implementation of function definition semantics.

use super::Command;
use marsh_env::function::Function;
use marsh_env::io::print_error;
use marsh_env::semantics::{ExitStatus, Result};
use marsh_env::Env;
use marsh_syntax::syntax;
use std::ops::ControlFlow::Continue;
use std::rc::Rc;

/// Executes the function definition command.
///
/// The function body is stored in the function set by shared reference, so
/// every invocation reuses the single definition from the syntax tree. The
/// exit status is zero unless an existing read-only function prevents the
/// redefinition.
impl Command for syntax::FunctionDefinition {
    fn execute(&self, env: &mut Env) -> Result {
        let function = Function::new(self.name.clone(), Rc::clone(&self.body));
        match env.functions.define(function) {
            Ok(()) => {
                env.exit_status = ExitStatus::SUCCESS;
                Continue(())
            }
            Err(error) => {
                print_error(env, &error.to_string());
                env.exit_status = ExitStatus::ERROR;
                env.apply_errexit()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::stub_env;

    #[test]
    fn definition_stores_the_function_and_succeeds() {
        let (mut env, _state) = stub_env();
        env.exit_status = ExitStatus(7);
        let command: syntax::Command = "f() { echo body; }".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
        let function = env.functions.get("f").unwrap();
        assert_eq!(function.name, "f");
    }

    #[test]
    fn redefinition_replaces_the_function() {
        let (mut env, _state) = stub_env();
        let first: syntax::Command = "f() { echo one; }".parse().unwrap();
        first.execute(&mut env);
        let second: syntax::Command = "f() { echo two; }".parse().unwrap();
        second.execute(&mut env);

        let function = env.functions.get("f").unwrap();
        assert!(function.body.to_string().contains("two"));
    }

    #[test]
    fn read_only_function_is_not_redefined() {
        let (mut env, state) = stub_env();
        let first: syntax::Command = "f() { echo one; }".parse().unwrap();
        first.execute(&mut env);
        let function = env.functions.get("f").unwrap();
        let read_only = Function::new("f", Rc::clone(&function.body)).make_read_only();
        env.functions.unset("f").unwrap();
        env.functions.define(read_only).unwrap();

        let second: syntax::Command = "f() { echo two; }".parse().unwrap();
        let result = second.execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::ERROR);
        assert_ne!(state.borrow().stderr(), "");
    }
}
