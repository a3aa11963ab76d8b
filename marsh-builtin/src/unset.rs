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

//! Unset built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::Env;

/// Entry point of the unset built-in.
///
/// Operands name variables to unset, or functions with the `-f` option.
/// Unsetting a name that is not set is not an error; unsetting a read-only
/// variable or function is.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut unset_functions = false;
    let mut operands = &args[..];
    match args.first().map(|f| &f.value[..]) {
        Some("-f") => {
            unset_functions = true;
            operands = &args[1..];
        }
        Some("-v") => operands = &args[1..],
        _ => {}
    }

    let mut exit_status = ExitStatus::SUCCESS;
    for operand in operands {
        if unset_functions {
            if let Err(error) = env.functions.unset(&operand.value) {
                let result = report_error(env, "unset", &error.to_string(), ExitStatus::FAILURE);
                exit_status = result.exit_status();
            }
        } else if let Err(error) = env.variables.unset(&operand.value) {
            let result = report_error(env, "unset", &error.to_string(), ExitStatus::FAILURE);
            exit_status = result.exit_status();
        }
    }
    Result::new(exit_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;
    use marsh_env::variable::Scope;

    #[test]
    fn unsets_variables() {
        let (mut env, _state) = builtin_env();
        env.variables
            .get_or_new("v", Scope::Global)
            .assign("1")
            .unwrap();
        let result = main(&mut env, Field::fields(["v", "not_set"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(env.variables.get("v"), None);
    }

    #[test]
    fn read_only_variable_is_an_error() {
        let (mut env, _state) = builtin_env();
        let mut variable = env.variables.get_or_new("v", Scope::Global);
        variable.assign("1").unwrap();
        variable.make_read_only();
        let result = main(&mut env, Field::fields(["v"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
        assert_eq!(env.variables.get_scalar("v"), Some("1"));
    }

    #[test]
    fn unsets_functions_with_f_option() {
        let (mut env, _state) = builtin_env();
        let body = match "{ :; }".parse::<marsh_syntax::syntax::Command>().unwrap() {
            marsh_syntax::syntax::Command::Compound(body) => body,
            _ => unreachable!(),
        };
        env.functions
            .define(marsh_env::function::Function::new("f", body))
            .unwrap();
        main(&mut env, Field::fields(["-f", "f"]));
        assert!(env.functions.get("f").is_none());
    }
}
