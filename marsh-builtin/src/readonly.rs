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

//! Readonly built-in.

use crate::export::{print_attributed, split_operand};
use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::variable::Scope;
use marsh_env::Env;

/// Entry point of the readonly built-in.
///
/// Each operand names a variable to make read-only, optionally assigning a
/// value first. With no operands or with `-p`, the read-only variables are
/// printed.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let operands: Vec<&Field> = args.iter().filter(|f| f.value != "-p").collect();
    if operands.is_empty() {
        return print_attributed(env, "readonly", |variable| variable.is_read_only);
    }

    for operand in operands {
        let (name, value) = split_operand(&operand.value);
        if !marsh_syntax::syntax::is_name(name) {
            return report_error(
                env,
                "readonly",
                &format!("`{name}` is not a valid variable name"),
                ExitStatus::ERROR,
            );
        }
        let mut variable = env.variables.get_or_new(name, Scope::Global);
        if let Some(value) = value {
            if variable.assign(value).is_err() {
                return report_error(
                    env,
                    "readonly",
                    &format!("variable `{name}` is already read-only"),
                    ExitStatus::FAILURE,
                );
            }
        }
        variable.make_read_only();
    }
    Result::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn makes_variable_read_only() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["v=fixed"]));
        let error = env
            .variables
            .get_or_new("v", Scope::Global)
            .assign("other")
            .unwrap_err();
        assert_eq!(error.new_value, "other");
    }

    #[test]
    fn prints_read_only_variables() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["fixed=yes"]));
        main(&mut env, vec![]);
        assert!(state.borrow().stdout().contains("readonly fixed='yes'\n"));
    }
}
