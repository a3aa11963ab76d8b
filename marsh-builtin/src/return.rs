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

//! Return built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{Divert, ExitStatus, Field};
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Entry point of the return built-in.
///
/// Without an operand, the exit status of the last executed command is
/// returned. The divert unwinds to the closest enclosing function call or
/// dot script.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let exit_status = match args.first() {
        None => env.exit_status,
        Some(field) => match field.value.parse() {
            Ok(number) => ExitStatus(number),
            Err(_) => {
                return report_error(
                    env,
                    "return",
                    &format!("`{}` is not a valid exit status", field.value),
                    ExitStatus::ERROR,
                )
            }
        },
    };
    Result::with_exit_status_and_divert(exit_status, Break(Divert::Return(Some(exit_status))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn returns_operand_as_exit_status() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["7"]));
        assert_eq!(result.exit_status(), ExitStatus(7));
        assert_eq!(
            result.divert(),
            Break(Divert::Return(Some(ExitStatus(7))))
        );
    }

    #[test]
    fn defaults_to_last_exit_status() {
        let (mut env, _state) = builtin_env();
        env.exit_status = ExitStatus(3);
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus(3));
    }

    #[test]
    fn invalid_operand_is_an_error() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["many"]));
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
        assert_eq!(result.divert(), std::ops::ControlFlow::Continue(()));
    }
}
