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

//! Break built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{Divert, ExitStatus, Field};
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Parses the operand of `break` and `continue` against the enclosing
/// loops.
///
/// Returns the zero-based count of loops to divert through, or an error
/// message.
pub(crate) fn parse_count(env: &Env, args: &[Field]) -> std::result::Result<usize, String> {
    let requested: usize = match args.first() {
        None => 1,
        Some(field) => match field.value.parse() {
            Ok(0) | Err(_) => {
                return Err(format!("`{}` is not a positive integer", field.value))
            }
            Ok(count) => count,
        },
    };
    let loops = env.stack.loop_count(requested);
    if loops == 0 {
        return Err("not in a loop".to_string());
    }
    // More levels than enclosing loops means all of them
    Ok(requested.min(loops) - 1)
}

/// Entry point of the break built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    match parse_count(env, &args) {
        Ok(count) => Result::with_exit_status_and_divert(
            ExitStatus::SUCCESS,
            Break(Divert::Break { count }),
        ),
        Err(message) => report_error(env, "break", &message, ExitStatus::ERROR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;
    use marsh_semantics::Command;
    use marsh_syntax::syntax::CompoundCommand;

    #[test]
    fn break_outside_loop_is_an_error() {
        let (mut env, state) = builtin_env();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
        assert!(state.borrow().stderr().contains("not in a loop"));
    }

    #[test]
    fn break_terminates_enclosing_loop() {
        let (mut env, state) = builtin_env();
        let command: CompoundCommand =
            "while true; do echo first; break; echo second; done".parse().unwrap();
        let result = command.execute(&mut env);
        assert_eq!(result, std::ops::ControlFlow::Continue(()));
        assert_eq!(state.borrow().stdout(), "first\n");
    }

    #[test]
    fn break_with_zero_operand_is_an_error() {
        let (mut env, _state) = builtin_env();
        let mut env = env.push_frame(marsh_env::stack::Frame::Loop);
        let result = main(&mut env, Field::fields(["0"]));
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
    }

    #[test]
    fn break_count_is_capped_at_enclosing_loops() {
        let (mut env, _state) = builtin_env();
        let mut env = env.push_frame(marsh_env::stack::Frame::Loop);
        let result = main(&mut env, Field::fields(["10"]));
        assert_eq!(
            result.divert(),
            Break(Divert::Break { count: 0 })
        );
    }
}
