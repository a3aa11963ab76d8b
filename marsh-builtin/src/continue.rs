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

//! Continue built-in.

use crate::r#break::parse_count;
use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{Divert, ExitStatus, Field};
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Entry point of the continue built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    match parse_count(env, &args) {
        Ok(count) => Result::with_exit_status_and_divert(
            ExitStatus::SUCCESS,
            Break(Divert::Continue { count }),
        ),
        Err(message) => report_error(env, "continue", &message, ExitStatus::ERROR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;
    use marsh_env::stack::Frame;

    #[test]
    fn continue_outside_loop_is_an_error() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
    }

    #[test]
    fn continue_diverts_to_enclosing_loop() {
        let (mut env, _state) = builtin_env();
        let mut env = env.push_frame(Frame::Loop);
        let result = main(&mut env, vec![]);
        assert_eq!(result.divert(), Break(Divert::Continue { count: 0 }));
    }
}
