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

//! Exit built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{Divert, ExitStatus, Field};
use marsh_env::stack::Frame;
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Entry point of the exit built-in.
///
/// The operand is taken modulo 256. Without an operand, the exit status of
/// the last executed command is used; inside a trap action, the status in
/// effect before the trap is used instead.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let exit_status = match args.first() {
        None => default_exit_status(env),
        Some(field) => match field.value.parse::<i64>() {
            Ok(number) => ExitStatus((number.rem_euclid(256)) as i32),
            Err(_) => {
                let result = report_error(
                    env,
                    "exit",
                    &format!("`{}` is not a valid exit status", field.value),
                    ExitStatus::ERROR,
                );
                // The shell exits regardless of the operand error
                return Result::with_exit_status_and_divert(
                    result.exit_status(),
                    Break(Divert::Exit(Some(ExitStatus::ERROR))),
                );
            }
        },
    };
    Result::with_exit_status_and_divert(exit_status, Break(Divert::Exit(Some(exit_status))))
}

/// Returns the exit status `exit` uses when no operand is given.
fn default_exit_status(env: &Env) -> ExitStatus {
    for frame in env.stack.iter().rev() {
        if let Frame::Trap {
            previous_exit_status,
        } = frame
        {
            return *previous_exit_status;
        }
    }
    env.exit_status
}
