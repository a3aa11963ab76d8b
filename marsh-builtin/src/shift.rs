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

//! Shift built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::Env;

/// Entry point of the shift built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let count: usize = match args.first() {
        None => 1,
        Some(field) => match field.value.parse() {
            Ok(count) => count,
            Err(_) => {
                return report_error(
                    env,
                    "shift",
                    &format!("`{}` is not a non-negative integer", field.value),
                    ExitStatus::ERROR,
                )
            }
        },
    };

    let available = env.variables.positional_params().values.len();
    if count > available {
        let message =
            format!("cannot shift {count} positional parameters, only {available} available");
        return report_error(env, "shift", &message, ExitStatus::ERROR);
    }
    env.variables.positional_params_mut().values.drain(..count);
    Result::SUCCESS
}
