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

//! Dot built-in, which reads and executes commands from a file in the
//! current environment.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{Divert, ExitStatus, Field};
use marsh_env::system::{OfdAccess, SystemEx};
use marsh_env::Env;
use marsh_semantics::runner::read_eval_loop;
use std::ffi::CString;
use std::ops::ControlFlow::{Break, Continue};

/// Locates the script file.
///
/// A name without a slash is searched for in `$PATH`; unlike command
/// search, the file only needs to be readable, not executable. If the
/// search fails, the name is tried as is.
fn locate(env: &Env, name: &str) -> String {
    if name.contains('/') {
        return name.to_string();
    }
    if let Some(path) = env.variables.get_scalar(marsh_env::variable::PATH) {
        for dir in path.split(':') {
            let candidate = if dir.is_empty() {
                name.to_string()
            } else {
                format!("{dir}/{name}")
            };
            if let Ok(c_path) = CString::new(candidate.clone()) {
                if env.system.file_kind(&c_path).is_some() {
                    return candidate;
                }
            }
        }
    }
    name.to_string()
}

/// Entry point of the dot built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let Some(operand) = args.first() else {
        return report_error(env, ".", "missing file operand", ExitStatus::ERROR);
    };

    let path = locate(env, &operand.value);
    let Ok(c_path) = CString::new(path.clone()) else {
        return report_error(env, ".", "invalid file name", ExitStatus::ERROR);
    };
    let source = env
        .system
        .open(&c_path, OfdAccess::ReadOnly, Default::default(), Default::default())
        .and_then(|fd| {
            let content = env.system.read_all(fd);
            let _ = env.system.close(fd);
            content
        });
    let source = match source {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(errno) => {
            let result = report_error(
                env,
                ".",
                &format!("cannot read `{path}`: {errno}"),
                ExitStatus::FAILURE,
            );
            // A non-interactive shell aborts when the dot script is missing
            if env.is_interactive() {
                return result;
            }
            return Result::with_exit_status_and_divert(
                result.exit_status(),
                Break(Divert::Interrupt(Some(ExitStatus::FAILURE))),
            );
        }
    };

    match read_eval_loop(env, &source) {
        Continue(()) => Result::new(env.exit_status),
        // `return` in a dot script returns from the script
        Break(Divert::Return(exit_status)) => {
            Result::new(exit_status.unwrap_or(env.exit_status))
        }
        Break(divert) => Result::with_exit_status_and_divert(
            divert.exit_status().unwrap_or(env.exit_status),
            Break(divert),
        ),
    }
}
