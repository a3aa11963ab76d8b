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

//! Execution of the subshell compound command

use crate::command::Command;
use marsh_env::io::print_error;
use marsh_env::semantics::{Divert, ExitStatus, Result};
use marsh_env::Env;
use marsh_syntax::syntax::List;
use std::ops::ControlFlow::Break;

/// Executes the subshell.
///
/// The body runs in a forked child process, so changes to the execution
/// environment do not propagate to the caller. The exit status of the
/// subshell is the exit status of the body.
pub fn execute(env: &mut Env, body: &List) -> Result {
    let body = body.clone();
    match env.run_in_subshell(move |env| body.execute(env)) {
        Ok(exit_status) => {
            env.exit_status = exit_status;
            env.apply_errexit()
        }
        Err(errno) => {
            print_error(env, &format!("cannot start subshell: {errno}"));
            Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)))
        }
    }
}
