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

//! Pwd built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Entry point of the pwd built-in.
pub fn main(env: &mut Env, _args: Vec<Field>) -> Result {
    match env.system.getcwd() {
        Ok(cwd) => {
            let line = format!("{cwd}\n");
            let _ = env.system.write_all(Fd::STDOUT, line.as_bytes());
            Result::SUCCESS
        }
        Err(errno) => report_error(
            env,
            "pwd",
            &format!("cannot determine working directory: {errno}"),
            ExitStatus::FAILURE,
        ),
    }
}
