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

//! Dirname built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Returns the directory part of a path, as the `dirname` utility defines
/// it.
#[must_use]
pub fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { "/" };
    }
    match trimmed.rfind('/') {
        None => ".",
        Some(0) => "/",
        Some(index) => trimmed[..index].trim_end_matches('/'),
    }
}

/// Entry point of the dirname built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let Some(path) = args.first() else {
        return report_error(env, "dirname", "missing operand", ExitStatus::ERROR);
    };
    let line = format!("{}\n", dirname(&path.value));
    let _ = env.system.write_all(Fd::STDOUT, line.as_bytes());
    Result::SUCCESS
}
