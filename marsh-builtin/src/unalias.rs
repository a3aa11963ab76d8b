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

//! Unalias built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::Env;
use marsh_syntax::alias::AliasSet;

/// Entry point of the unalias built-in.
///
/// Operands name aliases to remove; `-a` removes all of them.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.first().map(|f| &f.value[..]) == Some("-a") {
        env.aliases = AliasSet::new();
        return Result::SUCCESS;
    }

    let mut exit_status = ExitStatus::SUCCESS;
    for operand in args {
        if !env.aliases.remove(&operand.value) {
            let result = report_error(
                env,
                "unalias",
                &format!("no such alias: {}", operand.value),
                ExitStatus::FAILURE,
            );
            exit_status = result.exit_status();
        }
    }
    Result::new(exit_status)
}
