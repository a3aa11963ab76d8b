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

//! Echo built-in.
//!
//! The arguments are printed separated by spaces and terminated with a
//! newline. In accordance with POSIX, no options are recognized; use
//! `printf` for controlled formatting.

use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Entry point of the echo built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut line = args
        .iter()
        .map(|field| &field.value[..])
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    match env.system.write_all(Fd::STDOUT, line.as_bytes()) {
        Ok(_) => Result::SUCCESS,
        Err(_) => Result::new(ExitStatus::FAILURE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn prints_arguments_separated_by_spaces() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["hello", "world"]));
        assert_eq!(state.borrow().stdout(), "hello world\n");
    }

    #[test]
    fn no_arguments_prints_empty_line() {
        let (mut env, state) = builtin_env();
        main(&mut env, vec![]);
        assert_eq!(state.borrow().stdout(), "\n");
    }

    #[test]
    fn options_are_not_recognized() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["-n", "x"]));
        assert_eq!(state.borrow().stdout(), "-n x\n");
    }
}
