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

//! True and false built-ins.

use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::Env;

/// Entry point of the true built-in.
pub fn main(_env: &mut Env, _args: Vec<Field>) -> Result {
    Result::SUCCESS
}

/// Entry point of the false built-in.
pub fn false_main(_env: &mut Env, _args: Vec<Field>) -> Result {
    Result::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;
    use marsh_env::semantics::ExitStatus;

    #[test]
    fn true_succeeds_and_false_fails() {
        let (mut env, _state) = builtin_env();
        assert_eq!(main(&mut env, vec![]).exit_status(), ExitStatus::SUCCESS);
        assert_eq!(
            false_main(&mut env, vec![]).exit_status(),
            ExitStatus::FAILURE
        );
    }
}
