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

//! Basename built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Returns the base name of a path, as the `basename` utility defines it.
#[must_use]
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        if path.is_empty() {
            return "";
        }
        return "/";
    }
    match trimmed.rfind('/') {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

/// Entry point of the basename built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let Some(path) = args.first() else {
        return report_error(env, "basename", "missing operand", ExitStatus::ERROR);
    };
    let mut name = basename(&path.value).to_string();
    if let Some(suffix) = args.get(1) {
        if name != suffix.value {
            if let Some(stripped) = name.strip_suffix(&suffix.value) {
                name = stripped.to_string();
            }
        }
    }
    name.push('\n');
    let _ = env.system.write_all(Fd::STDOUT, name.as_bytes());
    Result::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn basename_of_paths() {
        assert_eq!(basename("/usr/local/bin"), "bin");
        assert_eq!(basename("/usr/local/bin/"), "bin");
        assert_eq!(basename("plain"), "plain");
        assert_eq!(basename("/"), "/");
        assert_eq!(basename(""), "");
    }

    #[test]
    fn suffix_is_removed() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["/src/lib.rs", ".rs"]));
        assert_eq!(state.borrow().stdout(), "lib\n");
    }

    #[test]
    fn suffix_equal_to_name_is_kept() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields([".rs", ".rs"]));
        assert_eq!(state.borrow().stdout(), ".rs\n");
    }

    #[test]
    fn missing_operand_is_an_error() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
    }
}
