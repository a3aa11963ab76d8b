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

//! Cd built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::variable::{Scope, OLDPWD, PWD};
use marsh_env::Env;
use marsh_syntax::syntax::Fd;
use std::ffi::CString;

/// Entry point of the cd built-in.
///
/// Without an operand, the target is `$HOME`. The operand `-` names the
/// previous working directory (`$OLDPWD`) and prints the new directory.
/// `$PWD` and `$OLDPWD` are updated on success.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut print_new_directory = false;
    let target = match args.first() {
        None => match env.variables.get_scalar(marsh_env::variable::HOME) {
            Some(home) => home.to_string(),
            None => return report_error(env, "cd", "HOME not set", ExitStatus::FAILURE),
        },
        Some(field) if field.value == "-" => {
            print_new_directory = true;
            match env.variables.get_scalar(OLDPWD) {
                Some(oldpwd) => oldpwd.to_string(),
                None => return report_error(env, "cd", "OLDPWD not set", ExitStatus::FAILURE),
            }
        }
        Some(field) => field.value.clone(),
    };

    let Ok(c_target) = CString::new(target.clone()) else {
        return report_error(env, "cd", "invalid directory name", ExitStatus::FAILURE);
    };
    let old_pwd = env.system.getcwd().unwrap_or_default();
    if let Err(errno) = env.system.chdir(&c_target) {
        return report_error(
            env,
            "cd",
            &format!("cannot change directory to `{target}`: {errno}"),
            ExitStatus::FAILURE,
        );
    }

    let new_pwd = env.system.getcwd().unwrap_or(target);
    let _ = env
        .variables
        .get_or_new(OLDPWD, Scope::Global)
        .assign(old_pwd);
    let _ = env
        .variables
        .get_or_new(PWD, Scope::Global)
        .assign(new_pwd.clone());

    if print_new_directory {
        let line = format!("{new_pwd}\n");
        let _ = env.system.write_all(Fd::STDOUT, line.as_bytes());
    }
    Result::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn changes_to_operand_and_updates_pwd() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["/tmp"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(env.system.getcwd().unwrap(), "/tmp");
        assert_eq!(env.variables.get_scalar(PWD), Some("/tmp"));
        assert_eq!(env.variables.get_scalar(OLDPWD), Some("/"));
    }

    #[test]
    fn defaults_to_home() {
        let (mut env, _state) = builtin_env();
        env.variables
            .get_or_new("HOME", Scope::Global)
            .assign("/home/me")
            .unwrap();
        main(&mut env, vec![]);
        assert_eq!(env.system.getcwd().unwrap(), "/home/me");
    }

    #[test]
    fn home_unset_is_an_error() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }

    #[test]
    fn hyphen_returns_to_previous_directory_and_prints_it() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["/tmp"]));
        let result = main(&mut env, Field::fields(["-"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(env.system.getcwd().unwrap(), "/");
        assert_eq!(state.borrow().stdout(), "/\n");
    }
}
