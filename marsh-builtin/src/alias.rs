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

//! Alias built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

fn print_alias(output: &mut String, name: &str, replacement: &str) {
    output.push_str(&format!(
        "alias {name}='{}'\n",
        replacement.replace('\'', "'\\''"),
    ));
}

/// Entry point of the alias built-in.
///
/// An operand of the form `name=value` defines an alias; a bare name
/// prints the named alias. With no operands, all aliases are printed.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        let mut lines: Vec<(String, String)> = env
            .aliases
            .iter()
            .map(|alias| (alias.name.clone(), alias.replacement.clone()))
            .collect();
        lines.sort();
        let mut output = String::new();
        for (name, replacement) in lines {
            print_alias(&mut output, &name, &replacement);
        }
        let _ = env.system.write_all(Fd::STDOUT, output.as_bytes());
        return Result::SUCCESS;
    }

    let mut exit_status = ExitStatus::SUCCESS;
    for operand in args {
        match operand.value.split_once('=') {
            Some((name, replacement)) => {
                env.aliases.insert(name.to_string(), replacement.to_string());
            }
            None => match env.aliases.get(&operand.value).cloned() {
                Some(alias) => {
                    let mut output = String::new();
                    print_alias(&mut output, &alias.name, &alias.replacement);
                    let _ = env.system.write_all(Fd::STDOUT, output.as_bytes());
                }
                None => {
                    let result = report_error(
                        env,
                        "alias",
                        &format!("no such alias: {}", operand.value),
                        ExitStatus::FAILURE,
                    );
                    exit_status = result.exit_status();
                }
            },
        }
    }
    Result::new(exit_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn defines_and_prints_aliases() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["ll=ls -l"]));
        assert_eq!(env.aliases.get("ll").unwrap().replacement, "ls -l");

        main(&mut env, Field::fields(["ll"]));
        assert_eq!(state.borrow().stdout(), "alias ll='ls -l'\n");
    }

    #[test]
    fn unknown_alias_is_an_error() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["nope"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
