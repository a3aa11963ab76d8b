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

//! Set built-in.
//!
//! The set built-in changes shell options and positional parameters:
//!
//! - `set -e -u ...` and `set +e ...` turn short-named options on and off.
//! - `set -o errexit` and `set +o errexit` do the same by long name.
//! - `set -o` prints the current settings; `set +o` prints them as `set`
//!   commands that reproduce the settings.
//! - Remaining operands (or everything after `--`) replace the positional
//!   parameters. A lone `set --` clears them.
//! - With no arguments at all, the defined variables are printed.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::option::{self, OptionSet, State};
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Entry point of the set built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        return print_variables(env);
    }

    let mut index = 0;
    let mut replace_params = false;
    while index < args.len() {
        let argument = &args[index].value;
        let (enable, rest) = match (argument.strip_prefix('-'), argument.strip_prefix('+')) {
            _ if argument == "--" => {
                index += 1;
                replace_params = true;
                break;
            }
            (Some(rest), _) if !rest.is_empty() => (true, rest),
            (_, Some(rest)) if !rest.is_empty() => (false, rest),
            _ => {
                replace_params = true;
                break;
            }
        };

        if rest == "o" {
            // `-o name` or a settings listing
            index += 1;
            match args.get(index) {
                Some(name) => match option::parse_long(&name.value) {
                    Some((option, state)) => {
                        let state = if enable { state } else { !state };
                        env.options.set(option, state);
                    }
                    None => {
                        return report_error(
                            env,
                            "set",
                            &format!("no such option: {}", name.value),
                            ExitStatus::ERROR,
                        )
                    }
                },
                None => return print_options(env, enable),
            }
        } else {
            for c in rest.chars() {
                match option::parse_short(c) {
                    Some((option, state)) => {
                        let state = if enable { state } else { !state };
                        env.options.set(option, state);
                    }
                    None => {
                        return report_error(
                            env,
                            "set",
                            &format!("no such option: -{c}"),
                            ExitStatus::ERROR,
                        )
                    }
                }
            }
        }
        index += 1;
    }

    if replace_params || index < args.len() {
        env.variables.positional_params_mut().values = args[index..]
            .iter()
            .map(|field| field.value.clone())
            .collect();
    }
    Result::SUCCESS
}

fn print_variables(env: &mut Env) -> Result {
    let mut lines: Vec<String> = env
        .variables
        .iter()
        .filter_map(|(name, variable)| {
            let value = variable.value.as_deref()?;
            Some(format!("{name}='{}'\n", value.replace('\'', "'\\''")))
        })
        .collect();
    lines.sort();
    let output = lines.concat();
    let _ = env.system.write_all(Fd::STDOUT, output.as_bytes());
    Result::SUCCESS
}

fn print_options(env: &mut Env, human_readable: bool) -> Result {
    let mut output = String::new();
    let options: OptionSet = env.options;
    for (option, state) in options.iter() {
        if !option.is_modifiable() {
            continue;
        }
        if human_readable {
            output.push_str(&format!("{option:15} {state}\n"));
        } else {
            let flag = match state {
                State::On => "-o",
                State::Off => "+o",
            };
            output.push_str(&format!("set {flag} {option}\n"));
        }
    }
    let _ = env.system.write_all(Fd::STDOUT, output.as_bytes());
    Result::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;
    use marsh_env::option::{AllExport, Clobber, ErrExit, Glob, On, Off, PipeFail, Unset};

    #[test]
    fn short_options_toggle() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["-e", "-a"]));
        assert_eq!(env.options.get(ErrExit), On);
        assert_eq!(env.options.get(AllExport), On);

        main(&mut env, Field::fields(["+e"]));
        assert_eq!(env.options.get(ErrExit), Off);
    }

    #[test]
    fn negative_short_options() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["-Cfu"]));
        assert_eq!(env.options.get(Clobber), Off);
        assert_eq!(env.options.get(Glob), Off);
        assert_eq!(env.options.get(Unset), Off);

        main(&mut env, Field::fields(["+C"]));
        assert_eq!(env.options.get(Clobber), On);
    }

    #[test]
    fn long_options_with_o() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["-o", "pipefail"]));
        assert_eq!(env.options.get(PipeFail), On);

        main(&mut env, Field::fields(["+o", "pipefail"]));
        assert_eq!(env.options.get(PipeFail), Off);

        main(&mut env, Field::fields(["-o", "noclobber"]));
        assert_eq!(env.options.get(Clobber), Off);
    }

    #[test]
    fn unknown_option_is_an_error() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["-Z"]));
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
        let result = main(&mut env, Field::fields(["-o", "bogus"]));
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
    }

    #[test]
    fn sets_positional_parameters() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["--", "a", "b"]));
        assert_eq!(env.variables.positional_params().values, ["a", "b"]);

        main(&mut env, Field::fields(["--"]));
        assert!(env.variables.positional_params().values.is_empty());
    }

    #[test]
    fn options_and_parameters_together() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["-e", "one", "two"]));
        assert_eq!(env.options.get(ErrExit), On);
        assert_eq!(env.variables.positional_params().values, ["one", "two"]);
    }

    #[test]
    fn prints_variables_without_arguments() {
        let (mut env, state) = builtin_env();
        env.variables
            .get_or_new("zeta", marsh_env::variable::Scope::Global)
            .assign("z")
            .unwrap();
        main(&mut env, vec![]);
        assert!(state.borrow().stdout().contains("zeta='z'\n"));
    }

    #[test]
    fn plus_o_prints_reusable_settings() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["+o"]));
        let stdout = state.borrow().stdout();
        assert!(stdout.contains("set +o errexit\n"));
        assert!(stdout.contains("set -o glob\n"));
    }
}
