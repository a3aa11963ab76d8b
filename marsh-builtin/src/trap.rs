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

//! Trap built-in.
//!
//! `trap action condition...` sets the action for each condition. The
//! action is a command string, an empty string to ignore the condition, or
//! `-` to reset it to the default. If the first operand is an unsigned
//! integer, all operands are taken as conditions to reset. Without
//! operands, the current traps are printed in a reusable form.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::trap::{Action, Condition};
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Entry point of the trap built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        return print_traps(env);
    }

    // "trap N..." resets the conditions, as POSIX requires for
    // compatibility with historic shells
    let all_conditions = args[0].value.parse::<u32>().is_ok();
    let (action, conditions) = if all_conditions {
        (Action::Default, &args[..])
    } else {
        let action = match &args[0].value[..] {
            "-" => Action::Default,
            "" => Action::Ignore,
            command => Action::Command(command.into()),
        };
        (action, &args[1..])
    };

    if conditions.is_empty() {
        return report_error(env, "trap", "missing condition operand", ExitStatus::ERROR);
    }

    let mut exit_status = ExitStatus::SUCCESS;
    for operand in conditions {
        let Ok(condition) = operand.value.parse::<Condition>() else {
            let result = report_error(
                env,
                "trap",
                &format!("no such condition: {}", operand.value),
                ExitStatus::FAILURE,
            );
            exit_status = result.exit_status();
            continue;
        };
        if let Err(error) = env
            .traps
            .set_action(&mut env.system, condition, action.clone())
        {
            let result = report_error(
                env,
                "trap",
                &format!("{}: {error}", operand.value),
                ExitStatus::FAILURE,
            );
            exit_status = result.exit_status();
        }
    }
    Result::new(exit_status)
}

fn print_traps(env: &mut Env) -> Result {
    let mut output = String::new();
    for (condition, action) in env.traps.iter() {
        let action = match action {
            Action::Default => continue,
            Action::Ignore => String::new(),
            Action::Command(command) => command.to_string(),
        };
        output.push_str(&format!(
            "trap -- '{}' {condition}\n",
            action.replace('\'', "'\\''"),
        ));
    }
    let _ = env.system.write_all(Fd::STDOUT, output.as_bytes());
    Result::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn sets_command_action() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["echo caught", "INT"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(
            env.traps.get_action(Condition::Signal(libc::SIGINT)),
            &Action::Command("echo caught".into())
        );
    }

    #[test]
    fn empty_action_ignores_the_signal() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["", "TERM"]));
        assert_eq!(
            env.traps.get_action(Condition::Signal(libc::SIGTERM)),
            &Action::Ignore
        );
    }

    #[test]
    fn hyphen_resets_to_default() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["echo x", "INT"]));
        main(&mut env, Field::fields(["-", "INT"]));
        assert_eq!(
            env.traps.get_action(Condition::Signal(libc::SIGINT)),
            &Action::Default
        );
    }

    #[test]
    fn numeric_first_operand_resets_conditions() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["echo x", "INT"]));
        let int_number = libc::SIGINT.to_string();
        main(&mut env, Field::fields([&int_number[..]]));
        assert_eq!(
            env.traps.get_action(Condition::Signal(libc::SIGINT)),
            &Action::Default
        );
    }

    #[test]
    fn exit_condition_is_supported() {
        let (mut env, _state) = builtin_env();
        main(&mut env, Field::fields(["echo bye", "EXIT"]));
        assert_eq!(
            env.traps.get_action(Condition::Exit),
            &Action::Command("echo bye".into())
        );
    }

    #[test]
    fn prints_traps_in_reusable_form() {
        let (mut env, state) = builtin_env();
        main(&mut env, Field::fields(["echo 'hi'", "INT"]));
        main(&mut env, vec![]);
        assert_eq!(
            state.borrow().stdout(),
            "trap -- 'echo '\\''hi'\\''' INT\n"
        );
    }

    #[test]
    fn untrappable_signal_is_an_error() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["echo x", "KILL"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
