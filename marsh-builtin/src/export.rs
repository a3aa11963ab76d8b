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

//! Export built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::variable::Scope;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Splits an operand into a name and an optional value.
pub(crate) fn split_operand(operand: &str) -> (&str, Option<&str>) {
    match operand.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (operand, None),
    }
}

/// Prints the variables having an attribute, in a form reusable as input.
pub(crate) fn print_attributed(
    env: &mut Env,
    keyword: &str,
    selector: fn(&marsh_env::variable::Variable) -> bool,
) -> Result {
    let mut lines: Vec<String> = env
        .variables
        .iter()
        .filter(|(_, variable)| selector(variable))
        .map(|(name, variable)| match &variable.value {
            Some(value) => format!("{keyword} {name}='{}'\n", value.replace('\'', "'\\''")),
            None => format!("{keyword} {name}\n"),
        })
        .collect();
    lines.sort();
    let output = lines.concat();
    let _ = env.system.write_all(Fd::STDOUT, output.as_bytes());
    Result::SUCCESS
}

/// Entry point of the export built-in.
///
/// Each operand names a variable to export, optionally assigning a value.
/// With no operands or with `-p`, the exported variables are printed.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let operands: Vec<&Field> = args.iter().filter(|f| f.value != "-p").collect();
    if operands.is_empty() {
        return print_attributed(env, "export", |variable| variable.is_exported);
    }

    for operand in operands {
        let (name, value) = split_operand(&operand.value);
        if !marsh_syntax::syntax::is_name(name) {
            return report_error(
                env,
                "export",
                &format!("`{name}` is not a valid variable name"),
                ExitStatus::ERROR,
            );
        }
        let mut variable = env.variables.get_or_new(name, Scope::Global);
        if let Some(value) = value {
            if variable.assign(value).is_err() {
                return report_error(
                    env,
                    "export",
                    &format!("cannot assign to read-only variable `{name}`"),
                    ExitStatus::FAILURE,
                );
            }
        }
        variable.export(true);
    }
    Result::SUCCESS
}
