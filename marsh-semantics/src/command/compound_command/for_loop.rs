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

//! Execution of the for loop

use crate::command::Command;
use crate::expansion::expand_words;
use crate::Handle;
use marsh_env::io::print_error;
use marsh_env::semantics::{Divert, ExitStatus, Field, Result};
use marsh_env::stack::Frame;
use marsh_env::variable::Scope;
use marsh_env::Env;
use marsh_syntax::syntax::{List, Word};
use std::ops::ControlFlow::{Break, Continue};

/// Executes the for loop.
pub fn execute(env: &mut Env, name: &str, values: &Option<Vec<Word>>, body: &List) -> Result {
    let values = if let Some(words) = values {
        match expand_words(env, words) {
            Ok((fields, _)) => fields,
            Err(error) => return error.handle(env),
        }
    } else {
        Field::fields(env.variables.positional_params().values.iter().cloned())
    };

    let env = &mut env.push_frame(Frame::Loop);

    if values.is_empty() {
        env.exit_status = ExitStatus::SUCCESS;
        return Continue(());
    }

    for Field { value } in values {
        if let Err(error) = env.get_or_create_variable(name, Scope::Global).assign(value) {
            print_error(
                env,
                &format!("cannot assign to read-only variable `{name}`: {error}"),
            );
            env.exit_status = ExitStatus::FAILURE;
            return Break(Divert::Interrupt(Some(ExitStatus::FAILURE)));
        }
        match body.execute(env) {
            Break(Divert::Break { count: 0 }) => break,
            Break(Divert::Break { count }) => return Break(Divert::Break { count: count - 1 }),
            Break(Divert::Continue { count: 0 }) => continue,
            Break(Divert::Continue { count }) => {
                return Break(Divert::Continue { count: count - 1 })
            }
            other => other?,
        }
    }

    Continue(())
}
