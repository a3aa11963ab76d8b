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

//! Parsing and executing commands from a source string.

use crate::command::Command;
use crate::trap::run_traps_for_caught_signals;
use marsh_env::io::print_error;
use marsh_env::option::{self, On};
use marsh_env::semantics::{Divert, ExitStatus, Result};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::parser::parse_program;
use marsh_syntax::syntax::Fd;
use std::ops::ControlFlow::{Break, Continue};

/// Parses and executes the commands in the given source string.
///
/// This function is the driver for whole scripts and for any place the
/// shell runs a command string: `eval`, dot scripts, trap actions, and
/// command substitutions. Between commands, finished asynchronous jobs are
/// reaped and pending trap actions run.
///
/// A syntax error prints a diagnostic, sets the exit status to 2, and
/// interrupts execution. With the `verbose` option on, the source is
/// echoed to the standard error before execution; with `noexec` on,
/// commands are parsed but not executed.
pub fn read_eval_loop(env: &mut Env, source: &str) -> Result {
    if env.options.get(option::Verbose) == On {
        let _ = env.system.write_all(Fd::STDERR, source.as_bytes());
    }

    let list = match parse_program(source, &env.aliases) {
        Ok(list) => list,
        Err(error) => {
            print_error(env, &format!("syntax error: {error}"));
            env.exit_status = ExitStatus::ERROR;
            return Break(Divert::Interrupt(Some(ExitStatus::ERROR)));
        }
    };

    if env.options.get(option::Exec) != On {
        return Continue(());
    }

    if list.0.is_empty() {
        env.exit_status = ExitStatus::SUCCESS;
        return Continue(());
    }

    for item in &list.0 {
        env.reap_jobs();
        run_traps_for_caught_signals(env)?;
        item.execute(env)?;
    }
    Continue(())
}
