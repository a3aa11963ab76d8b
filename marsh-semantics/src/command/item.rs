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

//! Implementation for Item.

use super::Command;
use marsh_env::io::print_error;
use marsh_env::job::Job;
use marsh_env::semantics::{Divert, ExitStatus, Result};
use marsh_env::Env;
use marsh_syntax::syntax;
use marsh_syntax::syntax::AndOrList;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Executes the item.
///
/// # Synchronous command
///
/// If the item is not asynchronous, this function simply executes the
/// and-or list in the item.
///
/// # Asynchronous command
///
/// An asynchronous item executes its and-or list in a subshell without
/// waiting. The child's process ID becomes the value of `$!` and is
/// registered in the job set, but only if the subshell was started
/// successfully; a failed spawn leaves `$!` untouched. Since this function
/// finishes before the command does, the exit status is always 0.
impl Command for syntax::Item {
    fn execute(&self, env: &mut Env) -> Result {
        if self.is_async {
            execute_async(env, &self.and_or)
        } else {
            self.and_or.execute(env)
        }
    }
}

fn execute_async(env: &mut Env, and_or: &Rc<AndOrList>) -> Result {
    let and_or_2 = Rc::clone(and_or);
    let result = env.start_subshell(move |env| and_or_2.execute(env));
    match result {
        Ok(pid) => {
            let mut job = Job::new(pid);
            job.name = and_or.to_string();
            env.jobs.add(job);
            env.jobs.set_last_async_pid(pid);
            env.exit_status = ExitStatus::SUCCESS;
            Continue(())
        }
        Err(errno) => {
            print_error(
                env,
                &format!("cannot start asynchronous command: {errno}"),
            );
            Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)))
        }
    }
}
