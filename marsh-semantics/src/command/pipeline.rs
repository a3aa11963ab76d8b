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

//! Implementation of pipeline semantics.

use super::Command;
use marsh_env::io::print_error;
use marsh_env::job::Pid;
use marsh_env::option::{On, PipeFail};
use marsh_env::semantics::{Divert, ExitStatus, Result};
use marsh_env::stack::Frame;
use marsh_env::system::Errno;
use marsh_env::Env;
use marsh_syntax::syntax;
use marsh_syntax::syntax::Fd;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Executes the pipeline.
///
/// # Executing commands
///
/// If this pipeline contains one command, it is executed in the current
/// shell execution environment.
///
/// If the pipeline has more than one command, every command runs in a
/// subshell, with the standard output of each command connected to the
/// standard input of the next via a pipe. The shell waits for all the
/// children before producing the pipeline's exit status.
///
/// # Exit status
///
/// The exit status of the pipeline is that of the last command. When the
/// `pipefail` option is on, it is instead the status of the rightmost
/// command that exited with a non-zero status, or zero if all succeeded.
/// If the pipeline starts with `!`, the exit status is finally inverted:
/// zero becomes one, and non-zero becomes zero.
///
/// On a system that cannot fork or create pipes, a multi-command pipeline
/// fails with a diagnostic.
impl Command for syntax::Pipeline {
    fn execute(&self, env: &mut Env) -> Result {
        if !self.negation {
            return execute_commands_in_pipeline(env, &self.commands);
        }

        let mut env = env.push_frame(Frame::Condition);
        execute_commands_in_pipeline(&mut env, &self.commands)?;
        env.exit_status = if env.exit_status.is_successful() {
            ExitStatus::FAILURE
        } else {
            ExitStatus::SUCCESS
        };
        Continue(())
    }
}

fn execute_commands_in_pipeline(env: &mut Env, commands: &[Rc<syntax::Command>]) -> Result {
    match commands.len() {
        0 => {
            env.exit_status = ExitStatus::SUCCESS;
            Continue(())
        }
        1 => commands[0].execute(env),
        _ => execute_multi_command_pipeline(env, commands),
    }
}

fn execute_multi_command_pipeline(env: &mut Env, commands: &[Rc<syntax::Command>]) -> Result {
    // Start commands
    let mut commands = commands.iter().cloned().peekable();
    let mut pipes = PipeSet::new();
    let mut pids = Vec::new();
    while let Some(command) = commands.next() {
        let has_next = commands.peek().is_some();
        shift_or_fail(env, &mut pipes, has_next)?;

        let pipes_for_child = pipes;
        let start_result = env.start_subshell(move |env| {
            if let Err(errno) = pipes_for_child.move_to_stdin_stdout(env) {
                print_error(env, &format!("cannot connect pipeline: {errno}"));
                return Break(Divert::Exit(Some(ExitStatus::NOEXEC)));
            }
            command.execute(env)
        });

        pids.push(pid_or_fail(env, &mut pipes, start_result)?);
    }

    shift_or_fail(env, &mut pipes, false)?;

    // Await every child; the last one's status (or the rightmost failure
    // under pipefail) becomes the pipeline's status
    let mut rightmost_failure = None;
    for pid in pids {
        match env.wait_for_subshell(pid) {
            Ok(exit_status) => {
                if !exit_status.is_successful() {
                    rightmost_failure = Some(exit_status);
                }
                env.exit_status = exit_status;
            }
            Err(errno) => {
                print_error(env, &format!("cannot await pipeline command: {errno}"));
                env.exit_status = ExitStatus::NOEXEC;
            }
        }
    }
    if env.options.get(PipeFail) == On {
        env.exit_status = rightmost_failure.unwrap_or(ExitStatus::SUCCESS);
    }
    Continue(())
}

fn shift_or_fail(env: &mut Env, pipes: &mut PipeSet, has_next: bool) -> Result {
    match pipes.shift(env, has_next) {
        Ok(()) => Continue(()),
        Err(errno) => {
            print_error(env, &format!("cannot connect pipeline: {errno}"));
            Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)))
        }
    }
}

fn pid_or_fail(
    env: &mut Env,
    pipes: &mut PipeSet,
    result: std::result::Result<Pid, Errno>,
) -> Result<Pid> {
    match result {
        Ok(pid) => Continue(pid),
        Err(errno) => {
            let _ = pipes.shift(env, false);
            print_error(env, &format!("cannot start pipeline command: {errno}"));
            Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)))
        }
    }
}

/// Set of pipe file descriptors that connect commands.
#[derive(Clone, Copy, Debug, Default)]
struct PipeSet {
    /// Reading end of the pipe from the previous command
    read_previous: Option<Fd>,
    /// Reader and writer to the next command
    next: Option<(Fd, Fd)>,
}

impl PipeSet {
    fn new() -> Self {
        Self::default()
    }

    /// Updates the pipe set for the next command.
    ///
    /// Closes FDs that are no longer necessary and opens a new pipe if
    /// there is a next command.
    fn shift(&mut self, env: &mut Env, has_next: bool) -> std::result::Result<(), Errno> {
        if let Some(fd) = self.read_previous {
            let _ = env.system.close(fd);
        }

        if let Some((reader, writer)) = self.next {
            let _ = env.system.close(writer);
            self.read_previous = Some(reader);
        } else {
            self.read_previous = None;
        }

        self.next = None;
        if has_next {
            self.next = Some(env.system.pipe()?);
        }

        Ok(())
    }

    /// Moves the pipe FDs to stdin/stdout in the child and closes the FDs
    /// that are no longer necessary.
    fn move_to_stdin_stdout(mut self, env: &mut Env) -> std::result::Result<(), Errno> {
        if let Some((reader, writer)) = self.next {
            debug_assert_ne!(reader, writer);

            env.system.close(reader)?;
            if writer != Fd::STDOUT {
                if self.read_previous == Some(Fd::STDOUT) {
                    self.read_previous = Some(env.system.dup(Fd::STDOUT, Fd(0), false)?);
                }
                env.system.dup2(writer, Fd::STDOUT)?;
                env.system.close(writer)?;
            }
        }
        if let Some(reader) = self.read_previous {
            if reader != Fd::STDIN {
                env.system.dup2(reader, Fd::STDIN)?;
                env.system.close(reader)?;
            }
        }
        Ok(())
    }
}
