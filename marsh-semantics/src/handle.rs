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

//! Error handling in the shell semantics.

use marsh_env::io::print_error;
use marsh_env::semantics::{Divert, ExitStatus, Result};
use marsh_env::stack::Frame;
use marsh_env::Env;
use std::ops::ControlFlow::{Break, Continue};

/// Error that the shell can recover from by printing a diagnostic.
///
/// An error of this kind aborts the current command but does not
/// necessarily halt the shell: handling it prints a single-line message to
/// the standard error, sets the exit status, and decides whether the shell
/// should be interrupted depending on the context.
pub trait Handle {
    /// Prints a diagnostic and returns how execution should proceed.
    fn handle(&self, env: &mut Env) -> Result;
}

/// Handles an error that interrupts the current command.
///
/// This is the common implementation of [`Handle`]: the message is printed,
/// the exit status is set to `exit_status`, and the result interrupts the
/// shell if the error occurred in a special built-in context.
pub fn handle_error(env: &mut Env, message: &str, exit_status: ExitStatus) -> Result {
    print_error(env, message);
    env.exit_status = exit_status;
    let in_special_builtin = env
        .stack
        .iter()
        .rev()
        .any(|frame| matches!(frame, Frame::Builtin { is_special: true, .. }));
    if in_special_builtin && !env.is_interactive() {
        Break(Divert::Interrupt(Some(exit_status)))
    } else {
        Continue(())
    }
}

impl Handle for crate::expansion::Error {
    /// Prints the message and sets the exit status to
    /// [`ExitStatus::FAILURE`].
    ///
    /// An expansion error in a non-interactive shell interrupts execution,
    /// as POSIX requires for expansion failures.
    fn handle(&self, env: &mut Env) -> Result {
        print_error(env, &self.to_string());
        env.exit_status = ExitStatus::FAILURE;
        if env.is_interactive() {
            Continue(())
        } else {
            Break(Divert::Interrupt(Some(ExitStatus::FAILURE)))
        }
    }
}

impl Handle for crate::redir::Error {
    /// Prints the message and sets the exit status to
    /// [`ExitStatus::FAILURE`].
    fn handle(&self, env: &mut Env) -> Result {
        handle_error(env, &self.to_string(), ExitStatus::FAILURE)
    }
}

impl Handle for crate::assign::Error {
    /// Prints the message and sets the exit status to
    /// [`ExitStatus::FAILURE`].
    fn handle(&self, env: &mut Env) -> Result {
        handle_error(env, &self.to_string(), ExitStatus::FAILURE)
    }
}
