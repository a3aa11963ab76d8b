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

//! Built-in utilities.
//!
//! This module defines the [`Builtin`] struct the command dispatcher
//! executes. The actual utilities live in the `marsh-builtin` crate and are
//! registered into [`Env::builtins`](crate::Env::builtins) on startup.

use crate::semantics::{ExitStatus, Field};
use crate::Env;
use std::ops::ControlFlow;

/// Types of built-in utilities
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Type {
    /// Special built-in
    ///
    /// Special built-in utilities are defined in POSIX XCU section 2.14.
    /// They are found before functions in command search, their variable
    /// assignments persist in the invoking environment, and many of their
    /// errors interrupt the shell.
    Special,

    /// Standard utility implemented in the shell
    ///
    /// Mandatory built-ins can be overridden by functions but are executed
    /// without a `$PATH` search.
    Mandatory,
}

/// Result of built-in utility execution
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[must_use]
pub struct Result {
    exit_status: ExitStatus,
    divert: crate::semantics::Result,
    retains_redirs: bool,
}

impl Result {
    /// Creates a new result with the given exit status.
    pub const fn new(exit_status: ExitStatus) -> Result {
        Result {
            exit_status,
            divert: ControlFlow::Continue(()),
            retains_redirs: false,
        }
    }

    /// Creates a new result with a [`Divert`].
    pub const fn with_exit_status_and_divert(
        exit_status: ExitStatus,
        divert: crate::semantics::Result,
    ) -> Result {
        Result {
            exit_status,
            divert,
            retains_redirs: false,
        }
    }

    /// Returns the exit status.
    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        self.exit_status
    }

    /// Returns the divert, if any.
    #[must_use]
    pub const fn divert(&self) -> crate::semantics::Result {
        self.divert
    }

    /// Declares that the redirections applied to this built-in must not be
    /// undone when the built-in finishes.
    ///
    /// This is used by the `exec` built-in.
    pub fn retain_redirs(&mut self) {
        self.retains_redirs = true;
    }

    /// Whether the applied redirections must be kept in effect.
    #[must_use]
    pub const fn should_retain_redirs(&self) -> bool {
        self.retains_redirs
    }
}

impl From<ExitStatus> for Result {
    fn from(exit_status: ExitStatus) -> Result {
        Result::new(exit_status)
    }
}

impl Result {
    /// Result for a successful execution.
    pub const SUCCESS: Result = Result::new(ExitStatus::SUCCESS);

    /// Result for a failed execution.
    pub const FAILURE: Result = Result::new(ExitStatus::FAILURE);

    /// Result for an execution error.
    ///
    /// If the built-in is a special built-in, an error additionally
    /// interrupts the shell; the dispatcher takes care of that using
    /// [`Divert::Interrupt`](crate::semantics::Divert::Interrupt).
    pub const ERROR: Result = Result::new(ExitStatus::ERROR);
}

/// Type of the function implementing a built-in.
///
/// The arguments do not contain the command name; it has been consumed by
/// the command search. The function must not perform redirections or
/// assignments; the dispatcher has already applied them when the function
/// is called.
pub type Main = fn(&mut Env, Vec<Field>) -> Result;

/// Built-in utility definition
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Builtin {
    /// Type of the built-in, which affects command search and error
    /// severity
    pub r#type: Type,
    /// Function implementing the built-in
    pub execute: Main,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_accessors() {
        let mut result = Result::new(ExitStatus(5));
        assert_eq!(result.exit_status(), ExitStatus(5));
        assert_eq!(result.divert(), ControlFlow::Continue(()));
        assert!(!result.should_retain_redirs());

        result.retain_redirs();
        assert!(result.should_retain_redirs());
    }

    #[test]
    fn result_with_divert() {
        use crate::semantics::Divert;
        let result = Result::with_exit_status_and_divert(
            ExitStatus(7),
            ControlFlow::Break(Divert::Return(None)),
        );
        assert_eq!(result.exit_status(), ExitStatus(7));
        assert_eq!(result.divert(), ControlFlow::Break(Divert::Return(None)));
    }
}
