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

//! Type definitions for command execution.

use std::ops::ControlFlow;
use std::process::ExitCode;
use std::process::Termination;

/// Resultant string of word expansion.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Field {
    /// String value of the field.
    pub value: String,
}

impl Field {
    /// Creates a new field.
    #[inline]
    pub fn new<S: Into<String>>(value: S) -> Field {
        Field {
            value: value.into(),
        }
    }

    /// Creates an array of fields.
    pub fn fields<I, S>(values: I) -> Vec<Field>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values.into_iter().map(Self::new).collect()
    }
}

impl<S: Into<String>> From<S> for Field {
    fn from(value: S) -> Field {
        Field::new(value)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

/// Number that summarizes the result of command execution.
///
/// An exit status is an integer returned from a utility (or command) when
/// executed. In the shell language, the special parameter `$?` expands to
/// the exit status of the last executed command. Exit statuses also affect
/// the behavior of compound commands.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExitStatus(pub i32);

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i32> for ExitStatus {
    fn from(value: i32) -> ExitStatus {
        ExitStatus(value)
    }
}

impl From<ExitStatus> for i32 {
    fn from(exit_status: ExitStatus) -> i32 {
        exit_status.0
    }
}

impl ExitStatus {
    /// Exit status of 0: success
    pub const SUCCESS: ExitStatus = ExitStatus(0);

    /// Exit status of 1: failure
    pub const FAILURE: ExitStatus = ExitStatus(1);

    /// Exit status of 2: error severer than failure
    pub const ERROR: ExitStatus = ExitStatus(2);

    /// Exit status of 126: command found but not executable
    pub const NOEXEC: ExitStatus = ExitStatus(126);

    /// Exit status of 127: command not found
    pub const NOT_FOUND: ExitStatus = ExitStatus(127);

    /// Returns true if and only if `self` is zero.
    #[must_use]
    pub const fn is_successful(&self) -> bool {
        self.0 == 0
    }

    /// Converts a signal number to the exit status of a command killed by
    /// the signal, which is the signal number plus 128.
    #[must_use]
    pub const fn from_signal(signal: i32) -> ExitStatus {
        ExitStatus(signal + 0x80)
    }

    /// Returns the signal number if this exit status denotes a command
    /// killed by a signal.
    #[must_use]
    pub const fn to_signal(self) -> Option<i32> {
        if self.0 > 0x80 && self.0 < 0x80 + 0x40 {
            Some(self.0 - 0x80)
        } else {
            None
        }
    }
}

/// Converts the exit status to `ExitCode`.
///
/// Note that `ExitCode` only supports exit statuses in the range of 0 to
/// 255. Only the lowest 8 bits of the exit status are used in the
/// conversion.
impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        (self.0 as u8).into()
    }
}

/// Result of interrupted command execution.
///
/// `Divert` implements `Ord`. Values are ordered by severity.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Divert {
    /// Continue the current loop.
    Continue {
        /// Number of loops to break before continuing.
        ///
        /// `0` for continuing the innermost loop, `1` for one-level outer,
        /// and so on.
        count: usize,
    },

    /// Break the current loop.
    Break {
        /// Number of loops to break.
        ///
        /// `0` for breaking the innermost loop, `1` for one-level outer,
        /// and so on.
        count: usize,
    },

    /// Return from the current function or script.
    Return(Option<ExitStatus>),

    /// Interrupt the current shell execution environment.
    ///
    /// This is the result of an error in a special built-in or a failed
    /// expansion. It makes a non-interactive shell exit after executing the
    /// EXIT trap.
    Interrupt(Option<ExitStatus>),

    /// Exit from the current shell execution environment.
    ///
    /// This makes the shell exit after executing the EXIT trap, if any.
    Exit(Option<ExitStatus>),
}

impl Divert {
    /// Returns the exit status associated with the `Divert`.
    ///
    /// Returns the variant's value if `self` is `Return`, `Interrupt`, or
    /// `Exit`; otherwise, `None`.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        use Divert::*;
        match self {
            Continue { .. } | Break { .. } => None,
            Return(exit_status) | Interrupt(exit_status) | Exit(exit_status) => *exit_status,
        }
    }
}

/// Result of command execution.
///
/// If the command was interrupted in the middle of execution, the result
/// value will be a `Break` having a [`Divert`] value which specifies what to
/// execute next.
pub type Result<T = ()> = ControlFlow<Divert, T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_from_signal() {
        assert_eq!(ExitStatus::from_signal(2), ExitStatus(130));
        assert_eq!(ExitStatus::from_signal(15), ExitStatus(143));
    }

    #[test]
    fn exit_status_to_signal() {
        assert_eq!(ExitStatus(130).to_signal(), Some(2));
        assert_eq!(ExitStatus(0).to_signal(), None);
        assert_eq!(ExitStatus(1).to_signal(), None);
        assert_eq!(ExitStatus(128).to_signal(), None);
    }

    #[test]
    fn divert_severity_order() {
        assert!(Divert::Continue { count: 0 } < Divert::Break { count: 0 });
        assert!(Divert::Break { count: 0 } < Divert::Return(None));
        assert!(Divert::Return(None) < Divert::Interrupt(None));
        assert!(Divert::Interrupt(None) < Divert::Exit(None));
    }

    #[test]
    fn divert_exit_status() {
        assert_eq!(Divert::Continue { count: 1 }.exit_status(), None);
        assert_eq!(
            Divert::Exit(Some(ExitStatus(42))).exit_status(),
            Some(ExitStatus(42))
        );
    }
}
