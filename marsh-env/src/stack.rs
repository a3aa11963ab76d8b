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

//! Runtime execution context stack
//!
//! The [`Stack`] traces the state of execution context at runtime. For
//! example, when entering a loop, the engine pushes [`Frame::Loop`] to the
//! stack; the `break` and `continue` built-ins examine the stack to
//! validate their operands.
//!
//! This module provides guards to ensure stack frames are pushed and popped
//! correctly. The push function returns a guard that will pop the frame
//! when dropped. Implementing `Deref` and `DerefMut`, the guard allows
//! access to the borrowed environment.

use crate::semantics::ExitStatus;
use crate::semantics::Field;
use crate::Env;
use std::ops::Deref;
use std::ops::DerefMut;

/// Element of the runtime execution context stack
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Frame {
    /// For, while, or until loop
    Loop,

    /// Subshell
    Subshell,

    /// Context where the `ErrExit` option is ignored
    ///
    /// This frame is pushed when executing negated commands, the condition
    /// part of and-or lists, and the conditions of `if`, `while`, and
    /// `until` commands.
    Condition,

    /// Built-in utility
    Builtin {
        /// Name of the built-in
        name: Field,
        /// Whether the utility acts as a special built-in
        is_special: bool,
    },

    /// Trap action
    Trap {
        /// Exit status saved just before entering the trap
        previous_exit_status: ExitStatus,
    },
}

/// Runtime execution context stack
///
/// You can access the inner vector of the stack via the `Deref`
/// implementation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Stack {
    inner: Vec<Frame>,
}

impl Deref for Stack {
    type Target = Vec<Frame>;
    fn deref(&self) -> &Vec<Frame> {
        &self.inner
    }
}

impl Stack {
    /// Returns the number of enclosing loops.
    ///
    /// This function returns the number of `Frame::Loop`s pushed after the
    /// last `Frame::Subshell`, that is, the loops the current context can
    /// `break` out of. The function stops counting when `max_count` is
    /// reached.
    #[must_use]
    pub fn loop_count(&self, max_count: usize) -> usize {
        self.inner
            .iter()
            .rev()
            .take_while(|&frame| frame != &Frame::Subshell)
            .filter(|&frame| frame == &Frame::Loop)
            .take(max_count)
            .count()
    }
}

/// RAII-style guard that makes sure a stack frame is popped properly
///
/// The guard object is created by [`Env::push_frame`].
#[derive(Debug)]
#[must_use = "the frame is popped when the guard is dropped"]
pub struct EnvFrameGuard<'a> {
    env: &'a mut Env,
}

impl Env {
    /// Pushes a new frame to the runtime execution context stack.
    ///
    /// This function returns an `EnvFrameGuard` that will pop the frame
    /// when dropped and allows re-borrowing the `Env`.
    #[inline]
    pub fn push_frame(&mut self, frame: Frame) -> EnvFrameGuard<'_> {
        self.stack.inner.push(frame);
        EnvFrameGuard { env: self }
    }
}

/// When the guard is dropped, the stack frame that was pushed when creating
/// the guard is popped.
impl Drop for EnvFrameGuard<'_> {
    fn drop(&mut self) {
        self.env.stack.inner.pop().unwrap();
    }
}

impl Deref for EnvFrameGuard<'_> {
    type Target = Env;
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for EnvFrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}
