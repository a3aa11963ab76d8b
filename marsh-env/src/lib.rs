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

//! This crate defines the shell execution environment.
//!
//! A shell execution environment is a collection of data that may affect or
//! be affected by the execution of commands. The environment consists of
//! application-managed parts and system-managed parts. Application-managed
//! parts are implemented in pure Rust in this crate: [variables](variable),
//! [functions](function), [aliases](marsh_syntax::alias), [traps](trap),
//! [jobs](job), [options](option), and the execution [stack]. System-managed
//! parts such as file descriptors and child processes are accessed through
//! the [`System`](system::System) trait.
//!
//! The whole environment is the [`Env`] struct, which is passed `&mut`
//! through the interpreter's call tree. There is no global state.

pub mod builtin;
pub mod io;
pub mod job;
pub mod option;
pub mod semantics;
pub mod signal;
pub mod stack;
pub mod subshell;
pub mod system;
pub mod trap;
pub mod variable;

use self::builtin::Builtin;
use self::function::FunctionSet;
use self::job::JobSet;
use self::job::Pid;
use self::option::{Off, On, OptionSet};
use self::semantics::{Divert, ExitStatus};
use self::stack::{Frame, Stack};
use self::system::System;
use self::trap::TrapSet;
use self::variable::{ContextType, Scope, VariableRefMut, VariableSet};
use marsh_syntax::alias::AliasSet;
use std::collections::HashMap;
use std::ops::ControlFlow::{Break, Continue};
use std::ops::Deref;
use std::ops::DerefMut;

pub mod function;

/// Whole shell execution environment.
///
/// The application-managed parts are directly implemented in the `Env`
/// instance. The system-managed parts are accessed through
/// [`system`](Self::system).
#[derive(Debug)]
pub struct Env {
    /// Name the shell was invoked as, used as `$0` and in diagnostics
    pub arg0: String,

    /// Aliases defined in the environment
    pub aliases: AliasSet,

    /// Built-in utilities available in the environment
    pub builtins: HashMap<&'static str, Builtin>,

    /// Exit status of the last executed command
    pub exit_status: ExitStatus,

    /// Functions defined in the environment
    pub functions: FunctionSet,

    /// Jobs started by the environment
    pub jobs: JobSet,

    /// Message of the last error printed by the shell
    pub last_error: Option<String>,

    /// Process ID of the main shell process
    ///
    /// This is the value of the special parameter `$$`, which does not
    /// change in subshells.
    pub main_pid: Pid,

    /// Shell options
    pub options: OptionSet,

    /// Runtime execution context stack
    pub stack: Stack,

    /// Traps defined in the environment
    pub traps: TrapSet,

    /// Variables and positional parameters defined in the environment
    pub variables: VariableSet,

    /// Interface to the system-managed parts of the environment
    pub system: Box<dyn System>,
}

impl Env {
    /// Creates a new environment with the given system.
    pub fn with_system(system: Box<dyn System>) -> Env {
        let main_pid = system.getpid();
        Env {
            arg0: String::new(),
            aliases: Default::default(),
            builtins: Default::default(),
            exit_status: Default::default(),
            functions: Default::default(),
            jobs: Default::default(),
            last_error: None,
            main_pid,
            options: Default::default(),
            stack: Default::default(),
            traps: Default::default(),
            variables: Default::default(),
            system,
        }
    }

    /// Creates a new environment backed by an in-memory
    /// [stub system](system::stub::StubSystem), for testing.
    #[must_use]
    pub fn new_stub() -> Env {
        Env::with_system(Box::new(system::stub::StubSystem::new()))
    }

    /// Gets a mutable reference to the variable with the specified name,
    /// creating one if none is visible.
    ///
    /// This is a thin wrapper around [`VariableSet::get_or_new`] that
    /// additionally applies the `AllExport` option.
    pub fn get_or_create_variable<S: Into<String>>(
        &mut self,
        name: S,
        scope: Scope,
    ) -> VariableRefMut {
        let export = self.options.get(option::AllExport) == On;
        let mut variable = self.variables.get_or_new(name, scope);
        if export {
            variable.export(true);
        }
        variable
    }

    /// Pushes a new variable context and returns a guard that pops it when
    /// dropped.
    pub fn push_context(&mut self, r#type: ContextType) -> EnvContextGuard<'_> {
        self.variables.push_context(r#type.into());
        EnvContextGuard { env: self }
    }

    /// Whether the shell is interactive.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.options.get(option::Interactive) == On
    }

    /// Applies the `ErrExit` option to the current exit status.
    ///
    /// If the option is on, the exit status is non-zero, and the current
    /// context is not a [condition](Frame::Condition), the result is a
    /// divert that makes the shell exit. Otherwise, the result is
    /// `Continue(())`.
    pub fn apply_errexit(&self) -> semantics::Result {
        if self.options.get(option::ErrExit) == Off
            || self.exit_status.is_successful()
            || self.stack.contains(&Frame::Condition)
        {
            Continue(())
        } else {
            Break(Divert::Exit(None))
        }
    }
}

/// RAII-style guard that pops a variable context when dropped.
///
/// The guard is created by [`Env::push_context`] and implements
/// `DerefMut<Target = Env>`.
#[derive(Debug)]
#[must_use = "the context is popped when the guard is dropped"]
pub struct EnvContextGuard<'a> {
    env: &'a mut Env,
}

impl Drop for EnvContextGuard<'_> {
    fn drop(&mut self) {
        self.env.variables.pop_context();
    }
}

impl Deref for EnvContextGuard<'_> {
    type Target = Env;
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for EnvContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::State;

    #[test]
    fn push_context_guard_pops_on_drop() {
        let mut env = Env::new_stub();
        assert_eq!(env.variables.context_count(), 1);
        {
            let mut guard = env.push_context(ContextType::Volatile);
            assert_eq!(guard.variables.context_count(), 2);
            guard
                .variables
                .get_or_new("foo", Scope::Volatile)
                .assign("x")
                .unwrap();
        }
        assert_eq!(env.variables.context_count(), 1);
        assert_eq!(env.variables.get("foo"), None);
    }

    #[test]
    fn get_or_create_variable_applies_allexport() {
        let mut env = Env::new_stub();
        env.get_or_create_variable("plain", Scope::Global)
            .assign("1")
            .unwrap();
        assert!(!env.variables.get("plain").unwrap().is_exported);

        env.options.set(option::AllExport, State::On);
        env.get_or_create_variable("auto", Scope::Global)
            .assign("2")
            .unwrap();
        assert!(env.variables.get("auto").unwrap().is_exported);
    }

    #[test]
    fn apply_errexit_requires_option_and_failure() {
        let mut env = Env::new_stub();
        env.exit_status = ExitStatus::FAILURE;
        assert_eq!(env.apply_errexit(), Continue(()));

        env.options.set(option::ErrExit, State::On);
        assert_eq!(env.apply_errexit(), Break(Divert::Exit(None)));

        env.exit_status = ExitStatus::SUCCESS;
        assert_eq!(env.apply_errexit(), Continue(()));
    }

    #[test]
    fn apply_errexit_is_suppressed_in_condition_context() {
        let mut env = Env::new_stub();
        env.options.set(option::ErrExit, State::On);
        env.exit_status = ExitStatus::FAILURE;

        let env = env.push_frame(Frame::Condition);
        assert_eq!(env.apply_errexit(), Continue(()));
    }
}
