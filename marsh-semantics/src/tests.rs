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

//! Utilities for unit tests.

use marsh_env::builtin::{Builtin, Main, Type};
use marsh_env::semantics::{Divert, ExitStatus, Field};
use marsh_env::system::stub::{StubSystem, SystemState};
use marsh_env::system::SystemEx;
use marsh_env::variable::Scope;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;
use std::cell::RefCell;
use std::ops::ControlFlow::Break;
use std::rc::Rc;

/// Creates an environment backed by a stub system, returning the shared
/// system state for inspection.
pub fn stub_env() -> (Env, Rc<RefCell<SystemState>>) {
    let system = StubSystem::new();
    let state = Rc::clone(&system.state);
    let mut env = Env::with_system(Box::new(system));
    env.arg0 = "marsh".to_string();
    (env, state)
}

fn builtin(r#type: Type, execute: Main) -> Builtin {
    Builtin { r#type, execute }
}

fn echo_main(env: &mut Env, args: Vec<Field>) -> marsh_env::builtin::Result {
    let mut line = args
        .iter()
        .map(|field| &field.value[..])
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    let _ = env.system.write_all(Fd::STDOUT, line.as_bytes());
    marsh_env::builtin::Result::SUCCESS
}

/// Returns a minimal `echo` that writes its arguments to the standard
/// output.
pub fn echo_builtin() -> Builtin {
    builtin(Type::Mandatory, echo_main)
}

fn return_main(_env: &mut Env, mut args: Vec<Field>) -> marsh_env::builtin::Result {
    let no_divert = args.first().is_some_and(|field| field.value == "-n");
    if no_divert {
        args.remove(0);
    }
    let exit_status = args
        .first()
        .and_then(|field| field.value.parse().ok())
        .map(ExitStatus)
        .unwrap_or(ExitStatus::SUCCESS);
    if no_divert {
        marsh_env::builtin::Result::new(exit_status)
    } else {
        marsh_env::builtin::Result::with_exit_status_and_divert(
            exit_status,
            Break(Divert::Return(Some(exit_status))),
        )
    }
}

/// Returns a `return` built-in for tests.
///
/// With the `-n` option, the built-in only sets the exit status. Without
/// it, the result carries a `Divert::Return`.
pub fn return_builtin() -> Builtin {
    builtin(Type::Special, return_main)
}

fn break_main(_env: &mut Env, args: Vec<Field>) -> marsh_env::builtin::Result {
    let count: usize = args
        .first()
        .and_then(|field| field.value.parse().ok())
        .unwrap_or(1);
    marsh_env::builtin::Result::with_exit_status_and_divert(
        ExitStatus::SUCCESS,
        Break(Divert::Break { count: count - 1 }),
    )
}

/// Returns a `break` built-in for tests.
pub fn break_builtin() -> Builtin {
    builtin(Type::Special, break_main)
}

fn continue_main(_env: &mut Env, args: Vec<Field>) -> marsh_env::builtin::Result {
    let count: usize = args
        .first()
        .and_then(|field| field.value.parse().ok())
        .unwrap_or(1);
    marsh_env::builtin::Result::with_exit_status_and_divert(
        ExitStatus::SUCCESS,
        Break(Divert::Continue { count: count - 1 }),
    )
}

/// Returns a `continue` built-in for tests.
pub fn continue_builtin() -> Builtin {
    builtin(Type::Special, continue_main)
}

fn countdown_main(env: &mut Env, _args: Vec<Field>) -> marsh_env::builtin::Result {
    let remaining: i32 = env
        .variables
        .get_scalar("countdown")
        .and_then(|value| value.parse().ok())
        .unwrap_or(3);
    if remaining > 0 {
        let _ = env
            .variables
            .get_or_new("countdown", Scope::Global)
            .assign((remaining - 1).to_string());
        marsh_env::builtin::Result::SUCCESS
    } else {
        marsh_env::builtin::Result::FAILURE
    }
}

/// Returns a built-in that succeeds three times and then fails, for
/// driving loops in tests.
pub fn countdown_builtin() -> Builtin {
    builtin(Type::Mandatory, countdown_main)
}
