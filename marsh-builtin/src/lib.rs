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

//! Built-in utilities of the shell.
//!
//! This crate implements the POSIX special built-ins and a set of mandatory
//! utilities. Each utility lives in its own module and exposes a `main`
//! function with the [`Main`](marsh_env::builtin::Main) signature; the
//! argument vector does not include the utility name.
//!
//! [`register_builtins`] inserts all of them into an environment. The
//! dispatcher in `marsh-semantics` is responsible for the differences in
//! how special and mandatory built-ins are invoked (assignment persistence,
//! error severity); the implementations here only do their job and report
//! results.

use marsh_env::builtin::Builtin;
use marsh_env::builtin::Type::{Mandatory, Special};
use marsh_env::io::print_error;
use marsh_env::semantics::ExitStatus;
use marsh_env::Env;

pub mod alias;
pub mod basename;
pub mod r#break;
pub mod cd;
pub mod colon;
pub mod r#continue;
pub mod dirname;
pub mod dot;
pub mod echo;
pub mod eval;
pub mod exec;
pub mod exit;
pub mod export;
pub mod jobs;
pub mod printf;
pub mod pwd;
pub mod readonly;
pub mod r#return;
pub mod set;
pub mod shift;
pub mod test;
pub mod times;
pub mod trap;
pub mod r#true;
pub mod unalias;
pub mod unset;
pub mod wait;

/// Registers all built-ins in the environment.
pub fn register_builtins(env: &mut Env) {
    let special = [
        (":", colon::main as marsh_env::builtin::Main),
        (".", dot::main),
        ("break", r#break::main),
        ("continue", r#continue::main),
        ("eval", eval::main),
        ("exec", exec::main),
        ("exit", exit::main),
        ("export", export::main),
        ("readonly", readonly::main),
        ("return", r#return::main),
        ("set", set::main),
        ("shift", shift::main),
        ("times", times::main),
        ("trap", trap::main),
        ("unset", unset::main),
    ];
    for (name, execute) in special {
        env.builtins.insert(
            name,
            Builtin {
                r#type: Special,
                execute,
            },
        );
    }

    let mandatory = [
        ("alias", alias::main as marsh_env::builtin::Main),
        ("basename", basename::main),
        ("cd", cd::main),
        ("dirname", dirname::main),
        ("echo", echo::main),
        ("false", r#true::false_main),
        ("jobs", jobs::main),
        ("printf", printf::main),
        ("pwd", pwd::main),
        ("test", test::main),
        ("[", test::bracket_main),
        ("true", r#true::main),
        ("unalias", unalias::main),
        ("wait", wait::main),
    ];
    for (name, execute) in mandatory {
        env.builtins.insert(
            name,
            Builtin {
                r#type: Mandatory,
                execute,
            },
        );
    }
}

/// Reports a usage or runtime error of a built-in.
///
/// The diagnostic has the form `NAME: MESSAGE` and the returned result
/// carries the given exit status.
pub(crate) fn report_error(
    env: &mut Env,
    name: &str,
    message: &str,
    exit_status: ExitStatus,
) -> marsh_env::builtin::Result {
    print_error(env, &format!("{name}: {message}"));
    marsh_env::builtin::Result::new(exit_status)
}
