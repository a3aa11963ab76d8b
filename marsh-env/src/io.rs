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

//! Type definitions for I/O.

use crate::system::SystemEx;
use crate::Env;

#[doc(no_inline)]
pub use marsh_syntax::syntax::Fd;

/// Minimum file descriptor the shell may occupy for its internal use.
///
/// POSIX reserves file descriptors below `MIN_INTERNAL_FD` so the user can
/// use them freely. When the shell needs a file descriptor that is
/// invisible to the user (such as the backup copy of a redirected
/// descriptor), it is kept at `MIN_INTERNAL_FD` or above with the
/// close-on-exec flag set.
pub const MIN_INTERNAL_FD: Fd = Fd(10);

/// Prints an error message to the standard error.
///
/// The message is prefixed with the shell name and terminated with a
/// newline, and is recorded as the [last error](Env::last_error) for
/// programmatic access.
pub fn print_error(env: &mut Env, message: &str) {
    let line = format!("{}: {}\n", env.arg0, message);
    env.last_error = Some(message.to_string());
    let _ = env.system.write_all(Fd::STDERR, line.as_bytes());
}

/// Prints a message to the standard error without recording it.
pub fn print_raw_error(env: &mut Env, message: &str) {
    let _ = env.system.write_all(Fd::STDERR, message.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_error_prefixes_shell_name_and_records_message() {
        let system = crate::system::stub::StubSystem::new();
        let state = std::rc::Rc::clone(&system.state);
        let mut env = Env::with_system(Box::new(system));
        env.arg0 = "marsh".to_string();
        print_error(&mut env, "cannot do the thing");

        assert_eq!(state.borrow().stderr(), "marsh: cannot do the thing\n");
        assert_eq!(env.last_error.as_deref(), Some("cannot do the thing"));
    }
}
