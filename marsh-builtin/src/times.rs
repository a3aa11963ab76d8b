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

//! Times built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = seconds - (minutes as f64) * 60.0;
    format!("{minutes}m{rest:.2}s")
}

/// Entry point of the times built-in.
///
/// Prints the accumulated user and system CPU times of the shell and of
/// its children, in the POSIX two-line format.
pub fn main(env: &mut Env, _args: Vec<Field>) -> Result {
    match env.system.times() {
        Ok(times) => {
            let output = format!(
                "{} {}\n{} {}\n",
                format_time(times.self_user),
                format_time(times.self_system),
                format_time(times.children_user),
                format_time(times.children_system),
            );
            let _ = env.system.write_all(Fd::STDOUT, output.as_bytes());
            Result::SUCCESS
        }
        Err(errno) => report_error(
            env,
            "times",
            &format!("cannot read CPU times: {errno}"),
            ExitStatus::FAILURE,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0m0.00s");
        assert_eq!(format_time(1.5), "0m1.50s");
        assert_eq!(format_time(125.25), "2m5.25s");
    }

    #[test]
    fn prints_two_lines() {
        let (mut env, state) = builtin_env();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(state.borrow().stdout(), "0m0.00s 0m0.00s\n0m0.00s 0m0.00s\n");
    }
}
