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

//! Wait built-in.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::job::Pid;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::Env;

/// Entry point of the wait built-in.
///
/// Without operands, all known asynchronous jobs are awaited and the exit
/// status is zero. With process ID operands, the exit status is that of
/// the last awaited process; waiting for a process that is not a child of
/// the shell yields 127.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        env.wait_for_all_jobs();
        return Result::SUCCESS;
    }

    let mut exit_status = ExitStatus::SUCCESS;
    for operand in args {
        let Ok(raw_pid) = operand.value.parse() else {
            return report_error(
                env,
                "wait",
                &format!("`{}` is not a valid process ID", operand.value),
                ExitStatus::ERROR,
            );
        };
        exit_status = match env.wait_for_job(Pid(raw_pid)) {
            Ok(exit_status) => exit_status,
            Err(_) => ExitStatus::NOT_FOUND,
        };
    }
    Result::new(exit_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    #[test]
    fn wait_without_jobs_succeeds() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
    }

    #[test]
    fn waiting_for_unknown_process_yields_127() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["12345"]));
        assert_eq!(result.exit_status(), ExitStatus::NOT_FOUND);
    }

    #[test]
    fn invalid_operand_is_an_error() {
        let (mut env, _state) = builtin_env();
        let result = main(&mut env, Field::fields(["abc"]));
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
    }
}
