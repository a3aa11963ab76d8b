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

//! Command substitution.

use super::{Error, Result};
use marsh_env::semantics::ExitStatus;
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Runs a command substitution and captures its output.
///
/// The command string runs in a subshell with its standard output connected
/// to a pipe. The captured output has all trailing newlines (and carriage
/// returns) removed. The result carries the exit status of the subshell,
/// which the caller records as the status of the last command substitution.
pub(super) fn expand_command_subst(env: &mut Env, content: &str) -> Result<(String, ExitStatus)> {
    let (reader, writer) = env.system.pipe().map_err(Error::CommandSubst)?;

    let content_owned = content.to_string();
    let start_result = env.start_subshell(move |env| {
        let _ = env.system.close(reader);
        if writer != Fd::STDOUT {
            let _ = env.system.dup2(writer, Fd::STDOUT);
            let _ = env.system.close(writer);
        }
        crate::runner::read_eval_loop(env, &content_owned)
    });

    let pid = match start_result {
        Ok(pid) => pid,
        Err(errno) => {
            let _ = env.system.close(writer);
            let _ = env.system.close(reader);
            return Err(Error::CommandSubst(errno));
        }
    };

    let _ = env.system.close(writer);
    let output = env.system.read_all(reader);
    let _ = env.system.close(reader);
    let exit_status = env
        .wait_for_subshell(pid)
        .map_err(Error::CommandSubst)?;
    let output = output.map_err(Error::CommandSubst)?;

    let mut output = String::from_utf8_lossy(&output).into_owned();
    while output.ends_with('\n') || output.ends_with('\r') {
        output.pop();
    }
    Ok((output, exit_status))
}
