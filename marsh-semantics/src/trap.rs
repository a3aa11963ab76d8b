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

//! Running trap actions.
//!
//! Signal delivery only sets a flag in the signal handler; the engine runs
//! the corresponding trap actions *between* commands by calling
//! [`run_traps_for_caught_signals`]. A trap action is itself a command
//! string, parsed and executed like any other input; the exit status in
//! effect before the trap is restored afterwards so `$?` is unchanged by
//! the interruption.

use marsh_env::semantics::Result;
use marsh_env::stack::Frame;
use marsh_env::trap::{Action, Condition};
use marsh_env::Env;
use std::ops::ControlFlow::Continue;

/// Runs the trap actions for the signals caught since the last call.
///
/// Trap actions do not run while another trap action is running.
pub fn run_traps_for_caught_signals(env: &mut Env) -> Result {
    let signals = env.system.caught_signals();
    if signals.is_empty() {
        return Continue(());
    }
    if env.stack.iter().any(|frame| matches!(frame, Frame::Trap { .. })) {
        return Continue(());
    }

    for signal in signals {
        let action = env.traps.get_action(Condition::Signal(signal)).clone();
        if let Action::Command(command) = action {
            run_trap(env, &command)?;
        }
    }
    Continue(())
}

/// Runs one trap action, restoring the exit status afterwards.
fn run_trap(env: &mut Env, command: &str) -> Result {
    let previous_exit_status = env.exit_status;
    let mut env = env.push_frame(Frame::Trap {
        previous_exit_status,
    });
    let result = crate::runner::read_eval_loop(&mut env, command);
    env.exit_status = previous_exit_status;
    result
}

/// Runs the EXIT trap, if set.
///
/// This is called once when the shell is about to exit, either normally or
/// through the `exit` special built-in. The action is cleared before it
/// runs so an `exit` inside the action cannot re-trigger it.
pub fn run_exit_trap(env: &mut Env) {
    let action = env.traps.get_action(Condition::Exit).clone();
    if let Action::Command(command) = action {
        let _ = env
            .traps
            .set_action(&mut env.system, Condition::Exit, Action::Default);
        let previous_exit_status = env.exit_status;
        let mut env = env.push_frame(Frame::Trap {
            previous_exit_status,
        });
        let _ = crate::runner::read_eval_loop(&mut env, &command);
        env.exit_status = previous_exit_status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{echo_builtin, stub_env};
    use marsh_env::semantics::ExitStatus;

    #[test]
    fn caught_signal_runs_trap_action() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.traps
            .set_action(
                &mut env.system,
                Condition::Signal(libc::SIGUSR1),
                Action::Command("echo trapped".into()),
            )
            .unwrap();
        state.borrow_mut().raise_signal(libc::SIGUSR1);

        let result = run_traps_for_caught_signals(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(state.borrow().stdout(), "trapped\n");
    }

    #[test]
    fn trap_preserves_exit_status() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.exit_status = ExitStatus(42);
        env.traps
            .set_action(
                &mut env.system,
                Condition::Signal(libc::SIGUSR1),
                Action::Command("echo $?".into()),
            )
            .unwrap();
        state.borrow_mut().raise_signal(libc::SIGUSR1);

        run_traps_for_caught_signals(&mut env);
        // The trap sees the pre-trap exit status, and the status is
        // restored afterwards
        assert_eq!(state.borrow().stdout(), "42\n");
        assert_eq!(env.exit_status, ExitStatus(42));
    }

    #[test]
    fn uncaught_signals_do_nothing() {
        let (mut env, state) = stub_env();
        let result = run_traps_for_caught_signals(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(state.borrow().stdout(), "");
    }

    #[test]
    fn exit_trap_runs_once() {
        let (mut env, state) = stub_env();
        env.builtins.insert("echo", echo_builtin());
        env.traps
            .set_action(
                &mut env.system,
                Condition::Exit,
                Action::Command("echo bye".into()),
            )
            .unwrap();

        run_exit_trap(&mut env);
        run_exit_trap(&mut env);
        assert_eq!(state.borrow().stdout(), "bye\n");
    }
}
