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

//! Starting subshells.
//!
//! A subshell is a child process executing part of the shell program. On a
//! fork-capable system the child inherits a copy of the whole environment,
//! so the task closure simply continues running in the child with the same
//! `Env`. Systems that cannot fork report `ENOSYS`, which callers surface
//! as a "not supported" error.
//!
//! The child entered through [`Env::start_subshell`] never returns to the
//! caller's code: after the task finishes, the child exits with the task's
//! exit status. Every started subshell must eventually be waited for,
//! either directly with [`Env::wait_for_subshell`] or through the job set.

use crate::job::Pid;
use crate::semantics::{ExitStatus, Result as ExecResult};
use crate::stack::Frame;
use crate::system::{Errno, ForkResult};
use crate::trap::SignalSystem;
use crate::Env;
use std::ops::ControlFlow::{Break, Continue};

impl SignalSystem for Box<dyn crate::system::System> {
    fn set_disposition(
        &mut self,
        signal: i32,
        disposition: crate::system::Disposition,
    ) -> Result<crate::system::Disposition, Errno> {
        self.sigaction(signal, disposition)
    }
}

impl Env {
    /// Starts a subshell running the given task.
    ///
    /// In the parent, this function returns the child's process ID without
    /// waiting. In the child, the task runs in a fresh [`Frame::Subshell`]
    /// context with traps reset and jobs disowned, and the child exits with
    /// the resulting status.
    pub fn start_subshell<F>(&mut self, task: F) -> Result<Pid, Errno>
    where
        F: FnOnce(&mut Env) -> ExecResult,
    {
        match self.system.fork()? {
            ForkResult::Parent { child } => Ok(child),
            ForkResult::Child => {
                self.traps.enter_subshell(&mut self.system);
                self.jobs.disown_all();
                let result = {
                    let mut env = self.push_frame(Frame::Subshell);
                    task(&mut env)
                };
                let exit_status = match result {
                    Continue(()) => self.exit_status,
                    Break(divert) => divert.exit_status().unwrap_or(self.exit_status),
                };
                self.system.exit(exit_status)
            }
        }
    }

    /// Waits for a subshell to finish and returns its exit status.
    ///
    /// A child killed by a signal yields an exit status of 128 plus the
    /// signal number.
    pub fn wait_for_subshell(&mut self, pid: Pid) -> Result<ExitStatus, Errno> {
        loop {
            match self.system.wait(pid, true)? {
                Some((_, state)) if state.is_final() => return Ok(state.to_exit_status()),
                _ => (),
            }
        }
    }

    /// Runs a task in a subshell and waits for it to finish.
    pub fn run_in_subshell<F>(&mut self, task: F) -> Result<ExitStatus, Errno>
    where
        F: FnOnce(&mut Env) -> ExecResult,
    {
        let pid = self.start_subshell(task)?;
        self.wait_for_subshell(pid)
    }

    /// Updates the job set with any state changes of child processes.
    ///
    /// This polls the system without blocking. It is called between
    /// commands so that finished asynchronous jobs are reaped promptly.
    pub fn reap_jobs(&mut self) {
        loop {
            match self.system.wait(Pid::ALL, false) {
                Ok(Some((pid, state))) => {
                    self.jobs.update_state(pid, state);
                }
                Ok(None) | Err(_) => break,
            }
        }
    }

    /// Waits for the job with the given process ID to finish and returns
    /// its exit status, removing it from the job set.
    ///
    /// If the process is not a child of this shell, the result is
    /// `Err(Errno::ECHILD)`.
    pub fn wait_for_job(&mut self, pid: Pid) -> Result<ExitStatus, Errno> {
        use crate::job::JobState;
        // Consult the recorded state first in case the job was already
        // reaped by reap_jobs
        if let Some(index) = self.jobs.find_by_pid(pid) {
            let state = self
                .jobs
                .iter()
                .find(|&(i, _)| i == index)
                .map(|(_, job)| job.state);
            if let Some(JobState::Done(exit_status)) = state {
                self.jobs.remove(index);
                return Ok(exit_status);
            }
        }
        let exit_status = self.wait_for_subshell(pid)?;
        if let Some(index) = self.jobs.find_by_pid(pid) {
            self.jobs.remove(index);
        }
        Ok(exit_status)
    }

    /// Waits for all known jobs to finish.
    pub fn wait_for_all_jobs(&mut self) {
        let pids: Vec<Pid> = self.jobs.iter().map(|(_, job)| job.pid).collect();
        for pid in pids {
            let _ = self.wait_for_job(pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_subshell_without_fork_support_fails() {
        let mut env = Env::new_stub();
        let result = env.start_subshell(|_env| Continue(()));
        assert_eq!(result.unwrap_err(), Errno::ENOSYS);
    }

    #[test]
    fn reap_jobs_without_children_is_a_no_op() {
        let mut env = Env::new_stub();
        env.reap_jobs();
        assert!(env.jobs.is_empty());
    }
}
