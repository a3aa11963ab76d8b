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

//! Job management.
//!
//! A [`Job`] tracks one asynchronous command: the process ID of the child
//! the shell forked for it, its last observed state, and the source text
//! used by the `jobs` built-in. Jobs are stored in a [`JobSet`], which also
//! remembers the process ID the special parameter `$!` expands to.
//!
//! Jobs are updated when the engine reaps children between commands and by
//! the `wait` built-in. A job whose process has been reported as finished
//! by `jobs` or waited for is removed from the set.

use crate::semantics::ExitStatus;
use crate::system::ChildState;
use slab::Slab;

/// Process ID.
///
/// This is a thin wrapper around a raw process ID so that process IDs are
/// not confused with other integers.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Pid(pub i32);

impl Pid {
    /// Pseudo process ID denoting all child processes in a wait operation.
    pub const ALL: Pid = Pid(-1);
}

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// State of a job as the shell knows it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobState {
    /// The process has not been reported as finished or stopped.
    Running,
    /// The process was stopped by the given signal.
    Stopped(i32),
    /// The process finished with the given exit status.
    Done(ExitStatus),
}

impl From<ChildState> for JobState {
    fn from(state: ChildState) -> JobState {
        match state {
            ChildState::Exited(exit_status) => JobState::Done(exit_status),
            ChildState::Signaled(signal) => JobState::Done(ExitStatus::from_signal(signal)),
            ChildState::Stopped(signal) => JobState::Stopped(signal),
            ChildState::Continued => JobState::Running,
        }
    }
}

/// Set of processes executing an asynchronous command.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct Job {
    /// Process ID
    pub pid: Pid,
    /// Last observed state of the process
    pub state: JobState,
    /// Whether the current state has been reported to the user
    pub state_reported: bool,
    /// String representation of the command
    pub name: String,
}

impl Job {
    /// Creates a new running job.
    #[must_use]
    pub fn new(pid: Pid) -> Job {
        Job {
            pid,
            state: JobState::Running,
            state_reported: false,
            name: String::new(),
        }
    }
}

/// Collection of jobs.
#[derive(Clone, Debug, Default)]
pub struct JobSet {
    jobs: Slab<Job>,
    /// Process ID of the most recently started asynchronous command
    last_async_pid: Option<Pid>,
}

impl JobSet {
    /// Creates an empty job set.
    #[must_use]
    pub fn new() -> JobSet {
        Default::default()
    }

    /// Adds a job, returning its index.
    pub fn add(&mut self, job: Job) -> usize {
        self.jobs.insert(job)
    }

    /// Removes the job at the given index.
    pub fn remove(&mut self, index: usize) -> Option<Job> {
        self.jobs.try_remove(index)
    }

    /// Returns the job with the given process ID.
    #[must_use]
    pub fn find_by_pid(&self, pid: Pid) -> Option<usize> {
        self.jobs
            .iter()
            .find(|(_, job)| job.pid == pid)
            .map(|(index, _)| index)
    }

    /// Iterates over the jobs with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Job)> {
        self.jobs.iter()
    }

    /// Returns the number of jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the set contains no job.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Records a state change observed for a child process.
    ///
    /// Returns the index of the updated job, if the process belongs to one.
    pub fn update_state(&mut self, pid: Pid, state: ChildState) -> Option<usize> {
        let index = self.find_by_pid(pid)?;
        let job = &mut self.jobs[index];
        let new_state = JobState::from(state);
        if job.state != new_state {
            job.state = new_state;
            job.state_reported = false;
        }
        Some(index)
    }

    /// Removes jobs whose finished state has been reported.
    pub fn remove_reported_done_jobs(&mut self) {
        self.jobs
            .retain(|_, job| !(job.state_reported && matches!(job.state, JobState::Done(_))));
    }

    /// Returns the process ID of the most recently started asynchronous
    /// command, the value of the special parameter `$!`.
    #[must_use]
    pub fn last_async_pid(&self) -> Option<Pid> {
        self.last_async_pid
    }

    /// Sets the process ID of the most recently started asynchronous
    /// command.
    ///
    /// This function must be called only with a process ID returned from a
    /// successful fork, so that `$!` never names a process that was not
    /// started.
    pub fn set_last_async_pid(&mut self, pid: Pid) {
        self.last_async_pid = Some(pid);
    }

    /// Discards all jobs without waiting for them.
    ///
    /// This is used when entering a subshell, which does not inherit the
    /// parent's jobs.
    pub fn disown_all(&mut self) {
        self.jobs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_find_remove() {
        let mut set = JobSet::new();
        let index = set.add(Job::new(Pid(10)));
        assert_eq!(set.find_by_pid(Pid(10)), Some(index));
        assert_eq!(set.find_by_pid(Pid(11)), None);

        let job = set.remove(index).unwrap();
        assert_eq!(job.pid, Pid(10));
        assert!(set.is_empty());
    }

    #[test]
    fn update_state_marks_unreported() {
        let mut set = JobSet::new();
        let index = set.add(Job::new(Pid(10)));
        set.jobs[index].state_reported = true;

        set.update_state(Pid(10), ChildState::Exited(ExitStatus(0)));
        let job = &set.jobs[index];
        assert_eq!(job.state, JobState::Done(ExitStatus(0)));
        assert!(!job.state_reported);
    }

    #[test]
    fn signaled_child_maps_to_128_plus_signal() {
        let mut set = JobSet::new();
        let index = set.add(Job::new(Pid(10)));
        set.update_state(Pid(10), ChildState::Signaled(9));
        assert_eq!(set.jobs[index].state, JobState::Done(ExitStatus(137)));
    }

    #[test]
    fn remove_reported_done_jobs_keeps_running_jobs() {
        let mut set = JobSet::new();
        let done = set.add(Job::new(Pid(10)));
        set.update_state(Pid(10), ChildState::Exited(ExitStatus(0)));
        set.jobs[done].state_reported = true;
        let running = set.add(Job::new(Pid(11)));

        set.remove_reported_done_jobs();
        assert_eq!(set.find_by_pid(Pid(10)), None);
        assert_eq!(set.find_by_pid(Pid(11)), Some(running));
    }

    #[test]
    fn last_async_pid_is_none_until_set() {
        let mut set = JobSet::new();
        assert_eq!(set.last_async_pid(), None);
        set.set_last_async_pid(Pid(42));
        assert_eq!(set.last_async_pid(), Some(Pid(42)));
    }
}
