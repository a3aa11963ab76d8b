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

//! Jobs built-in.

use marsh_env::builtin::Result;
use marsh_env::job::JobState;
use marsh_env::semantics::Field;
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

/// Entry point of the jobs built-in.
///
/// Reports the known jobs, marking their states as reported. Jobs whose
/// completion has been reported are removed from the job set.
pub fn main(env: &mut Env, _args: Vec<Field>) -> Result {
    env.reap_jobs();

    let mut output = String::new();
    let mut reported = Vec::new();
    for (index, job) in env.jobs.iter() {
        let state = match job.state {
            JobState::Running => "Running".to_string(),
            JobState::Stopped(signal) => format!("Stopped ({signal})"),
            JobState::Done(exit_status) if exit_status.is_successful() => "Done".to_string(),
            JobState::Done(exit_status) => format!("Done({exit_status})"),
        };
        output.push_str(&format!("[{}] {:18} {}\n", index + 1, state, job.name));
        reported.push(index);
    }
    let _ = env.system.write_all(Fd::STDOUT, output.as_bytes());

    for index in reported {
        mark_reported(env, index);
    }
    env.jobs.remove_reported_done_jobs();
    Result::SUCCESS
}

fn mark_reported(env: &mut Env, index: usize) {
    // JobSet exposes no direct mutable accessor by index; re-adding the
    // updated job keeps the set consistent
    if let Some(mut job) = env.jobs.remove(index) {
        job.state_reported = true;
        env.jobs.add(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;
    use marsh_env::job::{Job, Pid};
    use marsh_env::semantics::ExitStatus;
    use marsh_env::system::ChildState;

    #[test]
    fn lists_running_jobs() {
        let (mut env, state) = builtin_env();
        let mut job = Job::new(Pid(10));
        job.name = "sleep 100&".to_string();
        env.jobs.add(job);

        main(&mut env, vec![]);
        let stdout = state.borrow().stdout();
        assert!(stdout.contains("Running"));
        assert!(stdout.contains("sleep 100&"));
    }

    #[test]
    fn done_jobs_are_removed_after_reporting() {
        let (mut env, _state) = builtin_env();
        env.jobs.add(Job::new(Pid(10)));
        env.jobs
            .update_state(Pid(10), ChildState::Exited(ExitStatus(0)));

        main(&mut env, vec![]);
        assert!(env.jobs.is_empty());
    }
}
