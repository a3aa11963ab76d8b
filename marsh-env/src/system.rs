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

//! API for the system-managed parts of the environment.
//!
//! This module defines the [`System`] trait, the interface the shell uses to
//! interact with the underlying operating system. There are two
//! implementors:
//!
//! - [`RealSystem`](real::RealSystem) performs the actual system calls.
//! - [`StubSystem`](stub::StubSystem) simulates a single-process system in
//!   memory for testing.
//!
//! The engine is strictly synchronous. All concurrency is in child
//! processes; the only blocking points are the system calls exposed here.
//! A system that cannot provide an operation (for example, `fork` on the
//! in-memory stub) reports `Errno::ENOSYS`, which the engine surfaces as a
//! "not supported on this system" error.

use crate::job::Pid;
use crate::semantics::ExitStatus;
use enumset::EnumSet;
use enumset::EnumSetType;
use std::convert::Infallible;
use std::ffi::CStr;
use std::ffi::CString;
use std::fmt::Debug;

pub use marsh_syntax::syntax::Fd;
pub use nix::errno::Errno;

pub mod real;
pub mod stub;

/// Specialized result type for system calls.
pub type Result<T = ()> = std::result::Result<T, Errno>;

/// Access mode of an open file description.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OfdAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Flags for opening a file, besides the access mode.
#[derive(Debug, EnumSetType, Hash)]
pub enum OpenFlag {
    /// Writes are appended to the end of the file.
    Append,
    /// The file is created if it does not exist.
    Create,
    /// Opening fails if the file already exists.
    Exclusive,
    /// The file is truncated to zero length.
    Truncate,
}

/// File permission bits used when creating a file.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Mode(pub u32);

impl Default for Mode {
    fn default() -> Mode {
        Mode(0o666)
    }
}

/// Result of a [fork](System::fork).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ForkResult {
    /// Returned in the parent process, carrying the child's process ID.
    Parent { child: Pid },
    /// Returned in the child process.
    Child,
}

/// Observed state of a child process.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChildState {
    /// The child exited with the given status.
    Exited(ExitStatus),
    /// The child was killed by the given signal.
    Signaled(i32),
    /// The child was stopped by the given signal.
    Stopped(i32),
    /// The child resumed running.
    Continued,
}

impl ChildState {
    /// Converts the state to the exit status the shell reports for it.
    ///
    /// A signaled child maps to 128 plus the signal number. A stopped or
    /// continued child has no final status and maps to 128 plus the signal
    /// as well, which is only used for interim reporting.
    #[must_use]
    pub fn to_exit_status(self) -> ExitStatus {
        match self {
            ChildState::Exited(exit_status) => exit_status,
            ChildState::Signaled(signal) | ChildState::Stopped(signal) => {
                ExitStatus::from_signal(signal)
            }
            ChildState::Continued => ExitStatus::SUCCESS,
        }
    }

    /// Whether the child has finished for good.
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, ChildState::Exited(_) | ChildState::Signaled(_))
    }
}

/// Disposition of a signal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Disposition {
    /// Perform the default action for the signal.
    Default,
    /// Ignore the signal.
    Ignore,
    /// Record the delivery of the signal for later examination with
    /// [`System::caught_signals`].
    Catch,
}

/// CPU times consumed by the shell and its children, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CpuTimes {
    pub self_user: f64,
    pub self_system: f64,
    pub children_user: f64,
    pub children_system: f64,
}

/// Kind of a file, as the `test` built-in distinguishes them.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FileKind {
    Regular,
    Directory,
    Fifo,
    Other,
}

/// Access permission to check with [`System::access_check`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AccessMode {
    Read,
    Write,
    Execute,
}

/// API to the system-managed parts of the environment.
///
/// The `System` trait defines a collection of methods to access the
/// underlying operating system from the shell as an application program.
pub trait System: Debug {
    /// Opens a file, returning a new file descriptor.
    fn open(
        &mut self,
        path: &CStr,
        access: OfdAccess,
        flags: EnumSet<OpenFlag>,
        mode: Mode,
    ) -> Result<Fd>;

    /// Closes a file descriptor.
    ///
    /// Closing an already closed descriptor is not an error.
    fn close(&mut self, fd: Fd) -> Result<()>;

    /// Reads from a file descriptor.
    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize>;

    /// Writes to a file descriptor.
    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize>;

    /// Duplicates a file descriptor to the lowest free descriptor not less
    /// than `min`.
    fn dup(&mut self, from: Fd, min: Fd, cloexec: bool) -> Result<Fd>;

    /// Duplicates a file descriptor onto a specific descriptor.
    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd>;

    /// Opens an anonymous pipe, returning the reading and writing ends.
    fn pipe(&mut self) -> Result<(Fd, Fd)>;

    /// Returns whether the descriptor has the close-on-exec flag set.
    fn get_cloexec(&self, fd: Fd) -> Result<bool>;

    /// Sets or clears the close-on-exec flag.
    fn set_cloexec(&mut self, fd: Fd, on: bool) -> Result<()>;

    /// Returns whether the descriptor refers to a regular file.
    fn is_regular_file(&self, fd: Fd) -> Result<bool>;

    /// Returns the access mode the descriptor was opened with.
    fn ofd_access(&self, fd: Fd) -> Result<OfdAccess>;

    /// Whether the descriptor refers to a terminal device.
    fn isatty(&self, fd: Fd) -> bool;

    /// Whether there is an executable regular file at the path.
    fn is_executable_file(&self, path: &CStr) -> bool;

    /// Returns the kind of the file at the path, or `None` if nothing is
    /// there.
    fn file_kind(&self, path: &CStr) -> Option<FileKind>;

    /// Whether the current user may access the file in the given mode.
    fn access_check(&self, path: &CStr, mode: AccessMode) -> bool;

    /// Whether there is a directory at the path.
    fn is_directory(&self, path: &CStr) -> bool {
        self.file_kind(path) == Some(FileKind::Directory)
    }

    /// Returns the names of the entries of a directory, excluding `.` and
    /// `..`.
    fn read_dir(&self, path: &CStr) -> Result<Vec<String>>;

    /// Returns the current working directory.
    fn getcwd(&self) -> Result<String>;

    /// Changes the current working directory.
    fn chdir(&mut self, path: &CStr) -> Result<()>;

    /// Sets the file mode creation mask, returning the previous mask.
    fn umask(&mut self, mask: u32) -> u32;

    /// Returns the home directory of the named user.
    fn home_directory(&self, user: &str) -> Option<String>;

    /// Returns the process ID of the current process.
    fn getpid(&self) -> Pid;

    /// Returns the process ID of the parent process.
    fn getppid(&self) -> Pid;

    /// Creates a new child process.
    ///
    /// On success, this function returns twice: in the parent with
    /// [`ForkResult::Parent`] and in the child with [`ForkResult::Child`].
    fn fork(&mut self) -> Result<ForkResult>;

    /// Replaces the current process image.
    ///
    /// This function returns only on failure.
    fn execve(&mut self, path: &CStr, args: &[CString], envs: &[CString]) -> Result<Infallible>;

    /// Terminates the current process.
    fn exit(&mut self, exit_status: ExitStatus) -> !;

    /// Waits for a child process to change state.
    ///
    /// `pid` may be [`Pid::ALL`] to wait for any child. If `blocking` is
    /// false and no child has changed state, the result is `Ok(None)`.
    fn wait(&mut self, pid: Pid, blocking: bool) -> Result<Option<(Pid, ChildState)>>;

    /// Sends a signal to a process.
    fn kill(&mut self, pid: Pid, signal: i32) -> Result<()>;

    /// Returns the CPU times consumed so far.
    fn times(&self) -> Result<CpuTimes>;

    /// Changes the disposition of a signal, returning the previous one.
    fn sigaction(&mut self, signal: i32, disposition: Disposition) -> Result<Disposition>;

    /// Takes the signals caught since the last call.
    fn caught_signals(&mut self) -> Vec<i32>;
}

/// Extension of [`System`] providing convenience methods.
pub trait SystemEx: System {
    /// Writes the whole buffer, retrying on short writes.
    fn write_all(&mut self, fd: Fd, mut buffer: &[u8]) -> Result<usize> {
        let mut total = 0;
        while !buffer.is_empty() {
            match self.write(fd, buffer) {
                Ok(count) => {
                    total += count;
                    buffer = &buffer[count..];
                }
                Err(Errno::EINTR) => (),
                Err(errno) => return Err(errno),
            }
        }
        Ok(total)
    }

    /// Reads the whole content until the end of file.
    fn read_all(&mut self, fd: Fd) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        let mut buffer = [0; 4096];
        loop {
            match self.read(fd, &mut buffer) {
                Ok(0) => return Ok(result),
                Ok(count) => result.extend_from_slice(&buffer[..count]),
                Err(Errno::EINTR) => (),
                Err(errno) => return Err(errno),
            }
        }
    }

    /// Moves a file descriptor to `min` or above, with the close-on-exec
    /// flag set on the result.
    ///
    /// The original descriptor is closed unless it is already at or above
    /// `min`.
    fn move_fd_internal(&mut self, from: Fd, min: Fd) -> Result<Fd> {
        if from >= min {
            self.set_cloexec(from, true)?;
            return Ok(from);
        }
        let new = self.dup(from, min, true)?;
        let _ = self.close(from);
        Ok(new)
    }
}

impl<T: System + ?Sized> SystemEx for T {}
