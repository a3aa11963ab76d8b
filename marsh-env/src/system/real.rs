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

//! Implementation of `System` that actually interacts with the system.
//!
//! Most operations go through `nix`'s safe wrappers. Raw `libc` calls,
//! converted with the [`ErrnoIfM1`] helper, remain only where `nix` has no
//! suitable wrapper for the exact semantics needed: `open` with a raw mode
//! argument, `opendir`/`readdir`, `umask`, `times`/`sysconf`, `kill`, and
//! `sigaction` installing the flag-setting handler.

use super::{
    AccessMode, ChildState, CpuTimes, Disposition, Errno, Fd, FileKind, ForkResult, Mode,
    OfdAccess, OpenFlag, Result, System,
};
use crate::job::Pid;
use crate::semantics::ExitStatus;
use enumset::EnumSet;
use nix::fcntl::{FcntlArg, FdFlag};
use nix::sys::stat::{fstat, stat};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, AccessFlags};
use std::convert::Infallible;
use std::ffi::CStr;
use std::ffi::CString;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Converts a `-1` returned from a libc function into the current `errno`.
trait ErrnoIfM1: Sized {
    fn errno_if_m1(self) -> Result<Self>;
}

macro_rules! impl_errno_if_m1 {
    ($type:ty) => {
        impl ErrnoIfM1 for $type {
            fn errno_if_m1(self) -> Result<Self> {
                if self == -1 {
                    Err(Errno::last())
                } else {
                    Ok(self)
                }
            }
        }
    };
}

impl_errno_if_m1!(i32);
impl_errno_if_m1!(i64);

/// Signals caught by the signal handler but not yet consumed.
///
/// The handler only stores into this array, which is async-signal-safe.
const CAUGHT_INIT: AtomicBool = AtomicBool::new(false);
static CAUGHT_SIGNALS: [AtomicBool; MAX_SIGNAL] = [CAUGHT_INIT; MAX_SIGNAL];
const MAX_SIGNAL: usize = 65;

extern "C" fn catch_signal(signal: libc::c_int) {
    if let Some(flag) = CAUGHT_SIGNALS.get(signal as usize) {
        flag.store(true, Ordering::Relaxed);
    }
}

fn is_regular_file_at(path: &CStr) -> bool {
    matches!(stat(path), Ok(stat) if stat.st_mode & libc::S_IFMT == libc::S_IFREG)
}

/// Implementation of `System` that actually interacts with the system.
///
/// `RealSystem` has no state at the Rust level because the relevant state of
/// the environment is managed by the underlying operating system.
#[derive(Debug)]
pub struct RealSystem(());

impl RealSystem {
    /// Creates an instance of `RealSystem`.
    ///
    /// The caller should create at most one instance, since every instance
    /// manipulates one and the same process state.
    #[must_use]
    pub fn new() -> RealSystem {
        RealSystem(())
    }
}

impl Default for RealSystem {
    fn default() -> RealSystem {
        RealSystem::new()
    }
}

impl System for RealSystem {
    fn open(
        &mut self,
        path: &CStr,
        access: OfdAccess,
        flags: EnumSet<OpenFlag>,
        mode: Mode,
    ) -> Result<Fd> {
        let mut raw_flags = match access {
            OfdAccess::ReadOnly => libc::O_RDONLY,
            OfdAccess::WriteOnly => libc::O_WRONLY,
            OfdAccess::ReadWrite => libc::O_RDWR,
        };
        for flag in flags {
            raw_flags |= match flag {
                OpenFlag::Append => libc::O_APPEND,
                OpenFlag::Create => libc::O_CREAT,
                OpenFlag::Exclusive => libc::O_EXCL,
                OpenFlag::Truncate => libc::O_TRUNC,
            };
        }
        let fd = unsafe { libc::open(path.as_ptr(), raw_flags, mode.0 as libc::c_uint) }
            .errno_if_m1()?;
        Ok(Fd(fd))
    }

    fn close(&mut self, fd: Fd) -> Result<()> {
        loop {
            match unistd::close(fd.0) {
                Err(Errno::EBADF) => return Ok(()),
                Err(Errno::EINTR) => (),
                other => return Ok(other?),
            }
        }
    }

    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize> {
        loop {
            let result = unistd::read(fd.0, buffer);
            if result != Err(Errno::EINTR) {
                return result;
            }
        }
    }

    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize> {
        loop {
            let result = unistd::write(fd.0, buffer);
            if result != Err(Errno::EINTR) {
                return result;
            }
        }
    }

    fn dup(&mut self, from: Fd, min: Fd, cloexec: bool) -> Result<Fd> {
        let arg = if cloexec {
            FcntlArg::F_DUPFD_CLOEXEC(min.0)
        } else {
            FcntlArg::F_DUPFD(min.0)
        };
        Ok(Fd(nix::fcntl::fcntl(from.0, arg)?))
    }

    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd> {
        loop {
            match unistd::dup2(from.0, to.0) {
                Ok(fd) => return Ok(Fd(fd)),
                Err(Errno::EINTR) => (),
                Err(errno) => return Err(errno),
            }
        }
    }

    fn pipe(&mut self) -> Result<(Fd, Fd)> {
        let (reader, writer) = unistd::pipe()?;
        Ok((Fd(reader), Fd(writer)))
    }

    fn get_cloexec(&self, fd: Fd) -> Result<bool> {
        let bits = nix::fcntl::fcntl(fd.0, FcntlArg::F_GETFD)?;
        Ok(FdFlag::from_bits_truncate(bits).contains(FdFlag::FD_CLOEXEC))
    }

    fn set_cloexec(&mut self, fd: Fd, on: bool) -> Result<()> {
        let bits = nix::fcntl::fcntl(fd.0, FcntlArg::F_GETFD)?;
        let mut flags = FdFlag::from_bits_truncate(bits);
        flags.set(FdFlag::FD_CLOEXEC, on);
        nix::fcntl::fcntl(fd.0, FcntlArg::F_SETFD(flags))?;
        Ok(())
    }

    fn is_regular_file(&self, fd: Fd) -> Result<bool> {
        let stat = fstat(fd.0)?;
        Ok(stat.st_mode & libc::S_IFMT == libc::S_IFREG)
    }

    fn ofd_access(&self, fd: Fd) -> Result<OfdAccess> {
        let flags = unsafe { libc::fcntl(fd.0, libc::F_GETFL) }.errno_if_m1()?;
        Ok(match flags & libc::O_ACCMODE {
            libc::O_RDONLY => OfdAccess::ReadOnly,
            libc::O_WRONLY => OfdAccess::WriteOnly,
            _ => OfdAccess::ReadWrite,
        })
    }

    fn isatty(&self, fd: Fd) -> bool {
        unistd::isatty(fd.0).unwrap_or(false)
    }

    fn is_executable_file(&self, path: &CStr) -> bool {
        is_regular_file_at(path) && unistd::access(path, AccessFlags::X_OK).is_ok()
    }

    fn file_kind(&self, path: &CStr) -> Option<FileKind> {
        let stat = stat(path).ok()?;
        Some(match stat.st_mode & libc::S_IFMT {
            libc::S_IFREG => FileKind::Regular,
            libc::S_IFDIR => FileKind::Directory,
            libc::S_IFIFO => FileKind::Fifo,
            _ => FileKind::Other,
        })
    }

    fn access_check(&self, path: &CStr, mode: AccessMode) -> bool {
        let flags = match mode {
            AccessMode::Read => AccessFlags::R_OK,
            AccessMode::Write => AccessFlags::W_OK,
            AccessMode::Execute => AccessFlags::X_OK,
        };
        unistd::access(path, flags).is_ok()
    }

    fn read_dir(&self, path: &CStr) -> Result<Vec<String>> {
        let dir = unsafe { libc::opendir(path.as_ptr()) };
        if dir.is_null() {
            return Err(Errno::last());
        }
        let mut entries = Vec::new();
        loop {
            let entry = unsafe { libc::readdir(dir) };
            if entry.is_null() {
                break;
            }
            let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) };
            let name = name.to_string_lossy();
            if name != "." && name != ".." {
                entries.push(name.into_owned());
            }
        }
        unsafe { libc::closedir(dir) };
        Ok(entries)
    }

    fn getcwd(&self) -> Result<String> {
        let cwd = unistd::getcwd()?;
        Ok(cwd.to_string_lossy().into_owned())
    }

    fn chdir(&mut self, path: &CStr) -> Result<()> {
        unistd::chdir(path)
    }

    fn umask(&mut self, mask: u32) -> u32 {
        (unsafe { libc::umask(mask as libc::mode_t) }) as u32
    }

    fn home_directory(&self, user: &str) -> Option<String> {
        let user = unistd::User::from_name(user).ok().flatten()?;
        Some(user.dir.to_string_lossy().into_owned())
    }

    fn getpid(&self) -> Pid {
        Pid(unistd::getpid().as_raw())
    }

    fn getppid(&self) -> Pid {
        Pid(unistd::getppid().as_raw())
    }

    fn fork(&mut self) -> Result<ForkResult> {
        match unsafe { unistd::fork() }? {
            unistd::ForkResult::Parent { child } => Ok(ForkResult::Parent {
                child: Pid(child.as_raw()),
            }),
            unistd::ForkResult::Child => Ok(ForkResult::Child),
        }
    }

    fn execve(&mut self, path: &CStr, args: &[CString], envs: &[CString]) -> Result<Infallible> {
        unistd::execve(path, args, envs)
    }

    fn exit(&mut self, exit_status: ExitStatus) -> ! {
        // _exit skips atexit handlers, which matters in forked children
        unsafe { libc::_exit(exit_status.0 & 0xFF) }
    }

    fn wait(&mut self, pid: Pid, blocking: bool) -> Result<Option<(Pid, ChildState)>> {
        let target = if pid == Pid::ALL {
            None
        } else {
            Some(unistd::Pid::from_raw(pid.0))
        };
        let mut flags = WaitPidFlag::empty();
        if !blocking {
            flags |= WaitPidFlag::WNOHANG;
        }
        loop {
            match waitpid(target, Some(flags)) {
                Ok(WaitStatus::StillAlive) => return Ok(None),
                Ok(WaitStatus::Exited(pid, code)) => {
                    return Ok(Some((Pid(pid.as_raw()), ChildState::Exited(ExitStatus(code)))))
                }
                Ok(WaitStatus::Signaled(pid, signal, _core_dumped)) => {
                    return Ok(Some((Pid(pid.as_raw()), ChildState::Signaled(signal as i32))))
                }
                Ok(WaitStatus::Stopped(pid, signal)) => {
                    return Ok(Some((Pid(pid.as_raw()), ChildState::Stopped(signal as i32))))
                }
                Ok(WaitStatus::Continued(pid)) => {
                    return Ok(Some((Pid(pid.as_raw()), ChildState::Continued)))
                }
                Ok(_) => (),
                Err(Errno::EINTR) => (),
                Err(errno) => return Err(errno),
            }
        }
    }

    fn kill(&mut self, pid: Pid, signal: i32) -> Result<()> {
        unsafe { libc::kill(pid.0, signal) }.errno_if_m1()?;
        Ok(())
    }

    fn times(&self) -> Result<CpuTimes> {
        let mut tms = std::mem::MaybeUninit::<libc::tms>::uninit();
        unsafe { libc::times(tms.as_mut_ptr()) }.errno_if_m1()?;
        let tms = unsafe { tms.assume_init() };
        let ticks_per_second = unsafe { libc::sysconf(libc::_SC_CLK_TCK) }.errno_if_m1()? as f64;
        Ok(CpuTimes {
            self_user: tms.tms_utime as f64 / ticks_per_second,
            self_system: tms.tms_stime as f64 / ticks_per_second,
            children_user: tms.tms_cutime as f64 / ticks_per_second,
            children_system: tms.tms_cstime as f64 / ticks_per_second,
        })
    }

    fn sigaction(&mut self, signal: i32, disposition: Disposition) -> Result<Disposition> {
        unsafe {
            let mut new: libc::sigaction = std::mem::zeroed();
            libc::sigemptyset(&mut new.sa_mask).errno_if_m1()?;
            new.sa_flags = 0;
            new.sa_sigaction = match disposition {
                Disposition::Default => libc::SIG_DFL,
                Disposition::Ignore => libc::SIG_IGN,
                Disposition::Catch => {
                    catch_signal as extern "C" fn(libc::c_int) as libc::sighandler_t
                }
            };
            let mut old: libc::sigaction = std::mem::zeroed();
            libc::sigaction(signal, &new, &mut old).errno_if_m1()?;
            Ok(match old.sa_sigaction {
                libc::SIG_DFL => Disposition::Default,
                libc::SIG_IGN => Disposition::Ignore,
                _ => Disposition::Catch,
            })
        }
    }

    fn caught_signals(&mut self) -> Vec<i32> {
        let mut signals = Vec::new();
        for (signal, flag) in CAUGHT_SIGNALS.iter().enumerate() {
            if flag.swap(false, Ordering::Relaxed) {
                signals.push(signal as i32);
            }
        }
        signals
    }
}
