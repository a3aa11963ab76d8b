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

//! System simulated in memory for testing.
//!
//! [`StubSystem`] implements [`System`] for a single simulated process with
//! an in-memory file system, file descriptors, and pipes. It cannot create
//! child processes: `fork`, `execve`, and `wait` fail with `ENOSYS` or
//! `ECHILD`, so tests that need real processes are integration tests
//! instead.
//!
//! The file system is a flat map from path strings to file contents. The
//! standard streams are pre-opened on the files `/dev/stdin`, `/dev/stdout`,
//! and `/dev/stderr`, which tests may inspect through the shared
//! [`SystemState`].

use super::{
    AccessMode, ChildState, CpuTimes, Disposition, Errno, Fd, FileKind, ForkResult, Mode,
    OfdAccess, OpenFlag, Result, System,
};
use crate::job::Pid;
use crate::semantics::ExitStatus;
use enumset::EnumSet;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::convert::Infallible;
use std::ffi::CStr;
use std::ffi::CString;
use std::rc::Rc;

/// Regular file in the simulated file system.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct INode {
    pub content: Vec<u8>,
}

impl INode {
    /// Creates a regular file with the given content.
    pub fn new<C: Into<Vec<u8>>>(content: C) -> INode {
        INode {
            content: content.into(),
        }
    }
}

/// Anonymous pipe buffer.
#[derive(Debug, Default)]
struct PipeBuffer {
    content: VecDeque<u8>,
    writers: usize,
}

/// State of an open file description, shared between duplicated descriptors.
#[derive(Debug)]
enum OpenFileDescription {
    File {
        inode: Rc<RefCell<INode>>,
        offset: usize,
        access: OfdAccess,
        append: bool,
    },
    PipeReader {
        pipe: Rc<RefCell<PipeBuffer>>,
    },
    PipeWriter {
        pipe: Rc<RefCell<PipeBuffer>>,
    },
}

/// Entry of the file descriptor table.
#[derive(Clone, Debug)]
struct OpenFd {
    description: Rc<RefCell<OpenFileDescription>>,
    cloexec: bool,
}

/// Whole state of the simulated system.
#[derive(Debug, Default)]
pub struct SystemState {
    file_system: HashMap<String, Rc<RefCell<INode>>>,
    fds: BTreeMap<i32, OpenFd>,
    cwd: String,
    umask: u32,
    executables: HashSet<String>,
    home_directories: HashMap<String, String>,
    dispositions: HashMap<i32, Disposition>,
    pending_signals: Vec<i32>,
}

impl SystemState {
    /// Creates or replaces a regular file.
    pub fn put_file<C: Into<Vec<u8>>>(&mut self, path: &str, content: C) {
        self.file_system
            .insert(path.to_string(), Rc::new(RefCell::new(INode::new(content))));
    }

    /// Returns the content of a regular file.
    #[must_use]
    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        let inode = self.file_system.get(path)?;
        Some(inode.borrow().content.clone())
    }

    /// Returns the bytes written to the standard output so far, as a string.
    #[must_use]
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.file_content("/dev/stdout").unwrap_or_default()).into_owned()
    }

    /// Returns the bytes written to the standard error so far, as a string.
    #[must_use]
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.file_content("/dev/stderr").unwrap_or_default()).into_owned()
    }

    /// Marks a path as an executable file.
    pub fn add_executable(&mut self, path: &str) {
        self.executables.insert(path.to_string());
        self.put_file(path, []);
    }

    /// Defines the home directory of a user.
    pub fn set_home(&mut self, user: &str, home: &str) {
        self.home_directories
            .insert(user.to_string(), home.to_string());
    }

    /// Simulates the delivery of a signal.
    ///
    /// The signal is recorded for [`System::caught_signals`] only if its
    /// disposition is [`Disposition::Catch`].
    pub fn raise_signal(&mut self, signal: i32) {
        if self.dispositions.get(&signal) == Some(&Disposition::Catch) {
            self.pending_signals.push(signal);
        }
    }

    fn first_free_fd(&self, min: i32) -> i32 {
        let mut candidate = min;
        for &fd in self.fds.keys() {
            if fd < candidate {
                continue;
            }
            if fd == candidate {
                candidate += 1;
            } else {
                break;
            }
        }
        candidate
    }

    fn open_on_fd(&mut self, fd: i32, description: OpenFileDescription) {
        self.fds.insert(
            fd,
            OpenFd {
                description: Rc::new(RefCell::new(description)),
                cloexec: false,
            },
        );
    }

    fn close_fd(&mut self, fd: i32) {
        let Some(entry) = self.fds.remove(&fd) else {
            return;
        };
        // The last descriptor for a pipe end hangs up the pipe
        if Rc::strong_count(&entry.description) == 1 {
            if let OpenFileDescription::PipeWriter { pipe } = &*entry.description.borrow() {
                pipe.borrow_mut().writers -= 1;
            }
        }
    }
}

/// Implementation of `System` simulated in memory.
///
/// Cloning a `StubSystem` yields another handle onto the same state.
#[derive(Clone, Debug)]
pub struct StubSystem {
    pub state: Rc<RefCell<SystemState>>,
}

impl StubSystem {
    /// Creates a new simulated system with the standard streams open.
    #[must_use]
    pub fn new() -> StubSystem {
        let mut state = SystemState {
            cwd: "/".to_string(),
            umask: 0o022,
            ..Default::default()
        };
        state.put_file("/dev/stdin", []);
        state.put_file("/dev/stdout", []);
        state.put_file("/dev/stderr", []);
        for (fd, path, access) in [
            (0, "/dev/stdin", OfdAccess::ReadOnly),
            (1, "/dev/stdout", OfdAccess::WriteOnly),
            (2, "/dev/stderr", OfdAccess::WriteOnly),
        ] {
            let inode = Rc::clone(&state.file_system[path]);
            state.open_on_fd(
                fd,
                OpenFileDescription::File {
                    inode,
                    offset: 0,
                    access,
                    append: true,
                },
            );
        }
        StubSystem {
            state: Rc::new(RefCell::new(state)),
        }
    }
}

impl Default for StubSystem {
    fn default() -> StubSystem {
        StubSystem::new()
    }
}

fn path_str(path: &CStr) -> Result<String> {
    match path.to_str() {
        Ok(path) => Ok(path.to_string()),
        Err(_) => Err(Errno::EILSEQ),
    }
}

impl System for StubSystem {
    fn open(
        &mut self,
        path: &CStr,
        access: OfdAccess,
        flags: EnumSet<OpenFlag>,
        mode: Mode,
    ) -> Result<Fd> {
        let _ = mode;
        let path = path_str(path)?;
        let mut state = self.state.borrow_mut();

        let inode = match state.file_system.get(&path) {
            Some(_) if flags.contains(OpenFlag::Exclusive) => return Err(Errno::EEXIST),
            Some(inode) => {
                if flags.contains(OpenFlag::Truncate) {
                    inode.borrow_mut().content.clear();
                }
                Rc::clone(inode)
            }
            None if flags.contains(OpenFlag::Create) => {
                let inode = Rc::new(RefCell::new(INode::default()));
                state.file_system.insert(path, Rc::clone(&inode));
                inode
            }
            None => return Err(Errno::ENOENT),
        };

        let fd = state.first_free_fd(0);
        state.open_on_fd(
            fd,
            OpenFileDescription::File {
                inode,
                offset: 0,
                access,
                append: flags.contains(OpenFlag::Append),
            },
        );
        Ok(Fd(fd))
    }

    fn close(&mut self, fd: Fd) -> Result<()> {
        self.state.borrow_mut().close_fd(fd.0);
        Ok(())
    }

    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize> {
        let state = self.state.borrow();
        let entry = state.fds.get(&fd.0).ok_or(Errno::EBADF)?;
        let mut description = entry.description.borrow_mut();
        match &mut *description {
            OpenFileDescription::File {
                inode,
                offset,
                access,
                ..
            } => {
                if *access == OfdAccess::WriteOnly {
                    return Err(Errno::EBADF);
                }
                let inode = inode.borrow();
                let available = inode.content.len().saturating_sub(*offset);
                let count = available.min(buffer.len());
                buffer[..count].copy_from_slice(&inode.content[*offset..*offset + count]);
                *offset += count;
                Ok(count)
            }
            OpenFileDescription::PipeReader { pipe } => {
                let mut pipe = pipe.borrow_mut();
                if pipe.content.is_empty() {
                    if pipe.writers == 0 {
                        return Ok(0);
                    }
                    // A blocking read would deadlock the simulated process
                    return Err(Errno::EDEADLK);
                }
                let count = pipe.content.len().min(buffer.len());
                for byte in buffer[..count].iter_mut() {
                    *byte = pipe.content.pop_front().unwrap();
                }
                Ok(count)
            }
            OpenFileDescription::PipeWriter { .. } => Err(Errno::EBADF),
        }
    }

    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize> {
        let state = self.state.borrow();
        let entry = state.fds.get(&fd.0).ok_or(Errno::EBADF)?;
        let mut description = entry.description.borrow_mut();
        match &mut *description {
            OpenFileDescription::File {
                inode,
                offset,
                access,
                append,
            } => {
                if *access == OfdAccess::ReadOnly {
                    return Err(Errno::EBADF);
                }
                let mut inode = inode.borrow_mut();
                if *append {
                    *offset = inode.content.len();
                }
                let end = *offset + buffer.len();
                if inode.content.len() < end {
                    inode.content.resize(end, 0);
                }
                inode.content[*offset..end].copy_from_slice(buffer);
                *offset = end;
                Ok(buffer.len())
            }
            OpenFileDescription::PipeWriter { pipe } => {
                pipe.borrow_mut().content.extend(buffer.iter().copied());
                Ok(buffer.len())
            }
            OpenFileDescription::PipeReader { .. } => Err(Errno::EBADF),
        }
    }

    fn dup(&mut self, from: Fd, min: Fd, cloexec: bool) -> Result<Fd> {
        let mut state = self.state.borrow_mut();
        let entry = state.fds.get(&from.0).ok_or(Errno::EBADF)?.clone();
        let fd = state.first_free_fd(min.0);
        state.fds.insert(
            fd,
            OpenFd {
                description: entry.description,
                cloexec,
            },
        );
        Ok(Fd(fd))
    }

    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd> {
        let mut state = self.state.borrow_mut();
        let entry = state.fds.get(&from.0).ok_or(Errno::EBADF)?.clone();
        if from != to {
            state.close_fd(to.0);
            state.fds.insert(
                to.0,
                OpenFd {
                    description: entry.description,
                    cloexec: false,
                },
            );
        }
        Ok(to)
    }

    fn pipe(&mut self) -> Result<(Fd, Fd)> {
        let mut state = self.state.borrow_mut();
        let pipe = Rc::new(RefCell::new(PipeBuffer {
            content: VecDeque::new(),
            writers: 1,
        }));
        let reader = state.first_free_fd(0);
        state.open_on_fd(
            reader,
            OpenFileDescription::PipeReader {
                pipe: Rc::clone(&pipe),
            },
        );
        let writer = state.first_free_fd(0);
        state.open_on_fd(writer, OpenFileDescription::PipeWriter { pipe });
        Ok((Fd(reader), Fd(writer)))
    }

    fn get_cloexec(&self, fd: Fd) -> Result<bool> {
        let state = self.state.borrow();
        let entry = state.fds.get(&fd.0).ok_or(Errno::EBADF)?;
        Ok(entry.cloexec)
    }

    fn set_cloexec(&mut self, fd: Fd, on: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let entry = state.fds.get_mut(&fd.0).ok_or(Errno::EBADF)?;
        entry.cloexec = on;
        Ok(())
    }

    fn is_regular_file(&self, fd: Fd) -> Result<bool> {
        let state = self.state.borrow();
        let entry = state.fds.get(&fd.0).ok_or(Errno::EBADF)?;
        let description = entry.description.borrow();
        Ok(matches!(&*description, OpenFileDescription::File { .. }))
    }

    fn ofd_access(&self, fd: Fd) -> Result<OfdAccess> {
        let state = self.state.borrow();
        let entry = state.fds.get(&fd.0).ok_or(Errno::EBADF)?;
        let description = entry.description.borrow();
        Ok(match &*description {
            OpenFileDescription::File { access, .. } => *access,
            OpenFileDescription::PipeReader { .. } => OfdAccess::ReadOnly,
            OpenFileDescription::PipeWriter { .. } => OfdAccess::WriteOnly,
        })
    }

    fn isatty(&self, _fd: Fd) -> bool {
        false
    }

    fn is_executable_file(&self, path: &CStr) -> bool {
        match path.to_str() {
            Ok(path) => self.state.borrow().executables.contains(path),
            Err(_) => false,
        }
    }

    fn file_kind(&self, path: &CStr) -> Option<FileKind> {
        let path = path.to_str().ok()?;
        if path == "/" || path == "." {
            return Some(FileKind::Directory);
        }
        let state = self.state.borrow();
        if state.file_system.contains_key(path) {
            return Some(FileKind::Regular);
        }
        // Directories exist implicitly as path prefixes of files
        let prefix = format!("{}/", path.trim_end_matches('/'));
        if state.file_system.keys().any(|key| key.starts_with(&prefix)) {
            Some(FileKind::Directory)
        } else {
            None
        }
    }

    fn access_check(&self, path: &CStr, mode: AccessMode) -> bool {
        match mode {
            AccessMode::Read | AccessMode::Write => self.file_kind(path).is_some(),
            AccessMode::Execute => self.is_executable_file(path) || self.is_directory(path),
        }
    }

    fn read_dir(&self, path: &CStr) -> Result<Vec<String>> {
        let path = path_str(path)?;
        let prefix = if path == "." || path == "/" {
            String::new()
        } else {
            format!("{}/", path.trim_end_matches('/'))
        };
        let state = self.state.borrow();
        let mut entries: Vec<String> = state
            .file_system
            .keys()
            .filter_map(|key| {
                let rest = key.strip_prefix(&prefix)?;
                let name = rest.split('/').next().unwrap();
                if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                }
            })
            .collect();
        entries.sort();
        entries.dedup();
        Ok(entries)
    }

    fn getcwd(&self) -> Result<String> {
        Ok(self.state.borrow().cwd.clone())
    }

    fn chdir(&mut self, path: &CStr) -> Result<()> {
        let path = path_str(path)?;
        self.state.borrow_mut().cwd = path;
        Ok(())
    }

    fn umask(&mut self, mask: u32) -> u32 {
        let mut state = self.state.borrow_mut();
        std::mem::replace(&mut state.umask, mask)
    }

    fn home_directory(&self, user: &str) -> Option<String> {
        self.state.borrow().home_directories.get(user).cloned()
    }

    fn getpid(&self) -> Pid {
        Pid(2)
    }

    fn getppid(&self) -> Pid {
        Pid(1)
    }

    fn fork(&mut self) -> Result<ForkResult> {
        Err(Errno::ENOSYS)
    }

    fn execve(
        &mut self,
        _path: &CStr,
        _args: &[CString],
        _envs: &[CString],
    ) -> Result<Infallible> {
        Err(Errno::ENOSYS)
    }

    fn exit(&mut self, exit_status: ExitStatus) -> ! {
        panic!("StubSystem cannot exit the process (status {exit_status})")
    }

    fn wait(&mut self, _pid: Pid, _blocking: bool) -> Result<Option<(Pid, ChildState)>> {
        Err(Errno::ECHILD)
    }

    fn kill(&mut self, _pid: Pid, _signal: i32) -> Result<()> {
        Err(Errno::ESRCH)
    }

    fn times(&self) -> Result<CpuTimes> {
        Ok(CpuTimes::default())
    }

    fn sigaction(&mut self, signal: i32, disposition: Disposition) -> Result<Disposition> {
        let mut state = self.state.borrow_mut();
        let old = state.dispositions.insert(signal, disposition);
        Ok(old.unwrap_or(Disposition::Default))
    }

    fn caught_signals(&mut self) -> Vec<i32> {
        std::mem::take(&mut self.state.borrow_mut().pending_signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SystemEx;

    fn c_string(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn open_read_write_file() {
        let mut system = StubSystem::new();
        let fd = system
            .open(
                &c_string("file"),
                OfdAccess::WriteOnly,
                OpenFlag::Create.into(),
                Mode::default(),
            )
            .unwrap();
        system.write_all(fd, b"hello").unwrap();
        system.close(fd).unwrap();

        let fd = system
            .open(
                &c_string("file"),
                OfdAccess::ReadOnly,
                EnumSet::empty(),
                Mode::default(),
            )
            .unwrap();
        let content = system.read_all(fd).unwrap();
        assert_eq!(content, b"hello");
    }

    #[test]
    fn open_nonexistent_file_fails() {
        let mut system = StubSystem::new();
        let result = system.open(
            &c_string("nope"),
            OfdAccess::ReadOnly,
            EnumSet::empty(),
            Mode::default(),
        );
        assert_eq!(result, Err(Errno::ENOENT));
    }

    #[test]
    fn exclusive_open_fails_on_existing_file() {
        let mut system = StubSystem::new();
        system.state.borrow_mut().put_file("file", *b"x");
        let result = system.open(
            &c_string("file"),
            OfdAccess::WriteOnly,
            OpenFlag::Create | OpenFlag::Exclusive,
            Mode::default(),
        );
        assert_eq!(result, Err(Errno::EEXIST));
    }

    #[test]
    fn truncate_clears_content() {
        let mut system = StubSystem::new();
        system.state.borrow_mut().put_file("file", *b"old");
        system
            .open(
                &c_string("file"),
                OfdAccess::WriteOnly,
                OpenFlag::Truncate.into(),
                Mode::default(),
            )
            .unwrap();
        assert_eq!(system.state.borrow().file_content("file").unwrap(), b"");
    }

    #[test]
    fn append_writes_at_end() {
        let mut system = StubSystem::new();
        system.state.borrow_mut().put_file("file", *b"one");
        let fd = system
            .open(
                &c_string("file"),
                OfdAccess::WriteOnly,
                OpenFlag::Append.into(),
                Mode::default(),
            )
            .unwrap();
        system.write_all(fd, b"two").unwrap();
        assert_eq!(
            system.state.borrow().file_content("file").unwrap(),
            b"onetwo"
        );
    }

    #[test]
    fn dup_shares_offset() {
        let mut system = StubSystem::new();
        system.state.borrow_mut().put_file("file", *b"abcd");
        let fd = system
            .open(
                &c_string("file"),
                OfdAccess::ReadOnly,
                EnumSet::empty(),
                Mode::default(),
            )
            .unwrap();
        let copy = system.dup(fd, Fd(10), false).unwrap();
        assert!(copy.0 >= 10);

        let mut buffer = [0; 2];
        system.read(fd, &mut buffer).unwrap();
        system.read(copy, &mut buffer).unwrap();
        assert_eq!(&buffer, b"cd");
    }

    #[test]
    fn pipe_read_write() {
        let mut system = StubSystem::new();
        let (reader, writer) = system.pipe().unwrap();
        system.write_all(writer, b"data").unwrap();
        system.close(writer).unwrap();
        let content = system.read_all(reader).unwrap();
        assert_eq!(content, b"data");
    }

    #[test]
    fn pipe_read_with_open_writer_would_block() {
        let mut system = StubSystem::new();
        let (reader, _writer) = system.pipe().unwrap();
        let mut buffer = [0; 1];
        assert_eq!(system.read(reader, &mut buffer), Err(Errno::EDEADLK));
    }

    #[test]
    fn standard_streams_are_files() {
        let mut system = StubSystem::new();
        system.write_all(Fd::STDOUT, b"out").unwrap();
        system.write_all(Fd::STDERR, b"err").unwrap();
        assert_eq!(system.state.borrow().stdout(), "out");
        assert_eq!(system.state.borrow().stderr(), "err");
    }

    #[test]
    fn read_dir_lists_entries() {
        let mut system = StubSystem::new();
        {
            let mut state = system.state.borrow_mut();
            state.put_file("a.txt", []);
            state.put_file("b.txt", []);
            state.put_file("sub/c.txt", []);
        }
        let entries = system.read_dir(&c_string(".")).unwrap();
        assert!(entries.contains(&"a.txt".to_string()));
        assert!(entries.contains(&"b.txt".to_string()));
        assert!(entries.contains(&"sub".to_string()));

        let entries = system.read_dir(&c_string("sub")).unwrap();
        assert_eq!(entries, ["c.txt"]);
    }

    #[test]
    fn raise_signal_requires_catch_disposition() {
        let mut system = StubSystem::new();
        system.state.borrow_mut().raise_signal(libc::SIGINT);
        assert_eq!(system.caught_signals(), Vec::<i32>::new());

        system.sigaction(libc::SIGINT, Disposition::Catch).unwrap();
        system.state.borrow_mut().raise_signal(libc::SIGINT);
        assert_eq!(system.caught_signals(), [libc::SIGINT]);
    }
}
