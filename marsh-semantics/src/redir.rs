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

//! Redirection semantics.
//!
//! To perform redirections, wrap an [`Env`] in a [`RedirGuard`] and call
//! [`RedirGuard::perform_redirs`]. The guard saves a backup copy of every
//! file descriptor a redirection list will modify *before* applying any of
//! the redirections, so a list like `2>&1 1>file` duplicates the descriptor
//! state that was in effect when the command started. Dropping the guard
//! undoes the redirections in reverse order; [`preserve_redirs`] makes them
//! permanent instead (for `exec`).
//!
//! Backup descriptors live at [`MIN_INTERNAL_FD`] or above with the
//! close-on-exec flag set, keeping them invisible to user commands. A
//! descriptor that already has the close-on-exec flag is reserved by the
//! shell and refuses redirection.
//!
//! A here-document opens a pipe, writes the (possibly expanded) content to
//! the write end, and installs the read end as the target descriptor.
//!
//! [`preserve_redirs`]: RedirGuard::preserve_redirs

use crate::expansion::{expand_text, expand_word};
use crate::Handle;
use marsh_env::io::MIN_INTERNAL_FD;
use marsh_env::option::{Clobber, Off};
use marsh_env::semantics::ExitStatus;
use marsh_env::system::{Errno, OfdAccess, OpenFlag, SystemEx};
use marsh_env::Env;
use marsh_syntax::syntax::{Fd, HereDoc, Redir, RedirBody, RedirOp};
use enumset::EnumSet;
use std::ffi::CString;
use std::ops::Deref;
use std::ops::DerefMut;
use thiserror::Error;

/// Record of saving an open file description in another file descriptor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SavedFd {
    /// File descriptor by which the original open file description was
    /// previously accessible
    original: Fd,
    /// Temporary file descriptor that remembers the original open file
    /// description; `None` if the original was closed
    save: Option<Fd>,
}

/// Types of errors that may occur in the redirection.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Expansion of the operand failed.
    #[error(transparent)]
    Expansion(#[from] crate::expansion::Error),

    /// Pathname containing a nul byte.
    #[error("pathname contains a nul byte")]
    NulByte,

    /// The target file descriptor could not be modified.
    #[error("cannot redirect file descriptor {0}: {1}")]
    FdNotOverwritten(Fd, Errno),

    /// Use of a file descriptor reserved by the shell.
    #[error("file descriptor {0} is reserved by the shell")]
    ReservedFd(Fd),

    /// Error while opening a file.
    #[error("cannot open `{0}`: {1}")]
    OpenFile(String, Errno),

    /// Operand of `<&` or `>&` that is not a valid file descriptor.
    #[error("`{0}` is not a valid file descriptor")]
    MalformedFd(String),

    /// `<&` applied to an unreadable file descriptor.
    #[error("{0} is not a readable file descriptor")]
    UnreadableFd(Fd),

    /// `>&` applied to an unwritable file descriptor.
    #[error("{0} is not a writable file descriptor")]
    UnwritableFd(Fd),

    /// Error preparing the pipe that carries a here-document.
    #[error("cannot prepare here-document: {0}")]
    HereDocUnavailable(Errno),
}

/// Intermediate state of a redirected file descriptor.
#[derive(Debug)]
enum FdSpec {
    /// File descriptor specifically opened for the redirection
    Owned(Fd),
    /// Existing file descriptor
    Borrowed(Fd),
    /// Existing file descriptor that is closed after duplication (`n<&m-`)
    Moved(Fd),
    /// Closed file descriptor (`n<&-`)
    Closed,
}

impl FdSpec {
    fn as_fd(&self) -> Option<Fd> {
        match self {
            &FdSpec::Owned(fd) | &FdSpec::Borrowed(fd) | &FdSpec::Moved(fd) => Some(fd),
            &FdSpec::Closed => None,
        }
    }

    fn close(self, env: &mut Env) {
        match self {
            FdSpec::Owned(fd) | FdSpec::Moved(fd) => {
                let _ = env.system.close(fd);
            }
            FdSpec::Borrowed(_) | FdSpec::Closed => (),
        }
    }
}

fn is_cloexec(env: &Env, fd: Fd) -> bool {
    env.system.get_cloexec(fd) == Ok(true)
}

fn into_c_string(value: String) -> Result<CString, Error> {
    CString::new(value).map_err(|_| Error::NulByte)
}

/// Opens a file for redirection.
fn open_file(
    env: &mut Env,
    access: OfdAccess,
    flags: EnumSet<OpenFlag>,
    path: String,
) -> Result<FdSpec, Error> {
    let c_path = into_c_string(path.clone())?;
    match env.system.open(&c_path, access, flags, Default::default()) {
        Ok(fd) => Ok(FdSpec::Owned(fd)),
        Err(errno) => Err(Error::OpenFile(path, errno)),
    }
}

/// Opens a file for writing with the `noclobber` option in effect.
fn open_file_noclobber(env: &mut Env, path: String) -> Result<FdSpec, Error> {
    let c_path = into_c_string(path.clone())?;

    let flags = OpenFlag::Create | OpenFlag::Exclusive;
    match env
        .system
        .open(&c_path, OfdAccess::WriteOnly, flags, Default::default())
    {
        Ok(fd) => return Ok(FdSpec::Owned(fd)),
        Err(Errno::EEXIST) => (),
        Err(errno) => return Err(Error::OpenFile(path, errno)),
    }

    // There is an existing file. Open it, but refuse to overwrite a
    // regular file that somebody else must have created.
    match env
        .system
        .open(&c_path, OfdAccess::WriteOnly, EnumSet::empty(), Default::default())
    {
        Ok(fd) => {
            if env.system.is_regular_file(fd) == Ok(true) {
                let _ = env.system.close(fd);
                Err(Error::OpenFile(path, Errno::EEXIST))
            } else {
                Ok(FdSpec::Owned(fd))
            }
        }
        Err(_) => Err(Error::OpenFile(path, Errno::EEXIST)),
    }
}

/// Interprets the operand of `<&` and `>&`.
fn copy_fd(env: &mut Env, operand: String, expected: OfdAccess) -> Result<FdSpec, Error> {
    if operand == "-" {
        return Ok(FdSpec::Closed);
    }

    // A trailing hyphen requests moving the descriptor
    let (number, moves) = match operand.strip_suffix('-') {
        Some(number) if !number.is_empty() => (number, true),
        _ => (&operand[..], false),
    };
    let fd = match number.parse() {
        Ok(number) => Fd(number),
        Err(_) => return Err(Error::MalformedFd(operand)),
    };

    // Check that the descriptor is open in a compatible mode
    match env.system.ofd_access(fd) {
        Ok(access) if access == expected || access == OfdAccess::ReadWrite => (),
        _ => {
            return Err(match expected {
                OfdAccess::ReadOnly => Error::UnreadableFd(fd),
                _ => Error::UnwritableFd(fd),
            })
        }
    }

    if is_cloexec(env, fd) {
        return Err(Error::ReservedFd(fd));
    }

    if moves {
        Ok(FdSpec::Moved(fd))
    } else {
        Ok(FdSpec::Borrowed(fd))
    }
}

/// Opens the file descriptor for a normal redirection.
fn open_normal(env: &mut Env, operator: RedirOp, operand: String) -> Result<FdSpec, Error> {
    use RedirOp::*;
    match operator {
        FileIn => open_file(env, OfdAccess::ReadOnly, EnumSet::empty(), operand),
        FileOut if env.options.get(Clobber) == Off => open_file_noclobber(env, operand),
        FileOut | FileClobber => open_file(
            env,
            OfdAccess::WriteOnly,
            OpenFlag::Create | OpenFlag::Truncate,
            operand,
        ),
        FileAppend => open_file(
            env,
            OfdAccess::WriteOnly,
            OpenFlag::Create | OpenFlag::Append,
            operand,
        ),
        FileInOut => open_file(env, OfdAccess::ReadWrite, OpenFlag::Create.into(), operand),
        FdIn => copy_fd(env, operand, OfdAccess::ReadOnly),
        FdOut => copy_fd(env, operand, OfdAccess::WriteOnly),
    }
}

/// Opens a readable file descriptor yielding the here-document content.
fn open_here_doc(env: &mut Env, here_doc: &HereDoc) -> Result<(FdSpec, Option<ExitStatus>), Error> {
    let content = here_doc.content.get().cloned().unwrap_or_default();
    let (content, exit_status) = if here_doc.delimiter_quoted {
        (
            content.to_string_if_literal().unwrap_or_default(),
            None,
        )
    } else {
        let (content, exit_status) = expand_text(env, &content)?;
        (content, exit_status)
    };

    let (reader, writer) = env.system.pipe().map_err(Error::HereDocUnavailable)?;
    let write_result = env.system.write_all(writer, content.as_bytes());
    let _ = env.system.close(writer);
    match write_result {
        Ok(_) => Ok((FdSpec::Owned(reader), exit_status)),
        Err(errno) => {
            let _ = env.system.close(reader);
            Err(Error::HereDocUnavailable(errno))
        }
    }
}

/// Performs one redirection, assuming its target has been saved.
fn perform(env: &mut Env, redir: &Redir) -> Result<Option<ExitStatus>, Error> {
    let target_fd = redir.fd_or_default();

    let (fd_spec, exit_status) = match &redir.body {
        RedirBody::Normal { operator, operand } => {
            let (operand, exit_status) = expand_word(env, operand)?;
            let fd_spec = open_normal(env, *operator, operand.value)?;
            (fd_spec, exit_status)
        }
        RedirBody::HereDoc(here_doc) => open_here_doc(env, here_doc)?,
    };

    if let Some(fd) = fd_spec.as_fd() {
        if fd != target_fd {
            let dup_result = env.system.dup2(fd, target_fd);
            fd_spec.close(env);
            if let Err(errno) = dup_result {
                return Err(Error::FdNotOverwritten(target_fd, errno));
            }
        }
    } else {
        let _ = env.system.close(target_fd);
    }

    Ok(exit_status)
}

/// `Env` wrapper for performing redirections.
///
/// This is an RAII-style wrapper of [`Env`] in which redirections are
/// performed. A `RedirGuard` keeps track of file descriptors affected by
/// redirections so that the original state can be restored.
///
/// There are two ways to clear file descriptors saved in the `RedirGuard`.
/// One is [`undo_redirs`](Self::undo_redirs), which restores the original
/// state, and the other is [`preserve_redirs`](Self::preserve_redirs),
/// which makes the effect of the redirections permanent. When the guard is
/// dropped, `undo_redirs` is called implicitly.
#[derive(Debug)]
pub struct RedirGuard<'e> {
    /// Environment in which redirections are performed
    env: &'e mut Env,
    /// Records of file descriptors that have been modified
    saved_fds: Vec<SavedFd>,
}

impl Deref for RedirGuard<'_> {
    type Target = Env;
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for RedirGuard<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

impl Drop for RedirGuard<'_> {
    fn drop(&mut self) {
        self.undo_redirs()
    }
}

impl<'e> RedirGuard<'e> {
    /// Creates a new `RedirGuard`.
    pub fn new(env: &'e mut Env) -> Self {
        RedirGuard {
            env,
            saved_fds: Vec::new(),
        }
    }

    /// Saves the open file description at `fd` so it can be restored.
    ///
    /// A descriptor already saved by this guard is not saved again, so
    /// restoring yields the state before the *first* redirection.
    fn save_fd(&mut self, fd: Fd) -> Result<(), Error> {
        if self.saved_fds.iter().any(|saved| saved.original == fd) {
            return Ok(());
        }
        if is_cloexec(self.env, fd) {
            return Err(Error::ReservedFd(fd));
        }
        let save = match self.env.system.dup(fd, MIN_INTERNAL_FD, true) {
            Ok(save) => Some(save),
            Err(Errno::EBADF) => None,
            Err(errno) => return Err(Error::FdNotOverwritten(fd, errno)),
        };
        self.saved_fds.push(SavedFd { original: fd, save });
        Ok(())
    }

    /// Performs a single redirection.
    ///
    /// If successful, this function returns the exit status of the last
    /// command substitution performed during the redirection, if any.
    pub fn perform_redir(&mut self, redir: &Redir) -> Result<Option<ExitStatus>, Error> {
        self.save_fd(redir.fd_or_default())?;
        perform(self.env, redir)
    }

    /// Performs a list of redirections.
    ///
    /// Every target file descriptor of the list is saved before any
    /// redirection is applied, then the redirections take effect from left
    /// to right. If a redirection fails, the remainders are not performed,
    /// but the effects of the preceding ones remain until the guard undoes
    /// them.
    pub fn perform_redirs<'a, I>(&mut self, redirs: I) -> Result<Option<ExitStatus>, Error>
    where
        I: IntoIterator<Item = &'a Redir> + Clone,
    {
        for redir in redirs.clone() {
            self.save_fd(redir.fd_or_default())?;
        }
        let mut exit_status = None;
        for redir in redirs {
            let new_exit_status = perform(self.env, redir)?;
            exit_status = new_exit_status.or(exit_status);
        }
        Ok(exit_status)
    }

    /// Undoes the effect of the redirections.
    ///
    /// This function restores the file descriptors affected by redirections
    /// to the original state and closes the internal backup descriptors.
    pub fn undo_redirs(&mut self) {
        for SavedFd { original, save } in self.saved_fds.drain(..).rev() {
            if let Some(save) = save {
                debug_assert_ne!(save, original);
                let _ = self.env.system.dup2(save, original);
                let _ = self.env.system.close(save);
            } else {
                let _ = self.env.system.close(original);
            }
        }
    }

    /// Makes the redirections permanent.
    ///
    /// This function closes the internal backup descriptors without
    /// restoring the original state.
    pub fn preserve_redirs(&mut self) {
        for SavedFd { original: _, save } in self.saved_fds.drain(..) {
            if let Some(save) = save {
                let _ = self.env.system.close(save);
            }
        }
    }
}

/// Performs redirections, handling errors.
///
/// This is a convenience function for executing a command body under a
/// redirection list: on error, the diagnostic is printed and the function
/// returns `Err` with the result of the error handling.
pub fn perform_redirs_or_handle(
    env: &mut RedirGuard<'_>,
    redirs: &[Redir],
) -> Result<Option<ExitStatus>, marsh_env::semantics::Result> {
    match env.perform_redirs(redirs) {
        Ok(exit_status) => Ok(exit_status),
        Err(error) => Err(error.handle(env)),
    }
}
