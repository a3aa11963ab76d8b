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

//! Shell options.
//!
//! This module defines the [`OptionSet`] struct, a map from [`Option`] to
//! [`State`]. Note that `OptionSet` merely manages the state of options; it
//! is the engine that changes its behavior according to them.
//!
//! Options are named positively: the user-facing `noclobber` is the
//! [`Clobber`] option turned off. [`parse_long`] and [`parse_short`]
//! translate user-facing names (`set -C`, `set -o noclobber`) into an
//! option and the state it should be set to.

use enumset::EnumSet;
use enumset::EnumSetType;
use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Not;

/// State of an option: either enabled or disabled.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum State {
    On,
    Off,
}

pub use State::*;

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            On => "on",
            Off => "off",
        };
        s.fmt(f)
    }
}

impl Not for State {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            On => Off,
            Off => On,
        }
    }
}

impl From<bool> for State {
    fn from(on: bool) -> State {
        if on {
            On
        } else {
            Off
        }
    }
}

/// Shell option
#[derive(Clone, Copy, Debug, EnumSetType, Eq, Hash, PartialEq)]
#[enumset(no_super_impls)]
#[non_exhaustive]
pub enum Option {
    /// Exports all variables when they are assigned.
    AllExport,
    /// Allows overwriting an existing file with the `>` redirection.
    /// The user-facing name of the negation is `noclobber`.
    Clobber,
    /// Makes the shell exit when a command returns a non-zero exit status.
    ErrExit,
    /// Makes the shell actually run commands. The user-facing name of the
    /// negation is `noexec`.
    Exec,
    /// Enables pathname expansion. The user-facing name of the negation is
    /// `noglob`.
    Glob,
    /// Prevents the interactive shell from exiting on end-of-file.
    IgnoreEof,
    /// Enables features for interactive use.
    Interactive,
    /// Whether the shell is a login shell.
    Login,
    /// Makes the exit status of a pipeline the status of its rightmost
    /// failing command.
    PipeFail,
    /// Expands unset variables to an empty string rather than erroring
    /// out. The user-facing name of the negation is `nounset`.
    Unset,
    /// Echoes the input before executing it.
    Verbose,
    /// Enables vi-like command line editing.
    Vi,
    /// Prints expanded words during command execution.
    XTrace,
}

pub use self::Option::*;

impl Option {
    /// Whether this option can be modified by the set built-in.
    #[must_use]
    pub fn is_modifiable(self) -> bool {
        !matches!(self, Interactive | Login)
    }

    /// Returns the canonical option name, all in lower case.
    #[must_use]
    pub fn long_name(self) -> &'static str {
        match self {
            AllExport => "allexport",
            Clobber => "clobber",
            ErrExit => "errexit",
            Exec => "exec",
            Glob => "glob",
            IgnoreEof => "ignoreeof",
            Interactive => "interactive",
            Login => "login",
            PipeFail => "pipefail",
            Unset => "unset",
            Verbose => "verbose",
            Vi => "vi",
            XTrace => "xtrace",
        }
    }
}

impl Display for Option {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.long_name().fmt(f)
    }
}

/// Parses a user-facing long option name as used with `set -o`.
///
/// The result pairs the option with the state that corresponds to turning
/// the named option *on*: `parse_long("noclobber")` yields
/// `(Clobber, Off)`.
#[must_use]
pub fn parse_long(name: &str) -> std::option::Option<(Option, State)> {
    for option in EnumSet::<Option>::all() {
        if !option.is_modifiable() {
            continue;
        }
        if name == option.long_name() {
            return Some((option, On));
        }
    }
    // Negated names: noclobber, noexec, noglob, nounset
    let positive = name.strip_prefix("no")?;
    for option in [Clobber, Exec, Glob, Unset] {
        if positive == option.long_name() {
            return Some((option, Off));
        }
    }
    None
}

/// Parses a user-facing short option character as used with `set -x`.
///
/// The result pairs the option with the state that corresponds to
/// *specifying* the flag with a `-` prefix: `parse_short('C')` yields
/// `(Clobber, Off)` because `set -C` turns `noclobber` on.
#[must_use]
pub fn parse_short(c: char) -> std::option::Option<(Option, State)> {
    match c {
        'a' => Some((AllExport, On)),
        'C' => Some((Clobber, Off)),
        'e' => Some((ErrExit, On)),
        'f' => Some((Glob, Off)),
        'I' => Some((IgnoreEof, On)),
        'n' => Some((Exec, Off)),
        'u' => Some((Unset, Off)),
        'v' => Some((Verbose, On)),
        'x' => Some((XTrace, On)),
        _ => None,
    }
}

/// Collection of states of all options.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OptionSet {
    enabled: EnumSet<Option>,
}

impl Default for OptionSet {
    /// Returns the option set of a non-interactive shell: `Clobber`,
    /// `Exec`, `Glob`, and `Unset` are on and all others are off.
    fn default() -> OptionSet {
        OptionSet {
            enabled: Clobber | Exec | Glob | Unset,
        }
    }
}

impl OptionSet {
    /// Returns the state of an option.
    #[must_use]
    pub fn get(&self, option: Option) -> State {
        self.enabled.contains(option).into()
    }

    /// Sets the state of an option.
    pub fn set(&mut self, option: Option, state: State) {
        match state {
            On => self.enabled.insert(option),
            Off => self.enabled.remove(option),
        };
    }

    /// Iterates over all options with their states.
    pub fn iter(&self) -> impl Iterator<Item = (Option, State)> + '_ {
        EnumSet::<Option>::all()
            .iter()
            .map(|option| (option, self.get(option)))
    }

    /// Renders the short flags that are active, for the special parameter
    /// `$-`.
    #[must_use]
    pub fn short_flags(&self) -> String {
        let mut flags = String::new();
        for (c, option, state) in [
            ('a', AllExport, On),
            ('C', Clobber, Off),
            ('e', ErrExit, On),
            ('f', Glob, Off),
            ('i', Interactive, On),
            ('n', Exec, Off),
            ('u', Unset, Off),
            ('v', Verbose, On),
            ('x', XTrace, On),
        ] {
            if self.get(option) == state {
                flags.push(c);
            }
        }
        flags
    }
}
