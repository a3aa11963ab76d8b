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

//! Trap actions.
//!
//! A [`TrapSet`] maps trap [conditions](Condition) to [actions](Action).
//! Setting an action for a signal also installs the matching signal
//! disposition through the [`SignalSystem`] trait: `Catch` for a command
//! action so the delivery is recorded, `Ignore` or `Default` otherwise. The
//! original disposition observed on the first change is remembered so that
//! it can be restored around `exec`.
//!
//! Trap actions are never run inside a signal handler. The handler only
//! records the delivery; the engine runs pending actions between commands.

use crate::signal;
use crate::system::{Disposition, Errno};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Condition that may trigger a trap action.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Condition {
    /// Normal shell exit
    Exit,
    /// Delivery of a signal
    Signal(i32),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Exit => "EXIT".fmt(f),
            Condition::Signal(number) => match signal::name_from_number(*number) {
                Some(name) => name.fmt(f),
                None => number.fmt(f),
            },
        }
    }
}

impl std::str::FromStr for Condition {
    type Err = ();

    /// Parses a condition: `EXIT`, `0`, a signal name, or a signal number.
    fn from_str(s: &str) -> Result<Condition, ()> {
        if s == "EXIT" || s == "0" {
            return Ok(Condition::Exit);
        }
        if let Some(number) = signal::number_from_name(s) {
            return Ok(Condition::Signal(number));
        }
        match s.parse() {
            Ok(number) if signal::name_from_number(number).is_some() => {
                Ok(Condition::Signal(number))
            }
            _ => Err(()),
        }
    }
}

/// Action taken when a trap condition occurs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Action {
    /// Perform the default action for the condition.
    #[default]
    Default,
    /// Ignore the condition.
    Ignore,
    /// Execute the string as a command.
    Command(Rc<str>),
}

/// Error setting a trap action.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum SetActionError {
    /// `SIGKILL` and `SIGSTOP` cannot be trapped.
    #[error("the signal cannot be trapped")]
    Untrappable,
    /// The underlying system call failed.
    #[error("{0}")]
    SystemError(Errno),
}

/// Interface for changing signal dispositions.
///
/// This is the part of the system interface trap handling depends on.
pub trait SignalSystem {
    /// Changes the disposition of a signal, returning the previous one.
    fn set_disposition(&mut self, signal: i32, disposition: Disposition)
        -> Result<Disposition, Errno>;
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct SignalState {
    action: Action,
    /// Disposition in effect before the shell first touched this signal
    origin: Option<Disposition>,
}

/// Collection of trap actions and signal disposition bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct TrapSet {
    exit_action: Action,
    signals: BTreeMap<i32, SignalState>,
}

impl TrapSet {
    /// Creates an empty trap set.
    #[must_use]
    pub fn new() -> TrapSet {
        Default::default()
    }

    /// Returns the action for a condition.
    #[must_use]
    pub fn get_action(&self, condition: Condition) -> &Action {
        match condition {
            Condition::Exit => &self.exit_action,
            Condition::Signal(number) => self
                .signals
                .get(&number)
                .map(|state| &state.action)
                .unwrap_or(&Action::Default),
        }
    }

    /// Sets the action for a condition, updating the signal disposition.
    pub fn set_action<S: SignalSystem>(
        &mut self,
        system: &mut S,
        condition: Condition,
        action: Action,
    ) -> Result<(), SetActionError> {
        let number = match condition {
            Condition::Exit => {
                self.exit_action = action;
                return Ok(());
            }
            Condition::Signal(number) => number,
        };
        if number == libc::SIGKILL || number == libc::SIGSTOP {
            return Err(SetActionError::Untrappable);
        }

        let disposition = match &action {
            Action::Default => Disposition::Default,
            Action::Ignore => Disposition::Ignore,
            Action::Command(_) => Disposition::Catch,
        };
        let previous = system
            .set_disposition(number, disposition)
            .map_err(SetActionError::SystemError)?;

        let state = self.signals.entry(number).or_default();
        state.origin.get_or_insert(previous);
        state.action = action;
        Ok(())
    }

    /// Iterates over the conditions with a non-default action.
    pub fn iter(&self) -> impl Iterator<Item = (Condition, &Action)> {
        let exit = (self.exit_action != Action::Default)
            .then_some((Condition::Exit, &self.exit_action));
        exit.into_iter().chain(self.signals.iter().filter_map(
            |(&number, state)| match state.action {
                Action::Default => None,
                _ => Some((Condition::Signal(number), &state.action)),
            },
        ))
    }

    /// Adjusts traps for a subshell environment.
    ///
    /// Trap actions set to commands are reset to the default action, as
    /// POSIX requires; ignored signals stay ignored. The EXIT trap is
    /// cleared.
    pub fn enter_subshell<S: SignalSystem>(&mut self, system: &mut S) {
        self.exit_action = Action::Default;
        for (&number, state) in &mut self.signals {
            if matches!(state.action, Action::Command(_)) {
                state.action = Action::Default;
                let _ = system.set_disposition(number, Disposition::Default);
            }
        }
    }

    /// Restores every touched signal to its original disposition.
    ///
    /// This is used just before `exec` replaces the process image.
    pub fn restore_origin_dispositions<S: SignalSystem>(&mut self, system: &mut S) {
        for (&number, state) in &mut self.signals {
            if let Some(origin) = state.origin.take() {
                let _ = system.set_disposition(number, origin);
            }
            state.action = Action::Default;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Records dispositions without touching any real signal.
    #[derive(Default)]
    struct DummySystem(HashMap<i32, Disposition>);

    impl SignalSystem for DummySystem {
        fn set_disposition(
            &mut self,
            signal: i32,
            disposition: Disposition,
        ) -> Result<Disposition, Errno> {
            let old = self.0.insert(signal, disposition);
            Ok(old.unwrap_or(Disposition::Default))
        }
    }

    #[test]
    fn default_action_is_returned_for_unset_conditions() {
        let set = TrapSet::new();
        assert_eq!(set.get_action(Condition::Exit), &Action::Default);
        assert_eq!(
            set.get_action(Condition::Signal(libc::SIGINT)),
            &Action::Default
        );
    }

    #[test]
    fn setting_command_action_installs_catch_disposition() {
        let mut system = DummySystem::default();
        let mut set = TrapSet::new();
        set.set_action(
            &mut system,
            Condition::Signal(libc::SIGINT),
            Action::Command("echo INT".into()),
        )
        .unwrap();

        assert_eq!(system.0[&libc::SIGINT], Disposition::Catch);
        assert_eq!(
            set.get_action(Condition::Signal(libc::SIGINT)),
            &Action::Command("echo INT".into())
        );
    }

    #[test]
    fn setting_ignore_action_installs_ignore_disposition() {
        let mut system = DummySystem::default();
        let mut set = TrapSet::new();
        set.set_action(
            &mut system,
            Condition::Signal(libc::SIGQUIT),
            Action::Ignore,
        )
        .unwrap();
        assert_eq!(system.0[&libc::SIGQUIT], Disposition::Ignore);
    }

    #[test]
    fn kill_and_stop_cannot_be_trapped() {
        let mut system = DummySystem::default();
        let mut set = TrapSet::new();
        for signal in [libc::SIGKILL, libc::SIGSTOP] {
            let result = set.set_action(
                &mut system,
                Condition::Signal(signal),
                Action::Ignore,
            );
            assert_eq!(result, Err(SetActionError::Untrappable));
        }
    }

    #[test]
    fn exit_action_does_not_touch_the_system() {
        let mut system = DummySystem::default();
        let mut set = TrapSet::new();
        set.set_action(&mut system, Condition::Exit, Action::Command("echo bye".into()))
            .unwrap();
        assert!(system.0.is_empty());
        assert_eq!(
            set.get_action(Condition::Exit),
            &Action::Command("echo bye".into())
        );
    }

    #[test]
    fn entering_subshell_resets_command_actions_only() {
        let mut system = DummySystem::default();
        let mut set = TrapSet::new();
        set.set_action(
            &mut system,
            Condition::Signal(libc::SIGINT),
            Action::Command("echo INT".into()),
        )
        .unwrap();
        set.set_action(
            &mut system,
            Condition::Signal(libc::SIGQUIT),
            Action::Ignore,
        )
        .unwrap();

        set.enter_subshell(&mut system);
        assert_eq!(
            set.get_action(Condition::Signal(libc::SIGINT)),
            &Action::Default
        );
        assert_eq!(system.0[&libc::SIGINT], Disposition::Default);
        assert_eq!(
            set.get_action(Condition::Signal(libc::SIGQUIT)),
            &Action::Ignore
        );
        assert_eq!(system.0[&libc::SIGQUIT], Disposition::Ignore);
    }

    #[test]
    fn condition_parsing_and_display() {
        assert_eq!("EXIT".parse(), Ok(Condition::Exit));
        assert_eq!("0".parse(), Ok(Condition::Exit));
        assert_eq!("INT".parse(), Ok(Condition::Signal(libc::SIGINT)));
        assert_eq!("SIGTERM".parse(), Ok(Condition::Signal(libc::SIGTERM)));
        assert_eq!(
            libc::SIGINT.to_string().parse(),
            Ok(Condition::Signal(libc::SIGINT))
        );
        assert_eq!("NOSUCH".parse::<Condition>(), Err(()));

        assert_eq!(Condition::Exit.to_string(), "EXIT");
        assert_eq!(Condition::Signal(libc::SIGINT).to_string(), "INT");
    }
}
