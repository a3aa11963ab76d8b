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

//! Execution tracing (the `xtrace` option).
//!
//! When the `xtrace` option is on, the shell prints each simple command
//! after expansion, prefixed with `+ `, to the standard error. The trace is
//! accumulated in an [`XTrace`] buffer and printed in one write so traces
//! from concurrent subshells do not interleave within a line.

use marsh_env::option::{On, XTrace as XTraceOption};
use marsh_env::option::OptionSet;
use marsh_env::semantics::Field;
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;
use std::fmt::Write;

/// Buffer collecting the trace of one command.
#[derive(Debug, Default)]
pub struct XTrace {
    buffer: String,
}

impl XTrace {
    /// Creates a new trace buffer.
    #[must_use]
    pub fn new() -> XTrace {
        Default::default()
    }

    /// Returns a trace buffer if the `xtrace` option is on.
    #[must_use]
    pub fn from_options(options: &OptionSet) -> Option<XTrace> {
        (options.get(XTraceOption) == On).then(XTrace::new)
    }

    /// Appends a word to the trace.
    pub fn trace_word(&mut self, value: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        let _ = write!(self.buffer, "{}", quote_for_trace(value));
    }
}

/// Appends the expanded fields to the trace, if tracing is enabled.
pub fn trace_fields(xtrace: Option<&mut XTrace>, fields: &[Field]) {
    if let Some(xtrace) = xtrace {
        for field in fields {
            xtrace.trace_word(&field.value);
        }
    }
}

/// Prints the collected trace to the standard error.
pub fn print(env: &mut Env, xtrace: Option<XTrace>) {
    if let Some(xtrace) = xtrace {
        if !xtrace.buffer.is_empty() {
            let line = format!("+ {}\n", xtrace.buffer);
            let _ = env.system.write_all(Fd::STDERR, line.as_bytes());
        }
    }
}

/// Quotes a word for reproducible trace output.
///
/// Words consisting of ordinary characters are printed as is; anything
/// else is single-quoted.
fn quote_for_trace(value: &str) -> String {
    let ordinary = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=%+:@^,".contains(c));
    if ordinary {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::stub_env;
    use marsh_env::option::State;

    #[test]
    fn from_options_requires_xtrace() {
        let options = OptionSet::default();
        assert!(XTrace::from_options(&options).is_none());

        let mut options = OptionSet::default();
        options.set(XTraceOption, State::On);
        assert!(XTrace::from_options(&options).is_some());
    }

    #[test]
    fn trace_is_printed_with_plus_prefix() {
        let (mut env, state) = stub_env();
        let mut xtrace = XTrace::new();
        trace_fields(Some(&mut xtrace), &Field::fields(["echo", "hello world"]));
        print(&mut env, Some(xtrace));
        assert_eq!(state.borrow().stderr(), "+ echo 'hello world'\n");
    }

    #[test]
    fn empty_trace_prints_nothing() {
        let (mut env, state) = stub_env();
        print(&mut env, Some(XTrace::new()));
        print(&mut env, None);
        assert_eq!(state.borrow().stderr(), "");
    }
}
