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

//! Execution of the case conditional construct

use crate::command::Command;
use crate::expansion::{expand_word, expand_word_attr};
use crate::Handle;
use marsh_env::semantics::{ExitStatus, Result};
use marsh_env::Env;
use marsh_fnmatch::Pattern;
use marsh_syntax::syntax::{CaseItem, Word};
use std::ops::ControlFlow::Continue;

/// Executes the case conditional construct.
///
/// The subject is expanded without field splitting or pathname expansion.
/// The patterns of each item are expanded and matched in the order of
/// appearance; the body of the first item with a matching pattern is
/// executed. Quoted characters in a pattern match literally.
pub fn execute(env: &mut Env, subject: &Word, items: &[CaseItem]) -> Result {
    let subject = match expand_word(env, subject) {
        Ok((field, _)) => field.value,
        Err(error) => return error.handle(env),
    };

    for item in items {
        for pattern in &item.patterns {
            let attr_field = match expand_word_attr(env, pattern) {
                Ok((field, _)) => field,
                Err(error) => return error.handle(env),
            };

            let mut pattern_text = String::new();
            for c in &attr_field.0 {
                if c.is_quoting {
                    continue;
                }
                if c.is_quoted {
                    pattern_text.push('\\');
                }
                pattern_text.push(c.value);
            }

            let matches = match Pattern::parse(&pattern_text) {
                Ok(pattern) => pattern.is_match(&subject),
                // An invalid pattern matches nothing
                Err(_) => false,
            };
            if matches {
                return item.body.execute(env);
            }
        }
    }

    env.exit_status = ExitStatus::SUCCESS;
    Continue(())
}
