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

//! Pathname expansion
//!
//! Each field that contains an unquoted pattern character (`*`, `?`, or
//! `[`) is matched against the file system, one pathname component at a
//! time. The matches, sorted, replace the field. If nothing matches, the
//! field is left as is (after quote removal), as POSIX specifies with
//! `nullglob` semantics off.
//!
//! A pattern component never matches `.` or `..`, and matches a name
//! starting with a period only if the component starts with a literal
//! period. Quoted pattern characters match literally. The whole pass is
//! skipped while the `noglob` option is in effect.

use super::attr::AttrChar;
use super::quote_removal::remove_quotes;
use super::Result;
use marsh_env::option::{Glob, Off};
use marsh_env::Env;
use marsh_fnmatch::Pattern;
use std::ffi::CString;

/// Performs pathname expansion on the fields.
pub fn glob_fields(
    env: &mut Env,
    fields: Vec<Vec<AttrChar>>,
) -> Result<Vec<marsh_env::semantics::Field>> {
    let mut result = Vec::new();
    for field in fields {
        if env.options.get(Glob) == Off || !has_unquoted_pattern_char(&field) {
            result.push(marsh_env::semantics::Field::new(remove_quotes(&field)));
            continue;
        }

        let pattern = pattern_text(&field);
        let mut matches = match_pattern(env, &pattern);
        if matches.is_empty() {
            result.push(marsh_env::semantics::Field::new(remove_quotes(&field)));
        } else {
            matches.sort();
            result.extend(matches.into_iter().map(marsh_env::semantics::Field::new));
        }
    }
    Ok(result)
}

/// Whether the field contains a character that makes it a pattern.
fn has_unquoted_pattern_char(field: &[AttrChar]) -> bool {
    field
        .iter()
        .any(|c| !c.is_quoted && !c.is_quoting && matches!(c.value, '*' | '?' | '['))
}

/// Renders the field as a pattern string, escaping quoted characters.
///
/// Slashes are never escaped: they separate pathname components whether
/// quoted or not.
fn pattern_text(field: &[AttrChar]) -> String {
    let mut pattern = String::new();
    for c in field {
        if c.is_quoting {
            continue;
        }
        if c.value != '/' && (c.is_quoted || c.origin == super::Origin::HardExpansion) {
            pattern.push('\\');
        }
        pattern.push(c.value);
    }
    pattern
}

/// Matches a slash-separated pattern against the file system.
fn match_pattern(env: &Env, pattern: &str) -> Vec<String> {
    let (mut prefixes, relative_pattern) = if let Some(rest) = strip_absolute(pattern) {
        (vec!["/".to_string()], rest)
    } else {
        (vec![String::new()], pattern.to_string())
    };

    let components: Vec<&str> = relative_pattern.split('/').collect();
    for (index, component) in components.iter().enumerate() {
        let is_last = index + 1 == components.len();
        if component.is_empty() {
            // Consecutive or trailing slashes
            if !is_last {
                for prefix in &mut prefixes {
                    if !prefix.is_empty() && !prefix.ends_with('/') {
                        prefix.push('/');
                    }
                }
            }
            continue;
        }

        let Ok(compiled) = Pattern::parse(component) else {
            return Vec::new();
        };
        let mut next = Vec::new();
        for prefix in &prefixes {
            for name in list_directory(env, prefix) {
                if name.starts_with('.') && !compiled.starts_with_literal_dot() {
                    continue;
                }
                if !compiled.is_match(&name) {
                    continue;
                }
                let mut path = prefix.clone();
                if !path.is_empty() && !path.ends_with('/') {
                    path.push('/');
                }
                path.push_str(&name);
                if !is_last {
                    let Ok(c_path) = CString::new(path.clone()) else {
                        continue;
                    };
                    if !env.system.is_directory(&c_path) {
                        continue;
                    }
                }
                next.push(path);
            }
        }
        prefixes = next;
        if prefixes.is_empty() {
            return Vec::new();
        }
    }
    prefixes
}

/// Splits a leading slash off an absolute pattern.
fn strip_absolute(pattern: &str) -> Option<String> {
    pattern.strip_prefix('/').map(str::to_string)
}

/// Lists the entries of a directory named by a prefix of matched
/// components.
fn list_directory(env: &Env, prefix: &str) -> Vec<String> {
    let dir = if prefix.is_empty() { "." } else { prefix };
    let Ok(c_dir) = CString::new(dir) else {
        return Vec::new();
    };
    env.system.read_dir(&c_dir).unwrap_or_default()
}
