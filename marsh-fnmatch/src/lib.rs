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

//! Pattern matching based on globbing patterns.
//!
//! This crate compiles a shell pattern into an anchored regular expression
//! and matches strings against it. The supported syntax is:
//!
//! - Any single character (`?`)
//! - Any character sequence (`*`)
//! - Bracket expression (`[...]`)
//!     - Character literals and ranges (e.g. `a-z`)
//!     - Complement (`[!...]` or `[^...]`)
//!     - Character classes (e.g. `[:alpha:]`)
//! - Backslash escape making the next character literal
//!
//! A backslash escape is how callers pass quoted characters through the
//! expansion pipeline: a quoted `*` arrives here as `\*` and matches a
//! literal asterisk. An unclosed bracket expression is not an error; the
//! `[` matches itself, as POSIX requires.
//!
//! ```
//! use marsh_fnmatch::Pattern;
//! let pattern = Pattern::parse("*.r[a-z]").unwrap();
//! assert!(pattern.is_match("lib.rs"));
//! assert!(!pattern.is_match("lib.c"));
//! ```

use regex::Regex;
use thiserror::Error;

/// Error in pattern compilation.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The translated regular expression was rejected.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Compiled pattern.
#[derive(Clone, Debug)]
pub struct Pattern {
    regex: Option<Regex>,
    /// The literal string the pattern equals, if it has no special characters
    literal: Option<String>,
    starts_with_literal_dot: bool,
}

/// Bracket expression character classes known to POSIX.
const CLASSES: &[&str] = &[
    "alnum", "alpha", "blank", "cntrl", "digit", "graph", "lower", "print", "punct", "space",
    "upper", "xdigit",
];

impl Pattern {
    /// Compiles a pattern.
    pub fn parse(pattern: &str) -> Result<Pattern, Error> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut regex = String::from("(?s)\\A");
        let mut literal = String::new();
        let mut is_literal = true;
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '?' => {
                    regex.push('.');
                    is_literal = false;
                    pos += 1;
                }
                '*' => {
                    regex.push_str(".*");
                    is_literal = false;
                    pos += 1;
                }
                '\\' => {
                    pos += 1;
                    let c = if pos < chars.len() { chars[pos] } else { '\\' };
                    push_escaped(&mut regex, c);
                    literal.push(c);
                    pos += if pos < chars.len() { 1 } else { 0 };
                }
                '[' => match translate_bracket(&chars, pos) {
                    Some((bracket, end)) => {
                        regex.push_str(&bracket);
                        is_literal = false;
                        pos = end;
                    }
                    None => {
                        regex.push_str("\\[");
                        literal.push('[');
                        pos += 1;
                    }
                },
                c => {
                    push_escaped(&mut regex, c);
                    literal.push(c);
                    pos += 1;
                }
            }
        }
        regex.push_str("\\z");

        let starts_with_literal_dot = matches!(chars.first(), Some('.'))
            || (matches!(chars.first(), Some('\\')) && matches!(chars.get(1), Some('.')));

        if is_literal {
            Ok(Pattern {
                regex: None,
                literal: Some(literal),
                starts_with_literal_dot,
            })
        } else {
            Ok(Pattern {
                regex: Some(Regex::new(&regex)?),
                literal: None,
                starts_with_literal_dot,
            })
        }
    }

    /// Returns whether the pattern matches the whole of the given string.
    #[must_use]
    pub fn is_match(&self, subject: &str) -> bool {
        match (&self.literal, &self.regex) {
            (Some(literal), _) => literal == subject,
            (None, Some(regex)) => regex.is_match(subject),
            (None, None) => unreachable!("pattern with neither literal nor regex"),
        }
    }

    /// Returns the literal string this pattern matches, if the pattern
    /// contains no special characters.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    /// Whether the first character of the pattern is a literal period.
    ///
    /// Pathname expansion uses this to decide whether the pattern may match
    /// hidden files.
    #[must_use]
    pub fn starts_with_literal_dot(&self) -> bool {
        self.starts_with_literal_dot
    }
}

/// Appends a regex-escaped character.
fn push_escaped(regex: &mut String, c: char) {
    let mut buffer = [0; 4];
    regex.push_str(&regex::escape(c.encode_utf8(&mut buffer)));
}

/// Translates a bracket expression starting at `start` (which indexes the
/// `[`). Returns the regex fragment and the index past the closing `]`, or
/// `None` if the expression is not closed.
fn translate_bracket(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut pos = start + 1;
    let mut fragment = String::from("[");

    if matches!(chars.get(pos), Some('!') | Some('^')) {
        fragment.push('^');
        pos += 1;
    }
    // A `]` right after the (possibly complemented) opening is a literal
    if chars.get(pos) == Some(&']') {
        fragment.push_str("\\]");
        pos += 1;
    }

    loop {
        match chars.get(pos) {
            None => return None,
            Some(']') => {
                fragment.push(']');
                return Some((fragment, pos + 1));
            }
            Some('[') if chars.get(pos + 1) == Some(&':') => {
                let class_start = pos + 2;
                let mut end = class_start;
                while matches!(chars.get(end), Some(c) if c.is_ascii_alphabetic()) {
                    end += 1;
                }
                let class: String = chars[class_start..end].iter().collect();
                if chars.get(end) == Some(&':')
                    && chars.get(end + 1) == Some(&']')
                    && CLASSES.contains(&&class[..])
                {
                    fragment.push_str("[:");
                    fragment.push_str(&class);
                    fragment.push_str(":]");
                    pos = end + 2;
                } else {
                    fragment.push_str("\\[");
                    pos += 1;
                }
            }
            Some('-') => {
                fragment.push('-');
                pos += 1;
            }
            Some(&c) => {
                if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~') {
                    fragment.push('\\');
                }
                fragment.push(c);
                pos += 1;
            }
        }
    }
}
