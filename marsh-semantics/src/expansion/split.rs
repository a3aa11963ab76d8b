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

//! Field splitting
//!
//! Field splitting divides a field into smaller parts delimited by a field
//! separator character obtained from `$IFS`. Only unquoted characters
//! having a `SoftExpansion` [origin](Origin) are subject to delimiting.
//!
//! Separator characters that are whitespace collapse: a run of them
//! delimits one field boundary, and leading or trailing runs are ignored.
//! A non-whitespace separator always delimits a field, possibly producing
//! an empty one, as in `a::b` with `IFS=:`.
//!
//! As a side effect, this pass removes fields that are completely empty.
//! A field resulting from a quoted empty word still carries its quotation
//! characters at this point and is therefore not removed.

use super::attr::{AttrChar, Origin};

/// Whether the character delimits fields.
fn is_separator(c: &AttrChar, ifs: &str) -> bool {
    c.origin == Origin::SoftExpansion && !c.is_quoted && !c.is_quoting && ifs.contains(c.value)
}

fn is_ifs_whitespace(value: char) -> bool {
    matches!(value, ' ' | '\t' | '\n')
}

/// Splits each field at the separators defined by `ifs`.
///
/// A field that is completely empty before splitting produces no output
/// field; empty fields produced by non-whitespace separators are kept.
pub fn split_fields(fields: Vec<Vec<AttrChar>>, ifs: &str) -> Vec<Vec<AttrChar>> {
    let mut result = Vec::new();
    for field in fields {
        split_one(field, ifs, &mut result);
    }
    result
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum State {
    /// Before the first field
    Start,
    /// Inside a field
    InField,
    /// Just after a delimiter; a second non-whitespace separator here
    /// delimits an empty field
    Delimited { seen_non_ws: bool },
}

fn split_one(field: Vec<AttrChar>, ifs: &str, result: &mut Vec<Vec<AttrChar>>) {
    let mut current = Vec::new();
    let mut state = State::Start;

    for c in field {
        if !is_separator(&c, ifs) {
            current.push(c);
            state = State::InField;
        } else if is_ifs_whitespace(c.value) {
            if state == State::InField {
                result.push(std::mem::take(&mut current));
                state = State::Delimited { seen_non_ws: false };
            }
        } else {
            match state {
                State::InField | State::Start => {
                    result.push(std::mem::take(&mut current));
                }
                State::Delimited { seen_non_ws: true } => result.push(Vec::new()),
                // The separator merges with the adjacent whitespace
                State::Delimited { seen_non_ws: false } => {}
            }
            state = State::Delimited { seen_non_ws: true };
        }
    }

    if state == State::InField {
        result.push(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IFS: &str = " \t\n";

    fn soft(s: &str) -> Vec<AttrChar> {
        s.chars()
            .map(|value| AttrChar {
                value,
                origin: Origin::SoftExpansion,
                is_quoted: false,
                is_quoting: false,
            })
            .collect()
    }

    fn values(fields: &[Vec<AttrChar>]) -> Vec<String> {
        fields
            .iter()
            .map(|field| field.iter().map(|c| c.value).collect())
            .collect()
    }

    #[test]
    fn whitespace_separators_collapse() {
        let fields = split_fields(vec![soft("  one  two\tthree \n")], IFS);
        assert_eq!(values(&fields), ["one", "two", "three"]);
    }

    #[test]
    fn non_whitespace_separator_produces_empty_fields() {
        let fields = split_fields(vec![soft("a::b")], ":");
        assert_eq!(values(&fields), ["a", "", "b"]);
    }

    #[test]
    fn trailing_non_whitespace_separator_does_not_add_a_field() {
        let fields = split_fields(vec![soft("a:")], ":");
        assert_eq!(values(&fields), ["a"]);
    }

    #[test]
    fn quoted_characters_are_not_split() {
        let mut field = soft("a b");
        for c in &mut field {
            c.is_quoted = true;
        }
        let fields = split_fields(vec![field], IFS);
        assert_eq!(values(&fields), ["a b"]);
    }

    #[test]
    fn literal_characters_are_not_split() {
        let field: Vec<AttrChar> = "a b".chars().map(AttrChar::literal).collect();
        let fields = split_fields(vec![field], IFS);
        assert_eq!(values(&fields), ["a b"]);
    }

    #[test]
    fn empty_unquoted_field_is_removed() {
        let fields = split_fields(vec![soft("")], IFS);
        assert_eq!(values(&fields), Vec::<String>::new());

        let fields = split_fields(vec![soft("   ")], IFS);
        assert_eq!(values(&fields), Vec::<String>::new());
    }

    #[test]
    fn field_with_quoting_characters_survives() {
        let field = vec![AttrChar::quoting('"', false), AttrChar::quoting('"', false)];
        let fields = split_fields(vec![field], IFS);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn empty_ifs_does_not_split() {
        let fields = split_fields(vec![soft("a b")], "");
        assert_eq!(values(&fields), ["a b"]);
    }
}
