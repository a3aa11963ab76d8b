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

//! Attributed characters, the intermediate form of word expansion.

/// Origin of a character produced in the initial expansion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    /// The character appeared literally in the original word.
    Literal,

    /// The character originates from a tilde expansion.
    ///
    /// This kind of character is treated literally in the pathname
    /// expansion and is not subject to field splitting.
    HardExpansion,

    /// The character originates from a parameter expansion, command
    /// substitution, or arithmetic expansion.
    ///
    /// This kind of character is subject to field splitting where
    /// applicable.
    SoftExpansion,
}

/// Character with attributes describing its origin.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AttrChar {
    /// Character value.
    pub value: char,
    /// Character origin.
    pub origin: Origin,
    /// Whether this character is quoted by another character.
    pub is_quoted: bool,
    /// Whether this is a quotation character that quotes other characters.
    ///
    /// Note that a character can be both quoting and quoted. For example,
    /// the backslash in `"\$"` quotes the dollar and is quoted by the
    /// double-quotes.
    pub is_quoting: bool,
}

impl AttrChar {
    /// Creates a plain literal character.
    #[must_use]
    pub fn literal(value: char) -> AttrChar {
        AttrChar {
            value,
            origin: Origin::Literal,
            is_quoted: false,
            is_quoting: false,
        }
    }

    /// Creates a quotation mark character.
    #[must_use]
    pub fn quoting(value: char, is_quoted: bool) -> AttrChar {
        AttrChar {
            value,
            origin: Origin::Literal,
            is_quoted,
            is_quoting: true,
        }
    }
}

/// Result of the initial expansion: a string of attributed characters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AttrField(pub Vec<AttrChar>);

impl AttrField {
    /// Returns the character values, ignoring attributes.
    #[must_use]
    pub fn values(&self) -> String {
        self.0.iter().map(|c| c.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_constructor() {
        let c = AttrChar::literal('x');
        assert_eq!(c.value, 'x');
        assert_eq!(c.origin, Origin::Literal);
        assert!(!c.is_quoted);
        assert!(!c.is_quoting);
    }

    #[test]
    fn quoting_constructor() {
        let c = AttrChar::quoting('"', true);
        assert!(c.is_quoting);
        assert!(c.is_quoted);
    }
}
