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

//! Quote removal, the final step of word expansion.

use super::attr::AttrChar;

/// Removes the quotation characters and returns the plain string value.
#[must_use]
pub fn remove_quotes(field: &[AttrChar]) -> String {
    field
        .iter()
        .filter(|c| !c.is_quoting)
        .map(|c| c.value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::attr::Origin;

    #[test]
    fn quoting_characters_are_removed() {
        let field = [
            AttrChar::quoting('"', false),
            AttrChar {
                value: 'a',
                origin: Origin::Literal,
                is_quoted: true,
                is_quoting: false,
            },
            AttrChar::quoting('"', false),
        ];
        assert_eq!(remove_quotes(&field), "a");
    }

    #[test]
    fn quoted_characters_keep_their_value() {
        let field = [
            AttrChar::quoting('\\', false),
            AttrChar {
                value: '$',
                origin: Origin::Literal,
                is_quoted: true,
                is_quoting: false,
            },
        ];
        assert_eq!(remove_quotes(&field), "$");
    }
}
