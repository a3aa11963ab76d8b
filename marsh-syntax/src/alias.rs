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

//! Alias definitions.
//!
//! The [parser](crate::parser) substitutes aliases while it reads the first
//! word of a simple command. Alias substitution is not recursive: a
//! replacement never re-triggers the alias it came from.

use std::collections::HashMap;
use std::rc::Rc;

/// Name-replacement pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Alias {
    pub name: String,
    pub replacement: String,
}

/// Collection of aliases, keyed by name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AliasSet {
    aliases: HashMap<String, Rc<Alias>>,
}

impl AliasSet {
    /// Creates an empty alias set.
    #[must_use]
    pub fn new() -> AliasSet {
        Default::default()
    }

    /// Returns the alias with the given name, if defined.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rc<Alias>> {
        self.aliases.get(name)
    }

    /// Defines an alias, replacing any previous definition of the same name.
    pub fn insert(&mut self, name: String, replacement: String) {
        let alias = Rc::new(Alias {
            name: name.clone(),
            replacement,
        });
        self.aliases.insert(name, alias);
    }

    /// Removes the alias with the given name.
    ///
    /// Returns whether an alias was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.aliases.remove(name).is_some()
    }

    /// Iterates over the aliases in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Alias>> {
        self.aliases.values()
    }

    /// Returns the number of aliases defined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether no alias is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut set = AliasSet::new();
        assert!(set.get("ll").is_none());

        set.insert("ll".to_string(), "ls -l".to_string());
        assert_eq!(set.get("ll").unwrap().replacement, "ls -l");

        set.insert("ll".to_string(), "ls -la".to_string());
        assert_eq!(set.get("ll").unwrap().replacement, "ls -la");
        assert_eq!(set.len(), 1);

        assert!(set.remove("ll"));
        assert!(!set.remove("ll"));
        assert!(set.is_empty());
    }
}
