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

//! Function definitions.

use marsh_syntax::syntax::FullCompoundCommand;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Definition of a function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Function {
    /// String that identifies the function
    pub name: String,

    /// Command that is executed when the function is called
    ///
    /// The body is shared with the function definition command in the
    /// syntax tree, so defining a function does not copy the body and
    /// every invocation reuses one definition.
    pub body: Rc<FullCompoundCommand>,

    /// Whether the function definition refuses redefinition and unsetting
    pub is_read_only: bool,
}

impl Function {
    /// Creates a new function.
    #[inline]
    pub fn new<N: Into<String>>(name: N, body: Rc<FullCompoundCommand>) -> Function {
        Function {
            name: name.into(),
            body,
            is_read_only: false,
        }
    }

    /// Makes the function read-only (builder style).
    #[must_use]
    pub fn make_read_only(mut self) -> Function {
        self.is_read_only = true;
        self
    }
}

/// Error redefining or removing a read-only function.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("read-only function `{name}` cannot be modified")]
pub struct ReadOnlyError {
    /// Function name
    pub name: String,
}

/// Collection of function definitions, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct FunctionSet {
    functions: HashMap<String, Rc<Function>>,
}

impl FunctionSet {
    /// Creates an empty function set.
    #[must_use]
    pub fn new() -> FunctionSet {
        Default::default()
    }

    /// Returns the function with the given name, if defined.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rc<Function>> {
        self.functions.get(name)
    }

    /// Defines a function, replacing any existing definition of the same
    /// name.
    pub fn define(&mut self, function: Function) -> Result<(), ReadOnlyError> {
        if let Some(existing) = self.functions.get(&function.name) {
            if existing.is_read_only {
                return Err(ReadOnlyError {
                    name: function.name.clone(),
                });
            }
        }
        self.functions
            .insert(function.name.clone(), Rc::new(function));
        Ok(())
    }

    /// Removes the function with the given name.
    ///
    /// Returns whether a function was removed.
    pub fn unset(&mut self, name: &str) -> Result<bool, ReadOnlyError> {
        if let Some(existing) = self.functions.get(name) {
            if existing.is_read_only {
                return Err(ReadOnlyError {
                    name: name.to_string(),
                });
            }
        }
        Ok(self.functions.remove(name).is_some())
    }

    /// Iterates over the functions in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Function>> {
        self.functions.values()
    }

    /// Returns the number of functions defined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no function is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
