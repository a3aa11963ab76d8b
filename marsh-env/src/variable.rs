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

//! Shell variables.
//!
//! A [`VariableSet`] is a stack of *contexts*, and a context is a map of
//! name-variable pairs. The base context is always present and holds
//! globally assigned variables. A *regular* context is pushed on a function
//! call and owns that call's positional parameters. A *volatile* context
//! holds the temporary assignments of one simple command (the overlay of
//! `VAR=value command`); popping it restores the state visible before the
//! command, which is how the engine guarantees that per-command assignments
//! never leak.
//!
//! Variables in a context hide those with the same name in lower contexts.
//! The context stack is usually managed through the guard returned from
//! [`Env::push_context`](crate::Env::push_context), which pops the context
//! when dropped even if the command in between failed.

use crate::semantics::Field;
use itertools::Itertools;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::HashMap;
use std::ffi::CString;
use thiserror::Error;

/// Value and attributes of a shell variable.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Variable {
    /// Value, or `None` if the variable is declared but unset
    pub value: Option<String>,
    /// Whether the variable appears in the environment of executed programs
    pub is_exported: bool,
    /// Whether the variable refuses assignment and unsetting
    pub is_read_only: bool,
}

impl Variable {
    /// Creates a variable with the given value.
    pub fn new<S: Into<String>>(value: S) -> Variable {
        Variable {
            value: Some(value.into()),
            is_exported: false,
            is_read_only: false,
        }
    }

    /// Makes the variable exported (builder style).
    #[must_use]
    pub fn export(mut self) -> Variable {
        self.is_exported = true;
        self
    }

    /// Makes the variable read-only (builder style).
    #[must_use]
    pub fn make_read_only(mut self) -> Variable {
        self.is_read_only = true;
        self
    }
}

/// Error assigning to a read-only variable.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("cannot assign to read-only variable")]
pub struct AssignError {
    /// Value that was not assigned
    pub new_value: String,
}

/// Error unsetting a read-only variable.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("cannot unset read-only variable `{name}`")]
pub struct UnsetError {
    /// Variable name
    pub name: String,
}

/// Mutable access to a variable in a set.
///
/// This is the only way to modify a variable stored in a [`VariableSet`],
/// so that the read-only attribute is always honored.
#[derive(Debug)]
pub struct VariableRefMut<'a>(&'a mut Variable);

impl VariableRefMut<'_> {
    /// Assigns a new value, returning the old one.
    pub fn assign<S: Into<String>>(
        &mut self,
        value: S,
    ) -> Result<Option<String>, AssignError> {
        let value = value.into();
        if self.0.is_read_only {
            return Err(AssignError { new_value: value });
        }
        Ok(self.0.value.replace(value))
    }

    /// Sets the exported attribute.
    pub fn export(&mut self, export: bool) {
        self.0.is_exported = export;
    }

    /// Sets the read-only attribute. It cannot be cleared.
    pub fn make_read_only(&mut self) {
        self.0.is_read_only = true;
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.0.value.as_deref()
    }

    /// Whether the variable is exported.
    #[must_use]
    pub fn is_exported(&self) -> bool {
        self.0.is_exported
    }

    /// Whether the variable is read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.0.is_read_only
    }
}

impl<'a> From<&'a mut Variable> for VariableRefMut<'a> {
    fn from(variable: &'a mut Variable) -> Self {
        VariableRefMut(variable)
    }
}

/// Positional parameters
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PositionalParams {
    /// Values of positional parameters
    pub values: Vec<String>,
}

impl PositionalParams {
    /// Creates a `PositionalParams` instance from fields.
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        PositionalParams {
            values: fields.into_iter().map(|field| field.value).collect(),
        }
    }
}

/// Variable context
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Context {
    /// Context for normal assignments.
    ///
    /// The base context is a regular context. Every function invocation
    /// also creates a regular context for its positional parameters.
    Regular { positional_params: PositionalParams },

    /// Context for temporary per-command assignments.
    Volatile,
}

impl Default for Context {
    fn default() -> Self {
        Context::Regular {
            positional_params: Default::default(),
        }
    }
}

/// Type of a [`Context`], without the contained data.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContextType {
    Regular,
    Volatile,
}

impl From<ContextType> for Context {
    fn from(r#type: ContextType) -> Context {
        match r#type {
            ContextType::Regular => Context::default(),
            ContextType::Volatile => Context::Volatile,
        }
    }
}

/// Choice of a context in which a variable is assigned or searched for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope {
    /// The base context.
    Global,
    /// The topmost regular context.
    Local,
    /// The topmost context, which must be volatile.
    Volatile,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct VariableInContext {
    variable: Variable,
    context_index: usize,
}

/// Collection of variables.
///
/// See the [module documentation](self) for details.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableSet {
    /// Hash map containing all variables.
    ///
    /// The value of a hash map entry is a stack of variables defined in
    /// contexts, sorted in the ascending order of the context index.
    all_variables: HashMap<String, Vec<VariableInContext>>,

    /// Stack of contexts. Never empty: the base context is the first item.
    contexts: Vec<Context>,
}

impl Default for VariableSet {
    fn default() -> Self {
        VariableSet {
            all_variables: Default::default(),
            contexts: vec![Context::default()],
        }
    }
}

/// Name of the variable holding the field separators (`IFS`)
pub const IFS: &str = "IFS";
/// Default value of `$IFS`
pub const IFS_INITIAL_VALUE: &str = " \t\n";
/// Name of the variable holding the command search path
pub const PATH: &str = "PATH";
/// Name of the variable holding the home directory
pub const HOME: &str = "HOME";
/// Name of the variable holding the main prompt
pub const PS1: &str = "PS1";
/// Default value of `$PS1`
pub const PS1_INITIAL_VALUE: &str = "$ ";
/// Name of the variable holding the continuation prompt
pub const PS2: &str = "PS2";
/// Default value of `$PS2`
pub const PS2_INITIAL_VALUE: &str = "> ";
/// Name of the variable holding the parent process ID
pub const PPID: &str = "PPID";
/// Name of the variable tracking the working directory
pub const PWD: &str = "PWD";
/// Name of the variable holding the previous working directory
pub const OLDPWD: &str = "OLDPWD";
/// Name of the variable holding the last argument of the previous command
pub const LAST_ARG: &str = "_";

impl VariableSet {
    /// Creates an empty variable set.
    #[must_use]
    pub fn new() -> VariableSet {
        Default::default()
    }

    /// Gets a reference to the visible variable with the specified name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Variable> {
        Some(&self.all_variables.get(name)?.last()?.variable)
    }

    /// Returns the string value of the visible variable, if set.
    #[must_use]
    pub fn get_scalar(&self, name: &str) -> Option<&str> {
        self.get(name)?.value.as_deref()
    }

    fn index_of_topmost_regular_context(contexts: &[Context]) -> usize {
        contexts
            .iter()
            .rposition(|context| matches!(context, Context::Regular { .. }))
            .expect("base context has gone")
    }

    /// Gets a mutable reference to the variable with the specified name,
    /// creating a defaulted one if none is visible in the chosen scope.
    ///
    /// - `Global` operates on the base context. A variable visible in a
    ///   volatile context is moved down so the assignment survives the
    ///   volatile context.
    /// - `Local` operates on the topmost regular context.
    /// - `Volatile` requires the topmost context to be volatile and shadows
    ///   any lower variable. This is the scope of per-command assignments.
    pub fn get_or_new<S: Into<String>>(&mut self, name: S, scope: Scope) -> VariableRefMut {
        self.get_or_new_impl(name.into(), scope)
    }

    fn get_or_new_impl(&mut self, name: String, scope: Scope) -> VariableRefMut {
        let stack = match self.all_variables.entry(name) {
            Vacant(vacant) => vacant.insert(Vec::new()),
            Occupied(occupied) => occupied.into_mut(),
        };
        let context_index = match scope {
            Scope::Global => 0,
            Scope::Local => Self::index_of_topmost_regular_context(&self.contexts),
            Scope::Volatile => self.contexts.len() - 1,
        };

        match scope {
            Scope::Global | Scope::Local => 'found: {
                let mut removed_volatile_variable = None;

                // Search the stack for a variable to return. A variable in a
                // volatile context is moved into the target context so the
                // assignment persists when the volatile context is popped.
                while let Some(var) = stack.last_mut() {
                    if var.context_index < context_index {
                        break;
                    }
                    match self.contexts[var.context_index] {
                        Context::Regular { .. } => {
                            if let Some(removed) = removed_volatile_variable {
                                var.variable = removed;
                            }
                            break 'found;
                        }
                        Context::Volatile => {
                            removed_volatile_variable
                                .get_or_insert(stack.pop().unwrap().variable);
                        }
                    }
                }

                stack.push(VariableInContext {
                    variable: removed_volatile_variable.unwrap_or_default(),
                    context_index,
                });
            }

            Scope::Volatile => {
                assert!(
                    matches!(self.contexts[context_index], Context::Volatile),
                    "no volatile context to store the variable",
                );
                match stack.last() {
                    Some(var) if var.context_index == context_index => {}
                    Some(var) => {
                        let variable = var.variable.clone();
                        stack.push(VariableInContext {
                            variable,
                            context_index,
                        });
                    }
                    None => stack.push(VariableInContext {
                        variable: Variable::default(),
                        context_index,
                    }),
                }
            }
        }

        VariableRefMut::from(&mut stack.last_mut().unwrap().variable)
    }

    /// Removes the variable with the specified name from all contexts.
    ///
    /// Returns the previously visible variable, if any. If the visible
    /// variable is read-only, nothing is removed.
    pub fn unset(&mut self, name: &str) -> Result<Option<Variable>, UnsetError> {
        let Some(stack) = self.all_variables.get_mut(name) else {
            return Ok(None);
        };
        if let Some(top) = stack.last() {
            if top.variable.is_read_only {
                return Err(UnsetError {
                    name: name.to_string(),
                });
            }
        }
        let removed = stack.pop().map(|vic| vic.variable);
        stack.clear();
        Ok(removed)
    }

    /// Iterates over all visible name-variable pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.all_variables.iter().filter_map(|(name, stack)| {
            stack.last().map(|vic| (&name[..], &vic.variable))
        })
    }

    /// Returns the environment strings for executing a program, one
    /// `name=value` entry for each exported variable with a value.
    #[must_use]
    pub fn env_c_strings(&self) -> Vec<CString> {
        self.iter()
            .filter(|(_, variable)| variable.is_exported)
            .filter_map(|(name, variable)| {
                let value = variable.value.as_deref()?;
                CString::new(format!("{name}={value}")).ok()
            })
            .sorted()
            .collect()
    }

    /// Imports environment entries as exported variables in the base
    /// context.
    pub fn extend_env<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in vars {
            let mut variable = self.get_or_new(name, Scope::Global);
            if variable.assign(value).is_ok() {
                variable.export(true);
            }
        }
    }

    /// Initializes the variables the shell predefines.
    ///
    /// Variables already present (typically imported from the environment)
    /// are not overwritten, except `IFS`, which is always reset.
    pub fn init(&mut self) {
        let _ = self.get_or_new(IFS, Scope::Global).assign(IFS_INITIAL_VALUE);
        for (name, value) in [(PS1, PS1_INITIAL_VALUE), (PS2, PS2_INITIAL_VALUE)] {
            let mut variable = self.get_or_new(name, Scope::Global);
            if variable.value().is_none() {
                let _ = variable.assign(value);
            }
        }
    }

    /// Returns the positional parameters of the topmost regular context.
    #[must_use]
    pub fn positional_params(&self) -> &PositionalParams {
        let index = Self::index_of_topmost_regular_context(&self.contexts);
        match &self.contexts[index] {
            Context::Regular { positional_params } => positional_params,
            Context::Volatile => unreachable!("the topmost regular context is not regular"),
        }
    }

    /// Returns a mutable reference to the positional parameters of the
    /// topmost regular context.
    pub fn positional_params_mut(&mut self) -> &mut PositionalParams {
        let index = Self::index_of_topmost_regular_context(&self.contexts);
        match &mut self.contexts[index] {
            Context::Regular { positional_params } => positional_params,
            Context::Volatile => unreachable!("the topmost regular context is not regular"),
        }
    }

    /// Pushes a new context onto the stack.
    pub fn push_context(&mut self, context: Context) {
        self.contexts.push(context);
    }

    /// Pops the topmost context, removing the variables defined in it.
    ///
    /// # Panics
    ///
    /// If the current context is the base context.
    pub fn pop_context(&mut self) {
        assert!(
            self.contexts.len() > 1,
            "cannot pop the base context",
        );
        self.contexts.pop();
        let len = self.contexts.len();
        for stack in self.all_variables.values_mut() {
            while matches!(stack.last(), Some(vic) if vic.context_index >= len) {
                stack.pop();
            }
        }
    }

    /// Returns the number of contexts on the stack.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }
}
