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

//! POSIX arithmetic expansion.
//!
//! This crate evaluates the expression of an arithmetic expansion
//! (`$((...))`) with the C-like operators and precedence the shell language
//! requires. Values are signed long integers; overflow and division by zero
//! are reported as errors rather than wrapping.
//!
//! This crate does not implement any mechanism for storing variables. The
//! caller of [`eval`] must provide an implementation of the [`Env`] trait,
//! which is used to access variables that appear in the evaluated
//! expression. An unset variable evaluates to zero; a variable whose value
//! does not parse as an integer constant is an error.
//!
//! ```
//! use marsh_arith::{eval, Value};
//! use std::collections::HashMap;
//! let mut env = HashMap::new();
//! env.insert("a".to_string(), "6".to_string());
//! assert_eq!(eval("a * 7", &mut env), Ok(Value::Integer(42)));
//! assert_eq!(env.get("b"), None);
//! assert_eq!(eval("b = a % 4", &mut env), Ok(Value::Integer(2)));
//! assert_eq!(env.get("b").map(|s| &s[..]), Some("2"));
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use thiserror::Error;

mod eval;
mod token;

pub use token::TokenError;

/// Result of arithmetic expansion
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    Integer(i64),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(i) => i.fmt(f),
        }
    }
}

/// Cause of an arithmetic expansion error
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Error in tokenization
    #[error(transparent)]
    TokenError(#[from] TokenError),

    /// A token appeared where it cannot
    #[error("syntax error in arithmetic expression")]
    SyntaxError,

    /// A variable value that is not a valid number
    #[error("variable value {0:?} cannot be parsed as a number")]
    InvalidVariableValue(String),

    /// Result out of bounds
    #[error("overflow")]
    Overflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Left-hand side of an assignment that is not a variable
    #[error("assignment target is not a variable")]
    InvalidAssignmentTarget,

    /// Error assigning a variable value
    #[error("cannot assign variable: {0}")]
    AssignVariableError(String),
}

/// Interface for accessing variables during evaluation
///
/// The caller of [`eval`] provides an implementation of this trait, which is
/// used to access variables that appear in the evaluated expression.
pub trait Env {
    /// Returns the value of the specified variable, or `None` if unset.
    fn get_variable(&self, name: &str) -> Option<String>;

    /// Assigns a new value to the specified variable.
    ///
    /// On failure, the returned string describes the reason (for example,
    /// the variable being read-only).
    fn assign_variable(&mut self, name: &str, value: String) -> Result<(), String>;
}

impl Env for HashMap<String, String> {
    fn get_variable(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }

    fn assign_variable(&mut self, name: &str, value: String) -> Result<(), String> {
        self.insert(name.to_string(), value);
        Ok(())
    }
}

/// Performs arithmetic expansion.
///
/// This function evaluates the given expression string and returns the
/// result. Variables are accessed through the given environment.
pub fn eval<E: Env>(expression: &str, env: &mut E) -> Result<Value, Error> {
    eval::eval(expression, env)
}
