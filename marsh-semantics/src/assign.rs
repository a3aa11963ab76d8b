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

//! Assignments in simple commands.

use crate::expansion::expand_word;
use marsh_env::semantics::ExitStatus;
use marsh_env::variable::Scope;
use marsh_env::Env;
use marsh_syntax::syntax::Assign;
use thiserror::Error;

/// Error in an assignment.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Expansion of the value failed.
    #[error(transparent)]
    Expansion(#[from] crate::expansion::Error),

    /// The variable is read-only.
    #[error("cannot assign to read-only variable `{0}`")]
    ReadOnly(String),
}

/// Performs the assignments in the given scope.
///
/// The value of each assignment is expanded with [`expand_word`] (no field
/// splitting or pathname expansion). If `export` is true, the assigned
/// variables are exported; this is used for the per-command overlays of
/// non-special utilities, whose variables must appear in the environment of
/// the executed command.
///
/// Returns the exit status of the last command substitution in the
/// expanded values, if any.
pub fn perform_assignments(
    env: &mut Env,
    assigns: &[Assign],
    scope: Scope,
    export: bool,
) -> Result<Option<ExitStatus>, Error> {
    let mut exit_status = None;
    for assign in assigns {
        let (value, new_exit_status) = expand_word(env, &assign.value)?;
        let mut variable = env.get_or_create_variable(assign.name.clone(), scope);
        variable
            .assign(value.value)
            .map_err(|_| Error::ReadOnly(assign.name.clone()))?;
        if export {
            variable.export(true);
        }
        exit_status = new_exit_status.or(exit_status);
    }
    Ok(exit_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::stub_env;
    use marsh_syntax::syntax::SimpleCommand;

    fn assigns(source: &str) -> Vec<Assign> {
        source.parse::<SimpleCommand>().unwrap().assigns
    }

    #[test]
    fn assigns_expanded_value() {
        let (mut env, _state) = stub_env();
        env.variables
            .get_or_new("base", Scope::Global)
            .assign("core")
            .unwrap();
        let assigns = assigns("var=${base}-ext");
        let result = perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        assert_eq!(result, None);
        assert_eq!(env.variables.get_scalar("var"), Some("core-ext"));
        assert!(!env.variables.get("var").unwrap().is_exported);
    }

    #[test]
    fn exports_when_requested() {
        let (mut env, _state) = stub_env();
        let mut env = env.push_context(marsh_env::variable::ContextType::Volatile);
        let assigns = assigns("var=1");
        perform_assignments(&mut env, &assigns, Scope::Volatile, true).unwrap();
        assert!(env.variables.get("var").unwrap().is_exported);
    }

    #[test]
    fn read_only_variable_is_an_error() {
        let (mut env, _state) = stub_env();
        let mut variable = env.variables.get_or_new("var", Scope::Global);
        variable.assign("old").unwrap();
        variable.make_read_only();

        let assigns = assigns("var=new");
        let error =
            perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap_err();
        assert_eq!(error, Error::ReadOnly("var".to_string()));
        assert_eq!(env.variables.get_scalar("var"), Some("old"));
    }

    #[test]
    fn assignments_are_ordered() {
        let (mut env, _state) = stub_env();
        let assigns = assigns("a=1 b=${a}2");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        assert_eq!(env.variables.get_scalar("b"), Some("12"));
    }
}
