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

//! Command search.
//!
//! The command search is part of the execution of a simple command. It
//! determines the [target](Target) that is to be invoked for the first
//! field of the expanded command.
//!
//! If the command name contains a slash, the target is always an external
//! utility. Otherwise, the candidates are searched in the order of
//! priority:
//!
//! 1. Special built-ins
//! 2. Functions
//! 3. Mandatory built-ins
//! 4. External utilities found in `$PATH`

use marsh_env::builtin::Builtin;
use marsh_env::builtin::Type::{Mandatory, Special};
use marsh_env::function::Function;
use marsh_env::function::FunctionSet;
use marsh_env::Env;
use std::collections::HashMap;
use std::ffi::CStr;
use std::ffi::CString;
use std::rc::Rc;

/// Target of a simple command execution.
///
/// This is the result of the [command search](search).
#[derive(Clone, Debug)]
pub enum Target {
    /// Built-in utility.
    Builtin(Builtin),
    /// Function.
    Function(Rc<Function>),
    /// External utility.
    External {
        /// Path to the external utility.
        ///
        /// The path may be relative if `$PATH` contains a relative
        /// directory. It may also name a non-existent file: if the command
        /// name contains a slash, it is regarded as a path regardless of
        /// whether anything exists there.
        path: CString,
    },
}

impl From<Builtin> for Target {
    fn from(builtin: Builtin) -> Target {
        Target::Builtin(builtin)
    }
}

impl From<Rc<Function>> for Target {
    fn from(function: Rc<Function>) -> Target {
        Target::Function(function)
    }
}

/// Part of the shell execution environment command path search depends on.
pub trait PathEnv {
    /// Accesses the `$PATH` variable in the environment.
    fn path(&self) -> Option<&str>;
    /// Whether there is an executable file at the specified path.
    fn is_executable_file(&self, path: &CStr) -> bool;
}

/// Part of the shell execution environment command search depends on.
pub trait SearchEnv: PathEnv {
    /// Accesses the built-in set in the environment.
    fn builtins(&self) -> &HashMap<&'static str, Builtin>;
    /// Accesses the function set in the environment.
    fn functions(&self) -> &FunctionSet;
}

impl PathEnv for Env {
    fn path(&self) -> Option<&str> {
        self.variables.get_scalar(marsh_env::variable::PATH)
    }
    fn is_executable_file(&self, path: &CStr) -> bool {
        self.system.is_executable_file(path)
    }
}

impl SearchEnv for Env {
    fn builtins(&self) -> &HashMap<&'static str, Builtin> {
        &self.builtins
    }
    fn functions(&self) -> &FunctionSet {
        &self.functions
    }
}

/// Performs command search.
pub fn search<E: SearchEnv>(env: &mut E, name: &str) -> Option<Target> {
    if name.contains('/') {
        return CString::new(name)
            .ok()
            .map(|path| Target::External { path });
    }

    let builtin = env.builtins().get(name).copied();
    if let Some(builtin) = builtin {
        if builtin.r#type == Special {
            return Some(builtin.into());
        }
    }

    if let Some(function) = env.functions().get(name) {
        return Some(Rc::clone(function).into());
    }

    if let Some(builtin) = builtin {
        debug_assert_eq!(builtin.r#type, Mandatory);
        return Some(builtin.into());
    }

    search_path(env, name).map(|path| Target::External { path })
}

/// Searches `$PATH` for an executable file.
///
/// Returns the path if successful. Note that the returned path may not be
/// absolute if `$PATH` contains a relative directory.
pub fn search_path<E: PathEnv>(env: &mut E, name: &str) -> Option<CString> {
    let path = env.path()?.to_string();
    for dir in path.split(':') {
        let file = if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        };
        if let Ok(file) = CString::new(file) {
            if env.is_executable_file(&file) {
                return Some(file);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use marsh_env::builtin::Type;
    use std::collections::HashSet;

    #[derive(Default)]
    struct DummyEnv {
        builtins: HashMap<&'static str, Builtin>,
        functions: FunctionSet,
        path: Option<String>,
        executables: HashSet<String>,
    }

    impl PathEnv for DummyEnv {
        fn path(&self) -> Option<&str> {
            self.path.as_deref()
        }
        fn is_executable_file(&self, path: &CStr) -> bool {
            match path.to_str() {
                Ok(path) => self.executables.contains(path),
                Err(_) => false,
            }
        }
    }

    impl SearchEnv for DummyEnv {
        fn builtins(&self) -> &HashMap<&'static str, Builtin> {
            &self.builtins
        }
        fn functions(&self) -> &FunctionSet {
            &self.functions
        }
    }

    fn dummy_builtin(r#type: Type) -> Builtin {
        Builtin {
            r#type,
            execute: |_, _| unreachable!("not to be executed"),
        }
    }

    fn dummy_function(name: &str) -> Function {
        match "{ :; }".parse::<marsh_syntax::syntax::Command>().unwrap() {
            marsh_syntax::syntax::Command::Compound(body) => Function::new(name, body),
            other => panic!("not a compound command: {other:?}"),
        }
    }

    #[test]
    fn nothing_is_found_in_empty_env() {
        let mut env = DummyEnv::default();
        let target = search(&mut env, "foo");
        assert!(target.is_none(), "{target:?}");
    }

    #[test]
    fn special_builtin_takes_precedence_over_function() {
        let mut env = DummyEnv::default();
        env.builtins.insert("foo", dummy_builtin(Type::Special));
        env.functions.define(dummy_function("foo")).unwrap();

        let target = search(&mut env, "foo");
        assert_matches!(target, Some(Target::Builtin(builtin)) => {
            assert_eq!(builtin.r#type, Type::Special);
        });
    }

    #[test]
    fn function_takes_precedence_over_mandatory_builtin() {
        let mut env = DummyEnv::default();
        env.builtins.insert("foo", dummy_builtin(Type::Mandatory));
        env.functions.define(dummy_function("foo")).unwrap();

        let target = search(&mut env, "foo");
        assert_matches!(target, Some(Target::Function(function)) => {
            assert_eq!(function.name, "foo");
        });
    }

    #[test]
    fn mandatory_builtin_is_found_without_path_search() {
        let mut env = DummyEnv::default();
        env.builtins.insert("foo", dummy_builtin(Type::Mandatory));
        let target = search(&mut env, "foo");
        assert_matches!(target, Some(Target::Builtin(_)));
    }

    #[test]
    fn external_utility_is_searched_in_path_order() {
        let mut env = DummyEnv::default();
        env.path = Some("/usr/bin:/bin".to_string());
        env.executables.insert("/bin/foo".to_string());
        let target = search(&mut env, "foo");
        assert_matches!(target, Some(Target::External { path }) => {
            assert_eq!(path, CString::new("/bin/foo").unwrap());
        });

        env.executables.insert("/usr/bin/foo".to_string());
        let target = search(&mut env, "foo");
        assert_matches!(target, Some(Target::External { path }) => {
            assert_eq!(path, CString::new("/usr/bin/foo").unwrap());
        });
    }

    #[test]
    fn name_with_slash_is_external_without_search() {
        let mut env = DummyEnv::default();
        let target = search(&mut env, "./foo");
        assert_matches!(target, Some(Target::External { path }) => {
            assert_eq!(path, CString::new("./foo").unwrap());
        });
    }
}
