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

//! Tilde expansion.

use marsh_env::variable;
use marsh_env::Env;

/// Expands `~` or `~name`.
///
/// A bare tilde expands to `$HOME`; a tilde with a login name expands to
/// that user's home directory. If the value cannot be determined, the
/// original text is returned unchanged, as other shells do.
pub(super) fn expand_tilde(env: &mut Env, name: &str) -> String {
    if name.is_empty() {
        if let Some(home) = env.variables.get_scalar(variable::HOME) {
            return home.to_string();
        }
        "~".to_string()
    } else {
        if let Some(home) = env.system.home_directory(name) {
            return home;
        }
        format!("~{name}")
    }
}
