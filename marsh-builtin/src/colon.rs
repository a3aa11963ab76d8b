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

//! Colon built-in, which does nothing.
//!
//! The arguments have been expanded before this built-in runs, so a colon
//! command is the idiomatic way to trigger expansion side effects, as in
//! `: ${var:=default}`.

use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::Env;

/// Entry point of the colon built-in.
pub fn main(_env: &mut Env, _args: Vec<Field>) -> Result {
    Result::SUCCESS
}
