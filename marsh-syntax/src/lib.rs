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

//! Syntax of the shell language.
//!
//! This crate defines the abstract syntax tree ([`syntax`]) the execution
//! engine consumes, a small recursive-descent [`parser`] that produces it
//! from source code, and [`alias`] definitions the parser substitutes while
//! reading simple commands.
//!
//! The parser is deliberately minimal: it covers the POSIX shell grammar as
//! far as the execution engine interprets it, and reports errors as plain
//! values. Interactive concerns like prompting and line continuation
//! negotiation belong to the front-end, not to this crate.
//!
//! Most syntax types implement `FromStr` by delegating to the parser, which
//! makes tests and embedded command strings concise:
//!
//! ```
//! use marsh_syntax::syntax::List;
//! let list: List = "echo hello && echo world".parse().unwrap();
//! assert_eq!(list.to_string(), "echo hello && echo world");
//! ```

pub mod alias;
pub mod parser;
pub mod syntax;
