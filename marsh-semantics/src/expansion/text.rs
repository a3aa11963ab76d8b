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

//! Initial expansion of words and texts into attributed characters.

use super::attr::{AttrChar, Origin};
use super::command_subst::expand_command_subst;
use super::param;
use super::tilde;
use super::{Expander, FieldAccumulator, Result};
use marsh_env::variable::Scope;
use marsh_syntax::syntax::{TextUnit, WordUnit};

/// Expands the units of a word.
pub(super) fn expand_word_units(
    expander: &mut Expander,
    units: &[WordUnit],
    is_quoted: bool,
    accumulator: &mut FieldAccumulator,
) -> Result<()> {
    for unit in units {
        match unit {
            WordUnit::Unquoted(text_unit) => {
                expand_text_unit(expander, text_unit, is_quoted, accumulator)?;
            }
            WordUnit::SingleQuote(value) => {
                accumulator.push_char(AttrChar::quoting('\'', is_quoted));
                for c in value.chars() {
                    accumulator.push_char(AttrChar {
                        value: c,
                        origin: Origin::Literal,
                        is_quoted: true,
                        is_quoting: false,
                    });
                }
                accumulator.push_char(AttrChar::quoting('\'', is_quoted));
            }
            WordUnit::DoubleQuote(text) => {
                accumulator.push_char(AttrChar::quoting('"', is_quoted));
                expand_text_units(expander, &text.0, true, accumulator)?;
                accumulator.push_char(AttrChar::quoting('"', is_quoted));
            }
            WordUnit::Tilde(name) => {
                let value = tilde::expand_tilde(expander.env, name);
                accumulator.push_str(&value, Origin::HardExpansion, is_quoted);
            }
        }
    }
    Ok(())
}

/// Expands the units of a text.
pub(super) fn expand_text_units(
    expander: &mut Expander,
    units: &[TextUnit],
    is_quoted: bool,
    accumulator: &mut FieldAccumulator,
) -> Result<()> {
    for unit in units {
        expand_text_unit(expander, unit, is_quoted, accumulator)?;
    }
    Ok(())
}

/// Expands one text unit.
fn expand_text_unit(
    expander: &mut Expander,
    unit: &TextUnit,
    is_quoted: bool,
    accumulator: &mut FieldAccumulator,
) -> Result<()> {
    match unit {
        TextUnit::Literal(c) => {
            accumulator.push_char(AttrChar {
                value: *c,
                origin: Origin::Literal,
                is_quoted,
                is_quoting: false,
            });
        }

        TextUnit::Backslashed(c) => {
            accumulator.push_char(AttrChar::quoting('\\', is_quoted));
            accumulator.push_char(AttrChar {
                value: *c,
                origin: Origin::Literal,
                is_quoted: true,
                is_quoting: false,
            });
        }

        TextUnit::RawParam { id } => {
            param::expand_param(expander, id, &marsh_syntax::syntax::Modifier::None, is_quoted, accumulator)?;
        }

        TextUnit::BracedParam(param) => {
            param::expand_param(expander, &param.id, &param.modifier, is_quoted, accumulator)?;
        }

        TextUnit::CommandSubst { content } | TextUnit::Backquote { content } => {
            let (output, exit_status) = expand_command_subst(expander.env, content)?;
            expander.last_subst_status = Some(exit_status);
            accumulator.push_str(&output, Origin::SoftExpansion, is_quoted);
        }

        TextUnit::Arith { content } => {
            let value = expand_arith(expander, content)?;
            accumulator.push_str(&value, Origin::SoftExpansion, is_quoted);
        }
    }
    Ok(())
}

/// Adapter exposing shell variables to the arithmetic evaluator.
struct ArithEnv<'a>(&'a mut marsh_env::Env);

impl marsh_arith::Env for ArithEnv<'_> {
    fn get_variable(&self, name: &str) -> Option<String> {
        self.0.variables.get_scalar(name).map(str::to_string)
    }

    fn assign_variable(&mut self, name: &str, value: String) -> std::result::Result<(), String> {
        self.0
            .get_or_create_variable(name, Scope::Global)
            .assign(value)
            .map(drop)
            .map_err(|error| error.to_string())
    }
}

/// Performs arithmetic expansion of the content of `$((...))`.
fn expand_arith(expander: &mut Expander, content: &str) -> Result<String> {
    let value = marsh_arith::eval(content, &mut ArithEnv(expander.env))?;
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::expand_word;
    use crate::tests::stub_env;
    use marsh_syntax::syntax::Word;

    #[test]
    fn backslash_escape_is_quoting() {
        let (mut env, _state) = stub_env();
        let word: Word = r"a\bc".parse().unwrap();
        let (field, _) = expand_word(&mut env, &word).unwrap();
        assert_eq!(field.value, "abc");
    }

    #[test]
    fn arithmetic_assignment_is_visible_in_variables() {
        let (mut env, _state) = stub_env();
        let word: Word = "$((x = 21 * 2))".parse().unwrap();
        let (field, _) = expand_word(&mut env, &word).unwrap();
        assert_eq!(field.value, "42");
        assert_eq!(env.variables.get_scalar("x"), Some("42"));
    }
}
