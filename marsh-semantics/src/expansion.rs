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

//! Word expansion.
//!
//! Expansion is a pipeline of passes over attributed characters:
//!
//! 1. The *initial expansion* walks the word units and produces
//!    [`AttrChar`]s: tilde expansion, parameter expansion, command
//!    substitution, and arithmetic expansion, in that order within each
//!    unit. Each produced character remembers its [origin](Origin) and
//!    whether it is quoted or is itself a quotation mark.
//! 2. *Field splitting* ([`split`]) divides the result at unquoted
//!    separator characters that originate from an expansion.
//! 3. *Pathname expansion* ([`glob`]) matches fields with unquoted pattern
//!    characters against the file system.
//! 4. *Quote removal* ([`quote_removal`]) strips the quotation characters
//!    that survived the previous steps.
//!
//! The entry points differ in how much of the pipeline they run:
//!
//! - [`expand_words`] runs all passes and may produce any number of fields.
//! - [`expand_word`] produces exactly one field, with no field splitting or
//!   pathname expansion. This is the form used for redirection operands,
//!   assignment values, `case` subjects, and `for` words... the places
//!   POSIX exempts from splitting.
//! - [`expand_text`] expands a [`Text`], used for here-document contents
//!   and backquoted strings, performing only parameter, command, and
//!   arithmetic expansion.
//!
//! Every expansion records the exit status of the last command substitution
//! it ran, which becomes the exit status of a simple command that executes
//! no utility.

pub mod attr;
mod command_subst;
pub mod glob;
mod param;
pub mod quote_removal;
pub mod split;
mod text;
mod tilde;

pub use attr::{AttrChar, AttrField, Origin};

use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::Errno;
use marsh_env::variable;
use marsh_env::Env;
use marsh_syntax::syntax::{ParamId, Text, TextUnit, Word, WordUnit};
use thiserror::Error;

/// Types of errors that may occur in the word expansion.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Expansion of an unset parameter with the `nounset` option in effect
    #[error("unset parameter `{0}`")]
    UnsetParameter(String),

    /// `${name:?message}` on an unset or empty parameter
    #[error("{name}: {message}")]
    EmptyOrUnset {
        /// Parameter name
        name: String,
        /// Expanded message word, or a default explanation
        message: String,
    },

    /// `${name=word}` on a parameter that is not a variable
    #[error("cannot assign to `{0}` in parameter expansion")]
    NotAssignable(String),

    /// `${name=word}` on a read-only variable
    #[error("cannot assign to read-only variable `{0}`")]
    AssignReadOnly(String),

    /// Error in arithmetic expansion
    #[error("arithmetic expansion failed: {0}")]
    Arith(#[from] marsh_arith::Error),

    /// Error setting up a command substitution
    #[error("command substitution failed: {0}")]
    CommandSubst(Errno),

    /// Pattern that cannot be compiled
    #[error("invalid pattern `{0}`")]
    InvalidPattern(String),
}

/// Specialized result type for word expansion.
pub type Result<T> = std::result::Result<T, Error>;

/// State shared by the passes of one expansion.
#[derive(Debug)]
pub(crate) struct Expander<'a> {
    pub env: &'a mut Env,
    /// Exit status of the last command substitution run so far
    pub last_subst_status: Option<ExitStatus>,
}

/// Accumulates the fields produced by the initial expansion.
///
/// In splitting mode, a multi-valued expansion (`$@`) starts a new field
/// for each value. In single-field mode the values are joined with a space
/// instead.
#[derive(Debug)]
pub(crate) struct FieldAccumulator {
    fields: Vec<Vec<AttrChar>>,
    splitting: bool,
}

impl FieldAccumulator {
    fn new(splitting: bool) -> FieldAccumulator {
        FieldAccumulator {
            fields: Vec::new(),
            splitting,
        }
    }

    /// Appends a character to the current field.
    pub fn push_char(&mut self, c: AttrChar) {
        if self.fields.is_empty() {
            self.fields.push(Vec::new());
        }
        self.fields.last_mut().unwrap().push(c);
    }

    /// Appends characters sharing the same attributes.
    pub fn push_str(&mut self, s: &str, origin: Origin, is_quoted: bool) {
        for value in s.chars() {
            self.push_char(AttrChar {
                value,
                origin,
                is_quoted,
                is_quoting: false,
            });
        }
    }

    /// Starts a new field, or inserts a separator in single-field mode.
    pub fn begin_field(&mut self) {
        if self.splitting {
            if self.fields.is_empty() {
                self.fields.push(Vec::new());
            }
            self.fields.push(Vec::new());
        } else {
            self.push_char(AttrChar {
                value: ' ',
                origin: Origin::SoftExpansion,
                is_quoted: false,
                is_quoting: false,
            });
        }
    }

    fn into_fields(self) -> Vec<Vec<AttrChar>> {
        self.fields
    }

    fn into_single_field(mut self) -> Vec<AttrChar> {
        debug_assert!(!self.splitting);
        match self.fields.len() {
            0 => Vec::new(),
            1 => self.fields.pop().unwrap(),
            _ => unreachable!("single-field accumulator produced multiple fields"),
        }
    }
}

/// Whether the word consists solely of an unmodified `$@` or `$*`, possibly
/// double-quoted.
///
/// Such a word expands to zero fields when there are no positional
/// parameters.
fn is_sole_params_expansion(word: &Word) -> bool {
    fn is_params_unit(unit: &TextUnit) -> bool {
        match unit {
            TextUnit::RawParam {
                id: ParamId::Special(c),
            } => matches!(c, '@' | '*'),
            TextUnit::BracedParam(param) => {
                matches!(param.id, ParamId::Special('@' | '*'))
                    && param.modifier == marsh_syntax::syntax::Modifier::None
            }
            _ => false,
        }
    }

    match &word.units[..] {
        [WordUnit::Unquoted(unit)] => is_params_unit(unit),
        [WordUnit::DoubleQuote(Text(units))] => {
            matches!(&units[..], [unit] if is_params_unit(unit))
        }
        _ => false,
    }
}

/// Returns the field separators in effect.
fn ifs_chars(env: &Env) -> String {
    env.variables
        .get_scalar(variable::IFS)
        .unwrap_or(variable::IFS_INITIAL_VALUE)
        .to_string()
}

/// Performs the whole expansion pipeline on the given words.
///
/// The result is the list of fields and the exit status of the last
/// command substitution performed, if any.
pub fn expand_words(env: &mut Env, words: &[Word]) -> Result<(Vec<Field>, Option<ExitStatus>)> {
    let mut expander = Expander {
        env,
        last_subst_status: None,
    };
    let mut result = Vec::new();
    for word in words {
        if is_sole_params_expansion(word)
            && expander.env.variables.positional_params().values.is_empty()
        {
            continue;
        }
        let mut accumulator = FieldAccumulator::new(true);
        text::expand_word_units(&mut expander, &word.units, false, &mut accumulator)?;
        let ifs = ifs_chars(expander.env);
        let fields = split::split_fields(accumulator.into_fields(), &ifs);
        let fields = glob::glob_fields(expander.env, fields)?;
        result.extend(fields);
    }
    Ok((result, expander.last_subst_status))
}

/// Expands a word to a single field, with no field splitting or pathname
/// expansion.
pub fn expand_word(env: &mut Env, word: &Word) -> Result<(Field, Option<ExitStatus>)> {
    let (field, exit_status) = expand_word_attr(env, word)?;
    let value = quote_removal::remove_quotes(&field.0);
    Ok((Field::new(value), exit_status))
}

/// Expands a word to a single attributed field.
///
/// This form keeps the character attributes so the caller can interpret
/// quoting, as pattern matching does.
pub fn expand_word_attr(env: &mut Env, word: &Word) -> Result<(AttrField, Option<ExitStatus>)> {
    let mut expander = Expander {
        env,
        last_subst_status: None,
    };
    let mut accumulator = FieldAccumulator::new(false);
    text::expand_word_units(&mut expander, &word.units, false, &mut accumulator)?;
    let field = AttrField(accumulator.into_single_field());
    Ok((field, expander.last_subst_status))
}

/// Expands a text: parameter expansion, command substitution, and
/// arithmetic expansion only.
///
/// This is the expansion applied to here-document contents.
pub fn expand_text(env: &mut Env, text: &Text) -> Result<(String, Option<ExitStatus>)> {
    let mut expander = Expander {
        env,
        last_subst_status: None,
    };
    let mut accumulator = FieldAccumulator::new(false);
    text::expand_text_units(&mut expander, &text.0, false, &mut accumulator)?;
    let value = quote_removal::remove_quotes(&accumulator.into_single_field());
    Ok((value, expander.last_subst_status))
}

/// Expands each word to a single field.
///
/// This is a convenience function applying [`expand_word`] to each word.
pub fn expand_word_multiple(
    env: &mut Env,
    words: &[Word],
) -> Result<(Vec<Field>, Option<ExitStatus>)> {
    let mut fields = Vec::new();
    let mut last_status = None;
    for word in words {
        let (field, status) = expand_word(env, word)?;
        fields.push(field);
        last_status = status.or(last_status);
    }
    Ok((fields, last_status))
}
