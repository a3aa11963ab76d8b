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

//! Parameter expansion.

use super::attr::{AttrChar, Origin};
use super::quote_removal;
use super::text::expand_word_units;
use super::{Error, Expander, FieldAccumulator, Result};
use marsh_env::option::{self, State};
use marsh_env::variable::{self, Scope};
use marsh_fnmatch::Pattern;
use marsh_syntax::syntax::{
    Modifier, ParamId, Switch, SwitchCondition, SwitchKind, Trim, TrimLength, TrimSide, Word,
};

/// Value a parameter resolves to before modifiers are applied.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Lookup {
    /// The parameter is not set.
    Unset,
    /// Single string value.
    Scalar(String),
    /// The positional parameters, for `$@` and `$*`.
    Params { values: Vec<String>, join: bool },
}

/// Resolves a parameter to its value.
fn look_up(expander: &Expander, id: &ParamId) -> Lookup {
    let env = &expander.env;
    match id {
        ParamId::Variable(name) => match env.variables.get_scalar(name) {
            Some(value) => Lookup::Scalar(value.to_string()),
            None => Lookup::Unset,
        },
        ParamId::Positional(0) => Lookup::Scalar(env.arg0.clone()),
        ParamId::Positional(index) => {
            match env.variables.positional_params().values.get(index - 1) {
                Some(value) => Lookup::Scalar(value.clone()),
                None => Lookup::Unset,
            }
        }
        ParamId::Special(c) => match c {
            '@' | '*' => Lookup::Params {
                values: env.variables.positional_params().values.clone(),
                join: *c == '*',
            },
            '#' => Lookup::Scalar(env.variables.positional_params().values.len().to_string()),
            '?' => Lookup::Scalar(env.exit_status.to_string()),
            '-' => Lookup::Scalar(env.options.short_flags()),
            '$' => Lookup::Scalar(env.main_pid.to_string()),
            '!' => match env.jobs.last_async_pid() {
                Some(pid) => Lookup::Scalar(pid.to_string()),
                None => Lookup::Unset,
            },
            _ => Lookup::Unset,
        },
    }
}

/// Expands a parameter with its modifier into the accumulator.
pub(super) fn expand_param(
    expander: &mut Expander,
    id: &ParamId,
    modifier: &Modifier,
    is_quoted: bool,
    accumulator: &mut FieldAccumulator,
) -> Result<()> {
    let lookup = look_up(expander, id);
    match modifier {
        Modifier::None => emit(expander, id, lookup, is_quoted, accumulator),

        Modifier::Length => {
            let length = match checked(expander, id, lookup)? {
                Lookup::Unset => 0,
                Lookup::Scalar(value) => value.chars().count(),
                Lookup::Params { values, .. } => values.len(),
            };
            accumulator.push_str(&length.to_string(), Origin::SoftExpansion, is_quoted);
            Ok(())
        }

        Modifier::Switch(switch) => {
            expand_switch(expander, id, switch, lookup, is_quoted, accumulator)
        }

        Modifier::Trim(trim) => {
            let lookup = checked(expander, id, lookup)?;
            let pattern = trim_pattern(expander, &trim.pattern)?;
            match lookup {
                Lookup::Unset => Ok(()),
                Lookup::Scalar(value) => {
                    let trimmed = apply_trim(&value, &pattern, trim);
                    accumulator.push_str(&trimmed, Origin::SoftExpansion, is_quoted);
                    Ok(())
                }
                Lookup::Params { values, join } => {
                    let trimmed = values
                        .iter()
                        .map(|value| apply_trim(value, &pattern, trim))
                        .collect();
                    emit_params(expander, trimmed, join, is_quoted, accumulator);
                    Ok(())
                }
            }
        }
    }
}

/// Applies the `nounset` check to an unset parameter.
fn checked(expander: &Expander, id: &ParamId, lookup: Lookup) -> Result<Lookup> {
    if lookup == Lookup::Unset && expander.env.options.get(option::Unset) == State::Off {
        return Err(Error::UnsetParameter(id.to_string()));
    }
    Ok(lookup)
}

/// Emits the plain value of a parameter.
fn emit(
    expander: &mut Expander,
    id: &ParamId,
    lookup: Lookup,
    is_quoted: bool,
    accumulator: &mut FieldAccumulator,
) -> Result<()> {
    match checked(expander, id, lookup)? {
        Lookup::Unset => Ok(()),
        Lookup::Scalar(value) => {
            accumulator.push_str(&value, Origin::SoftExpansion, is_quoted);
            Ok(())
        }
        Lookup::Params { values, join } => {
            emit_params(expander, values, join, is_quoted, accumulator);
            Ok(())
        }
    }
}

/// Emits the positional parameters.
///
/// A quoted `$*` joins the values with the first `$IFS` character. All
/// other forms produce one field per value; in an unquoted context the
/// values are additionally subject to later field splitting.
fn emit_params(
    expander: &mut Expander,
    values: Vec<String>,
    join: bool,
    is_quoted: bool,
    accumulator: &mut FieldAccumulator,
) {
    if join && is_quoted {
        let separator = expander
            .env
            .variables
            .get_scalar(variable::IFS)
            .map_or(Some(' '), |ifs| ifs.chars().next());
        let mut joined = String::new();
        for (index, value) in values.iter().enumerate() {
            if index > 0 {
                if let Some(separator) = separator {
                    joined.push(separator);
                }
            }
            joined.push_str(value);
        }
        if joined.is_empty() {
            accumulator.push_char(AttrChar::quoting('"', true));
        } else {
            accumulator.push_str(&joined, Origin::SoftExpansion, true);
        }
        return;
    }

    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            accumulator.begin_field();
        }
        if value.is_empty() && is_quoted {
            // Keep the empty field alive through the splitting pass
            accumulator.push_char(AttrChar::quoting('"', true));
        } else {
            accumulator.push_str(value, Origin::SoftExpansion, is_quoted);
        }
    }
}

/// Expands a switch modifier such as `${x:-word}`.
fn expand_switch(
    expander: &mut Expander,
    id: &ParamId,
    switch: &Switch,
    lookup: Lookup,
    is_quoted: bool,
    accumulator: &mut FieldAccumulator,
) -> Result<()> {
    let applies = match switch.condition {
        SwitchCondition::Unset => lookup == Lookup::Unset,
        SwitchCondition::UnsetOrEmpty => match &lookup {
            Lookup::Unset => true,
            Lookup::Scalar(value) => value.is_empty(),
            Lookup::Params { values, .. } => values.is_empty(),
        },
    };

    match switch.kind {
        SwitchKind::Default => {
            if applies {
                expand_word_units(expander, &switch.word.units, is_quoted, accumulator)
            } else {
                emit(expander, id, lookup, is_quoted, accumulator)
            }
        }

        SwitchKind::Alter => {
            if applies {
                Ok(())
            } else {
                expand_word_units(expander, &switch.word.units, is_quoted, accumulator)
            }
        }

        SwitchKind::Assign => {
            if !applies {
                return emit(expander, id, lookup, is_quoted, accumulator);
            }
            let ParamId::Variable(name) = id else {
                return Err(Error::NotAssignable(id.to_string()));
            };
            let value = expand_word_to_string(expander, &switch.word)?;
            expander
                .env
                .get_or_create_variable(name.clone(), Scope::Global)
                .assign(value.clone())
                .map_err(|_| Error::AssignReadOnly(name.clone()))?;
            accumulator.push_str(&value, Origin::SoftExpansion, is_quoted);
            Ok(())
        }

        SwitchKind::Error => {
            if !applies {
                return emit(expander, id, lookup, is_quoted, accumulator);
            }
            let message = if switch.word.units.is_empty() {
                match switch.condition {
                    SwitchCondition::Unset => "parameter not set".to_string(),
                    SwitchCondition::UnsetOrEmpty => "parameter null or not set".to_string(),
                }
            } else {
                expand_word_to_string(expander, &switch.word)?
            };
            Err(Error::EmptyOrUnset {
                name: id.to_string(),
                message,
            })
        }
    }
}

/// Expands a word to a plain string within an ongoing expansion.
fn expand_word_to_string(expander: &mut Expander, word: &Word) -> Result<String> {
    let mut accumulator = FieldAccumulator::new(false);
    expand_word_units(expander, &word.units, false, &mut accumulator)?;
    Ok(quote_removal::remove_quotes(
        &accumulator.into_single_field(),
    ))
}

/// Compiles the pattern of a trim modifier.
///
/// Quoted characters in the pattern are escaped so they match literally.
fn trim_pattern(expander: &mut Expander, word: &Word) -> Result<Pattern> {
    let mut accumulator = FieldAccumulator::new(false);
    expand_word_units(expander, &word.units, false, &mut accumulator)?;
    let chars = accumulator.into_single_field();

    let mut pattern = String::new();
    for c in &chars {
        if c.is_quoting {
            continue;
        }
        if c.is_quoted {
            pattern.push('\\');
        }
        pattern.push(c.value);
    }
    Pattern::parse(&pattern).map_err(|_| Error::InvalidPattern(pattern))
}

/// Removes the matching prefix or suffix from a value.
fn apply_trim(value: &str, pattern: &Pattern, trim: &Trim) -> String {
    let boundaries: Vec<usize> = value
        .char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(value.len()))
        .collect();

    match trim.side {
        TrimSide::Prefix => {
            let candidates: Box<dyn Iterator<Item = &usize>> = match trim.length {
                TrimLength::Shortest => Box::new(boundaries.iter()),
                TrimLength::Longest => Box::new(boundaries.iter().rev()),
            };
            for &end in candidates {
                if pattern.is_match(&value[..end]) {
                    return value[end..].to_string();
                }
            }
        }
        TrimSide::Suffix => {
            let candidates: Box<dyn Iterator<Item = &usize>> = match trim.length {
                TrimLength::Shortest => Box::new(boundaries.iter().rev()),
                TrimLength::Longest => Box::new(boundaries.iter()),
            };
            for &start in candidates {
                if pattern.is_match(&value[start..]) {
                    return value[..start].to_string();
                }
            }
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::{expand_word, expand_words};
    use crate::tests::stub_env;
    use marsh_env::job::Pid;
    use marsh_env::semantics::{ExitStatus, Field};
    use marsh_env::Env;

    fn expand_one(env: &mut Env, source: &str) -> std::result::Result<String, Error> {
        let word = source.parse().unwrap();
        expand_word(env, &word).map(|(field, _)| field.value)
    }

    #[test]
    fn special_parameters() {
        let (mut env, _state) = stub_env();
        env.exit_status = ExitStatus(42);
        env.arg0 = "marsh".to_string();
        env.variables.positional_params_mut().values =
            vec!["one".to_string(), "two".to_string()];
        env.jobs.set_last_async_pid(Pid(123));

        assert_eq!(expand_one(&mut env, "$?").unwrap(), "42");
        assert_eq!(expand_one(&mut env, "$#").unwrap(), "2");
        assert_eq!(expand_one(&mut env, "$0").unwrap(), "marsh");
        assert_eq!(expand_one(&mut env, "$1").unwrap(), "one");
        assert_eq!(expand_one(&mut env, "$2").unwrap(), "two");
        assert_eq!(expand_one(&mut env, "$!").unwrap(), "123");
        assert_eq!(
            expand_one(&mut env, "$$").unwrap(),
            env.main_pid.to_string()
        );
    }

    #[test]
    fn switch_default() {
        let (mut env, _state) = stub_env();
        assert_eq!(expand_one(&mut env, "${x:-def}").unwrap(), "def");
        assert_eq!(expand_one(&mut env, "${x-def}").unwrap(), "def");

        env.variables
            .get_or_new("x", Scope::Global)
            .assign("")
            .unwrap();
        assert_eq!(expand_one(&mut env, "${x:-def}").unwrap(), "def");
        assert_eq!(expand_one(&mut env, "${x-def}").unwrap(), "");

        env.variables
            .get_or_new("x", Scope::Global)
            .assign("set")
            .unwrap();
        assert_eq!(expand_one(&mut env, "${x:-def}").unwrap(), "set");
    }

    #[test]
    fn switch_assign() {
        let (mut env, _state) = stub_env();
        assert_eq!(expand_one(&mut env, "${x:=new}").unwrap(), "new");
        assert_eq!(env.variables.get_scalar("x"), Some("new"));

        // Already set: no reassignment
        assert_eq!(expand_one(&mut env, "${x:=other}").unwrap(), "new");
        assert_eq!(env.variables.get_scalar("x"), Some("new"));
    }

    #[test]
    fn switch_assign_to_special_parameter_is_an_error() {
        let (mut env, _state) = stub_env();
        let result = expand_one(&mut env, "${1=x}");
        assert_eq!(result, Err(Error::NotAssignable("1".to_string())));
    }

    #[test]
    fn switch_error() {
        let (mut env, _state) = stub_env();
        let result = expand_one(&mut env, "${x:?custom message}");
        assert_eq!(
            result,
            Err(Error::EmptyOrUnset {
                name: "x".to_string(),
                message: "custom message".to_string(),
            })
        );

        let result = expand_one(&mut env, "${x?}");
        assert_eq!(
            result,
            Err(Error::EmptyOrUnset {
                name: "x".to_string(),
                message: "parameter not set".to_string(),
            })
        );
    }

    #[test]
    fn switch_alter() {
        let (mut env, _state) = stub_env();
        assert_eq!(expand_one(&mut env, "${x:+alt}").unwrap(), "");

        env.variables
            .get_or_new("x", Scope::Global)
            .assign("set")
            .unwrap();
        assert_eq!(expand_one(&mut env, "${x:+alt}").unwrap(), "alt");
    }

    #[test]
    fn length_modifier() {
        let (mut env, _state) = stub_env();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("hello")
            .unwrap();
        assert_eq!(expand_one(&mut env, "${#x}").unwrap(), "5");
        assert_eq!(expand_one(&mut env, "${#unset}").unwrap(), "0");
    }

    #[test]
    fn trim_prefix_and_suffix() {
        let (mut env, _state) = stub_env();
        env.variables
            .get_or_new("path", Scope::Global)
            .assign("/usr/local/bin")
            .unwrap();

        assert_eq!(expand_one(&mut env, "${path#*/}").unwrap(), "usr/local/bin");
        assert_eq!(expand_one(&mut env, "${path##*/}").unwrap(), "bin");
        assert_eq!(expand_one(&mut env, "${path%/*}").unwrap(), "/usr/local");
        assert_eq!(expand_one(&mut env, "${path%%/*}").unwrap(), "");
    }

    #[test]
    fn trim_with_no_match_leaves_value() {
        let (mut env, _state) = stub_env();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("value")
            .unwrap();
        assert_eq!(expand_one(&mut env, "${x#z*}").unwrap(), "value");
    }

    #[test]
    fn trim_pattern_with_quoted_special_characters() {
        let (mut env, _state) = stub_env();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("a*b")
            .unwrap();
        // The quoted asterisk matches literally
        assert_eq!(expand_one(&mut env, "${x#a'*'}").unwrap(), "b");
    }

    #[test]
    fn quoted_at_keeps_empty_positional_parameters() {
        let (mut env, _state) = stub_env();
        env.variables.positional_params_mut().values =
            vec!["a".to_string(), String::new(), "c".to_string()];
        let word = "\"$@\"".parse().unwrap();
        let (fields, _) = expand_words(&mut env, &[word]).unwrap();
        assert_eq!(
            fields,
            [Field::new("a"), Field::new(""), Field::new("c")]
        );
    }

    #[test]
    fn quoted_star_joins_with_custom_ifs() {
        let (mut env, _state) = stub_env();
        env.variables
            .get_or_new("IFS", Scope::Global)
            .assign("-")
            .unwrap();
        env.variables.positional_params_mut().values =
            vec!["a".to_string(), "b".to_string()];
        assert_eq!(expand_one(&mut env, "\"$*\"").unwrap(), "a-b");
    }
}
