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

//! Test built-in (also known as `[`).
//!
//! The expression grammar is evaluated over the argument list:
//!
//! - `-o` (or) and `-a` (and), with `-a` binding tighter
//! - `!` negation and `( ... )` grouping
//! - Unary string tests `-n`, `-z`; file tests `-e -f -d -p -r -w -x -s -t`
//! - Binary string comparison `=` and `!=`
//! - Binary integer comparisons `-eq -ne -gt -ge -lt -le`
//! - A single operand tests for a non-empty string

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::{AccessMode, FileKind, OfdAccess};
use marsh_env::Env;
use marsh_syntax::syntax::Fd;
use std::ffi::CString;

struct Evaluator<'a> {
    env: &'a mut Env,
    args: &'a [Field],
    pos: usize,
}

type EvalResult = std::result::Result<bool, String>;

impl Evaluator<'_> {
    fn peek(&self) -> Option<&str> {
        self.args.get(self.pos).map(|field| &field.value[..])
    }

    fn next(&mut self) -> Option<&Field> {
        let field = self.args.get(self.pos);
        if field.is_some() {
            self.pos += 1;
        }
        field
    }

    /// expression := and_expression ( '-o' and_expression )*
    fn expression(&mut self) -> EvalResult {
        let mut value = self.and_expression()?;
        while self.peek() == Some("-o") {
            self.pos += 1;
            let rhs = self.and_expression()?;
            value = value || rhs;
        }
        Ok(value)
    }

    /// and_expression := primary ( '-a' primary )*
    fn and_expression(&mut self) -> EvalResult {
        let mut value = self.primary()?;
        while self.peek() == Some("-a") {
            self.pos += 1;
            let rhs = self.primary()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn primary(&mut self) -> EvalResult {
        match self.peek() {
            None => Err("missing operand".to_string()),
            Some("!") => {
                self.pos += 1;
                Ok(!self.primary()?)
            }
            Some("(") => {
                self.pos += 1;
                let value = self.expression()?;
                if self.peek() == Some(")") {
                    self.pos += 1;
                    Ok(value)
                } else {
                    Err("missing `)`".to_string())
                }
            }
            Some(operator) if is_unary_operator(operator) => {
                let operator = operator.to_string();
                self.pos += 1;
                // An operator followed by nothing is itself a non-empty
                // string operand
                match self.next() {
                    Some(operand) => {
                        let operand = operand.value.clone();
                        self.unary(&operator, &operand)
                    }
                    None => Ok(true),
                }
            }
            Some(_) => {
                let lhs = self.next().unwrap().value.clone();
                match self.peek() {
                    Some(operator) if is_binary_operator(operator) => {
                        let operator = operator.to_string();
                        self.pos += 1;
                        let Some(rhs) = self.next() else {
                            return Err(format!("missing operand after `{operator}`"));
                        };
                        let rhs = rhs.value.clone();
                        self.binary(&lhs, &operator, &rhs)
                    }
                    _ => Ok(!lhs.is_empty()),
                }
            }
        }
    }

    fn unary(&mut self, operator: &str, operand: &str) -> EvalResult {
        match operator {
            "-n" => return Ok(!operand.is_empty()),
            "-z" => return Ok(operand.is_empty()),
            "-t" => {
                return Ok(operand
                    .parse()
                    .map(|fd| self.env.system.isatty(Fd(fd)))
                    .unwrap_or(false))
            }
            _ => {}
        }

        let Ok(path) = CString::new(operand) else {
            return Ok(false);
        };
        let kind = self.env.system.file_kind(&path);
        Ok(match operator {
            "-e" => kind.is_some(),
            "-f" => kind == Some(FileKind::Regular),
            "-d" => kind == Some(FileKind::Directory),
            "-p" => kind == Some(FileKind::Fifo),
            "-r" => kind.is_some() && self.env.system.access_check(&path, AccessMode::Read),
            "-w" => kind.is_some() && self.env.system.access_check(&path, AccessMode::Write),
            "-x" => kind.is_some() && self.env.system.access_check(&path, AccessMode::Execute),
            "-s" => has_content(self.env, &path),
            _ => return Err(format!("unknown operator `{operator}`")),
        })
    }

    fn binary(&mut self, lhs: &str, operator: &str, rhs: &str) -> EvalResult {
        match operator {
            "=" => return Ok(lhs == rhs),
            "!=" => return Ok(lhs != rhs),
            _ => {}
        }
        let lhs: i64 = lhs
            .trim()
            .parse()
            .map_err(|_| format!("`{lhs}` is not an integer"))?;
        let rhs: i64 = rhs
            .trim()
            .parse()
            .map_err(|_| format!("`{rhs}` is not an integer"))?;
        Ok(match operator {
            "-eq" => lhs == rhs,
            "-ne" => lhs != rhs,
            "-gt" => lhs > rhs,
            "-ge" => lhs >= rhs,
            "-lt" => lhs < rhs,
            "-le" => lhs <= rhs,
            _ => return Err(format!("unknown operator `{operator}`")),
        })
    }
}

fn is_unary_operator(s: &str) -> bool {
    matches!(
        s,
        "-n" | "-z" | "-e" | "-f" | "-d" | "-p" | "-r" | "-w" | "-x" | "-s" | "-t"
    )
}

fn is_binary_operator(s: &str) -> bool {
    matches!(
        s,
        "=" | "!=" | "-eq" | "-ne" | "-gt" | "-ge" | "-lt" | "-le"
    )
}

/// Whether the file exists and is not empty.
fn has_content(env: &mut Env, path: &CString) -> bool {
    let Ok(fd) = env
        .system
        .open(path, OfdAccess::ReadOnly, Default::default(), Default::default())
    else {
        return false;
    };
    let mut buffer = [0; 1];
    let result = env.system.read(fd, &mut buffer);
    let _ = env.system.close(fd);
    result.map(|count| count > 0).unwrap_or(false)
}

fn evaluate(env: &mut Env, args: &[Field]) -> Result {
    if args.is_empty() {
        return Result::FAILURE;
    }
    let mut evaluator = Evaluator { env, args, pos: 0 };
    match evaluator.expression() {
        Ok(value) if evaluator.pos == args.len() => {
            if value {
                Result::SUCCESS
            } else {
                Result::FAILURE
            }
        }
        Ok(_) => {
            let message = format!("unexpected operand `{}`", args[evaluator.pos].value);
            report_error(evaluator.env, "test", &message, ExitStatus::ERROR)
        }
        Err(message) => report_error(evaluator.env, "test", &message, ExitStatus::ERROR),
    }
}

/// Entry point of the test built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    evaluate(env, &args)
}

/// Entry point of the `[` built-in, which requires a closing `]`.
pub fn bracket_main(env: &mut Env, mut args: Vec<Field>) -> Result {
    match args.pop() {
        Some(last) if last.value == "]" => evaluate(env, &args),
        _ => report_error(env, "[", "missing closing `]`", ExitStatus::ERROR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builtin_env;

    fn test_status(env: &mut Env, args: &[&str]) -> ExitStatus {
        main(env, Field::fields(args.iter().copied())).exit_status()
    }

    #[test]
    fn empty_expression_fails() {
        let (mut env, _state) = builtin_env();
        assert_eq!(test_status(&mut env, &[]), ExitStatus::FAILURE);
    }

    #[test]
    fn single_operand_tests_non_empty() {
        let (mut env, _state) = builtin_env();
        assert_eq!(test_status(&mut env, &["x"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &[""]), ExitStatus::FAILURE);
    }

    #[test]
    fn string_length_tests() {
        let (mut env, _state) = builtin_env();
        assert_eq!(test_status(&mut env, &["-n", "x"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["-n", ""]), ExitStatus::FAILURE);
        assert_eq!(test_status(&mut env, &["-z", ""]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["-z", "x"]), ExitStatus::FAILURE);
    }

    #[test]
    fn string_comparison() {
        let (mut env, _state) = builtin_env();
        assert_eq!(test_status(&mut env, &["a", "=", "a"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["a", "=", "b"]), ExitStatus::FAILURE);
        assert_eq!(test_status(&mut env, &["a", "!=", "b"]), ExitStatus::SUCCESS);
    }

    #[test]
    fn integer_comparison() {
        let (mut env, _state) = builtin_env();
        assert_eq!(test_status(&mut env, &["2", "-gt", "1"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["1", "-gt", "2"]), ExitStatus::FAILURE);
        assert_eq!(test_status(&mut env, &["10", "-eq", "10"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["-1", "-lt", "0"]), ExitStatus::SUCCESS);
    }

    #[test]
    fn non_integer_in_comparison_is_an_error() {
        let (mut env, _state) = builtin_env();
        assert_eq!(test_status(&mut env, &["x", "-eq", "1"]), ExitStatus::ERROR);
    }

    #[test]
    fn negation_and_grouping() {
        let (mut env, _state) = builtin_env();
        assert_eq!(test_status(&mut env, &["!", ""]), ExitStatus::SUCCESS);
        assert_eq!(
            test_status(&mut env, &["(", "a", "=", "a", ")"]),
            ExitStatus::SUCCESS
        );
    }

    #[test]
    fn and_or_connectives() {
        let (mut env, _state) = builtin_env();
        assert_eq!(
            test_status(&mut env, &["a", "-a", "b"]),
            ExitStatus::SUCCESS
        );
        assert_eq!(
            test_status(&mut env, &["a", "-a", ""]),
            ExitStatus::FAILURE
        );
        assert_eq!(
            test_status(&mut env, &["", "-o", "b"]),
            ExitStatus::SUCCESS
        );
        // -a binds tighter than -o
        assert_eq!(
            test_status(&mut env, &["x", "-o", "", "-a", ""]),
            ExitStatus::SUCCESS
        );
    }

    #[test]
    fn file_tests() {
        let (mut env, state) = builtin_env();
        state.borrow_mut().put_file("present", *b"data");
        state.borrow_mut().put_file("empty", []);
        state.borrow_mut().put_file("dir/inner", []);

        assert_eq!(test_status(&mut env, &["-e", "present"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["-e", "absent"]), ExitStatus::FAILURE);
        assert_eq!(test_status(&mut env, &["-f", "present"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["-d", "dir"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["-d", "present"]), ExitStatus::FAILURE);
        assert_eq!(test_status(&mut env, &["-s", "present"]), ExitStatus::SUCCESS);
        assert_eq!(test_status(&mut env, &["-s", "empty"]), ExitStatus::FAILURE);
        assert_eq!(test_status(&mut env, &["-r", "present"]), ExitStatus::SUCCESS);
    }

    #[test]
    fn bracket_requires_closing_bracket() {
        let (mut env, _state) = builtin_env();
        let result = bracket_main(&mut env, Field::fields(["x", "]"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);

        let result = bracket_main(&mut env, Field::fields(["x"]));
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
    }

    #[test]
    fn trailing_operands_are_an_error() {
        let (mut env, _state) = builtin_env();
        assert_eq!(
            test_status(&mut env, &["a", "=", "a", "junk"]),
            ExitStatus::ERROR
        );
    }
}
