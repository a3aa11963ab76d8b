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

//! Parsing and evaluation of tokenized expressions.

use crate::token::{parse_number, tokenize, Operator, Token};
use crate::{Env, Error, Value};

/// Expression tree
#[derive(Clone, Debug, Eq, PartialEq)]
enum Ast {
    Number(i64),
    Variable(String),
    Prefix(Operator, Box<Ast>),
    Binary(Operator, Box<Ast>, Box<Ast>),
    Conditional(Box<Ast>, Box<Ast>, Box<Ast>),
    /// Assignment; the operator is `None` for plain `=` or the compound
    /// binary operator for forms like `+=`
    Assignment(Box<Ast>, Option<Operator>, Box<Ast>),
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn take_operator(&mut self, operator: Operator) -> bool {
        if self.peek() == Some(&Token::Operator(operator)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// assignment := conditional ( ('=' | '+=' | ...) assignment )?
    fn assignment(&mut self) -> Result<Ast, Error> {
        use Operator::*;
        let target = self.conditional()?;
        let compound = match self.peek() {
            Some(Token::Operator(Equal)) => None,
            Some(Token::Operator(PlusEqual)) => Some(Plus),
            Some(Token::Operator(MinusEqual)) => Some(Minus),
            Some(Token::Operator(AsteriskEqual)) => Some(Asterisk),
            Some(Token::Operator(SlashEqual)) => Some(Slash),
            Some(Token::Operator(PercentEqual)) => Some(Percent),
            Some(Token::Operator(LessLessEqual)) => Some(LessLess),
            Some(Token::Operator(GreaterGreaterEqual)) => Some(GreaterGreater),
            Some(Token::Operator(AndEqual)) => Some(And),
            Some(Token::Operator(CaretEqual)) => Some(Caret),
            Some(Token::Operator(BarEqual)) => Some(Bar),
            _ => return Ok(target),
        };
        self.pos += 1;
        let value = self.assignment()?;
        Ok(Ast::Assignment(
            Box::new(target),
            compound,
            Box::new(value),
        ))
    }

    /// conditional := logical_or ( '?' assignment ':' conditional )?
    fn conditional(&mut self) -> Result<Ast, Error> {
        let condition = self.binary(0)?;
        if !self.take_operator(Operator::Question) {
            return Ok(condition);
        }
        let then = self.assignment()?;
        if !self.take_operator(Operator::Colon) {
            return Err(Error::SyntaxError);
        }
        let r#else = self.conditional()?;
        Ok(Ast::Conditional(
            Box::new(condition),
            Box::new(then),
            Box::new(r#else),
        ))
    }

    /// Binary operators by ascending precedence level.
    const LEVELS: &'static [&'static [Operator]] = &[
        &[Operator::BarBar],
        &[Operator::AndAnd],
        &[Operator::Bar],
        &[Operator::Caret],
        &[Operator::And],
        &[Operator::EqualEqual, Operator::BangEqual],
        &[
            Operator::Less,
            Operator::Greater,
            Operator::LessEqual,
            Operator::GreaterEqual,
        ],
        &[Operator::LessLess, Operator::GreaterGreater],
        &[Operator::Plus, Operator::Minus],
        &[Operator::Asterisk, Operator::Slash, Operator::Percent],
    ];

    /// Left-associative binary operator parsing at the given level.
    fn binary(&mut self, level: usize) -> Result<Ast, Error> {
        let Some(operators) = Self::LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        'outer: loop {
            for &operator in *operators {
                if self.take_operator(operator) {
                    let rhs = self.binary(level + 1)?;
                    lhs = Ast::Binary(operator, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    /// unary := ('+' | '-' | '~' | '!') unary | primary
    fn unary(&mut self) -> Result<Ast, Error> {
        use Operator::*;
        for operator in [Plus, Minus, Tilde, Bang] {
            if self.take_operator(operator) {
                let operand = self.unary()?;
                return Ok(Ast::Prefix(operator, Box::new(operand)));
            }
        }
        self.primary()
    }

    /// primary := number | identifier | '(' assignment ')'
    fn primary(&mut self) -> Result<Ast, Error> {
        match self.peek() {
            Some(&Token::Number(value)) => {
                self.pos += 1;
                Ok(Ast::Number(value))
            }
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(Ast::Variable(name))
            }
            Some(&Token::Operator(Operator::OpenParen)) => {
                self.pos += 1;
                let inner = self.assignment()?;
                if self.take_operator(Operator::CloseParen) {
                    Ok(inner)
                } else {
                    Err(Error::SyntaxError)
                }
            }
            _ => Err(Error::SyntaxError),
        }
    }
}

/// Returns the numeric value of a variable, or 0 if unset or blank.
fn variable_value<E: Env>(env: &E, name: &str) -> Result<i64, Error> {
    let Some(value) = env.get_variable(name) else {
        return Ok(0);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let magnitude =
        parse_number(digits).map_err(|_| Error::InvalidVariableValue(value.clone()))?;
    if negative {
        magnitude.checked_neg().ok_or(Error::Overflow)
    } else {
        Ok(magnitude)
    }
}

fn apply_binary(operator: Operator, lhs: i64, rhs: i64) -> Result<i64, Error> {
    use Operator::*;
    match operator {
        Bar => Ok(lhs | rhs),
        Caret => Ok(lhs ^ rhs),
        And => Ok(lhs & rhs),
        EqualEqual => Ok((lhs == rhs) as i64),
        BangEqual => Ok((lhs != rhs) as i64),
        Less => Ok((lhs < rhs) as i64),
        Greater => Ok((lhs > rhs) as i64),
        LessEqual => Ok((lhs <= rhs) as i64),
        GreaterEqual => Ok((lhs >= rhs) as i64),
        LessLess => match u32::try_from(rhs) {
            Ok(rhs) => lhs.checked_shl(rhs).ok_or(Error::Overflow),
            Err(_) => Err(Error::Overflow),
        },
        GreaterGreater => match u32::try_from(rhs) {
            Ok(rhs) => lhs.checked_shr(rhs).ok_or(Error::Overflow),
            Err(_) => Err(Error::Overflow),
        },
        Plus => lhs.checked_add(rhs).ok_or(Error::Overflow),
        Minus => lhs.checked_sub(rhs).ok_or(Error::Overflow),
        Asterisk => lhs.checked_mul(rhs).ok_or(Error::Overflow),
        Slash if rhs == 0 => Err(Error::DivisionByZero),
        Slash => lhs.checked_div(rhs).ok_or(Error::Overflow),
        Percent if rhs == 0 => Err(Error::DivisionByZero),
        Percent => lhs.checked_rem(rhs).ok_or(Error::Overflow),
        _ => unreachable!("not a binary operator: {operator:?}"),
    }
}

/// Evaluates an expression tree.
fn eval_ast<E: Env>(ast: &Ast, env: &mut E) -> Result<i64, Error> {
    use Operator::*;
    match ast {
        Ast::Number(value) => Ok(*value),
        Ast::Variable(name) => variable_value(env, name),

        Ast::Prefix(operator, operand) => {
            let value = eval_ast(operand, env)?;
            match operator {
                Plus => Ok(value),
                Minus => value.checked_neg().ok_or(Error::Overflow),
                Tilde => Ok(!value),
                Bang => Ok((value == 0) as i64),
                _ => unreachable!("not a prefix operator: {operator:?}"),
            }
        }

        Ast::Binary(BarBar, lhs, rhs) => {
            if eval_ast(lhs, env)? != 0 {
                Ok(1)
            } else {
                Ok((eval_ast(rhs, env)? != 0) as i64)
            }
        }
        Ast::Binary(AndAnd, lhs, rhs) => {
            if eval_ast(lhs, env)? == 0 {
                Ok(0)
            } else {
                Ok((eval_ast(rhs, env)? != 0) as i64)
            }
        }
        Ast::Binary(operator, lhs, rhs) => {
            let lhs = eval_ast(lhs, env)?;
            let rhs = eval_ast(rhs, env)?;
            apply_binary(*operator, lhs, rhs)
        }

        Ast::Conditional(condition, then, r#else) => {
            if eval_ast(condition, env)? != 0 {
                eval_ast(then, env)
            } else {
                eval_ast(r#else, env)
            }
        }

        Ast::Assignment(target, compound, value) => {
            let Ast::Variable(name) = &**target else {
                return Err(Error::InvalidAssignmentTarget);
            };
            let rhs = eval_ast(value, env)?;
            let result = match compound {
                None => rhs,
                Some(operator) => {
                    let lhs = variable_value(env, name)?;
                    apply_binary(*operator, lhs, rhs)?
                }
            };
            env.assign_variable(name, result.to_string())
                .map_err(Error::AssignVariableError)?;
            Ok(result)
        }
    }
}

/// Tokenizes, parses, and evaluates an expression.
pub fn eval<E: Env>(expression: &str, env: &mut E) -> Result<Value, Error> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    let ast = parser.assignment()?;
    if parser.pos != tokens.len() {
        return Err(Error::SyntaxError);
    }
    Ok(Value::Integer(eval_ast(&ast, env)?))
}
