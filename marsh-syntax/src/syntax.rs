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

//! Shell command language syntax.
//!
//! This module contains types that represent abstract syntax trees (ASTs) of
//! the shell language. The ASTs are produced by the [parser](crate::parser)
//! and consumed by the execution engine.
//!
//! Most types implement `Display` so that a syntax tree can be converted back
//! to source code. The conversion is lossy only for here-document contents,
//! which are printed as the operator and delimiter alone.

use crate::parser::{parse_command, parse_compound_command, parse_list, parse_redir, parse_word};
use std::cell::OnceCell;
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;
use std::str::FromStr;

/// File descriptor number.
///
/// This is a thin wrapper around a raw file descriptor so that descriptor
/// numbers are not confused with other integers.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Fd(pub i32);

impl Fd {
    /// File descriptor of the standard input.
    pub const STDIN: Fd = Fd(0);
    /// File descriptor of the standard output.
    pub const STDOUT: Fd = Fd(1);
    /// File descriptor of the standard error.
    pub const STDERR: Fd = Fd(2);
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i32> for Fd {
    fn from(raw: i32) -> Fd {
        Fd(raw)
    }
}

/// Identifier of a parameter to expand.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ParamId {
    /// Named variable, e.g. `$foo`
    Variable(String),
    /// Positional parameter, e.g. `$3` (1-based)
    Positional(usize),
    /// Special parameter: one of `@ * # ? - $ ! 0 _`
    Special(char),
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamId::Variable(name) => name.fmt(f),
            ParamId::Positional(index) => index.fmt(f),
            ParamId::Special(c) => c.fmt(f),
        }
    }
}

/// Condition that makes a [`Switch`] take effect.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SwitchCondition {
    /// The switch applies if the parameter is unset (`${foo-bar}`).
    Unset,
    /// The switch applies if the parameter is unset or empty (`${foo:-bar}`).
    UnsetOrEmpty,
}

/// Kind of a [`Switch`] modifier.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SwitchKind {
    /// Substitute the word (`-`)
    Default,
    /// Assign the word to the parameter, then substitute it (`=`)
    Assign,
    /// Fail with the word as the error message (`?`)
    Error,
    /// Substitute the word if the parameter is set (`+`)
    Alter,
}

impl SwitchKind {
    const fn operator(self) -> char {
        match self {
            SwitchKind::Default => '-',
            SwitchKind::Assign => '=',
            SwitchKind::Error => '?',
            SwitchKind::Alter => '+',
        }
    }
}

/// Parameter expansion modifier testing whether the parameter is set.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Switch {
    pub kind: SwitchKind,
    pub condition: SwitchCondition,
    /// Word substituted, assigned, or printed, depending on the kind.
    pub word: Word,
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.condition == SwitchCondition::UnsetOrEmpty {
            f.write_char(':')?;
        }
        write!(f, "{}{}", self.kind.operator(), self.word)
    }
}

/// Which end of the parameter value a [`Trim`] modifier removes from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TrimSide {
    /// `#` or `##`
    Prefix,
    /// `%` or `%%`
    Suffix,
}

/// How much a [`Trim`] modifier removes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TrimLength {
    /// `#` or `%`
    Shortest,
    /// `##` or `%%`
    Longest,
}

/// Parameter expansion modifier removing a pattern match from the value.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Trim {
    pub side: TrimSide,
    pub length: TrimLength,
    pub pattern: Word,
}

impl fmt::Display for Trim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self.side {
            TrimSide::Prefix => '#',
            TrimSide::Suffix => '%',
        };
        f.write_char(c)?;
        if self.length == TrimLength::Longest {
            f.write_char(c)?;
        }
        self.pattern.fmt(f)
    }
}

/// Modifier of a braced parameter expansion.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Modifier {
    /// No modifier: `${foo}`
    None,
    /// Length of the value: `${#foo}`
    Length,
    /// Conditional substitution: `${foo:-bar}` and friends
    Switch(Switch),
    /// Pattern trimming: `${foo#bar}` and friends
    Trim(Trim),
}

/// Parameter expansion enclosed in braces.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BracedParam {
    pub id: ParamId,
    pub modifier: Modifier,
}

impl fmt::Display for BracedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.modifier {
            Modifier::None => write!(f, "${{{}}}", self.id),
            Modifier::Length => write!(f, "${{#{}}}", self.id),
            Modifier::Switch(switch) => write!(f, "${{{}{}}}", self.id, switch),
            Modifier::Trim(trim) => write!(f, "${{{}{}}}", self.id, trim),
        }
    }
}

/// Smallest unit of a [`Text`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TextUnit {
    /// Literal character
    Literal(char),
    /// Character escaped with a backslash
    Backslashed(char),
    /// Parameter expansion without braces, e.g. `$foo`
    RawParam { id: ParamId },
    /// Parameter expansion with braces, e.g. `${foo:-bar}`
    BracedParam(BracedParam),
    /// Command substitution of the form `$(...)`
    CommandSubst { content: String },
    /// Command substitution of the form `` `...` ``
    Backquote { content: String },
    /// Arithmetic expansion, e.g. `$((1 + 2))`
    Arith { content: String },
}

impl fmt::Display for TextUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TextUnit::*;
        match self {
            Literal(c) => f.write_char(*c),
            Backslashed(c) => write!(f, "\\{c}"),
            RawParam { id } => write!(f, "${id}"),
            BracedParam(param) => param.fmt(f),
            CommandSubst { content } => write!(f, "$({content})"),
            Backquote { content } => write!(f, "`{content}`"),
            Arith { content } => write!(f, "$(({content}))"),
        }
    }
}

/// String fragment possibly containing expansions.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Text(pub Vec<TextUnit>);

impl Text {
    /// Creates a text of plain literal characters.
    pub fn from_literal_chars<I: IntoIterator<Item = char>>(chars: I) -> Text {
        Text(chars.into_iter().map(TextUnit::Literal).collect())
    }

    /// Returns the string value if this text consists of literals only.
    #[must_use]
    pub fn to_string_if_literal(&self) -> Option<String> {
        self.0
            .iter()
            .map(|unit| match unit {
                TextUnit::Literal(c) => Some(*c),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|unit| unit.fmt(f))
    }
}

/// Element of a [`Word`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum WordUnit {
    /// Unquoted [text unit](TextUnit)
    Unquoted(TextUnit),
    /// String surrounded with single quotes
    SingleQuote(String),
    /// Text surrounded with double quotes
    DoubleQuote(Text),
    /// Tilde expansion, e.g. `~` or `~user`
    Tilde(String),
}

impl fmt::Display for WordUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use WordUnit::*;
        match self {
            Unquoted(unit) => unit.fmt(f),
            SingleQuote(s) => write!(f, "'{s}'"),
            DoubleQuote(text) => write!(f, "\"{text}\""),
            Tilde(name) => write!(f, "~{name}"),
        }
    }
}

/// Token that may involve expansions and quotes.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Word {
    pub units: Vec<WordUnit>,
}

impl Word {
    /// Returns the string value if this word consists of unquoted literals
    /// only.
    #[must_use]
    pub fn to_string_if_literal(&self) -> Option<String> {
        self.units
            .iter()
            .map(|unit| match unit {
                WordUnit::Unquoted(TextUnit::Literal(c)) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Whether any part of this word is quoted.
    #[must_use]
    pub fn is_quoted(&self) -> bool {
        self.units.iter().any(|unit| {
            matches!(
                unit,
                WordUnit::SingleQuote(_)
                    | WordUnit::DoubleQuote(_)
                    | WordUnit::Unquoted(TextUnit::Backslashed(_))
            )
        })
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.units.iter().try_for_each(|unit| unit.fmt(f))
    }
}

/// Assignment word, e.g. `name=value`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Assign {
    pub name: String,
    pub value: Word,
}

impl fmt::Display for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Returns whether the string is a valid variable (and function) name.
#[must_use]
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Here-document redirection body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HereDoc {
    /// Delimiter ending the content, with quoting already removed
    pub delimiter: String,
    /// Whether the delimiter was quoted, suppressing content expansion
    pub delimiter_quoted: bool,
    /// Whether leading tab characters are removed from content lines (`<<-`)
    pub remove_tabs: bool,
    /// Content of the here-document
    ///
    /// The content is filled in by the parser when it reaches the newline
    /// token that ends the line containing the operator. If the delimiter was
    /// quoted, the content is all [literals](TextUnit::Literal).
    pub content: OnceCell<Text>,
}

impl fmt::Display for HereDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.remove_tabs { "<<-" } else { "<<" };
        if self.delimiter_quoted {
            write!(f, "{op}'{}'", self.delimiter)
        } else {
            write!(f, "{op}{}", self.delimiter)
        }
    }
}

/// Redirection operators acting on a file or file descriptor operand.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RedirOp {
    /// `<`
    FileIn,
    /// `<>`
    FileInOut,
    /// `>`
    FileOut,
    /// `>>`
    FileAppend,
    /// `>|`
    FileClobber,
    /// `<&`
    FdIn,
    /// `>&`
    FdOut,
}

impl fmt::Display for RedirOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RedirOp::*;
        let s = match self {
            FileIn => "<",
            FileInOut => "<>",
            FileOut => ">",
            FileAppend => ">>",
            FileClobber => ">|",
            FdIn => "<&",
            FdOut => ">&",
        };
        f.write_str(s)
    }
}

/// Body of a [`Redir`]ection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RedirBody {
    /// Redirection having an operand word
    Normal { operator: RedirOp, operand: Word },
    /// Here-document
    HereDoc(Rc<HereDoc>),
}

impl fmt::Display for RedirBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirBody::Normal { operator, operand } => write!(f, "{operator}{operand}"),
            RedirBody::HereDoc(here_doc) => here_doc.fmt(f),
        }
    }
}

/// Redirection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Redir {
    /// Explicit file descriptor, if any
    pub fd: Option<Fd>,
    pub body: RedirBody,
}

impl Redir {
    /// Returns the file descriptor this redirection acts on.
    ///
    /// The default is the standard input for input redirections and
    /// here-documents, and the standard output otherwise.
    #[must_use]
    pub fn fd_or_default(&self) -> Fd {
        self.fd.unwrap_or_else(|| match &self.body {
            RedirBody::Normal { operator, .. } => match operator {
                RedirOp::FileIn | RedirOp::FileInOut | RedirOp::FdIn => Fd::STDIN,
                RedirOp::FileOut | RedirOp::FileAppend | RedirOp::FileClobber | RedirOp::FdOut => {
                    Fd::STDOUT
                }
            },
            RedirBody::HereDoc(_) => Fd::STDIN,
        })
    }
}

impl fmt::Display for Redir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(fd) = self.fd {
            fd.fmt(f)?;
        }
        self.body.fmt(f)
    }
}

/// Command that involves assignments, words, and redirections.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SimpleCommand {
    pub assigns: Vec<Assign>,
    pub words: Vec<Word>,
    pub redirs: Vec<Redir>,
}

impl SimpleCommand {
    /// Whether this command has no content at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigns.is_empty() && self.words.is_empty() && self.redirs.is_empty()
    }
}

impl fmt::Display for SimpleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for assign in &self.assigns {
            write!(f, "{sep}{assign}")?;
            sep = " ";
        }
        for word in &self.words {
            write!(f, "{sep}{word}")?;
            sep = " ";
        }
        for redir in &self.redirs {
            write!(f, "{sep}{redir}")?;
            sep = " ";
        }
        Ok(())
    }
}

/// `elif` clause of an if command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ElifThen {
    pub condition: List,
    pub body: List,
}

impl fmt::Display for ElifThen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "elif {:#} then ", self.condition)?;
        if f.alternate() {
            write!(f, "{:#}", self.body)
        } else {
            self.body.fmt(f)
        }
    }
}

/// Branch of a case command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaseItem {
    pub patterns: Vec<Word>,
    pub body: List,
}

impl fmt::Display for CaseItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "(";
        for pattern in &self.patterns {
            write!(f, "{sep}{pattern}")?;
            sep = " | ";
        }
        write!(f, ") {};;", self.body)
    }
}

/// Command that contains other commands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CompoundCommand {
    /// List surrounded with braces, run in the current environment
    Grouping(List),
    /// List surrounded with parentheses, run in a subshell
    Subshell(List),
    /// For loop
    For {
        name: String,
        /// Words iterated over; `None` means the positional parameters.
        values: Option<Vec<Word>>,
        body: List,
    },
    /// While loop
    While { condition: List, body: List },
    /// Until loop
    Until { condition: List, body: List },
    /// If conditional construct
    If {
        condition: List,
        body: List,
        elifs: Vec<ElifThen>,
        r#else: Option<List>,
    },
    /// Case conditional construct
    Case { subject: Word, items: Vec<CaseItem> },
}

impl fmt::Display for CompoundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CompoundCommand::*;
        match self {
            Grouping(list) => write!(f, "{{ {list:#} }}"),
            Subshell(list) => write!(f, "({list})"),
            For { name, values, body } => {
                write!(f, "for {name}")?;
                if let Some(values) = values {
                    f.write_str(" in")?;
                    for value in values {
                        write!(f, " {value}")?;
                    }
                    f.write_char(';')?;
                }
                write!(f, " do {body:#} done")
            }
            While { condition, body } => write!(f, "while {condition:#} do {body:#} done"),
            Until { condition, body } => write!(f, "until {condition:#} do {body:#} done"),
            If {
                condition,
                body,
                elifs,
                r#else,
            } => {
                write!(f, "if {condition:#} then {body:#} ")?;
                for elif in elifs {
                    write!(f, "{elif:#} ")?;
                }
                if let Some(body) = r#else {
                    write!(f, "else {body:#} ")?;
                }
                f.write_str("fi")
            }
            Case { subject, items } => {
                write!(f, "case {subject} in ")?;
                for item in items {
                    write!(f, "{item} ")?;
                }
                f.write_str("esac")
            }
        }
    }
}

/// Compound command with redirections.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FullCompoundCommand {
    pub command: CompoundCommand,
    pub redirs: Vec<Redir>,
}

impl fmt::Display for FullCompoundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.command.fmt(f)?;
        for redir in &self.redirs {
            write!(f, " {redir}")?;
        }
        Ok(())
    }
}

/// Function definition command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub body: Rc<FullCompoundCommand>,
}

impl fmt::Display for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}() {}", self.name, self.body)
    }
}

/// Element of a pipeline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Simple(Rc<SimpleCommand>),
    Compound(Rc<FullCompoundCommand>),
    Function(Rc<FunctionDefinition>),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Simple(command) => command.fmt(f),
            Command::Compound(command) => command.fmt(f),
            Command::Function(definition) => definition.fmt(f),
        }
    }
}

/// Sequence of commands connected with pipes, possibly negated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Rc<Command>>,
    /// Whether the pipeline begins with `!`
    pub negation: bool,
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negation {
            write!(f, "! ")?;
        }
        let mut sep = "";
        for command in &self.commands {
            write!(f, "{sep}{command}")?;
            sep = " | ";
        }
        Ok(())
    }
}

/// `&&` or `||` connecting pipelines.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AndOr {
    AndThen,
    OrElse,
}

impl fmt::Display for AndOr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AndOr::AndThen => f.write_str("&&"),
            AndOr::OrElse => f.write_str("||"),
        }
    }
}

/// Pipelines connected with `&&` and `||`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AndOrList {
    pub first: Pipeline,
    pub rest: Vec<(AndOr, Pipeline)>,
}

impl fmt::Display for AndOrList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.first.fmt(f)?;
        for (op, pipeline) in &self.rest {
            write!(f, " {op} {pipeline}")?;
        }
        Ok(())
    }
}

/// And-or list with an optional `&` marking asynchronous execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Item {
    pub and_or: Rc<AndOrList>,
    /// Whether the item ends with `&`
    pub is_async: bool,
}

/// Allows conversion from Item to String.
///
/// By default, the `;` terminator is omitted from the formatted string.
/// When the alternate flag is specified as in `{:#}`, the result is always
/// terminated by either `;` or `&`.
impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.and_or.fmt(f)?;
        if self.is_async {
            write!(f, "&")
        } else if f.alternate() {
            write!(f, ";")
        } else {
            Ok(())
        }
    }
}

/// Sequence of [items](Item) separated by `;` or `&`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct List(pub Vec<Item>);

/// Allows conversion from List to String.
///
/// By default, the last `;` terminator is omitted from the formatted string.
/// When the alternate flag is specified as in `{:#}`, the result is always
/// terminated by either `;` or `&`.
impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((last, others)) = self.0.split_last() {
            for item in others {
                write!(f, "{item:#} ")?;
            }
            if f.alternate() {
                write!(f, "{last:#}")
            } else {
                write!(f, "{last}")
            }
        } else {
            Ok(())
        }
    }
}

impl FromStr for Word {
    type Err = crate::parser::Error;
    fn from_str(s: &str) -> Result<Word, Self::Err> {
        parse_word(s)
    }
}

impl FromStr for Redir {
    type Err = crate::parser::Error;
    fn from_str(s: &str) -> Result<Redir, Self::Err> {
        parse_redir(s)
    }
}

impl FromStr for Command {
    type Err = crate::parser::Error;
    fn from_str(s: &str) -> Result<Command, Self::Err> {
        parse_command(s)
    }
}

impl FromStr for SimpleCommand {
    type Err = crate::parser::Error;
    fn from_str(s: &str) -> Result<SimpleCommand, Self::Err> {
        match parse_command(s)? {
            Command::Simple(command) => Ok(Rc::try_unwrap(command).unwrap_or_else(|rc| (*rc).clone())),
            _ => Err(crate::parser::Error::unexpected("a simple command")),
        }
    }
}

impl FromStr for CompoundCommand {
    type Err = crate::parser::Error;
    fn from_str(s: &str) -> Result<CompoundCommand, Self::Err> {
        parse_compound_command(s)
    }
}

impl FromStr for Pipeline {
    type Err = crate::parser::Error;
    fn from_str(s: &str) -> Result<Pipeline, Self::Err> {
        let list = parse_list(s)?;
        let mut items = list.0;
        match (items.pop(), items.is_empty()) {
            (Some(item), true) if !item.is_async && item.and_or.rest.is_empty() => {
                Ok(Rc::try_unwrap(item.and_or).unwrap_or_else(|rc| (*rc).clone()).first)
            }
            _ => Err(crate::parser::Error::unexpected("a single pipeline")),
        }
    }
}

impl FromStr for AndOrList {
    type Err = crate::parser::Error;
    fn from_str(s: &str) -> Result<AndOrList, Self::Err> {
        let list = parse_list(s)?;
        let mut items = list.0;
        match (items.pop(), items.is_empty()) {
            (Some(item), true) if !item.is_async => {
                Ok(Rc::try_unwrap(item.and_or).unwrap_or_else(|rc| (*rc).clone()))
            }
            _ => Err(crate::parser::Error::unexpected("a single and-or list")),
        }
    }
}

impl FromStr for List {
    type Err = crate::parser::Error;
    fn from_str(s: &str) -> Result<List, Self::Err> {
        parse_list(s)
    }
}
