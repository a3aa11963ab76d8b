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

//! Recursive-descent parser for the shell language.
//!
//! The parser turns source code into the [syntax tree](crate::syntax). It is
//! a one-pass parser over a character buffer; here-document contents are
//! collected when the newline ending the line of the operator is consumed.
//!
//! The entry point for whole programs is [`parse_program`], which optionally
//! performs [alias](crate::alias) substitution on command names. The other
//! `parse_*` functions parse a single construct and require the input to
//! contain nothing else; they back the `FromStr` impls in [`crate::syntax`].

use crate::alias::AliasSet;
use crate::syntax::*;
use std::cell::OnceCell;
use std::rc::Rc;
use thiserror::Error;

/// Error in parsing.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The input ended where more tokens were required.
    #[error("unexpected end of input, expecting {0}")]
    UnexpectedEof(&'static str),

    /// A token appeared where it cannot.
    #[error("unexpected token near `{found}`, expecting {expected}")]
    Unexpected { found: String, expected: &'static str },

    /// A here-document was not closed by its delimiter.
    #[error("here-document not closed by `{0}`")]
    UnclosedHereDoc(String),

    /// The operand of `<<` contains an expansion.
    #[error("here-document delimiter must be a literal word")]
    NonLiteralHereDocDelimiter,

    /// A quotation was not closed.
    #[error("unclosed quotation starting with `{0}`")]
    UnclosedQuote(char),

    /// A `$\u{7b}...\u{7d}`, `$(...)`, or `$((...))` construct was not closed.
    #[error("unclosed expansion, expecting `{0}`")]
    UnclosedExpansion(&'static str),
}

impl Error {
    /// Convenience constructor for an `Unexpected` error with no token text.
    #[must_use]
    pub(crate) fn unexpected(expected: &'static str) -> Error {
        Error::Unexpected {
            found: String::new(),
            expected,
        }
    }
}

/// Specialized result type for parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// Reserved words of the shell language.
pub const RESERVED_WORDS: &[&str] = &[
    "!", "{", "}", "case", "do", "done", "elif", "else", "esac", "fi", "for", "if", "in", "then",
    "until", "while",
];

/// Returns whether the given string is a reserved word.
#[must_use]
pub fn is_reserved_word(s: &str) -> bool {
    RESERVED_WORDS.contains(&s)
}

/// Context in which a word is parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum WordContext {
    /// Normal command word: tilde expansion at the start only
    Normal,
    /// Assignment value: tilde expansion also after colons
    AssignValue,
    /// Word inside `${...}`: delimited by `}` instead of blanks
    Braced,
}

/// Here-document whose content is yet to be read.
#[derive(Debug)]
struct PendingHereDoc {
    here_doc: Rc<HereDoc>,
}

/// One-pass parser over a character buffer.
#[derive(Debug)]
pub struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    aliases: Option<&'a AliasSet>,
    /// Alias names already substituted, to prevent recursion
    active_aliases: Vec<String>,
    pending_here_docs: Vec<PendingHereDoc>,
}

impl<'a> Parser<'a> {
    /// Creates a parser reading the given source code.
    #[must_use]
    pub fn new(source: &str) -> Parser<'a> {
        Parser {
            chars: source.chars().collect(),
            pos: 0,
            aliases: None,
            active_aliases: Vec::new(),
            pending_here_docs: Vec::new(),
        }
    }

    /// Creates a parser that substitutes aliases on command names.
    #[must_use]
    pub fn with_aliases(source: &str, aliases: &'a AliasSet) -> Parser<'a> {
        let mut parser = Parser::new(source);
        parser.aliases = Some(aliases);
        parser
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Returns whether the input at the current position starts with `s`.
    fn at(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// Consumes `s` if the input starts with it.
    fn take(&mut self, s: &str) -> bool {
        if self.at(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    /// Skips blanks and line continuations, but not newlines.
    fn skip_blanks(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') => {
                    self.pos += 1;
                }
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                }
                _ => break,
            }
        }
    }

    /// Skips blanks and a comment extending to the end of the line.
    fn skip_blanks_and_comment(&mut self) {
        self.skip_blanks();
        if self.peek() == Some('#') {
            while !matches!(self.peek(), None | Some('\n')) {
                self.pos += 1;
            }
        }
    }

    /// Consumes newlines (and comments), reading pending here-document
    /// contents at each newline.
    fn linebreak(&mut self) -> Result<()> {
        loop {
            self.skip_blanks_and_comment();
            if self.peek() == Some('\n') {
                self.pos += 1;
                self.read_pending_here_docs()?;
            } else {
                return Ok(());
            }
        }
    }

    /// Reports the text around the current position for error messages.
    fn found(&self) -> String {
        self.chars[self.pos..]
            .iter()
            .take(12)
            .take_while(|&&c| c != '\n')
            .collect()
    }

    fn error(&self, expected: &'static str) -> Error {
        if self.at_eof() {
            Error::UnexpectedEof(expected)
        } else {
            Error::Unexpected {
                found: self.found(),
                expected,
            }
        }
    }

    // Token inspection ----------------------------------------------------

    /// Returns the literal token starting at the current position, if the
    /// characters up to the next delimiter are plain (unquoted, unexpanded).
    ///
    /// This is used to recognize reserved words and the tokens of the
    /// function definition form. The position is not advanced.
    fn peek_literal_token(&self) -> Option<String> {
        let mut pos = self.pos;
        // skip blanks without mutating self
        loop {
            match self.chars.get(pos) {
                Some(' ') | Some('\t') => pos += 1,
                Some('\\') if self.chars.get(pos + 1) == Some(&'\n') => pos += 2,
                _ => break,
            }
        }
        let start = pos;
        while let Some(&c) = self.chars.get(pos) {
            match c {
                ' ' | '\t' | '\n' | ';' | '&' | '|' | '<' | '>' | '(' | ')' => break,
                '\'' | '"' | '`' | '$' | '\\' => return None,
                _ => pos += 1,
            }
        }
        if pos == start {
            None
        } else {
            Some(self.chars[start..pos].iter().collect())
        }
    }

    /// Consumes the literal token `word` if it is the next token.
    fn take_literal_token(&mut self, word: &str) -> bool {
        if self.peek_literal_token().as_deref() == Some(word) {
            self.skip_blanks();
            self.pos += word.chars().count();
            true
        } else {
            false
        }
    }

    /// Whether the next token starts a redirection (optionally an IO number
    /// followed by `<` or `>`).
    fn at_redir(&self) -> bool {
        let mut offset = 0;
        while matches!(self.peek_at(offset), Some(c) if c.is_ascii_digit()) {
            offset += 1;
        }
        matches!(self.peek_at(offset), Some('<') | Some('>'))
    }

    // Word lexing ---------------------------------------------------------

    /// Returns whether `c` delimits an unquoted word.
    fn is_word_delimiter(c: char, context: WordContext) -> bool {
        match context {
            WordContext::Braced => c == '}',
            _ => matches!(c, ' ' | '\t' | '\n' | ';' | '&' | '|' | '<' | '>' | '(' | ')'),
        }
    }

    /// Parses a word, stopping at an unquoted delimiter.
    fn word(&mut self, context: WordContext) -> Result<Word> {
        let mut units = Vec::new();
        loop {
            let Some(c) = self.peek() else { break };
            if Self::is_word_delimiter(c, context) {
                break;
            }
            match c {
                '\'' => {
                    self.pos += 1;
                    let mut value = String::new();
                    loop {
                        match self.advance() {
                            Some('\'') => break,
                            Some(c) => value.push(c),
                            None => return Err(Error::UnclosedQuote('\'')),
                        }
                    }
                    units.push(WordUnit::SingleQuote(value));
                }
                '"' => {
                    self.pos += 1;
                    let text = self.double_quote_text()?;
                    units.push(WordUnit::DoubleQuote(text));
                }
                '\\' => {
                    self.pos += 1;
                    match self.advance() {
                        Some('\n') => {} // line continuation
                        Some(c) => units.push(WordUnit::Unquoted(TextUnit::Backslashed(c))),
                        None => units.push(WordUnit::Unquoted(TextUnit::Literal('\\'))),
                    }
                }
                '$' => {
                    self.pos += 1;
                    units.push(WordUnit::Unquoted(self.dollar_unit()?));
                }
                '`' => {
                    self.pos += 1;
                    let content = self.backquote_content()?;
                    units.push(WordUnit::Unquoted(TextUnit::Backquote { content }));
                }
                '~' if Self::tilde_allowed(&units, context) => {
                    self.pos += 1;
                    let mut name = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                            name.push(c);
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                    units.push(WordUnit::Tilde(name));
                }
                _ => {
                    self.pos += 1;
                    units.push(WordUnit::Unquoted(TextUnit::Literal(c)));
                }
            }
        }
        Ok(Word { units })
    }

    /// Whether a tilde at the current unit position is subject to expansion.
    fn tilde_allowed(units: &[WordUnit], context: WordContext) -> bool {
        match units.last() {
            None => context != WordContext::Braced,
            Some(WordUnit::Unquoted(TextUnit::Literal(':'))) => context == WordContext::AssignValue,
            Some(_) => false,
        }
    }

    /// Parses text inside double quotes, consuming the closing quote.
    fn double_quote_text(&mut self) -> Result<Text> {
        let mut units = Vec::new();
        loop {
            match self.peek() {
                None => return Err(Error::UnclosedQuote('"')),
                Some('"') => {
                    self.pos += 1;
                    return Ok(Text(units));
                }
                Some('\\') => {
                    match self.peek_at(1) {
                        Some(c @ ('$' | '`' | '"' | '\\')) => {
                            self.pos += 2;
                            units.push(TextUnit::Backslashed(c));
                        }
                        Some('\n') => self.pos += 2,
                        _ => {
                            // The backslash is literal here
                            self.pos += 1;
                            units.push(TextUnit::Literal('\\'));
                        }
                    }
                }
                Some('$') => {
                    self.pos += 1;
                    units.push(self.dollar_unit()?);
                }
                Some('`') => {
                    self.pos += 1;
                    let content = self.backquote_content()?;
                    units.push(TextUnit::Backquote { content });
                }
                Some(c) => {
                    self.pos += 1;
                    units.push(TextUnit::Literal(c));
                }
            }
        }
    }

    /// Parses what follows a `$`.
    fn dollar_unit(&mut self) -> Result<TextUnit> {
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                let param = self.braced_param()?;
                Ok(TextUnit::BracedParam(param))
            }
            Some('(') if self.peek_at(1) == Some('(') => {
                self.pos += 2;
                let content = self.arith_content()?;
                Ok(TextUnit::Arith { content })
            }
            Some('(') => {
                self.pos += 1;
                let content = self.command_subst_content()?;
                Ok(TextUnit::CommandSubst { content })
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Ok(TextUnit::RawParam {
                    id: ParamId::Variable(name),
                })
            }
            Some(c) if c.is_ascii_digit() => {
                self.pos += 1;
                let index = c.to_digit(10).unwrap() as usize;
                Ok(TextUnit::RawParam {
                    id: ParamId::Positional(index),
                })
            }
            Some(c @ ('@' | '*' | '#' | '?' | '-' | '$' | '!')) => {
                self.pos += 1;
                Ok(TextUnit::RawParam {
                    id: ParamId::Special(c),
                })
            }
            _ => Ok(TextUnit::Literal('$')),
        }
    }

    /// Parses the inside of `${...}`, consuming the closing brace.
    fn braced_param(&mut self) -> Result<BracedParam> {
        // `${#}` is the special parameter while `${#x}` is a length expansion
        if self.peek() == Some('#') {
            match self.peek_at(1) {
                Some('}') => {
                    self.pos += 2;
                    return Ok(BracedParam {
                        id: ParamId::Special('#'),
                        modifier: Modifier::None,
                    });
                }
                Some(':' | '-' | '=' | '?' | '+') => {
                    self.pos += 1;
                    let modifier = self.param_modifier()?;
                    return Ok(BracedParam {
                        id: ParamId::Special('#'),
                        modifier,
                    });
                }
                _ => {
                    self.pos += 1;
                    let id = self.param_id()?;
                    if self.take("}") {
                        return Ok(BracedParam {
                            id,
                            modifier: Modifier::Length,
                        });
                    }
                    return Err(self.error("`}`"));
                }
            }
        }

        let id = self.param_id()?;
        let modifier = self.param_modifier()?;
        Ok(BracedParam { id, modifier })
    }

    /// Parses a parameter name inside braces.
    fn param_id(&mut self) -> Result<ParamId> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Ok(ParamId::Variable(name))
            }
            Some(c) if c.is_ascii_digit() => {
                let mut index = 0usize;
                while let Some(c) = self.peek() {
                    if let Some(digit) = c.to_digit(10) {
                        index = index.saturating_mul(10).saturating_add(digit as usize);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Ok(ParamId::Positional(index))
            }
            Some(c @ ('@' | '*' | '#' | '?' | '-' | '$' | '!')) => {
                self.pos += 1;
                Ok(ParamId::Special(c))
            }
            _ => Err(self.error("a parameter name")),
        }
    }

    /// Parses a parameter modifier and the closing brace.
    fn param_modifier(&mut self) -> Result<Modifier> {
        if self.take("}") {
            return Ok(Modifier::None);
        }

        let condition = if self.peek() == Some(':') {
            self.pos += 1;
            SwitchCondition::UnsetOrEmpty
        } else {
            SwitchCondition::Unset
        };
        if let Some(kind) = match self.peek() {
            Some('-') => Some(SwitchKind::Default),
            Some('=') => Some(SwitchKind::Assign),
            Some('?') => Some(SwitchKind::Error),
            Some('+') => Some(SwitchKind::Alter),
            _ => None,
        } {
            self.pos += 1;
            let word = self.word(WordContext::Braced)?;
            if !self.take("}") {
                return Err(self.error("`}`"));
            }
            return Ok(Modifier::Switch(Switch {
                kind,
                condition,
                word,
            }));
        }
        if condition == SwitchCondition::UnsetOrEmpty {
            return Err(self.error("a parameter modifier"));
        }

        let (side, trim_char) = match self.peek() {
            Some('#') => (TrimSide::Prefix, '#'),
            Some('%') => (TrimSide::Suffix, '%'),
            _ => return Err(self.error("a parameter modifier")),
        };
        self.pos += 1;
        let length = if self.peek() == Some(trim_char) {
            self.pos += 1;
            TrimLength::Longest
        } else {
            TrimLength::Shortest
        };
        let pattern = self.word(WordContext::Braced)?;
        if !self.take("}") {
            return Err(self.error("`}`"));
        }
        Ok(Modifier::Trim(Trim {
            side,
            length,
            pattern,
        }))
    }

    /// Collects the raw content of a `$(...)` command substitution,
    /// consuming the closing parenthesis.
    fn command_subst_content(&mut self) -> Result<String> {
        let mut content = String::new();
        let mut depth = 1usize;
        loop {
            match self.peek() {
                None => return Err(Error::UnclosedExpansion(")")),
                Some('(') => {
                    depth += 1;
                    content.push('(');
                    self.pos += 1;
                }
                Some(')') => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(content);
                    }
                    content.push(')');
                }
                Some('\\') => {
                    content.push('\\');
                    self.pos += 1;
                    if let Some(c) = self.advance() {
                        content.push(c);
                    }
                }
                Some(q @ ('\'' | '"')) => {
                    content.push(q);
                    self.pos += 1;
                    loop {
                        match self.advance() {
                            None => return Err(Error::UnclosedQuote(q)),
                            Some('\\') if q == '"' => {
                                content.push('\\');
                                if let Some(c) = self.advance() {
                                    content.push(c);
                                }
                            }
                            Some(c) if c == q => {
                                content.push(c);
                                break;
                            }
                            Some(c) => content.push(c),
                        }
                    }
                }
                Some(c) => {
                    content.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// Collects the raw content of a `$((...))` arithmetic expansion,
    /// consuming the closing parentheses.
    fn arith_content(&mut self) -> Result<String> {
        let mut content = String::new();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(Error::UnclosedExpansion("))")),
                Some('(') => {
                    depth += 1;
                    content.push('(');
                    self.pos += 1;
                }
                Some(')') if depth > 0 => {
                    depth -= 1;
                    content.push(')');
                    self.pos += 1;
                }
                Some(')') => {
                    if self.peek_at(1) == Some(')') {
                        self.pos += 2;
                        return Ok(content);
                    }
                    return Err(Error::UnclosedExpansion("))"));
                }
                Some(c) => {
                    content.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// Collects the content of a backquoted command substitution, consuming
    /// the closing backquote. Backslash escapes of `$`, `` ` ``, and `\` are
    /// resolved.
    fn backquote_content(&mut self) -> Result<String> {
        let mut content = String::new();
        loop {
            match self.advance() {
                None => return Err(Error::UnclosedQuote('`')),
                Some('`') => return Ok(content),
                Some('\\') => match self.peek() {
                    Some(c @ ('$' | '`' | '\\')) => {
                        content.push(c);
                        self.pos += 1;
                    }
                    _ => content.push('\\'),
                },
                Some(c) => content.push(c),
            }
        }
    }

    // Here-documents ------------------------------------------------------

    /// Reads the contents of all pending here-documents.
    fn read_pending_here_docs(&mut self) -> Result<()> {
        for pending in std::mem::take(&mut self.pending_here_docs) {
            let here_doc = pending.here_doc;
            let mut content = String::new();
            loop {
                if self.at_eof() {
                    return Err(Error::UnclosedHereDoc(here_doc.delimiter.clone()));
                }
                let mut line = String::new();
                while let Some(c) = self.advance() {
                    if c == '\n' {
                        break;
                    }
                    line.push(c);
                }
                let effective = if here_doc.remove_tabs {
                    line.trim_start_matches('\t')
                } else {
                    &line[..]
                };
                if effective == here_doc.delimiter {
                    break;
                }
                content.push_str(effective);
                content.push('\n');
            }

            let text = if here_doc.delimiter_quoted {
                Text::from_literal_chars(content.chars())
            } else {
                Parser::new(&content).here_doc_text()?
            };
            here_doc
                .content
                .set(text)
                .expect("here-document content already filled");
        }
        Ok(())
    }

    /// Parses here-document content: only `$`, backquotes, and backslashes
    /// before `$`, `` ` ``, `\`, and newline are special.
    fn here_doc_text(&mut self) -> Result<Text> {
        let mut units = Vec::new();
        loop {
            match self.peek() {
                None => return Ok(Text(units)),
                Some('\\') => match self.peek_at(1) {
                    Some(c @ ('$' | '`' | '\\')) => {
                        self.pos += 2;
                        units.push(TextUnit::Backslashed(c));
                    }
                    Some('\n') => self.pos += 2,
                    _ => {
                        self.pos += 1;
                        units.push(TextUnit::Literal('\\'));
                    }
                },
                Some('$') => {
                    self.pos += 1;
                    units.push(self.dollar_unit()?);
                }
                Some('`') => {
                    self.pos += 1;
                    let content = self.backquote_content()?;
                    units.push(TextUnit::Backquote { content });
                }
                Some(c) => {
                    self.pos += 1;
                    units.push(TextUnit::Literal(c));
                }
            }
        }
    }

    // Redirections --------------------------------------------------------

    /// Parses a redirection. The caller must have checked [`Self::at_redir`].
    fn redir(&mut self) -> Result<Redir> {
        let mut fd_digits = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            fd_digits.push(self.advance().unwrap());
        }
        let fd = if fd_digits.is_empty() {
            None
        } else {
            match fd_digits.parse() {
                Ok(raw) => Some(Fd(raw)),
                Err(_) => {
                    return Err(Error::Unexpected {
                        found: fd_digits,
                        expected: "a file descriptor",
                    })
                }
            }
        };

        if self.take("<<") {
            let remove_tabs = self.take("-");
            self.skip_blanks();
            let word = self.word(WordContext::Normal)?;
            if word.units.is_empty() {
                return Err(self.error("a here-document delimiter"));
            }
            let delimiter_quoted = word.is_quoted();
            let delimiter = unquote_literal(&word).ok_or(Error::NonLiteralHereDocDelimiter)?;
            let here_doc = Rc::new(HereDoc {
                delimiter,
                delimiter_quoted,
                remove_tabs,
                content: OnceCell::new(),
            });
            self.pending_here_docs.push(PendingHereDoc {
                here_doc: Rc::clone(&here_doc),
            });
            return Ok(Redir {
                fd,
                body: RedirBody::HereDoc(here_doc),
            });
        }

        let operator = if self.take("<>") {
            RedirOp::FileInOut
        } else if self.take("<&") {
            RedirOp::FdIn
        } else if self.take("<") {
            RedirOp::FileIn
        } else if self.take(">>") {
            RedirOp::FileAppend
        } else if self.take(">&") {
            RedirOp::FdOut
        } else if self.take(">|") {
            RedirOp::FileClobber
        } else if self.take(">") {
            RedirOp::FileOut
        } else {
            return Err(self.error("a redirection operator"));
        };

        self.skip_blanks();
        let operand = self.word(WordContext::Normal)?;
        if operand.units.is_empty() {
            return Err(self.error("a redirection operand"));
        }
        Ok(Redir {
            fd,
            body: RedirBody::Normal { operator, operand },
        })
    }

    // Commands ------------------------------------------------------------

    /// Parses a simple command. At least one assignment, word, or
    /// redirection must be present.
    fn simple_command(&mut self) -> Result<SimpleCommand> {
        let mut command = SimpleCommand::default();
        loop {
            self.skip_blanks();
            if self.at_redir() {
                command.redirs.push(self.redir()?);
                continue;
            }
            match self.peek() {
                None | Some('\n' | ';' | '&' | '|' | '(' | ')') => break,
                // A `#` at the start of a token begins a comment
                Some('#') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.pos += 1;
                    }
                    break;
                }
                _ => {}
            }

            // Alias substitution on the command name position
            if command.words.is_empty() && command.assigns.is_empty() {
                if let (Some(aliases), Some(token)) = (self.aliases, self.peek_literal_token()) {
                    if !self.active_aliases.contains(&token) {
                        if let Some(alias) = aliases.get(&token) {
                            self.skip_blanks();
                            let end = self.pos + token.chars().count();
                            let replacement: Vec<char> = alias.replacement.chars().collect();
                            self.chars.splice(self.pos..end, replacement);
                            self.active_aliases.push(token);
                            continue;
                        }
                    }
                }
            }

            if command.words.is_empty() {
                if let Some((name, value)) = self.assignment()? {
                    command.assigns.push(Assign { name, value });
                    continue;
                }
            }
            let word = self.word(WordContext::Normal)?;
            if word.units.is_empty() {
                break;
            }
            command.words.push(word);
        }
        self.active_aliases.clear();
        Ok(command)
    }

    /// Tries to parse an assignment word. Returns `None` (without consuming
    /// input) if the next word is not an assignment.
    fn assignment(&mut self) -> Result<Option<(String, Word)>> {
        let start = self.pos;
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.peek() == Some('=') && is_name(&name) {
            self.pos += 1;
            let value = self.word(WordContext::AssignValue)?;
            Ok(Some((name, value)))
        } else {
            self.pos = start;
            Ok(None)
        }
    }

    /// Parses a command: simple, compound, or function definition.
    fn command(&mut self) -> Result<Command> {
        self.skip_blanks();
        if self.at("(") {
            let command = self.full_compound_command()?;
            return Ok(Command::Compound(Rc::new(command)));
        }
        if let Some(token) = self.peek_literal_token() {
            match &token[..] {
                "if" | "while" | "until" | "for" | "case" | "{" => {
                    let command = self.full_compound_command()?;
                    return Ok(Command::Compound(Rc::new(command)));
                }
                "then" | "else" | "elif" | "fi" | "do" | "done" | "esac" | "in" | "}" => {
                    return Err(Error::Unexpected {
                        found: token,
                        expected: "a command",
                    });
                }
                name if is_name(name) => {
                    // Function definition?
                    let start = self.pos;
                    self.skip_blanks();
                    self.pos += name.chars().count();
                    self.skip_blanks();
                    if self.take("(") {
                        self.skip_blanks();
                        if self.take(")") {
                            self.linebreak()?;
                            let body = self.full_compound_command()?;
                            return Ok(Command::Function(Rc::new(FunctionDefinition {
                                name: name.to_string(),
                                body: Rc::new(body),
                            })));
                        }
                    }
                    self.pos = start;
                }
                _ => {}
            }
        }
        let command = self.simple_command()?;
        if command.is_empty() {
            return Err(self.error("a command"));
        }
        Ok(Command::Simple(Rc::new(command)))
    }

    /// Parses a compound command with optional trailing redirections.
    fn full_compound_command(&mut self) -> Result<FullCompoundCommand> {
        let command = self.compound_command()?;
        let mut redirs = Vec::new();
        loop {
            self.skip_blanks();
            if self.at_redir() {
                redirs.push(self.redir()?);
            } else {
                break;
            }
        }
        Ok(FullCompoundCommand { command, redirs })
    }

    /// Parses a compound command.
    fn compound_command(&mut self) -> Result<CompoundCommand> {
        self.skip_blanks();
        if self.take("(") {
            let body = self.list(&[], true)?;
            if !self.take(")") {
                return Err(self.error("`)`"));
            }
            return Ok(CompoundCommand::Subshell(body));
        }
        if self.take_literal_token("{") {
            let body = self.list(&["}"], false)?;
            if !self.take_literal_token("}") {
                return Err(self.error("`}`"));
            }
            return Ok(CompoundCommand::Grouping(body));
        }
        if self.take_literal_token("if") {
            return self.if_command();
        }
        if self.take_literal_token("while") {
            let (condition, body) = self.loop_tail()?;
            return Ok(CompoundCommand::While { condition, body });
        }
        if self.take_literal_token("until") {
            let (condition, body) = self.loop_tail()?;
            return Ok(CompoundCommand::Until { condition, body });
        }
        if self.take_literal_token("for") {
            return self.for_command();
        }
        if self.take_literal_token("case") {
            return self.case_command();
        }
        Err(self.error("a compound command"))
    }

    fn if_command(&mut self) -> Result<CompoundCommand> {
        let condition = self.list(&["then"], false)?;
        if !self.take_literal_token("then") {
            return Err(self.error("`then`"));
        }
        let body = self.list(&["elif", "else", "fi"], false)?;
        let mut elifs = Vec::new();
        while self.take_literal_token("elif") {
            let condition = self.list(&["then"], false)?;
            if !self.take_literal_token("then") {
                return Err(self.error("`then`"));
            }
            let body = self.list(&["elif", "else", "fi"], false)?;
            elifs.push(ElifThen { condition, body });
        }
        let r#else = if self.take_literal_token("else") {
            Some(self.list(&["fi"], false)?)
        } else {
            None
        };
        if !self.take_literal_token("fi") {
            return Err(self.error("`fi`"));
        }
        Ok(CompoundCommand::If {
            condition,
            body,
            elifs,
            r#else,
        })
    }

    fn loop_tail(&mut self) -> Result<(List, List)> {
        let condition = self.list(&["do"], false)?;
        if !self.take_literal_token("do") {
            return Err(self.error("`do`"));
        }
        let body = self.list(&["done"], false)?;
        if !self.take_literal_token("done") {
            return Err(self.error("`done`"));
        }
        Ok((condition, body))
    }

    fn for_command(&mut self) -> Result<CompoundCommand> {
        self.skip_blanks();
        let Some(name) = self.peek_literal_token().filter(|name| is_name(name)) else {
            return Err(self.error("a variable name"));
        };
        self.skip_blanks();
        self.pos += name.chars().count();

        self.linebreak()?;
        let values = if self.take_literal_token("in") {
            let mut values = Vec::new();
            loop {
                self.skip_blanks();
                match self.peek() {
                    None | Some('\n' | ';') => break,
                    _ => {}
                }
                let word = self.word(WordContext::Normal)?;
                if word.units.is_empty() {
                    break;
                }
                values.push(word);
            }
            Some(values)
        } else {
            None
        };
        self.skip_blanks();
        self.take(";");
        self.linebreak()?;
        if !self.take_literal_token("do") {
            return Err(self.error("`do`"));
        }
        let body = self.list(&["done"], false)?;
        if !self.take_literal_token("done") {
            return Err(self.error("`done`"));
        }
        Ok(CompoundCommand::For { name, values, body })
    }

    fn case_command(&mut self) -> Result<CompoundCommand> {
        self.skip_blanks();
        let subject = self.word(WordContext::Normal)?;
        if subject.units.is_empty() {
            return Err(self.error("a word"));
        }
        self.linebreak()?;
        if !self.take_literal_token("in") {
            return Err(self.error("`in`"));
        }
        let mut items = Vec::new();
        loop {
            self.linebreak()?;
            if self.take_literal_token("esac") {
                return Ok(CompoundCommand::Case { subject, items });
            }
            self.skip_blanks();
            self.take("(");
            let mut patterns = Vec::new();
            loop {
                self.skip_blanks();
                let pattern = self.word(WordContext::Normal)?;
                if pattern.units.is_empty() {
                    return Err(self.error("a pattern"));
                }
                patterns.push(pattern);
                self.skip_blanks();
                if !self.take("|") {
                    break;
                }
            }
            if !self.take(")") {
                return Err(self.error("`)`"));
            }
            let body = self.list(&["esac"], false)?;
            items.push(CaseItem { patterns, body });
            self.skip_blanks();
            self.take(";;");
        }
    }

    /// Parses a pipeline.
    fn pipeline(&mut self) -> Result<Pipeline> {
        self.skip_blanks();
        let negation = self.take_literal_token("!");
        let mut commands = vec![Rc::new(self.command()?)];
        loop {
            self.skip_blanks();
            if self.at("||") || !self.at("|") {
                break;
            }
            self.take("|");
            self.linebreak()?;
            commands.push(Rc::new(self.command()?));
        }
        Ok(Pipeline { commands, negation })
    }

    /// Parses an and-or list.
    fn and_or(&mut self) -> Result<AndOrList> {
        let first = self.pipeline()?;
        let mut rest = Vec::new();
        loop {
            self.skip_blanks();
            let op = if self.take("&&") {
                AndOr::AndThen
            } else if self.at("||") {
                self.take("||");
                AndOr::OrElse
            } else {
                break;
            };
            self.linebreak()?;
            rest.push((op, self.pipeline()?));
        }
        Ok(AndOrList { first, rest })
    }

    /// Parses a list of commands, stopping at a reserved word in
    /// `stop_words`, at `)` if `stop_at_paren`, at `;;`, or at the end of
    /// input.
    fn list(&mut self, stop_words: &[&str], stop_at_paren: bool) -> Result<List> {
        let mut items = Vec::new();
        loop {
            self.linebreak()?;
            if self.at_eof() || self.at(";;") || (stop_at_paren && self.at(")")) {
                break;
            }
            if let Some(token) = self.peek_literal_token() {
                if stop_words.contains(&&token[..]) {
                    break;
                }
            }
            let and_or = Rc::new(self.and_or()?);
            self.skip_blanks();
            let is_async = if self.at("&&") {
                false
            } else if self.at("&") {
                self.take("&");
                true
            } else {
                if self.at(";;") {
                    items.push(Item { and_or, is_async: false });
                    break;
                }
                self.take(";");
                false
            };
            items.push(Item { and_or, is_async });
        }
        Ok(List(items))
    }

    /// Requires the rest of the input to be blank.
    fn expect_eof(&mut self) -> Result<()> {
        self.linebreak()?;
        if let Some(pending) = self.pending_here_docs.first() {
            return Err(Error::UnclosedHereDoc(pending.here_doc.delimiter.clone()));
        }
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }
}

/// Returns the unquoted literal string value of a word, if the word contains
/// no expansions.
#[must_use]
fn unquote_literal(word: &Word) -> Option<String> {
    let mut result = String::new();
    for unit in &word.units {
        match unit {
            WordUnit::Unquoted(TextUnit::Literal(c)) => result.push(*c),
            WordUnit::Unquoted(TextUnit::Backslashed(c)) => result.push(*c),
            WordUnit::SingleQuote(s) => result.push_str(s),
            WordUnit::DoubleQuote(text) => result.push_str(&text.to_string_if_literal()?),
            WordUnit::Tilde(name) => {
                result.push('~');
                result.push_str(name);
            }
            WordUnit::Unquoted(_) => return None,
        }
    }
    Some(result)
}

/// Parses a whole program, substituting aliases on command names.
pub fn parse_program(source: &str, aliases: &AliasSet) -> Result<List> {
    let mut parser = Parser::with_aliases(source, aliases);
    let list = parser.list(&[], false)?;
    parser.expect_eof()?;
    Ok(list)
}

/// Parses a whole program without alias substitution.
pub fn parse_list(source: &str) -> Result<List> {
    let mut parser = Parser::new(source);
    let list = parser.list(&[], false)?;
    parser.expect_eof()?;
    Ok(list)
}

/// Parses a single command.
pub fn parse_command(source: &str) -> Result<Command> {
    let mut parser = Parser::new(source);
    let command = parser.command()?;
    parser.expect_eof()?;
    Ok(command)
}

/// Parses a single compound command.
pub fn parse_compound_command(source: &str) -> Result<CompoundCommand> {
    let mut parser = Parser::new(source);
    let command = parser.compound_command()?;
    parser.expect_eof()?;
    Ok(command)
}

/// Parses a single word.
pub fn parse_word(source: &str) -> Result<Word> {
    let mut parser = Parser::new(source);
    parser.skip_blanks();
    let word = parser.word(WordContext::Normal)?;
    parser.expect_eof()?;
    Ok(word)
}

/// Parses a single redirection.
pub fn parse_redir(source: &str) -> Result<Redir> {
    let mut parser = Parser::new(source);
    parser.skip_blanks();
    if !parser.at_redir() {
        return Err(parser.error("a redirection"));
    }
    let redir = parser.redir()?;
    parser.expect_eof()?;
    Ok(redir)
}
