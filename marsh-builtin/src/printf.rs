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

//! Printf built-in.
//!
//! The format string supports the backslash escapes `\\ \a \b \f \n \r \t
//! \v` and octal `\NNN`, and the conversions `%s %c %d %i %u %o %x %X %%`
//! with optional `-` and `0` flags, field width, and precision. As POSIX
//! requires, the format is reused until all operands are consumed.

use crate::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::{ExitStatus, Field};
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_syntax::syntax::Fd;

#[derive(Default)]
struct Render {
    output: String,
    errors: Vec<String>,
}

/// Interprets one conversion specification.
struct Conversion {
    left_align: bool,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    specifier: char,
}

fn parse_conversion(chars: &[char], mut pos: usize) -> Option<(Conversion, usize)> {
    let mut conversion = Conversion {
        left_align: false,
        zero_pad: false,
        width: 0,
        precision: None,
        specifier: ' ',
    };
    loop {
        match chars.get(pos) {
            Some('-') => conversion.left_align = true,
            Some('0') => conversion.zero_pad = true,
            _ => break,
        }
        pos += 1;
    }
    while let Some(c) = chars.get(pos) {
        if let Some(digit) = c.to_digit(10) {
            conversion.width = conversion.width * 10 + digit as usize;
            pos += 1;
        } else {
            break;
        }
    }
    if chars.get(pos) == Some(&'.') {
        pos += 1;
        let mut precision = 0;
        while let Some(digit) = chars.get(pos).and_then(|c| c.to_digit(10)) {
            precision = precision * 10 + digit as usize;
            pos += 1;
        }
        conversion.precision = Some(precision);
    }
    match chars.get(pos) {
        Some(&c @ ('s' | 'c' | 'd' | 'i' | 'u' | 'o' | 'x' | 'X')) => {
            conversion.specifier = c;
            Some((conversion, pos + 1))
        }
        _ => None,
    }
}

impl Render {
    fn pad(&mut self, conversion: &Conversion, body: &str, numeric: bool) {
        let padding = conversion.width.saturating_sub(body.chars().count());
        if padding == 0 {
            self.output.push_str(body);
        } else if conversion.left_align {
            self.output.push_str(body);
            self.output.extend(std::iter::repeat(' ').take(padding));
        } else if conversion.zero_pad && numeric {
            // Zero padding goes after any sign
            let (sign, digits) = match body.strip_prefix('-') {
                Some(digits) => ("-", digits),
                None => ("", body),
            };
            self.output.push_str(sign);
            self.output.extend(std::iter::repeat('0').take(padding));
            self.output.push_str(digits);
        } else {
            self.output.extend(std::iter::repeat(' ').take(padding));
            self.output.push_str(body);
        }
    }

    fn integer_value(&mut self, operand: Option<&Field>) -> i64 {
        let Some(operand) = operand else { return 0 };
        let text = operand.value.trim();
        if text.is_empty() {
            return 0;
        }
        // A leading quote yields the numeric value of the next character
        if let Some(rest) = text.strip_prefix('\'').or_else(|| text.strip_prefix('"')) {
            if let Some(c) = rest.chars().next() {
                return c as i64;
            }
        }
        match parse_integer(text) {
            Some(value) => value,
            None => {
                self.errors
                    .push(format!("`{}` is not a valid number", operand.value));
                0
            }
        }
    }

    fn convert(&mut self, conversion: &Conversion, operand: Option<&Field>) {
        match conversion.specifier {
            's' => {
                let value = operand.map(|field| &field.value[..]).unwrap_or("");
                let value = match conversion.precision {
                    Some(precision) => value.chars().take(precision).collect::<String>(),
                    None => value.to_string(),
                };
                self.pad(conversion, &value, false);
            }
            'c' => {
                let value: String = operand
                    .and_then(|field| field.value.chars().next())
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                self.pad(conversion, &value, false);
            }
            'd' | 'i' => {
                let value = self.integer_value(operand).to_string();
                self.pad(conversion, &value, true);
            }
            'u' => {
                let value = (self.integer_value(operand) as u64).to_string();
                self.pad(conversion, &value, true);
            }
            'o' => {
                let value = format!("{:o}", self.integer_value(operand) as u64);
                self.pad(conversion, &value, true);
            }
            'x' => {
                let value = format!("{:x}", self.integer_value(operand) as u64);
                self.pad(conversion, &value, true);
            }
            'X' => {
                let value = format!("{:X}", self.integer_value(operand) as u64);
                self.pad(conversion, &value, true);
            }
            _ => unreachable!("unchecked conversion specifier"),
        }
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse().ok()?
    };
    Some(if negative { -value } else { value })
}

/// Renders one pass over the format. Returns the number of operands
/// consumed.
fn render_pass(render: &mut Render, format: &[char], operands: &[Field]) -> usize {
    let mut consumed = 0;
    let mut pos = 0;
    while pos < format.len() {
        match format[pos] {
            '\\' => {
                pos += 1;
                match format.get(pos) {
                    Some('a') => render.output.push('\u{7}'),
                    Some('b') => render.output.push('\u{8}'),
                    Some('f') => render.output.push('\u{c}'),
                    Some('n') => render.output.push('\n'),
                    Some('r') => render.output.push('\r'),
                    Some('t') => render.output.push('\t'),
                    Some('v') => render.output.push('\u{b}'),
                    Some('\\') => render.output.push('\\'),
                    Some(&c) if c.is_digit(8) => {
                        let mut value = 0u32;
                        let mut digits = 0;
                        while digits < 3 {
                            match format.get(pos).and_then(|c| c.to_digit(8)) {
                                Some(digit) => {
                                    value = value * 8 + digit;
                                    pos += 1;
                                    digits += 1;
                                }
                                None => break,
                            }
                        }
                        pos -= 1;
                        if let Some(c) = char::from_u32(value) {
                            render.output.push(c);
                        }
                    }
                    Some(&c) => {
                        render.output.push('\\');
                        render.output.push(c);
                    }
                    None => render.output.push('\\'),
                }
                pos += 1;
            }
            '%' => {
                if format.get(pos + 1) == Some(&'%') {
                    render.output.push('%');
                    pos += 2;
                    continue;
                }
                match parse_conversion(format, pos + 1) {
                    Some((conversion, next)) => {
                        render.convert(&conversion, operands.get(consumed));
                        consumed += 1;
                        pos = next;
                    }
                    None => {
                        render.errors.push("invalid conversion".to_string());
                        render.output.push('%');
                        pos += 1;
                    }
                }
            }
            c => {
                render.output.push(c);
                pos += 1;
            }
        }
    }
    consumed
}

/// Entry point of the printf built-in.
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let Some(format) = args.first() else {
        return report_error(env, "printf", "missing format operand", ExitStatus::ERROR);
    };
    let format: Vec<char> = format.value.chars().collect();
    let operands = &args[1..];

    let mut render = Render::default();
    let mut consumed_total = 0;
    loop {
        let consumed = render_pass(&mut render, &format, &operands[consumed_total..]);
        consumed_total += consumed;
        // The format is reused until the operands are exhausted, but only
        // if it consumes any
        if consumed == 0 || consumed_total >= operands.len() {
            break;
        }
    }

    let _ = env.system.write_all(Fd::STDOUT, render.output.as_bytes());
    if render.errors.is_empty() {
        Result::SUCCESS
    } else {
        let message = render.errors.join("; ");
        report_error(env, "printf", &message, ExitStatus::FAILURE)
    }
}
