// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::fmt;

use sloth::{EvalError, EvalResult};

struct ParserOutput<'a, T> {
    parsed: T,
    remaining: &'a str,
}
impl<'a, T> ParserOutput<'a, T> {
    fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ParserOutput<'a, U> {
        ParserOutput {
            parsed: f(self.parsed),
            remaining: self.remaining,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    /// Unsigned magnitude; the parser applies any leading `-` and range-checks the result
    IntegerLiteral(u64),
    FloatLiteral(f64),
    StringLiteral(String),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Append,
    Assign,
    Comma,
    Colon,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Separator,
    EndOfInput,
}
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntegerLiteral(value) => write!(f, "{}", value),
            Self::FloatLiteral(value) => write!(f, "{:?}", value),
            Self::StringLiteral(value) => write!(f, "{:?}", value),
            Self::Identifier(value) => write!(f, "{}", value),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Append => write!(f, ">>"),
            Self::Assign => write!(f, "="),
            Self::Comma => write!(f, ","),
            Self::Colon => write!(f, ":"),
            Self::OpenParen => write!(f, "("),
            Self::CloseParen => write!(f, ")"),
            Self::OpenBracket => write!(f, "["),
            Self::CloseBracket => write!(f, "]"),
            Self::OpenBrace => write!(f, "{{"),
            Self::CloseBrace => write!(f, "}}"),
            Self::Separator => write!(f, "end of statement"),
            Self::EndOfInput => write!(f, "{}", EOF),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

const EOF: &str = "end of input";

/// Splits source text into tokens.
///
/// Newlines and `;` produce statement separators, except inside brackets where newlines are
/// treated as whitespace. Comments run from `#` to the end of the line.
pub fn tokenize(input: &str) -> EvalResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut depth: usize = 0;
    let mut input = input;
    loop {
        input = consume_comment(consume_whitespace(input));
        let next_char = match peek_next_char(input) {
            None => break,
            Some(next_char) => next_char,
        };
        if next_char == '\n' {
            if depth == 0 {
                tokens.push(Token {
                    kind: TokenKind::Separator,
                    line,
                });
            }
            line += 1;
            input = &input[1..];
            continue;
        }
        let ParserOutput {
            parsed: kind,
            remaining,
        } = match consume_token(input).map_err(|message| EvalError::syntax(line, message))? {
            Some(result) => Ok(result),
            None => Err(EvalError::syntax(
                line,
                format!("Unexpected character '{}'", next_char),
            )),
        }?;
        match kind {
            TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace => depth += 1,
            TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
        line += input[..input.len() - remaining.len()].matches('\n').count();
        tokens.push(Token { kind, line });
        input = remaining;
    }
    tokens.push(Token {
        kind: TokenKind::EndOfInput,
        line,
    });
    Ok(tokens)
}

fn consume_token(input: &str) -> Result<Option<ParserOutput<TokenKind>>, String> {
    match consume_number_literal(input)? {
        Some(result) => Ok(Some(result)),
        None => match consume_string_literal(input)? {
            Some(result) => Ok(Some(result)),
            None => Ok(consume_identifier(input).or_else(|| consume_punctuation(input))),
        },
    }
}

fn consume_whitespace(input: &str) -> &str {
    input.trim_start_matches(|char: char| char != '\n' && char.is_whitespace())
}

fn consume_comment(input: &str) -> &str {
    match consume_char('#', input) {
        Some(remaining) => match remaining.find('\n') {
            Some(index) => &remaining[index..],
            None => "",
        },
        None => input,
    }
}

fn consume_char(char: char, input: &str) -> Option<&str> {
    input
        .chars()
        .next()
        .filter(|value| *value == char)
        .map(|value| &input[value.len_utf8()..])
}

fn consume_while(predicate: impl Fn(char) -> bool, input: &str) -> Option<ParserOutput<&str>> {
    let length = input
        .char_indices()
        .find_map(|(index, char)| if predicate(char) { None } else { Some(index) })
        .unwrap_or_else(|| input.len());
    if length > 0 {
        Some(ParserOutput {
            parsed: &input[0..length],
            remaining: &input[length..],
        })
    } else {
        None
    }
}

fn peek_next_char(input: &str) -> Option<char> {
    input.chars().next()
}

fn is_digit_char(char: char) -> bool {
    char.is_ascii_digit()
}

fn is_identifier_start_char(char: char) -> bool {
    char.is_alphabetic() || char == '_'
}

fn is_identifier_char(char: char) -> bool {
    char.is_alphanumeric() || char == '_'
}

fn consume_identifier(input: &str) -> Option<ParserOutput<TokenKind>> {
    if !peek_next_char(input).map_or(false, is_identifier_start_char) {
        return None;
    }
    consume_while(is_identifier_char, input)
        .map(|output| output.map(|name| TokenKind::Identifier(String::from(name))))
}

fn consume_number_literal(input: &str) -> Result<Option<ParserOutput<TokenKind>>, String> {
    let ParserOutput {
        parsed: int_chars,
        remaining,
    } = match consume_while(is_digit_char, input) {
        Some(result) => result,
        None => return Ok(None),
    };
    let fraction = consume_char('.', remaining)
        .map(|remaining| consume_while(is_digit_char, remaining).unwrap_or(ParserOutput {
            parsed: "",
            remaining,
        }));
    match fraction {
        None => int_chars
            .parse::<u64>()
            .map(|value| {
                Some(ParserOutput {
                    parsed: TokenKind::IntegerLiteral(value),
                    remaining,
                })
            })
            .map_err(|_| format!("Integer literal out of range: {}", int_chars)),
        Some(ParserOutput {
            parsed: decimal_chars,
            remaining,
        }) => format!("{}.{}0", int_chars, decimal_chars)
            .parse::<f64>()
            .map(|value| {
                Some(ParserOutput {
                    parsed: TokenKind::FloatLiteral(value),
                    remaining,
                })
            })
            .map_err(|_| format!("Invalid float literal: {}.{}", int_chars, decimal_chars)),
    }
}

fn consume_string_literal(input: &str) -> Result<Option<ParserOutput<TokenKind>>, String> {
    let quote = match peek_next_char(input) {
        Some(quote) if quote == '"' || quote == '\'' => quote,
        _ => return Ok(None),
    };
    let mut value = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((index, char)) = chars.next() {
        match char {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, '0')) => value.push('\0'),
                Some((_, escaped)) if escaped == '\\' || escaped == '"' || escaped == '\'' => {
                    value.push(escaped)
                }
                Some((_, escaped)) => return Err(format!("Invalid escape sequence: \\{}", escaped)),
                None => break,
            },
            '\n' => break,
            char if char == quote => {
                return Ok(Some(ParserOutput {
                    parsed: TokenKind::StringLiteral(value),
                    remaining: &input[index + char.len_utf8()..],
                }))
            }
            char => value.push(char),
        }
    }
    Err(String::from("Unterminated string literal"))
}

fn consume_punctuation(input: &str) -> Option<ParserOutput<TokenKind>> {
    if let Some(remaining) = input.strip_prefix(">>") {
        return Some(ParserOutput {
            parsed: TokenKind::Append,
            remaining,
        });
    }
    let kind = match peek_next_char(input)? {
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '=' => TokenKind::Assign,
        ',' => TokenKind::Comma,
        ':' => TokenKind::Colon,
        ';' => TokenKind::Separator,
        '(' => TokenKind::OpenParen,
        ')' => TokenKind::CloseParen,
        '[' => TokenKind::OpenBracket,
        ']' => TokenKind::CloseBracket,
        '{' => TokenKind::OpenBrace,
        '}' => TokenKind::CloseBrace,
        _ => return None,
    };
    Some(ParserOutput {
        parsed: kind,
        remaining: &input[1..],
    })
}

#[cfg(test)]
mod tests {
    use sloth::EvalError;

    use super::{tokenize, TokenKind};

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn literals() {
        assert_eq!(
            kinds("3 3.5 4. \"foo\" 'bar'"),
            vec![
                TokenKind::IntegerLiteral(3),
                TokenKind::FloatLiteral(3.5),
                TokenKind::FloatLiteral(4.0),
                TokenKind::StringLiteral(String::from("foo")),
                TokenKind::StringLiteral(String::from("bar")),
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\n\"b\"""#),
            vec![
                TokenKind::StringLiteral(String::from("a\n\"b\"")),
                TokenKind::EndOfInput,
            ]
        );
        assert!(matches!(
            tokenize("\"abc"),
            Err(EvalError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn operators_and_identifiers() {
        assert_eq!(
            kinds("fibs = 0 >> x_1 + -y"),
            vec![
                TokenKind::Identifier(String::from("fibs")),
                TokenKind::Assign,
                TokenKind::IntegerLiteral(0),
                TokenKind::Append,
                TokenKind::Identifier(String::from("x_1")),
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Identifier(String::from("y")),
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn statement_separators() {
        assert_eq!(
            kinds("x = 1 # comment\ny = 2; z"),
            vec![
                TokenKind::Identifier(String::from("x")),
                TokenKind::Assign,
                TokenKind::IntegerLiteral(1),
                TokenKind::Separator,
                TokenKind::Identifier(String::from("y")),
                TokenKind::Assign,
                TokenKind::IntegerLiteral(2),
                TokenKind::Separator,
                TokenKind::Identifier(String::from("z")),
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_ignored() {
        assert_eq!(
            kinds("[1,\n 2]"),
            vec![
                TokenKind::OpenBracket,
                TokenKind::IntegerLiteral(1),
                TokenKind::Comma,
                TokenKind::IntegerLiteral(2),
                TokenKind::CloseBracket,
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn line_numbers() {
        let tokens = tokenize("x\n\n  y").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[3].kind, TokenKind::Identifier(String::from("y")));
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn integer_literal_range() {
        assert_eq!(
            kinds("9223372036854775808"),
            vec![
                TokenKind::IntegerLiteral(9_223_372_036_854_775_808),
                TokenKind::EndOfInput,
            ]
        );
        assert!(matches!(
            tokenize("18446744073709551616"),
            Err(EvalError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn unexpected_characters() {
        assert_eq!(
            tokenize("x = 1\ny = $"),
            Err(EvalError::syntax(2, "Unexpected character '$'"))
        );
    }
}
