//! Lexer for Scent assembly instruction lines.
//!
//! The line structure (comments, blank lines, the forbidden leading
//! whitespace) is handled by the caller; this module splits a single
//! instruction line into tokens. Runs of spaces and tabs collapse into a
//! single separator outside quoted strings.

use crate::Error;
use scent_core::{Cmyk, Fixed};

/// A token on an instruction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An identifier-like word. May contain interior hyphens.
    Name(String),
    /// A fixed-point number.
    Number(Fixed),
    /// A quoted string with escapes resolved.
    Str(String),
    /// A `%`-prefixed CMYK colour.
    Color(Cmyk),
    /// A lone `-`, denoting "absent".
    Dash,
}

impl Token {
    pub fn description(&self) -> &'static str {
        match self {
            Token::Name(_) => "a name",
            Token::Number(_) => "a number",
            Token::Str(_) => "a string",
            Token::Color(_) => "a colour",
            Token::Dash => "a dash",
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Split one instruction line into tokens.
pub fn tokenize(line: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c == ' ' || c == '\t' {
            chars.next();
            continue;
        }
        let token = if c == '"' {
            chars.next();
            let mut s = String::new();
            loop {
                match chars.next() {
                    None => return Err(Error::syntax("unterminated string")),
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('\\') => s.push('\\'),
                        Some('\'') => s.push('"'),
                        Some(other) => {
                            return Err(Error::syntax(format![
                                "invalid string escape `\\{other}`"
                            ]))
                        }
                        None => return Err(Error::syntax("unterminated string")),
                    },
                    Some(other) => s.push(other),
                }
            }
            Token::Str(s)
        } else if c == '%' {
            let word = read_word(&mut chars);
            match Cmyk::parse(&word) {
                Some(color) => Token::Color(color),
                None => {
                    return Err(Error::syntax(format![
                        "invalid colour `{word}`; expected `%` and eight hex digits"
                    ]))
                }
            }
        } else if is_name_start(c) {
            chars.next();
            let mut s = String::from(c);
            while let Some(&n) = chars.peek() {
                if is_name_continue(n) {
                    chars.next();
                    s.push(n);
                } else {
                    break;
                }
            }
            Token::Name(s)
        } else if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' {
            let word = read_word(&mut chars);
            if word == "-" {
                Token::Dash
            } else {
                match Fixed::parse(&word) {
                    Ok(n) => Token::Number(n),
                    Err(err) => {
                        return Err(Error::syntax(format!["invalid number `{word}`: {err}"]))
                    }
                }
            }
        } else {
            return Err(Error::syntax(format!["unexpected character `{c}`"]));
        };
        tokens.push(token);
        // Tokens must be separated by whitespace.
        match chars.peek() {
            None | Some(' ') | Some('\t') => (),
            Some(&n) => {
                return Err(Error::syntax(format![
                    "expected whitespace before `{n}`"
                ]))
            }
        }
    }
    Ok(tokens)
}

fn read_word(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut s = String::new();
    while let Some(&c) = chars.peek() {
        if c == ' ' || c == '\t' {
            break;
        }
        chars.next();
        s.push(c);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Token {
        Token::Name(s.into())
    }

    macro_rules! tokenize_tests {
        ( $( ($test_name: ident, $input: expr, $( $token: expr, )*), )+ ) => {
            $(
            #[test]
            fn $test_name() {
                let want: Vec<Token> = vec![ $( $token ),* ];
                assert_eq![tokenize($input), Ok(want)];
            }
            )+
        };
    }

    tokenize_tests![
        (empty_line, "", ),
        (
            compound_name,
            "begin path",
            name("begin"),
            name("path"),
        ),
        (
            collapsed_whitespace,
            "dim  595.27559 \t 841.88976",
            name("dim"),
            Token::Number(Fixed(59_527_559)),
            Token::Number(Fixed(84_188_976)),
        ),
        (
            negative_number_and_dash,
            "advance -5 -",
            name("advance"),
            Token::Number(Fixed(-500_000)),
            Token::Dash,
        ),
        (
            hyphenated_font_name,
            "font_standard F1 Times-Roman",
            name("font_standard"),
            name("F1"),
            name("Times-Roman"),
        ),
        (
            string_with_spaces,
            r#"write "Hello, world""#,
            name("write"),
            Token::Str("Hello, world".into()),
        ),
        (
            string_escapes,
            r#"write "a\\b\'c""#,
            name("write"),
            Token::Str(r#"a\b"c"#.into()),
        ),
        (
            color_token,
            "fill_color %00000080",
            name("fill_color"),
            Token::Color(Cmyk { cyan: 0, magenta: 0, yellow: 0, black: 128 }),
        ),
    ];

    macro_rules! tokenize_error_tests {
        ( $( ($test_name: ident, $input: expr), )+ ) => {
            $(
            #[test]
            fn $test_name() {
                assert![tokenize($input).is_err(), "expected an error"];
            }
            )+
        };
    }

    tokenize_error_tests![
        (unterminated_string, r#"write "abc"#),
        (bad_escape, r#"write "a\nb""#),
        (bad_color, "fill_color %00ff"),
        (bad_number, "dim 1.2.3 4"),
        (glued_tokens, r#"write "a"x"#),
        (stray_character, "dim ^ 2"),
    ];
}
