//! The Scent entity scanner.
//!
//! The scanner is lazy: entities are produced one at a time as the
//! evaluator asks for them. This matters for two reasons. First, the
//! `@end` mark must make the scanner ignore everything that follows,
//! including bytes that would not scan. Second, unknown atoms must *not*
//! be rejected here — the recognised atom set is a property of the
//! operations that consume atoms, so membership is checked at the use
//! site.

use super::Entity;
use crate::error::Error;
use scent_core::{is_name, Fixed};

/// Largest magnitude an integral numeric literal may have.
const NUMERIC_LIMIT: i64 = (1 << 53) - 1;

/// Characters that terminate a bare word.
fn is_word_end(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | '@')
}

/// The Scent entity scanner.
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    in_meta: bool,
    ended: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Scanner<'a> {
        Scanner {
            src,
            pos: 0,
            line: 1,
            in_meta: false,
            ended: false,
        }
    }

    /// The 1-based line the scanner is currently on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Produce the next entity, or [None] at the end of input.
    pub fn next(&mut self) -> Result<Option<Entity>, Error> {
        if self.ended {
            return Ok(None);
        }
        self.skip_whitespace();
        let c = match self.peek() {
            None => return Ok(None),
            Some(c) => c,
        };
        let entity = match c {
            '@' => {
                self.advance();
                match self.peek() {
                    Some('{') => {
                        self.advance();
                        self.in_meta = true;
                        Entity::BeginMeta
                    }
                    Some('}') => {
                        self.advance();
                        self.in_meta = false;
                        Entity::EndMeta
                    }
                    Some(c) if c.is_ascii_alphabetic() => {
                        let word = self.read_word();
                        if word == "end" {
                            // Everything after the end-of-file mark is
                            // ignored, even bytes that would not scan.
                            self.ended = true;
                            return Ok(None);
                        }
                        Entity::MetaCommand(word)
                    }
                    _ => return Err(self.err("malformed meta entity")),
                }
            }
            _ if self.in_meta => {
                let word = self.read_word();
                if word.is_empty() {
                    return Err(self.err(format![
                        "unexpected character `{c}` in a meta block"
                    ]));
                }
                Entity::MetaToken(word)
            }
            '{' => {
                self.advance();
                Entity::Str(self.scan_curly_string()?)
            }
            '"' => {
                self.advance();
                self.scan_atom()?
            }
            '(' => {
                self.advance();
                Entity::BeginGroup
            }
            ')' => {
                self.advance();
                Entity::EndGroup
            }
            '[' => {
                self.advance();
                Entity::BeginArray
            }
            ']' => {
                self.advance();
                Entity::EndArray
            }
            '!' | ':' | '=' | '$' => {
                self.advance();
                let name = self.read_word();
                if !is_name(&name) {
                    return Err(self.err(format!["invalid name `{name}`"]));
                }
                match c {
                    '!' => Entity::DeclareVar(name),
                    ':' => Entity::DeclareConst(name),
                    '=' => Entity::Assign(name),
                    _ => Entity::Get(name),
                }
            }
            c if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => {
                self.scan_numeric()?
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.read_word();
                if !is_name(&name) {
                    return Err(self.err(format!["invalid operation name `{name}`"]));
                }
                Entity::Op(name)
            }
            c => return Err(self.err(format!["unexpected character `{c}`"])),
        };
        Ok(Some(entity))
    }

    fn scan_numeric(&mut self) -> Result<Entity, Error> {
        let word = self.read_word();
        if word.contains('.') {
            match Fixed::parse(&word) {
                Ok(f) => Ok(Entity::Fixed(f)),
                Err(scent_core::ParseFixedError::OutOfRange) => {
                    Err(self.num_range_err(&word))
                }
                Err(scent_core::ParseFixedError::Malformed) => {
                    Err(self.err(format!["malformed numeric `{word}`"]))
                }
            }
        } else {
            let digits = word.strip_prefix(['+', '-']).unwrap_or(&word);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(self.err(format!["malformed numeric `{word}`"]));
            }
            match word.parse::<i64>() {
                Ok(i) if i.abs() <= NUMERIC_LIMIT => Ok(Entity::Integer(i)),
                _ => Err(self.num_range_err(&word)),
            }
        }
    }

    fn num_range_err(&self, word: &str) -> Error {
        Error::domain(format!["numeric `{word}` out of range"]).at_line(self.line)
    }

    fn scan_atom(&mut self) -> Result<Entity, Error> {
        let mut name = String::new();
        loop {
            match self.peek() {
                None => return Err(self.err("unterminated atom")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '-' => {
                    self.advance();
                    name.push(c);
                }
                Some(c) => {
                    return Err(self.err(format!["invalid character `{c}` in atom"]))
                }
            }
        }
        if name.is_empty() {
            return Err(self.err("empty atom"));
        }
        Ok(Entity::Atom(name))
    }

    /// Scan the remainder of a curly string; the opening brace has been
    /// consumed. Nested balanced braces are kept literally.
    fn scan_curly_string(&mut self) -> Result<String, Error> {
        let mut s = String::new();
        let mut depth = 0usize;
        loop {
            let c = match self.take() {
                None => return Err(self.err("unterminated string")),
                Some(c) => c,
            };
            match c {
                '}' => {
                    if depth == 0 {
                        return Ok(s);
                    }
                    depth -= 1;
                    s.push('}');
                }
                '{' => {
                    depth += 1;
                    s.push('{');
                }
                '\\' => match self.take() {
                    None => return Err(self.err("unterminated string")),
                    Some('\\') => s.push('\\'),
                    Some('{') => s.push('{'),
                    Some('}') => s.push('}'),
                    Some('n') => s.push('\n'),
                    Some('u') => s.push(self.scan_codepoint(4)?),
                    Some('U') => s.push(self.scan_codepoint(6)?),
                    Some('.') => loop {
                        match self.take() {
                            None => return Err(self.err("unterminated string")),
                            Some('\n') => break,
                            Some(_) => (),
                        }
                    },
                    Some(other) => {
                        return Err(self.err(format!["invalid escape `\\{other}`"]))
                    }
                },
                other => s.push(other),
            }
        }
    }

    /// Read exactly `digits` hex digits and convert them to a scalar.
    fn scan_codepoint(&mut self, digits: usize) -> Result<char, Error> {
        let mut value: u32 = 0;
        for _ in 0..digits {
            let d = match self.take().and_then(|c| c.to_digit(16)) {
                None => {
                    return Err(self.err(format![
                        "the escape requires exactly {digits} hex digits"
                    ]))
                }
                Some(d) => d,
            };
            value = value * 16 + d;
        }
        char::from_u32(value).ok_or_else(|| {
            self.err(format!["U+{value:04X} is not a Unicode scalar value"])
        })
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_word_end(c) {
                break;
            }
            self.advance();
        }
        self.src[start..self.pos].into()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    /// Consume and return the next character.
    fn take(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.advance();
        Some(c)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            if c == '\n' {
                self.line += 1;
            }
            self.pos += c.len_utf8();
        }
    }

    fn err<T: Into<String>>(&self, message: T) -> Error {
        Error::syntax(message).at_line(self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Entity::*;

    fn scan_all(src: &str) -> Result<Vec<Entity>, Error> {
        let mut scanner = Scanner::new(src);
        let mut entities = Vec::new();
        while let Some(entity) = scanner.next()? {
            entities.push(entity);
        }
        Ok(entities)
    }

    fn op(s: &str) -> Entity {
        Op(s.into())
    }

    macro_rules! scanner_tests {
        ( $( ($name: ident, $input: expr, $( $entity: expr, )* ), )+ ) => {
            $(
            #[test]
            fn $name() {
                let want: Vec<Entity> = vec![ $( $entity ),* ];
                assert_eq![scan_all($input), Ok(want)];
            }
            )+
        };
    }

    scanner_tests![
        (empty, "", ),
        (
            header_entities,
            "@{ scent 1.0 @}",
            BeginMeta,
            MetaToken("scent".into()),
            MetaToken("1.0".into()),
            EndMeta,
        ),
        (
            group_program,
            "1 2 ( 3 4 pop 7 )",
            Integer(1),
            Integer(2),
            BeginGroup,
            Integer(3),
            Integer(4),
            op("pop"),
            Integer(7),
            EndGroup,
        ),
        (
            arrays_and_ops,
            "[ 3 2 ] dash_pattern",
            BeginArray,
            Integer(3),
            Integer(2),
            EndArray,
            op("dash_pattern"),
        ),
        (
            numerics,
            "-5 +12 595.27559 -.5",
            Integer(-5),
            Integer(12),
            Entity::Fixed(scent_core::Fixed(59_527_559)),
            Entity::Fixed(scent_core::Fixed(-50_000)),
        ),
        (
            sigils,
            "!width :margin =width $width",
            DeclareVar("width".into()),
            DeclareConst("margin".into()),
            Assign("width".into()),
            Get("width".into()),
        ),
        (
            atoms_are_not_resolved,
            "\"ArtBox\" \"NoSuchAtom\"",
            Atom("ArtBox".into()),
            Atom("NoSuchAtom".into()),
        ),
        (
            simple_string,
            "{Hello, world}",
            Str("Hello, world".into()),
        ),
        (
            nested_curlies,
            "{a {b {c}} d}",
            Str("a {b {c}} d".into()),
        ),
        (
            string_escapes,
            r"{a\\b\{c\}d\n}",
            Str("a\\b{c}d\n".into()),
        ),
        (
            unicode_escapes,
            r"{A\U01F389}",
            Str("A\u{1F389}".into()),
        ),
        (
            continuation_escape,
            "{one\\.   ignored\ntwo}",
            Str("onetwo".into()),
        ),
        (
            retained_newline,
            "{a\nb}",
            Str("a\nb".into()),
        ),
        (
            end_mark_ignores_trailing_garbage,
            "pop @end ??? {unterminated",
            op("pop"),
        ),
        (
            adjacent_marks,
            "(7)",
            BeginGroup,
            Integer(7),
            EndGroup,
        ),
        (
            bound_meta_commands,
            "@bound-x 1.5",
            MetaCommand("bound-x".into()),
            Entity::Fixed(scent_core::Fixed(150_000)),
        ),
    ];

    macro_rules! scanner_error_tests {
        ( $( ($name: ident, $input: expr, $kind: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                let err = scan_all($input).expect_err("expected an error");
                assert_eq![err.kind, $kind, "unexpected error: {err}"];
            }
            )+
        };
    }

    use scent_core::ErrorKind;

    scanner_error_tests![
        (unterminated_string, "{abc", ErrorKind::Syntax),
        (invalid_escape, r"{a\qb}", ErrorKind::Syntax),
        (short_u_escape, r"{\u041}", ErrorKind::Syntax),
        (short_big_u_escape, r"{\U1F389}", ErrorKind::Syntax),
        (surrogate_escape, r"{\uD800}", ErrorKind::Syntax),
        (empty_atom, "\"\"", ErrorKind::Syntax),
        (unterminated_atom, "\"ArtBox", ErrorKind::Syntax),
        (atom_with_space, "\"Art Box\"", ErrorKind::Syntax),
        (malformed_numeric, "1..2", ErrorKind::Syntax),
        (numeric_too_large, "9007199254740992", ErrorKind::Domain),
        (fixed_out_of_range, "99999.0", ErrorKind::Domain),
        (bad_meta, "@7", ErrorKind::Syntax),
        (stray_mark_in_meta, "@{ ( @}", ErrorKind::Syntax),
        (bad_sigil_name, "$7x", ErrorKind::Syntax),
        (stray_character, "^", ErrorKind::Syntax),
    ];

    #[test]
    fn line_numbers() {
        let mut scanner = Scanner::new("1\n2\n{a\nb}\n3");
        scanner.next().unwrap();
        assert_eq![scanner.line(), 1];
        scanner.next().unwrap();
        assert_eq![scanner.line(), 2];
        scanner.next().unwrap();
        // The string spans lines 3 and 4.
        assert_eq![scanner.line(), 4];
    }

    #[test]
    fn short_u_escape_is_rejected_even_with_hex_after() {
        // `\u219` followed by a non-hex character must not parse as a
        // three-digit escape.
        let err = scan_all(r"{\u219Z}").expect_err("expected an error");
        assert_eq![err.kind, ErrorKind::Syntax];
    }
}
