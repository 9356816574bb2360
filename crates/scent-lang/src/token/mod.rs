//! Scent entities and the source preamble.
//!
//! Scent source code is a stream of *entities*: strings, numerics,
//! grouping and array marks, operation names, and the sigil-prefixed
//! variable manipulations. Meta entities (`@{ … @}`, `@bound-x`, `@body`,
//! `@end`) frame the stream: every source starts with a header meta block
//! and may end early with the `@end` mark.

use crate::error::Error;
use scent_core::Fixed;

pub mod scan;

pub use scan::Scanner;

/// A single entity of a Scent source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// `@{`
    BeginMeta,
    /// `@}`
    EndMeta,
    /// A bare word inside a meta block, kept verbatim.
    MetaToken(String),
    /// `@word` outside a meta block, e.g. `@bound-x` or `@body`.
    MetaCommand(String),
    /// A curly-quoted string with escapes resolved.
    Str(String),
    /// A double-quoted atom name. Membership in the atom set is checked
    /// at the use site, never here.
    Atom(String),
    /// An integral numeric literal.
    Integer(i64),
    /// A numeric literal with a fractional part.
    Fixed(Fixed),
    /// `(`
    BeginGroup,
    /// `)`
    EndGroup,
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// An operation name.
    Op(String),
    /// `!name`: declare a variable from the popped value.
    DeclareVar(String),
    /// `:name`: declare a constant from the popped value.
    DeclareConst(String),
    /// `=name`: assign the popped value to an existing variable.
    Assign(String),
    /// `$name`: push a copy of the stored value.
    Get(String),
}

impl Entity {
    pub fn description(&self) -> &'static str {
        use Entity::*;
        match self {
            BeginMeta | EndMeta | MetaToken(_) | MetaCommand(_) => "a meta entity",
            Str(_) => "a string",
            Atom(_) => "an atom",
            Integer(_) => "an integer",
            Fixed(_) => "a fixed number",
            BeginGroup => "a begin-group mark",
            EndGroup => "an end-group mark",
            BeginArray => "an array-begin mark",
            EndArray => "an array-end mark",
            Op(_) => "an operation",
            DeclareVar(_) | DeclareConst(_) | Assign(_) | Get(_) => {
                "a variable manipulation"
            }
        }
    }
}

/// What kind of source the header declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A document compiled on its own (`scent`).
    Document,
    /// A source drawn into a host page by `draw_embed` (`scent-embed`).
    Embedded,
}

/// The declared bounds of an embedded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: Fixed,
    pub y: Fixed,
    pub width: Fixed,
    pub height: Fixed,
}

/// The parsed source preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub kind: SourceKind,
    /// Present exactly for embedded sources.
    pub bounds: Option<Bounds>,
}

/// Parse the mandatory header and, for embedded sources, the bounds
/// meta-commands and the `@body` mark.
pub fn parse_preamble(scanner: &mut Scanner) -> Result<Preamble, Error> {
    expect(scanner, &Entity::BeginMeta)?;
    let kind = match next_meta_token(scanner)?.as_str() {
        "scent" => SourceKind::Document,
        "scent-embed" => SourceKind::Embedded,
        other => {
            return Err(Error::syntax(format![
                "unknown source kind `{other}`; expected `scent` or `scent-embed`"
            ])
            .at_line(scanner.line()))
        }
    };
    let version = next_meta_token(scanner)?;
    if version != "1.0" {
        return Err(Error::syntax(format![
            "unsupported version `{version}`; this compiler implements exactly 1.0"
        ])
        .at_line(scanner.line()));
    }
    expect(scanner, &Entity::EndMeta)?;
    let bounds = match kind {
        SourceKind::Document => None,
        SourceKind::Embedded => {
            let mut values = [Fixed::ZERO; 4];
            for (slot, name) in values
                .iter_mut()
                .zip(["bound-x", "bound-y", "bound-w", "bound-h"])
            {
                expect(scanner, &Entity::MetaCommand(name.into()))?;
                *slot = next_fixed(scanner)?;
            }
            expect(scanner, &Entity::MetaCommand("body".into()))?;
            let [x, y, width, height] = values;
            if !width.is_positive() || !height.is_positive() {
                return Err(Error::domain(
                    "embedded bounds must have positive width and height",
                )
                .at_line(scanner.line()));
            }
            Some(Bounds {
                x,
                y,
                width,
                height,
            })
        }
    };
    Ok(Preamble { kind, bounds })
}

fn next_entity(scanner: &mut Scanner) -> Result<Entity, Error> {
    match scanner.next()? {
        Some(entity) => Ok(entity),
        None => Err(Error::syntax("the source ends inside its preamble")
            .at_line(scanner.line())),
    }
}

fn expect(scanner: &mut Scanner, want: &Entity) -> Result<(), Error> {
    let got = next_entity(scanner)?;
    if got == *want {
        Ok(())
    } else {
        Err(Error::syntax(format![
            "malformed preamble: expected {:?}, got {:?}",
            want, got
        ])
        .at_line(scanner.line()))
    }
}

fn next_meta_token(scanner: &mut Scanner) -> Result<String, Error> {
    match next_entity(scanner)? {
        Entity::MetaToken(s) => Ok(s),
        other => Err(Error::syntax(format![
            "malformed preamble: expected a meta token, got {}",
            other.description()
        ])
        .at_line(scanner.line())),
    }
}

fn next_fixed(scanner: &mut Scanner) -> Result<Fixed, Error> {
    match next_entity(scanner)? {
        Entity::Fixed(f) => Ok(f),
        Entity::Integer(i) => {
            let i: i32 = i
                .try_into()
                .map_err(|_| Error::domain("bound value out of range"))?;
            Fixed::from_integer(i)
                .map_err(|_| Error::domain("bound value out of range").at_line(scanner.line()))
        }
        other => Err(Error::syntax(format![
            "expected a bound value, got {}",
            other.description()
        ])
        .at_line(scanner.line())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_preamble() {
        let mut scanner = Scanner::new("@{ scent 1.0 @} pop");
        let preamble = parse_preamble(&mut scanner).unwrap();
        assert_eq![
            preamble,
            Preamble {
                kind: SourceKind::Document,
                bounds: None
            }
        ];
        assert_eq![scanner.next().unwrap(), Some(Entity::Op("pop".into()))];
    }

    #[test]
    fn embedded_preamble() {
        let source = "@{ scent-embed 1.0 @}\n@bound-x 0 @bound-y 10.5 @bound-w 100 @bound-h 50\n@body";
        let mut scanner = Scanner::new(source);
        let preamble = parse_preamble(&mut scanner).unwrap();
        assert_eq![preamble.kind, SourceKind::Embedded];
        assert_eq![
            preamble.bounds,
            Some(Bounds {
                x: Fixed::ZERO,
                y: Fixed(1_050_000),
                width: Fixed(10_000_000),
                height: Fixed(5_000_000),
            })
        ];
    }

    macro_rules! preamble_error_tests {
        ( $( ($name: ident, $source: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                let mut scanner = Scanner::new($source);
                assert![parse_preamble(&mut scanner).is_err(), "expected an error"];
            }
            )+
        };
    }

    preamble_error_tests![
        (empty_source, ""),
        (missing_meta, "pop"),
        (wrong_kind, "@{ perfume 1.0 @}"),
        // Version comparison is textual and exact.
        (higher_version, "@{ scent 2.0 @}"),
        (padded_version, "@{ scent 1.00 @}"),
        (unclosed_header, "@{ scent 1.0"),
        (embed_missing_bounds, "@{ scent-embed 1.0 @} @body"),
        (
            embed_bounds_out_of_order,
            "@{ scent-embed 1.0 @} @bound-y 0 @bound-x 0 @bound-w 1 @bound-h 1 @body"
        ),
        (
            embed_zero_width,
            "@{ scent-embed 1.0 @} @bound-x 0 @bound-y 0 @bound-w 0 @bound-h 1 @body"
        ),
    ];
}
