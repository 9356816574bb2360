//! Parsing of Scent assembly text into [`Instruction`] values.

use crate::inst::*;
use crate::lexer::{self, Token};
use crate::Error;
use scent_core::{BuiltInFont, Cmyk, Fixed, Rotation};

/// Parse a single instruction line that has already been identified as
/// neither blank nor a comment.
pub fn parse_line(line: &str) -> Result<Instruction, Error> {
    let tokens = lexer::tokenize(line)?;
    let mut args = Args::new(tokens);
    let mut op = args.name()?;
    // `begin` and `end` form compound instruction names with the
    // following word.
    if op == "begin" || op == "end" {
        let second = args.name()?;
        op = format!["{op} {second}"];
    }
    let inst = match op.as_str() {
        "font_standard" => {
            let name = args.name()?;
            let family = args.name()?;
            let family = BuiltInFont::parse(&family).ok_or_else(|| {
                Error::domain(format!["`{family}` is not a built-in font"])
            })?;
            Instruction::FontStandard { name, family }
        }
        "font_file" => {
            let name = args.name()?;
            let format = args.name()?;
            if format != "truetype" {
                return Err(Error::domain(format![
                    "unsupported font format `{format}`; expected `truetype`"
                ]));
            }
            let path = args.string()?;
            Instruction::FontFile { name, path }
        }
        "image_jpeg" => Instruction::ImageJpeg {
            name: args.name()?,
            path: args.string()?,
        },
        "image_png" => Instruction::ImagePng {
            name: args.name()?,
            path: args.string()?,
        },
        "begin page" => Instruction::BeginPage,
        "end page" => Instruction::EndPage,
        "dim" => Instruction::Dim {
            width: args.number()?,
            height: args.number()?,
        },
        "art_box" => Instruction::ArtBox(args.box_corners()?),
        "trim_box" => Instruction::TrimBox(args.box_corners()?),
        "bleed_box" => Instruction::BleedBox(args.box_corners()?),
        "view_rotate" => {
            let degrees = args.integer()?;
            let rotation = Rotation::from_degrees(degrees).ok_or_else(|| {
                Error::domain(format![
                    "invalid rotation {degrees}; expected 0, 90, 180 or 270"
                ])
            })?;
            Instruction::ViewRotate(rotation)
        }
        "body" => Instruction::Body,
        "save" => Instruction::Save,
        "restore" => Instruction::Restore,
        "matrix" => {
            let mut m = [Fixed::ZERO; 6];
            for slot in &mut m {
                *slot = args.number()?;
            }
            Instruction::Matrix(m)
        }
        "line_width" => Instruction::LineWidth(args.number()?),
        "line_cap" => {
            let word = args.name()?;
            let cap = LineCap::parse(&word).ok_or_else(|| {
                Error::domain(format![
                    "invalid line cap `{word}`; expected butt, round or square"
                ])
            })?;
            Instruction::LineCap(cap)
        }
        "line_join" => {
            let word = args.name()?;
            let join = match word.as_str() {
                "miter" => LineJoin::Miter(args.number()?),
                "round" => LineJoin::Round,
                "bevel" => LineJoin::Bevel,
                _ => {
                    return Err(Error::domain(format![
                        "invalid line join `{word}`; expected miter, round or bevel"
                    ]))
                }
            };
            Instruction::LineJoin(join)
        }
        "line_dash" => {
            let phase = args.number()?;
            let mut dashes = vec![args.number()?, args.number()?];
            while !args.is_empty() {
                dashes.push(args.number()?);
            }
            if dashes.len() % 2 != 0 {
                return Err(Error::syntax(
                    "line_dash takes a phase followed by dash/gap pairs",
                ));
            }
            Instruction::LineDash { phase, dashes }
        }
        "line_undash" => Instruction::LineUndash,
        "stroke_color" => Instruction::StrokeColor(args.color()?),
        "fill_color" => Instruction::FillColor(args.color()?),
        "image" => Instruction::Image { name: args.name()? },
        "begin path" => {
            let stroke = match args.name_or_dash()? {
                None => false,
                Some(word) if word == "stroke" => true,
                Some(word) => {
                    return Err(Error::domain(format![
                        "invalid stroke flag `{word}`; expected stroke or -"
                    ]))
                }
            };
            Instruction::BeginPath {
                stroke,
                fill: args.paint_rule_or_dash()?,
                clip: args.paint_rule_or_dash()?,
            }
        }
        "end path" => Instruction::EndPath,
        "move" => Instruction::Move {
            x: args.number()?,
            y: args.number()?,
        },
        "line" => Instruction::Line {
            x: args.number()?,
            y: args.number()?,
        },
        "curve" => Instruction::Curve {
            x1: args.number()?,
            y1: args.number()?,
            x2: args.number()?,
            y2: args.number()?,
            x3: args.number()?,
            y3: args.number()?,
        },
        "close" => Instruction::Close,
        "rect" => Instruction::Rect {
            x: args.number()?,
            y: args.number()?,
            width: args.number()?,
            height: args.number()?,
        },
        "begin text" => {
            let clip = match args.name_or_dash()? {
                None => false,
                Some(word) if word == "clip" => true,
                Some(word) => {
                    return Err(Error::domain(format![
                        "invalid clip flag `{word}`; expected clip or -"
                    ]))
                }
            };
            Instruction::BeginText { clip }
        }
        "end text" => Instruction::EndText,
        "cspace" => Instruction::CharSpace(args.number()?),
        "wspace" => Instruction::WordSpace(args.number()?),
        "hscale" => Instruction::HScale(args.number()?),
        "lead" => Instruction::Lead(args.number()?),
        "font" => Instruction::Font {
            name: args.name()?,
            size: args.number()?,
        },
        "text_render" => {
            let mode = args.integer()?;
            let mode: u8 = mode.try_into().map_err(|_| {
                Error::domain(format!["invalid text render mode {mode}"])
            })?;
            Instruction::TextRender(mode)
        }
        "rise" => Instruction::Rise(args.number()?),
        "advance" => {
            if args.is_empty() {
                Instruction::Advance(None)
            } else {
                Instruction::Advance(Some((args.number()?, args.number()?)))
            }
        }
        "write" => Instruction::Write(args.string()?),
        _ => return Err(Error::syntax(format!["unknown instruction `{op}`"])),
    };
    args.end()?;
    Ok(inst)
}

/// Argument cursor over the tokens of one line.
struct Args {
    tokens: std::vec::IntoIter<Token>,
}

impl Args {
    fn new(tokens: Vec<Token>) -> Args {
        Args {
            tokens: tokens.into_iter(),
        }
    }

    fn is_empty(&self) -> bool {
        self.tokens.as_slice().is_empty()
    }

    fn next(&mut self) -> Result<Token, Error> {
        self.tokens
            .next()
            .ok_or_else(|| Error::syntax("missing argument"))
    }

    fn name(&mut self) -> Result<String, Error> {
        match self.next()? {
            Token::Name(s) => Ok(s),
            other => Err(wrong_class("a name", &other)),
        }
    }

    fn number(&mut self) -> Result<Fixed, Error> {
        match self.next()? {
            Token::Number(n) => Ok(n),
            other => Err(wrong_class("a number", &other)),
        }
    }

    /// A number that must be integral, returned as an i32.
    fn integer(&mut self) -> Result<i32, Error> {
        let n = self.number()?;
        if n.0 % scent_core::FIXED_SCALE != 0 {
            return Err(Error::domain(format!["expected an integer, got {n}"]));
        }
        Ok((n.0 / scent_core::FIXED_SCALE) as i32)
    }

    fn string(&mut self) -> Result<String, Error> {
        match self.next()? {
            Token::Str(s) => Ok(s),
            other => Err(wrong_class("a string", &other)),
        }
    }

    fn color(&mut self) -> Result<Cmyk, Error> {
        match self.next()? {
            Token::Color(c) => Ok(c),
            other => Err(wrong_class("a colour", &other)),
        }
    }

    /// A name, or [None] for a dash.
    fn name_or_dash(&mut self) -> Result<Option<String>, Error> {
        match self.next()? {
            Token::Dash => Ok(None),
            Token::Name(s) => Ok(Some(s)),
            other => Err(wrong_class("a name or a dash", &other)),
        }
    }

    fn paint_rule_or_dash(&mut self) -> Result<Option<PaintRule>, Error> {
        match self.name_or_dash()? {
            None => Ok(None),
            Some(word) => match PaintRule::parse(&word) {
                Some(rule) => Ok(Some(rule)),
                None => Err(Error::domain(format![
                    "invalid paint rule `{word}`; expected nonzero, evenodd or -"
                ])),
            },
        }
    }

    fn box_corners(&mut self) -> Result<BoxCorners, Error> {
        Ok(BoxCorners {
            x0: self.number()?,
            y0: self.number()?,
            x1: self.number()?,
            y1: self.number()?,
        })
    }

    fn end(mut self) -> Result<(), Error> {
        match self.tokens.next() {
            None => Ok(()),
            Some(extra) => Err(Error::syntax(format![
                "unexpected extra argument ({})",
                extra.description()
            ])),
        }
    }
}

fn wrong_class(wanted: &str, got: &Token) -> Error {
    Error::syntax(format!["expected {wanted}, got {}", got.description()])
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! parse_tests {
        ( $( ($name: ident, $input: expr, $want: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                assert_eq![parse_line($input), Ok($want)];
            }
            )+
        };
    }

    parse_tests![
        (begin_page, "begin page", Instruction::BeginPage),
        (
            dim,
            "dim 100 200.5",
            Instruction::Dim {
                width: Fixed(10_000_000),
                height: Fixed(20_050_000),
            }
        ),
        (
            font_standard,
            "font_standard F1 Helvetica-Bold",
            Instruction::FontStandard {
                name: "F1".into(),
                family: BuiltInFont::HelveticaBold,
            }
        ),
        (
            font_file,
            r#"font_file F2 truetype "fonts/a.ttf""#,
            Instruction::FontFile {
                name: "F2".into(),
                path: "fonts/a.ttf".into(),
            }
        ),
        (
            begin_path_all_absent_but_clip,
            "begin path - - evenodd",
            Instruction::BeginPath {
                stroke: false,
                fill: None,
                clip: Some(PaintRule::EvenOdd),
            }
        ),
        (
            line_join_miter,
            "line_join miter 3.8637",
            Instruction::LineJoin(LineJoin::Miter(Fixed(386_370)))
        ),
        (
            line_dash,
            "line_dash 0 3 2",
            Instruction::LineDash {
                phase: Fixed::ZERO,
                dashes: vec![Fixed(300_000), Fixed(200_000)],
            }
        ),
        (
            view_rotate,
            "view_rotate 90",
            Instruction::ViewRotate(Rotation::Quarter)
        ),
        (advance_bare, "advance", Instruction::Advance(None)),
        (
            advance_pair,
            "advance 10 -12",
            Instruction::Advance(Some((Fixed(1_000_000), Fixed(-1_200_000))))
        ),
        (
            write,
            r#"write "x""#,
            Instruction::Write("x".into())
        ),
    ];

    macro_rules! parse_error_tests {
        ( $( ($name: ident, $input: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                assert![parse_line($input).is_err(), "expected an error"];
            }
            )+
        };
    }

    parse_error_tests![
        (unknown_instruction, "pagebreak"),
        (unknown_compound, "begin everything"),
        (missing_argument, "dim 100"),
        (extra_argument, "body 1"),
        (line_join_miter_without_limit, "line_join miter"),
        (line_join_round_with_limit, "line_join round 2"),
        (line_dash_even_arity, "line_dash 0 3 2 1"),
        (line_dash_too_short, "line_dash 0 3"),
        (bad_rotation, "view_rotate 45"),
        (fractional_rotation, "view_rotate 90.5"),
        (unknown_font_format, r#"font_file F1 opentype "a.otf""#),
        (begin_path_bad_rule, "begin path stroke wavy -"),
        (write_takes_a_string, "write hello"),
    ];
}
