//! Builders for the incrementally constructed object kinds.
//!
//! A builder lives in the evaluator's accumulator register between its
//! `start_*` and `finish_*` operations. Each setter *replaces* the field
//! it sets; completeness and consistency are checked once, at finish.
//! The same builders back the dictionary-style construction operations,
//! which simply apply a dictionary's entries as setters before
//! finishing.

use crate::error::Error;
use crate::value::*;
use scent_core::{Fixed, Rotation};
use std::rc::Rc;

/// Which construction dialect a source has committed to.
///
/// A header of `scent` leaves the dialect open until the first
/// dialect-specific operation runs; `scent-embed` sources are always
/// incremental.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Single-operation construction from dictionaries.
    Dictionary,
    /// Accumulator-based incremental construction.
    Incremental,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Dialect::Dictionary => "dictionary-style",
            Dialect::Incremental => "incremental",
        })
    }
}

/// An in-progress ream.
#[derive(Debug, Default, Clone)]
pub struct ReamBuilder {
    dim: Option<(Fixed, Fixed)>,
    rotation: Option<Rotation>,
    art: Option<Margins>,
    trim: Option<Margins>,
    bleed: Option<Margins>,
}

/// The boundary boxes a ream can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    Art,
    Trim,
    Bleed,
}

impl BoxKind {
    pub fn from_atom(name: &str) -> Option<BoxKind> {
        Some(match name {
            "ArtBox" => BoxKind::Art,
            "TrimBox" => BoxKind::Trim,
            "BleedBox" => BoxKind::Bleed,
            _ => return None,
        })
    }
}

impl ReamBuilder {
    pub fn from_ream(ream: &Ream) -> ReamBuilder {
        ReamBuilder {
            dim: Some((ream.width, ream.height)),
            rotation: Some(ream.rotation),
            art: ream.art,
            trim: ream.trim,
            bleed: ream.bleed,
        }
    }

    pub fn set_dim(&mut self, width: Fixed, height: Fixed) -> Result<(), Error> {
        if !width.is_positive() || !height.is_positive() {
            return Err(Error::domain("paper dimensions must be positive"));
        }
        self.dim = Some((width, height));
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = Some(rotation);
    }

    pub fn set_box(&mut self, kind: BoxKind, margins: Margins) -> Result<(), Error> {
        for m in [margins.left, margins.top, margins.right, margins.bottom] {
            if !m.is_positive() {
                return Err(Error::domain("box margins must be positive"));
            }
        }
        *self.slot(kind) = Some(margins);
        Ok(())
    }

    pub fn unset_box(&mut self, kind: BoxKind) {
        *self.slot(kind) = None;
    }

    fn slot(&mut self, kind: BoxKind) -> &mut Option<Margins> {
        match kind {
            BoxKind::Art => &mut self.art,
            BoxKind::Trim => &mut self.trim,
            BoxKind::Bleed => &mut self.bleed,
        }
    }

    /// Validate and complete the ream.
    ///
    /// The box rules differ per dialect: dictionary-style construction
    /// wants at least one of the art and trim boxes and allows both,
    /// with every art/trim margin strictly larger than the matching
    /// bleed margin when a bleed box is present; incremental
    /// construction wants exactly one of art and trim.
    pub fn finish(&self, dialect: Dialect) -> Result<Ream, Error> {
        let (width, height) = match self.dim {
            None => return Err(Error::state("the ream has no dimensions")),
            Some(dim) => dim,
        };
        match dialect {
            Dialect::Dictionary => {
                if self.art.is_none() && self.trim.is_none() {
                    return Err(Error::domain(
                        "a ream needs an art box or a trim box",
                    ));
                }
            }
            Dialect::Incremental => match (self.art, self.trim) {
                (None, None) => {
                    return Err(Error::domain(
                        "a ream needs an art box or a trim box",
                    ))
                }
                (Some(_), Some(_)) => {
                    return Err(Error::domain(
                        "a ream cannot have both an art box and a trim box",
                    ))
                }
                _ => (),
            },
        }
        for margins in [self.art, self.trim, self.bleed].into_iter().flatten() {
            if margins.left.0 + margins.right.0 >= width.0 {
                return Err(Error::domain(
                    "the left and right margins leave no box width",
                ));
            }
            if margins.top.0 + margins.bottom.0 >= height.0 {
                return Err(Error::domain(
                    "the top and bottom margins leave no box height",
                ));
            }
        }
        if dialect == Dialect::Dictionary {
            if let Some(bleed) = self.bleed {
                for inner in [self.art, self.trim].into_iter().flatten() {
                    let contained = inner.left > bleed.left
                        && inner.top > bleed.top
                        && inner.right > bleed.right
                        && inner.bottom > bleed.bottom;
                    if !contained {
                        return Err(Error::domain(
                            "art and trim margins must exceed the bleed margins",
                        ));
                    }
                }
            }
        }
        Ok(Ream {
            width,
            height,
            rotation: self.rotation.unwrap_or_default(),
            art: self.art,
            trim: self.trim,
            bleed: self.bleed,
        })
    }
}

/// An in-progress stroke.
#[derive(Debug, Default, Clone)]
pub struct StrokeBuilder {
    color: Option<scent_core::Cmyk>,
    width: Option<Fixed>,
    cap: Option<Cap>,
    join: Option<Join>,
    dash: Option<DashPattern>,
}

impl StrokeBuilder {
    pub fn from_stroke(stroke: &Stroke) -> StrokeBuilder {
        StrokeBuilder {
            color: Some(stroke.color),
            width: Some(stroke.width),
            cap: Some(stroke.cap),
            join: Some(stroke.join),
            dash: Some(stroke.dash.clone()),
        }
    }

    pub fn set_color(&mut self, color: scent_core::Cmyk) {
        self.color = Some(color);
    }

    pub fn set_width(&mut self, width: Fixed) -> Result<(), Error> {
        if !width.is_positive() {
            return Err(Error::domain("the stroke width must be positive"));
        }
        self.width = Some(width);
        Ok(())
    }

    pub fn set_cap(&mut self, cap: Cap) {
        self.cap = Some(cap);
    }

    pub fn set_join(&mut self, join: Join) -> Result<(), Error> {
        if let Join::Miter(limit) = join {
            if !limit.is_positive() {
                return Err(Error::domain("the miter limit must be positive"));
            }
        }
        self.join = Some(join);
        Ok(())
    }

    pub fn set_dash(&mut self, dash: DashPattern) {
        self.dash = Some(dash);
    }

    pub fn clear_dash(&mut self) {
        self.dash = Some(DashPattern::default());
    }

    pub fn finish(&self) -> Result<Stroke, Error> {
        let color = match self.color {
            None => return Err(Error::state("the stroke has no colour")),
            Some(color) => color,
        };
        let width = match self.width {
            None => return Err(Error::state("the stroke has no width")),
            Some(width) => width,
        };
        Ok(Stroke {
            color,
            width,
            cap: self.cap.unwrap_or(Cap::Butt),
            // The miter limit of 10 matches the PDF graphics state
            // default.
            join: self.join.unwrap_or(Join::Miter(Fixed(10 * scent_core::FIXED_SCALE))),
            dash: self.dash.clone().unwrap_or_default(),
        })
    }
}

/// An in-progress path.
#[derive(Debug, Default, Clone)]
pub struct PathBuilder {
    subpaths: Vec<Subpath>,
    open: Option<OpenMotion>,
}

#[derive(Debug, Clone)]
struct OpenMotion {
    start: Point,
    segments: Vec<Segment>,
}

impl PathBuilder {
    pub fn start_motion(&mut self, start: Point) -> Result<(), Error> {
        if self.open.is_some() {
            return Err(Error::state("a motion is already open"));
        }
        self.open = Some(OpenMotion {
            start,
            segments: Vec::new(),
        });
        Ok(())
    }

    pub fn add_segment(&mut self, segment: Segment) -> Result<(), Error> {
        match &mut self.open {
            None => Err(Error::state("no motion is open")),
            Some(motion) => {
                motion.segments.push(segment);
                Ok(())
            }
        }
    }

    pub fn finish_motion(&mut self, closed: bool) -> Result<(), Error> {
        match self.open.take() {
            None => Err(Error::state("no motion is open")),
            Some(motion) if motion.segments.is_empty() => {
                // Put the motion back so the error does not lose state.
                self.open = Some(motion);
                Err(Error::state("the open motion has no segments"))
            }
            Some(motion) => {
                self.subpaths.push(Subpath::Motion {
                    start: motion.start,
                    segments: motion.segments,
                    closed,
                });
                Ok(())
            }
        }
    }

    pub fn add_rect(&mut self, corner: Point, width: Fixed, height: Fixed) -> Result<(), Error> {
        if self.open.is_some() {
            return Err(Error::state("a motion is open"));
        }
        if !width.is_positive() || !height.is_positive() {
            return Err(Error::domain("rectangle sides must be positive"));
        }
        self.subpaths.push(Subpath::Rect {
            corner,
            width,
            height,
        });
        Ok(())
    }

    pub fn include(&mut self, path: &Path) -> Result<(), Error> {
        if self.open.is_some() {
            return Err(Error::state("a motion is open"));
        }
        self.subpaths.extend(path.subpaths.iter().cloned());
        Ok(())
    }

    pub fn finish(self, rule: FillRule) -> Result<Path, Error> {
        if self.open.is_some() {
            return Err(Error::state("the last motion was never finished"));
        }
        if self.subpaths.is_empty() {
            return Err(Error::state("the path has no subpaths"));
        }
        Ok(Path {
            subpaths: self.subpaths,
            rule,
        })
    }
}

/// An in-progress style.
#[derive(Debug, Default, Clone)]
pub struct StyleBuilder {
    font: Option<Rc<Font>>,
    size: Option<Fixed>,
    char_space: Option<Fixed>,
    word_space: Option<Fixed>,
    h_scale: Option<Fixed>,
    rise: Option<Fixed>,
    stroke: Option<Option<Rc<Stroke>>>,
    fill: Option<Option<scent_core::Cmyk>>,
}

impl StyleBuilder {
    pub fn from_style(style: &Style) -> StyleBuilder {
        StyleBuilder {
            font: Some(style.font.clone()),
            size: Some(style.size),
            char_space: Some(style.char_space),
            word_space: Some(style.word_space),
            h_scale: Some(style.h_scale),
            rise: Some(style.rise),
            stroke: Some(style.stroke.clone()),
            fill: Some(style.fill),
        }
    }

    pub fn set_font(&mut self, font: Rc<Font>) {
        self.font = Some(font);
    }

    pub fn set_size(&mut self, size: Fixed) -> Result<(), Error> {
        if !size.is_positive() {
            return Err(Error::domain("the font size must be positive"));
        }
        self.size = Some(size);
        Ok(())
    }

    pub fn set_char_space(&mut self, space: Fixed) -> Result<(), Error> {
        if space.is_negative() {
            return Err(Error::domain("character spacing must not be negative"));
        }
        self.char_space = Some(space);
        Ok(())
    }

    pub fn set_word_space(&mut self, space: Fixed) -> Result<(), Error> {
        if space.is_negative() {
            return Err(Error::domain("word spacing must not be negative"));
        }
        self.word_space = Some(space);
        Ok(())
    }

    pub fn set_h_scale(&mut self, scale: Fixed) -> Result<(), Error> {
        if !scale.is_positive() {
            return Err(Error::domain("the horizontal scale must be positive"));
        }
        self.h_scale = Some(scale);
        Ok(())
    }

    pub fn set_rise(&mut self, rise: Fixed) {
        self.rise = Some(rise);
    }

    pub fn set_stroke(&mut self, stroke: Option<Rc<Stroke>>) {
        self.stroke = Some(stroke);
    }

    pub fn set_fill(&mut self, fill: Option<scent_core::Cmyk>) {
        self.fill = Some(fill);
    }

    pub fn finish(self) -> Result<Style, Error> {
        let font = match self.font {
            None => return Err(Error::state("the style has no font")),
            Some(font) => font,
        };
        let size = match self.size {
            None => return Err(Error::state("the style has no size")),
            Some(size) => size,
        };
        Ok(Style {
            font,
            size,
            char_space: self.char_space.unwrap_or(Fixed::ZERO),
            word_space: self.word_space.unwrap_or(Fixed::ZERO),
            h_scale: self.h_scale.unwrap_or(Fixed::ONE),
            rise: self.rise.unwrap_or(Fixed::ZERO),
            stroke: self.stroke.unwrap_or(None),
            fill: self.fill.unwrap_or(None),
        })
    }
}

/// An in-progress column.
#[derive(Debug, Default, Clone)]
pub struct ColumnBuilder {
    lines: Vec<Line>,
    open: Option<Line>,
}

impl ColumnBuilder {
    pub fn start_line(&mut self, start: Point) -> Result<(), Error> {
        if self.open.is_some() {
            return Err(Error::state("a line is already open"));
        }
        self.open = Some(Line {
            start,
            spans: Vec::new(),
        });
        Ok(())
    }

    pub fn add_span(&mut self, span: Span) -> Result<(), Error> {
        match &mut self.open {
            None => Err(Error::state("no line is open")),
            Some(line) => {
                line.spans.push(span);
                Ok(())
            }
        }
    }

    pub fn finish_line(&mut self) -> Result<(), Error> {
        match self.open.take() {
            None => Err(Error::state("no line is open")),
            Some(line) if line.spans.is_empty() => {
                self.open = Some(line);
                Err(Error::state("the open line has no spans"))
            }
            Some(line) => {
                self.lines.push(line);
                Ok(())
            }
        }
    }

    pub fn finish(self) -> Result<Column, Error> {
        if self.open.is_some() {
            return Err(Error::state("the last line was never finished"));
        }
        if self.lines.is_empty() {
            return Err(Error::state("the column has no lines"));
        }
        Ok(Column { lines: self.lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scent_core::ErrorKind;

    fn margins(left: i64, top: i64, right: i64, bottom: i64) -> Margins {
        let f = |v: i64| Fixed(v * scent_core::FIXED_SCALE);
        Margins {
            left: f(left),
            top: f(top),
            right: f(right),
            bottom: f(bottom),
        }
    }

    fn a4_builder() -> ReamBuilder {
        let mut builder = ReamBuilder::default();
        builder
            .set_dim(Fixed(59_527_559), Fixed(84_188_976))
            .unwrap();
        builder
    }

    #[test]
    fn ream_with_art_box() {
        let mut builder = a4_builder();
        builder
            .set_box(BoxKind::Art, margins(36, 36, 36, 36))
            .unwrap();
        builder.set_rotation(Rotation::None);
        let ream = builder.finish(Dialect::Incremental).unwrap();
        assert_eq![ream.art, Some(margins(36, 36, 36, 36))];
        assert_eq![ream.trim, None];
    }

    #[test]
    fn ream_margins_must_leave_width() {
        // Left margin 595 on a 595.27559-wide page: 595 + 36 exceeds
        // the width, so completion fails.
        let mut builder = a4_builder();
        builder
            .set_box(BoxKind::Art, margins(595, 36, 36, 36))
            .unwrap();
        let err = builder.finish(Dialect::Incremental).unwrap_err();
        assert_eq![err.kind, ErrorKind::Domain];
    }

    #[test]
    fn ream_box_rules_differ_per_dialect() {
        let mut builder = a4_builder();
        builder
            .set_box(BoxKind::Art, margins(40, 40, 40, 40))
            .unwrap();
        builder
            .set_box(BoxKind::Trim, margins(42, 42, 42, 42))
            .unwrap();
        assert![builder.finish(Dialect::Dictionary).is_ok()];
        assert_eq![
            builder.finish(Dialect::Incremental).unwrap_err().kind,
            ErrorKind::Domain
        ];
    }

    #[test]
    fn dictionary_ream_requires_bleed_containment() {
        let mut builder = a4_builder();
        builder
            .set_box(BoxKind::Art, margins(36, 36, 36, 36))
            .unwrap();
        builder
            .set_box(BoxKind::Bleed, margins(36, 18, 18, 18))
            .unwrap();
        // The art box's left margin equals the bleed margin, which is
        // not strictly larger.
        assert_eq![
            builder.finish(Dialect::Dictionary).unwrap_err().kind,
            ErrorKind::Domain
        ];
        builder
            .set_box(BoxKind::Bleed, margins(18, 18, 18, 18))
            .unwrap();
        assert![builder.finish(Dialect::Dictionary).is_ok()];
    }

    #[test]
    fn ream_requires_some_box() {
        let builder = a4_builder();
        assert_eq![
            builder.finish(Dialect::Incremental).unwrap_err().kind,
            ErrorKind::Domain
        ];
    }

    #[test]
    fn ream_unbound_removes_a_box() {
        let mut builder = a4_builder();
        builder
            .set_box(BoxKind::Art, margins(36, 36, 36, 36))
            .unwrap();
        builder
            .set_box(BoxKind::Trim, margins(40, 40, 40, 40))
            .unwrap();
        builder.unset_box(BoxKind::Trim);
        assert![builder.finish(Dialect::Incremental).is_ok()];
    }

    #[test]
    fn stroke_defaults() {
        let mut builder = StrokeBuilder::default();
        builder.set_color(scent_core::Cmyk {
            cyan: 0,
            magenta: 0,
            yellow: 0,
            black: 255,
        });
        builder.set_width(Fixed::ONE).unwrap();
        let stroke = builder.finish().unwrap();
        assert_eq![stroke.cap, Cap::Butt];
        assert_eq![stroke.join, Join::Miter(Fixed(1_000_000))];
        assert![stroke.dash.dashes.is_empty()];
    }

    #[test]
    fn stroke_requires_color_and_width() {
        let builder = StrokeBuilder::default();
        assert_eq![builder.finish().unwrap_err().kind, ErrorKind::State];
    }

    #[test]
    fn path_motion_lifecycle() {
        let p = |x: i64, y: i64| Point {
            x: Fixed(x * scent_core::FIXED_SCALE),
            y: Fixed(y * scent_core::FIXED_SCALE),
        };
        let mut builder = PathBuilder::default();
        // A segment before any motion is a state error.
        assert_eq![
            builder.add_segment(Segment::Line(p(1, 1))).unwrap_err().kind,
            ErrorKind::State
        ];
        builder.start_motion(p(0, 0)).unwrap();
        // An empty motion cannot be finished.
        assert_eq![builder.clone().finish_motion(false).unwrap_err().kind, ErrorKind::State];
        builder.add_segment(Segment::Line(p(10, 0))).unwrap();
        builder.add_segment(Segment::Line(p(10, 10))).unwrap();
        builder.finish_motion(true).unwrap();
        // A second subpath is allowed after the first is finished.
        builder.add_rect(p(20, 20), Fixed::ONE, Fixed::ONE).unwrap();
        let path = builder.finish(FillRule::Nonzero).unwrap();
        assert_eq![path.subpaths.len(), 2];
    }

    #[test]
    fn path_cannot_finish_with_open_motion() {
        let mut builder = PathBuilder::default();
        builder
            .start_motion(Point {
                x: Fixed::ZERO,
                y: Fixed::ZERO,
            })
            .unwrap();
        assert_eq![
            builder.finish(FillRule::Null).unwrap_err().kind,
            ErrorKind::State
        ];
    }

    #[test]
    fn empty_path_is_rejected() {
        let builder = PathBuilder::default();
        assert_eq![
            builder.finish(FillRule::Nonzero).unwrap_err().kind,
            ErrorKind::State
        ];
    }

    #[test]
    fn style_defaults() {
        let mut builder = StyleBuilder::default();
        builder.set_font(Rc::new(Font::BuiltIn(
            scent_core::BuiltInFont::Helvetica,
        )));
        builder.set_size(Fixed(12 * scent_core::FIXED_SCALE)).unwrap();
        let style = builder.finish().unwrap();
        assert_eq![style.char_space, Fixed::ZERO];
        assert_eq![style.h_scale, Fixed::ONE];
        assert![style.stroke.is_none()];
        assert![style.fill.is_none()];
    }

    #[test]
    fn column_lifecycle() {
        let mut builder = ColumnBuilder::default();
        assert_eq![builder.finish_line().unwrap_err().kind, ErrorKind::State];
        builder
            .start_line(Point {
                x: Fixed::ZERO,
                y: Fixed::ZERO,
            })
            .unwrap();
        // A line with no spans cannot be finished.
        assert_eq![builder.finish_line().unwrap_err().kind, ErrorKind::State];
    }
}
