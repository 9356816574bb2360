//! Lowering of drawing operations into assembly instructions.
//!
//! The lowering is deterministic and order preserving. Every drawing is
//! wrapped in a `save`/`restore` pair; its transform is applied first,
//! then the clipping components (each projected through its component
//! transform and undone through the inverse), then the shape itself.
//! Text columns become one text block with per-span parameter changes,
//! relying on the text cursor for positioning within a line.

use crate::error::Error;
use crate::token::Bounds;
use crate::value::*;
use crate::vm::Vm;
use scent_asm::{Assembler, BoxCorners, Instruction, LineCap, LineJoin, PaintRule};
use scent_core::{Cmyk, Fixed};

const BLACK: Cmyk = Cmyk {
    cyan: 0,
    magenta: 0,
    yellow: 0,
    black: 255,
};

/// The factor fake small capitals shrink lowercase runs by.
const SMALL_CAPS_FACTOR: f64 = 0.8;

impl<'s, A: Assembler> Vm<'s, A> {
    pub(crate) fn lower_begin_page(&mut self, ream: &Ream) -> Result<(), Error> {
        self.emit(Instruction::BeginPage)?;
        self.emit(Instruction::Dim {
            width: ream.width,
            height: ream.height,
        })?;
        for (kind, margins) in [
            (BoundaryKind::Art, ream.art),
            (BoundaryKind::Trim, ream.trim),
            (BoundaryKind::Bleed, ream.bleed),
        ] {
            let margins = match margins {
                None => continue,
                Some(margins) => margins,
            };
            let corners = corners_from_margins(ream, margins)?;
            self.emit(match kind {
                BoundaryKind::Art => Instruction::ArtBox(corners),
                BoundaryKind::Trim => Instruction::TrimBox(corners),
                BoundaryKind::Bleed => Instruction::BleedBox(corners),
            })?;
        }
        if ream.rotation != scent_core::Rotation::None {
            self.emit(Instruction::ViewRotate(ream.rotation))?;
        }
        self.emit(Instruction::Body)
    }

    pub(crate) fn lower_end_page(&mut self) -> Result<(), Error> {
        self.emit(Instruction::EndPage)
    }

    pub(crate) fn lower_draw_path(
        &mut self,
        path: &Path,
        transform: &Transform,
        stroke: Option<&Stroke>,
        fill: Option<Cmyk>,
        clipping: Option<&Clipping>,
    ) -> Result<(), Error> {
        self.ensure_clipping_fonts(clipping)?;
        self.emit(Instruction::Save)?;
        self.emit_matrix(transform)?;
        if let Some(clipping) = clipping {
            self.emit_clipping(clipping)?;
        }
        if let Some(stroke) = stroke {
            self.emit_stroke_state(stroke)?;
        }
        if let Some(fill) = fill {
            self.emit(Instruction::FillColor(fill))?;
        }
        self.emit(Instruction::BeginPath {
            stroke: stroke.is_some(),
            fill: fill.map(|_| paint_rule(path.rule)),
            clip: None,
        })?;
        self.emit_path_body(path)?;
        self.emit(Instruction::EndPath)?;
        self.emit(Instruction::Restore)
    }

    pub(crate) fn lower_draw_text(
        &mut self,
        column: &Column,
        transform: &Transform,
        clipping: Option<&Clipping>,
    ) -> Result<(), Error> {
        self.ensure_clipping_fonts(clipping)?;
        self.ensure_column_fonts(column)?;
        self.emit(Instruction::Save)?;
        self.emit_matrix(transform)?;
        if let Some(clipping) = clipping {
            self.emit_clipping(clipping)?;
        }
        self.emit_column(column, false)?;
        self.emit(Instruction::Restore)
    }

    pub(crate) fn lower_draw_image(
        &mut self,
        image: &Image,
        transform: &Transform,
        clipping: Option<&Clipping>,
    ) -> Result<(), Error> {
        self.ensure_clipping_fonts(clipping)?;
        self.emit(Instruction::Save)?;
        self.emit_matrix(transform)?;
        if let Some(clipping) = clipping {
            self.emit_clipping(clipping)?;
        }
        self.emit(Instruction::Image {
            name: image.asm_name.clone(),
        })?;
        self.emit(Instruction::Restore)
    }

    pub(crate) fn lower_embed_prologue(
        &mut self,
        transform: &Transform,
        clipping: Option<&Clipping>,
        bounds: &Bounds,
    ) -> Result<(), Error> {
        self.ensure_clipping_fonts(clipping)?;
        self.emit(Instruction::Save)?;
        self.emit_matrix(transform)?;
        if let Some(clipping) = clipping {
            self.emit_clipping(clipping)?;
        }
        self.emit(Instruction::BeginPath {
            stroke: false,
            fill: None,
            clip: Some(PaintRule::Nonzero),
        })?;
        self.emit(Instruction::Rect {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
        })?;
        self.emit(Instruction::EndPath)
    }

    pub(crate) fn lower_embed_epilogue(&mut self) -> Result<(), Error> {
        self.emit(Instruction::Restore)
    }

    // ------------------------------------------------------------------

    fn emit(&mut self, instruction: Instruction) -> Result<(), Error> {
        self.machine.execute(&instruction)?;
        Ok(())
    }

    fn emit_matrix(&mut self, transform: &Transform) -> Result<(), Error> {
        let m = matrix_coefficients(transform)?;
        self.emit(Instruction::Matrix(m))
    }

    /// Establish a clipping region: each component is projected through
    /// its transform, emitted as a clip-only shape, and the transform is
    /// undone through its inverse so the next component starts clean.
    fn emit_clipping(&mut self, clipping: &Clipping) -> Result<(), Error> {
        for component in &clipping.components {
            let inverse = component.transform.invert().ok_or_else(|| {
                Error::domain("a clip component transform is not invertible")
            })?;
            let forward = matrix_coefficients(&component.transform)?;
            let backward = matrix_coefficients(&inverse)?;
            self.emit(Instruction::Matrix(forward))?;
            match &component.shape {
                ClipShape::Path(path) => {
                    self.emit(Instruction::BeginPath {
                        stroke: false,
                        fill: None,
                        clip: Some(paint_rule(path.rule)),
                    })?;
                    self.emit_path_body(path)?;
                    self.emit(Instruction::EndPath)?;
                }
                ClipShape::Column(column) => {
                    self.emit_column(column, true)?;
                }
            }
            self.emit(Instruction::Matrix(backward))?;
        }
        Ok(())
    }

    fn emit_path_body(&mut self, path: &Path) -> Result<(), Error> {
        for subpath in &path.subpaths {
            match subpath {
                Subpath::Rect {
                    corner,
                    width,
                    height,
                } => {
                    self.emit(Instruction::Rect {
                        x: corner.x,
                        y: corner.y,
                        width: *width,
                        height: *height,
                    })?;
                }
                Subpath::Motion {
                    start,
                    segments,
                    closed,
                } => {
                    self.emit(Instruction::Move {
                        x: start.x,
                        y: start.y,
                    })?;
                    for segment in segments {
                        match segment {
                            Segment::Line(p) => {
                                self.emit(Instruction::Line { x: p.x, y: p.y })?
                            }
                            Segment::Cubic(p2, p3, p4) => self.emit(Instruction::Curve {
                                x1: p2.x,
                                y1: p2.y,
                                x2: p3.x,
                                y2: p3.y,
                                x3: p4.x,
                                y3: p4.y,
                            })?,
                        }
                    }
                    if *closed {
                        self.emit(Instruction::Close)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn emit_stroke_state(&mut self, stroke: &Stroke) -> Result<(), Error> {
        self.emit(Instruction::LineWidth(stroke.width))?;
        self.emit(Instruction::LineCap(match stroke.cap {
            Cap::Butt => LineCap::Butt,
            Cap::Round => LineCap::Round,
            Cap::Square => LineCap::Square,
        }))?;
        self.emit(Instruction::LineJoin(match stroke.join {
            Join::Miter(limit) => LineJoin::Miter(limit),
            Join::Round => LineJoin::Round,
            Join::Bevel => LineJoin::Bevel,
        }))?;
        if stroke.dash.dashes.is_empty() {
            self.emit(Instruction::LineUndash)?;
        } else {
            // The one-element form is only expressible at the language
            // level; on the wire it becomes an equal on/off pair.
            let mut dashes = stroke.dash.dashes.clone();
            if dashes.len() == 1 {
                dashes.push(dashes[0]);
            }
            self.emit(Instruction::LineDash {
                phase: stroke.dash.phase,
                dashes,
            })?;
        }
        self.emit(Instruction::StrokeColor(stroke.color))
    }

    /// Emit a column as one text block. In clip mode the block is opened
    /// with the clip flag, every span renders in mode 7, and paint state
    /// is skipped entirely.
    fn emit_column(&mut self, column: &Column, clip_only: bool) -> Result<(), Error> {
        self.emit(Instruction::BeginText { clip: clip_only })?;
        let mut previous: Option<Point> = None;
        for line in &column.lines {
            let (dx, dy) = match previous {
                None => (line.start.x, line.start.y),
                Some(p) => (
                    line.start
                        .x
                        .checked_sub(p.x)
                        .map_err(|_| baseline_overflow())?,
                    line.start
                        .y
                        .checked_sub(p.y)
                        .map_err(|_| baseline_overflow())?,
                ),
            };
            self.emit(Instruction::Advance(Some((dx, dy))))?;
            previous = Some(line.start);
            for span in &line.spans {
                self.emit_span(span, clip_only)?;
            }
        }
        self.emit(Instruction::EndText)
    }

    fn emit_span(&mut self, span: &Span, clip_only: bool) -> Result<(), Error> {
        let style = &span.style;
        let alterations = style.font.alterations();
        if alterations.oblique.is_some() {
            return Err(Error::domain(
                "oblique font alterations cannot be expressed in the assembly output",
            ));
        }
        let font_name = self.resolved_font_name(&style.font)?;
        let char_space = match alterations.char_spacing {
            None => style.char_space,
            Some(extra) => style
                .char_space
                .checked_add(extra)
                .map_err(|_| Error::domain("character spacing overflows"))?,
        };
        let h_scale = match alterations.h_scale {
            None => style.h_scale,
            Some(factor) => product(style.h_scale, factor)?,
        };
        self.emit(Instruction::CharSpace(char_space))?;
        self.emit(Instruction::WordSpace(style.word_space))?;
        self.emit(Instruction::HScale(h_scale))?;
        self.emit(Instruction::Rise(style.rise))?;
        let mut stroking = false;
        let mut filling = false;
        if !clip_only {
            if let Some(stroke) = &style.stroke {
                self.emit_stroke_state(stroke)?;
                stroking = true;
            } else if let Some(boldness) = alterations.boldness {
                // Fake bold: stroke the glyph outlines in the fill
                // colour at the requested width.
                self.emit(Instruction::LineWidth(boldness))?;
                self.emit(Instruction::StrokeColor(style.fill.unwrap_or(BLACK)))?;
                stroking = true;
            }
            if let Some(fill) = style.fill {
                self.emit(Instruction::FillColor(fill))?;
                filling = true;
            }
        }
        let mode = if clip_only {
            7
        } else {
            render_mode(stroking, filling, false)
        };
        self.emit(Instruction::TextRender(mode))?;
        if alterations.small_caps == Some(true) {
            let reduced = scaled_size(style.size)?;
            for (lowercase, run) in small_caps_runs(&span.text) {
                let (size, text) = if lowercase {
                    (reduced, run.to_uppercase())
                } else {
                    (style.size, run)
                };
                self.emit(Instruction::Font {
                    name: font_name.clone(),
                    size,
                })?;
                self.emit(Instruction::Write(text))?;
            }
        } else {
            self.emit(Instruction::Font {
                name: font_name.clone(),
                size: style.size,
            })?;
            self.emit(Instruction::Write(span.text.to_string()))?;
        }
        Ok(())
    }

    /// The assembly resource name of a font's base.
    fn resolved_font_name(&mut self, font: &Font) -> Result<String, Error> {
        match font.base() {
            Font::BuiltIn(family) => self.ensure_builtin_font(*family),
            Font::File { asm_name, .. } => Ok(asm_name.clone()),
            Font::Synthetic { .. } => {
                Err(Error::state("a synthetic font cannot be its own base"))
            }
        }
    }

    /// Declare the built-in fonts a column uses. Resource declarations
    /// are not allowed inside text blocks, so this runs before the
    /// block opens.
    fn ensure_column_fonts(&mut self, column: &Column) -> Result<(), Error> {
        for line in &column.lines {
            for span in &line.spans {
                if let Font::BuiltIn(family) = span.style.font.base() {
                    self.ensure_builtin_font(*family)?;
                }
            }
        }
        Ok(())
    }

    fn ensure_clipping_fonts(&mut self, clipping: Option<&Clipping>) -> Result<(), Error> {
        let clipping = match clipping {
            None => return Ok(()),
            Some(clipping) => clipping,
        };
        for component in &clipping.components {
            if let ClipShape::Column(column) = &component.shape {
                let column = column.clone();
                self.ensure_column_fonts(&column)?;
            }
        }
        Ok(())
    }
}

enum BoundaryKind {
    Art,
    Trim,
    Bleed,
}

fn corners_from_margins(ream: &Ream, margins: Margins) -> Result<BoxCorners, Error> {
    let overflow = |_| Error::domain("box margins overflow the page");
    Ok(BoxCorners {
        x0: margins.left,
        y0: margins.bottom,
        x1: ream.width.checked_sub(margins.right).map_err(overflow)?,
        y1: ream.height.checked_sub(margins.top).map_err(overflow)?,
    })
}

fn matrix_coefficients(transform: &Transform) -> Result<[Fixed; 6], Error> {
    let mut m = [Fixed::ZERO; 6];
    for (slot, value) in m.iter_mut().zip(transform.0) {
        *slot = Fixed::from_f64(value).map_err(|_| {
            Error::domain("a transform coefficient is outside the fixed-point range")
        })?;
    }
    Ok(m)
}

fn paint_rule(rule: FillRule) -> PaintRule {
    match rule {
        FillRule::Nonzero => PaintRule::Nonzero,
        FillRule::EvenOdd => PaintRule::EvenOdd,
        // Callers reject the null rule before lowering.
        FillRule::Null => PaintRule::Nonzero,
    }
}

/// The combined {stroke, fill, clip} booleans as the integer text
/// render mode.
fn render_mode(stroking: bool, filling: bool, clipping: bool) -> u8 {
    match (filling, stroking, clipping) {
        (true, false, false) => 0,
        (false, true, false) => 1,
        (true, true, false) => 2,
        (false, false, false) => 3,
        (true, false, true) => 4,
        (false, true, true) => 5,
        (true, true, true) => 6,
        (false, false, true) => 7,
    }
}

fn product(a: Fixed, b: Fixed) -> Result<Fixed, Error> {
    Fixed::from_f64(a.to_f64() * b.to_f64())
        .map_err(|_| Error::domain("the horizontal scale overflows"))
}

fn scaled_size(size: Fixed) -> Result<Fixed, Error> {
    Fixed::from_f64(size.to_f64() * SMALL_CAPS_FACTOR)
        .map_err(|_| Error::domain("the font size overflows"))
}

fn baseline_overflow() -> Error {
    Error::domain("the distance between baselines overflows")
}

/// Split text into maximal runs of lowercase and non-lowercase
/// characters.
fn small_caps_runs(text: &str) -> Vec<(bool, String)> {
    let mut runs: Vec<(bool, String)> = Vec::new();
    for c in text.chars() {
        let lowercase = c.is_lowercase();
        match runs.last_mut() {
            Some((l, run)) if *l == lowercase => run.push(c),
            _ => runs.push((lowercase, String::from(c))),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_mode_table() {
        assert_eq![render_mode(false, true, false), 1];
        assert_eq![render_mode(true, true, false), 2];
        assert_eq![render_mode(false, false, false), 3];
        assert_eq![render_mode(true, false, true), 4];
        assert_eq![render_mode(false, false, true), 7];
    }

    #[test]
    fn small_caps_run_splitting() {
        assert_eq![
            small_caps_runs("Hello World"),
            vec![
                (false, "H".to_string()),
                (true, "ello".to_string()),
                (false, " W".to_string()),
                (true, "orld".to_string()),
            ]
        ];
    }
}
