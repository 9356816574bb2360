//! The Scent assembly state machine.
//!
//! The machine is layered: the top level only admits resource loading and
//! `begin page`; a page starts in header mode (`dim`, boundary boxes,
//! `view_rotate`, `body`); the page body starts in its initial mode and
//! enters path or text sub-modes through `begin path`/`begin text`.
//! Every instruction is validated here — mode, ordering, nesting and
//! argument domains — before the corresponding [`Assembler`] hook runs
//! with arguments it can trust.

use crate::assembler::Assembler;
use crate::inst::*;
use crate::Error;
use scent_core::{check_content, is_name, BuiltInFont, Fixed};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Top,
    PageHeader,
    BodyInitial,
    BodyPath,
    BodyText,
}

impl Mode {
    fn description(self) -> &'static str {
        match self {
            Mode::Top => "at the top level",
            Mode::PageHeader => "in a page header",
            Mode::BodyInitial => "in a page body",
            Mode::BodyPath => "in a path",
            Mode::BodyText => "in a text block",
        }
    }
}

/// The last sub-instruction executed inside a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathStep {
    Move,
    /// A `line` or `curve`.
    Draw,
    Close,
    Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    StandardFont(BuiltInFont),
    FileFont,
    Image,
}

impl Resource {
    fn is_font(self) -> bool {
        !matches!(self, Resource::Image)
    }
}

/// The Scent assembly processor.
///
/// Drives an [`Assembler`] strategy from either assembly text
/// ([`run_source`](Machine::run_source)) or directly executed
/// [`Instruction`] values ([`execute`](Machine::execute)).
pub struct Machine<A> {
    asm: A,
    mode: Mode,

    // Page header staging; boxes are validated against `dim` at `body`.
    dim: Option<(Fixed, Fixed)>,
    art_box: Option<BoxCorners>,
    trim_box: Option<BoxCorners>,
    bleed_box: Option<BoxCorners>,
    rotated: bool,

    /// One flag per graphics-state frame: whether a font is selected.
    /// The outermost entry is the page level.
    font_selected: Vec<bool>,

    path_last: Option<PathStep>,
    path_steps: usize,
    text_writes: usize,

    resources: HashMap<String, Resource>,
    pages: usize,
}

impl<A: Assembler> Machine<A> {
    pub fn new(asm: A) -> Machine<A> {
        Machine {
            asm,
            mode: Mode::Top,
            dim: None,
            art_box: None,
            trim_box: None,
            bleed_box: None,
            rotated: false,
            font_selected: Vec::new(),
            path_last: None,
            path_steps: 0,
            text_writes: 0,
            resources: HashMap::new(),
            pages: 0,
        }
    }

    pub fn assembler(&self) -> &A {
        &self.asm
    }

    pub fn assembler_mut(&mut self) -> &mut A {
        &mut self.asm
    }

    /// Whether the program may stop here: no page open and at least one
    /// page defined.
    pub fn can_stop(&self) -> bool {
        self.mode == Mode::Top && self.pages > 0
    }

    /// Validate the terminal state and hand back the assembler.
    pub fn finish(mut self) -> Result<A, Error> {
        if self.mode != Mode::Top {
            return Err(Error::state("the last page is still open"));
        }
        if self.pages == 0 {
            return Err(Error::state("the document defines no pages"));
        }
        self.asm.finish()?;
        Ok(self.asm)
    }

    /// Run a complete assembly source text.
    pub fn run_source(&mut self, source: &str) -> Result<(), Error> {
        let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
        let mut seen_header = false;
        for (index, raw_line) in source.split('\n').enumerate() {
            let number = index + 1;
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with('\'') {
                continue;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                return Err(Error::syntax(
                    "instruction lines must not start with whitespace",
                )
                .at_line(number));
            }
            if !seen_header {
                let collapsed: Vec<&str> = line.split_ascii_whitespace().collect();
                if collapsed != ["scent-assembly", "1.0"] {
                    return Err(Error::syntax(format![
                        "expected the header `{}`",
                        crate::HEADER
                    ])
                    .at_line(number));
                }
                seen_header = true;
                continue;
            }
            let inst = crate::parse::parse_line(line).map_err(|e| e.at_line(number))?;
            self.execute(&inst).map_err(|e| e.at_line(number))?;
        }
        if !seen_header {
            return Err(Error::syntax(format![
                "the source contains no `{}` header",
                crate::HEADER
            ]));
        }
        Ok(())
    }

    /// Execute a single, already parsed instruction.
    pub fn execute(&mut self, inst: &Instruction) -> Result<(), Error> {
        use Instruction::*;
        match inst {
            FontStandard { name, family } => {
                self.declare(name, Resource::StandardFont(*family))?;
                self.asm.font_standard(name, *family)
            }
            FontFile { name, path } => {
                self.declare(name, Resource::FileFont)?;
                self.asm.font_file(name, path)
            }
            ImageJpeg { name, path } => {
                self.declare(name, Resource::Image)?;
                self.asm.image_jpeg(name, path)
            }
            ImagePng { name, path } => {
                self.declare(name, Resource::Image)?;
                self.asm.image_png(name, path)
            }

            BeginPage => {
                self.require(inst, Mode::Top)?;
                self.dim = None;
                self.art_box = None;
                self.trim_box = None;
                self.bleed_box = None;
                self.rotated = false;
                self.mode = Mode::PageHeader;
                self.asm.begin_page()
            }
            Dim { width, height } => {
                self.require(inst, Mode::PageHeader)?;
                if self.dim.is_some() {
                    return Err(self.state_err("the page dimensions are already set"));
                }
                if !width.is_positive() || !height.is_positive() {
                    return Err(self.domain_err("page dimensions must be positive"));
                }
                self.dim = Some((*width, *height));
                self.asm.dim(*width, *height)
            }
            ArtBox(corners) => {
                self.stage_box(inst, *corners, |m| &mut m.art_box)?;
                self.asm.art_box(*corners)
            }
            TrimBox(corners) => {
                self.stage_box(inst, *corners, |m| &mut m.trim_box)?;
                self.asm.trim_box(*corners)
            }
            BleedBox(corners) => {
                self.stage_box(inst, *corners, |m| &mut m.bleed_box)?;
                self.asm.bleed_box(*corners)
            }
            ViewRotate(rotation) => {
                self.require(inst, Mode::PageHeader)?;
                if self.rotated {
                    return Err(self.state_err("the page rotation is already set"));
                }
                self.rotated = true;
                self.asm.view_rotate(*rotation)
            }
            Body => {
                self.require(inst, Mode::PageHeader)?;
                let (width, height) = match self.dim {
                    None => {
                        return Err(self.state_err("`body` requires `dim` to have run"))
                    }
                    Some(dim) => dim,
                };
                for (label, corners) in [
                    ("art", self.art_box),
                    ("trim", self.trim_box),
                    ("bleed", self.bleed_box),
                ] {
                    if let Some(b) = corners {
                        if b.x1 >= width || b.y1 >= height {
                            return Err(self.domain_err(format![
                                "the {label} box does not fit on a {width} by {height} page"
                            ]));
                        }
                    }
                }
                self.mode = Mode::BodyInitial;
                self.font_selected = vec![false];
                self.asm.body()
            }
            EndPage => {
                self.require(inst, Mode::BodyInitial)?;
                if self.font_selected.len() > 1 {
                    return Err(self.state_err("unbalanced `save` at the end of the page"));
                }
                self.mode = Mode::Top;
                self.pages += 1;
                self.asm.end_page()
            }

            Save => {
                self.require_body(inst)?;
                let flag = *self.font_selected.last().unwrap();
                self.font_selected.push(flag);
                self.asm.save()
            }
            Restore => {
                self.require_body(inst)?;
                if self.font_selected.len() == 1 {
                    return Err(self.state_err("`restore` without a matching `save`"));
                }
                self.font_selected.pop();
                self.asm.restore()
            }
            Matrix(m) => {
                self.require(inst, Mode::BodyInitial)?;
                self.asm.matrix(*m)
            }
            LineWidth(width) => {
                self.require_body(inst)?;
                if !width.is_positive() {
                    return Err(self.domain_err("the line width must be positive"));
                }
                self.asm.line_width(*width)
            }
            LineCap(cap) => {
                self.require_body(inst)?;
                self.asm.line_cap(*cap)
            }
            LineJoin(join) => {
                self.require_body(inst)?;
                if let crate::inst::LineJoin::Miter(limit) = join {
                    if !limit.is_positive() {
                        return Err(self.domain_err("the miter limit must be positive"));
                    }
                }
                self.asm.line_join(*join)
            }
            LineDash { phase, dashes } => {
                self.require_body(inst)?;
                if phase.is_negative() {
                    return Err(self.domain_err("the dash phase must not be negative"));
                }
                if dashes.len() < 2 || dashes.len() % 2 != 0 {
                    return Err(self.domain_err(
                        "a dash pattern needs at least one dash/gap pair",
                    ));
                }
                if dashes.iter().any(|d| !d.is_positive()) {
                    return Err(self.domain_err("dash elements must be positive"));
                }
                self.asm.line_dash(*phase, dashes)
            }
            LineUndash => {
                self.require_body(inst)?;
                self.asm.line_undash()
            }
            StrokeColor(color) => {
                self.require_body(inst)?;
                self.asm.stroke_color(*color)
            }
            FillColor(color) => {
                self.require_body(inst)?;
                self.asm.fill_color(*color)
            }
            Image { name } => {
                self.require(inst, Mode::BodyInitial)?;
                match self.resources.get(name) {
                    Some(Resource::Image) => (),
                    Some(_) => {
                        return Err(Error::name(format![
                            "`{name}` names a font, not an image"
                        ]))
                    }
                    None => {
                        return Err(Error::name(format!["no image named `{name}`"]))
                    }
                }
                self.asm.image(name)
            }

            BeginPath { stroke, fill, clip } => {
                self.require(inst, Mode::BodyInitial)?;
                if !stroke && fill.is_none() && clip.is_none() {
                    return Err(self.state_err(
                        "a path needs at least one of stroke, fill and clip",
                    ));
                }
                self.mode = Mode::BodyPath;
                self.path_last = None;
                self.path_steps = 0;
                self.asm.begin_path(*stroke, *fill, *clip)
            }
            Move { x, y } => {
                self.require(inst, Mode::BodyPath)?;
                if self.path_last == Some(PathStep::Move) {
                    return Err(self.state_err("`move` must not follow `move`"));
                }
                self.path_step(PathStep::Move);
                self.asm.move_to(*x, *y)
            }
            Line { x, y } => {
                self.require(inst, Mode::BodyPath)?;
                self.require_open_contour(inst)?;
                self.path_step(PathStep::Draw);
                self.asm.line_to(*x, *y)
            }
            Curve {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
            } => {
                self.require(inst, Mode::BodyPath)?;
                self.require_open_contour(inst)?;
                self.path_step(PathStep::Draw);
                self.asm.curve_to(*x1, *y1, *x2, *y2, *x3, *y3)
            }
            Close => {
                self.require(inst, Mode::BodyPath)?;
                if self.path_last != Some(PathStep::Draw) {
                    return Err(self.state_err(
                        "`close` requires a preceding `line` or `curve`",
                    ));
                }
                self.path_step(PathStep::Close);
                self.asm.close()
            }
            Rect {
                x,
                y,
                width,
                height,
            } => {
                self.require(inst, Mode::BodyPath)?;
                if self.path_last == Some(PathStep::Move) {
                    return Err(self.state_err("`rect` must not follow `move`"));
                }
                if !width.is_positive() || !height.is_positive() {
                    return Err(self.domain_err("rectangle sides must be positive"));
                }
                self.path_step(PathStep::Rect);
                self.asm.rect(*x, *y, *width, *height)
            }
            EndPath => {
                self.require(inst, Mode::BodyPath)?;
                if self.path_steps == 0 {
                    return Err(self.state_err("the path is empty"));
                }
                if self.path_last == Some(PathStep::Move) {
                    return Err(self.state_err("a path must not end on `move`"));
                }
                self.mode = Mode::BodyInitial;
                self.asm.end_path()
            }

            BeginText { clip } => {
                self.require(inst, Mode::BodyInitial)?;
                self.mode = Mode::BodyText;
                self.text_writes = 0;
                self.asm.begin_text(*clip)
            }
            CharSpace(space) => {
                self.require(inst, Mode::BodyText)?;
                if space.is_negative() {
                    return Err(self.domain_err("character spacing must not be negative"));
                }
                self.asm.char_space(*space)
            }
            WordSpace(space) => {
                self.require(inst, Mode::BodyText)?;
                if space.is_negative() {
                    return Err(self.domain_err("word spacing must not be negative"));
                }
                self.asm.word_space(*space)
            }
            HScale(scale) => {
                self.require(inst, Mode::BodyText)?;
                if !scale.is_positive() {
                    return Err(self.domain_err("the horizontal scale must be positive"));
                }
                self.asm.h_scale(*scale)
            }
            Lead(leading) => {
                self.require(inst, Mode::BodyText)?;
                self.asm.lead(*leading)
            }
            Font { name, size } => {
                self.require(inst, Mode::BodyText)?;
                if !size.is_positive() {
                    return Err(self.domain_err("the font size must be positive"));
                }
                match self.resources.get(name) {
                    Some(r) if r.is_font() => (),
                    Some(_) => {
                        return Err(Error::name(format![
                            "`{name}` names an image, not a font"
                        ]))
                    }
                    None => return Err(Error::name(format!["no font named `{name}`"])),
                }
                *self.font_selected.last_mut().unwrap() = true;
                self.asm.font(name, *size)
            }
            TextRender(mode) => {
                self.require(inst, Mode::BodyText)?;
                if *mode > 7 {
                    return Err(self.domain_err(format![
                        "invalid text render mode {mode}; the range is 0-7"
                    ]));
                }
                self.asm.text_render(*mode)
            }
            Rise(rise) => {
                self.require(inst, Mode::BodyText)?;
                self.asm.rise(*rise)
            }
            Advance(offset) => {
                self.require(inst, Mode::BodyText)?;
                self.asm.advance(*offset)
            }
            Write(text) => {
                self.require(inst, Mode::BodyText)?;
                if !self.font_selected.last().unwrap() {
                    return Err(self.state_err("`write` requires an active font"));
                }
                if let Err(err) = check_content(text) {
                    return Err(self.domain_err(err.to_string()));
                }
                self.text_writes += 1;
                self.asm.write(text)
            }
            EndText => {
                self.require(inst, Mode::BodyText)?;
                if self.text_writes == 0 {
                    return Err(self.state_err(
                        "a text block must contain at least one `write`",
                    ));
                }
                self.mode = Mode::BodyInitial;
                self.asm.end_text()
            }
        }
    }

    fn declare(&mut self, name: &str, resource: Resource) -> Result<(), Error> {
        // Resource loading is legal at the top level and, for the benefit
        // of embedded documents, in the body's initial mode.
        if self.mode != Mode::Top && self.mode != Mode::BodyInitial {
            return Err(self.state_err(format![
                "resources cannot be declared {}",
                self.mode.description()
            ]));
        }
        if !is_name(name) {
            return Err(Error::name(format!["invalid resource name `{name}`"]));
        }
        if self.resources.contains_key(name) {
            return Err(Error::name(format![
                "the resource name `{name}` is already defined"
            ]));
        }
        self.resources.insert(name.into(), resource);
        Ok(())
    }

    fn stage_box(
        &mut self,
        inst: &Instruction,
        corners: BoxCorners,
        slot: fn(&mut Self) -> &mut Option<BoxCorners>,
    ) -> Result<(), Error> {
        self.require(inst, Mode::PageHeader)?;
        if corners.x0.is_negative()
            || corners.y0.is_negative()
            || corners.x1 <= corners.x0
            || corners.y1 <= corners.y0
        {
            return Err(self.domain_err(format![
                "degenerate {} corners",
                inst.name()
            ]));
        }
        let slot = slot(self);
        if slot.is_some() {
            return Err(Error::state(format![
                "the {} is already set",
                inst.name()
            ]));
        }
        *slot = Some(corners);
        Ok(())
    }

    fn require(&self, inst: &Instruction, mode: Mode) -> Result<(), Error> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(Error::state(format![
                "`{}` is not allowed {}",
                inst.name(),
                self.mode.description()
            ]))
        }
    }

    /// Body initial or text mode: graphics-state and colour operations.
    fn require_body(&self, inst: &Instruction) -> Result<(), Error> {
        match self.mode {
            Mode::BodyInitial | Mode::BodyText => Ok(()),
            _ => Err(Error::state(format![
                "`{}` is not allowed {}",
                inst.name(),
                self.mode.description()
            ])),
        }
    }

    fn require_open_contour(&self, inst: &Instruction) -> Result<(), Error> {
        match self.path_last {
            Some(PathStep::Move) | Some(PathStep::Draw) => Ok(()),
            _ => Err(Error::state(format![
                "`{}` requires a preceding `move`, `line` or `curve`",
                inst.name()
            ])),
        }
    }

    fn path_step(&mut self, step: PathStep) {
        self.path_last = Some(step);
        self.path_steps += 1;
    }

    fn state_err<T: Into<String>>(&self, message: T) -> Error {
        Error::state(message)
    }

    fn domain_err<T: Into<String>>(&self, message: T) -> Error {
        Error::domain(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::TextAssembler;
    use scent_core::ErrorKind;

    const PAGE: &str = "begin page\ndim 595 842\nbody\n";

    fn run(body: &str) -> Result<(), Error> {
        let source = format!["scent-assembly 1.0\n{body}"];
        let mut machine = Machine::new(TextAssembler::new());
        machine.run_source(&source)
    }

    fn run_err(body: &str) -> Error {
        run(body).expect_err("expected an error")
    }

    macro_rules! machine_tests {
        ( $( ($name: ident, $body: expr, $want_kind: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                let err = run_err(&$body);
                assert_eq![err.kind, $want_kind, "unexpected error: {err}"];
            }
            )+
        };
    }

    machine_tests![
        (
            write_without_font,
            format!["{PAGE}begin text -\nwrite \"Hello\"\n"],
            ErrorKind::State
        ),
        (
            write_after_restore_drops_font,
            format![
                "font_standard F1 Helvetica\n{PAGE}begin text -\nsave\nfont F1 12\nrestore\nwrite \"x\"\n"
            ],
            ErrorKind::State
        ),
        (
            text_block_without_write,
            format![
                "font_standard F1 Helvetica\n{PAGE}begin text -\nfont F1 12\nend text\n"
            ],
            ErrorKind::State
        ),
        (
            move_after_move,
            format!["{PAGE}begin path stroke - -\nmove 0 0\nmove 1 1\n"],
            ErrorKind::State
        ),
        (
            line_without_move,
            format!["{PAGE}begin path stroke - -\nline 1 1\n"],
            ErrorKind::State
        ),
        (
            close_without_draw,
            format!["{PAGE}begin path stroke - -\nmove 0 0\nclose\n"],
            ErrorKind::State
        ),
        (
            rect_after_move,
            format!["{PAGE}begin path stroke - -\nmove 0 0\nrect 0 0 1 1\n"],
            ErrorKind::State
        ),
        (
            path_ends_on_move,
            format![
                "{PAGE}begin path stroke - -\nmove 0 0\nline 1 1\nmove 2 2\nend path\n"
            ],
            ErrorKind::State
        ),
        (
            empty_path,
            format!["{PAGE}begin path stroke - -\nend path\n"],
            ErrorKind::State
        ),
        (
            path_without_purpose,
            format!["{PAGE}begin path - - -\n"],
            ErrorKind::State
        ),
        (
            nested_page,
            format!["{PAGE}begin page\n"],
            ErrorKind::State
        ),
        (
            body_without_dim,
            "begin page\nbody\n".to_string(),
            ErrorKind::State
        ),
        (
            box_wider_than_page,
            "begin page\ndim 595 842\nart_box 36 36 595 806\nbody\n".to_string(),
            ErrorKind::Domain
        ),
        (
            restore_without_save,
            format!["{PAGE}restore\n"],
            ErrorKind::State
        ),
        (
            unbalanced_save_at_end_page,
            format!["{PAGE}save\nend page\n"],
            ErrorKind::State
        ),
        (
            duplicate_resource_name,
            "font_standard F1 Helvetica\nfont_standard F1 Courier\n".to_string(),
            ErrorKind::Name
        ),
        (
            undeclared_image,
            format!["{PAGE}image I1\n"],
            ErrorKind::Name
        ),
        (
            font_used_as_image,
            format!["font_standard F1 Helvetica\n{PAGE}image F1\n"],
            ErrorKind::Name
        ),
        (
            leading_whitespace,
            format!["{PAGE} end page\n"],
            ErrorKind::Syntax
        ),
        (
            write_rejects_control_characters,
            format![
                "font_standard F1 Helvetica\n{PAGE}begin text -\nfont F1 12\nwrite \"a\u{7F}b\"\n"
            ],
            ErrorKind::Domain
        ),
        (
            matrix_inside_text,
            format![
                "font_standard F1 Helvetica\n{PAGE}begin text -\nmatrix 1 0 0 1 0 0\n"
            ],
            ErrorKind::State
        ),
    ];

    #[test]
    fn font_survives_restore() {
        // S7: the font selected before `save` is active again after
        // `restore`, so `write` succeeds.
        let body = format![
            "font_standard F1 Helvetica\nfont_standard F2 Courier\n{PAGE}\
             begin text clip\nfont F1 12\nsave\nfont F2 14\nrestore\nwrite \"x\"\nend text\nend page\n"
        ];
        run(&body).unwrap();
    }

    #[test]
    fn complete_page_round_trips_through_text_assembler() {
        let body = format![
            "font_standard F1 Helvetica\n{PAGE}\
             save\nbegin path stroke nonzero -\nmove 10 10\nline 100 10\ncurve 110 10 120 20 120 30\nclose\nend path\nrestore\n\
             begin text -\nfont F1 12\nadvance 72 720\nwrite \"Hello\"\nend text\nend page\n"
        ];
        let source = format!["scent-assembly 1.0\n{body}"];
        let mut machine = Machine::new(TextAssembler::new());
        machine.run_source(&source).unwrap();
        assert![machine.can_stop()];
        let text = machine.finish().unwrap().into_text();
        // The canonical text is itself a valid program.
        let mut second = Machine::new(TextAssembler::new());
        second.run_source(&text).unwrap();
        assert_eq![second.finish().unwrap().into_text(), text];
    }

    #[test]
    fn finish_requires_a_page() {
        let machine = Machine::new(TextAssembler::new());
        assert![!machine.can_stop()];
        assert_eq![machine.finish().unwrap_err().kind, ErrorKind::State];
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = run_err("begin page\nbody\n");
        assert_eq![err.line, Some(3)];
    }

    #[test]
    fn comments_blanks_and_crlf() {
        let source = "\u{FEFF}' leading comment\r\n\r\nscent-assembly 1.0\r\n\
            font_standard F1 Helvetica\r\nbegin page\r\ndim 10 10\r\nbody\r\nend page\r\n";
        let mut machine = Machine::new(TextAssembler::new());
        machine.run_source(source).unwrap();
        assert![machine.can_stop()];
    }

    #[test]
    fn missing_header() {
        let mut machine = Machine::new(TextAssembler::new());
        let err = machine.run_source("begin page\n").unwrap_err();
        assert_eq![err.kind, ErrorKind::Syntax];
    }
}
