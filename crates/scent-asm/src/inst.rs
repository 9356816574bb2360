//! Typed instructions of the Scent assembly language.

use scent_core::{BuiltInFont, Cmyk, Fixed, Rotation};

/// A line-cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn parse(s: &str) -> Option<LineCap> {
        Some(match s {
            "butt" => LineCap::Butt,
            "round" => LineCap::Round,
            "square" => LineCap::Square,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }
}

/// A line-join style. The miter form carries its miter limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineJoin {
    Miter(Fixed),
    Round,
    Bevel,
}

/// A painting rule for fills and clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaintRule {
    Nonzero,
    EvenOdd,
}

impl PaintRule {
    pub fn parse(s: &str) -> Option<PaintRule> {
        Some(match s {
            "nonzero" => PaintRule::Nonzero,
            "evenodd" => PaintRule::EvenOdd,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            PaintRule::Nonzero => "nonzero",
            PaintRule::EvenOdd => "evenodd",
        }
    }
}

/// A boundary box given as absolute corners on the unrotated page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxCorners {
    pub x0: Fixed,
    pub y0: Fixed,
    pub x1: Fixed,
    pub y1: Fixed,
}

/// One Scent assembly instruction with typed arguments.
///
/// The variants mirror the textual instruction set one to one; argument
/// *types* are guaranteed by construction, while argument *domains*
/// (positive widths, declared resource names, ...) are enforced by the
/// [`Machine`](crate::Machine) when the instruction executes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    FontStandard { name: String, family: BuiltInFont },
    FontFile { name: String, path: String },
    ImageJpeg { name: String, path: String },
    ImagePng { name: String, path: String },

    BeginPage,
    Dim { width: Fixed, height: Fixed },
    ArtBox(BoxCorners),
    TrimBox(BoxCorners),
    BleedBox(BoxCorners),
    ViewRotate(Rotation),
    Body,
    EndPage,

    Save,
    Restore,
    Matrix([Fixed; 6]),
    LineWidth(Fixed),
    LineCap(LineCap),
    LineJoin(LineJoin),
    LineDash { phase: Fixed, dashes: Vec<Fixed> },
    LineUndash,
    StrokeColor(Cmyk),
    FillColor(Cmyk),
    Image { name: String },

    BeginPath {
        stroke: bool,
        fill: Option<PaintRule>,
        clip: Option<PaintRule>,
    },
    Move { x: Fixed, y: Fixed },
    Line { x: Fixed, y: Fixed },
    Curve {
        x1: Fixed,
        y1: Fixed,
        x2: Fixed,
        y2: Fixed,
        x3: Fixed,
        y3: Fixed,
    },
    Close,
    Rect {
        x: Fixed,
        y: Fixed,
        width: Fixed,
        height: Fixed,
    },
    EndPath,

    BeginText { clip: bool },
    CharSpace(Fixed),
    WordSpace(Fixed),
    HScale(Fixed),
    Lead(Fixed),
    Font { name: String, size: Fixed },
    TextRender(u8),
    Rise(Fixed),
    Advance(Option<(Fixed, Fixed)>),
    Write(String),
    EndText,
}

impl Instruction {
    /// The textual name of the instruction, e.g. `"begin path"`.
    pub fn name(&self) -> &'static str {
        use Instruction::*;
        match self {
            FontStandard { .. } => "font_standard",
            FontFile { .. } => "font_file",
            ImageJpeg { .. } => "image_jpeg",
            ImagePng { .. } => "image_png",
            BeginPage => "begin page",
            Dim { .. } => "dim",
            ArtBox(_) => "art_box",
            TrimBox(_) => "trim_box",
            BleedBox(_) => "bleed_box",
            ViewRotate(_) => "view_rotate",
            Body => "body",
            EndPage => "end page",
            Save => "save",
            Restore => "restore",
            Matrix(_) => "matrix",
            LineWidth(_) => "line_width",
            LineCap(_) => "line_cap",
            LineJoin(_) => "line_join",
            LineDash { .. } => "line_dash",
            LineUndash => "line_undash",
            StrokeColor(_) => "stroke_color",
            FillColor(_) => "fill_color",
            Image { .. } => "image",
            BeginPath { .. } => "begin path",
            Move { .. } => "move",
            Line { .. } => "line",
            Curve { .. } => "curve",
            Close => "close",
            Rect { .. } => "rect",
            EndPath => "end path",
            BeginText { .. } => "begin text",
            CharSpace(_) => "cspace",
            WordSpace(_) => "wspace",
            HScale(_) => "hscale",
            Lead(_) => "lead",
            Font { .. } => "font",
            TextRender(_) => "text_render",
            Rise(_) => "rise",
            Advance(_) => "advance",
            Write(_) => "write",
            EndText => "end text",
        }
    }
}
