//! The Scent value model.
//!
//! Values form a closed tagged sum: the plain kinds (null, integer,
//! fixed, atom, string, dictionary) and the object kinds built by the
//! evaluator's construction operations. Every value is immutable once
//! built; compound values are reference counted so that copies on the
//! stack and in the namespace share structure.

use crate::services::FontMetrics;
use scent_core::{BuiltInFont, Cmyk, Fixed, Rotation};
use std::collections::HashMap;
use std::rc::Rc;

/// A Scent value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i32),
    Fixed(Fixed),
    Atom(Rc<str>),
    Str(Rc<str>),
    Dict(Rc<Dict>),
    Ream(Rc<Ream>),
    Color(Cmyk),
    Stroke(Rc<Stroke>),
    DashPattern(Rc<DashPattern>),
    Font(Rc<Font>),
    Image(Rc<Image>),
    Path(Rc<Path>),
    Transform(Transform),
    Style(Rc<Style>),
    Column(Rc<Column>),
    Clipping(Rc<Clipping>),
}

impl Value {
    pub fn description(&self) -> &'static str {
        use Value::*;
        match self {
            Null => "null",
            Integer(_) => "an integer",
            Fixed(_) => "a fixed number",
            Atom(_) => "an atom",
            Str(_) => "a string",
            Dict(_) => "a dictionary",
            Ream(_) => "a ream",
            Color(_) => "a colour",
            Stroke(_) => "a stroke",
            DashPattern(_) => "a dash pattern",
            Font(_) => "a font",
            Image(_) => "an image",
            Path(_) => "a path",
            Transform(_) => "a transform",
            Style(_) => "a style",
            Column(_) => "a column",
            Clipping(_) => "a clipping",
        }
    }
}

/// Whether `name` belongs to the closed global atom set.
pub fn is_known_atom(name: &str) -> bool {
    matches!(
        name,
        "ArtBox"
            | "TrimBox"
            | "BleedBox"
            | "LeftMargin"
            | "RightMargin"
            | "TopMargin"
            | "BottomMargin"
            | "Width"
            | "Height"
            | "Rotation"
            | "Color"
            | "Cap"
            | "Join"
            | "MiterLimit"
            | "Dash"
            | "Butt"
            | "Round"
            | "Square"
            | "Miter"
            | "Bevel"
            | "Nonzero"
            | "EvenOdd"
            | "Null"
            | "Translate"
            | "Rotate"
            | "Scale"
            | "Skew"
            | "HScale"
            | "Oblique"
            | "Boldness"
            | "SmallCaps"
            | "CharSpacing"
            | "truetype"
            | "jpeg"
            | "png"
    ) || BuiltInFont::parse(name).is_some()
}

/// An unordered dictionary with unique atom keys.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    pub entries: HashMap<String, Value>,
}

impl Dict {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }
}

/// A point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: Fixed,
    pub y: Fixed,
}

/// Margins of a boundary box, all strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub left: Fixed,
    pub top: Fixed,
    pub right: Fixed,
    pub bottom: Fixed,
}

/// Paper dimensions, boundary boxes and display rotation.
#[derive(Debug, Clone)]
pub struct Ream {
    pub width: Fixed,
    pub height: Fixed,
    pub rotation: Rotation,
    pub art: Option<Margins>,
    pub trim: Option<Margins>,
    pub bleed: Option<Margins>,
}

/// A dash pattern: dash/gap lengths and a phase.
///
/// An empty pattern means solid lines. The single-element form is only
/// reachable through dictionary-style construction.
#[derive(Debug, Clone, Default)]
pub struct DashPattern {
    pub dashes: Vec<Fixed>,
    pub phase: Fixed,
}

/// A line-cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    Butt,
    Round,
    Square,
}

/// A line-join style; the miter form carries its limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Join {
    Miter(Fixed),
    Round,
    Bevel,
}

/// Everything needed to stroke a shape.
#[derive(Debug, Clone)]
pub struct Stroke {
    pub color: Cmyk,
    pub width: Fixed,
    pub cap: Cap,
    pub join: Join,
    pub dash: DashPattern,
}

/// A fill rule. `Null` marks a path that may only be stroked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    Nonzero,
    EvenOdd,
    Null,
}

/// One segment of a motion subpath.
#[derive(Debug, Clone, Copy)]
pub enum Segment {
    Line(Point),
    Cubic(Point, Point, Point),
}

/// One connected contour of a path.
#[derive(Debug, Clone)]
pub enum Subpath {
    Rect {
        corner: Point,
        width: Fixed,
        height: Fixed,
    },
    Motion {
        start: Point,
        segments: Vec<Segment>,
        closed: bool,
    },
}

/// An ordered list of subpaths with a fill rule.
#[derive(Debug, Clone)]
pub struct Path {
    pub subpaths: Vec<Subpath>,
    pub rule: FillRule,
}

/// Optional overrides a synthetic font applies to its base.
#[derive(Debug, Clone, Copy, Default)]
pub struct Alterations {
    pub h_scale: Option<Fixed>,
    pub oblique: Option<Fixed>,
    pub boldness: Option<Fixed>,
    pub small_caps: Option<bool>,
    pub char_spacing: Option<Fixed>,
}

impl Alterations {
    /// Layer `self` over `base`: defined alterations win, undefined ones
    /// inherit.
    pub fn over(self, base: Alterations) -> Alterations {
        Alterations {
            h_scale: self.h_scale.or(base.h_scale),
            oblique: self.oblique.or(base.oblique),
            boldness: self.boldness.or(base.boldness),
            small_caps: self.small_caps.or(base.small_caps),
            char_spacing: self.char_spacing.or(base.char_spacing),
        }
    }
}

/// A font value.
pub enum Font {
    BuiltIn(BuiltInFont),
    File {
        path: String,
        /// The resource name the font was declared under in the
        /// assembly output.
        asm_name: String,
        metrics: Rc<dyn FontMetrics>,
    },
    /// A base font with an override layer. Chains collapse on
    /// construction, so the base is never itself synthetic.
    Synthetic {
        base: Rc<Font>,
        alterations: Alterations,
    },
}

impl Font {
    /// Build a synthetic font, collapsing synthetic bases into a single
    /// override layer.
    pub fn synthetic(base: &Rc<Font>, alterations: Alterations) -> Font {
        match base.as_ref() {
            Font::Synthetic {
                base: inner,
                alterations: inherited,
            } => Font::Synthetic {
                base: inner.clone(),
                alterations: alterations.over(*inherited),
            },
            _ => Font::Synthetic {
                base: base.clone(),
                alterations,
            },
        }
    }

    /// The non-synthetic font at the bottom of the chain.
    pub fn base(&self) -> &Font {
        match self {
            Font::Synthetic { base, .. } => base,
            other => other,
        }
    }

    /// The collapsed override layer; empty for non-synthetic fonts.
    pub fn alterations(&self) -> Alterations {
        match self {
            Font::Synthetic { alterations, .. } => *alterations,
            _ => Alterations::default(),
        }
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Font::BuiltIn(family) => write![f, "Font::BuiltIn({family})"],
            Font::File { path, asm_name, .. } => {
                write![f, "Font::File({path:?} as {asm_name})"]
            }
            Font::Synthetic { base, alterations } => {
                write![f, "Font::Synthetic({base:?}, {alterations:?})"]
            }
        }
    }
}

/// A validated, loaded image resource.
#[derive(Debug, Clone)]
pub struct Image {
    pub path: String,
    /// The resource name in the assembly output.
    pub asm_name: String,
    pub format: crate::services::ImageFormat,
    pub info: crate::services::ImageInfo,
}

/// A 2-D affine transform in the usual six-element PDF form
/// `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(pub [f64; 6]);

impl Transform {
    pub const IDENTITY: Transform = Transform([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(x: Fixed, y: Fixed) -> Transform {
        Transform([1.0, 0.0, 0.0, 1.0, x.to_f64(), y.to_f64()])
    }

    /// Counter-clockwise rotation, in degrees.
    pub fn rotate(degrees: Fixed) -> Transform {
        let (sin, cos) = degrees.to_f64().to_radians().sin_cos();
        Transform([cos, sin, -sin, cos, 0.0, 0.0])
    }

    pub fn scale(sx: Fixed, sy: Fixed) -> Transform {
        Transform([sx.to_f64(), 0.0, 0.0, sy.to_f64(), 0.0, 0.0])
    }

    /// Skew along each axis, in degrees.
    pub fn skew(ax: Fixed, ay: Fixed) -> Transform {
        let tx = ax.to_f64().to_radians().tan();
        let ty = ay.to_f64().to_radians().tan();
        Transform([1.0, ty, tx, 1.0, 0.0, 0.0])
    }

    /// The transform applying `self` first and `after` second.
    pub fn then(&self, after: &Transform) -> Transform {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = after.0;
        Transform([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    /// The inverse transform, or [None] when singular.
    pub fn invert(&self) -> Option<Transform> {
        let [a, b, c, d, e, f] = self.0;
        let det = a * d - b * c;
        if det.abs() < 1e-12 {
            return None;
        }
        let ia = d / det;
        let ib = -b / det;
        let ic = -c / det;
        let id = a / det;
        Some(Transform([
            ia,
            ib,
            ic,
            id,
            -(e * ia + f * ic),
            -(e * ib + f * id),
        ]))
    }
}

/// Everything needed to set a span of text.
#[derive(Debug)]
pub struct Style {
    pub font: Rc<Font>,
    pub size: Fixed,
    pub char_space: Fixed,
    pub word_space: Fixed,
    pub h_scale: Fixed,
    pub rise: Fixed,
    pub stroke: Option<Rc<Stroke>>,
    pub fill: Option<Cmyk>,
}

/// A run of text in one style.
#[derive(Debug, Clone)]
pub struct Span {
    pub text: Rc<str>,
    pub style: Rc<Style>,
}

/// One baseline with its spans.
#[derive(Debug, Clone)]
pub struct Line {
    pub start: Point,
    pub spans: Vec<Span>,
}

/// An ordered list of lines.
#[derive(Debug, Clone)]
pub struct Column {
    pub lines: Vec<Line>,
}

/// A shape usable as a clip component.
#[derive(Debug, Clone)]
pub enum ClipShape {
    Path(Rc<Path>),
    Column(Rc<Column>),
}

/// One component of a clipping region.
#[derive(Debug, Clone)]
pub struct ClipComponent {
    pub shape: ClipShape,
    pub transform: Transform,
}

/// An intersection of clip components; empty means the whole page.
#[derive(Debug, Clone)]
pub struct Clipping {
    pub components: Vec<ClipComponent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_chains_collapse() {
        let base = Rc::new(Font::BuiltIn(BuiltInFont::Helvetica));
        let first = Rc::new(Font::synthetic(
            &base,
            Alterations {
                h_scale: Some(Fixed(120_000)),
                boldness: Some(Fixed(50_000)),
                ..Default::default()
            },
        ));
        let second = Font::synthetic(
            &first,
            Alterations {
                boldness: Some(Fixed(70_000)),
                small_caps: Some(true),
                ..Default::default()
            },
        );
        // The derived font wins where defined, inherits elsewhere, and
        // sits directly on the non-synthetic base.
        let alterations = second.alterations();
        assert_eq![alterations.h_scale, Some(Fixed(120_000))];
        assert_eq![alterations.boldness, Some(Fixed(70_000))];
        assert_eq![alterations.small_caps, Some(true)];
        assert_eq![alterations.oblique, None];
        assert![matches![second.base(), Font::BuiltIn(BuiltInFont::Helvetica)]];
        match &second {
            Font::Synthetic { base, .. } => {
                assert![matches![base.as_ref(), Font::BuiltIn(_)]]
            }
            _ => panic!["expected a synthetic font"],
        }
    }

    #[test]
    fn transform_composition() {
        let t = Transform::translate(Fixed(1_000_000), Fixed::ZERO)
            .then(&Transform::scale(Fixed(200_000), Fixed(200_000)));
        // Translate by 10, then scale by 2: the offset doubles.
        assert_eq![t.0, [2.0, 0.0, 0.0, 2.0, 20.0, 0.0]];
    }

    #[test]
    fn transform_inversion() {
        let t = Transform::translate(Fixed(500_000), Fixed(-250_000))
            .then(&Transform::rotate(Fixed(30 * scent_core::FIXED_SCALE)));
        let inv = t.invert().unwrap();
        let id = t.then(&inv);
        for (got, want) in id.0.iter().zip(Transform::IDENTITY.0) {
            assert![(got - want).abs() < 1e-9, "{:?}", id.0];
        }
        assert![Transform::scale(Fixed::ZERO, Fixed::ONE).invert().is_none()];
    }

    #[test]
    fn atom_set() {
        assert![is_known_atom("ArtBox")];
        assert![is_known_atom("Times-Roman")];
        assert![is_known_atom("truetype")];
        assert![!is_known_atom("artbox")];
        assert![!is_known_atom("NoSuchAtom")];
    }
}
