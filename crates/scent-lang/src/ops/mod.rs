//! The Scent operation inventory.
//!
//! Each operation is a plain function from the evaluator to a result;
//! the inventory below is the single place where names, dialects and
//! one-line documentation come together. The per-family implementations
//! live in the submodules.

use crate::builder::Dialect;
use crate::error::Error;
use crate::vm::Vm;
use scent_asm::Assembler;
use std::collections::HashMap;

mod basic;
mod clip;
mod color;
mod column;
mod draw;
mod font;
mod image;
mod path;
mod ream;
mod stroke;
mod style;
mod transform;

/// The Rust type of operation functions.
pub type OpFn<A> = fn(&mut Vm<A>) -> Result<(), Error>;

/// Which dialect an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpDialect {
    /// Available regardless of the dialect in use.
    Any,
    /// Available only in one dialect; running it commits an undecided
    /// source to that dialect.
    Only(Dialect),
}

/// An operation together with its dialect and documentation.
pub struct BuiltIn<A: Assembler> {
    pub f: OpFn<A>,
    pub dialect: OpDialect,
    pub doc: &'static str,
}

impl<A: Assembler> BuiltIn<A> {
    fn any(f: OpFn<A>, doc: &'static str) -> BuiltIn<A> {
        BuiltIn {
            f,
            dialect: OpDialect::Any,
            doc,
        }
    }

    fn dictionary(f: OpFn<A>, doc: &'static str) -> BuiltIn<A> {
        BuiltIn {
            f,
            dialect: OpDialect::Only(Dialect::Dictionary),
            doc,
        }
    }

    fn incremental(f: OpFn<A>, doc: &'static str) -> BuiltIn<A> {
        BuiltIn {
            f,
            dialect: OpDialect::Only(Dialect::Incremental),
            doc,
        }
    }
}

/// The complete operation inventory.
pub fn built_ins<A: Assembler>() -> HashMap<&'static str, BuiltIn<A>> {
    HashMap::from([
        // Basic stack manipulation.
        ("pop", BuiltIn::any(basic::pop, "Discard the top value")),
        ("dup", BuiltIn::any(basic::dup, "Duplicate the top value")),
        ("null", BuiltIn::any(basic::null, "Push the null value")),
        (
            "dict",
            BuiltIn::any(basic::dict, "Build a dictionary from counted key/value pairs"),
        ),
        (
            "sep",
            BuiltIn::incremental(basic::sep, "Join counted strings with a separator"),
        ),
        (
            "concat",
            BuiltIn::incremental(basic::concat, "Concatenate counted strings"),
        ),
        // Colours.
        ("gray", BuiltIn::any(color::gray, "A grey colour from an intensity in 0-255")),
        ("cmyk", BuiltIn::any(color::cmyk, "A colour from four channels in 0-255")),
        ("fgray", BuiltIn::any(color::fgray, "A grey colour from an intensity in 0-1")),
        ("fcmyk", BuiltIn::any(color::fcmyk, "A colour from four channels in 0-1")),
        // Reams.
        (
            "ream",
            BuiltIn::dictionary(ream::ream, "Build a ream from a dictionary"),
        ),
        ("start_ream", BuiltIn::incremental(ream::start_ream, "Open a ream builder")),
        ("ream_dim", BuiltIn::incremental(ream::ream_dim, "Set the paper dimensions")),
        (
            "ream_rotate",
            BuiltIn::incremental(ream::ream_rotate, "Set the display rotation"),
        ),
        (
            "ream_bound",
            BuiltIn::incremental(ream::ream_bound, "Set a boundary box from margins"),
        ),
        (
            "ream_unbound",
            BuiltIn::incremental(ream::ream_unbound, "Remove a boundary box"),
        ),
        (
            "ream_derive",
            BuiltIn::incremental(ream::ream_derive, "Reset the builder to a copy of a ream"),
        ),
        (
            "finish_ream",
            BuiltIn::incremental(ream::finish_ream, "Validate and push the ream"),
        ),
        // Pages.
        ("begin_page", BuiltIn::any(draw::begin_page, "Open a page on a ream")),
        ("end_page", BuiltIn::any(draw::end_page, "Close the open page")),
        // Strokes.
        (
            "dash_pattern",
            BuiltIn::dictionary(stroke::dash_pattern, "Build a dash pattern"),
        ),
        (
            "stroke_style",
            BuiltIn::dictionary(stroke::stroke_style, "Build a stroke from a dictionary"),
        ),
        (
            "stroke_derive",
            BuiltIn::dictionary(stroke::stroke_derive, "Derive a stroke with overrides"),
        ),
        (
            "miter_angle",
            BuiltIn::any(stroke::miter_angle, "The miter limit for a join angle in degrees"),
        ),
        (
            "start_stroke",
            BuiltIn::incremental(stroke::start_stroke, "Open a stroke builder"),
        ),
        (
            "stroke_width",
            BuiltIn::incremental(stroke::stroke_width, "Set the stroke width"),
        ),
        (
            "stroke_color",
            BuiltIn::incremental(stroke::stroke_color, "Set the stroke colour"),
        ),
        ("stroke_cap", BuiltIn::incremental(stroke::stroke_cap, "Set the line cap")),
        (
            "stroke_join",
            BuiltIn::incremental(stroke::stroke_join, "Set a round or bevel join"),
        ),
        (
            "stroke_join_r",
            BuiltIn::incremental(stroke::stroke_join_r, "Set a miter join from its limit"),
        ),
        (
            "stroke_dash",
            BuiltIn::incremental(stroke::stroke_dash, "Set the dash pattern"),
        ),
        (
            "stroke_undash",
            BuiltIn::incremental(stroke::stroke_undash, "Make the stroke solid"),
        ),
        (
            "finish_stroke",
            BuiltIn::incremental(stroke::finish_stroke, "Validate and push the stroke"),
        ),
        // Fonts.
        ("font_get", BuiltIn::any(font::font_get, "A built-in font by name")),
        ("font_load", BuiltIn::any(font::font_load, "Load a font file")),
        (
            "font_alter",
            BuiltIn::dictionary(font::font_alter, "Derive a synthetic font"),
        ),
        // Images.
        ("image_load", BuiltIn::any(image::image_load, "Load and validate an image file")),
        // Paths.
        ("start_path", BuiltIn::any(path::start_path, "Open a path builder")),
        ("start_motion", BuiltIn::any(path::start_motion, "Open a motion subpath")),
        ("motion_line", BuiltIn::any(path::motion_line, "Append a line segment")),
        ("motion_curve", BuiltIn::any(path::motion_curve, "Append a cubic segment")),
        (
            "finish_motion",
            BuiltIn::any(path::finish_motion, "Finish the motion subpath, left open"),
        ),
        (
            "close_motion",
            BuiltIn::any(path::close_motion, "Finish the motion subpath, closed"),
        ),
        ("path_rect", BuiltIn::any(path::path_rect, "Append a rectangle subpath")),
        (
            "path_include",
            BuiltIn::any(path::path_include, "Append the subpaths of another path"),
        ),
        (
            "finish_path",
            BuiltIn::any(path::finish_path, "Validate and push the path with a fill rule"),
        ),
        // Transforms.
        ("tx_identity", BuiltIn::any(transform::tx_identity, "The identity transform")),
        ("tx_translate", BuiltIn::any(transform::tx_translate, "A translation")),
        ("tx_rotate", BuiltIn::any(transform::tx_rotate, "A rotation in degrees")),
        ("tx_scale", BuiltIn::any(transform::tx_scale, "A scale")),
        ("tx_skew", BuiltIn::any(transform::tx_skew, "A skew in degrees per axis")),
        (
            "tx_seq",
            BuiltIn::any(transform::tx_seq, "Compose counted transforms, first first"),
        ),
        // Styles.
        ("start_style", BuiltIn::any(style::start_style, "Open a style builder")),
        ("style_font", BuiltIn::any(style::style_font, "Set the font")),
        ("style_size", BuiltIn::any(style::style_size, "Set the font size")),
        ("style_stroke", BuiltIn::any(style::style_stroke, "Set the stroke, or null")),
        ("style_fill", BuiltIn::any(style::style_fill, "Set the fill colour, or null")),
        ("style_cspace", BuiltIn::any(style::style_cspace, "Set the character spacing")),
        ("style_wspace", BuiltIn::any(style::style_wspace, "Set the word spacing")),
        ("style_hscale", BuiltIn::any(style::style_hscale, "Set the horizontal scale")),
        ("style_rise", BuiltIn::any(style::style_rise, "Set the baseline rise")),
        (
            "style_derive",
            BuiltIn::any(style::style_derive, "Reset the builder to a copy of a style"),
        ),
        (
            "finish_style",
            BuiltIn::any(style::finish_style, "Validate and push the style"),
        ),
        (
            "style_setw",
            BuiltIn::any(style::style_setw, "A copy of a style with new word spacing"),
        ),
        (
            "style_setwc",
            BuiltIn::any(
                style::style_setwc,
                "A copy of a style with new word and character spacing",
            ),
        ),
        // Columns.
        ("start_column", BuiltIn::any(column::start_column, "Open a column builder")),
        ("start_line", BuiltIn::any(column::start_line, "Open a line at a baseline start")),
        ("line_span", BuiltIn::any(column::line_span, "Append a styled span")),
        ("finish_line", BuiltIn::any(column::finish_line, "Close the open line")),
        (
            "finish_column",
            BuiltIn::any(column::finish_column, "Validate and push the column"),
        ),
        // Clipping.
        (
            "clip",
            BuiltIn::any(clip::clip, "Build a clipping from counted shape/transform pairs"),
        ),
        // Drawing.
        ("draw_path", BuiltIn::any(draw::draw_path, "Stroke and/or fill a path")),
        ("draw_text", BuiltIn::any(draw::draw_text, "Set a column of text")),
        ("draw_image", BuiltIn::any(draw::draw_image, "Place an image")),
        (
            "draw_embed",
            BuiltIn::incremental(draw::draw_embed, "Draw an embedded source"),
        ),
    ])
}
