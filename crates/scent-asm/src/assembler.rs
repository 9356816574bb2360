//! Assembler strategies driven by the [`Machine`](crate::Machine).
//!
//! The machine validates every instruction once and then calls exactly
//! one hook per instruction on its assembler. Implementations therefore
//! never need to re-check modes, arities or argument domains. All hooks
//! default to doing nothing, so test assemblers can implement only what
//! they observe.

use crate::inst::{BoxCorners, LineCap, LineJoin, PaintRule};
use crate::Error;
use scent_core::{BuiltInFont, Cmyk, Fixed, Rotation};

/// Strategy interface with one hook per assembly instruction.
#[allow(unused_variables)]
pub trait Assembler {
    fn font_standard(&mut self, name: &str, family: BuiltInFont) -> Result<(), Error> {
        Ok(())
    }
    fn font_file(&mut self, name: &str, path: &str) -> Result<(), Error> {
        Ok(())
    }
    fn image_jpeg(&mut self, name: &str, path: &str) -> Result<(), Error> {
        Ok(())
    }
    fn image_png(&mut self, name: &str, path: &str) -> Result<(), Error> {
        Ok(())
    }

    fn begin_page(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn dim(&mut self, width: Fixed, height: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn art_box(&mut self, corners: BoxCorners) -> Result<(), Error> {
        Ok(())
    }
    fn trim_box(&mut self, corners: BoxCorners) -> Result<(), Error> {
        Ok(())
    }
    fn bleed_box(&mut self, corners: BoxCorners) -> Result<(), Error> {
        Ok(())
    }
    fn view_rotate(&mut self, rotation: Rotation) -> Result<(), Error> {
        Ok(())
    }
    fn body(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn end_page(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn save(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn restore(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn matrix(&mut self, m: [Fixed; 6]) -> Result<(), Error> {
        Ok(())
    }
    fn line_width(&mut self, width: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn line_cap(&mut self, cap: LineCap) -> Result<(), Error> {
        Ok(())
    }
    fn line_join(&mut self, join: LineJoin) -> Result<(), Error> {
        Ok(())
    }
    fn line_dash(&mut self, phase: Fixed, dashes: &[Fixed]) -> Result<(), Error> {
        Ok(())
    }
    fn line_undash(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn stroke_color(&mut self, color: Cmyk) -> Result<(), Error> {
        Ok(())
    }
    fn fill_color(&mut self, color: Cmyk) -> Result<(), Error> {
        Ok(())
    }
    fn image(&mut self, name: &str) -> Result<(), Error> {
        Ok(())
    }

    fn begin_path(
        &mut self,
        stroke: bool,
        fill: Option<PaintRule>,
        clip: Option<PaintRule>,
    ) -> Result<(), Error> {
        Ok(())
    }
    fn move_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn line_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        Ok(())
    }
    #[allow(clippy::too_many_arguments)]
    fn curve_to(
        &mut self,
        x1: Fixed,
        y1: Fixed,
        x2: Fixed,
        y2: Fixed,
        x3: Fixed,
        y3: Fixed,
    ) -> Result<(), Error> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
    fn rect(&mut self, x: Fixed, y: Fixed, width: Fixed, height: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn end_path(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn begin_text(&mut self, clip: bool) -> Result<(), Error> {
        Ok(())
    }
    fn char_space(&mut self, space: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn word_space(&mut self, space: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn h_scale(&mut self, scale: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn lead(&mut self, leading: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn font(&mut self, name: &str, size: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn text_render(&mut self, mode: u8) -> Result<(), Error> {
        Ok(())
    }
    fn rise(&mut self, rise: Fixed) -> Result<(), Error> {
        Ok(())
    }
    fn advance(&mut self, offset: Option<(Fixed, Fixed)>) -> Result<(), Error> {
        Ok(())
    }
    fn write(&mut self, text: &str) -> Result<(), Error> {
        Ok(())
    }
    fn end_text(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Called once when the machine finishes.
    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// An assembler that re-emits canonical Scent assembly text.
///
/// Useful for inspecting what the evaluator lowers a document to, and as
/// the reference output format in tests.
#[derive(Debug)]
pub struct TextAssembler {
    out: String,
}

impl Default for TextAssembler {
    fn default() -> Self {
        TextAssembler::new()
    }
}

impl TextAssembler {
    pub fn new() -> TextAssembler {
        let mut asm = TextAssembler { out: String::new() };
        asm.push_line(crate::HEADER);
        asm
    }

    /// The text emitted so far.
    pub fn text(&self) -> &str {
        &self.out
    }

    pub fn into_text(self) -> String {
        self.out
    }

    fn push_line(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn quote(text: &str) -> String {
        let mut s = String::with_capacity(text.len() + 2);
        s.push('"');
        for c in text.chars() {
            match c {
                '\\' => s.push_str(r"\\"),
                '"' => s.push_str(r"\'"),
                other => s.push(other),
            }
        }
        s.push('"');
        s
    }
}

fn rule_slot(rule: Option<PaintRule>) -> &'static str {
    match rule {
        None => "-",
        Some(rule) => rule.keyword(),
    }
}

impl Assembler for TextAssembler {
    fn font_standard(&mut self, name: &str, family: BuiltInFont) -> Result<(), Error> {
        self.push_line(&format!["font_standard {name} {family}"]);
        Ok(())
    }
    fn font_file(&mut self, name: &str, path: &str) -> Result<(), Error> {
        self.push_line(&format!["font_file {name} truetype {}", Self::quote(path)]);
        Ok(())
    }
    fn image_jpeg(&mut self, name: &str, path: &str) -> Result<(), Error> {
        self.push_line(&format!["image_jpeg {name} {}", Self::quote(path)]);
        Ok(())
    }
    fn image_png(&mut self, name: &str, path: &str) -> Result<(), Error> {
        self.push_line(&format!["image_png {name} {}", Self::quote(path)]);
        Ok(())
    }
    fn begin_page(&mut self) -> Result<(), Error> {
        self.push_line("begin page");
        Ok(())
    }
    fn dim(&mut self, width: Fixed, height: Fixed) -> Result<(), Error> {
        self.push_line(&format!["dim {width} {height}"]);
        Ok(())
    }
    fn art_box(&mut self, b: BoxCorners) -> Result<(), Error> {
        self.push_line(&format!["art_box {} {} {} {}", b.x0, b.y0, b.x1, b.y1]);
        Ok(())
    }
    fn trim_box(&mut self, b: BoxCorners) -> Result<(), Error> {
        self.push_line(&format!["trim_box {} {} {} {}", b.x0, b.y0, b.x1, b.y1]);
        Ok(())
    }
    fn bleed_box(&mut self, b: BoxCorners) -> Result<(), Error> {
        self.push_line(&format!["bleed_box {} {} {} {}", b.x0, b.y0, b.x1, b.y1]);
        Ok(())
    }
    fn view_rotate(&mut self, rotation: Rotation) -> Result<(), Error> {
        self.push_line(&format!["view_rotate {}", rotation.degrees()]);
        Ok(())
    }
    fn body(&mut self) -> Result<(), Error> {
        self.push_line("body");
        Ok(())
    }
    fn end_page(&mut self) -> Result<(), Error> {
        self.push_line("end page");
        Ok(())
    }
    fn save(&mut self) -> Result<(), Error> {
        self.push_line("save");
        Ok(())
    }
    fn restore(&mut self) -> Result<(), Error> {
        self.push_line("restore");
        Ok(())
    }
    fn matrix(&mut self, m: [Fixed; 6]) -> Result<(), Error> {
        self.push_line(&format![
            "matrix {} {} {} {} {} {}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        ]);
        Ok(())
    }
    fn line_width(&mut self, width: Fixed) -> Result<(), Error> {
        self.push_line(&format!["line_width {width}"]);
        Ok(())
    }
    fn line_cap(&mut self, cap: LineCap) -> Result<(), Error> {
        self.push_line(&format!["line_cap {}", cap.keyword()]);
        Ok(())
    }
    fn line_join(&mut self, join: LineJoin) -> Result<(), Error> {
        match join {
            LineJoin::Miter(limit) => self.push_line(&format!["line_join miter {limit}"]),
            LineJoin::Round => self.push_line("line_join round"),
            LineJoin::Bevel => self.push_line("line_join bevel"),
        }
        Ok(())
    }
    fn line_dash(&mut self, phase: Fixed, dashes: &[Fixed]) -> Result<(), Error> {
        let mut line = format!["line_dash {phase}"];
        for d in dashes {
            line.push(' ');
            line.push_str(&d.to_string());
        }
        self.push_line(&line);
        Ok(())
    }
    fn line_undash(&mut self) -> Result<(), Error> {
        self.push_line("line_undash");
        Ok(())
    }
    fn stroke_color(&mut self, color: Cmyk) -> Result<(), Error> {
        self.push_line(&format!["stroke_color {color}"]);
        Ok(())
    }
    fn fill_color(&mut self, color: Cmyk) -> Result<(), Error> {
        self.push_line(&format!["fill_color {color}"]);
        Ok(())
    }
    fn image(&mut self, name: &str) -> Result<(), Error> {
        self.push_line(&format!["image {name}"]);
        Ok(())
    }
    fn begin_path(
        &mut self,
        stroke: bool,
        fill: Option<PaintRule>,
        clip: Option<PaintRule>,
    ) -> Result<(), Error> {
        self.push_line(&format![
            "begin path {} {} {}",
            if stroke { "stroke" } else { "-" },
            rule_slot(fill),
            rule_slot(clip),
        ]);
        Ok(())
    }
    fn move_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        self.push_line(&format!["move {x} {y}"]);
        Ok(())
    }
    fn line_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        self.push_line(&format!["line {x} {y}"]);
        Ok(())
    }
    fn curve_to(
        &mut self,
        x1: Fixed,
        y1: Fixed,
        x2: Fixed,
        y2: Fixed,
        x3: Fixed,
        y3: Fixed,
    ) -> Result<(), Error> {
        self.push_line(&format!["curve {x1} {y1} {x2} {y2} {x3} {y3}"]);
        Ok(())
    }
    fn close(&mut self) -> Result<(), Error> {
        self.push_line("close");
        Ok(())
    }
    fn rect(&mut self, x: Fixed, y: Fixed, width: Fixed, height: Fixed) -> Result<(), Error> {
        self.push_line(&format!["rect {x} {y} {width} {height}"]);
        Ok(())
    }
    fn end_path(&mut self) -> Result<(), Error> {
        self.push_line("end path");
        Ok(())
    }
    fn begin_text(&mut self, clip: bool) -> Result<(), Error> {
        self.push_line(&format!["begin text {}", if clip { "clip" } else { "-" }]);
        Ok(())
    }
    fn char_space(&mut self, space: Fixed) -> Result<(), Error> {
        self.push_line(&format!["cspace {space}"]);
        Ok(())
    }
    fn word_space(&mut self, space: Fixed) -> Result<(), Error> {
        self.push_line(&format!["wspace {space}"]);
        Ok(())
    }
    fn h_scale(&mut self, scale: Fixed) -> Result<(), Error> {
        self.push_line(&format!["hscale {scale}"]);
        Ok(())
    }
    fn lead(&mut self, leading: Fixed) -> Result<(), Error> {
        self.push_line(&format!["lead {leading}"]);
        Ok(())
    }
    fn font(&mut self, name: &str, size: Fixed) -> Result<(), Error> {
        self.push_line(&format!["font {name} {size}"]);
        Ok(())
    }
    fn text_render(&mut self, mode: u8) -> Result<(), Error> {
        self.push_line(&format!["text_render {mode}"]);
        Ok(())
    }
    fn rise(&mut self, rise: Fixed) -> Result<(), Error> {
        self.push_line(&format!["rise {rise}"]);
        Ok(())
    }
    fn advance(&mut self, offset: Option<(Fixed, Fixed)>) -> Result<(), Error> {
        match offset {
            None => self.push_line("advance"),
            Some((x, y)) => self.push_line(&format!["advance {x} {y}"]),
        }
        Ok(())
    }
    fn write(&mut self, text: &str) -> Result<(), Error> {
        self.push_line(&format!["write {}", Self::quote(text)]);
        Ok(())
    }
    fn end_text(&mut self) -> Result<(), Error> {
        self.push_line("end text");
        Ok(())
    }
}
