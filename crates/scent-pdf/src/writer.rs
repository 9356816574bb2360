//! The PDF assembler: the assembly strategy that writes a PDF document.
//!
//! Pages accumulate content streams operator by operator; fonts and
//! images become document-level objects. Built-in fonts map to Type1
//! base fonts with byte encoding; loaded TrueType fonts are embedded as
//! Type0/CIDFontType2 with Identity-H encoding and glyph-indexed text,
//! so `write` encodes through the font that is currently selected.

use crate::font::{self, FontCache, LoadedFont};
use crate::image::{self, ImageCache, LoadedImage, Payload};
use pdf_writer::types::{
    CidFontType, FontFlags, LineCapStyle, LineJoinStyle, SystemInfo, TextRenderingMode,
};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};
use scent_asm::{Assembler, BoxCorners, Error, LineCap, LineJoin, PaintRule};
use scent_core::{BuiltInFont, Cmyk, Fixed, Rotation};
use scent_lang::services::ImageFormat;
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::rc::Rc;

enum FontResource {
    Standard {
        family: BuiltInFont,
        obj: Ref,
    },
    Embedded {
        font: Rc<LoadedFont>,
        obj: Ref,
        used_glyphs: BTreeSet<u16>,
    },
}

impl FontResource {
    fn obj(&self) -> Ref {
        match self {
            FontResource::Standard { obj, .. } => *obj,
            FontResource::Embedded { obj, .. } => *obj,
        }
    }
}

struct ImageResource {
    obj: Ref,
}

#[derive(Default)]
struct PageSetup {
    dim: (Fixed, Fixed),
    art: Option<BoxCorners>,
    trim: Option<BoxCorners>,
    bleed: Option<BoxCorners>,
    rotation: Rotation,
}

/// Pending paint flags of the open path.
#[derive(Default, Clone, Copy)]
struct PathPaint {
    stroke: bool,
    fill: Option<PaintRule>,
    clip: Option<PaintRule>,
}

/// An [`Assembler`] that produces a PDF document.
pub struct PdfAssembler {
    pdf: Pdf,
    next_ref: i32,
    catalog: Ref,
    page_tree: Ref,
    pages: Vec<Ref>,
    fonts: HashMap<String, FontResource>,
    images: HashMap<String, ImageResource>,
    font_cache: FontCache,
    image_cache: ImageCache,

    setup: PageSetup,
    content: Content,
    path_paint: PathPaint,
    current_font: Option<String>,
    leading: f32,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        PdfAssembler::new(FontCache::default(), ImageCache::default())
    }
}

impl PdfAssembler {
    /// Create an assembler sharing the given caches with the
    /// evaluator-side loaders.
    pub fn new(font_cache: FontCache, image_cache: ImageCache) -> PdfAssembler {
        let mut assembler = PdfAssembler {
            pdf: Pdf::new(),
            next_ref: 0,
            catalog: Ref::new(1),
            page_tree: Ref::new(2),
            pages: Vec::new(),
            fonts: HashMap::new(),
            images: HashMap::new(),
            font_cache,
            image_cache,
            setup: PageSetup::default(),
            content: Content::new(),
            path_paint: PathPaint::default(),
            current_font: None,
            leading: 0.0,
        };
        assembler.catalog = assembler.alloc();
        assembler.page_tree = assembler.alloc();
        assembler
    }

    /// The finished document. Call through [`scent_asm::Machine::finish`]
    /// first so the terminal state is validated.
    pub fn into_bytes(self) -> Vec<u8> {
        self.pdf.finish()
    }

    fn alloc(&mut self) -> Ref {
        self.next_ref += 1;
        Ref::new(self.next_ref)
    }

    fn f(v: Fixed) -> f32 {
        v.to_f32()
    }

    fn channel(c: u8) -> f32 {
        c as f32 / 255.0
    }

    fn box_rect(b: &BoxCorners) -> Rect {
        Rect::new(
            Self::f(b.x0),
            Self::f(b.y0),
            Self::f(b.x1),
            Self::f(b.y1),
        )
    }

    fn set_cmyk(&mut self, color: Cmyk, stroke: bool) {
        let (c, m, y, k) = (
            Self::channel(color.cyan),
            Self::channel(color.magenta),
            Self::channel(color.yellow),
            Self::channel(color.black),
        );
        if stroke {
            self.content.set_stroke_cmyk(c, m, y, k);
        } else {
            self.content.set_fill_cmyk(c, m, y, k);
        }
    }

    fn write_image_object(&mut self, obj: Ref, image: &LoadedImage) -> Result<(), Error> {
        let (data, filter, gray) = match &image.payload {
            Payload::Dct(data) => (
                data.clone(),
                Filter::DctDecode,
                image.info.color == scent_lang::services::ColorModel::Gray,
            ),
            Payload::Raw { samples, gray } => {
                let mut encoder =
                    flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(samples)
                    .and_then(|_| encoder.finish())
                    .map(|compressed| (compressed, Filter::FlateDecode, *gray))
                    .map_err(|err| {
                        Error::resource(format!["cannot compress image data: {err}"])
                    })?
            }
        };
        let mut xobject = self.pdf.image_xobject(obj, &data);
        xobject.filter(filter);
        xobject.width(image.info.width as i32);
        xobject.height(image.info.height as i32);
        xobject.bits_per_component(8);
        if gray {
            xobject.color_space().device_gray();
        } else {
            xobject.color_space().device_rgb();
        }
        xobject.finish();
        Ok(())
    }

    fn write_standard_font(&mut self, obj: Ref, family: BuiltInFont) {
        let mut font = self.pdf.type1_font(obj);
        font.base_font(Name(family.name().as_bytes()));
        // Symbolic fonts carry their own encodings.
        if !matches!(family, BuiltInFont::Symbol | BuiltInFont::ZapfDingbats) {
            font.encoding_predefined(Name(b"WinAnsiEncoding"));
        }
    }

    fn write_embedded_font(&mut self, obj: Ref, font: &LoadedFont, used: &BTreeSet<u16>) {
        let cid_ref = self.alloc();
        let descriptor_ref = self.alloc();
        let data_ref = self.alloc();
        let base_name = font.base_name.clone();
        let scale = 1000.0 / font.units_per_em as f32;

        let mut type0 = self.pdf.type0_font(obj);
        type0.base_font(Name(base_name.as_bytes()));
        type0.encoding_predefined(Name(b"Identity-H"));
        type0.descendant_font(cid_ref);
        type0.finish();

        let mut cid = self.pdf.cid_font(cid_ref);
        cid.subtype(CidFontType::Type2);
        cid.base_font(Name(base_name.as_bytes()));
        cid.system_info(SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        });
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        {
            // Consecutive runs of used glyphs keep the widths array
            // small.
            let mut widths = cid.widths();
            let mut run: Vec<u16> = Vec::new();
            for &gid in used {
                if let Some(&last) = run.last() {
                    if gid != last + 1 {
                        flush_width_run(&mut widths, &run, font, scale);
                        run.clear();
                    }
                }
                run.push(gid);
            }
            flush_width_run(&mut widths, &run, font, scale);
        }
        cid.finish();

        let mut descriptor = self.pdf.font_descriptor(descriptor_ref);
        descriptor.name(Name(base_name.as_bytes()));
        descriptor.flags(FontFlags::NON_SYMBOLIC);
        descriptor.bbox(Rect::new(
            font.bbox[0] as f32 * scale,
            font.bbox[1] as f32 * scale,
            font.bbox[2] as f32 * scale,
            font.bbox[3] as f32 * scale,
        ));
        descriptor.italic_angle(font.italic_angle);
        descriptor.ascent(font.ascent as f32 * scale);
        descriptor.descent(font.descent as f32 * scale);
        descriptor.cap_height(font.cap_height as f32 * scale);
        descriptor.stem_v(80.0);
        descriptor.font_file2(data_ref);
        descriptor.finish();

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        let compressed = encoder
            .write_all(&font.data)
            .and_then(|_| encoder.finish())
            .unwrap_or_else(|_| font.data.clone());
        self.pdf
            .stream(data_ref, &compressed)
            .filter(Filter::FlateDecode);
    }
}

fn flush_width_run(
    widths: &mut pdf_writer::writers::Widths,
    run: &[u16],
    font: &LoadedFont,
    scale: f32,
) {
    let first = match run.first() {
        None => return,
        Some(first) => *first,
    };
    widths.consecutive(
        first,
        run.iter()
            .map(|&gid| font.advance(gid).unwrap_or(0) as f32 * scale),
    );
}

use scent_lang::services::FontMetrics;

impl Assembler for PdfAssembler {
    fn font_standard(&mut self, name: &str, family: BuiltInFont) -> Result<(), Error> {
        let obj = self.alloc();
        self.fonts
            .insert(name.into(), FontResource::Standard { family, obj });
        Ok(())
    }

    fn font_file(&mut self, name: &str, path: &str) -> Result<(), Error> {
        let font = font::load_cached(&self.font_cache, path)
            .map_err(|err| Error::resource(err.to_string()))?;
        let obj = self.alloc();
        self.fonts.insert(
            name.into(),
            FontResource::Embedded {
                font,
                obj,
                used_glyphs: BTreeSet::new(),
            },
        );
        Ok(())
    }

    fn image_jpeg(&mut self, name: &str, path: &str) -> Result<(), Error> {
        self.load_image(name, path, ImageFormat::Jpeg)
    }

    fn image_png(&mut self, name: &str, path: &str) -> Result<(), Error> {
        self.load_image(name, path, ImageFormat::Png)
    }

    fn begin_page(&mut self) -> Result<(), Error> {
        self.setup = PageSetup::default();
        Ok(())
    }

    fn dim(&mut self, width: Fixed, height: Fixed) -> Result<(), Error> {
        self.setup.dim = (width, height);
        Ok(())
    }

    fn art_box(&mut self, corners: BoxCorners) -> Result<(), Error> {
        self.setup.art = Some(corners);
        Ok(())
    }

    fn trim_box(&mut self, corners: BoxCorners) -> Result<(), Error> {
        self.setup.trim = Some(corners);
        Ok(())
    }

    fn bleed_box(&mut self, corners: BoxCorners) -> Result<(), Error> {
        self.setup.bleed = Some(corners);
        Ok(())
    }

    fn view_rotate(&mut self, rotation: Rotation) -> Result<(), Error> {
        self.setup.rotation = rotation;
        Ok(())
    }

    fn body(&mut self) -> Result<(), Error> {
        self.content = Content::new();
        // The page-wide wrapper keeps drawings from leaking state.
        self.content.save_state();
        self.current_font = None;
        self.leading = 0.0;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), Error> {
        self.content.restore_state();
        let content_ref = self.alloc();
        let page_ref = self.alloc();
        let content = std::mem::replace(&mut self.content, Content::new());
        self.pdf.stream(content_ref, &content.finish());

        let (width, height) = self.setup.dim;
        let mut page = self.pdf.page(page_ref);
        page.parent(self.page_tree);
        page.media_box(Rect::new(0.0, 0.0, Self::f(width), Self::f(height)));
        if let Some(b) = &self.setup.art {
            page.art_box(Self::box_rect(b));
        }
        if let Some(b) = &self.setup.trim {
            page.trim_box(Self::box_rect(b));
        }
        if let Some(b) = &self.setup.bleed {
            page.bleed_box(Self::box_rect(b));
        }
        if self.setup.rotation != Rotation::None {
            page.rotate(self.setup.rotation.degrees());
        }
        page.contents(content_ref);
        let mut resources = page.resources();
        if !self.fonts.is_empty() {
            let mut fonts = resources.fonts();
            for (name, resource) in &self.fonts {
                fonts.pair(Name(name.as_bytes()), resource.obj());
            }
        }
        if !self.images.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, resource) in &self.images {
                xobjects.pair(Name(name.as_bytes()), resource.obj);
            }
        }
        resources.finish();
        page.finish();
        self.pages.push(page_ref);
        Ok(())
    }

    fn save(&mut self) -> Result<(), Error> {
        self.content.save_state();
        Ok(())
    }

    fn restore(&mut self) -> Result<(), Error> {
        self.content.restore_state();
        Ok(())
    }

    fn matrix(&mut self, m: [Fixed; 6]) -> Result<(), Error> {
        self.content.transform(m.map(Self::f));
        Ok(())
    }

    fn line_width(&mut self, width: Fixed) -> Result<(), Error> {
        self.content.set_line_width(Self::f(width));
        Ok(())
    }

    fn line_cap(&mut self, cap: LineCap) -> Result<(), Error> {
        self.content.set_line_cap(match cap {
            LineCap::Butt => LineCapStyle::ButtCap,
            LineCap::Round => LineCapStyle::RoundCap,
            LineCap::Square => LineCapStyle::ProjectingSquareCap,
        });
        Ok(())
    }

    fn line_join(&mut self, join: LineJoin) -> Result<(), Error> {
        match join {
            LineJoin::Miter(limit) => {
                self.content.set_line_join(LineJoinStyle::MiterJoin);
                self.content.set_miter_limit(Self::f(limit));
            }
            LineJoin::Round => {
                self.content.set_line_join(LineJoinStyle::RoundJoin);
            }
            LineJoin::Bevel => {
                self.content.set_line_join(LineJoinStyle::BevelJoin);
            }
        }
        Ok(())
    }

    fn line_dash(&mut self, phase: Fixed, dashes: &[Fixed]) -> Result<(), Error> {
        self.content
            .set_dash_pattern(dashes.iter().map(|d| Self::f(*d)), Self::f(phase));
        Ok(())
    }

    fn line_undash(&mut self) -> Result<(), Error> {
        self.content.set_dash_pattern([], 0.0);
        Ok(())
    }

    fn stroke_color(&mut self, color: Cmyk) -> Result<(), Error> {
        self.set_cmyk(color, true);
        Ok(())
    }

    fn fill_color(&mut self, color: Cmyk) -> Result<(), Error> {
        self.set_cmyk(color, false);
        Ok(())
    }

    fn image(&mut self, name: &str) -> Result<(), Error> {
        self.content.x_object(Name(name.as_bytes()));
        Ok(())
    }

    fn begin_path(
        &mut self,
        stroke: bool,
        fill: Option<PaintRule>,
        clip: Option<PaintRule>,
    ) -> Result<(), Error> {
        self.path_paint = PathPaint { stroke, fill, clip };
        Ok(())
    }

    fn move_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        self.content.move_to(Self::f(x), Self::f(y));
        Ok(())
    }

    fn line_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        self.content.line_to(Self::f(x), Self::f(y));
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
        self.content.cubic_to(
            Self::f(x1),
            Self::f(y1),
            Self::f(x2),
            Self::f(y2),
            Self::f(x3),
            Self::f(y3),
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.content.close_path();
        Ok(())
    }

    fn rect(&mut self, x: Fixed, y: Fixed, width: Fixed, height: Fixed) -> Result<(), Error> {
        self.content
            .rect(Self::f(x), Self::f(y), Self::f(width), Self::f(height));
        Ok(())
    }

    fn end_path(&mut self) -> Result<(), Error> {
        let paint = self.path_paint;
        match paint.clip {
            Some(PaintRule::Nonzero) => {
                self.content.clip_nonzero();
            }
            Some(PaintRule::EvenOdd) => {
                self.content.clip_even_odd();
            }
            None => (),
        }
        match (paint.stroke, paint.fill) {
            (true, None) => {
                self.content.stroke();
            }
            (true, Some(PaintRule::Nonzero)) => {
                self.content.fill_nonzero_and_stroke();
            }
            (true, Some(PaintRule::EvenOdd)) => {
                self.content.fill_even_odd_and_stroke();
            }
            (false, Some(PaintRule::Nonzero)) => {
                self.content.fill_nonzero();
            }
            (false, Some(PaintRule::EvenOdd)) => {
                self.content.fill_even_odd();
            }
            (false, None) => {
                self.content.end_path();
            }
        }
        Ok(())
    }

    fn begin_text(&mut self, _clip: bool) -> Result<(), Error> {
        self.content.begin_text();
        Ok(())
    }

    fn char_space(&mut self, space: Fixed) -> Result<(), Error> {
        self.content.set_char_spacing(Self::f(space));
        Ok(())
    }

    fn word_space(&mut self, space: Fixed) -> Result<(), Error> {
        self.content.set_word_spacing(Self::f(space));
        Ok(())
    }

    fn h_scale(&mut self, scale: Fixed) -> Result<(), Error> {
        // The operator takes a percentage.
        self.content.set_horizontal_scaling(Self::f(scale) * 100.0);
        Ok(())
    }

    fn lead(&mut self, leading: Fixed) -> Result<(), Error> {
        self.leading = Self::f(leading);
        self.content.set_leading(self.leading);
        Ok(())
    }

    fn font(&mut self, name: &str, size: Fixed) -> Result<(), Error> {
        self.content.set_font(Name(name.as_bytes()), Self::f(size));
        self.current_font = Some(name.into());
        Ok(())
    }

    fn text_render(&mut self, mode: u8) -> Result<(), Error> {
        self.content.set_text_rendering_mode(match mode {
            0 => TextRenderingMode::Fill,
            1 => TextRenderingMode::Stroke,
            2 => TextRenderingMode::FillStroke,
            3 => TextRenderingMode::Invisible,
            4 => TextRenderingMode::FillClip,
            5 => TextRenderingMode::StrokeClip,
            6 => TextRenderingMode::FillStrokeClip,
            _ => TextRenderingMode::Clip,
        });
        Ok(())
    }

    fn rise(&mut self, rise: Fixed) -> Result<(), Error> {
        self.content.set_rise(Self::f(rise));
        Ok(())
    }

    fn advance(&mut self, offset: Option<(Fixed, Fixed)>) -> Result<(), Error> {
        match offset {
            Some((x, y)) => {
                self.content.next_line(Self::f(x), Self::f(y));
            }
            None => {
                // The equivalent of the next-line operator.
                self.content.next_line(0.0, -self.leading);
            }
        }
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), Error> {
        let name = self
            .current_font
            .clone()
            .ok_or_else(|| Error::state("no font is selected"))?;
        let resource = self
            .fonts
            .get_mut(&name)
            .ok_or_else(|| Error::name(format!["no font named `{name}`"]))?;
        let bytes = match resource {
            FontResource::Standard { .. } => text
                .chars()
                .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
                .collect::<Vec<u8>>(),
            FontResource::Embedded { font, used_glyphs, .. } => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for c in text.chars() {
                    let gid = font.glyph_index(c).unwrap_or(0);
                    used_glyphs.insert(gid);
                    bytes.extend_from_slice(&gid.to_be_bytes());
                }
                bytes
            }
        };
        self.content.show(Str(&bytes));
        Ok(())
    }

    fn end_text(&mut self) -> Result<(), Error> {
        self.content.end_text();
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        let fonts = std::mem::take(&mut self.fonts);
        for resource in fonts.values() {
            match resource {
                FontResource::Standard { family, obj } => {
                    self.write_standard_font(*obj, *family);
                }
                FontResource::Embedded {
                    font,
                    obj,
                    used_glyphs,
                } => {
                    self.write_embedded_font(*obj, font, used_glyphs);
                }
            }
        }
        self.fonts = fonts;
        self.pdf
            .pages(self.page_tree)
            .kids(self.pages.iter().copied())
            .count(self.pages.len() as i32);
        self.pdf.catalog(self.catalog).pages(self.page_tree);
        Ok(())
    }
}

impl PdfAssembler {
    fn load_image(&mut self, name: &str, path: &str, format: ImageFormat) -> Result<(), Error> {
        let image = image::load_cached(&self.image_cache, path, format)
            .map_err(|err| Error::resource(err.to_string()))?;
        image
            .info
            .validate(format)
            .map_err(|err| Error::domain(format!["{path}: {err}"]))?;
        let obj = self.alloc();
        self.write_image_object(obj, &image)?;
        self.images.insert(name.into(), ImageResource { obj });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scent_asm::Machine;

    fn assemble(source: &str) -> Vec<u8> {
        let mut machine = Machine::new(PdfAssembler::default());
        machine.run_source(source).unwrap();
        machine.finish().unwrap().into_bytes()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn hello_world_document() {
        let bytes = assemble(
            "scent-assembly 1.0\n\
             font_standard F1 Helvetica\n\
             begin page\n\
             dim 200 100\n\
             art_box 10 10 190 90\n\
             body\n\
             begin text -\n\
             font F1 12\n\
             advance 20 50\n\
             write \"Hello\"\n\
             end text\n\
             end page\n",
        );
        assert![bytes.starts_with(b"%PDF-")];
        // The content stream is uncompressed, so the shown text and the
        // base font name are visible in the output.
        assert![contains(&bytes, b"Hello")];
        assert![contains(&bytes, b"Helvetica")];
        assert![contains(&bytes, b"/ArtBox")];
    }

    #[test]
    fn two_pages_share_resources() {
        let page = "begin page\ndim 100 100\nbody\n\
            begin path stroke - -\nmove 10 10\nline 90 90\nend path\n\
            end page\n";
        let bytes = assemble(&format![
            "scent-assembly 1.0\nfont_standard F1 Courier\n{page}{page}"
        ]);
        assert![bytes.starts_with(b"%PDF-")];
        assert![contains(&bytes, b"/Count 2")];
    }

    #[test]
    fn png_images_embed() {
        // Encode a tiny RGB PNG, run it through the whole pipeline.
        let path = std::env::temp_dir().join("scent-pdf-test-rgb.png");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), 2, 2);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer
            .write_image_data(&[255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255])
            .unwrap();
        writer.finish().unwrap();

        let source = format![
            "scent-assembly 1.0\n\
             image_png I1 \"{}\"\n\
             begin page\ndim 100 100\nbody\n\
             matrix 50 0 0 50 10 10\nimage I1\n\
             end page\n",
            path.display()
        ];
        let bytes = assemble(&source);
        assert![contains(&bytes, b"/XObject")];
        assert![contains(&bytes, b"/FlateDecode")];
        let _ = std::fs::remove_file(&path);
    }
}
