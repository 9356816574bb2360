//! TrueType font loading.
//!
//! Font files are parsed once with `ttf-parser`; the character map and
//! the advance widths are captured eagerly so the loaded font owns no
//! borrowed state. Kerning is looked up on demand by re-parsing the
//! face, which is a cheap zero-copy operation.

use scent_lang::services::{FontLoader, FontMetrics, ServiceError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use ttf_parser::{Face, GlyphId};

/// A cache of loaded fonts keyed by path, shared between the
/// evaluator-side loader and the PDF assembler.
pub type FontCache = Rc<RefCell<HashMap<String, Rc<LoadedFont>>>>;

/// A parsed TrueType font.
pub struct LoadedFont {
    pub data: Vec<u8>,
    pub units_per_em: u16,
    /// A PDF-safe name derived from the file stem.
    pub base_name: String,
    pub ascent: i16,
    pub descent: i16,
    pub cap_height: i16,
    pub italic_angle: f32,
    /// x_min, y_min, x_max, y_max in font units.
    pub bbox: [i16; 4],
    cmap: HashMap<u32, u16>,
    advances: Vec<u16>,
}

impl LoadedFont {
    pub fn load(path: &str) -> Result<LoadedFont, ServiceError> {
        let data = std::fs::read(path)
            .map_err(|err| ServiceError::new(format!["cannot read {path}: {err}"]))?;
        Self::parse(data, path)
    }

    pub fn parse(data: Vec<u8>, path: &str) -> Result<LoadedFont, ServiceError> {
        let face = Face::parse(&data, 0)
            .map_err(|err| ServiceError::new(format!["cannot parse {path}: {err}"]))?;
        let mut cmap = HashMap::new();
        if let Some(subtables) = face.tables().cmap {
            for subtable in subtables.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(glyph) = subtable.glyph_index(cp) {
                        cmap.entry(cp).or_insert(glyph.0);
                    }
                });
            }
        }
        if cmap.is_empty() {
            return Err(ServiceError::new(format![
                "{path} has no usable Unicode character map"
            ]));
        }
        let advances = (0..face.number_of_glyphs())
            .map(|gid| face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0))
            .collect();
        let bbox = face.global_bounding_box();
        Ok(LoadedFont {
            units_per_em: face.units_per_em(),
            base_name: base_name_from_path(path),
            ascent: face.ascender(),
            descent: face.descender(),
            cap_height: face.capital_height().unwrap_or(face.ascender()),
            italic_angle: face.italic_angle(),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            cmap,
            advances,
            data,
        })
    }

    pub fn glyph_count(&self) -> u16 {
        self.advances.len() as u16
    }
}

impl FontMetrics for LoadedFont {
    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn glyph_index(&self, c: char) -> Option<u16> {
        self.cmap.get(&(c as u32)).copied()
    }

    fn advance(&self, glyph: u16) -> Option<u16> {
        self.advances.get(glyph as usize).copied()
    }

    fn kerning(&self, left: u16, right: u16) -> Option<i16> {
        let face = Face::parse(&self.data, 0).ok()?;
        let kern = face.tables().kern?;
        for subtable in kern.subtables {
            if !subtable.horizontal || subtable.variable {
                continue;
            }
            if let Some(adjust) = subtable.glyphs_kerning(GlyphId(left), GlyphId(right)) {
                return Some(adjust);
            }
        }
        None
    }
}

/// A PDF name must avoid delimiters and whitespace; keep it simple and
/// alphanumeric.
fn base_name_from_path(path: &str) -> String {
    let stem = std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Font");
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if cleaned.is_empty() {
        "Font".into()
    } else {
        cleaned
    }
}

/// The evaluator-side font loader, backed by the real file system and a
/// shared cache.
#[derive(Default)]
pub struct FileFontLoader {
    cache: FontCache,
}

impl FileFontLoader {
    pub fn new(cache: FontCache) -> FileFontLoader {
        FileFontLoader { cache }
    }

    pub fn cache(&self) -> FontCache {
        self.cache.clone()
    }
}

/// Load through a cache, reading the file only on the first request.
pub fn load_cached(cache: &FontCache, path: &str) -> Result<Rc<LoadedFont>, ServiceError> {
    if let Some(font) = cache.borrow().get(path) {
        return Ok(font.clone());
    }
    let font = Rc::new(LoadedFont::load(path)?);
    cache.borrow_mut().insert(path.into(), font.clone());
    Ok(font)
}

impl FontLoader for FileFontLoader {
    fn load_truetype(&mut self, path: &str) -> Result<Rc<dyn FontMetrics>, ServiceError> {
        Ok(load_cached(&self.cache, path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_names_are_pdf_safe() {
        assert_eq![base_name_from_path("fonts/DejaVu Sans.ttf"), "DejaVuSans"];
        assert_eq![base_name_from_path("x/.ttf"), "Font"];
        assert_eq![base_name_from_path("Nimbus-Roman.ttf"), "Nimbus-Roman"];
    }
}
