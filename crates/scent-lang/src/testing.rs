//! Helpers for writing tests against the evaluator.
//!
//! The mock loaders answer from the path alone, so tests can provoke
//! every validation branch without touching the file system: a path
//! containing `missing` fails to load, `gray`/`indexed` select colour
//! models, `big`, `deep`, `laced` and `alpha` trip the respective
//! image rules.

use crate::error::Error;
use crate::services::*;
use crate::vm::{run_document, Services};
use scent_asm::{Machine, TextAssembler};
use std::collections::HashMap;
use std::rc::Rc;

/// Metrics of a square dummy font: every character maps to glyph 1.
pub struct DummyMetrics;

impl FontMetrics for DummyMetrics {
    fn units_per_em(&self) -> u16 {
        1000
    }
    fn glyph_index(&self, _c: char) -> Option<u16> {
        Some(1)
    }
    fn advance(&self, _glyph: u16) -> Option<u16> {
        Some(500)
    }
    fn kerning(&self, _left: u16, _right: u16) -> Option<i16> {
        None
    }
}

/// A font loader that loads everything except `missing` paths.
#[derive(Default)]
pub struct MockFontLoader;

impl FontLoader for MockFontLoader {
    fn load_truetype(&mut self, path: &str) -> Result<Rc<dyn FontMetrics>, ServiceError> {
        if path.contains("missing") {
            return Err(ServiceError::new(format!["no such font file: {path}"]));
        }
        Ok(Rc::new(DummyMetrics))
    }
}

/// An image loader that invents plausible metadata from the path.
#[derive(Default)]
pub struct MockImageLoader;

impl ImageLoader for MockImageLoader {
    fn load(&mut self, path: &str, _format: ImageFormat) -> Result<ImageInfo, ServiceError> {
        if path.contains("missing") {
            return Err(ServiceError::new(format!["no such image file: {path}"]));
        }
        let side = if path.contains("big") { 20_000 } else { 64 };
        Ok(ImageInfo {
            width: side,
            height: side,
            color: if path.contains("gray") {
                ColorModel::Gray
            } else if path.contains("indexed") {
                ColorModel::Indexed
            } else {
                ColorModel::Rgb
            },
            bits_per_sample: if path.contains("deep") { 16 } else { 8 },
            interlaced: path.contains("laced"),
            has_alpha: path.contains("alpha"),
        })
    }
}

/// An in-memory file system for embedded sources.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: HashMap<String, String>,
}

impl MemoryFileSystem {
    pub fn with(mut self, path: &str, contents: &str) -> MemoryFileSystem {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &str) -> std::io::Result<String> {
        match self.files.get(path) {
            Some(contents) => Ok(contents.clone()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!["no such file: {path}"],
            )),
        }
    }
}

/// Compile a complete source to canonical assembly text.
pub fn compile_to_text(source: &str) -> Result<String, Error> {
    compile_with_files(source, &MemoryFileSystem::default())
}

/// Compile with an in-memory file system for embedded sources.
pub fn compile_with_files(source: &str, fs: &MemoryFileSystem) -> Result<String, Error> {
    let mut machine = Machine::new(TextAssembler::new());
    let mut fonts = MockFontLoader;
    let mut images = MockImageLoader;
    run_document(
        source,
        &mut machine,
        Services {
            fonts: &mut fonts,
            images: &mut images,
            file_system: fs,
        },
    )?;
    Ok(machine.assembler().text().to_string())
}

/// Prefix `body` with the standard document header and compile it,
/// expecting success.
pub fn run_ok(body: &str) -> String {
    let source = format!["@{{ scent 1.0 @}}\n{body}"];
    match compile_to_text(&source) {
        Ok(text) => text,
        Err(err) => panic!["expected success, got: {err}"],
    }
}

/// Prefix `body` with the standard document header and compile it,
/// expecting an error.
pub fn run_err(body: &str) -> Error {
    let source = format!["@{{ scent 1.0 @}}\n{body}"];
    match compile_to_text(&source) {
        Ok(_) => panic!["expected an error"],
        Err(err) => err,
    }
}
