//! External services the evaluator consumes as black boxes.
//!
//! Font parsing, image decoding and file access are out of scope for the
//! language core; they are reached through these traits so the evaluator
//! can be driven with mocks in unit tests and with real decoders (the
//! `scent-pdf` crate) in production.

use std::rc::Rc;

/// An error reported by a loader service. The evaluator surfaces it as a
/// resource error.
#[derive(Debug)]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new<T: Into<String>>(message: T) -> ServiceError {
        ServiceError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Metrics of a loaded font.
pub trait FontMetrics {
    fn units_per_em(&self) -> u16;

    /// The glyph for a character, if the font covers it.
    fn glyph_index(&self, c: char) -> Option<u16>;

    /// The horizontal advance of a glyph in font units.
    fn advance(&self, glyph: u16) -> Option<u16>;

    /// The kerning adjustment between two glyphs in font units.
    fn kerning(&self, left: u16, right: u16) -> Option<i16>;
}

/// Loads font files and returns opaque metric handles.
pub trait FontLoader {
    fn load_truetype(&mut self, path: &str) -> Result<Rc<dyn FontMetrics>, ServiceError>;
}

/// The image formats the languages accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// The colour model of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorModel {
    Gray,
    /// RGB, or YCbCr in JPEG terms.
    Rgb,
    /// Palette-indexed RGB; PNG only.
    Indexed,
    /// Four-channel JPEG; reported by loaders, rejected by validation.
    Cmyk,
}

/// Facts about an image file, as reported by the loader.
///
/// The loader reports; the evaluator judges. Domain validation (size
/// limits, interlacing, alpha, bit depth) happens at the `image_load`
/// operation so that the rules live with the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub color: ColorModel,
    pub bits_per_sample: u8,
    pub interlaced: bool,
    pub has_alpha: bool,
}

/// Largest accepted image side length, in pixels.
pub const MAX_IMAGE_SIDE: u32 = 16_384;

impl ImageInfo {
    /// Check the facts against the accepted image subset: sides within
    /// [1, 16384], at most 8 bits per sample, no interlacing, no alpha,
    /// and a colour model of grey, RGB or (for PNG) indexed RGB.
    pub fn validate(&self, format: ImageFormat) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("the image is empty".into());
        }
        if self.width > MAX_IMAGE_SIDE || self.height > MAX_IMAGE_SIDE {
            return Err(format![
                "the image is {}x{}; the limit is {MAX_IMAGE_SIDE} per side",
                self.width, self.height
            ]);
        }
        if self.bits_per_sample > 8 {
            return Err(format![
                "the image has {} bits per sample; the limit is 8",
                self.bits_per_sample
            ]);
        }
        if self.interlaced {
            return Err("the image is interlaced".into());
        }
        if self.has_alpha {
            return Err("the image has an alpha channel".into());
        }
        match self.color {
            ColorModel::Gray | ColorModel::Rgb => Ok(()),
            ColorModel::Indexed if format == ImageFormat::Png => Ok(()),
            ColorModel::Indexed => {
                Err("indexed colour is only accepted for PNG images".into())
            }
            ColorModel::Cmyk => Err("four-channel colour is not accepted".into()),
        }
    }
}

/// Loads image files and returns validated facts about them.
pub trait ImageLoader {
    fn load(&mut self, path: &str, format: ImageFormat) -> Result<ImageInfo, ServiceError>;
}

/// File system access, extracted so embedded sources can be supplied
/// from memory in tests.
pub trait FileSystem {
    fn read_to_string(&self, path: &str) -> std::io::Result<String>;
}

/// The real file system.
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}
