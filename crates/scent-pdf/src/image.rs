//! JPEG and PNG loading.
//!
//! JPEG files keep their original bytes and are embedded with the DCT
//! filter; PNG files are decoded to raw samples (palettes expanded to
//! RGB) and re-compressed with Flate when embedded.

use scent_lang::services::{ColorModel, ImageFormat, ImageInfo, ImageLoader, ServiceError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::BufReader;
use std::rc::Rc;

/// A cache of loaded images keyed by path, shared between the
/// evaluator-side loader and the PDF assembler.
pub type ImageCache = Rc<RefCell<HashMap<String, Rc<LoadedImage>>>>;

/// A loaded image: the reported facts plus the bytes to embed.
pub struct LoadedImage {
    pub info: ImageInfo,
    pub payload: Payload,
}

/// How the image reaches the PDF.
pub enum Payload {
    /// Original JPEG bytes, embedded with `/DCTDecode`.
    Dct(Vec<u8>),
    /// Decoded samples, Flate-compressed on embedding. `gray` selects
    /// the one-channel colour space.
    Raw { samples: Vec<u8>, gray: bool },
}

pub fn load(path: &str, format: ImageFormat) -> Result<LoadedImage, ServiceError> {
    match format {
        ImageFormat::Jpeg => load_jpeg(path),
        ImageFormat::Png => load_png(path),
    }
}

fn load_jpeg(path: &str) -> Result<LoadedImage, ServiceError> {
    let file = std::fs::File::open(path)
        .map_err(|err| ServiceError::new(format!["cannot read {path}: {err}"]))?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    decoder
        .read_info()
        .map_err(|err| ServiceError::new(format!["cannot parse {path}: {err}"]))?;
    let info = decoder
        .info()
        .ok_or_else(|| ServiceError::new(format!["cannot parse {path}"]))?;
    use jpeg_decoder::PixelFormat;
    let (color, bits) = match info.pixel_format {
        PixelFormat::L8 => (ColorModel::Gray, 8),
        PixelFormat::L16 => (ColorModel::Gray, 16),
        PixelFormat::RGB24 => (ColorModel::Rgb, 8),
        PixelFormat::CMYK32 => (ColorModel::Cmyk, 8),
    };
    let data = std::fs::read(path)
        .map_err(|err| ServiceError::new(format!["cannot read {path}: {err}"]))?;
    Ok(LoadedImage {
        info: ImageInfo {
            width: info.width.into(),
            height: info.height.into(),
            color,
            bits_per_sample: bits,
            interlaced: false,
            has_alpha: false,
        },
        payload: Payload::Dct(data),
    })
}

fn load_png(path: &str) -> Result<LoadedImage, ServiceError> {
    let data = std::fs::read(path)
        .map_err(|err| ServiceError::new(format!["cannot read {path}: {err}"]))?;
    let parse_err =
        |err: png::DecodingError| ServiceError::new(format!["cannot parse {path}: {err}"]);

    // First pass: the facts as stored in the file.
    let reader = png::Decoder::new(std::io::Cursor::new(&data))
        .read_info()
        .map_err(parse_err)?;
    let info = reader.info();
    use png::ColorType;
    let (color, has_alpha) = match info.color_type {
        ColorType::Grayscale => (ColorModel::Gray, false),
        ColorType::GrayscaleAlpha => (ColorModel::Gray, true),
        ColorType::Rgb => (ColorModel::Rgb, false),
        ColorType::Rgba => (ColorModel::Rgb, true),
        ColorType::Indexed => (ColorModel::Indexed, false),
    };
    let image_info = ImageInfo {
        width: info.width,
        height: info.height,
        color,
        bits_per_sample: info.bit_depth as u8,
        interlaced: info.interlaced,
        // Transparency entries make an indexed image an alpha image.
        has_alpha: has_alpha || info.trns.is_some(),
    };
    let gray = color == ColorModel::Gray;
    drop(reader);

    // Second pass: decode for embedding, expanding palettes to RGB and
    // sub-byte depths to 8 bits.
    let mut decoder = png::Decoder::new(std::io::Cursor::new(&data));
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder.read_info().map_err(parse_err)?;
    let mut samples = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut samples).map_err(parse_err)?;
    samples.truncate(frame.buffer_size());
    Ok(LoadedImage {
        info: image_info,
        payload: Payload::Raw { samples, gray },
    })
}

/// Load through a cache, validating the facts the same way the
/// evaluator does.
pub fn load_cached(
    cache: &ImageCache,
    path: &str,
    format: ImageFormat,
) -> Result<Rc<LoadedImage>, ServiceError> {
    if let Some(image) = cache.borrow().get(path) {
        return Ok(image.clone());
    }
    let image = Rc::new(load(path, format)?);
    cache.borrow_mut().insert(path.into(), image.clone());
    Ok(image)
}

/// The evaluator-side image loader, backed by the real file system and
/// a shared cache.
#[derive(Default)]
pub struct FileImageLoader {
    cache: ImageCache,
}

impl FileImageLoader {
    pub fn new(cache: ImageCache) -> FileImageLoader {
        FileImageLoader { cache }
    }

    pub fn cache(&self) -> ImageCache {
        self.cache.clone()
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&mut self, path: &str, format: ImageFormat) -> Result<ImageInfo, ServiceError> {
        Ok(load_cached(&self.cache, path, format)?.info)
    }
}
