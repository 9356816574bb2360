//! # Scent PDF backend
//!
//! The external services of the Scent compiler: a TrueType font loader
//! (`ttf-parser`), JPEG/PNG image loaders (`jpeg-decoder`, `png`), and
//! the [`PdfAssembler`], an assembly strategy that serialises pages and
//! content streams with `pdf-writer`.
//!
//! The loaders and the assembler share caches, so a font or image the
//! evaluator validated is not read from disk a second time when its
//! declaration instruction reaches the assembler:
//!
//! ```no_run
//! use scent_asm::Machine;
//! use scent_lang::services::RealFileSystem;
//! use scent_pdf::{FileFontLoader, FileImageLoader, PdfAssembler};
//!
//! let mut fonts = FileFontLoader::default();
//! let mut images = FileImageLoader::default();
//! let mut machine = Machine::new(PdfAssembler::new(fonts.cache(), images.cache()));
//! scent_lang::run_document(
//!     "@{ scent 1.0 @} …",
//!     &mut machine,
//!     scent_lang::Services {
//!         fonts: &mut fonts,
//!         images: &mut images,
//!         file_system: &RealFileSystem,
//!     },
//! ).unwrap();
//! let bytes = machine.finish().unwrap().into_bytes();
//! ```

mod font;
mod image;
mod writer;

pub use font::{FileFontLoader, FontCache, LoadedFont};
pub use image::{FileImageLoader, ImageCache, LoadedImage};
pub use writer::PdfAssembler;
