//! # Scent: a stack-based document description language.
//!
//! This crate implements the Scent language: a small stack machine whose
//! programs build typed values (reams, strokes, paths, styles, columns,
//! transforms, clippings, fonts, images) and draw them onto PDF pages.
//! A document looks like this:
//!
//! ```text
//! @{ scent 1.0 @}
//! ( start_style "Helvetica" font_get style_font
//!   12 style_size 0 gray style_fill finish_style ) :body_style
//!
//! [ "Width" 595.27559 "Height" 841.88976
//!   "ArtBox" [ "LeftMargin" 36 "TopMargin" 36
//!              "RightMargin" 36 "BottomMargin" 36 ] dict
//! ] dict ream begin_page
//! start_column
//!   72 720 start_line
//!     {Hello, world} $body_style line_span
//!   finish_line
//! finish_column
//! tx_identity null draw_text
//! end_page
//! ```
//!
//! Evaluation lowers every drawing into Scent assembly instructions
//! (the `scent-asm` crate), which validate a second time against the
//! assembly state machine before reaching an output backend.
//!
//! The crate is organised like its sibling:
//!
//! - [`token`]: the entity scanner and the source preamble.
//! - [`value`]: the closed value model.
//! - [`builder`]: the accumulator-based object builders.
//! - [`vm`]: the evaluator proper and [`vm::run_document`].
//! - [`ops`]: the operation inventory.
//! - [`services`]: the font/image/file-system services the evaluator
//!   consumes as black boxes.

pub mod builder;
pub mod error;
mod lower;
pub mod ops;
pub mod services;
pub mod testing;
pub mod token;
pub mod value;
pub mod vm;

pub use error::Error;
pub use vm::{run_document, Services};
