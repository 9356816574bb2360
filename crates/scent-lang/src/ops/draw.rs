//! Pages and drawing.
//!
//! Drawing operations pop their fully built arguments and hand them to
//! the lowering layer, which translates them into assembly instructions
//! executed directly on the machine.

use crate::error::Error;
use crate::token::{parse_preamble, Scanner, SourceKind};
use crate::value::FillRule;
use crate::vm::Vm;
use scent_asm::Assembler;

/// `Ream —`: open a page.
pub fn begin_page<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let ream = vm.pop_ream()?;
    if vm.embed_depth > 0 {
        return Err(Error::state("an embedded source cannot open a page"));
    }
    if vm.page.is_some() {
        return Err(Error::state("a page is already open"));
    }
    vm.lower_begin_page(&ream)?;
    vm.page = Some(ream);
    Ok(())
}

/// `—`: close the open page.
pub fn end_page<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    if vm.embed_depth > 0 {
        return Err(Error::state("an embedded source cannot close the page"));
    }
    if vm.page.is_none() {
        return Err(Error::state("no page is open"));
    }
    vm.lower_end_page()?;
    vm.page = None;
    Ok(())
}

/// `Path T Stroke|Null Color|Null Clipping|Null —`
pub fn draw_path<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let clipping = vm.pop_clipping_or_null()?;
    let fill = vm.pop_color_or_null()?;
    let stroke = vm.pop_stroke_or_null()?;
    let transform = vm.pop_transform()?;
    let path = vm.pop_path()?;
    vm.require_page()?;
    if stroke.is_none() && fill.is_none() {
        return Err(Error::state(
            "drawing a path needs a stroke or a fill colour",
        ));
    }
    if fill.is_some() && path.rule == FillRule::Null {
        return Err(Error::domain(
            "a path with the null fill rule cannot be filled",
        ));
    }
    vm.lower_draw_path(&path, &transform, stroke.as_deref(), fill, clipping.as_deref())
}

/// `Column T Clipping|Null —`
pub fn draw_text<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let clipping = vm.pop_clipping_or_null()?;
    let transform = vm.pop_transform()?;
    let column = vm.pop_column()?;
    vm.require_page()?;
    vm.lower_draw_text(&column, &transform, clipping.as_deref())
}

/// `Image T Clipping|Null —`: the transform maps the image's unit
/// square onto the page.
pub fn draw_image<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let clipping = vm.pop_clipping_or_null()?;
    let transform = vm.pop_transform()?;
    let image = vm.pop_image()?;
    vm.require_page()?;
    vm.lower_draw_image(&image, &transform, clipping.as_deref())
}

/// `path T Clipping|Null —` (incremental dialect): draw an embedded
/// source file into the open page.
pub fn draw_embed<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let clipping = vm.pop_clipping_or_null()?;
    let transform = vm.pop_transform()?;
    let path = vm.pop_string()?;
    vm.require_page()?;
    let source = vm
        .services
        .file_system
        .read_to_string(&path)
        .map_err(|err| Error::resource(format!["cannot read {path}: {err}"]))?;
    let mut scanner = Scanner::new(&source);
    let preamble = parse_preamble(&mut scanner)?;
    let bounds = match (preamble.kind, preamble.bounds) {
        (SourceKind::Embedded, Some(bounds)) => bounds,
        _ => {
            return Err(Error::state(format![
                "{path} is not an embedded source (its header must be scent-embed)"
            ]))
        }
    };
    vm.lower_embed_prologue(&transform, clipping.as_deref(), &bounds)?;
    vm.run_nested(&mut scanner)
        .map_err(|err| Error::new(err.kind, format!["in {path}: {err}"]))?;
    vm.lower_embed_epilogue()
}
