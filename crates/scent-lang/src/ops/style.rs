//! Style construction.

use crate::builder::StyleBuilder;
use crate::error::Error;
use crate::value::Value;
use crate::vm::{Accumulator, Vm};
use scent_asm::Assembler;
use std::rc::Rc;

pub fn start_style<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.start_accumulator(Accumulator::Style(StyleBuilder::default()))
}

/// `Font —`
pub fn style_font<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let font = vm.pop_font()?;
    vm.style_builder()?.set_font(font);
    Ok(())
}

/// `f —`
pub fn style_size<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let size = vm.pop_fixed()?;
    vm.style_builder()?.set_size(size)
}

/// `Stroke|Null —`
pub fn style_stroke<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let stroke = vm.pop_stroke_or_null()?;
    vm.style_builder()?.set_stroke(stroke);
    Ok(())
}

/// `Color|Null —`
pub fn style_fill<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let fill = vm.pop_color_or_null()?;
    vm.style_builder()?.set_fill(fill);
    Ok(())
}

/// `f —`
pub fn style_cspace<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let space = vm.pop_fixed()?;
    vm.style_builder()?.set_char_space(space)
}

/// `f —`
pub fn style_wspace<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let space = vm.pop_fixed()?;
    vm.style_builder()?.set_word_space(space)
}

/// `f —`
pub fn style_hscale<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let scale = vm.pop_fixed()?;
    vm.style_builder()?.set_h_scale(scale)
}

/// `f —`
pub fn style_rise<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let rise = vm.pop_fixed()?;
    vm.style_builder()?.set_rise(rise);
    Ok(())
}

/// `Style —`: replace the partial with a deep copy of an existing style.
pub fn style_derive<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let source = vm.pop_style()?;
    *vm.style_builder()? = StyleBuilder::from_style(&source);
    Ok(())
}

/// `— Style`
pub fn finish_style<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.style_builder()?;
    let builder = match vm.take_accumulator() {
        Accumulator::Style(builder) => builder,
        _ => unreachable!["checked above"],
    };
    let style = builder.finish()?;
    vm.push(Value::Style(Rc::new(style)));
    Ok(())
}

/// `Style w — Style`: a copy with new word spacing. Does not touch the
/// accumulator.
pub fn style_setw<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let space = vm.pop_fixed()?;
    let base = vm.pop_style()?;
    let mut builder = StyleBuilder::from_style(&base);
    builder.set_word_space(space)?;
    vm.push(Value::Style(Rc::new(builder.finish()?)));
    Ok(())
}

/// `Style w c — Style`: a copy with new word and character spacing.
pub fn style_setwc<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let char_space = vm.pop_fixed()?;
    let word_space = vm.pop_fixed()?;
    let base = vm.pop_style()?;
    let mut builder = StyleBuilder::from_style(&base);
    builder.set_word_space(word_space)?;
    builder.set_char_space(char_space)?;
    vm.push(Value::Style(Rc::new(builder.finish()?)));
    Ok(())
}
