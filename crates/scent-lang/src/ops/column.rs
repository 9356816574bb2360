//! Column construction.

use crate::builder::ColumnBuilder;
use crate::error::Error;
use crate::value::{Span, Value};
use crate::vm::{Accumulator, Vm};
use scent_asm::Assembler;
use std::rc::Rc;

pub fn start_column<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.start_accumulator(Accumulator::Column(ColumnBuilder::default()))
}

/// `x y —`: open a line with its baseline start.
pub fn start_line<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let start = vm.pop_point()?;
    vm.column_builder()?.start_line(start)
}

/// `text style —`
pub fn line_span<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let style = vm.pop_style()?;
    let text = vm.pop_string()?;
    vm.column_builder()?.add_span(Span { text, style })
}

pub fn finish_line<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.column_builder()?.finish_line()
}

/// `— Column`
pub fn finish_column<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.column_builder()?;
    let builder = match vm.take_accumulator() {
        Accumulator::Column(builder) => builder,
        _ => unreachable!["checked above"],
    };
    let column = builder.finish()?;
    vm.push(Value::Column(Rc::new(column)));
    Ok(())
}
