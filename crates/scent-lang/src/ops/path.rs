//! Path construction.

use crate::builder::PathBuilder;
use crate::error::Error;
use crate::value::{FillRule, Segment, Value};
use crate::vm::{Accumulator, Vm};
use scent_asm::Assembler;
use std::rc::Rc;

pub fn start_path<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.start_accumulator(Accumulator::Path(PathBuilder::default()))
}

/// `x y —`
pub fn start_motion<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let start = vm.pop_point()?;
    vm.path_builder()?.start_motion(start)
}

/// `x y —`
pub fn motion_line<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let to = vm.pop_point()?;
    vm.path_builder()?.add_segment(Segment::Line(to))
}

/// `x₂ y₂ x₃ y₃ x₄ y₄ —`
pub fn motion_curve<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let p4 = vm.pop_point()?;
    let p3 = vm.pop_point()?;
    let p2 = vm.pop_point()?;
    vm.path_builder()?.add_segment(Segment::Cubic(p2, p3, p4))
}

pub fn finish_motion<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.path_builder()?.finish_motion(false)
}

pub fn close_motion<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.path_builder()?.finish_motion(true)
}

/// `x y w h —`
pub fn path_rect<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let height = vm.pop_fixed()?;
    let width = vm.pop_fixed()?;
    let corner = vm.pop_point()?;
    vm.path_builder()?.add_rect(corner, width, height)
}

/// `Path —`
pub fn path_include<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let path = vm.pop_path()?;
    vm.path_builder()?.include(&path)
}

/// `rule — Path`
pub fn finish_path<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let rule = match vm.pop_atom()?.as_ref() {
        "Nonzero" => FillRule::Nonzero,
        "EvenOdd" => FillRule::EvenOdd,
        "Null" => FillRule::Null,
        other => {
            return Err(Error::domain(format!["\"{other}\" is not a fill rule"]))
        }
    };
    vm.path_builder()?;
    let builder = match vm.take_accumulator() {
        Accumulator::Path(builder) => builder,
        _ => unreachable!["checked above"],
    };
    let path = builder.finish(rule)?;
    vm.push(Value::Path(Rc::new(path)));
    Ok(())
}
