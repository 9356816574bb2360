//! Transform construction.
//!
//! Elementary transforms compose through `tx_seq`, which applies its
//! first operand first. When several elementary transforms describe one
//! placement, the conventional order is translate, rotate, scale, skew.

use crate::error::Error;
use crate::value::{Transform, Value};
use crate::vm::Vm;
use scent_asm::Assembler;

pub fn tx_identity<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.push(Value::Transform(Transform::IDENTITY));
    Ok(())
}

/// `x y — T`
pub fn tx_translate<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let point = vm.pop_point()?;
    vm.push(Value::Transform(Transform::translate(point.x, point.y)));
    Ok(())
}

/// `a — T`, degrees counter-clockwise.
pub fn tx_rotate<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let degrees = vm.pop_fixed()?;
    vm.push(Value::Transform(Transform::rotate(degrees)));
    Ok(())
}

/// `sx sy — T`
pub fn tx_scale<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let sy = vm.pop_fixed()?;
    let sx = vm.pop_fixed()?;
    if sx == scent_core::Fixed::ZERO || sy == scent_core::Fixed::ZERO {
        return Err(Error::domain("scale factors must be non-zero"));
    }
    vm.push(Value::Transform(Transform::scale(sx, sy)));
    Ok(())
}

/// `ax ay — T`, degrees per axis.
pub fn tx_skew<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let ay = vm.pop_fixed()?;
    let ax = vm.pop_fixed()?;
    vm.push(Value::Transform(Transform::skew(ax, ay)));
    Ok(())
}

/// `T₁ … Tₙ n — T`
pub fn tx_seq<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let count = vm.pop_count()?;
    let mut transforms = Vec::with_capacity(count);
    for _ in 0..count {
        transforms.push(vm.pop_transform()?);
    }
    // Popped in reverse: the bottom-most transform applies first.
    let mut composed = Transform::IDENTITY;
    for t in transforms.iter().rev() {
        composed = composed.then(t);
    }
    vm.push(Value::Transform(composed));
    Ok(())
}
