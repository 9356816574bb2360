//! Clipping construction.

use crate::error::Error;
use crate::value::{ClipComponent, ClipShape, Clipping, FillRule, Value};
use crate::vm::Vm;
use scent_asm::Assembler;
use std::rc::Rc;

/// `s₁ T₁ … sₙ Tₙ n — Clipping`
///
/// Components are shape/transform pairs; the final region is the
/// intersection of all components with the page. No components means
/// the whole page.
pub fn clip<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let count = vm.pop_count()?;
    if count % 2 != 0 {
        return Err(Error::domain(
            "a clipping needs shape/transform pairs",
        ));
    }
    let mut components = Vec::with_capacity(count / 2);
    for _ in 0..count / 2 {
        let transform = vm.pop_transform()?;
        let shape = match vm.pop()? {
            Value::Path(path) => {
                if path.rule == FillRule::Null {
                    return Err(Error::domain(
                        "a path with the null fill rule cannot clip",
                    ));
                }
                ClipShape::Path(path)
            }
            Value::Column(column) => ClipShape::Column(column),
            other => {
                return Err(Error::type_error(format![
                    "clip shapes must be paths or columns, got {}",
                    other.description()
                ]))
            }
        };
        components.push(ClipComponent { shape, transform });
    }
    components.reverse();
    vm.push(Value::Clipping(Rc::new(Clipping { components })));
    Ok(())
}
