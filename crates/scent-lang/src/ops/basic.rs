//! Stack manipulation and string operations.

use crate::error::Error;
use crate::value::{Dict, Value};
use crate::vm::Vm;
use scent_asm::Assembler;
use scent_core::check_content;
use std::collections::HashMap;

pub fn pop<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.pop()?;
    Ok(())
}

pub fn dup<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let value = vm.peek()?.clone();
    vm.push(value);
    Ok(())
}

pub fn null<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.push(Value::Null);
    Ok(())
}

/// `k₁ v₁ … kₙ vₙ n — Dict`
pub fn dict<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let count = vm.pop_count()?;
    if count % 2 != 0 {
        return Err(Error::domain(
            "a dictionary needs an even number of values (key/value pairs)",
        ));
    }
    let mut entries = HashMap::new();
    for _ in 0..count / 2 {
        let value = vm.pop()?;
        let key = match vm.pop()? {
            Value::Atom(a) => {
                if !crate::value::is_known_atom(&a) {
                    return Err(Error::domain(format!["unknown atom \"{a}\""]));
                }
                a
            }
            other => {
                return Err(Error::type_error(format![
                    "dictionary keys must be atoms, got {}",
                    other.description()
                ]))
            }
        };
        if entries.insert(key.to_string(), value).is_some() {
            return Err(Error::domain(format![
                "duplicate dictionary key \"{key}\""
            ]));
        }
    }
    vm.push(Value::Dict(std::rc::Rc::new(Dict { entries })));
    Ok(())
}

/// `s₁ … sₙ n sep — String`
pub fn sep<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let separator = vm.pop_string()?;
    join(vm, &separator)
}

/// `s₁ … sₙ n — String`
pub fn concat<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    join(vm, "")
}

fn join<A: Assembler>(vm: &mut Vm<A>, separator: &str) -> Result<(), Error> {
    let count = vm.pop_count()?;
    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        parts.push(vm.pop_string()?);
    }
    parts.reverse();
    let joined = parts
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<&str>>()
        .join(separator);
    if let Err(err) = check_content(&joined) {
        return Err(Error::domain(err.to_string()));
    }
    vm.push(Value::Str(joined.into()));
    Ok(())
}
