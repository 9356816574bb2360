//! Ream construction, in both dialects.

use crate::builder::{BoxKind, Dialect, ReamBuilder};
use crate::error::Error;
use crate::value::{Dict, Margins, Value};
use crate::vm::{Accumulator, Vm};
use scent_asm::Assembler;
use scent_core::{Fixed, Rotation};
use std::rc::Rc;

/// `Dict — Ream` (dictionary dialect).
///
/// Keys: `Width` and `Height` (required), `Rotation`, and the three box
/// kinds, each holding a dictionary with the four margin keys.
pub fn ream<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let dict = vm.pop_dict()?;
    let mut builder = ReamBuilder::default();
    let width = require_fixed(&dict, "Width")?;
    let height = require_fixed(&dict, "Height")?;
    builder.set_dim(width, height)?;
    for (key, value) in &dict.entries {
        match key.as_str() {
            "Width" | "Height" => (),
            "Rotation" => builder.set_rotation(rotation_value(value)?),
            "ArtBox" => builder.set_box(BoxKind::Art, margins_value(value)?)?,
            "TrimBox" => builder.set_box(BoxKind::Trim, margins_value(value)?)?,
            "BleedBox" => builder.set_box(BoxKind::Bleed, margins_value(value)?)?,
            other => {
                return Err(Error::domain(format![
                    "a ream dictionary has no \"{other}\" key"
                ]))
            }
        }
    }
    let ream = builder.finish(Dialect::Dictionary)?;
    vm.push(Value::Ream(Rc::new(ream)));
    Ok(())
}

pub fn start_ream<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.start_accumulator(Accumulator::Ream(ReamBuilder::default()))
}

/// `w h —`
pub fn ream_dim<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let height = vm.pop_fixed()?;
    let width = vm.pop_fixed()?;
    vm.ream_builder()?.set_dim(width, height)
}

/// `i —`
pub fn ream_rotate<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let degrees = vm.pop_integer()?;
    let rotation = Rotation::from_degrees(degrees).ok_or_else(|| {
        Error::domain(format![
            "invalid rotation {degrees}; expected 0, 90, 180 or 270"
        ])
    })?;
    vm.ream_builder()?.set_rotation(rotation);
    Ok(())
}

/// `l t r b kind —`
pub fn ream_bound<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let kind = box_kind(vm)?;
    let bottom = vm.pop_fixed()?;
    let right = vm.pop_fixed()?;
    let top = vm.pop_fixed()?;
    let left = vm.pop_fixed()?;
    vm.ream_builder()?.set_box(
        kind,
        Margins {
            left,
            top,
            right,
            bottom,
        },
    )
}

/// `kind —`
pub fn ream_unbound<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let kind = box_kind(vm)?;
    vm.ream_builder()?.unset_box(kind);
    Ok(())
}

/// `Ream —`: replace the partial with a deep copy of an existing ream.
pub fn ream_derive<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let source = vm.pop_ream()?;
    *vm.ream_builder()? = ReamBuilder::from_ream(&source);
    Ok(())
}

/// `— Ream`
pub fn finish_ream<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.ream_builder()?;
    let builder = match vm.take_accumulator() {
        Accumulator::Ream(builder) => builder,
        _ => unreachable!["checked above"],
    };
    let ream = builder.finish(Dialect::Incremental)?;
    vm.push(Value::Ream(Rc::new(ream)));
    Ok(())
}

fn box_kind<A: Assembler>(vm: &mut Vm<A>) -> Result<BoxKind, Error> {
    let atom = vm.pop_atom()?;
    BoxKind::from_atom(&atom)
        .ok_or_else(|| Error::domain(format!["\"{atom}\" is not a boundary box kind"]))
}

fn rotation_value(value: &Value) -> Result<Rotation, Error> {
    match value {
        Value::Integer(i) => Rotation::from_degrees(*i).ok_or_else(|| {
            Error::domain(format!["invalid rotation {i}; expected 0, 90, 180 or 270"])
        }),
        other => Err(Error::type_error(format![
            "\"Rotation\" must be an integer, got {}",
            other.description()
        ])),
    }
}

fn margins_value(value: &Value) -> Result<Margins, Error> {
    let dict = match value {
        Value::Dict(dict) => dict,
        other => {
            return Err(Error::type_error(format![
                "a boundary box must be a dictionary, got {}",
                other.description()
            ]))
        }
    };
    for key in dict.entries.keys() {
        if !matches!(
            key.as_str(),
            "LeftMargin" | "TopMargin" | "RightMargin" | "BottomMargin"
        ) {
            return Err(Error::domain(format![
                "a boundary box dictionary has no \"{key}\" key"
            ]));
        }
    }
    Ok(Margins {
        left: require_fixed(dict, "LeftMargin")?,
        top: require_fixed(dict, "TopMargin")?,
        right: require_fixed(dict, "RightMargin")?,
        bottom: require_fixed(dict, "BottomMargin")?,
    })
}

pub(super) fn require_fixed(dict: &Dict, key: &str) -> Result<Fixed, Error> {
    match dict.get(key) {
        None => Err(Error::domain(format!["the \"{key}\" key is required"])),
        Some(value) => fixed_value(value, key),
    }
}

pub(super) fn fixed_value(value: &Value, key: &str) -> Result<Fixed, Error> {
    match value {
        Value::Fixed(f) => Ok(*f),
        Value::Integer(i) => Fixed::from_integer(*i).map_err(|_| {
            Error::type_error(format![
                "the integer {i} under \"{key}\" is outside the promotable range"
            ])
        }),
        other => Err(Error::type_error(format![
            "\"{key}\" must be a fixed number, got {}",
            other.description()
        ])),
    }
}
