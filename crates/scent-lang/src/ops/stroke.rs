//! Stroke construction, in both dialects.

use super::ream::{fixed_value, require_fixed};
use crate::builder::StrokeBuilder;
use crate::error::Error;
use crate::value::{Cap, DashPattern, Dict, Join, Value};
use crate::vm::{Accumulator, Vm};
use scent_asm::Assembler;
use scent_core::Fixed;
use std::rc::Rc;

/// `d₁ … dₙ n phase — DashPattern` (dictionary dialect).
///
/// This is the one form that accepts a single-element dash array; it is
/// expanded to an equal on/off pair when lowered.
pub fn dash_pattern<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let phase = vm.pop_fixed()?;
    let dashes = pop_dashes(vm, phase, true)?;
    vm.push(Value::DashPattern(Rc::new(dashes)));
    Ok(())
}

/// `Dict — Stroke` (dictionary dialect).
pub fn stroke_style<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let dict = vm.pop_dict()?;
    let mut builder = StrokeBuilder::default();
    builder.set_width(require_fixed(&dict, "Width")?)?;
    if let Some(color) = color_value(&dict, "Color", true)? {
        builder.set_color(color);
    }
    apply_stroke_dict(&mut builder, &dict)?;
    let stroke = builder.finish()?;
    vm.push(Value::Stroke(Rc::new(stroke)));
    Ok(())
}

/// `Stroke Dict — Stroke` (dictionary dialect): the dictionary's keys
/// override individual fields of the base stroke.
pub fn stroke_derive<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let dict = vm.pop_dict()?;
    let base = vm.pop_stroke()?;
    let mut builder = StrokeBuilder::from_stroke(&base);
    if let Some(width) = dict.get("Width") {
        builder.set_width(fixed_value(width, "Width")?)?;
    }
    if let Some(color) = color_value(&dict, "Color", false)? {
        builder.set_color(color);
    }
    apply_stroke_dict(&mut builder, &dict)?;
    let stroke = builder.finish()?;
    vm.push(Value::Stroke(Rc::new(stroke)));
    Ok(())
}

/// Apply the optional keys shared by `stroke_style` and `stroke_derive`.
fn apply_stroke_dict(builder: &mut StrokeBuilder, dict: &Dict) -> Result<(), Error> {
    for key in dict.entries.keys() {
        if !matches!(
            key.as_str(),
            "Width" | "Color" | "Cap" | "Join" | "MiterLimit" | "Dash"
        ) {
            return Err(Error::domain(format![
                "a stroke dictionary has no \"{key}\" key"
            ]));
        }
    }
    if let Some(cap) = dict.get("Cap") {
        builder.set_cap(cap_value(cap)?);
    }
    let limit = match dict.get("MiterLimit") {
        None => None,
        Some(value) => Some(fixed_value(value, "MiterLimit")?),
    };
    match dict.get("Join") {
        None => {
            if let Some(limit) = limit {
                builder.set_join(Join::Miter(limit))?;
            }
        }
        Some(Value::Atom(name)) => match name.as_ref() {
            "Miter" => match limit {
                None => {
                    return Err(Error::domain(
                        "a miter join requires the \"MiterLimit\" key",
                    ))
                }
                Some(limit) => builder.set_join(Join::Miter(limit))?,
            },
            "Round" | "Bevel" => {
                if limit.is_some() {
                    return Err(Error::domain(
                        "\"MiterLimit\" is only meaningful for miter joins",
                    ));
                }
                builder.set_join(if name.as_ref() == "Round" {
                    Join::Round
                } else {
                    Join::Bevel
                })?;
            }
            other => {
                return Err(Error::domain(format![
                    "\"{other}\" is not a join style"
                ]))
            }
        },
        Some(other) => {
            return Err(Error::type_error(format![
                "\"Join\" must be an atom, got {}",
                other.description()
            ]))
        }
    }
    if let Some(dash) = dict.get("Dash") {
        match dash {
            Value::DashPattern(pattern) => builder.set_dash((**pattern).clone()),
            other => {
                return Err(Error::type_error(format![
                    "\"Dash\" must be a dash pattern, got {}",
                    other.description()
                ]))
            }
        }
    }
    Ok(())
}

/// `a — f`: the miter limit `1/sin(a/2)` for a join angle in degrees.
pub fn miter_angle<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let angle = vm.pop_fixed()?;
    let ratio = scent_core::miter_ratio(angle).map_err(|_| {
        Error::domain(format![
            "the miter angle {angle} is outside 0.01-180 degrees or overflows"
        ])
    })?;
    vm.push(Value::Fixed(ratio));
    Ok(())
}

pub fn start_stroke<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.start_accumulator(Accumulator::Stroke(StrokeBuilder::default()))
}

/// `f —`
pub fn stroke_width<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let width = vm.pop_fixed()?;
    vm.stroke_builder()?.set_width(width)
}

/// `Color —`
pub fn stroke_color<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let color = vm.pop_color()?;
    vm.stroke_builder()?.set_color(color);
    Ok(())
}

/// `atom —`
pub fn stroke_cap<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let atom = vm.pop_atom()?;
    let cap = match atom.as_ref() {
        "Butt" => Cap::Butt,
        "Round" => Cap::Round,
        "Square" => Cap::Square,
        other => {
            return Err(Error::domain(format!["\"{other}\" is not a cap style"]))
        }
    };
    vm.stroke_builder()?.set_cap(cap);
    Ok(())
}

/// `atom —`: a round or bevel join. Miter joins carry a limit and are
/// set with `stroke_join_r`.
pub fn stroke_join<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let atom = vm.pop_atom()?;
    let join = match atom.as_ref() {
        "Round" => Join::Round,
        "Bevel" => Join::Bevel,
        "Miter" => {
            return Err(Error::domain(
                "miter joins take a limit; use stroke_join_r",
            ))
        }
        other => {
            return Err(Error::domain(format!["\"{other}\" is not a join style"]))
        }
    };
    vm.stroke_builder()?.set_join(join)
}

/// `limit —`: a miter join from its limit.
pub fn stroke_join_r<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let limit = vm.pop_fixed()?;
    vm.stroke_builder()?.set_join(Join::Miter(limit))
}

/// `d₁ … dₙ n phase —`
pub fn stroke_dash<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let phase = vm.pop_fixed()?;
    let dashes = pop_dashes(vm, phase, false)?;
    vm.stroke_builder()?.set_dash(dashes);
    Ok(())
}

pub fn stroke_undash<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.stroke_builder()?.clear_dash();
    Ok(())
}

/// `— Stroke`
pub fn finish_stroke<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    vm.stroke_builder()?;
    let builder = match vm.take_accumulator() {
        Accumulator::Stroke(builder) => builder,
        _ => unreachable!["checked above"],
    };
    let stroke = builder.finish()?;
    vm.push(Value::Stroke(Rc::new(stroke)));
    Ok(())
}

/// Pop a counted dash array. Every element must be positive; the phase
/// must not be negative. `allow_single` admits the one-element form.
fn pop_dashes<A: Assembler>(
    vm: &mut Vm<A>,
    phase: Fixed,
    allow_single: bool,
) -> Result<DashPattern, Error> {
    if phase.is_negative() {
        return Err(Error::domain("the dash phase must not be negative"));
    }
    let count = vm.pop_count()?;
    let single_ok = allow_single && count == 1;
    if count % 2 != 0 && !single_ok {
        return Err(Error::domain(
            "a dash array needs an even number of elements",
        ));
    }
    let mut dashes = vec![Fixed::ZERO; count];
    for slot in dashes.iter_mut().rev() {
        let d = vm.pop_fixed()?;
        if !d.is_positive() {
            return Err(Error::domain("dash elements must be positive"));
        }
        *slot = d;
    }
    Ok(DashPattern { dashes, phase })
}

fn cap_value(value: &Value) -> Result<Cap, Error> {
    match value {
        Value::Atom(name) => match name.as_ref() {
            "Butt" => Ok(Cap::Butt),
            "Round" => Ok(Cap::Round),
            "Square" => Ok(Cap::Square),
            other => Err(Error::domain(format!["\"{other}\" is not a cap style"])),
        },
        other => Err(Error::type_error(format![
            "\"Cap\" must be an atom, got {}",
            other.description()
        ])),
    }
}

fn color_value(
    dict: &Dict,
    key: &str,
    required: bool,
) -> Result<Option<scent_core::Cmyk>, Error> {
    match dict.get(key) {
        None if required => Err(Error::domain(format!["the \"{key}\" key is required"])),
        None => Ok(None),
        Some(Value::Color(c)) => Ok(Some(*c)),
        Some(other) => Err(Error::type_error(format![
            "\"{key}\" must be a colour, got {}",
            other.description()
        ])),
    }
}
