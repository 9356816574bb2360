//! Font operations.

use super::ream::fixed_value;
use crate::error::Error;
use crate::value::{Alterations, Font, Value};
use crate::vm::Vm;
use scent_asm::{Assembler, Instruction};
use scent_core::BuiltInFont;
use std::rc::Rc;

/// `atom — Font`: one of the fourteen built-in fonts.
pub fn font_get<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let atom = vm.pop_atom()?;
    let family = BuiltInFont::parse(&atom).ok_or_else(|| {
        Error::domain(format!["\"{atom}\" is not a built-in font name"])
    })?;
    vm.push(Value::Font(Rc::new(Font::BuiltIn(family))));
    Ok(())
}

/// `path format — Font`: load a font file through the font loader.
pub fn font_load<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let format = vm.pop_atom()?;
    if format.as_ref() != "truetype" {
        return Err(Error::domain(format![
            "unsupported font format \"{format}\"; expected \"truetype\""
        ]));
    }
    let path = vm.pop_string()?;
    let metrics = vm
        .services
        .fonts
        .load_truetype(&path)
        .map_err(|err| Error::resource(err.to_string()))?;
    let asm_name = vm.next_font_name();
    vm.machine.execute(&Instruction::FontFile {
        name: asm_name.clone(),
        path: path.to_string(),
    })?;
    vm.push(Value::Font(Rc::new(Font::File {
        path: path.to_string(),
        asm_name,
        metrics,
    })));
    Ok(())
}

/// `Font Dict — Font` (dictionary dialect): derive a synthetic font.
///
/// Alterations defined here win; undefined ones inherit from the base,
/// and chains of synthetic fonts collapse to a single override layer.
pub fn font_alter<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let dict = vm.pop_dict()?;
    let base = vm.pop_font()?;
    let mut alterations = Alterations::default();
    for (key, value) in &dict.entries {
        match key.as_str() {
            "HScale" => {
                let scale = fixed_value(value, "HScale")?;
                if !scale.is_positive() {
                    return Err(Error::domain("\"HScale\" must be positive"));
                }
                alterations.h_scale = Some(scale);
            }
            "Oblique" => {
                alterations.oblique = Some(fixed_value(value, "Oblique")?);
            }
            "Boldness" => {
                let boldness = fixed_value(value, "Boldness")?;
                if !boldness.is_positive() {
                    return Err(Error::domain("\"Boldness\" must be positive"));
                }
                alterations.boldness = Some(boldness);
            }
            "SmallCaps" => match value {
                Value::Integer(0) => alterations.small_caps = Some(false),
                Value::Integer(1) => alterations.small_caps = Some(true),
                _ => {
                    return Err(Error::domain(
                        "\"SmallCaps\" must be the integer 0 or 1",
                    ))
                }
            },
            "CharSpacing" => {
                let spacing = fixed_value(value, "CharSpacing")?;
                if spacing.is_negative() {
                    return Err(Error::domain("\"CharSpacing\" must not be negative"));
                }
                alterations.char_spacing = Some(spacing);
            }
            other => {
                return Err(Error::domain(format![
                    "a font alteration dictionary has no \"{other}\" key"
                ]))
            }
        }
    }
    vm.push(Value::Font(Rc::new(Font::synthetic(&base, alterations))));
    Ok(())
}
