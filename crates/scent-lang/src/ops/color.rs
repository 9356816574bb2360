//! Colour construction.

use crate::error::Error;
use crate::value::Value;
use crate::vm::Vm;
use scent_asm::Assembler;
use scent_core::{Cmyk, Fixed};

fn channel<A: Assembler>(vm: &mut Vm<A>) -> Result<u8, Error> {
    let i = vm.pop_integer()?;
    u8::try_from(i)
        .map_err(|_| Error::domain(format!["colour channel {i} is outside 0-255"]))
}

fn fixed_channel<A: Assembler>(vm: &mut Vm<A>) -> Result<u8, Error> {
    let f = vm.pop_fixed()?;
    if f.is_negative() || f > Fixed::ONE {
        return Err(Error::domain(format!["colour channel {f} is outside 0-1"]));
    }
    Ok(((f.to_f64() * 255.0).round()) as u8)
}

/// `i — Color`: 0 is black, 255 is white.
pub fn gray<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let intensity = channel(vm)?;
    vm.push(Value::Color(gray_color(intensity)));
    Ok(())
}

/// `c m y k — Color`
pub fn cmyk<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let black = channel(vm)?;
    let yellow = channel(vm)?;
    let magenta = channel(vm)?;
    let cyan = channel(vm)?;
    vm.push(Value::Color(Cmyk {
        cyan,
        magenta,
        yellow,
        black,
    }));
    Ok(())
}

/// `f — Color`: 0 is black, 1 is white.
pub fn fgray<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let intensity = fixed_channel(vm)?;
    vm.push(Value::Color(gray_color(intensity)));
    Ok(())
}

/// `c m y k — Color`, channels in 0-1.
pub fn fcmyk<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let black = fixed_channel(vm)?;
    let yellow = fixed_channel(vm)?;
    let magenta = fixed_channel(vm)?;
    let cyan = fixed_channel(vm)?;
    vm.push(Value::Color(Cmyk {
        cyan,
        magenta,
        yellow,
        black,
    }));
    Ok(())
}

fn gray_color(intensity: u8) -> Cmyk {
    Cmyk {
        cyan: 0,
        magenta: 0,
        yellow: 0,
        black: 255 - intensity,
    }
}
