//! Image loading and validation.

use crate::error::Error;
use crate::services::ImageFormat;
use crate::value::{Image, Value};
use crate::vm::Vm;
use scent_asm::{Assembler, Instruction};
use std::rc::Rc;

/// `path format — Image`: load an image through the image loader and
/// validate it against the accepted subset.
pub fn image_load<A: Assembler>(vm: &mut Vm<A>) -> Result<(), Error> {
    let format = match vm.pop_atom()?.as_ref() {
        "jpeg" => ImageFormat::Jpeg,
        "png" => ImageFormat::Png,
        other => {
            return Err(Error::domain(format![
                "unsupported image format \"{other}\"; expected \"jpeg\" or \"png\""
            ]))
        }
    };
    let path = vm.pop_string()?;
    let info = vm
        .services
        .images
        .load(&path, format)
        .map_err(|err| Error::resource(err.to_string()))?;
    info.validate(format)
        .map_err(|err| Error::domain(format!["{path}: {err}"]))?;
    let asm_name = vm.next_image_name();
    let instruction = match format {
        ImageFormat::Jpeg => Instruction::ImageJpeg {
            name: asm_name.clone(),
            path: path.to_string(),
        },
        ImageFormat::Png => Instruction::ImagePng {
            name: asm_name.clone(),
            path: path.to_string(),
        },
    };
    vm.machine.execute(&instruction)?;
    vm.push(Value::Image(Rc::new(Image {
        path: path.to_string(),
        asm_name,
        format,
        info,
    })));
    Ok(())
}
