//! The Scent evaluator.
//!
//! The evaluator consumes one entity at a time and executes it against:
//!
//! - the *stack* of values, layered by group and array frames;
//! - the *namespace* of variables and constants;
//! - the *accumulator*, a single-slot register holding an object under
//!   incremental construction;
//! - the *page register*, holding the ream of the currently open page;
//! - the assembly [`Machine`], which receives the lowered instructions
//!   of every drawing operation.
//!
//! Operations are dispatched through a map of built-ins, the same way
//! the Texlang VM dispatches its primitives: each operation is a plain
//! function pointer that pops typed arguments, validates them and pushes
//! results or performs effects.

use crate::builder::Dialect;
use crate::builder::{ColumnBuilder, PathBuilder, ReamBuilder, StrokeBuilder, StyleBuilder};
use crate::error::Error;
use crate::ops::{self, BuiltIn, OpDialect};
use crate::services::{FileSystem, FontLoader, ImageLoader};
use crate::token::{parse_preamble, Entity, Scanner, SourceKind};
use crate::value::*;
use scent_asm::{Assembler, Machine};
use scent_core::{check_content, BuiltInFont, Fixed};
use std::collections::HashMap;
use std::rc::Rc;

/// The external services an evaluator run borrows.
pub struct Services<'a> {
    pub fonts: &'a mut dyn FontLoader,
    pub images: &'a mut dyn ImageLoader,
    pub file_system: &'a dyn FileSystem,
}

/// Compile a Scent document, driving the given assembly machine.
///
/// The machine is left one [`Machine::finish`] call away from producing
/// its output, so the caller can still inspect it.
pub fn run_document<'a, A: Assembler>(
    source: &str,
    machine: &'a mut Machine<A>,
    services: Services<'a>,
) -> Result<(), Error> {
    let mut scanner = Scanner::new(source);
    let preamble = parse_preamble(&mut scanner)?;
    if preamble.kind != SourceKind::Document {
        return Err(Error::state(
            "an embedded source cannot be compiled on its own; draw it with draw_embed",
        ));
    }
    let mut vm = Vm::new(machine, services);
    vm.run_entities(&mut scanner)?;
    vm.check_final_state()
}

/// A value bound in the namespace.
struct Binding {
    value: Value,
    constant: bool,
}

/// A visibility frame over the stack.
///
/// Groups and arrays both record the stack depth at which they opened;
/// operations may not pop past the innermost open frame.
enum Frame {
    Group { floor: usize },
    Array { floor: usize },
}

impl Frame {
    fn floor(&self) -> usize {
        match self {
            Frame::Group { floor } | Frame::Array { floor } => *floor,
        }
    }
}

/// The accumulator register.
#[derive(Default)]
pub(crate) enum Accumulator {
    #[default]
    Empty,
    Ream(ReamBuilder),
    Stroke(StrokeBuilder),
    Path(PathBuilder),
    Style(StyleBuilder),
    Column(ColumnBuilder),
}

impl Accumulator {
    fn description(&self) -> &'static str {
        match self {
            Accumulator::Empty => "nothing",
            Accumulator::Ream(_) => "a ream",
            Accumulator::Stroke(_) => "a stroke",
            Accumulator::Path(_) => "a path",
            Accumulator::Style(_) => "a style",
            Accumulator::Column(_) => "a column",
        }
    }
}

/// The Scent evaluator.
pub struct Vm<'a, A: Assembler> {
    pub(crate) machine: &'a mut Machine<A>,
    pub(crate) services: Services<'a>,
    ops: HashMap<&'static str, BuiltIn<A>>,
    pub(crate) dialect: Option<Dialect>,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    names: HashMap<String, Binding>,
    pub(crate) accumulator: Accumulator,
    /// The ream of the open page, or [None] between pages.
    pub(crate) page: Option<Rc<Ream>>,
    pub(crate) embed_depth: usize,
    /// Built-in fonts already declared in the assembly output.
    pub(crate) builtin_fonts: HashMap<BuiltInFont, String>,
    font_counter: usize,
    image_counter: usize,
}

impl<'a, A: Assembler> Vm<'a, A> {
    pub fn new(machine: &'a mut Machine<A>, services: Services<'a>) -> Vm<'a, A> {
        Vm {
            machine,
            services,
            ops: ops::built_ins(),
            dialect: None,
            stack: Vec::new(),
            frames: Vec::new(),
            names: HashMap::new(),
            accumulator: Accumulator::Empty,
            page: None,
            embed_depth: 0,
            builtin_fonts: HashMap::new(),
            font_counter: 0,
            image_counter: 0,
        }
    }

    /// Run entities until the scanner is exhausted.
    pub fn run_entities(&mut self, scanner: &mut Scanner) -> Result<(), Error> {
        while let Some(entity) = scanner.next()? {
            let line = scanner.line();
            self.execute_entity(entity).map_err(|e| e.at_line(line))?;
        }
        Ok(())
    }

    /// The end-of-input contract: everything closed, nothing left over.
    pub fn check_final_state(&self) -> Result<(), Error> {
        if !self.frames.is_empty() {
            return Err(Error::state("a group or array is still open"));
        }
        if !self.stack.is_empty() {
            return Err(Error::state(format![
                "{} value(s) left on the stack at the end of the program",
                self.stack.len()
            ]));
        }
        if self.page.is_some() {
            return Err(Error::state("a page is still open"));
        }
        if !matches![self.accumulator, Accumulator::Empty] {
            return Err(Error::state(format![
                "the accumulator still holds {}",
                self.accumulator.description()
            ]));
        }
        Ok(())
    }

    fn execute_entity(&mut self, entity: Entity) -> Result<(), Error> {
        match entity {
            Entity::Str(s) => {
                if let Err(err) = check_content(&s) {
                    return Err(Error::domain(err.to_string()));
                }
                self.push(Value::Str(s.into()));
                Ok(())
            }
            Entity::Atom(name) => {
                self.push(Value::Atom(name.into()));
                Ok(())
            }
            Entity::Integer(i) => match i32::try_from(i) {
                Ok(i) => {
                    self.push(Value::Integer(i));
                    Ok(())
                }
                Err(_) => Err(Error::domain(format![
                    "the integer {i} does not fit the 32-bit value range"
                ])),
            },
            Entity::Fixed(f) => {
                self.push(Value::Fixed(f));
                Ok(())
            }
            Entity::BeginGroup => {
                self.frames.push(Frame::Group {
                    floor: self.stack.len(),
                });
                Ok(())
            }
            Entity::EndGroup => match self.frames.last() {
                Some(Frame::Group { floor }) => {
                    if self.stack.len() != floor + 1 {
                        return Err(Error::state(format![
                            "a group must end with exactly one value, not {}",
                            self.stack.len() - floor
                        ]));
                    }
                    self.frames.pop();
                    Ok(())
                }
                Some(Frame::Array { .. }) => {
                    Err(Error::state("an array is still open inside this group"))
                }
                None => Err(Error::state("there is no group to end")),
            },
            Entity::BeginArray => {
                self.frames.push(Frame::Array {
                    floor: self.stack.len(),
                });
                Ok(())
            }
            Entity::EndArray => match self.frames.last() {
                Some(Frame::Array { floor }) => {
                    let count = self.stack.len() - floor;
                    self.frames.pop();
                    self.push(Value::Integer(count as i32));
                    Ok(())
                }
                Some(Frame::Group { .. }) => {
                    Err(Error::state("a group is still open inside this array"))
                }
                None => Err(Error::state("there is no array to end")),
            },
            Entity::DeclareVar(name) => self.declare(name, false),
            Entity::DeclareConst(name) => self.declare(name, true),
            Entity::Assign(name) => {
                let value = self.pop()?;
                match self.names.get_mut(&name) {
                    None => Err(Error::name(format!["`{name}` is not declared"])),
                    Some(binding) if binding.constant => Err(Error::name(format![
                        "`{name}` is a constant and cannot be assigned"
                    ])),
                    Some(binding) => {
                        binding.value = value;
                        Ok(())
                    }
                }
            }
            Entity::Get(name) => match self.names.get(&name) {
                None => Err(Error::name(format!["`{name}` is not declared"])),
                Some(binding) => {
                    let value = binding.value.clone();
                    self.push(value);
                    Ok(())
                }
            },
            Entity::Op(name) => self.dispatch(&name),
            Entity::BeginMeta | Entity::EndMeta | Entity::MetaToken(_) => {
                Err(Error::syntax("meta entities may only appear in the preamble"))
            }
            Entity::MetaCommand(cmd) => Err(Error::syntax(format![
                "unexpected meta command `@{cmd}`"
            ])),
        }
    }

    fn declare(&mut self, name: String, constant: bool) -> Result<(), Error> {
        let value = self.pop()?;
        if self.ops.contains_key(name.as_str()) {
            return Err(Error::name(format![
                "`{name}` is an operation name and cannot be declared"
            ]));
        }
        if self.names.contains_key(&name) {
            return Err(Error::name(format!["`{name}` is already declared"]));
        }
        self.names.insert(name, Binding { value, constant });
        Ok(())
    }

    fn dispatch(&mut self, name: &str) -> Result<(), Error> {
        let (f, op_dialect) = match self.ops.get(name) {
            None => return Err(Error::name(format!["unknown operation `{name}`"])),
            Some(built_in) => (built_in.f, built_in.dialect),
        };
        if let OpDialect::Only(required) = op_dialect {
            match self.dialect {
                None => self.dialect = Some(required),
                Some(current) if current != required => {
                    return Err(Error::state(format![
                        "`{name}` belongs to the {required} dialect, but this \
                         source already uses the {current} dialect"
                    ]))
                }
                Some(_) => (),
            }
        }
        f(self)
    }

    /// Evaluate an embedded source against a fresh stack and namespace,
    /// sharing the machine and the open page.
    pub(crate) fn run_nested(&mut self, scanner: &mut Scanner) -> Result<(), Error> {
        if self.embed_depth >= 100 {
            return Err(Error::state("embedded sources nest too deeply"));
        }
        let saved_stack = std::mem::take(&mut self.stack);
        let saved_frames = std::mem::take(&mut self.frames);
        let saved_names = std::mem::take(&mut self.names);
        let saved_accumulator = std::mem::take(&mut self.accumulator);
        let saved_dialect = self.dialect;
        self.dialect = Some(Dialect::Incremental);
        self.embed_depth += 1;

        let result = self
            .run_entities(scanner)
            .and_then(|_| self.check_nested_final_state());

        self.embed_depth -= 1;
        self.dialect = saved_dialect;
        self.stack = saved_stack;
        self.frames = saved_frames;
        self.names = saved_names;
        self.accumulator = saved_accumulator;
        result
    }

    fn check_nested_final_state(&self) -> Result<(), Error> {
        if !self.frames.is_empty() {
            return Err(Error::state(
                "a group or array is still open in the embedded source",
            ));
        }
        if !self.stack.is_empty() {
            return Err(Error::state(format![
                "the embedded source left {} value(s) on the stack",
                self.stack.len()
            ]));
        }
        if !matches![self.accumulator, Accumulator::Empty] {
            return Err(Error::state(format![
                "the embedded source left {} in the accumulator",
                self.accumulator.description()
            ]));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stack access for operations.
    // ------------------------------------------------------------------

    fn floor(&self) -> usize {
        self.frames.last().map(Frame::floor).unwrap_or(0)
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Result<Value, Error> {
        if self.stack.len() <= self.floor() {
            return Err(Error::state("no value is visible on the stack here"));
        }
        Ok(self.stack.pop().unwrap())
    }

    pub(crate) fn peek(&self) -> Result<&Value, Error> {
        if self.stack.len() <= self.floor() {
            return Err(Error::state("no value is visible on the stack here"));
        }
        Ok(self.stack.last().unwrap())
    }

    pub(crate) fn pop_integer(&mut self) -> Result<i32, Error> {
        match self.pop()? {
            Value::Integer(i) => Ok(i),
            other => Err(type_error("an integer", &other)),
        }
    }

    /// Pop a non-negative integer used as a count.
    pub(crate) fn pop_count(&mut self) -> Result<usize, Error> {
        let i = self.pop_integer()?;
        usize::try_from(i)
            .map_err(|_| Error::domain(format!["a count cannot be negative, got {i}"]))
    }

    /// Pop a fixed number, promoting integers in [-32767, 32767].
    pub(crate) fn pop_fixed(&mut self) -> Result<Fixed, Error> {
        match self.pop()? {
            Value::Fixed(f) => Ok(f),
            Value::Integer(i) => Fixed::from_integer(i).map_err(|_| {
                Error::type_error(format![
                    "the integer {i} is outside the promotable range"
                ])
            }),
            other => Err(type_error("a fixed number", &other)),
        }
    }

    /// Pop the y then the x coordinate of a point.
    pub(crate) fn pop_point(&mut self) -> Result<Point, Error> {
        let y = self.pop_fixed()?;
        let x = self.pop_fixed()?;
        Ok(Point { x, y })
    }

    pub(crate) fn pop_string(&mut self) -> Result<Rc<str>, Error> {
        match self.pop()? {
            Value::Str(s) => Ok(s),
            other => Err(type_error("a string", &other)),
        }
    }

    /// Pop an atom and check it against the global atom set.
    pub(crate) fn pop_atom(&mut self) -> Result<Rc<str>, Error> {
        match self.pop()? {
            Value::Atom(a) => {
                if !is_known_atom(&a) {
                    return Err(Error::domain(format!["unknown atom \"{a}\""]));
                }
                Ok(a)
            }
            other => Err(type_error("an atom", &other)),
        }
    }

    pub(crate) fn pop_dict(&mut self) -> Result<Rc<Dict>, Error> {
        match self.pop()? {
            Value::Dict(d) => Ok(d),
            other => Err(type_error("a dictionary", &other)),
        }
    }

    pub(crate) fn pop_color(&mut self) -> Result<scent_core::Cmyk, Error> {
        match self.pop()? {
            Value::Color(c) => Ok(c),
            other => Err(type_error("a colour", &other)),
        }
    }

    pub(crate) fn pop_ream(&mut self) -> Result<Rc<Ream>, Error> {
        match self.pop()? {
            Value::Ream(r) => Ok(r),
            other => Err(type_error("a ream", &other)),
        }
    }

    pub(crate) fn pop_stroke(&mut self) -> Result<Rc<Stroke>, Error> {
        match self.pop()? {
            Value::Stroke(s) => Ok(s),
            other => Err(type_error("a stroke", &other)),
        }
    }

    pub(crate) fn pop_font(&mut self) -> Result<Rc<Font>, Error> {
        match self.pop()? {
            Value::Font(f) => Ok(f),
            other => Err(type_error("a font", &other)),
        }
    }

    pub(crate) fn pop_image(&mut self) -> Result<Rc<Image>, Error> {
        match self.pop()? {
            Value::Image(i) => Ok(i),
            other => Err(type_error("an image", &other)),
        }
    }

    pub(crate) fn pop_path(&mut self) -> Result<Rc<Path>, Error> {
        match self.pop()? {
            Value::Path(p) => Ok(p),
            other => Err(type_error("a path", &other)),
        }
    }

    pub(crate) fn pop_transform(&mut self) -> Result<Transform, Error> {
        match self.pop()? {
            Value::Transform(t) => Ok(t),
            other => Err(type_error("a transform", &other)),
        }
    }

    pub(crate) fn pop_style(&mut self) -> Result<Rc<Style>, Error> {
        match self.pop()? {
            Value::Style(s) => Ok(s),
            other => Err(type_error("a style", &other)),
        }
    }

    pub(crate) fn pop_column(&mut self) -> Result<Rc<Column>, Error> {
        match self.pop()? {
            Value::Column(c) => Ok(c),
            other => Err(type_error("a column", &other)),
        }
    }

    pub(crate) fn pop_stroke_or_null(&mut self) -> Result<Option<Rc<Stroke>>, Error> {
        match self.pop()? {
            Value::Null => Ok(None),
            Value::Stroke(s) => Ok(Some(s)),
            other => Err(type_error("a stroke or null", &other)),
        }
    }

    pub(crate) fn pop_color_or_null(&mut self) -> Result<Option<scent_core::Cmyk>, Error> {
        match self.pop()? {
            Value::Null => Ok(None),
            Value::Color(c) => Ok(Some(c)),
            other => Err(type_error("a colour or null", &other)),
        }
    }

    pub(crate) fn pop_clipping_or_null(&mut self) -> Result<Option<Rc<Clipping>>, Error> {
        match self.pop()? {
            Value::Null => Ok(None),
            Value::Clipping(c) => Ok(Some(c)),
            other => Err(type_error("a clipping or null", &other)),
        }
    }

    // ------------------------------------------------------------------
    // Accumulator access for operations.
    // ------------------------------------------------------------------

    pub(crate) fn start_accumulator(&mut self, partial: Accumulator) -> Result<(), Error> {
        if !matches![self.accumulator, Accumulator::Empty] {
            return Err(Error::state(format![
                "the accumulator already holds {}",
                self.accumulator.description()
            ]));
        }
        self.accumulator = partial;
        Ok(())
    }

    pub(crate) fn ream_builder(&mut self) -> Result<&mut ReamBuilder, Error> {
        match &mut self.accumulator {
            Accumulator::Ream(builder) => Ok(builder),
            other => Err(accumulator_error("a ream", other)),
        }
    }

    pub(crate) fn stroke_builder(&mut self) -> Result<&mut StrokeBuilder, Error> {
        match &mut self.accumulator {
            Accumulator::Stroke(builder) => Ok(builder),
            other => Err(accumulator_error("a stroke", other)),
        }
    }

    pub(crate) fn path_builder(&mut self) -> Result<&mut PathBuilder, Error> {
        match &mut self.accumulator {
            Accumulator::Path(builder) => Ok(builder),
            other => Err(accumulator_error("a path", other)),
        }
    }

    pub(crate) fn style_builder(&mut self) -> Result<&mut StyleBuilder, Error> {
        match &mut self.accumulator {
            Accumulator::Style(builder) => Ok(builder),
            other => Err(accumulator_error("a style", other)),
        }
    }

    pub(crate) fn column_builder(&mut self) -> Result<&mut ColumnBuilder, Error> {
        match &mut self.accumulator {
            Accumulator::Column(builder) => Ok(builder),
            other => Err(accumulator_error("a column", other)),
        }
    }

    /// Take the accumulator for a finish operation, leaving it empty.
    pub(crate) fn take_accumulator(&mut self) -> Accumulator {
        std::mem::take(&mut self.accumulator)
    }

    // ------------------------------------------------------------------
    // Page and resource bookkeeping.
    // ------------------------------------------------------------------

    pub(crate) fn require_page(&self) -> Result<&Rc<Ream>, Error> {
        match &self.page {
            None => Err(Error::state("no page is open")),
            Some(ream) => Ok(ream),
        }
    }

    pub(crate) fn next_font_name(&mut self) -> String {
        self.font_counter += 1;
        format!["F{}", self.font_counter]
    }

    pub(crate) fn next_image_name(&mut self) -> String {
        self.image_counter += 1;
        format!["I{}", self.image_counter]
    }

    /// Declare a built-in font in the assembly output on first use and
    /// return its resource name.
    pub(crate) fn ensure_builtin_font(&mut self, family: BuiltInFont) -> Result<String, Error> {
        if let Some(name) = self.builtin_fonts.get(&family) {
            return Ok(name.clone());
        }
        let name = self.next_font_name();
        self.machine
            .execute(&scent_asm::Instruction::FontStandard {
                name: name.clone(),
                family,
            })?;
        self.builtin_fonts.insert(family, name.clone());
        Ok(name)
    }
}

fn type_error(wanted: &str, got: &Value) -> Error {
    Error::type_error(format!["expected {wanted}, got {}", got.description()])
}

fn accumulator_error(wanted: &str, got: &Accumulator) -> Error {
    Error::state(format![
        "this operation requires the accumulator to hold {wanted}, but it holds {}",
        got.description()
    ])
}
