use clap::Parser;
use colored::Colorize;
use scent_asm::{Machine, TextAssembler};
use scent_lang::services::RealFileSystem;
use scent_pdf::{FileFontLoader, FileImageLoader, PdfAssembler};
use std::fs;
use std::path::PathBuf;

/// The Scent document compiler
#[derive(Parser)]
#[command(name = "scent", version)]
struct Opts {
    #[command(subcommand)]
    subcmd: SubCommand,
}

#[derive(clap::Subcommand)]
enum SubCommand {
    Compile(Compile),
    Lower(Lower),
    Assemble(Assemble),
    /// List every operation with its one-line documentation
    Ops,
}

/// Compile a Scent document to PDF
#[derive(Parser)]
struct Compile {
    /// Path to the Scent source file
    input: PathBuf,
    /// Path of the PDF to write
    output: PathBuf,
}

/// Lower a Scent document to assembly text
#[derive(Parser)]
struct Lower {
    /// Path to the Scent source file
    input: PathBuf,
    /// Write the assembly here instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Run an assembly file and write the PDF
#[derive(Parser)]
struct Assemble {
    /// Path to the assembly source file
    input: PathBuf,
    /// Path of the PDF to write
    output: PathBuf,
}

fn main() {
    let opts: Opts = Opts::parse();
    let result = match opts.subcmd {
        SubCommand::Compile(args) => compile(&args),
        SubCommand::Lower(args) => lower(&args),
        SubCommand::Assemble(args) => assemble(&args),
        SubCommand::Ops => {
            ops();
            Ok(())
        }
    };
    if let Err(err) = result {
        eprintln!["{} {err}", "error:".red().bold()];
        std::process::exit(1);
    }
}

fn compile(args: &Compile) -> Result<(), anyhow::Error> {
    let source = fs::read_to_string(&args.input)?;
    let mut fonts = FileFontLoader::default();
    let mut images = FileImageLoader::default();
    let mut machine = Machine::new(PdfAssembler::new(fonts.cache(), images.cache()));
    scent_lang::run_document(
        &source,
        &mut machine,
        scent_lang::Services {
            fonts: &mut fonts,
            images: &mut images,
            file_system: &RealFileSystem,
        },
    )?;
    let bytes = machine.finish()?.into_bytes();
    fs::write(&args.output, bytes)?;
    Ok(())
}

fn lower(args: &Lower) -> Result<(), anyhow::Error> {
    let source = fs::read_to_string(&args.input)?;
    let mut fonts = FileFontLoader::default();
    let mut images = FileImageLoader::default();
    let mut machine = Machine::new(TextAssembler::new());
    scent_lang::run_document(
        &source,
        &mut machine,
        scent_lang::Services {
            fonts: &mut fonts,
            images: &mut images,
            file_system: &RealFileSystem,
        },
    )?;
    let text = machine.finish()?.into_text();
    match &args.output {
        None => print!["{text}"],
        Some(path) => fs::write(path, text)?,
    }
    Ok(())
}

fn assemble(args: &Assemble) -> Result<(), anyhow::Error> {
    let source = fs::read_to_string(&args.input)?;
    let mut machine = Machine::new(PdfAssembler::default());
    machine.run_source(&source)?;
    let bytes = machine.finish()?.into_bytes();
    fs::write(&args.output, bytes)?;
    Ok(())
}

fn ops() {
    let built_ins = scent_lang::ops::built_ins::<TextAssembler>();
    let mut names: Vec<&&str> = built_ins.keys().collect();
    names.sort();
    for name in names {
        let built_in = &built_ins[*name];
        let dialect = match built_in.dialect {
            scent_lang::ops::OpDialect::Any => String::new(),
            scent_lang::ops::OpDialect::Only(d) => format!["  ({d} only)"],
        };
        println!["{}  {}{}", name.bold(), built_in.doc, dialect.dimmed()];
    }
}
