//! MixSL command-line compiler

use clap::{Parser, Subcommand};
use mixsl::{
    CompileResult, EffectCompiler, FileSystemStore, JsonParser, ShaderMacro, ShaderSource,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mixslc")]
#[command(about = "MixSL shader compiler", long_about = None)]
struct Cli {
    /// Class search paths (default: current directory)
    #[arg(short = 'I', long = "path", global = true, value_name = "DIR")]
    paths: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a class and write the flattened tree plus reflection as JSON
    Compile {
        /// Root class name
        class: String,

        /// Fill a composition slot (SLOT=CLASS); repeatable
        #[arg(short = 'w', long = "with", value_name = "SLOT=CLASS")]
        with: Vec<String>,

        /// Macro definitions (NAME=VALUE or NAME)
        #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
        defines: Vec<String>,

        /// Output file (default: <class>.effect.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a class and print diagnostics without writing output
    Check {
        /// Root class name
        class: String,

        /// Macro definitions (NAME=VALUE or NAME)
        #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
        defines: Vec<String>,
    },

    /// Print the reflection description as JSON
    Reflect {
        /// Root class name
        class: String,

        /// Fill a composition slot (SLOT=CLASS); repeatable
        #[arg(short = 'w', long = "with", value_name = "SLOT=CLASS")]
        with: Vec<String>,

        /// Macro definitions (NAME=VALUE or NAME)
        #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
        defines: Vec<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut store = FileSystemStore::new();
    if cli.paths.is_empty() {
        store.add_path(".");
    }
    for path in &cli.paths {
        store.add_path(path);
    }
    let compiler = EffectCompiler::new(Arc::new(store), Arc::new(JsonParser::new()));

    match cli.command {
        Commands::Compile {
            class,
            with,
            defines,
            output,
        } => {
            let result = match run_compile(&compiler, &class, &with, &defines) {
                Ok(result) => result,
                Err(message) => return fail(&message),
            };
            print_diagnostics(&result);
            let (Some(shader), Some(reflection)) = (&result.shader, &result.reflection) else {
                return ExitCode::FAILURE;
            };

            let output = output.unwrap_or_else(|| PathBuf::from(format!("{class}.effect.json")));
            let document = serde_json::json!({
                "shader": shader,
                "reflection": reflection,
            });
            let text = match serde_json::to_string_pretty(&document) {
                Ok(text) => text,
                Err(err) => return fail(&format!("cannot serialize output: {err}")),
            };
            if let Err(err) = std::fs::write(&output, text) {
                return fail(&format!("cannot write {}: {err}", output.display()));
            }
            println!("wrote {}", output.display());
            ExitCode::SUCCESS
        }

        Commands::Check { class, defines } => {
            let result = match run_compile(&compiler, &class, &[], &defines) {
                Ok(result) => result,
                Err(message) => return fail(&message),
            };
            print_diagnostics(&result);
            if result.succeeded() {
                println!("{class}: ok");
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }

        Commands::Reflect {
            class,
            with,
            defines,
        } => {
            let result = match run_compile(&compiler, &class, &with, &defines) {
                Ok(result) => result,
                Err(message) => return fail(&message),
            };
            print_diagnostics(&result);
            let Some(reflection) = &result.reflection else {
                return ExitCode::FAILURE;
            };
            match serde_json::to_string_pretty(reflection) {
                Ok(text) => {
                    println!("{text}");
                    ExitCode::SUCCESS
                }
                Err(err) => fail(&format!("cannot serialize reflection: {err}")),
            }
        }
    }
}

fn run_compile(
    compiler: &EffectCompiler,
    class: &str,
    with: &[String],
    defines: &[String],
) -> Result<CompileResult, String> {
    let source = build_source(class, with)?;
    let macros = parse_defines(defines)?;
    compiler
        .compile(&source, &macros)
        .map_err(|err| err.to_string())
}

fn build_source(class: &str, with: &[String]) -> Result<ShaderSource, String> {
    if with.is_empty() {
        return Ok(ShaderSource::class(class));
    }
    let mut compositions = Vec::with_capacity(with.len());
    for pair in with {
        let (slot, filler) = pair
            .split_once('=')
            .ok_or_else(|| format!("bad composition {pair:?}, expected SLOT=CLASS"))?;
        compositions.push((slot.to_string(), ShaderSource::class(filler)));
    }
    Ok(ShaderSource::mixin(class, compositions))
}

fn parse_defines(defines: &[String]) -> Result<Vec<ShaderMacro>, String> {
    defines
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => Ok(ShaderMacro::new(name, value)),
            None if !pair.is_empty() => Ok(ShaderMacro::flag(pair)),
            None => Err("empty define".to_string()),
        })
        .collect()
}

fn print_diagnostics(result: &CompileResult) {
    for diagnostic in result.diagnostics.entries() {
        eprintln!("{diagnostic}");
    }
}

fn fail(message: &str) -> ExitCode {
    eprintln!("error: {message}");
    ExitCode::FAILURE
}
