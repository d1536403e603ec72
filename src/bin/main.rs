use std::{
    error::Error,
    fs,
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warc::{compile, lexer::Lexer, parse, util::fmt::tree, CompileOptions};

/// Compiles war programs into LLVM-flavoured IR.
#[derive(Parser, Debug)]
#[command(name = "warc", version)]
struct Args {
    /// Source file to compile, read from stdin if absent
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// What to print on success
    #[arg(long, value_enum, default_value_t = Emit::Ir)]
    emit: Emit,

    /// Name given to the produced module
    #[arg(long, default_value = "main")]
    module_name: String,

    /// Increase log verbosity (overridden by `WARC_LOG`)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Ir,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, Box<dyn Error>> {
    let src = match &args.file {
        Some(path) => fs::read_to_string(path)
            .map_err(|error| format!("failed to read {}: {error}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let output = match args.emit {
        Emit::Tokens => Lexer::new(&src).fold(String::new(), |mut out, token| {
            out.push_str(&format!("{token:?}\n"));
            out
        }),
        Emit::Ast => {
            let compilation = parse(&src)?;
            tree::print_program_string(&compilation.ident_interner, &compilation.program)
        }
        Emit::Ir => {
            let options = CompileOptions {
                module_name: args.module_name.clone(),
            };
            compile(&src, &options)?.to_string()
        }
    };
    Ok(output)
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("WARC_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let layer = fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(io::stderr)
        .compact();

    tracing_subscriber::registry().with(filter).with(layer).init();
}
