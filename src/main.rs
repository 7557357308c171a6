use std::{error::Error, fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_stdin::FileOrStdin;
use tracing_subscriber::EnvFilter;

use cfcc::{compile, lexer::Lexer, options::CompilerOptions};

#[derive(Parser)]
#[command(version, about = "Compiles a program to 32-bit x86 assembly")]
struct Args {
    /// Source file, or `-` to read stdin
    input: FileOrStdin,

    /// Write the assembly here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit every expression as written, ignoring constant propagation
    #[arg(long)]
    no_folding: bool,

    /// Annotate the assembly with comments
    #[arg(long)]
    trace: bool,

    /// Print the token stream and exit
    #[arg(long)]
    tokens: bool,

    /// Log more; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let user_input = args.input.contents()?;

    if args.tokens {
        for token in Lexer::tokenize(&user_input)? {
            println!("{}", token.kind);
        }
        return Ok(());
    }

    let options = CompilerOptions {
        folding_enabled: !args.no_folding,
        trace_enabled: args.trace,
    };
    let assembly = compile(&user_input, &options)?;

    match args.output {
        Some(path) => fs::write(path, assembly)?,
        None => print!("{}", assembly),
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
