//! rcc CLI
//!
//! Positional driver matching spec §6 exactly: `rcc [INPUT] [OUTPUT]
//! [MODE]`, defaults `./test.c`, `./test`, `exec`.

use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{Shell, generate};
use rcc::{CompilerConfig, OutputMode};
use std::io;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "rcc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A rosebud-style C-subset compiler targeting 32-bit x86 NASM", long_about = None)]
struct Cli {
    /// Source file to compile
    #[arg(default_value = "./test.c")]
    input: PathBuf,

    /// Path to write the generated NASM assembly
    #[arg(default_value = "./test")]
    output: PathBuf,

    /// "exec" or "object"
    #[arg(default_value = "exec")]
    mode: String,

    /// Print shell completions for the given shell and exit
    #[arg(long, value_enum, exclusive = true)]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "rcc", &mut io::stdout());
        return;
    }

    let Some(mode) = OutputMode::parse(&cli.mode) else {
        eprintln!("unknown mode '{}', expected 'exec' or 'object'", cli.mode);
        process::exit(1);
    };

    let config = CompilerConfig::new()
        .with_input(cli.input)
        .with_output(cli.output)
        .with_mode(mode);

    if let Err(e) = rcc::compile(&config) {
        eprintln!("{e}");
        process::exit(1);
    }

    if config.invoke_nasm {
        match rcc::assemble(&config) {
            Ok(status) if status.success() => {}
            Ok(status) => process::exit(status.code().unwrap_or(1)),
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    }
}
