mod demos;

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use miette::{Context, IntoDiagnostic};

use kast_ir::{BuilderOptions, BuilderStack, Function};

/// Kast: records a demo GPU kernel and dumps its AST
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Demo kernel to build
    #[arg(value_enum)]
    demo: Demo,

    /// Record a call whose result is never used (saxpy only)
    #[arg(long)]
    leak: bool,

    /// Skip the unused-call check at finalization
    #[arg(long)]
    no_leak_check: bool,

    /// Also dump every callable the kernel depends on
    #[arg(long)]
    callables: bool,

    /// Print only the structural hash
    #[arg(long)]
    hash_only: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Demo {
    Saxpy,
    ImageBlur,
    Reduce,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let options = BuilderOptions {
        check_leaks: !cli.no_leak_check,
        ..BuilderOptions::default()
    };
    let mut stack = BuilderStack::with_options(options);

    if cli.leak && !matches!(cli.demo, Demo::Saxpy) {
        return Err(miette::miette!("--leak is only supported by the saxpy demo"));
    }

    let (name, result) = match cli.demo {
        Demo::Saxpy => ("saxpy", demos::saxpy(&mut stack, cli.leak)),
        Demo::ImageBlur => ("image-blur", demos::image_blur(&mut stack)),
        Demo::Reduce => ("reduce", demos::reduce(&mut stack)),
    };
    let kernel = result
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to build demo '{name}'"))?;

    if cli.hash_only {
        println!("{:016x}", kernel.hash());
        return Ok(());
    }

    if cli.callables {
        for callable in kernel.collect_callables() {
            print_function(&callable);
            println!();
        }
    }
    print_function(&kernel);
    Ok(())
}

fn print_function(func: &Function) {
    print!("{}", kast_ir::dump_function(func));
    println!("hash: {:016x}", func.hash());
}
