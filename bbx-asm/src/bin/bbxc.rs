//! Assembler driver.
//!
//! Sniffs the first significant line of the input: `%asm` selects the
//! assemble pathway; anything else is rejected here.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bbxc", about = "BlackBox assembler", version)]
struct Args {
    /// Assembly source file.
    input: PathBuf,
    /// Output container file.
    output: PathBuf,
    /// Trace sections, labels and encoded instructions to stdout.
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let args = Args::try_parse().unwrap_or_else(|e| {
        // usage and help exit non-zero, like every other failure
        let _ = e.print();
        process::exit(1);
    });

    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stdout)
            .with_target(false)
            .without_time()
            .init();
    }

    process::exit(run(&args));
}

fn run(args: &Args) -> i32 {
    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("bbxc: {}: {e}", args.input.display());
            return 1;
        }
    };

    if !sniff_asm(&source) {
        eprintln!(
            "bbxc: {}: file must start with %asm (only assembly inputs are supported)",
            args.input.display()
        );
        return 1;
    }

    match bbx_asm::assemble(&source) {
        Ok(container) => {
            if let Err(e) = fs::write(&args.output, container) {
                eprintln!("bbxc: {}: {e}", args.output.display());
                return 1;
            }
            println!("Assembly successful.");
            0
        }
        Err(e) => {
            eprintln!("bbxc: {e}");
            1
        }
    }
}

/// Check whether the first non-blank, non-comment line is `%asm`.
fn sniff_asm(source: &str) -> bool {
    source
        .lines()
        .map(|line| match line.find(';') {
            Some(i) => line[..i].trim(),
            None => line.trim(),
        })
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.eq_ignore_ascii_case("%asm"))
}
