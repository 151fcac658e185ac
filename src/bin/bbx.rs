//! Interpreter driver: `bbx <program>`.
//!
//! The process exit code mirrors the program's `HALT` argument; any VM
//! error prints a diagnostic to stderr and exits non-zero.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use bbx_vm::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "bbx", about = "BlackBox VM", version)]
struct Args {
    /// Assembled container file.
    program: PathBuf,
}

fn main() {
    let args = Args::parse();

    let mut vm = Interpreter::new();
    if let Err(e) = vm.load_file(&args.program) {
        eprintln!("bbx: {}: {e}", args.program.display());
        process::exit(1);
    }

    match vm.run() {
        Ok(state) => process::exit(i32::from(state.exit_code())),
        Err(e) => {
            eprintln!("bbx: {e}");
            process::exit(1);
        }
    }
}
