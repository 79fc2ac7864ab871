use std::path::PathBuf;

use palc::{Parser, Subcommand};

/// CLI arguments
#[derive(Parser)]
#[command(name = "kaleido", after_long_help = "A Kaleidoscope-style JIT compiler.")]
pub struct Cli {
	/// Print every emitted IR module
	#[arg(long)]
	pub dump_ir: bool,
	/// Program mode
	#[command(subcommand)]
	pub mode:    Mode,
}

/// Program mode
#[derive(Subcommand, Debug)]
pub enum Mode {
	/// Compile and run a source file
	File { path: PathBuf },
	/// Interactive prompt
	Repl,
}
