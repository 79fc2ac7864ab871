use kaleido::{cli::*, Kaleido};
use palc::Parser;

fn main() {
	let cli = Cli::parse();
	let mut kaleido = Kaleido::new(cli.dump_ir);

	match cli.mode {
		Mode::File { path } => {
			if let Err(e) = kaleido.run_file(&path) {
				eprintln!("Failed run file: {e}");
			}
		}
		Mode::Repl => kaleido.run_prompt(),
	}
}
