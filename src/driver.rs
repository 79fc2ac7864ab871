//! The interactive driver: reads source, dispatches top-level forms and
//! interleaves parsing, codegen and execution.
//!
//! Each successful form is emitted into its own fresh IR module which is then
//! handed to the execution engine, the same discipline a resource-tracking
//! JIT imposes. That is why the prototype registry exists: a later form
//! cannot see the IR of an earlier one, only its re-declared symbol.
//!
//! Parse errors print as `ParseError: ...`, codegen and runtime errors as
//! `Error: ...`; after either, the driver skips one token and carries on with
//! the next form.

use std::{fs::read_to_string, io::Write, path::Path};

use anyhow::Context;

use crate::{
	codegen::Codegen,
	error::KaleidoError,
	ir::{eval::Engine, ModuleBuilder},
	lexer::Token,
	parser::{Parser, ANON_FUNCTION},
	session::Session,
};

/// One interactive compiler instance; session and engine live as long as it
/// does, so definitions accumulate across `run` calls.
pub struct Kaleido {
	session: Session,
	engine:  Engine,
	dump_ir: bool,
	modules: usize,
}

impl Kaleido {
	pub fn new(dump_ir: bool) -> Self {
		Self { session: Session::new(), engine: Engine::new(), dump_ir, modules: 0 }
	}

	pub fn run_file(&mut self, path: &Path) -> Result<Vec<f64>, KaleidoError> {
		let source = read_to_string(path).context("Failed open source file")?;
		self.run(&source)
	}

	pub fn run_prompt(&mut self) {
		let mut input = String::new();
		let stdin = std::io::stdin();
		loop {
			input.clear();
			print!("ready> ");
			if let Err(e) = std::io::stdout().flush() {
				eprintln!("Failed flush: {e}");
			}
			match stdin.read_line(&mut input) {
				Ok(0) => {
					println!("\nGoodbye!");
					break;
				}
				Ok(_) => {}
				Err(e) => {
					eprintln!("Failed read line: {e}");
					continue;
				}
			}
			if let Err(e) = self.run(input.trim()) {
				eprintln!("{e}");
			}
		}
	}

	/// Compiles and executes every top-level form in `source`. Returns the
	/// value of each top-level expression, in order.
	pub fn run(&mut self, source: &str) -> Result<Vec<f64>, KaleidoError> {
		let mut parser = Parser::new(source);
		let mut results = Vec::new();
		let mut error_count = 0;

		// Prime the first token.
		parser.advance();
		loop {
			match parser.current().clone() {
				Token::Eof => break,
				// Top-level semicolons are separators, nothing more.
				Token::Char(';') => {
					parser.advance();
				}
				Token::Def => {
					if self.handle_definition(&mut parser).is_err() {
						error_count += 1;
					}
				}
				Token::Extern => {
					if self.handle_extern(&mut parser).is_err() {
						error_count += 1;
					}
				}
				_ => match self.handle_top_level(&mut parser) {
					Ok(value) => results.push(value),
					Err(()) => error_count += 1,
				},
			}
		}

		if error_count > 0 {
			return Err(KaleidoError::CompileErrors(error_count));
		}
		Ok(results)
	}

	fn handle_definition(&mut self, parser: &mut Parser) -> Result<(), ()> {
		let mut fcn = match parser.parse_definition(&self.session) {
			Ok(fcn) => fcn,
			Err(e) => {
				Self::recover(parser, &format!("ParseError: {e}"));
				return Err(());
			}
		};

		let mut builder = self.new_builder();
		if let Err(e) = Codegen::new(&mut self.session, &mut builder).emit_function(&mut fcn) {
			eprintln!("Error: {e}");
			return Err(());
		}
		self.finish_module(builder);
		Ok(())
	}

	fn handle_extern(&mut self, parser: &mut Parser) -> Result<(), ()> {
		let proto = match parser.parse_extern() {
			Ok(proto) => proto,
			Err(e) => {
				Self::recover(parser, &format!("ParseError: {e}"));
				return Err(());
			}
		};

		let mut builder = self.new_builder();
		if let Err(e) = Codegen::new(&mut self.session, &mut builder).emit_extern(proto) {
			eprintln!("Error: {e}");
			return Err(());
		}
		self.finish_module(builder);
		Ok(())
	}

	/// Wraps the expression under the reserved name, emits it and asks the
	/// engine for its value.
	fn handle_top_level(&mut self, parser: &mut Parser) -> Result<f64, ()> {
		let mut fcn = match parser.parse_top_level_expr(&self.session) {
			Ok(fcn) => fcn,
			Err(e) => {
				Self::recover(parser, &format!("ParseError: {e}"));
				return Err(());
			}
		};

		let mut builder = self.new_builder();
		if let Err(e) = Codegen::new(&mut self.session, &mut builder).emit_function(&mut fcn) {
			eprintln!("Error: {e}");
			return Err(());
		}
		self.finish_module(builder);

		match self.engine.run(ANON_FUNCTION, &[]) {
			Ok(value) => {
				println!("Evaluated to {value}");
				Ok(value)
			}
			Err(e) => {
				eprintln!("Error: {e}");
				Err(())
			}
		}
	}

	/// Logs a diagnostic and skips one token so the next form can parse.
	fn recover(parser: &mut Parser, message: &str) {
		eprintln!("{message}");
		parser.advance();
	}

	fn new_builder(&mut self) -> ModuleBuilder {
		self.modules += 1;
		ModuleBuilder::new(&format!("jit.{}", self.modules))
	}

	/// Hands the finished module to the engine; from now on other forms can
	/// only reach its functions through the registry's prototypes.
	fn finish_module(&mut self, builder: ModuleBuilder) {
		let module = builder.finish();
		if self.dump_ir {
			println!("{module}");
		}
		self.engine.add_module(module);
	}
}
