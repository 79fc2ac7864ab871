//! Executes finalized IR modules; the stand-in for the JIT collaborator.
//!
//! The engine owns every module the driver hands over. Call targets are
//! resolved by symbol name across all owned modules, most recent definition
//! first, which is exactly what lets a later module call functions whose IR
//! lives in an earlier one through a bare declaration. Names that no module
//! defines fall back to the built-in natives.

use super::{BlockId, FunctionData, Inst, Module, ValueId};

/// Runtime error surfaced while executing IR.
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
	#[error("unknown function referenced: {0}")]
	UnknownFunction(String),
	#[error("function {0} takes {1} arguments but {2} were passed")]
	ArgumentCount(String, usize, usize),
	#[error("malformed body in function {0}")]
	Malformed(String),
}

/// Owns finalized modules and executes their functions by name.
#[derive(Debug, Default)]
pub struct Engine {
	modules: Vec<Module>,
}

impl Engine {
	pub fn new() -> Self { Self::default() }

	/// Takes ownership of a finished module; its definitions become callable
	/// and shadow older definitions of the same name.
	pub fn add_module(&mut self, module: Module) { self.modules.push(module); }

	/// Runs the function `name` with `args`. Falls back to the native
	/// functions for names no module defines.
	pub fn run(&self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
		match self.resolve(name) {
			Some((module, function)) => {
				if function.params().len() != args.len() {
					return Err(EvalError::ArgumentCount(
						name.to_string(),
						function.params().len(),
						args.len(),
					));
				}
				self.exec(module, function, args)
			}
			None => self.native(name, args),
		}
	}

	/// The most recently added live definition of `name`.
	fn resolve(&self, name: &str) -> Option<(&Module, &FunctionData)> {
		self.modules.iter().rev().find_map(|module| {
			module
				.functions()
				.iter()
				.rev()
				.find(|f| !f.is_erased() && !f.is_declaration() && f.name() == name)
				.map(|f| (module, f))
		})
	}

	fn exec(&self, module: &Module, function: &FunctionData, args: &[f64]) -> Result<f64, EvalError> {
		let malformed = || EvalError::Malformed(function.name().to_string());

		let mut values: Vec<Option<f64>> = vec![None; function.inst_count()];
		// Parameters pre-occupy the first value indices.
		for (index, arg) in args.iter().enumerate() {
			values[index] = Some(*arg);
		}
		let mut slots = vec![0.0_f64; function.slot_count()];

		let mut block = function.entry().ok_or_else(malformed)?;
		let mut prev: Option<BlockId> = None;

		'blocks: loop {
			for &id in function.block_insts(block) {
				let value = |v: ValueId| values[v.0].ok_or_else(malformed);
				let result = match function.inst(id) {
					Inst::ConstF64(c) => *c,
					Inst::Param(index) => *args.get(*index).ok_or_else(malformed)?,
					Inst::FAdd(a, b) => value(*a)? + value(*b)?,
					Inst::FSub(a, b) => value(*a)? - value(*b)?,
					Inst::FMul(a, b) => value(*a)? * value(*b)?,
					Inst::FCmpOlt(a, b) => (value(*a)? < value(*b)?) as u8 as f64,
					Inst::FCmpOne(a, b) => (value(*a)? != value(*b)?) as u8 as f64,
					Inst::UiToFp(a) => value(*a)?,
					Inst::Load(slot) => slots[slot.0],
					Inst::Store(a, slot) => {
						let stored = value(*a)?;
						slots[slot.0] = stored;
						stored
					}
					Inst::Call(callee, call_args) => {
						let callee = module.function(*callee);
						let mut argv = Vec::with_capacity(call_args.len());
						for arg in call_args {
							argv.push(value(*arg)?);
						}
						// Symbol resolution is by name, as in the JIT: the
						// latest definition anywhere wins, natives last.
						self.run(callee.name(), &argv)?
					}
					Inst::Phi(incoming) => {
						let from = prev.ok_or_else(malformed)?;
						let chosen = incoming
							.iter()
							.find(|(_, pred)| *pred == from)
							.map(|(chosen, _)| *chosen)
							.ok_or_else(malformed)?;
						value(chosen)?
					}
					Inst::Br(dest) => {
						prev = Some(block);
						block = *dest;
						continue 'blocks;
					}
					Inst::CondBr(cond, then_block, else_block) => {
						prev = Some(block);
						block = if value(*cond)? != 0.0 { *then_block } else { *else_block };
						continue 'blocks;
					}
					Inst::Ret(a) => return value(*a),
				};
				values[id.0] = Some(result);
			}
			// Fell off the end of a block without a terminator.
			return Err(malformed());
		}
	}

	/// Built-in natives backing `extern` declarations that nothing defines.
	fn native(&self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
		let unary = |f: fn(f64) -> f64| match args {
			[x] => Ok(f(*x)),
			_ => Err(EvalError::ArgumentCount(name.to_string(), 1, args.len())),
		};
		match name {
			"sin" => unary(f64::sin),
			"cos" => unary(f64::cos),
			"sqrt" => unary(f64::sqrt),
			// Prints the character of the given codepoint, returns 0.
			"putchard" => unary(|x| {
				print!("{}", (x as u32 as u8) as char);
				0.0
			}),
			// Prints the value followed by a newline, returns 0.
			"printd" => unary(|x| {
				println!("{x}");
				0.0
			}),
			_ => Err(EvalError::UnknownFunction(name.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		codegen::builder::IrBuilder,
		ir::{FuncId, ModuleBuilder},
	};

	fn define_inc(builder: &mut ModuleBuilder) -> FuncId {
		let func = builder.declare_function("inc", &["x".to_string()]);
		builder.begin_function_body(func);
		let x = builder.param(func, 0);
		let one = builder.const_f64(1.0);
		let sum = builder.fadd(x, one, "addtmp");
		builder.ret(sum);
		func
	}

	#[test]
	fn run_simple_arithmetic() {
		let mut builder = ModuleBuilder::new("m");
		define_inc(&mut builder);

		let mut engine = Engine::new();
		engine.add_module(builder.finish());
		assert_eq!(engine.run("inc", &[41.0]).unwrap(), 42.0);
	}

	#[test]
	fn run_checks_arity() {
		let mut builder = ModuleBuilder::new("m");
		define_inc(&mut builder);

		let mut engine = Engine::new();
		engine.add_module(builder.finish());
		assert!(matches!(engine.run("inc", &[]), Err(EvalError::ArgumentCount(_, 1, 0))));
	}

	#[test]
	fn calls_resolve_across_modules() {
		let mut builder = ModuleBuilder::new("m1");
		define_inc(&mut builder);
		let first = builder.finish();

		// A second module only declares `inc` and calls it.
		let mut builder = ModuleBuilder::new("m2");
		let inc = builder.declare_function("inc", &["x".to_string()]);
		let func = builder.declare_function("inc2", &["x".to_string()]);
		builder.begin_function_body(func);
		let x = builder.param(func, 0);
		let once = builder.call(inc, &[x], "calltmp");
		let twice = builder.call(inc, &[once], "calltmp");
		builder.ret(twice);

		let mut engine = Engine::new();
		engine.add_module(first);
		engine.add_module(builder.finish());
		assert_eq!(engine.run("inc2", &[40.0]).unwrap(), 42.0);
	}

	#[test]
	fn latest_definition_wins() {
		let mut engine = Engine::new();
		for constant in [1.0, 2.0] {
			let mut builder = ModuleBuilder::new("m");
			let func = builder.declare_function("k", &[]);
			builder.begin_function_body(func);
			let value = builder.const_f64(constant);
			builder.ret(value);
			engine.add_module(builder.finish());
		}
		assert_eq!(engine.run("k", &[]).unwrap(), 2.0);
	}

	#[test]
	fn conditional_branches_and_phi() {
		// max(a, b) via explicit blocks.
		let mut builder = ModuleBuilder::new("m");
		let func = builder.declare_function("max", &["a".to_string(), "b".to_string()]);
		builder.begin_function_body(func);
		let a = builder.param(func, 0);
		let b = builder.param(func, 1);
		let cond = builder.fcmp_olt(a, b, "cmptmp");
		let then_block = builder.new_block(func, "then");
		builder.attach_block(then_block);
		let else_block = builder.new_block(func, "else");
		builder.attach_block(else_block);
		let merge = builder.new_block(func, "merge");
		builder.attach_block(merge);
		builder.cond_br(cond, then_block, else_block);
		builder.set_insert_point(then_block);
		builder.br(merge);
		builder.set_insert_point(else_block);
		builder.br(merge);
		builder.set_insert_point(merge);
		let result = builder.phi(&[(b, then_block), (a, else_block)], "maxtmp");
		builder.ret(result);
		builder.verify_function(func).unwrap();

		let mut engine = Engine::new();
		engine.add_module(builder.finish());
		assert_eq!(engine.run("max", &[1.0, 9.0]).unwrap(), 9.0);
		assert_eq!(engine.run("max", &[7.0, 2.0]).unwrap(), 7.0);
	}

	#[test]
	fn natives_back_undefined_names() {
		let engine = Engine::new();
		assert_eq!(engine.run("sin", &[0.0]).unwrap(), 0.0);
		assert_eq!(engine.run("sqrt", &[9.0]).unwrap(), 3.0);
		assert!(matches!(engine.run("nope", &[]), Err(EvalError::UnknownFunction(_))));
		assert!(matches!(engine.run("sin", &[1.0, 2.0]), Err(EvalError::ArgumentCount(..))));
	}
}
