//! The IR-emitting walker over the syntax tree.
//!
//! `Codegen` implements the value-returning visitor with IR values as the
//! expression output, writing through an abstract [`IrBuilder`]. It keeps the
//! scoped name environment: a map from variable name to the stack slot
//! holding its current value. `for` and `var` shadow entries on the way in
//! and restore them on the way out, so the environment after a construct is
//! the one from before it.
//!
//! Emitting a function moves its prototype into the session's registry and,
//! for user-defined binary operators, publishes the declared precedence to
//! the operator table before the next top-level form is parsed.

pub mod builder;

use std::collections::HashMap;

pub use builder::IrBuilder;

use crate::{
	ast::{visit::ValueVisitor, Expr, ExprKind, Function, Prototype},
	error::codegen::{CodegenError, CodegenErrorKind::*},
	lexer::SourceLocation,
	session::Session,
};

type Result<T> = std::result::Result<T, CodegenError>;

/// Emits one module's worth of top-level forms.
pub struct Codegen<'a, B: IrBuilder> {
	session:      &'a mut Session,
	builder:      &'a mut B,
	/// In-scope storage slot of every mutable variable; reset per function.
	named_values: HashMap<String, B::Slot>,
}

impl<'a, B: IrBuilder> Codegen<'a, B> {
	pub fn new(session: &'a mut Session, builder: &'a mut B) -> Self {
		Self { session, builder, named_values: HashMap::new() }
	}

	/// Emits a function definition into the current module.
	pub fn emit_function(&mut self, fcn: &mut Function) -> Result<B::Function> { fcn.accept_value(self) }

	/// Emits an extern declaration and stores its prototype in the registry.
	pub fn emit_extern(&mut self, proto: Prototype) -> Result<B::Function> {
		let function = self.visit_prototype(&proto)?;
		self.session.registry.add(proto);
		Ok(function)
	}

	/// Resolves a call target: an existing function of the current module,
	/// or a fresh declaration re-emitted from the registry's prototype. The
	/// JIT loop hands finished modules away, so re-declaring is the normal
	/// case for anything defined in an earlier form.
	fn resolve_function(&mut self, name: &str) -> Option<B::Function> {
		if let Some(function) = self.builder.find_function(name) {
			return Some(function);
		}
		let proto = self.session.registry.get(name)?.clone();
		self.visit_prototype(&proto).ok()
	}

	fn current_function(&self) -> B::Function { self.builder.parent_function(self.builder.insert_block()) }
}

impl<B: IrBuilder> ValueVisitor for Codegen<'_, B> {
	type FcnOutput = Result<B::Function>;
	type Output = Result<B::Value>;

	fn visit_number(&mut self, value: f64, _loc: SourceLocation) -> Self::Output {
		Ok(self.builder.const_f64(value))
	}

	fn visit_variable(&mut self, name: &str, loc: SourceLocation) -> Self::Output {
		let slot = match self.named_values.get(name) {
			Some(slot) => *slot,
			None => return Err(CodegenError::new(loc, UnknownVariable(name.to_string()))),
		};
		Ok(self.builder.load(slot, name))
	}

	fn visit_unary(&mut self, op: char, operand: &Expr, loc: SourceLocation) -> Self::Output {
		let operand_value = operand.accept_value(self)?;
		let callee = match self.resolve_function(&format!("unary{op}")) {
			Some(callee) => callee,
			None => return Err(CodegenError::new(loc, UnknownUnaryOperator(op))),
		};
		Ok(self.builder.call(callee, &[operand_value], "unop"))
	}

	fn visit_binary(&mut self, op: char, lhs: &Expr, rhs: &Expr, loc: SourceLocation) -> Self::Output {
		// Assignment is special: the left side is a binding name, not a value.
		if op == '=' {
			let name = match &lhs.kind {
				ExprKind::Variable(name) => name.clone(),
				_ => return Err(CodegenError::new(loc, AssignmentTarget)),
			};
			let value = rhs.accept_value(self)?;
			let slot = match self.named_values.get(&name) {
				Some(slot) => *slot,
				None => return Err(CodegenError::new(loc, UnknownVariable(name))),
			};
			self.builder.store(value, slot);
			return Ok(value);
		}

		let lhs_value = lhs.accept_value(self)?;
		let rhs_value = rhs.accept_value(self)?;
		match op {
			'+' => Ok(self.builder.fadd(lhs_value, rhs_value, "addtmp")),
			'-' => Ok(self.builder.fsub(lhs_value, rhs_value, "subtmp")),
			'*' => Ok(self.builder.fmul(lhs_value, rhs_value, "multmp")),
			'<' => {
				let bit = self.builder.fcmp_olt(lhs_value, rhs_value, "cmptmp");
				// The language has no boolean type; widen back to f64.
				Ok(self.builder.ui_to_fp(bit, "booltmp"))
			}
			_ => {
				// The parser only builds user Binary nodes for glyphs already
				// in the operator table, so the definition must exist.
				let callee =
					self.resolve_function(&format!("binary{op}")).expect("binary operator not found");
				Ok(self.builder.call(callee, &[lhs_value, rhs_value], "binop"))
			}
		}
	}

	fn visit_call(&mut self, callee: &str, args: &[Expr], loc: SourceLocation) -> Self::Output {
		let function = match self.resolve_function(callee) {
			Some(function) => function,
			None => return Err(CodegenError::new(loc, UnknownFunction(callee.to_string()))),
		};

		let expected = self.builder.param_count(function);
		if expected != args.len() {
			return Err(CodegenError::new(
				loc,
				ArgumentCount { callee: callee.to_string(), expected, got: args.len() },
			));
		}

		let mut arg_values = Vec::with_capacity(args.len());
		for arg in args {
			arg_values.push(arg.accept_value(self)?);
		}
		Ok(self.builder.call(function, &arg_values, "calltmp"))
	}

	fn visit_if(
		&mut self,
		cond: &Expr,
		then_branch: &Expr,
		else_branch: &Expr,
		_loc: SourceLocation,
	) -> Self::Output {
		let cond_value = cond.accept_value(self)?;
		let zero = self.builder.const_f64(0.0);
		let cond_bit = self.builder.fcmp_one(cond_value, zero, "ifcond");

		let function = self.current_function();
		let then_block = self.builder.new_block(function, "then");
		self.builder.attach_block(then_block);
		let else_block = self.builder.new_block(function, "else");
		let merge_block = self.builder.new_block(function, "ifcont");

		self.builder.cond_br(cond_bit, then_block, else_block);

		self.builder.set_insert_point(then_block);
		let then_value = then_branch.accept_value(self)?;
		self.builder.br(merge_block);
		// The arm's own emission may have split control flow; the phi needs
		// the block it actually ended in.
		let then_end = self.builder.insert_block();

		self.builder.attach_block(else_block);
		self.builder.set_insert_point(else_block);
		let else_value = else_branch.accept_value(self)?;
		self.builder.br(merge_block);
		let else_end = self.builder.insert_block();

		self.builder.attach_block(merge_block);
		self.builder.set_insert_point(merge_block);
		Ok(self.builder.phi(&[(then_value, then_end), (else_value, else_end)], "iftmp"))
	}

	fn visit_for(
		&mut self,
		var: &str,
		start: &Expr,
		end: &Expr,
		step: Option<&Expr>,
		body: &Expr,
		_loc: SourceLocation,
	) -> Self::Output {
		let function = self.current_function();
		let slot = self.builder.entry_alloca(function, var);

		// The start value is emitted with the induction variable not yet in
		// scope.
		let start_value = start.accept_value(self)?;
		self.builder.store(start_value, slot);

		let loop_block = self.builder.new_block(function, "loop");
		self.builder.attach_block(loop_block);
		self.builder.br(loop_block);
		self.builder.set_insert_point(loop_block);

		// Shadow any outer binding of the induction variable.
		let shadowed = self.named_values.insert(var.to_string(), slot);

		// The body's value is ignored, but its emission must succeed.
		body.accept_value(self)?;

		let step_value = match step {
			Some(step) => step.accept_value(self)?,
			None => self.builder.const_f64(1.0),
		};
		let end_value = end.accept_value(self)?;

		// Reload, increment and store back: the body may itself have written
		// the induction variable.
		let current = self.builder.load(slot, var);
		let next = self.builder.fadd(current, step_value, "nextvar");
		self.builder.store(next, slot);

		let zero = self.builder.const_f64(0.0);
		let end_bit = self.builder.fcmp_one(end_value, zero, "loopcond");

		let after_block = self.builder.new_block(function, "afterloop");
		self.builder.attach_block(after_block);
		self.builder.cond_br(end_bit, loop_block, after_block);
		self.builder.set_insert_point(after_block);

		match shadowed {
			Some(old) => {
				self.named_values.insert(var.to_string(), old);
			}
			None => {
				self.named_values.remove(var);
			}
		}

		// A for expression always evaluates to 0.0.
		Ok(self.builder.const_f64(0.0))
	}

	fn visit_var(
		&mut self,
		bindings: &[(String, Option<Expr>)],
		body: &Expr,
		_loc: SourceLocation,
	) -> Self::Output {
		let function = self.current_function();
		let mut shadowed = Vec::with_capacity(bindings.len());

		for (name, init) in bindings {
			// The initializer is emitted before the name enters scope, so
			// `var a = a in ...` reads the outer `a`.
			let init_value = match init {
				Some(init) => init.accept_value(self)?,
				None => self.builder.const_f64(0.0),
			};
			let slot = self.builder.entry_alloca(function, name);
			self.builder.store(init_value, slot);
			shadowed.push((name.clone(), self.named_values.insert(name.clone(), slot)));
		}

		let body_value = body.accept_value(self);

		for (name, old) in shadowed {
			match old {
				Some(old) => {
					self.named_values.insert(name, old);
				}
				None => {
					self.named_values.remove(&name);
				}
			}
		}

		body_value
	}

	fn visit_prototype(&mut self, proto: &Prototype) -> Self::FcnOutput {
		Ok(self.builder.declare_function(proto.name(), proto.params()))
	}

	fn visit_function(&mut self, fcn: &mut Function) -> Self::FcnOutput {
		let proto = fcn.take_prototype().expect("function prototype already released");
		let name = proto.name().to_string();
		let operator = proto.is_binary_op().then(|| (proto.operator_glyph(), proto.precedence()));

		// The registry owns the prototype from here on; resolving through it
		// declares the function in the current module.
		self.session.registry.add(proto);
		let function = self.resolve_function(&name).expect("registered prototype must resolve");

		// Publish a user operator's precedence before any later form is
		// parsed.
		if let Some((glyph, precedence)) = operator {
			self.session.operators.set(glyph, precedence);
		}

		self.builder.begin_function_body(function);
		self.named_values.clear();
		for index in 0..self.builder.param_count(function) {
			let param_name = self.builder.param_name(function, index);
			let slot = self.builder.entry_alloca(function, &param_name);
			let value = self.builder.param(function, index);
			self.builder.store(value, slot);
			self.named_values.insert(param_name, slot);
		}

		match fcn.body().accept_value(self) {
			Ok(ret) => {
				self.builder.ret(ret);
				if let Err(message) = self.builder.verify_function(function) {
					self.builder.erase_function(function);
					return Err(CodegenError::new(fcn.body().loc, Verifier(message)));
				}
				self.builder.optimize_function(function);
				Ok(function)
			}
			Err(error) => {
				self.builder.erase_function(function);
				Err(error)
			}
		}
	}
}
