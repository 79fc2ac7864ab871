//! Traversal over the syntax tree.
//!
//! Two walker shapes are supported. [`AstVisitor`] is effect-only: a visit
//! returns nothing and the visitor recurses into children as it sees fit.
//! [`ValueVisitor`] computes a result per node, parametric in two output
//! types: one for expressions and one for prototypes/functions. The code
//! generator instantiates the latter with IR values; [`AstPrinter`] below
//! instantiates it with `String` and backs the `Display` impls.

use super::{Expr, Function, Prototype};
use crate::lexer::SourceLocation;

/// Effect-only traversal. Implementations drive recursion themselves.
pub trait AstVisitor {
	fn visit_number(&mut self, value: f64, loc: SourceLocation);
	fn visit_variable(&mut self, name: &str, loc: SourceLocation);
	fn visit_unary(&mut self, op: char, operand: &Expr, loc: SourceLocation);
	fn visit_binary(&mut self, op: char, lhs: &Expr, rhs: &Expr, loc: SourceLocation);
	fn visit_call(&mut self, callee: &str, args: &[Expr], loc: SourceLocation);
	fn visit_if(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr, loc: SourceLocation);
	fn visit_for(
		&mut self,
		var: &str,
		start: &Expr,
		end: &Expr,
		step: Option<&Expr>,
		body: &Expr,
		loc: SourceLocation,
	);
	fn visit_var(&mut self, bindings: &[(String, Option<Expr>)], body: &Expr, loc: SourceLocation);
	fn visit_prototype(&mut self, proto: &Prototype);
	fn visit_function(&mut self, fcn: &Function);
}

/// Value-returning traversal.
pub trait ValueVisitor {
	/// Result of visiting an expression node.
	type Output;
	/// Result of visiting a prototype or a whole function.
	type FcnOutput;

	fn visit_number(&mut self, value: f64, loc: SourceLocation) -> Self::Output;
	fn visit_variable(&mut self, name: &str, loc: SourceLocation) -> Self::Output;
	fn visit_unary(&mut self, op: char, operand: &Expr, loc: SourceLocation) -> Self::Output;
	fn visit_binary(&mut self, op: char, lhs: &Expr, rhs: &Expr, loc: SourceLocation) -> Self::Output;
	fn visit_call(&mut self, callee: &str, args: &[Expr], loc: SourceLocation) -> Self::Output;
	fn visit_if(
		&mut self,
		cond: &Expr,
		then_branch: &Expr,
		else_branch: &Expr,
		loc: SourceLocation,
	) -> Self::Output;
	fn visit_for(
		&mut self,
		var: &str,
		start: &Expr,
		end: &Expr,
		step: Option<&Expr>,
		body: &Expr,
		loc: SourceLocation,
	) -> Self::Output;
	fn visit_var(
		&mut self,
		bindings: &[(String, Option<Expr>)],
		body: &Expr,
		loc: SourceLocation,
	) -> Self::Output;
	fn visit_prototype(&mut self, proto: &Prototype) -> Self::FcnOutput;
	/// Takes the function mutably: emitting a function releases its prototype
	/// into the registry.
	fn visit_function(&mut self, fcn: &mut Function) -> Self::FcnOutput;
}

/// Renders nodes in their canonical textual form.
pub struct AstPrinter;

impl ValueVisitor for AstPrinter {
	type FcnOutput = String;
	type Output = String;

	fn visit_number(&mut self, value: f64, _loc: SourceLocation) -> String { format!("{value}") }

	fn visit_variable(&mut self, name: &str, _loc: SourceLocation) -> String { name.to_string() }

	fn visit_unary(&mut self, op: char, operand: &Expr, _loc: SourceLocation) -> String {
		format!("{op}{}", operand.accept_value(self))
	}

	fn visit_binary(&mut self, op: char, lhs: &Expr, rhs: &Expr, _loc: SourceLocation) -> String {
		format!("({} {op} {})", lhs.accept_value(self), rhs.accept_value(self))
	}

	fn visit_call(&mut self, callee: &str, args: &[Expr], _loc: SourceLocation) -> String {
		let args = args.iter().map(|arg| arg.accept_value(self)).collect::<Vec<_>>();
		format!("{callee}({})", args.join(", "))
	}

	fn visit_if(
		&mut self,
		cond: &Expr,
		then_branch: &Expr,
		else_branch: &Expr,
		_loc: SourceLocation,
	) -> String {
		format!(
			"if {} then\n\t{}\nelse\n\t{}",
			cond.accept_value(self),
			then_branch.accept_value(self),
			else_branch.accept_value(self)
		)
	}

	fn visit_for(
		&mut self,
		_var: &str,
		start: &Expr,
		end: &Expr,
		step: Option<&Expr>,
		body: &Expr,
		_loc: SourceLocation,
	) -> String {
		let mut result = format!("for {}, {}", start.accept_value(self), end.accept_value(self));
		if let Some(step) = step {
			result.push_str(&format!(", {}", step.accept_value(self)));
		}
		result.push_str(&format!("\n\t{}", body.accept_value(self)));
		result
	}

	fn visit_var(
		&mut self,
		bindings: &[(String, Option<Expr>)],
		body: &Expr,
		_loc: SourceLocation,
	) -> String {
		let bindings = bindings
			.iter()
			.map(|(name, init)| match init {
				Some(init) => format!("{name} = {}", init.accept_value(self)),
				None => name.clone(),
			})
			.collect::<Vec<_>>();
		format!("var {} in\n{}", bindings.join(", "), body.accept_value(self))
	}

	fn visit_prototype(&mut self, proto: &Prototype) -> String { proto.to_string() }

	fn visit_function(&mut self, fcn: &mut Function) -> String {
		match fcn.prototype() {
			Some(proto) => format!("def {proto}\n\t{}", fcn.body()),
			None => format!("def <released>\n\t{}", fcn.body()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		ast::{ExprKind, OperatorKind},
		lexer::SourceLocation,
	};

	/// Counts visited nodes per kind, recursing into children.
	#[derive(Default)]
	struct NodeCounter {
		numbers:   usize,
		variables: usize,
		binaries:  usize,
		calls:     usize,
		others:    usize,
	}

	impl AstVisitor for NodeCounter {
		fn visit_number(&mut self, _value: f64, _loc: SourceLocation) { self.numbers += 1; }

		fn visit_variable(&mut self, _name: &str, _loc: SourceLocation) { self.variables += 1; }

		fn visit_unary(&mut self, _op: char, operand: &Expr, _loc: SourceLocation) {
			self.others += 1;
			operand.accept(self);
		}

		fn visit_binary(&mut self, _op: char, lhs: &Expr, rhs: &Expr, _loc: SourceLocation) {
			self.binaries += 1;
			lhs.accept(self);
			rhs.accept(self);
		}

		fn visit_call(&mut self, _callee: &str, args: &[Expr], _loc: SourceLocation) {
			self.calls += 1;
			for arg in args {
				arg.accept(self);
			}
		}

		fn visit_if(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr, _loc: SourceLocation) {
			self.others += 1;
			cond.accept(self);
			then_branch.accept(self);
			else_branch.accept(self);
		}

		fn visit_for(
			&mut self,
			_var: &str,
			start: &Expr,
			end: &Expr,
			step: Option<&Expr>,
			body: &Expr,
			_loc: SourceLocation,
		) {
			self.others += 1;
			start.accept(self);
			end.accept(self);
			if let Some(step) = step {
				step.accept(self);
			}
			body.accept(self);
		}

		fn visit_var(&mut self, bindings: &[(String, Option<Expr>)], body: &Expr, _loc: SourceLocation) {
			self.others += 1;
			for (_, init) in bindings {
				if let Some(init) = init {
					init.accept(self);
				}
			}
			body.accept(self);
		}

		fn visit_prototype(&mut self, _proto: &Prototype) { self.others += 1; }

		fn visit_function(&mut self, fcn: &Function) {
			self.others += 1;
			fcn.body().accept(self);
		}
	}

	fn at(kind: ExprKind) -> Expr { Expr::new(kind, SourceLocation::start()) }

	#[test]
	fn effect_visitor_walks_every_node() {
		// foo(1 + x, 2) * 3
		let call = at(ExprKind::Call {
			callee: "foo".to_string(),
			args:   vec![
				at(ExprKind::Binary {
					op:  '+',
					lhs: at(ExprKind::Number(1.0)).boxed(),
					rhs: at(ExprKind::Variable("x".to_string())).boxed(),
				}),
				at(ExprKind::Number(2.0)),
			],
		});
		let expr = at(ExprKind::Binary {
			op:  '*',
			lhs: call.boxed(),
			rhs: at(ExprKind::Number(3.0)).boxed(),
		});

		let mut counter = NodeCounter::default();
		expr.accept(&mut counter);
		assert_eq!(counter.numbers, 3);
		assert_eq!(counter.variables, 1);
		assert_eq!(counter.binaries, 2);
		assert_eq!(counter.calls, 1);
		assert_eq!(counter.others, 0);
	}

	#[test]
	fn effect_visitor_reaches_function_and_prototype() {
		let proto = Prototype::new_operator(
			"unary!".to_string(),
			vec!["v".to_string()],
			OperatorKind::Unary,
			0,
			SourceLocation::start(),
		);
		let fcn = Function::new(proto.clone(), at(ExprKind::Variable("v".to_string())));

		let mut counter = NodeCounter::default();
		proto.accept(&mut counter);
		fcn.accept(&mut counter);
		assert_eq!(counter.others, 2);
		assert_eq!(counter.variables, 1);
	}

	#[test]
	fn printer_renders_functions() {
		let proto = Prototype::new(
			"foo".to_string(),
			vec!["x".to_string(), "y".to_string()],
			SourceLocation::start(),
		);
		let body = at(ExprKind::Binary {
			op:  '+',
			lhs: at(ExprKind::Variable("x".to_string())).boxed(),
			rhs: at(ExprKind::Variable("y".to_string())).boxed(),
		});
		let mut fcn = Function::new(proto, body);
		assert_eq!(fcn.accept_value(&mut AstPrinter), "def foo(x y)\n\t(x + y)");
	}
}
