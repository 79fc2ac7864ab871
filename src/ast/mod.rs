//! The abstract syntax tree.
//!
//! Expressions are one closed sum type, [`ExprKind`], wrapped with the source
//! location the parser captured for the node. Nodes exclusively own their
//! children and are never mutated once built; the one exception is the
//! prototype slot of a [`Function`], which is handed over to the prototype
//! registry when the function is emitted (see [`Function::take_prototype`]).
//!
//! Traversal happens through the visitors in [`visit`]: walkers either match
//! on [`ExprKind`] directly or implement one of the two visitor traits.

pub mod visit;

use std::fmt;

use crate::lexer::SourceLocation;
use visit::{AstPrinter, AstVisitor, ValueVisitor};

/// An expression node with the location of its first token.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
	pub kind: ExprKind,
	pub loc:  SourceLocation,
}

/// Every expression form of the language.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
	/// Number literal.
	Number(f64),
	/// Reference to a named mutable variable.
	Variable(String),
	/// Application of a prefix operator.
	Unary { op: char, operand: Box<Expr> },
	/// Application of an infix operator, including assignment `=`.
	Binary { op: char, lhs: Box<Expr>, rhs: Box<Expr> },
	/// Call of a named function.
	Call { callee: String, args: Vec<Expr> },
	/// `if <cond> then <a> else <b>`; both arms are mandatory since the
	/// construct is an expression.
	If {
		cond:        Box<Expr>,
		then_branch: Box<Expr>,
		else_branch: Box<Expr>,
	},
	/// `for <var> = <start>, <end>[, <step>] in <body>`.
	For {
		var:   String,
		start: Box<Expr>,
		end:   Box<Expr>,
		step:  Option<Box<Expr>>,
		body:  Box<Expr>,
	},
	/// `var <name> [= <init>], ... in <body>`.
	Var {
		bindings: Vec<(String, Option<Expr>)>,
		body:     Box<Expr>,
	},
}

impl Expr {
	pub fn new(kind: ExprKind, loc: SourceLocation) -> Self { Self { kind, loc } }

	pub fn boxed(self) -> Box<Self> { Box::new(self) }

	/// Stable short kind string, for diagnostics and tests.
	pub fn kind_name(&self) -> &'static str {
		match &self.kind {
			ExprKind::Number(_) => "Number",
			ExprKind::Variable(_) => "Variable",
			ExprKind::Unary { .. } => "Unary",
			ExprKind::Binary { .. } => "Binary",
			ExprKind::Call { .. } => "Call",
			ExprKind::If { .. } => "If-Then-Else",
			ExprKind::For { .. } => "ForLoop",
			ExprKind::Var { .. } => "Var",
		}
	}

	/// Effect-only traversal entry point.
	pub fn accept<V: AstVisitor>(&self, visitor: &mut V) {
		match &self.kind {
			ExprKind::Number(value) => visitor.visit_number(*value, self.loc),
			ExprKind::Variable(name) => visitor.visit_variable(name, self.loc),
			ExprKind::Unary { op, operand } => visitor.visit_unary(*op, operand, self.loc),
			ExprKind::Binary { op, lhs, rhs } => visitor.visit_binary(*op, lhs, rhs, self.loc),
			ExprKind::Call { callee, args } => visitor.visit_call(callee, args, self.loc),
			ExprKind::If { cond, then_branch, else_branch } => {
				visitor.visit_if(cond, then_branch, else_branch, self.loc)
			}
			ExprKind::For { var, start, end, step, body } => {
				visitor.visit_for(var, start, end, step.as_deref(), body, self.loc)
			}
			ExprKind::Var { bindings, body } => visitor.visit_var(bindings, body, self.loc),
		}
	}

	/// Value-returning traversal entry point, parametric in the result type.
	pub fn accept_value<V: ValueVisitor>(&self, visitor: &mut V) -> V::Output {
		match &self.kind {
			ExprKind::Number(value) => visitor.visit_number(*value, self.loc),
			ExprKind::Variable(name) => visitor.visit_variable(name, self.loc),
			ExprKind::Unary { op, operand } => visitor.visit_unary(*op, operand, self.loc),
			ExprKind::Binary { op, lhs, rhs } => visitor.visit_binary(*op, lhs, rhs, self.loc),
			ExprKind::Call { callee, args } => visitor.visit_call(callee, args, self.loc),
			ExprKind::If { cond, then_branch, else_branch } => {
				visitor.visit_if(cond, then_branch, else_branch, self.loc)
			}
			ExprKind::For { var, start, end, step, body } => {
				visitor.visit_for(var, start, end, step.as_deref(), body, self.loc)
			}
			ExprKind::Var { bindings, body } => visitor.visit_var(bindings, body, self.loc),
		}
	}
}

impl fmt::Display for Expr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.accept_value(&mut AstPrinter))
	}
}

/// The operator flavor a prototype declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
	None,
	Unary,
	Binary,
}

/// Name and parameter list of a function, plus operator metadata.
///
/// For operator prototypes the registered name is `"unary"` or `"binary"`
/// followed by the operator glyph, so the glyph is always recoverable as the
/// last character of the name.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
	name:       String,
	params:     Vec<String>,
	op_kind:    OperatorKind,
	precedence: i32,
	loc:        SourceLocation,
}

impl Prototype {
	/// A plain, non-operator prototype.
	pub fn new(name: String, params: Vec<String>, loc: SourceLocation) -> Self {
		Self { name, params, op_kind: OperatorKind::None, precedence: 0, loc }
	}

	/// A user-defined operator prototype. `precedence` only matters for
	/// binary operators.
	pub fn new_operator(
		name: String,
		params: Vec<String>,
		op_kind: OperatorKind,
		precedence: i32,
		loc: SourceLocation,
	) -> Self {
		Self { name, params, op_kind, precedence, loc }
	}

	pub fn name(&self) -> &str { &self.name }

	pub fn params(&self) -> &[String] { &self.params }

	pub fn loc(&self) -> SourceLocation { self.loc }

	pub fn op_kind(&self) -> OperatorKind { self.op_kind }

	pub fn is_unary_op(&self) -> bool { self.op_kind == OperatorKind::Unary }

	pub fn is_binary_op(&self) -> bool { self.op_kind == OperatorKind::Binary }

	/// The declared glyph of an operator prototype.
	pub fn operator_glyph(&self) -> char {
		self.name.chars().next_back().expect("operator prototype has a glyph")
	}

	pub fn precedence(&self) -> i32 { self.precedence }

	/// Stable short kind string, for diagnostics and tests.
	pub fn kind_name(&self) -> &'static str { "FunctionPrototype" }

	pub fn accept<V: AstVisitor>(&self, visitor: &mut V) { visitor.visit_prototype(self) }

	pub fn accept_value<V: ValueVisitor>(&self, visitor: &mut V) -> V::FcnOutput {
		visitor.visit_prototype(self)
	}
}

impl fmt::Display for Prototype {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}({})", self.name, self.params.join(" "))
	}
}

/// A function definition: prototype plus body expression.
#[derive(Debug, PartialEq)]
pub struct Function {
	/// Emptied when the prototype moves into the registry.
	prototype: Option<Prototype>,
	body:      Expr,
}

impl Function {
	pub fn new(prototype: Prototype, body: Expr) -> Self { Self { prototype: Some(prototype), body } }

	/// The prototype's name, or `""` once the prototype has been released.
	pub fn name(&self) -> &str {
		self.prototype.as_ref().map(Prototype::name).unwrap_or_default()
	}

	pub fn prototype(&self) -> Option<&Prototype> { self.prototype.as_ref() }

	/// One-shot transfer of the prototype out of this function; the registry
	/// owns it afterwards.
	pub fn take_prototype(&mut self) -> Option<Prototype> { self.prototype.take() }

	pub fn body(&self) -> &Expr { &self.body }

	/// Stable short kind string, for diagnostics and tests.
	pub fn kind_name(&self) -> &'static str { "Function" }

	pub fn accept<V: AstVisitor>(&self, visitor: &mut V) { visitor.visit_function(self) }

	pub fn accept_value<V: ValueVisitor>(&mut self, visitor: &mut V) -> V::FcnOutput {
		visitor.visit_function(self)
	}
}
