//! The recursive-descent parser.
//!
//! The parser owns the [`Lexer`] and consumes its tokens in one direction; it
//! never rewinds. Binary expressions are resolved by operator-precedence
//! climbing against the [`Session`]'s operator table, which means the grammar
//! itself changes at runtime: once the codegen walker has emitted a
//! `def binary@ ...` form, `@` parses as an infix operator in every later
//! form.
//!
//! Expression grammar:
//!
//! ``` EBNF
//! top          := 'def' prototype expression
//!               | 'extern' prototype
//!               | expression
//! prototype    := identifier '(' identifier* ')'
//!               | 'unary' OP '(' identifier ')'
//!               | 'binary' OP NUMBER? '(' identifier identifier ')'
//! expression   := unary (binop unary)*          (* binop by precedence *)
//! unary        := primary | OP unary
//! primary      := NUMBER | identifierExpr | parenExpr
//!               | ifExpr | forExpr | varExpr
//! parenExpr    := '(' expression ')'
//! identifierExpr := identifier
//!               | identifier '(' (expression (',' expression)*)? ')'
//! ifExpr       := 'if' expression 'then' expression 'else' expression
//! forExpr      := 'for' identifier '=' primary ',' expression
//!                       (',' expression)? 'in' expression
//! varExpr      := 'var' identifier ('=' expression)?
//!                       (',' identifier ('=' expression)?)* 'in' expression
//! ```
//!
//! On a mismatch a production returns a [`ParseError`]; no partial nodes
//! escape. Advancing the lexer to re-synchronize is the driver's job.

use crate::{
	ast::{Expr, ExprKind, Function, OperatorKind, Prototype},
	error::parser::{
		ParseError,
		ParseErrorKind::{self, *},
	},
	lexer::{Lexer, Token},
	session::Session,
};

type Result<T> = std::result::Result<T, ParseError>;

/// Reserved name wrapping a top-level expression; the driver executes it by
/// looking this name up in the execution engine.
pub const ANON_FUNCTION: &str = "__anon_expr";

/// The recursive-descent parser over one source string.
pub struct Parser<'a> {
	lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
	pub fn new(source: &'a str) -> Self { Self { lexer: Lexer::new(source) } }

	/// The token the parser is looking at; drives the top-level dispatch.
	pub fn current(&self) -> &Token { self.lexer.current() }

	/// Skips one token; used by the driver to prime the lexer and to
	/// re-synchronize after an error.
	pub fn advance(&mut self) -> Token { self.lexer.advance() }

	/// Parses `def <prototype> <expression>`.
	pub fn parse_definition(&mut self, session: &Session) -> Result<Function> {
		if self.lexer.current() != &Token::Def {
			return Err(self.error(ExpectedDef));
		}
		self.lexer.consume(&Token::Def);
		let proto = self.parse_prototype()?;
		let body = self.parse_expression(session)?;
		Ok(Function::new(proto, body))
	}

	/// Parses `extern <prototype>`.
	pub fn parse_extern(&mut self) -> Result<Prototype> {
		if self.lexer.current() != &Token::Extern {
			return Err(self.error(ExpectedExtern));
		}
		self.lexer.consume(&Token::Extern);
		self.parse_prototype()
	}

	/// Parses a bare expression and wraps it in a zero-argument function
	/// named [`ANON_FUNCTION`].
	pub fn parse_top_level_expr(&mut self, session: &Session) -> Result<Function> {
		let loc = self.lexer.current_loc();
		let body = self.parse_expression(session)?;
		let proto = Prototype::new(ANON_FUNCTION.to_string(), Vec::new(), loc);
		Ok(Function::new(proto, body))
	}

	fn error(&self, kind: ParseErrorKind) -> ParseError { ParseError::new(self.lexer.current_loc(), kind) }

	/// Parses a unary followed by any number of binary-operator tails.
	fn parse_expression(&mut self, session: &Session) -> Result<Expr> {
		let lhs = self.parse_unary(session)?;
		self.parse_bin_op_rhs(session, 0, lhs)
	}

	/// Precedence of the current token as a binary operator, -1 if it is not
	/// one.
	fn current_precedence(&self, session: &Session) -> i32 {
		match self.lexer.current() {
			Token::Char(c) => session.operators.precedence(*c),
			_ => -1,
		}
	}

	/// Consumes `(binop unary)*` tails whose operators bind at least as
	/// tightly as `expr_prec`, folding them onto `lhs` left-associatively. A
	/// tail whose right neighbor binds tighter recurses with a raised
	/// minimum, so `a + b * c` nests the product under the sum.
	fn parse_bin_op_rhs(&mut self, session: &Session, expr_prec: i32, mut lhs: Expr) -> Result<Expr> {
		loop {
			let tok_prec = self.current_precedence(session);
			if tok_prec < expr_prec {
				return Ok(lhs);
			}

			let op = match self.lexer.current() {
				Token::Char(c) => *c,
				_ => unreachable!("binary operators are single-character tokens"),
			};
			let loc = self.lexer.current_loc();
			self.lexer.advance();

			let mut rhs = self.parse_unary(session)?;
			let next_prec = self.current_precedence(session);
			if tok_prec < next_prec {
				rhs = self.parse_bin_op_rhs(session, tok_prec + 1, rhs)?;
			}

			lhs = Expr::new(ExprKind::Binary { op, lhs: lhs.boxed(), rhs: rhs.boxed() }, loc);
		}
	}

	/// A prefix operator is any single ASCII character except `(` and `,`;
	/// prefixes stack by recursion so `!!x` nests.
	fn parse_unary(&mut self, session: &Session) -> Result<Expr> {
		let op = match self.lexer.current() {
			Token::Char(c) if c.is_ascii() && *c != '(' && *c != ',' => *c,
			_ => return self.parse_primary(session),
		};
		let loc = self.lexer.current_loc();
		self.lexer.advance();
		let operand = self.parse_unary(session)?;
		Ok(Expr::new(ExprKind::Unary { op, operand: operand.boxed() }, loc))
	}

	fn parse_primary(&mut self, session: &Session) -> Result<Expr> {
		match self.lexer.current().clone() {
			Token::Ident(_) => self.parse_identifier_expr(session),
			Token::Number(value) => {
				let loc = self.lexer.current_loc();
				self.lexer.consume(&Token::Number(value));
				Ok(Expr::new(ExprKind::Number(value), loc))
			}
			Token::Char('(') => self.parse_paren_expr(session),
			Token::If => self.parse_if_expr(session),
			Token::For => self.parse_for_expr(session),
			Token::Var => self.parse_var_expr(session),
			token => Err(self.error(UnknownToken(token.to_string()))),
		}
	}

	fn parse_paren_expr(&mut self, session: &Session) -> Result<Expr> {
		self.lexer.consume(&Token::Char('('));
		let expr = self.parse_expression(session)?;
		if self.lexer.current() != &Token::Char(')') {
			return Err(self.error(ExpectedCloseParen));
		}
		self.lexer.consume(&Token::Char(')'));
		Ok(expr)
	}

	/// `<identifier>` alone is a variable reference; followed by `(` it is a
	/// call.
	fn parse_identifier_expr(&mut self, session: &Session) -> Result<Expr> {
		let loc = self.lexer.current_loc();
		let name = match self.lexer.current() {
			Token::Ident(name) => name.clone(),
			_ => return Err(self.error(ExpectedIdentifier)),
		};

		if self.lexer.advance() != Token::Char('(') {
			return Ok(Expr::new(ExprKind::Variable(name), loc));
		}

		let args = self.parse_call_args(session)?;
		Ok(Expr::new(ExprKind::Call { callee: name, args }, loc))
	}

	/// Comma-separated arguments between parentheses; the empty list is fine,
	/// a trailing comma is not.
	fn parse_call_args(&mut self, session: &Session) -> Result<Vec<Expr>> {
		let mut args = Vec::new();
		if self.lexer.advance() == Token::Char(')') {
			self.lexer.consume(&Token::Char(')'));
			return Ok(args);
		}
		loop {
			args.push(self.parse_expression(session)?);
			match self.lexer.current() {
				Token::Char(')') => {
					self.lexer.consume(&Token::Char(')'));
					return Ok(args);
				}
				Token::Char(',') => self.lexer.consume(&Token::Char(',')),
				_ => return Err(self.error(ExpectedCloseParenOrComma)),
			}
		}
	}

	fn parse_if_expr(&mut self, session: &Session) -> Result<Expr> {
		let loc = self.lexer.current_loc();
		self.lexer.consume(&Token::If);

		let cond = self.parse_expression(session)?;
		if self.lexer.current() != &Token::Then {
			return Err(self.error(ExpectedThen));
		}
		self.lexer.consume(&Token::Then);

		let then_branch = self.parse_expression(session)?;
		if self.lexer.current() != &Token::Else {
			return Err(self.error(ExpectedElse));
		}
		self.lexer.consume(&Token::Else);

		let else_branch = self.parse_expression(session)?;
		Ok(Expr::new(
			ExprKind::If {
				cond:        cond.boxed(),
				then_branch: then_branch.boxed(),
				else_branch: else_branch.boxed(),
			},
			loc,
		))
	}

	fn parse_for_expr(&mut self, session: &Session) -> Result<Expr> {
		let loc = self.lexer.current_loc();
		self.lexer.consume(&Token::For);

		let var = match self.lexer.current() {
			Token::Ident(name) => name.clone(),
			_ => return Err(self.error(ExpectedForIdentifier)),
		};
		self.lexer.advance();

		if self.lexer.current() != &Token::Char('=') {
			return Err(self.error(ExpectedForEquals));
		}
		self.lexer.advance();

		// The start value is a primary, not a full expression: a unary parse
		// here would swallow a missing comma as a prefix operator.
		let start = self.parse_primary(session)?;
		if self.lexer.current() != &Token::Char(',') {
			return Err(self.error(ExpectedForComma));
		}
		self.lexer.advance();

		let end = self.parse_expression(session)?;

		let step = if self.lexer.current() == &Token::Char(',') {
			self.lexer.advance();
			Some(self.parse_expression(session)?.boxed())
		} else {
			None
		};

		if self.lexer.current() != &Token::In {
			return Err(self.error(ExpectedIn));
		}
		self.lexer.advance();

		let body = self.parse_expression(session)?;
		Ok(Expr::new(
			ExprKind::For { var, start: start.boxed(), end: end.boxed(), step, body: body.boxed() },
			loc,
		))
	}

	fn parse_var_expr(&mut self, session: &Session) -> Result<Expr> {
		let loc = self.lexer.current_loc();
		self.lexer.consume(&Token::Var);

		if !matches!(self.lexer.current(), Token::Ident(_)) {
			return Err(self.error(ExpectedVarIdentifier));
		}

		let mut bindings = Vec::new();
		loop {
			let name = match self.lexer.current() {
				Token::Ident(name) => name.clone(),
				_ => unreachable!("binding name checked before each iteration"),
			};
			self.lexer.advance();

			let init = if self.lexer.current() == &Token::Char('=') {
				self.lexer.advance();
				Some(self.parse_expression(session)?)
			} else {
				None
			};
			bindings.push((name, init));

			// End of the binding list.
			if self.lexer.current() != &Token::Char(',') {
				break;
			}
			self.lexer.consume(&Token::Char(','));

			if !matches!(self.lexer.current(), Token::Ident(_)) {
				return Err(self.error(ExpectedVarIdentifier));
			}
		}

		if self.lexer.current() != &Token::In {
			return Err(self.error(ExpectedIn));
		}
		self.lexer.consume(&Token::In);

		let body = self.parse_expression(session)?;
		Ok(Expr::new(ExprKind::Var { bindings, body: body.boxed() }, loc))
	}

	/// Parses an `identifier ( ... )` or `unary OP ( ... )` or
	/// `binary OP NUMBER? ( ... )` prototype head, then the parameter list.
	fn parse_prototype(&mut self) -> Result<Prototype> {
		let loc = self.lexer.current_loc();
		let (name, op_kind, precedence) = match self.lexer.current().clone() {
			Token::Ident(name) => {
				self.lexer.advance();
				(name, OperatorKind::None, 0)
			}
			Token::Unary => {
				self.lexer.consume(&Token::Unary);
				let glyph = self.operator_glyph(ExpectedUnaryOperator)?;
				(format!("unary{glyph}"), OperatorKind::Unary, 0)
			}
			Token::Binary => {
				self.lexer.consume(&Token::Binary);
				let glyph = self.operator_glyph(ExpectedBinaryOperator)?;
				let mut precedence = 30;
				if let Token::Number(n) = self.lexer.current() {
					let n = *n;
					if !(1.0..=100.0).contains(&n) {
						return Err(self.error(InvalidPrecedence(n)));
					}
					precedence = n as i32;
					self.lexer.advance();
				}
				(format!("binary{glyph}"), OperatorKind::Binary, precedence)
			}
			_ => return Err(self.error(ExpectedFunctionName)),
		};

		if self.lexer.current() != &Token::Char('(') {
			return Err(self.error(ExpectedOpenParen));
		}

		// Parameters are whitespace-separated identifiers, no commas.
		let mut params = Vec::new();
		while let Token::Ident(param) = self.lexer.advance() {
			params.push(param);
		}

		if self.lexer.current() != &Token::Char(')') {
			return Err(self.error(ExpectedCloseParenInPrototype));
		}
		self.lexer.consume(&Token::Char(')'));

		let arity = match op_kind {
			OperatorKind::None => params.len(),
			OperatorKind::Unary => 1,
			OperatorKind::Binary => 2,
		};
		if params.len() != arity {
			return Err(self.error(InvalidOperandCount));
		}

		Ok(Prototype::new_operator(name, params, op_kind, precedence, loc))
	}

	/// The declared glyph of an operator prototype: printable ASCII, not
	/// alphanumeric.
	fn operator_glyph(&mut self, missing: ParseErrorKind) -> Result<char> {
		match self.lexer.current() {
			Token::Char(c) if c.is_ascii() && !c.is_ascii_alphanumeric() => {
				let glyph = *c;
				self.lexer.advance();
				Ok(glyph)
			}
			_ => Err(self.error(missing)),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::{ast::ExprKind, error::parser::ParseErrorKind::*};

	fn parse_top(input: &str) -> Function {
		let session = Session::new();
		let mut parser = Parser::new(input);
		parser.advance();
		parser.parse_top_level_expr(&session).unwrap()
	}

	/// Parses a top-level expression and renders it; parentheses in the
	/// output make the tree shape visible.
	fn parse_str(input: &str) -> String { parse_top(input).body().to_string() }

	fn parse_err(input: &str) -> ParseError {
		let session = Session::new();
		let mut parser = Parser::new(input);
		parser.advance();
		parser.parse_top_level_expr(&session).unwrap_err()
	}

	#[test]
	fn parse_number_expr() {
		let fcn = parse_top("42");
		assert_eq!(fcn.name(), ANON_FUNCTION);
		assert_eq!(fcn.body().kind_name(), "Number");
		assert_eq!(fcn.body().to_string(), "42");
	}

	#[test]
	fn parse_paren_expr() {
		assert_eq!(parse_top("(123)").body().kind_name(), "Number");
		assert_eq!(parse_str("(1 + 2) * 3"), "((1 + 2) * 3)");
	}

	#[test]
	fn parse_variable_expr() {
		assert_eq!(parse_top("foo").body().kind_name(), "Variable");
	}

	#[test]
	fn parse_call_expr() {
		assert_eq!(parse_str("bar()"), "bar()");
		assert_eq!(parse_str("baz(1, x, 3.14)"), "baz(1, x, 3.14)");
		assert_eq!(parse_str("foo(bar(1), 2 + 3)"), "foo(bar(1), (2 + 3))");
	}

	#[test]
	fn parse_binary_precedence() {
		// Tighter on the right.
		assert_eq!(parse_str("1 + 2 * 3"), "(1 + (2 * 3))");
		// Tighter on the left.
		assert_eq!(parse_str("1 * 2 + 3"), "((1 * 2) + 3)");
		// Equal precedence associates to the left.
		assert_eq!(parse_str("1 - 2 + 3"), "((1 - 2) + 3)");
		assert_eq!(parse_str("8 + 4 * 2 < 20 - 1"), "((8 + (4 * 2)) < (20 - 1))");
	}

	#[test]
	fn parse_binary_with_user_operator() {
		let mut session = Session::new();
		session.operators.set('%', 5);
		let mut parser = Parser::new("1 % 2 + 3");
		parser.advance();
		let fcn = parser.parse_top_level_expr(&session).unwrap();
		// '%' binds weaker than '+', so the sum nests under it.
		assert_eq!(fcn.body().to_string(), "(1 % (2 + 3))");
	}

	#[test]
	fn parse_unknown_glyph_terminates_binary_parsing() {
		// '%' has no precedence entry in a fresh session, so it does not
		// continue the binary chain.
		assert_eq!(parse_str("1 %2"), "1");
	}

	#[test]
	fn parse_nested_unary() {
		let fcn = parse_top("!!x");
		let ExprKind::Unary { op: '!', operand } = &fcn.body().kind else {
			panic!("expected unary, got {}", fcn.body());
		};
		let ExprKind::Unary { op: '!', operand: inner } = &operand.kind else {
			panic!("expected nested unary, got {operand}");
		};
		assert_eq!(inner.kind, ExprKind::Variable("x".to_string()));
	}

	#[test]
	fn parse_if_expr() {
		let fcn = parse_top("if x < 10 then x else 10");
		assert_eq!(fcn.body().kind_name(), "If-Then-Else");
		let ExprKind::If { cond, then_branch, else_branch } = &fcn.body().kind else {
			panic!("expected if, got {}", fcn.body());
		};
		assert_eq!(cond.to_string(), "(x < 10)");
		assert_eq!(then_branch.kind, ExprKind::Variable("x".to_string()));
		assert_eq!(else_branch.kind, ExprKind::Number(10.0));
	}

	#[test]
	fn parse_for_expr_without_step() {
		let fcn = parse_top("for i = 1, i < 10 in i");
		let ExprKind::For { var, start, end, step, body } = &fcn.body().kind else {
			panic!("expected for, got {}", fcn.body());
		};
		assert_eq!(var, "i");
		assert_eq!(start.kind, ExprKind::Number(1.0));
		assert_eq!(end.to_string(), "(i < 10)");
		assert!(step.is_none());
		assert_eq!(body.kind, ExprKind::Variable("i".to_string()));
	}

	#[test]
	fn parse_for_expr_with_step() {
		let fcn = parse_top("for i = 1, i < 10, 2 in i");
		let ExprKind::For { step, .. } = &fcn.body().kind else {
			panic!("expected for, got {}", fcn.body());
		};
		assert_eq!(step.as_ref().unwrap().kind, ExprKind::Number(2.0));
	}

	#[test]
	fn parse_var_expr() {
		let fcn = parse_top("var a = 1, b in a + b");
		let ExprKind::Var { bindings, body } = &fcn.body().kind else {
			panic!("expected var, got {}", fcn.body());
		};
		assert_eq!(bindings.len(), 2);
		assert_eq!(bindings[0].0, "a");
		assert_eq!(bindings[0].1.as_ref().unwrap().kind, ExprKind::Number(1.0));
		assert_eq!(bindings[1].0, "b");
		assert!(bindings[1].1.is_none());
		assert_eq!(body.to_string(), "(a + b)");
	}

	#[test]
	fn parse_definition() {
		let session = Session::new();
		let mut parser = Parser::new("def foo(x y) x + y");
		parser.advance();
		let fcn = parser.parse_definition(&session).unwrap();

		let proto = fcn.prototype().unwrap();
		assert_eq!(proto.name(), "foo");
		assert_eq!(proto.params(), ["x".to_string(), "y".to_string()]);
		assert!(!proto.is_unary_op() && !proto.is_binary_op());
		assert_eq!(proto.loc().line, 1);
		assert_eq!(fcn.body().to_string(), "(x + y)");
	}

	#[test]
	fn parse_extern_prototype() {
		let mut parser = Parser::new("extern sin(x)");
		parser.advance();
		let proto = parser.parse_extern().unwrap();
		assert_eq!(proto.name(), "sin");
		assert_eq!(proto.params(), ["x".to_string()]);
		assert_eq!(proto.precedence(), 0);
	}

	#[test]
	fn parse_operator_definitions() {
		let session = Session::new();

		let mut parser = Parser::new("def binary% 5 (x y) x");
		parser.advance();
		let fcn = parser.parse_definition(&session).unwrap();
		let proto = fcn.prototype().unwrap();
		assert!(proto.is_binary_op());
		assert_eq!(proto.name(), "binary%");
		assert_eq!(proto.operator_glyph(), '%');
		assert_eq!(proto.precedence(), 5);

		// Without a precedence literal the default is 30.
		let mut parser = Parser::new("def binary| (x y) x");
		parser.advance();
		let fcn = parser.parse_definition(&session).unwrap();
		assert_eq!(fcn.prototype().unwrap().precedence(), 30);

		let mut parser = Parser::new("def unary!(v) v");
		parser.advance();
		let fcn = parser.parse_definition(&session).unwrap();
		let proto = fcn.prototype().unwrap();
		assert!(proto.is_unary_op());
		assert_eq!(proto.name(), "unary!");
		assert_eq!(proto.operator_glyph(), '!');
	}

	#[test]
	fn parse_prototype_errors() {
		let session = Session::new();
		let cases = [
			("def binary% 5 (x) x", InvalidOperandCount),
			("def unary!(a b) a", InvalidOperandCount),
			("def binary% 200 (x y) x", InvalidPrecedence(200.0)),
			("def binary 5 (x y) x", ExpectedBinaryOperator),
			("def unary a (v) v", ExpectedUnaryOperator),
			("def foo(x", ExpectedCloseParenInPrototype),
			("def 1(x) x", ExpectedFunctionName),
		];
		for (input, expected) in cases {
			let mut parser = Parser::new(input);
			parser.advance();
			let error = parser.parse_definition(&session).unwrap_err();
			assert_eq!(error.kind(), &expected, "input: {input}");
		}
	}

	#[test]
	fn parse_expression_errors() {
		assert_eq!(parse_err("(1 + 2").kind(), &ExpectedCloseParen);
		assert_eq!(parse_err("if 1 then 2").kind(), &ExpectedElse);
		assert_eq!(parse_err("if 1 2 else 3").kind(), &ExpectedThen);
		assert_eq!(parse_err("for i = 1 in i").kind(), &ExpectedForComma);
		assert_eq!(parse_err("for 1 = 1, 2 in 3").kind(), &ExpectedForIdentifier);
		assert_eq!(parse_err("var 1 in 2").kind(), &ExpectedVarIdentifier);
		assert_eq!(parse_err("var a = 1 a").kind(), &ExpectedIn);
		// The ')' after the trailing comma is consumed as a prefix operator,
		// so the parse runs out of input.
		assert_eq!(parse_err("foo(1,)").kind(), &UnknownToken("<eof>".to_string()));
		assert_eq!(parse_err("foo(1; 2)").kind(), &ExpectedCloseParenOrComma);
		assert_eq!(parse_err("then").kind(), &UnknownToken("then".to_string()));
	}

	#[test]
	fn parser_is_deterministic() {
		let input = "if a < b then foo(a, b * 2) else var c = 1 in c + a";
		assert_eq!(parse_top(input), parse_top(input));
	}
}
