use crate::lexer::SourceLocation;

/// An IR emission error with the location of the offending expression.
#[derive(thiserror::Error, Debug)]
#[error("{loc}: {kind}")]
pub struct CodegenError {
	loc:  SourceLocation,
	kind: CodegenErrorKind,
}

impl CodegenError {
	pub fn new(loc: SourceLocation, kind: CodegenErrorKind) -> Self { Self { loc, kind } }

	pub fn kind(&self) -> &CodegenErrorKind { &self.kind }
}

/// Kinds of IR emission errors.
#[derive(Debug, PartialEq)]
pub enum CodegenErrorKind {
	/// A variable was referenced outside any binding of its name.
	UnknownVariable(String),
	/// A call names a function with no prototype in the registry.
	UnknownFunction(String),
	/// A prefix operator was used without a `unary` definition for its glyph.
	UnknownUnaryOperator(char),
	/// A call passes the wrong number of arguments.
	ArgumentCount {
		callee:   String,
		expected: usize,
		got:      usize,
	},
	/// The left-hand side of `=` must name a variable.
	AssignmentTarget,
	/// The emitted function failed verification and was erased.
	Verifier(String),
}

impl std::fmt::Display for CodegenErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use CodegenErrorKind::*;
		match self {
			UnknownVariable(name) => write!(f, "Variable '{name}' is unknown"),
			UnknownFunction(name) => write!(f, "Unknown function called: {name}"),
			UnknownUnaryOperator(op) => write!(f, "Unknown unary operator '{op}'"),
			ArgumentCount { callee, expected, got } => {
				write!(f, "Function {callee} expected {expected} arguments but got {got}")
			}
			AssignmentTarget => write!(f, "Destination of '=' must be a variable"),
			Verifier(message) => write!(f, "Function verification failed: {message}"),
		}
	}
}
