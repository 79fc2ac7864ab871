//! Per-compilation-run state shared between the parser and the codegen
//! walker.
//!
//! The operator table is read by the parser on every infix operator it meets
//! and extended by the codegen walker when a user-defined binary operator is
//! emitted. Because the driver finishes codegen of form N before parsing form
//! N+1, an operator defined in one top-level form is parseable in the next.
//!
//! The prototype registry keeps an owned prototype per function name. The JIT
//! loop hands each finished module away, so a later module cannot rely on
//! previously emitted functions still being around; the walker re-declares
//! them from the stored prototypes instead.

use std::collections::HashMap;

use crate::ast::Prototype;

/// The binary operator precedence table. Higher binds tighter.
#[derive(Debug, Clone)]
pub struct OperatorTable {
	precedence: HashMap<char, i32>,
}

impl Default for OperatorTable {
	fn default() -> Self {
		Self {
			precedence: HashMap::from([('=', 2), ('<', 10), ('+', 20), ('-', 20), ('*', 40)]),
		}
	}
}

impl OperatorTable {
	/// Precedence of `glyph`, or -1 when it is not a binary operator. Only
	/// 7-bit ASCII characters can be operators.
	pub fn precedence(&self, glyph: char) -> i32 {
		if !glyph.is_ascii() {
			return -1;
		}
		self.precedence.get(&glyph).copied().unwrap_or(-1)
	}

	/// Inserts or overwrites the precedence of a user-defined operator.
	pub fn set(&mut self, glyph: char, precedence: i32) { self.precedence.insert(glyph, precedence); }
}

/// Owned prototypes of every function the walker has seen, keyed by name.
#[derive(Debug, Default)]
pub struct PrototypeRegistry {
	prototypes: HashMap<String, Prototype>,
}

impl PrototypeRegistry {
	/// Inserts or overwrites the prototype under its own name.
	pub fn add(&mut self, proto: Prototype) { self.prototypes.insert(proto.name().to_string(), proto); }

	pub fn get(&self, name: &str) -> Option<&Prototype> { self.prototypes.get(name) }
}

/// One compilation run: operator table plus prototype registry.
#[derive(Debug, Default)]
pub struct Session {
	pub operators: OperatorTable,
	pub registry:  PrototypeRegistry,
}

impl Session {
	pub fn new() -> Self { Self::default() }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::SourceLocation;

	#[test]
	fn default_operator_table() {
		let table = OperatorTable::default();
		assert_eq!(table.precedence('='), 2);
		assert_eq!(table.precedence('<'), 10);
		assert_eq!(table.precedence('+'), 20);
		assert_eq!(table.precedence('-'), 20);
		assert_eq!(table.precedence('*'), 40);
		assert_eq!(table.precedence('%'), -1);
		assert_eq!(table.precedence('§'), -1);
	}

	#[test]
	fn user_operators_extend_and_overwrite() {
		let mut table = OperatorTable::default();
		table.set('%', 5);
		assert_eq!(table.precedence('%'), 5);
		// A later declaration with the same glyph wins; built-ins are untouched.
		table.set('%', 50);
		assert_eq!(table.precedence('%'), 50);
		assert_eq!(table.precedence('+'), 20);
	}

	#[test]
	fn registry_stores_latest_prototype() {
		let mut registry = PrototypeRegistry::default();
		registry.add(Prototype::new("f".to_string(), vec!["x".to_string()], SourceLocation::start()));
		assert_eq!(registry.get("f").unwrap().params().len(), 1);
		assert!(registry.get("g").is_none());

		registry.add(Prototype::new(
			"f".to_string(),
			vec!["x".to_string(), "y".to_string()],
			SourceLocation::start(),
		));
		assert_eq!(registry.get("f").unwrap().params().len(), 2);
	}
}
