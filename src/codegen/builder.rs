//! The abstract linear-IR construction surface the codegen walker writes to.
//!
//! The walker never names a concrete IR library; anything that can hand out
//! f64 constants, `(f64, ...) -> f64` functions, basic blocks with insertion
//! points and the handful of instructions below can sit behind it. The
//! in-crate reference implementation is [`crate::ir::ModuleBuilder`].

use std::fmt::Debug;

/// One IR module under construction.
///
/// The only first-class type is f64; comparison instructions yield a one-bit
/// value that must be widened with [`IrBuilder::ui_to_fp`] before further
/// arithmetic. The `name` arguments are hints for readable dumps, nothing
/// more.
pub trait IrBuilder {
	/// An SSA value inside the current function.
	type Value: Copy + Debug;
	/// A named f64 stack slot in a function's entry block.
	type Slot: Copy + Debug;
	/// A basic block, possibly not yet attached to its function's layout.
	type Block: Copy + Debug + PartialEq;
	/// A function, declared or defined, in this module.
	type Function: Copy + Debug;

	fn const_f64(&mut self, value: f64) -> Self::Value;

	/// Declares an externally linked `(f64, ...) -> f64` function with named
	/// parameters.
	fn declare_function(&mut self, name: &str, params: &[String]) -> Self::Function;
	/// Looks a function up in this module only; cross-module resolution goes
	/// through the prototype registry.
	fn find_function(&self, name: &str) -> Option<Self::Function>;
	/// Removes a function whose body emission failed.
	fn erase_function(&mut self, function: Self::Function);
	fn param_count(&self, function: Self::Function) -> usize;
	fn param(&self, function: Self::Function, index: usize) -> Self::Value;
	fn param_name(&self, function: Self::Function, index: usize) -> String;

	/// Starts (or restarts) a function body: creates a fresh `entry` block,
	/// attaches it and positions the builder at its end.
	fn begin_function_body(&mut self, function: Self::Function) -> Self::Block;
	/// Creates a floating block owned by `function` but not yet part of its
	/// layout.
	fn new_block(&mut self, function: Self::Function, name: &str) -> Self::Block;
	/// Appends a floating block to its function's layout.
	fn attach_block(&mut self, block: Self::Block);
	fn set_insert_point(&mut self, block: Self::Block);
	/// The block instructions are currently appended to.
	fn insert_block(&self) -> Self::Block;
	fn parent_function(&self, block: Self::Block) -> Self::Function;

	fn fadd(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
	fn fsub(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
	fn fmul(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
	/// Ordered less-than; yields a one-bit value.
	fn fcmp_olt(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
	/// Ordered not-equal; yields a one-bit value.
	fn fcmp_one(&mut self, lhs: Self::Value, rhs: Self::Value, name: &str) -> Self::Value;
	/// Widens a one-bit comparison result to f64 (0.0 or 1.0).
	fn ui_to_fp(&mut self, value: Self::Value, name: &str) -> Self::Value;

	/// Allocates a named f64 slot in the entry block of `function`.
	fn entry_alloca(&mut self, function: Self::Function, name: &str) -> Self::Slot;
	fn load(&mut self, slot: Self::Slot, name: &str) -> Self::Value;
	fn store(&mut self, value: Self::Value, slot: Self::Slot);

	fn br(&mut self, dest: Self::Block);
	fn cond_br(&mut self, cond: Self::Value, then_block: Self::Block, else_block: Self::Block);
	/// SSA join: selects the value paired with the predecessor block control
	/// arrived from.
	fn phi(&mut self, incoming: &[(Self::Value, Self::Block)], name: &str) -> Self::Value;
	fn call(&mut self, callee: Self::Function, args: &[Self::Value], name: &str) -> Self::Value;
	fn ret(&mut self, value: Self::Value);

	/// Verifier collaborator: validates a finished function.
	fn verify_function(&self, function: Self::Function) -> Result<(), String>;
	/// Optimization collaborator; runs over a finished function when
	/// configured. The default does nothing.
	fn optimize_function(&mut self, _function: Self::Function) {}
}
