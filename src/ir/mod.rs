//! The in-crate linear IR: the reference implementation of the abstract
//! [`IrBuilder`] surface, plus the execution engine in [`eval`] that stands
//! in for the JIT.
//!
//! A [`Module`] holds functions; a function holds an instruction arena
//! (values are indices into it, in SSA style), basic blocks, an ordered
//! layout of attached blocks and a list of f64 stack slots. Parameters
//! pre-occupy the first instruction indices so a parameter is addressable as
//! a plain value.

pub mod eval;

use std::fmt;

use crate::codegen::builder::IrBuilder;

/// Identifies a function within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncId(usize);

/// Identifies a basic block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockId(usize);

/// An SSA value: an index into its function's instruction arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueId(usize);

/// A named f64 stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(usize);

/// A block handle carrying its owning function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
	pub func:  FuncId,
	pub block: BlockId,
}

/// One IR instruction. Only f64 flows through; comparison results are
/// one-bit values represented as 0.0 / 1.0 by the evaluator.
#[derive(Debug, Clone)]
pub enum Inst {
	ConstF64(f64),
	/// The n-th function parameter; pre-seeded, never appended to a block.
	Param(usize),
	FAdd(ValueId, ValueId),
	FSub(ValueId, ValueId),
	FMul(ValueId, ValueId),
	FCmpOlt(ValueId, ValueId),
	FCmpOne(ValueId, ValueId),
	UiToFp(ValueId),
	Load(SlotId),
	Store(ValueId, SlotId),
	Call(FuncId, Vec<ValueId>),
	Phi(Vec<(ValueId, BlockId)>),
	Br(BlockId),
	CondBr(ValueId, BlockId, BlockId),
	Ret(ValueId),
}

impl Inst {
	fn is_terminator(&self) -> bool { matches!(self, Inst::Br(_) | Inst::CondBr(..) | Inst::Ret(_)) }
}

#[derive(Debug, Clone)]
pub(crate) struct BlockData {
	name:  String,
	insts: Vec<ValueId>,
}

/// A declared or defined function.
#[derive(Debug, Clone)]
pub struct FunctionData {
	name:   String,
	params: Vec<String>,
	/// Instruction arena; the first `params.len()` entries are the
	/// parameters, the second field is a dump name hint.
	insts:  Vec<(Inst, String)>,
	blocks: Vec<BlockData>,
	/// Attached blocks in order; empty for declarations.
	layout: Vec<BlockId>,
	slots:  Vec<String>,
	erased: bool,
}

impl FunctionData {
	fn new(name: &str, params: &[String]) -> Self {
		let insts = params
			.iter()
			.enumerate()
			.map(|(index, param)| (Inst::Param(index), param.clone()))
			.collect();
		Self {
			name: name.to_string(),
			params: params.to_vec(),
			insts,
			blocks: Vec::new(),
			layout: Vec::new(),
			slots: Vec::new(),
			erased: false,
		}
	}

	pub fn name(&self) -> &str { &self.name }

	pub fn params(&self) -> &[String] { &self.params }

	/// A function without a body only declares a symbol.
	pub fn is_declaration(&self) -> bool { self.layout.is_empty() }

	pub(crate) fn is_erased(&self) -> bool { self.erased }

	pub(crate) fn inst(&self, value: ValueId) -> &Inst { &self.insts[value.0].0 }

	pub(crate) fn inst_count(&self) -> usize { self.insts.len() }

	pub(crate) fn slot_count(&self) -> usize { self.slots.len() }

	pub(crate) fn block(&self, block: BlockId) -> &BlockData { &self.blocks[block.0] }

	pub(crate) fn entry(&self) -> Option<BlockId> { self.layout.first().copied() }

	pub(crate) fn block_insts(&self, block: BlockId) -> &[ValueId] { &self.blocks[block.0].insts }

	fn label(&self, block: BlockId) -> String { format!("{}.{}", self.blocks[block.0].name, block.0) }
}

/// One compilation unit of functions.
#[derive(Debug, Clone)]
pub struct Module {
	name:      String,
	functions: Vec<FunctionData>,
}

impl Module {
	pub fn name(&self) -> &str { &self.name }

	pub fn functions(&self) -> &[FunctionData] { &self.functions }

	pub(crate) fn function(&self, func: FuncId) -> &FunctionData { &self.functions[func.0] }

	/// The most recent live function of that name, if any.
	pub fn find(&self, name: &str) -> Option<&FunctionData> {
		self.functions.iter().rev().find(|f| !f.erased && f.name == name)
	}
}

/// Builds one [`Module`] through the [`IrBuilder`] surface.
pub struct ModuleBuilder {
	module: Module,
	insert: Option<BlockRef>,
}

impl ModuleBuilder {
	pub fn new(name: &str) -> Self {
		Self { module: Module { name: name.to_string(), functions: Vec::new() }, insert: None }
	}

	/// Hands the finished module over, e.g. to the execution engine.
	pub fn finish(self) -> Module { self.module }

	fn func_mut(&mut self, func: FuncId) -> &mut FunctionData { &mut self.module.functions[func.0] }

	/// Appends an instruction at the insertion point and returns its value.
	fn push(&mut self, inst: Inst, name: &str) -> ValueId {
		let at = self.insert.expect("no insertion point set");
		let func = self.func_mut(at.func);
		let value = ValueId(func.insts.len());
		func.insts.push((inst, name.to_string()));
		func.blocks[at.block.0].insts.push(value);
		value
	}
}

impl IrBuilder for ModuleBuilder {
	type Block = BlockRef;
	type Function = FuncId;
	type Slot = SlotId;
	type Value = ValueId;

	fn const_f64(&mut self, value: f64) -> ValueId { self.push(Inst::ConstF64(value), "") }

	fn declare_function(&mut self, name: &str, params: &[String]) -> FuncId {
		self.module.functions.push(FunctionData::new(name, params));
		FuncId(self.module.functions.len() - 1)
	}

	fn find_function(&self, name: &str) -> Option<FuncId> {
		self.module
			.functions
			.iter()
			.rposition(|f| !f.erased && f.name == name)
			.map(FuncId)
	}

	fn erase_function(&mut self, function: FuncId) { self.func_mut(function).erased = true; }

	fn param_count(&self, function: FuncId) -> usize { self.module.function(function).params.len() }

	fn param(&self, function: FuncId, index: usize) -> ValueId {
		debug_assert!(index < self.module.function(function).params.len());
		ValueId(index)
	}

	fn param_name(&self, function: FuncId, index: usize) -> String {
		self.module.function(function).params[index].clone()
	}

	fn begin_function_body(&mut self, function: FuncId) -> BlockRef {
		let params = self.module.function(function).params.len();
		let func = self.func_mut(function);
		// Restarting a body drops any previous one.
		func.insts.truncate(params);
		func.blocks.clear();
		func.layout.clear();
		func.slots.clear();

		let entry = self.new_block(function, "entry");
		self.attach_block(entry);
		self.set_insert_point(entry);
		entry
	}

	fn new_block(&mut self, function: FuncId, name: &str) -> BlockRef {
		let func = self.func_mut(function);
		let block = BlockId(func.blocks.len());
		func.blocks.push(BlockData { name: name.to_string(), insts: Vec::new() });
		BlockRef { func: function, block }
	}

	fn attach_block(&mut self, block: BlockRef) { self.func_mut(block.func).layout.push(block.block); }

	fn set_insert_point(&mut self, block: BlockRef) { self.insert = Some(block); }

	fn insert_block(&self) -> BlockRef { self.insert.expect("no insertion point set") }

	fn parent_function(&self, block: BlockRef) -> FuncId { block.func }

	fn fadd(&mut self, lhs: ValueId, rhs: ValueId, name: &str) -> ValueId {
		self.push(Inst::FAdd(lhs, rhs), name)
	}

	fn fsub(&mut self, lhs: ValueId, rhs: ValueId, name: &str) -> ValueId {
		self.push(Inst::FSub(lhs, rhs), name)
	}

	fn fmul(&mut self, lhs: ValueId, rhs: ValueId, name: &str) -> ValueId {
		self.push(Inst::FMul(lhs, rhs), name)
	}

	fn fcmp_olt(&mut self, lhs: ValueId, rhs: ValueId, name: &str) -> ValueId {
		self.push(Inst::FCmpOlt(lhs, rhs), name)
	}

	fn fcmp_one(&mut self, lhs: ValueId, rhs: ValueId, name: &str) -> ValueId {
		self.push(Inst::FCmpOne(lhs, rhs), name)
	}

	fn ui_to_fp(&mut self, value: ValueId, name: &str) -> ValueId { self.push(Inst::UiToFp(value), name) }

	fn entry_alloca(&mut self, function: FuncId, name: &str) -> SlotId {
		let func = self.func_mut(function);
		func.slots.push(name.to_string());
		SlotId(func.slots.len() - 1)
	}

	fn load(&mut self, slot: SlotId, name: &str) -> ValueId { self.push(Inst::Load(slot), name) }

	fn store(&mut self, value: ValueId, slot: SlotId) { self.push(Inst::Store(value, slot), ""); }

	fn br(&mut self, dest: BlockRef) { self.push(Inst::Br(dest.block), ""); }

	fn cond_br(&mut self, cond: ValueId, then_block: BlockRef, else_block: BlockRef) {
		self.push(Inst::CondBr(cond, then_block.block, else_block.block), "");
	}

	fn phi(&mut self, incoming: &[(ValueId, BlockRef)], name: &str) -> ValueId {
		let incoming = incoming.iter().map(|(value, block)| (*value, block.block)).collect();
		self.push(Inst::Phi(incoming), name)
	}

	fn call(&mut self, callee: FuncId, args: &[ValueId], name: &str) -> ValueId {
		self.push(Inst::Call(callee, args.to_vec()), name)
	}

	fn ret(&mut self, value: ValueId) { self.push(Inst::Ret(value), ""); }

	/// Structural checks: a body must exist, every attached block must end in
	/// exactly one terminator and branches may only target attached blocks.
	fn verify_function(&self, function: FuncId) -> Result<(), String> {
		let func = self.module.function(function);
		if func.layout.is_empty() {
			return Err(format!("function '{}' has no body", func.name));
		}
		for &block in &func.layout {
			let data = func.block(block);
			let Some((&last, rest)) = data.insts.split_last() else {
				return Err(format!("block '{}' is empty", func.label(block)));
			};
			if !func.inst(last).is_terminator() {
				return Err(format!("block '{}' does not end in a terminator", func.label(block)));
			}
			if rest.iter().any(|&value| func.inst(value).is_terminator()) {
				return Err(format!("terminator in the middle of block '{}'", func.label(block)));
			}
			let attached = |dest: &BlockId| func.layout.contains(dest);
			match func.inst(last) {
				Inst::Br(dest) if !attached(dest) => {
					return Err(format!("branch to unattached block from '{}'", func.label(block)));
				}
				Inst::CondBr(_, t, e) if !attached(t) || !attached(e) => {
					return Err(format!("branch to unattached block from '{}'", func.label(block)));
				}
				_ => {}
			}
		}
		Ok(())
	}
}

impl fmt::Display for Module {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "; module {}", self.name)?;
		for func in self.functions.iter().filter(|func| !func.erased) {
			if func.is_declaration() {
				writeln!(f, "declare @{}({})", func.name, func.params.join(", "))?;
				continue;
			}
			writeln!(f, "define @{}({}) {{", func.name, func.params.join(", "))?;
			for &block in &func.layout {
				writeln!(f, "{}:", func.label(block))?;
				for &value in &func.blocks[block.0].insts {
					let (inst, hint) = &func.insts[value.0];
					write!(f, "\t{}", self.render(func, value, inst))?;
					if hint.is_empty() {
						writeln!(f)?;
					} else {
						writeln!(f, " ; {hint}")?;
					}
				}
			}
			writeln!(f, "}}")?;
		}
		Ok(())
	}
}

impl Module {
	fn render(&self, func: &FunctionData, value: ValueId, inst: &Inst) -> String {
		let v = |id: ValueId| format!("%{}", id.0);
		let s = |id: SlotId| format!("s{}", id.0);
		match inst {
			Inst::ConstF64(c) => format!("{} = const {c}", v(value)),
			Inst::Param(index) => format!("{} = param {index}", v(value)),
			Inst::FAdd(a, b) => format!("{} = fadd {}, {}", v(value), v(*a), v(*b)),
			Inst::FSub(a, b) => format!("{} = fsub {}, {}", v(value), v(*a), v(*b)),
			Inst::FMul(a, b) => format!("{} = fmul {}, {}", v(value), v(*a), v(*b)),
			Inst::FCmpOlt(a, b) => format!("{} = fcmp olt {}, {}", v(value), v(*a), v(*b)),
			Inst::FCmpOne(a, b) => format!("{} = fcmp one {}, {}", v(value), v(*a), v(*b)),
			Inst::UiToFp(a) => format!("{} = uitofp {}", v(value), v(*a)),
			Inst::Load(slot) => format!("{} = load {}", v(value), s(*slot)),
			Inst::Store(a, slot) => format!("store {}, {}", v(*a), s(*slot)),
			Inst::Call(callee, args) => {
				let args = args.iter().map(|arg| v(*arg)).collect::<Vec<_>>().join(", ");
				format!("{} = call @{}({args})", v(value), self.functions[callee.0].name)
			}
			Inst::Phi(incoming) => {
				let incoming = incoming
					.iter()
					.map(|(val, block)| format!("[{}, {}]", v(*val), func.label(*block)))
					.collect::<Vec<_>>()
					.join(", ");
				format!("{} = phi {incoming}", v(value))
			}
			Inst::Br(dest) => format!("br {}", func.label(*dest)),
			Inst::CondBr(cond, t, e) => {
				format!("condbr {}, {}, {}", v(*cond), func.label(*t), func.label(*e))
			}
			Inst::Ret(a) => format!("ret {}", v(*a)),
		}
	}
}
